//! Isolated compiler bridge.
//!
//! Some hosts (Electron applications) run a V8 build whose caches a stock
//! Node cannot produce, and whose main process cannot be reconfigured. The
//! bridge starts that host's binary as a plain script host
//! (`ELECTRON_RUN_AS_NODE=1`), streams the source in over stdin and collects
//! the cache from stdout.
//!
//! The child's exit status is not checked: whatever arrived on stdout is
//! returned, possibly empty, and an unusable cache is only detected when it
//! is loaded. Anything written to stderr is logged as a diagnostic, and on
//! unix the child also gets a Node IPC channel whose messages are logged.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::process::Command;

#[cfg(unix)]
use crate::channel::MessageChannel;
use crate::error::{EngineError, EngineResult};
use crate::locate::locate_electron;
use crate::setup::{EngineFlags, EngineSetup};

/// Environment variable switching Electron into plain Node mode
pub const RUN_AS_NODE_ENV: &str = "ELECTRON_RUN_AS_NODE";

const COMPILE_SCRIPT: &str = include_str!("js/compile.js");
const FLAGS_MARKER: &str = "/*__ENGINE_FLAGS__*/";

/// Everything an isolated compile produced
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IsolatedOutput {
    /// Bytes written to stdout (the cache, possibly empty)
    pub data: Vec<u8>,
    /// Messages the child sent over the Node IPC channel (unix only)
    pub messages: Vec<serde_json::Value>,
}

/// Compiles in a separate engine process
#[derive(Debug, Clone)]
pub struct IsolatedCompiler {
    executable: PathBuf,
    flags: EngineFlags,
}

impl IsolatedCompiler {
    /// Use `executable` as the engine process
    pub fn new(setup: &EngineSetup, executable: PathBuf) -> Self {
        Self {
            executable,
            flags: setup.flags(),
        }
    }

    /// Locate the Electron executable (see [`locate_electron`]).
    ///
    /// Fails with [`EngineError::DependencyMissing`] without spawning anything.
    pub fn locate(
        setup: &EngineSetup,
        explicit: Option<&Path>,
        search_from: &Path,
    ) -> EngineResult<Self> {
        let executable = locate_electron(explicit, search_from)?;
        Ok(Self::new(setup, executable))
    }

    /// The engine executable
    pub fn executable(&self) -> &Path {
        &self.executable
    }

    /// Compiler script with the engine flags applied up front
    pub fn compile_script(&self) -> String {
        COMPILE_SCRIPT.replacen(FLAGS_MARKER, &self.flags.set_flags_js(), 1)
    }

    /// Compile `source` in a fresh child process.
    ///
    /// Only spawn-level failures are errors. No timeout is applied.
    pub async fn compile(&self, source: &str) -> EngineResult<Vec<u8>> {
        Ok(self.compile_with_messages(source).await?.data)
    }

    /// Like [`compile`](Self::compile), also returning what the child sent
    /// over its IPC channel. Messages are logged as they arrive and never
    /// affect the result.
    pub async fn compile_with_messages(&self, source: &str) -> EngineResult<IsolatedOutput> {
        let mut script = tempfile::Builder::new()
            .prefix("kiln-compile-")
            .suffix(".js")
            .tempfile()?;
        script.write_all(self.compile_script().as_bytes())?;
        script.flush()?;

        let mut command = Command::new(&self.executable);
        command
            .arg(script.path())
            .env(RUN_AS_NODE_ENV, "1")
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        #[cfg(unix)]
        let channel = MessageChannel::open()?;
        #[cfg(unix)]
        channel.attach(&mut command);

        let mut child = command
            .spawn()
            .map_err(|source| EngineError::ChildProcess {
                program: self.executable.clone(),
                source,
            })?;
        tracing::debug!(pid = ?child.id(), executable = ?self.executable, "isolated compiler started");

        let mut stdin = child
            .stdin
            .take()
            .ok_or_else(|| EngineError::protocol("Failed to capture compiler stdin"))?;
        let mut stdout = child
            .stdout
            .take()
            .ok_or_else(|| EngineError::protocol("Failed to capture compiler stdout"))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| EngineError::protocol("Failed to capture compiler stderr"))?;

        let feed = async move {
            if let Err(e) = stdin.write_all(source.as_bytes()).await {
                tracing::warn!("Failed to write source to isolated compiler: {}", e);
            }
            // dropping stdin closes the pipe and ends the child's input
        };

        let collect = async move {
            let mut data = Vec::new();
            if let Err(e) = stdout.read_to_end(&mut data).await {
                tracing::warn!("Failed to read isolated compiler output: {}", e);
            }
            data
        };

        let diagnostics = async move {
            let mut lines = BufReader::new(stderr).lines();
            loop {
                match lines.next_line().await {
                    Ok(Some(line)) => tracing::warn!(target: "kiln::bridge", "{}", line),
                    Ok(None) => break,
                    Err(e) => {
                        tracing::warn!("Failed to read isolated compiler stderr: {}", e);
                        break;
                    }
                }
            }
        };

        #[cfg(unix)]
        let messages = channel.listen();
        #[cfg(not(unix))]
        let messages = async { Vec::new() };

        let ((), data, (), messages) = tokio::join!(feed, collect, diagnostics, messages);

        let status = child.wait().await.map_err(|source| EngineError::ChildProcess {
            program: self.executable.clone(),
            source,
        })?;
        if !status.success() {
            tracing::warn!(
                code = ?status.code(),
                bytes = data.len(),
                "isolated compiler exited unsuccessfully, keeping its output"
            );
        }

        Ok(IsolatedOutput { data, messages })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compile_script_applies_flags_first() {
        let compiler = IsolatedCompiler::new(EngineSetup::ensure(), PathBuf::from("electron"));
        let script = compiler.compile_script();

        assert!(!script.contains(FLAGS_MARKER));
        let flags_at = script.find("v8.setFlagsFromString('--no-lazy');").unwrap();
        let compile_at = script.find("new vm.Script").unwrap();
        assert!(flags_at < compile_at);
    }

    #[tokio::test]
    async fn test_missing_executable_fails_before_spawn() {
        let setup = EngineSetup::ensure();
        let err = IsolatedCompiler::locate(
            setup,
            Some(Path::new("/nonexistent/electron/binary")),
            Path::new("."),
        )
        .unwrap_err();
        assert!(matches!(err, EngineError::DependencyMissing { .. }));
    }

    #[tokio::test]
    async fn test_unspawnable_executable_is_child_process_error() {
        let compiler = IsolatedCompiler::new(
            EngineSetup::ensure(),
            PathBuf::from("/nonexistent/electron/binary"),
        );
        let err = compiler.compile("1").await.unwrap_err();
        assert!(matches!(err, EngineError::ChildProcess { .. }));
    }
}
