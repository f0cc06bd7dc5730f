use parking_lot::Mutex;
use serde::Deserialize;
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};

use kiln_cache::EngineVersion;

use super::protocol::{Op, Status, encode_run, read_frame, write_frame};
use crate::engine::{CachedScript, RunOutcome, ScriptEngine};
use crate::error::{EngineError, EngineResult};
use crate::locate::locate_node;
use crate::setup::EngineSetup;

const HOST_SCRIPT: &str = include_str!("../js/host.js");

/// Node engine host configuration
#[derive(Debug, Clone, Default)]
pub struct NodeHostConfig {
    /// Node.js executable (default: `$KILN_NODE`, then `node` in `PATH`)
    pub executable: Option<PathBuf>,
    /// Working directory of the host process
    pub cwd: Option<PathBuf>,
}

#[derive(Deserialize)]
struct HostInfo {
    node: String,
    v8: String,
}

struct HostChannel {
    child: Child,
    reader: BufReader<ChildStdout>,
    writer: BufWriter<ChildStdin>,
}

impl HostChannel {
    fn request(&mut self, op: Op, payload: &[u8]) -> EngineResult<Vec<u8>> {
        write_frame(&mut self.writer, op as u8, payload)?;
        let (tag, body) = read_frame(&mut self.reader)?;
        match Status::try_from(tag)? {
            Status::Ok => Ok(body),
            Status::Error => Err(EngineError::Script(
                String::from_utf8_lossy(&body).into_owned(),
            )),
        }
    }
}

/// V8 engine living in a Node.js host process.
///
/// Requests are serialized; the engine can be shared across threads.
pub struct NodeEngine {
    channel: Mutex<HostChannel>,
    executable: PathBuf,
    version: EngineVersion,
    v8_version: String,
}

impl NodeEngine {
    /// Spawn the host process and perform the version handshake.
    ///
    /// Script output produced while running caches goes to the host's
    /// stderr, which is inherited.
    pub fn launch(setup: &EngineSetup, config: NodeHostConfig) -> EngineResult<Self> {
        let executable = locate_node(config.executable.as_deref())?;

        let mut command = Command::new(&executable);
        command
            .args(setup.flags().as_args())
            .arg("-e")
            .arg(HOST_SCRIPT)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit());
        if let Some(cwd) = &config.cwd {
            command.current_dir(cwd);
        }

        let mut child = command.spawn().map_err(|source| EngineError::ChildProcess {
            program: executable.clone(),
            source,
        })?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| EngineError::protocol("Failed to capture engine host stdin"))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| EngineError::protocol("Failed to capture engine host stdout"))?;

        let mut channel = HostChannel {
            child,
            reader: BufReader::new(stdout),
            writer: BufWriter::new(stdin),
        };

        let info: HostInfo = serde_json::from_slice(&channel.request(Op::Version, &[])?)?;
        let version = EngineVersion::parse(&info.node)?;
        tracing::debug!(
            node = %version,
            v8 = %info.v8,
            pid = channel.child.id(),
            "engine host started"
        );

        Ok(Self {
            channel: Mutex::new(channel),
            executable,
            version,
            v8_version: info.v8,
        })
    }

    /// Path of the Node.js executable
    pub fn executable(&self) -> &Path {
        &self.executable
    }

    /// V8 version string reported by the host
    pub fn v8_version(&self) -> &str {
        &self.v8_version
    }

    /// Check whether the host process is still alive
    pub fn is_running(&self) -> bool {
        matches!(self.channel.lock().child.try_wait(), Ok(None))
    }
}

impl ScriptEngine for NodeEngine {
    fn version(&self) -> &EngineVersion {
        &self.version
    }

    fn create_cached_data(&self, source: &str) -> EngineResult<Vec<u8>> {
        let data = self
            .channel
            .lock()
            .request(Op::Compile, source.as_bytes())?;
        tracing::debug!(source_len = source.len(), cache_len = data.len(), "compiled");
        Ok(data)
    }

    fn run_cached(&self, script: &CachedScript<'_>) -> EngineResult<RunOutcome> {
        #[derive(Deserialize)]
        struct Reply {
            rejected: bool,
            value: serde_json::Value,
        }

        let payload = encode_run(script)?;
        let body = self.channel.lock().request(Op::Run, &payload)?;
        let reply: Reply = serde_json::from_slice(&body)?;

        Ok(if reply.rejected {
            RunOutcome::Rejected
        } else {
            RunOutcome::Completed { value: reply.value }
        })
    }
}

impl Drop for NodeEngine {
    fn drop(&mut self) {
        let channel = self.channel.get_mut();
        let _ = channel.child.kill();
        let _ = channel.child.wait();
    }
}
