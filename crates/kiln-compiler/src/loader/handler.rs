//! Running code caches against a [`ScriptEngine`].

use std::path::Path;

use kiln_cache::{HeaderPatcher, LayoutTable, decode_source_length, placeholder_source};
use kiln_engine::{CachedScript, EngineReference, Invocation, RunOutcome, ScriptEngine};

use crate::error::{CompileError, CompileResult};
use crate::loader::registry::ExtensionHandler;

/// Loads cache files: patch the header against the running engine, build the
/// placeholder from the declared length, run, and fail loudly on rejection.
pub struct BytecodeHandler<E> {
    patcher: HeaderPatcher<EngineReference<E>>,
    invocation: Invocation,
}

impl<E: ScriptEngine> BytecodeHandler<E> {
    /// Handler with the built-in layout table, running caches as modules
    pub fn new(engine: E) -> Self {
        Self::with_table(engine, LayoutTable::default())
    }

    /// Handler with a custom layout table
    pub fn with_table(engine: E, table: LayoutTable) -> Self {
        Self {
            patcher: HeaderPatcher::with_table(EngineReference::new(engine), table),
            invocation: Invocation::Module,
        }
    }

    /// How loaded caches are invoked (default: [`Invocation::Module`])
    pub fn invocation(mut self, invocation: Invocation) -> Self {
        self.invocation = invocation;
        self
    }

    /// The engine caches run on
    pub fn engine(&self) -> &E {
        self.patcher.reference().engine()
    }

    /// Patch and run a cache that was read from `filename`.
    ///
    /// `data` is patched in place.
    pub fn load_bytes(&self, filename: &Path, data: &mut [u8]) -> CompileResult<serde_json::Value> {
        self.patcher.patch_header(data)?;
        let placeholder = placeholder_source(decode_source_length(data)?);

        let outcome = self.engine().run_cached(&CachedScript {
            filename,
            placeholder: &placeholder,
            data,
            invocation: self.invocation,
        })?;

        match outcome {
            RunOutcome::Completed { value } => Ok(value),
            RunOutcome::Rejected => {
                tracing::warn!(path = %filename.display(), "engine rejected cached data");
                Err(CompileError::CacheRejected {
                    path: filename.to_path_buf(),
                })
            }
        }
    }
}

impl<E: ScriptEngine> ExtensionHandler for BytecodeHandler<E> {
    fn load(&self, path: &Path) -> CompileResult<serde_json::Value> {
        let mut data = std::fs::read(path).map_err(|e| CompileError::io("read", path, e))?;
        self.load_bytes(path, &mut data)
    }
}
