//! Engine capability shared by every host.

use serde::Serialize;
use std::borrow::Cow;
use std::path::Path;
use std::sync::{Arc, OnceLock};

use kiln_cache::{CacheError, CacheResult, EngineVersion, REFERENCE_SOURCE, ReferenceSource};

use crate::error::EngineResult;

/// Opening of the CommonJS module wrapper (`Module.wrap`)
pub const MODULE_WRAPPER_HEAD: &str =
    "(function (exports, require, module, __filename, __dirname) { ";

/// Closing of the CommonJS module wrapper
pub const MODULE_WRAPPER_TAIL: &str = "\n});";

/// Wrap a script body the way Node's CommonJS loader does
pub fn wrap_module(body: &str) -> String {
    let mut wrapped =
        String::with_capacity(MODULE_WRAPPER_HEAD.len() + body.len() + MODULE_WRAPPER_TAIL.len());
    wrapped.push_str(MODULE_WRAPPER_HEAD);
    wrapped.push_str(body);
    wrapped.push_str(MODULE_WRAPPER_TAIL);
    wrapped
}

/// How the result of a cached script is used
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Invocation {
    /// The completion value of the script is the result
    Script,
    /// The script evaluates to a module wrapper function, which is called with
    /// `(exports, require, module, __filename, __dirname, process, global)`;
    /// `module.exports` is the result
    Module,
}

/// A cache to be validated against a placeholder and executed
#[derive(Debug, Clone, Copy)]
pub struct CachedScript<'a> {
    /// File name reported in stack traces
    pub filename: &'a Path,
    /// Placeholder source of the declared length
    pub placeholder: &'a str,
    /// Patched cache bytes
    pub data: &'a [u8],
    /// How to treat the evaluated result
    pub invocation: Invocation,
}

/// Result of running a cached script
#[derive(Debug, Clone, PartialEq)]
pub enum RunOutcome {
    /// The engine refused the cache
    Rejected,
    /// The script ran; `value` is its JSON-projected result
    Completed {
        /// Completion value or `module.exports`
        value: serde_json::Value,
    },
}

/// A script engine able to produce and consume code caches
pub trait ScriptEngine: Send + Sync {
    /// Version of the host runtime (e.g. Node `v20.11.1`)
    fn version(&self) -> &EngineVersion;

    /// Compile `source` and serialize its code cache.
    ///
    /// Engine compile errors are returned unchanged as [`EngineError::Script`](crate::EngineError::Script).
    fn create_cached_data(&self, source: &str) -> EngineResult<Vec<u8>>;

    /// Validate `script.data` against the placeholder and, if accepted, run it
    fn run_cached(&self, script: &CachedScript<'_>) -> EngineResult<RunOutcome>;
}

impl<T: ScriptEngine + ?Sized> ScriptEngine for &T {
    fn version(&self) -> &EngineVersion {
        (**self).version()
    }

    fn create_cached_data(&self, source: &str) -> EngineResult<Vec<u8>> {
        (**self).create_cached_data(source)
    }

    fn run_cached(&self, script: &CachedScript<'_>) -> EngineResult<RunOutcome> {
        (**self).run_cached(script)
    }
}

impl<T: ScriptEngine + ?Sized> ScriptEngine for Arc<T> {
    fn version(&self) -> &EngineVersion {
        (**self).version()
    }

    fn create_cached_data(&self, source: &str) -> EngineResult<Vec<u8>> {
        (**self).create_cached_data(source)
    }

    fn run_cached(&self, script: &CachedScript<'_>) -> EngineResult<RunOutcome> {
        (**self).run_cached(script)
    }
}

/// Uses an engine as the reference for header patching.
///
/// The reference cache is compiled on first use and kept, since the engine
/// instance does not change for the lifetime of this value.
pub struct EngineReference<E> {
    engine: E,
    cache: OnceLock<Vec<u8>>,
}

impl<E: ScriptEngine> EngineReference<E> {
    /// Wrap an engine
    pub fn new(engine: E) -> Self {
        Self {
            engine,
            cache: OnceLock::new(),
        }
    }

    /// The wrapped engine
    pub fn engine(&self) -> &E {
        &self.engine
    }
}

impl<E: ScriptEngine> ReferenceSource for EngineReference<E> {
    fn engine_version(&self) -> &EngineVersion {
        self.engine.version()
    }

    fn reference_cache(&self) -> CacheResult<Cow<'_, [u8]>> {
        if let Some(bytes) = self.cache.get() {
            return Ok(Cow::Borrowed(bytes));
        }

        let bytes = self
            .engine
            .create_cached_data(REFERENCE_SOURCE)
            .map_err(|e| CacheError::reference(e.to_string()))?;
        tracing::debug!(len = bytes.len(), "compiled reference cache");
        Ok(Cow::Borrowed(self.cache.get_or_init(|| bytes)))
    }
}
