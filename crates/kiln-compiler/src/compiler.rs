//! Compiler core.

use kiln_engine::ScriptEngine;

use crate::error::{CompileError, CompileResult};

/// Compile `source` into a code cache with the given engine.
///
/// The engine must have been started with lazy compilation and bytecode
/// flushing disabled (see [`EngineSetup`](kiln_engine::EngineSetup)), or inner
/// functions are missing from the cache. Engine errors propagate unchanged.
pub fn compile<E: ScriptEngine + ?Sized>(engine: &E, source: &str) -> CompileResult<Vec<u8>> {
    Ok(engine.create_cached_data(source)?)
}

/// Like [`compile`] for raw bytes, which must be UTF-8 text
pub fn compile_bytes<E: ScriptEngine + ?Sized>(engine: &E, source: &[u8]) -> CompileResult<Vec<u8>> {
    let text = std::str::from_utf8(source).map_err(|e| CompileError::TypeMismatch {
        expected: "UTF-8 script source",
        actual: format!("invalid UTF-8 at byte {}", e.valid_up_to()),
    })?;
    compile(engine, text)
}
