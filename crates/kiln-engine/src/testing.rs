//! Deterministic in-memory engine for tests.
//!
//! Caches have the layout `[magic 8][source length u32 LE][fingerprint 8][source]`,
//! so they exercise the same header handling as real V8 caches. A cache is
//! rejected when its magic or fingerprint differs from the engine's or when the
//! placeholder length does not match the declared length. "Running" understands
//! just enough to return JSON completion values and `module.exports = <json>;`
//! / `exports.<name> = <json>;` assignments.

use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use kiln_cache::{EngineVersion, decode_source_length, engine_len};

use crate::engine::{
    CachedScript, Invocation, MODULE_WRAPPER_HEAD, MODULE_WRAPPER_TAIL, RunOutcome, ScriptEngine,
};
use crate::error::{EngineError, EngineResult};

/// Magic bytes of fake caches
pub const FAKE_MAGIC: [u8; 8] = *b"KILNFAKE";

const PAYLOAD_OFFSET: usize = 20;

/// In-memory engine with a fixed version and build fingerprint
pub struct FakeEngine {
    version: EngineVersion,
    fingerprint: [u8; 8],
    compiled: Mutex<Vec<String>>,
    runs: AtomicUsize,
}

impl Default for FakeEngine {
    fn default() -> Self {
        Self::new(EngineVersion::new(22, 12, 0), 0x5eed)
    }
}

impl FakeEngine {
    /// Engine reporting `version` whose caches carry `build` as fingerprint
    pub fn new(version: EngineVersion, build: u64) -> Self {
        Self {
            version,
            fingerprint: build.to_le_bytes(),
            compiled: Mutex::new(Vec::new()),
            runs: AtomicUsize::new(0),
        }
    }

    /// Number of `create_cached_data` calls
    pub fn compiles(&self) -> usize {
        self.compiled.lock().len()
    }

    /// Sources passed to `create_cached_data`, in order
    pub fn compiled_sources(&self) -> Vec<String> {
        self.compiled.lock().clone()
    }

    /// Number of `run_cached` calls
    pub fn runs(&self) -> usize {
        self.runs.load(Ordering::SeqCst)
    }

    /// Build fingerprint written into caches
    pub fn fingerprint(&self) -> [u8; 8] {
        self.fingerprint
    }
}

impl ScriptEngine for FakeEngine {
    fn version(&self) -> &EngineVersion {
        &self.version
    }

    fn create_cached_data(&self, source: &str) -> EngineResult<Vec<u8>> {
        self.compiled.lock().push(source.to_string());
        check_balanced(source)?;

        let mut data = Vec::with_capacity(PAYLOAD_OFFSET + source.len());
        data.extend_from_slice(&FAKE_MAGIC);
        data.extend_from_slice(&(engine_len(source) as u32).to_le_bytes());
        data.extend_from_slice(&self.fingerprint);
        data.extend_from_slice(source.as_bytes());
        Ok(data)
    }

    fn run_cached(&self, script: &CachedScript<'_>) -> EngineResult<RunOutcome> {
        self.runs.fetch_add(1, Ordering::SeqCst);

        let data = script.data;
        if data.len() < PAYLOAD_OFFSET
            || data[..8] != FAKE_MAGIC
            || data[12..PAYLOAD_OFFSET] != self.fingerprint
            || decode_source_length(data)? as usize != engine_len(script.placeholder)
        {
            return Ok(RunOutcome::Rejected);
        }

        let source = std::str::from_utf8(&data[PAYLOAD_OFFSET..])
            .map_err(|e| EngineError::Script(format!("corrupt cache payload: {}", e)))?;

        let value = match script.invocation {
            Invocation::Script => serde_json::from_str(source.trim().trim_end_matches(';'))
                .unwrap_or(serde_json::Value::Null),
            Invocation::Module => {
                let body = source
                    .strip_prefix(MODULE_WRAPPER_HEAD)
                    .and_then(|rest| rest.strip_suffix(MODULE_WRAPPER_TAIL))
                    .ok_or_else(|| {
                        EngineError::Script("TypeError: compiledWrapper.apply is not a function".into())
                    })?;
                evaluate_exports(body)
            }
        };

        Ok(RunOutcome::Completed { value })
    }
}

fn check_balanced(source: &str) -> EngineResult<()> {
    let mut depth = 0i64;
    for c in source.chars() {
        match c {
            '(' | '{' | '[' => depth += 1,
            ')' | '}' | ']' => depth -= 1,
            _ => {}
        }
        if depth < 0 {
            break;
        }
    }
    if depth == 0 {
        Ok(())
    } else {
        Err(EngineError::Script("SyntaxError: Unexpected end of input".into()))
    }
}

fn evaluate_exports(body: &str) -> serde_json::Value {
    let mut exports = serde_json::Value::Object(Default::default());
    for statement in body.split([';', '\n']) {
        let statement = statement.trim();
        if let Some(rhs) = statement.strip_prefix("module.exports =") {
            if let Ok(value) = serde_json::from_str(rhs.trim()) {
                exports = value;
            }
        } else if let Some(assign) = statement.strip_prefix("exports.")
            && let Some((name, rhs)) = assign.split_once('=')
            && let Ok(value) = serde_json::from_str(rhs.trim())
            && let serde_json::Value::Object(map) = &mut exports
        {
            map.insert(name.trim().to_string(), value);
        }
    }
    exports
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::wrap_module;
    use kiln_cache::placeholder_source;
    use std::path::Path;

    fn run(engine: &FakeEngine, data: &[u8], invocation: Invocation) -> RunOutcome {
        let placeholder = placeholder_source(decode_source_length(data).unwrap());
        engine
            .run_cached(&CachedScript {
                filename: Path::new("test.bin"),
                placeholder: &placeholder,
                data,
                invocation,
            })
            .unwrap()
    }

    #[test]
    fn test_cache_layout() {
        let engine = FakeEngine::default();
        let data = engine.create_cached_data("42").unwrap();
        assert_eq!(&data[..8], b"KILNFAKE");
        assert_eq!(decode_source_length(&data).unwrap(), 2);
        assert_eq!(&data[12..20], &engine.fingerprint());
        assert_eq!(&data[20..], b"42");
    }

    #[test]
    fn test_syntax_error() {
        let engine = FakeEngine::default();
        let err = engine.create_cached_data("function () {").unwrap_err();
        assert!(matches!(err, EngineError::Script(msg) if msg.starts_with("SyntaxError")));
        assert_eq!(engine.compiles(), 1);
    }

    #[test]
    fn test_script_completion_value() {
        let engine = FakeEngine::default();
        let data = engine.create_cached_data("[1, 2, 3]").unwrap();
        assert_eq!(
            run(&engine, &data, Invocation::Script),
            RunOutcome::Completed {
                value: serde_json::json!([1, 2, 3])
            }
        );
    }

    #[test]
    fn test_module_exports() {
        let engine = FakeEngine::default();
        let data = engine
            .create_cached_data(&wrap_module("exports.a = 1;\nexports.b = \"two\";"))
            .unwrap();
        assert_eq!(
            run(&engine, &data, Invocation::Module),
            RunOutcome::Completed {
                value: serde_json::json!({ "a": 1, "b": "two" })
            }
        );
    }

    #[test]
    fn test_foreign_fingerprint_rejected() {
        let producer = FakeEngine::new(EngineVersion::new(20, 0, 0), 1);
        let consumer = FakeEngine::new(EngineVersion::new(22, 0, 0), 2);
        let data = producer.create_cached_data("123").unwrap();
        assert_eq!(run(&consumer, &data, Invocation::Script), RunOutcome::Rejected);
    }

    #[test]
    fn test_wrong_placeholder_rejected() {
        let engine = FakeEngine::default();
        let data = engine.create_cached_data("12345").unwrap();
        let outcome = engine
            .run_cached(&CachedScript {
                filename: Path::new("test.bin"),
                placeholder: "\"\"",
                data: &data,
                invocation: Invocation::Script,
            })
            .unwrap();
        assert_eq!(outcome, RunOutcome::Rejected);
    }
}
