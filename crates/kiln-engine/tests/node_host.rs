//! Round trips through a real Node.js engine host.

use kiln_cache::{HeaderPatcher, decode_source_length, engine_len, placeholder_source};
use kiln_engine::{
    CachedScript, EngineReference, EngineSetup, Invocation, NodeEngine, NodeHostConfig,
    RunOutcome, ScriptEngine, wrap_module,
};
use std::path::Path;

fn engine() -> NodeEngine {
    NodeEngine::launch(EngineSetup::ensure(), NodeHostConfig::default()).unwrap()
}

fn load(engine: &NodeEngine, mut data: Vec<u8>, invocation: Invocation) -> RunOutcome {
    HeaderPatcher::new(EngineReference::new(engine))
        .patch_header(&mut data)
        .unwrap();
    let placeholder = placeholder_source(decode_source_length(&data).unwrap());
    engine
        .run_cached(&CachedScript {
            filename: Path::new("/tmp/kiln-test.bin"),
            placeholder: &placeholder,
            data: &data,
            invocation,
        })
        .unwrap()
}

#[test]
#[ignore = "requires node binary"]
fn test_length_field_matches_source() {
    let engine = engine();
    let source = "function add(a, b) { return a + b }\nadd(1, 2)";
    let data = engine.create_cached_data(source).unwrap();
    assert_eq!(decode_source_length(&data).unwrap() as usize, engine_len(source));
}

#[test]
#[ignore = "requires node binary"]
fn test_script_round_trip() {
    let engine = engine();
    let data = engine
        .create_cached_data("(function () { const xs = [1, 2, 3]; return xs.map(x => x * 2) })()")
        .unwrap();
    assert_eq!(
        load(&engine, data, Invocation::Script),
        RunOutcome::Completed {
            value: serde_json::json!([2, 4, 6])
        }
    );
}

#[test]
#[ignore = "requires node binary"]
fn test_module_round_trip() {
    let engine = engine();
    let data = engine
        .create_cached_data(&wrap_module("module.exports = 42;"))
        .unwrap();
    assert_eq!(
        load(&engine, data, Invocation::Module),
        RunOutcome::Completed {
            value: serde_json::json!(42)
        }
    );
}

#[test]
#[ignore = "requires node binary"]
fn test_syntax_error_surfaces() {
    let engine = engine();
    let err = engine.create_cached_data("function (").unwrap_err();
    assert!(err.to_string().contains("SyntaxError"));
    assert!(engine.is_running());
}
