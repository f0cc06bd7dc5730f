//! The generated loader against a real Node.js.

use std::process::Command;
use std::sync::Arc;

use kiln_compiler::{
    BytecodeHandler, CompileOptions, ExtensionRegistry, ModuleTable, Toolchain, compile_file,
};
use kiln_engine::{EngineSetup, NodeEngine, NodeHostConfig, ScriptEngine};

fn node_toolchain() -> (Arc<NodeEngine>, Toolchain) {
    let setup = EngineSetup::ensure();
    let engine = Arc::new(NodeEngine::launch(setup, NodeHostConfig::default()).unwrap());
    let toolchain = Toolchain::new(setup).with_engine(engine.clone());
    (engine, toolchain)
}

#[tokio::test]
#[ignore = "requires node binary"]
async fn test_loader_runs_compiled_module() {
    let dir = tempfile::tempdir().unwrap();
    let src = dir.path().join("answer.js");
    std::fs::write(
        &src,
        "#!/usr/bin/env node\nfunction answer() { return 42; }\nmodule.exports = { answer: answer() };\n",
    )
    .unwrap();

    let (engine, toolchain) = node_toolchain();
    let options = CompileOptions::builder(&src)
        .compile_as_module(true)
        .create_loader(true)
        .build()
        .unwrap();
    let report = compile_file(&toolchain, &options).await.unwrap();
    std::fs::remove_file(&src).unwrap();

    let output = Command::new(engine.executable())
        .current_dir(dir.path())
        .arg("-e")
        .arg("require('./loader.js'); process.stdout.write(JSON.stringify(require('./answer.bin')));")
        .output()
        .unwrap();
    assert!(
        output.status.success(),
        "{}",
        String::from_utf8_lossy(&output.stderr)
    );
    assert_eq!(String::from_utf8_lossy(&output.stdout), "{\"answer\":42}");
    assert!(report.loader_path.is_some());
}

#[tokio::test]
#[ignore = "requires node binary"]
async fn test_loader_rejects_foreign_bytes() {
    let dir = tempfile::tempdir().unwrap();
    let src = dir.path().join("x.js");
    std::fs::write(&src, "module.exports = 1;").unwrap();

    let (engine, toolchain) = node_toolchain();
    let options = CompileOptions::builder(&src)
        .compile_as_module(true)
        .create_loader(true)
        .build()
        .unwrap();
    let report = compile_file(&toolchain, &options).await.unwrap();

    let mut data = std::fs::read(&report.cache_path).unwrap();
    // the magic number is checked before anything else
    for byte in &mut data[..4] {
        *byte ^= 0xff;
    }
    std::fs::write(&report.cache_path, data).unwrap();

    let output = Command::new(engine.executable())
        .current_dir(dir.path())
        .arg("-e")
        .arg("require('./loader.js'); require('./x.bin');")
        .output()
        .unwrap();
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("cachedDataRejected"));
}

#[tokio::test]
#[ignore = "requires node binary"]
async fn test_module_table_on_node_host() {
    let dir = tempfile::tempdir().unwrap();
    let src = dir.path().join("lib.js");
    std::fs::write(&src, "exports.sum = [1, 2, 3].reduce((a, b) => a + b, 0);").unwrap();

    let (engine, toolchain) = node_toolchain();
    let options = CompileOptions::builder(&src).compile_as_module(true).build().unwrap();
    let report = compile_file(&toolchain, &options).await.unwrap();

    let mut table = ModuleTable::new();
    table
        .register(".bin", Arc::new(BytecodeHandler::new(engine.clone())))
        .unwrap();
    assert_eq!(
        table.require(&report.cache_path).unwrap(),
        serde_json::json!({ "sum": 6 })
    );
    assert!(engine.version().major >= 12);
}
