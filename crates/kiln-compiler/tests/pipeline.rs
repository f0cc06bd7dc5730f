//! End-to-end compile pipeline against the in-memory engine.

use std::path::Path;
use std::sync::Arc;

use kiln_cache::{decode_source_length, engine_len};
use kiln_compiler::{
    CompileError, CompileOptions, Toolchain, compile_file, render_loader, run_after_build,
};
use kiln_engine::testing::FakeEngine;
use kiln_engine::{EngineError, EngineSetup, MODULE_WRAPPER_HEAD, ScriptEngine};

fn toolchain() -> (Arc<FakeEngine>, Toolchain) {
    let engine = Arc::new(FakeEngine::default());
    let toolchain = Toolchain::new(EngineSetup::ensure()).with_engine(engine.clone());
    (engine, toolchain)
}

#[tokio::test]
async fn test_shebang_stripped_before_compile() {
    let dir = tempfile::tempdir().unwrap();
    let src = dir.path().join("cli.js");
    std::fs::write(&src, "#!/usr/bin/env node\nconsole.log(1)\n").unwrap();

    let (engine, toolchain) = toolchain();
    let options = CompileOptions::builder(&src).build().unwrap();
    let report = compile_file(&toolchain, &options).await.unwrap();

    assert_eq!(engine.compiled_sources(), vec!["\nconsole.log(1)\n".to_string()]);
    assert_eq!(report.cache_path, dir.path().join("cli.bin"));
    assert_eq!(report.loader_path, None);

    let data = std::fs::read(&report.cache_path).unwrap();
    assert_eq!(report.cache_len, data.len());
    assert_eq!(
        decode_source_length(&data).unwrap() as usize,
        engine_len("\nconsole.log(1)\n")
    );
}

#[tokio::test]
async fn test_module_compile_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let src = dir.path().join("answer.js");
    std::fs::write(&src, "module.exports = 42;").unwrap();
    let out = dir.path().join("dist/nested");

    let (engine, toolchain) = toolchain();
    let options = CompileOptions::builder(&src)
        .output(&out)
        .compile_as_module(true)
        .extname("jsc")
        .create_loader(true)
        .loader_filename("boot.js")
        .build()
        .unwrap();
    let report = compile_file(&toolchain, &options).await.unwrap();

    assert_eq!(report.cache_path, out.join("answer.jsc"));
    assert_eq!(report.loader_path.as_deref(), Some(out.join("boot.js").as_path()));
    assert!(engine.compiled_sources()[0].starts_with(MODULE_WRAPPER_HEAD));

    let loader = std::fs::read_to_string(out.join("boot.js")).unwrap();
    assert_eq!(
        loader,
        render_loader(".jsc", toolchain.layouts()).unwrap()
    );

    let value = kiln_compiler::BytecodeHandler::new(engine.as_ref())
        .load_bytes(
            &report.cache_path,
            &mut std::fs::read(&report.cache_path).unwrap(),
        )
        .unwrap();
    assert_eq!(value, serde_json::json!(42));
}

#[tokio::test]
async fn test_compile_error_writes_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let src = dir.path().join("broken.js");
    std::fs::write(&src, "function () {").unwrap();

    let (_, toolchain) = toolchain();
    let options = CompileOptions::builder(&src).create_loader(true).build().unwrap();
    let err = compile_file(&toolchain, &options).await.unwrap_err();

    assert!(matches!(err, CompileError::Engine(EngineError::Script(msg)) if msg.starts_with("SyntaxError")));
    assert!(!dir.path().join("broken.bin").exists());
    assert!(!dir.path().join("loader.js").exists());
}

#[tokio::test]
async fn test_missing_source() {
    let (engine, toolchain) = toolchain();
    let options = CompileOptions::builder("/nonexistent/kiln/app.js").build().unwrap();
    let err = compile_file(&toolchain, &options).await.unwrap_err();

    assert!(matches!(err, CompileError::FileIo { op: "read", .. }));
    assert_eq!(engine.compiles(), 0);
}

#[tokio::test]
async fn test_non_utf8_source() {
    let dir = tempfile::tempdir().unwrap();
    let src = dir.path().join("bin.js");
    std::fs::write(&src, [0x31, 0xff, 0xfe]).unwrap();

    let (engine, toolchain) = toolchain();
    let options = CompileOptions::builder(&src).build().unwrap();
    let err = compile_file(&toolchain, &options).await.unwrap_err();

    assert!(matches!(err, CompileError::TypeMismatch { .. }));
    assert_eq!(engine.compiles(), 0);
}

#[tokio::test]
async fn test_electron_missing_fails_before_writing() {
    let dir = tempfile::tempdir().unwrap();
    let src = dir.path().join("main.js");
    std::fs::write(&src, "1").unwrap();

    let (engine, toolchain) = toolchain();
    let options = CompileOptions::builder(&src)
        .electron(true)
        .electron_path(dir.path().join("no-such-electron"))
        .build()
        .unwrap();
    let err = compile_file(&toolchain, &options).await.unwrap_err();

    assert!(matches!(
        err,
        CompileError::Engine(EngineError::DependencyMissing { what: "electron", .. })
    ));
    assert!(!dir.path().join("main.bin").exists());
    assert_eq!(engine.compiles(), 0);
}

#[tokio::test]
async fn test_no_engine_configured() {
    let dir = tempfile::tempdir().unwrap();
    let src = dir.path().join("main.js");
    std::fs::write(&src, "1").unwrap();

    let toolchain = Toolchain::new(EngineSetup::ensure());
    let options = CompileOptions::builder(&src).build().unwrap();
    let err = compile_file(&toolchain, &options).await.unwrap_err();
    assert!(matches!(err, CompileError::Engine(EngineError::DependencyMissing { .. })));
}

#[cfg(unix)]
#[tokio::test]
async fn test_isolated_compile_uses_electron_output() {
    use std::os::unix::fs::PermissionsExt;

    let dir = tempfile::tempdir().unwrap();
    let exe = dir.path().join("electron");
    std::fs::write(&exe, "#!/bin/sh\ncat\n").unwrap();
    std::fs::set_permissions(&exe, std::fs::Permissions::from_mode(0o755)).unwrap();

    let src = dir.path().join("main.js");
    std::fs::write(&src, "#!/usr/bin/env node\nmodule.exports = 1;").unwrap();

    let (engine, toolchain) = toolchain();
    let options = CompileOptions::builder(&src)
        .electron(true)
        .electron_path(&exe)
        .compile_as_module(true)
        .build()
        .unwrap();
    let report = compile_file(&toolchain, &options).await.unwrap();

    // the stand-in echoes its input, so the cache is the prepared source
    let written = std::fs::read_to_string(&report.cache_path).unwrap();
    assert_eq!(written, kiln_engine::wrap_module("\nmodule.exports = 1;"));
    assert_eq!(engine.compiles(), 0);
}

#[tokio::test]
async fn test_run_after_build_in_order() {
    let dir = tempfile::tempdir().unwrap();
    for (name, body) in [("a.js", "1"), ("b.js", "2")] {
        std::fs::write(dir.path().join(name), body).unwrap();
    }

    let (engine, toolchain) = toolchain();
    let targets = ["a.js", "b.js"]
        .iter()
        .map(|name| CompileOptions::builder(dir.path().join(name)).build().unwrap())
        .collect::<Vec<_>>();
    let reports = run_after_build(&toolchain, &targets).await.unwrap();

    assert_eq!(reports.len(), 2);
    assert_eq!(engine.compiled_sources(), vec!["1".to_string(), "2".to_string()]);
    assert!(Path::new(&reports[1].cache_path).ends_with("b.bin"));
}

#[tokio::test]
async fn test_run_after_build_stops_at_first_failure() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("ok.js"), "1").unwrap();

    let (engine, toolchain) = toolchain();
    let targets = vec![
        CompileOptions::builder(dir.path().join("missing.js")).build().unwrap(),
        CompileOptions::builder(dir.path().join("ok.js")).build().unwrap(),
    ];
    assert!(run_after_build(&toolchain, &targets).await.is_err());
    assert_eq!(engine.compiles(), 0);
    assert!(!dir.path().join("ok.bin").exists());
}

#[test]
fn test_engine_version_reported() {
    let (engine, _) = toolchain();
    assert_eq!(engine.version().to_string(), "22.12.0");
}
