//! File-level compile pipeline.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use kiln_cache::{LayoutTable, engine_len};
use kiln_engine::{EngineError, EngineSetup, IsolatedCompiler, ScriptEngine};

use crate::compiler::compile;
use crate::error::{CompileError, CompileResult};
use crate::loader::write_loader;
use crate::options::CompileOptions;
use crate::source::prepare_source;

/// Everything a compile needs besides its options
#[derive(Clone)]
pub struct Toolchain {
    setup: &'static EngineSetup,
    engine: Option<Arc<dyn ScriptEngine>>,
    layouts: LayoutTable,
}

impl Toolchain {
    /// Toolchain without an in-process engine; only isolated compiles work
    /// until [`with_engine`](Self::with_engine) is called
    pub fn new(setup: &'static EngineSetup) -> Self {
        Self {
            setup,
            engine: None,
            layouts: LayoutTable::default(),
        }
    }

    /// Engine used for non-isolated compiles
    pub fn with_engine(mut self, engine: Arc<dyn ScriptEngine>) -> Self {
        self.engine = Some(engine);
        self
    }

    /// Header layouts embedded into generated loaders
    pub fn with_layouts(mut self, layouts: LayoutTable) -> Self {
        self.layouts = layouts;
        self
    }

    /// The configured engine, if any
    pub fn engine(&self) -> Option<&Arc<dyn ScriptEngine>> {
        self.engine.as_ref()
    }

    /// Header layouts
    pub fn layouts(&self) -> &LayoutTable {
        &self.layouts
    }
}

/// Result of compiling one file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompileReport {
    /// Source file
    pub source: PathBuf,
    /// Written cache
    pub cache_path: PathBuf,
    /// Written loader, when requested
    pub loader_path: Option<PathBuf>,
    /// Length of the compiled source in UTF-16 units
    pub source_len: usize,
    /// Size of the cache in bytes
    pub cache_len: usize,
}

/// Compile one file according to `options`.
///
/// Reads the source, strips a shebang line, wraps it as a CommonJS module
/// when requested, compiles it (isolated when `options.electron()`), writes
/// `<output>/<stem><extname>` and, if requested, the loader next to it. The
/// output directory is created if missing.
pub async fn compile_file(
    toolchain: &Toolchain,
    options: &CompileOptions,
) -> CompileResult<CompileReport> {
    let path = options.filename();
    let bytes = tokio::fs::read(path)
        .await
        .map_err(|e| CompileError::io("read", path, e))?;
    let text = String::from_utf8(bytes).map_err(|e| CompileError::TypeMismatch {
        expected: "UTF-8 script source",
        actual: format!(
            "invalid UTF-8 at byte {} of {}",
            e.utf8_error().valid_up_to(),
            path.display()
        ),
    })?;

    let source = prepare_source(&text, options.compile_as_module());

    let cache = if options.electron() {
        let search_from = source_dir(path);
        let compiler =
            IsolatedCompiler::locate(toolchain.setup, options.electron_path(), &search_from)?;
        tracing::debug!(
            executable = %compiler.executable().display(),
            "compiling in isolated process"
        );
        compiler.compile(&source).await?
    } else {
        let engine = toolchain.engine().ok_or_else(|| {
            CompileError::Engine(EngineError::missing(
                "script engine",
                "start a Node host or enable the isolated compiler",
            ))
        })?;
        compile(engine.as_ref(), &source)?
    };

    let output = options.output();
    tokio::fs::create_dir_all(output)
        .await
        .map_err(|e| CompileError::io("create directory", output, e))?;

    let cache_path = options.cache_path();
    tokio::fs::write(&cache_path, &cache)
        .await
        .map_err(|e| CompileError::io("write cache", &cache_path, e))?;

    let loader_path = if options.create_loader() {
        Some(
            write_loader(
                output,
                options.loader_filename(),
                options.extname(),
                &toolchain.layouts,
            )
            .await?,
        )
    } else {
        None
    };

    let report = CompileReport {
        source: path.to_path_buf(),
        cache_path,
        loader_path,
        source_len: engine_len(&source),
        cache_len: cache.len(),
    };
    tracing::info!(
        source = %report.source.display(),
        cache = %report.cache_path.display(),
        bytes = report.cache_len,
        "compiled"
    );
    Ok(report)
}

/// Compile every target in order, stopping at the first failure.
///
/// Meant to run after a bundler has written its output files.
pub async fn run_after_build(
    toolchain: &Toolchain,
    targets: &[CompileOptions],
) -> CompileResult<Vec<CompileReport>> {
    let mut reports = Vec::with_capacity(targets.len());
    for options in targets {
        reports.push(compile_file(toolchain, options).await?);
    }
    Ok(reports)
}

fn source_dir(path: &Path) -> PathBuf {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}
