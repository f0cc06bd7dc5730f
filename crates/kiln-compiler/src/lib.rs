//! # Kiln Compiler
//!
//! Compiles JavaScript files ahead of time into V8 code caches and emits the
//! loader that runs them later without the source.
//!
//! - [`compile_file`]: read, strip the shebang, optionally wrap as a CommonJS
//!   module, compile (engine host or isolated compiler), write the cache and
//!   optionally the loader.
//! - [`render_loader`]: the standalone loader script registering the cache
//!   extension with Node's module system.
//! - [`ModuleTable`] / [`BytecodeHandler`]: the same load path driven from
//!   Rust against a [`ScriptEngine`](kiln_engine::ScriptEngine).
//!
//! # Example
//!
//! ```no_run
//! use kiln_compiler::{CompileOptions, Toolchain, compile_file};
//! use kiln_engine::{EngineSetup, NodeEngine, NodeHostConfig};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let setup = EngineSetup::ensure();
//!     let engine = Arc::new(NodeEngine::launch(setup, NodeHostConfig::default())?);
//!     let toolchain = Toolchain::new(setup).with_engine(engine);
//!
//!     let options = CompileOptions::builder("dist/main.js")
//!         .compile_as_module(true)
//!         .create_loader(true)
//!         .build()?;
//!     let report = compile_file(&toolchain, &options).await?;
//!     println!("wrote {}", report.cache_path.display());
//!     Ok(())
//! }
//! ```

pub mod compiler;
pub mod error;
pub mod loader;
pub mod options;
pub mod pipeline;
pub mod source;

pub use compiler::{compile, compile_bytes};
pub use error::{CompileError, CompileResult};
pub use loader::{
    BytecodeHandler, ExtensionHandler, ExtensionRegistry, ModuleTable, render_loader, write_loader,
};
pub use options::{
    CompileOptions, CompileOptionsBuilder, DEFAULT_EXTNAME, DEFAULT_LOADER_FILENAME, TargetConfig,
};
pub use pipeline::{CompileReport, Toolchain, compile_file, run_after_build};
pub use source::{prepare_source, strip_shebang};
