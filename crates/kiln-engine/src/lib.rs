//! # Kiln Engine
//!
//! The script engine side of kiln. Everything that needs a live engine goes
//! through [`ScriptEngine`]:
//!
//! - [`NodeEngine`]: a long-lived Node.js host process, configured once at
//!   spawn, driven over a framed stdio protocol. It produces caches, serves
//!   as the reference for header patching and runs cached scripts.
//! - [`IsolatedCompiler`]: one-shot compiles in a separate Electron process
//!   forced into plain Node mode, for applications whose own engine cannot
//!   be reconfigured.
//!
//! Engine flags are process-wide and must be fixed before the first parse,
//! so every engine constructor takes the [`EngineSetup`] token.
//!
//! # Example
//!
//! ```no_run
//! use kiln_engine::{EngineSetup, NodeEngine, NodeHostConfig, ScriptEngine};
//!
//! let setup = EngineSetup::ensure();
//! let engine = NodeEngine::launch(setup, NodeHostConfig::default())?;
//! let cache = engine.create_cached_data("console.log('hi')")?;
//! println!("{} bytes for node {}", cache.len(), engine.version());
//! # Ok::<(), kiln_engine::EngineError>(())
//! ```

#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod bridge;
#[cfg(unix)]
pub mod channel;
pub mod engine;
pub mod error;
pub mod locate;
pub mod node;
pub mod setup;
#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use bridge::{IsolatedCompiler, IsolatedOutput, RUN_AS_NODE_ENV};
pub use engine::{
    CachedScript, EngineReference, Invocation, MODULE_WRAPPER_HEAD, MODULE_WRAPPER_TAIL,
    RunOutcome, ScriptEngine, wrap_module,
};
pub use error::{EngineError, EngineResult};
pub use locate::{locate_electron, locate_node};
pub use node::{NodeEngine, NodeHostConfig};
pub use setup::{EngineFlags, EngineSetup};

pub use kiln_cache::EngineVersion;
