//! Loading compiled caches.
//!
//! Two consumers share the same patch-then-run sequence:
//!
//! - the generated `loader.js` ([`render_loader`]), which registers the cache
//!   extension with Node's own module system at runtime;
//! - [`ModuleTable`] with a [`BytecodeHandler`], which drives a
//!   [`ScriptEngine`](kiln_engine::ScriptEngine) from Rust (`kiln run`).

mod handler;
mod registry;
mod template;

pub use handler::BytecodeHandler;
pub use registry::{ExtensionHandler, ExtensionRegistry, ModuleTable};
pub use template::{render_loader, write_loader};
