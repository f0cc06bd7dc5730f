//! Node.js engine host.
//!
//! Node exposes V8's code cache through `vm.Script#createCachedData` and
//! validates caches through the `cachedData` option, so a Node process is the
//! engine. One host process is started per [`NodeEngine`]; its V8 flags are
//! set on the command line, i.e. before any script is parsed.

mod host;
pub mod protocol;

pub use host::{NodeEngine, NodeHostConfig};
