//! CLI command implementations.

pub mod build;
pub mod compile;
pub mod inspect;
pub mod loader;
pub mod run;

use anyhow::Result;
use std::sync::Arc;

use kiln_compiler::Toolchain;
use kiln_engine::{EngineSetup, NodeEngine, NodeHostConfig, ScriptEngine};

use crate::config::Config;

/// Start a Node engine host using the configured executable
pub(crate) fn launch_node(setup: &EngineSetup, config: &Config) -> Result<NodeEngine> {
    let engine = NodeEngine::launch(
        setup,
        NodeHostConfig {
            executable: config.node(),
            cwd: None,
        },
    )?;
    tracing::debug!(
        node = %engine.version(),
        v8 = engine.v8_version(),
        "engine host ready"
    );
    Ok(engine)
}

/// Toolchain for a set of compiles; the Node host is only started when
/// some compile does not use the isolated compiler
pub(crate) fn toolchain(config: &Config, needs_engine: bool) -> Result<Toolchain> {
    let setup = EngineSetup::ensure();
    let toolchain = Toolchain::new(setup).with_layouts(config.layouts());
    if needs_engine {
        Ok(toolchain.with_engine(Arc::new(launch_node(setup, config)?)))
    } else {
        Ok(toolchain)
    }
}
