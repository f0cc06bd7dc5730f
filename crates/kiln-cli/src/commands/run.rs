//! Run command - load a code cache on the engine host.

use anyhow::Result;
use clap::Args;
use std::path::PathBuf;
use std::sync::Arc;

use kiln_compiler::{BytecodeHandler, ExtensionRegistry, ModuleTable};
use kiln_engine::{EngineSetup, Invocation};

use crate::config::Config;

#[derive(Args, Debug)]
pub struct RunCommand {
    /// Cache file
    pub cache: PathBuf,

    /// The cache was compiled as a CommonJS module; print its exports
    #[arg(long)]
    pub module: bool,
}

impl RunCommand {
    pub fn run(&self, config: &Config) -> Result<()> {
        let engine = super::launch_node(EngineSetup::ensure(), config)?;
        let invocation = if self.module {
            Invocation::Module
        } else {
            Invocation::Script
        };
        let handler = BytecodeHandler::with_table(engine, config.layouts()).invocation(invocation);

        let ext = self
            .cache
            .extension()
            .map(|ext| ext.to_string_lossy().into_owned())
            .unwrap_or_default();
        let mut table = ModuleTable::new();
        table.register(&ext, Arc::new(handler))?;

        let value = table.require(&self.cache)?;
        println!("{}", serde_json::to_string_pretty(&value)?);
        Ok(())
    }
}
