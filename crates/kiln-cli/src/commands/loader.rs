//! Loader command - write the loader script on its own.

use anyhow::{Context, Result};
use clap::Args;
use std::path::PathBuf;

use kiln_compiler::{DEFAULT_EXTNAME, DEFAULT_LOADER_FILENAME, write_loader};

use crate::config::Config;

#[derive(Args, Debug)]
pub struct LoaderCommand {
    /// Directory to write into
    #[arg(long, default_value = ".")]
    pub dir: PathBuf,

    /// Loader script name
    #[arg(long)]
    pub filename: Option<String>,

    /// Cache file extension the loader registers
    #[arg(long)]
    pub extname: Option<String>,
}

impl LoaderCommand {
    pub async fn run(&self, config: &Config) -> Result<()> {
        let filename = self
            .filename
            .as_deref()
            .or(config.loader.filename.as_deref())
            .unwrap_or(DEFAULT_LOADER_FILENAME);
        let extname = self
            .extname
            .as_deref()
            .or(config.loader.extname.as_deref())
            .unwrap_or(DEFAULT_EXTNAME);

        tokio::fs::create_dir_all(&self.dir)
            .await
            .with_context(|| format!("Failed to create {}", self.dir.display()))?;
        let path = write_loader(&self.dir, filename, extname, &config.layouts()).await?;
        println!("{}", path.display());
        Ok(())
    }
}
