//! Build command - compile every `[[target]]` after a bundler has run.

use anyhow::{Result, bail};
use clap::Args;

use kiln_compiler::{CompileOptions, run_after_build};

use crate::config::Config;

#[derive(Args, Debug)]
pub struct BuildCommand {
    /// Only build targets whose filename contains this string
    #[arg(long)]
    pub filter: Option<String>,
}

impl BuildCommand {
    pub async fn run(&self, config: &Config) -> Result<()> {
        let targets = config
            .targets
            .iter()
            .filter(|target| match &self.filter {
                Some(filter) => target.filename.to_string_lossy().contains(filter.as_str()),
                None => true,
            })
            .map(|target| config.target_builder(target).build())
            .collect::<Result<Vec<CompileOptions>, _>>()?;

        if targets.is_empty() {
            bail!("No [[target]] entries to build (searched from {})", config.root.display());
        }

        let needs_engine = targets.iter().any(|options| !options.electron());
        let toolchain = super::toolchain(config, needs_engine)?;
        let reports = run_after_build(&toolchain, &targets).await?;

        for report in &reports {
            println!(
                "{} -> {} ({} bytes)",
                report.source.display(),
                report.cache_path.display(),
                report.cache_len
            );
        }
        println!("built {} target(s)", reports.len());
        Ok(())
    }
}
