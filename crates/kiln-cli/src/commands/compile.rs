//! Compile command - turn one JavaScript file into a code cache.
//!
//! Usage:
//! - `kiln compile dist/main.js` - writes `dist/main.bin`
//! - `kiln compile app.js --module --loader -o build` - also writes `build/loader.js`
//! - `kiln compile main.js --electron` - compile with the project's Electron

use anyhow::Result;
use clap::Args;
use std::path::PathBuf;

use kiln_compiler::compile_file;

use crate::config::Config;

#[derive(Args, Debug)]
pub struct CompileCommand {
    /// Source file
    pub file: PathBuf,

    /// Output directory (default: the source's directory)
    #[arg(short = 'o', long)]
    pub output: Option<PathBuf>,

    /// Wrap the source as a CommonJS module before compiling
    #[arg(long = "module")]
    pub compile_as_module: bool,

    /// Compile in an isolated Electron process
    #[arg(long)]
    pub electron: bool,

    /// Electron executable (implies --electron)
    #[arg(long, value_name = "PATH")]
    pub electron_path: Option<PathBuf>,

    /// Also write the loader script
    #[arg(long = "loader")]
    pub create_loader: bool,

    /// Loader script name
    #[arg(long, value_name = "NAME")]
    pub loader_filename: Option<String>,

    /// Cache file extension
    #[arg(long, value_name = "EXT")]
    pub extname: Option<String>,
}

impl CompileCommand {
    pub async fn run(&self, config: &Config) -> Result<()> {
        let electron = self.electron || self.electron_path.is_some();

        let mut builder = config
            .base_builder()
            .filename(&self.file)
            .compile_as_module(self.compile_as_module)
            .electron(electron)
            .create_loader(self.create_loader);
        if let Some(output) = &self.output {
            builder = builder.output(output);
        }
        if let Some(path) = &self.electron_path {
            builder = builder.electron_path(path);
        }
        if let Some(name) = &self.loader_filename {
            builder = builder.loader_filename(name);
        }
        if let Some(ext) = &self.extname {
            builder = builder.extname(ext);
        }
        let options = builder.build()?;

        let toolchain = super::toolchain(config, !electron)?;
        let report = compile_file(&toolchain, &options).await?;

        println!(
            "{} -> {} ({} bytes)",
            report.source.display(),
            report.cache_path.display(),
            report.cache_len
        );
        if let Some(loader) = &report.loader_path {
            println!("loader: {}", loader.display());
        }
        Ok(())
    }
}
