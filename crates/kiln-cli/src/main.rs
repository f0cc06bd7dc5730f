//! kiln CLI - ahead-of-time V8 code caches for JavaScript.

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::filter::EnvFilter;

mod commands;
mod config;

#[derive(Parser)]
#[command(
    name = "kiln",
    version,
    about = "Compile JavaScript into V8 code caches",
    long_about = "kiln compiles JavaScript ahead of time into V8 code caches and emits a loader\n\
                  that runs them later without the original source.\n\n\
                  Compile a file:   kiln compile dist/main.js --module --loader\n\
                  After a bundler:  kiln build\n\
                  Inspect a cache:  kiln inspect dist/main.bin"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Config file path
    #[arg(long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Compile one JavaScript file into a code cache
    Compile(commands::compile::CompileCommand),

    /// Compile every [[target]] from kiln.toml
    Build(commands::build::BuildCommand),

    /// Write a loader script only
    Loader(commands::loader::LoaderCommand),

    /// Show the header fields of a code cache
    Inspect(commands::inspect::InspectCommand),

    /// Load a code cache on a Node engine host and print its result
    Run(commands::run::RunCommand),
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(level.parse()?))
        .with_writer(std::io::stderr)
        .init();

    let config = config::load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Compile(cmd) => cmd.run(&config).await,
        Commands::Build(cmd) => cmd.run(&config).await,
        Commands::Loader(cmd) => cmd.run(&config).await,
        Commands::Inspect(cmd) => cmd.run(),
        Commands::Run(cmd) => cmd.run(&config),
    }
}
