//! Command-line interface for slimtree
//!
//! Provides `materialize`, `check` and `generate` subcommands.

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::Level;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod check;
mod generate;
mod materialize;
mod utils;

/// Prune traced container filesystems into minimal image trees
#[derive(Parser)]
#[command(name = "slimtree")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging (sets log level to DEBUG)
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the pruned tree from a tracer report
    Materialize(Box<materialize::MaterializeArgs>),

    /// Show the keep/drop verdict of the active match list for paths
    Check(check::CheckArgs),

    /// Write a starter .slimignore or .slimkeep file
    Generate(generate::GenerateArgs),
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();

    // RUST_LOG in the environment always takes precedence; --verbose falls back to DEBUG.
    let filter = if cli.verbose {
        EnvFilter::from_default_env().add_directive(Level::DEBUG.into())
    } else {
        EnvFilter::from_default_env().add_directive(Level::WARN.into())
    };
    let _ = tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .try_init();

    match cli.command {
        Commands::Materialize(args) => materialize::run(*args),
        Commands::Check(args) => check::run(args),
        Commands::Generate(args) => generate::run(args),
    }
}
