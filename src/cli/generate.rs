//! Generate command implementation

use anyhow::{Context, Result};
use clap::Args;
use std::path::PathBuf;

use super::utils::parse_csv;
use crate::generate::{Generator, StackRegistry};
use crate::matcher::ListMode;

#[derive(Args)]
pub struct GenerateArgs {
    /// Kind of list to write
    #[arg(short, long, value_enum, default_value_t = ListMode::Ignore)]
    pub mode: ListMode,

    /// Application stacks to include (comma-separated)
    #[arg(short, long, value_name = "STACKS")]
    pub stacks: Option<String>,

    /// Drop system certificate and private key paths instead of keeping them
    #[arg(long)]
    pub no_certs: bool,

    /// Output file (defaults to .slimignore / .slimkeep in the current directory)
    #[arg(short, long, value_name = "FILE", conflicts_with = "stdout")]
    pub file: Option<PathBuf>,

    /// Write to stdout instead of a file
    #[arg(long)]
    pub stdout: bool,

    /// List the available stacks and exit
    #[arg(long)]
    pub list: bool,
}

pub fn run(args: GenerateArgs) -> Result<()> {
    let registry = StackRegistry::builtin();

    if args.list {
        for name in registry.names() {
            println!("{}", name);
        }
        return Ok(());
    }

    let names = parse_csv(&args.stacks).unwrap_or_default();
    let generator = Generator::new(args.mode)
        .with_stacks(&registry, &names)?
        .keep_certs(!args.no_certs);

    if args.stdout {
        let stdout = std::io::stdout();
        let mut out = stdout.lock();
        generator.run(&mut out).context("Failed writing to stdout")?;
        return Ok(());
    }

    let path = args.file.unwrap_or_else(|| PathBuf::from(args.mode.default_file_name()));
    generator.run_file(&path)?;
    println!("Wrote {}", path.display());
    Ok(())
}
