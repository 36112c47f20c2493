//! Materialize command implementation

use anyhow::{Context, Result};
use clap::Args;
use std::path::PathBuf;

use super::utils::{current_dir, parse_csv_multi, resolve_config};
use crate::config::{build_file_list, CliOverrides};
use crate::domain::{ArtifactReport, DependencyFailurePolicy};
use crate::matcher::ListMode;
use crate::select::ArtifactSelector;
use crate::store::{LddResolver, MaterializeOptions, Materializer};

#[derive(Args)]
pub struct MaterializeArgs {
    /// Tracer report (JSON) listing the artifacts the application touched
    #[arg(short, long, value_name = "FILE")]
    pub report: PathBuf,

    /// Store location; the pruned tree is written to <STORE>/files
    #[arg(short, long, value_name = "DIR")]
    pub store: PathBuf,

    /// Match list mode
    #[arg(short, long, value_enum)]
    pub mode: Option<ListMode>,

    /// Match list file (defaults to .slimignore / .slimkeep in the current directory)
    #[arg(long, value_name = "FILE")]
    pub match_file: Option<PathBuf>,

    /// Config file (defaults to slimtree.toml / .slimtree.yml discovery)
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// User the application runs as; forces /etc/passwd into the tree
    #[arg(long, value_name = "USER")]
    pub app_user: Option<String>,

    /// Do not carry over owner and modification time of copied files
    #[arg(long)]
    pub no_keep_perms: bool,

    /// Permission overrides as PATH:MODE[#UID#GID] (repeatable, comma-separated)
    #[arg(long, value_name = "SPEC")]
    pub path_perms: Vec<String>,

    /// What to do with a binary whose libraries cannot be resolved
    #[arg(long, value_enum)]
    pub dependency_failure: Option<DependencyFailurePolicy>,

    /// Staging directory that is always excluded
    #[arg(long, value_name = "DIR")]
    pub staging_dir: Option<String>,

    /// ldd-compatible program used to resolve shared libraries
    #[arg(long, value_name = "PROGRAM", default_value = "ldd")]
    pub ldd: PathBuf,

    /// Print run statistics as JSON
    #[arg(long)]
    pub json: bool,
}

pub fn run(args: MaterializeArgs) -> Result<()> {
    let cwd = current_dir()?;

    let overrides = CliOverrides {
        mode: args.mode,
        match_file: args.match_file.clone(),
        app_user: args.app_user.clone(),
        keep_perms: if args.no_keep_perms { Some(false) } else { None },
        path_perms: parse_csv_multi(&args.path_perms),
        dependency_failure: args.dependency_failure,
        staging_dir: args.staging_dir.clone(),
    };
    let cfg = resolve_config(&cwd, args.config.as_deref(), overrides)?;

    let report = ArtifactReport::load(&args.report)?;
    tracing::debug!(
        "Report has {} files, {} standalone entries, {} symlinks",
        report.files.len(),
        report.standalone.len(),
        report.symlinks.len()
    );

    let list = build_file_list(&cfg, &cwd)?;
    let selector = ArtifactSelector::new(list, cfg.app_user.clone());
    let resolver = LddResolver::new(&args.ldd);

    let mut opts = MaterializeOptions::new(&args.store);
    opts.keep_perms = cfg.keep_perms;
    opts.path_perms = cfg.path_perm_overrides()?;
    opts.dependency_failure = cfg.dependency_failure_policy();

    let materializer = Materializer::new(&selector, &resolver, opts);
    let stats = materializer
        .materialize(&report)
        .with_context(|| format!("Materialization into {} failed", args.store.display()))?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&stats)?);
        return Ok(());
    }

    println!("Tree: {}", materializer.files_root().display());
    println!("  Files copied: {}", stats.files_copied);
    println!("  Binaries copied: {} (+{} libraries)", stats.binaries_copied, stats.dependencies_copied);
    println!("  Directories created: {}", stats.dirs_created);
    println!("  Symlinks created: {}", stats.symlinks_created);
    println!("  Already present: {}", stats.already_present);
    println!("  Skipped: {}", stats.skipped);
    println!("  Failed: {}", stats.failed + stats.symlinks_abandoned);

    Ok(())
}
