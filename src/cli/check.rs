//! Check command implementation

use anyhow::{Context, Result};
use clap::Args;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use super::utils::{current_dir, resolve_config};
use crate::config::{build_file_list, CliOverrides};
use crate::domain::ArtifactProps;
use crate::matcher::ListMode;
use crate::select::{ArtifactSelector, Verdict};
use crate::utils::normalize_path;

#[derive(Args)]
pub struct CheckArgs {
    /// Absolute paths to classify; a trailing `/` marks a directory
    #[arg(value_name = "PATH")]
    pub paths: Vec<String>,

    /// Match list mode
    #[arg(short, long, value_enum)]
    pub mode: Option<ListMode>,

    /// Match list file (defaults to .slimignore / .slimkeep in the current directory)
    #[arg(long, value_name = "FILE")]
    pub match_file: Option<PathBuf>,

    /// Config file (defaults to slimtree.toml / .slimtree.yml discovery)
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Staging directory that is always excluded
    #[arg(long, value_name = "DIR")]
    pub staging_dir: Option<String>,

    /// Classify every entry under DIR, treating DIR as the root
    #[arg(long, value_name = "DIR")]
    pub walk: Option<PathBuf>,

    /// Print the compiled rule list as JSON instead of classifying paths
    #[arg(long)]
    pub dump_rules: bool,
}

pub fn run(args: CheckArgs) -> Result<()> {
    let cwd = current_dir()?;
    let overrides = CliOverrides {
        mode: args.mode,
        match_file: args.match_file.clone(),
        staging_dir: args.staging_dir.clone(),
        ..CliOverrides::default()
    };
    let cfg = resolve_config(&cwd, args.config.as_deref(), overrides)?;
    let list = build_file_list(&cfg, &cwd)?;

    if args.dump_rules {
        println!("{}", serde_json::to_string_pretty(list.matcher())?);
        return Ok(());
    }

    if args.paths.is_empty() && args.walk.is_none() {
        anyhow::bail!("Nothing to check: pass paths or --walk <DIR>");
    }

    let selector = ArtifactSelector::new(list, cfg.app_user.clone());

    for raw in &args.paths {
        let path = normalize_path(raw);
        let is_dir = path.ends_with('/') || Path::new(&path).is_dir();
        let path = match path.trim_end_matches('/') {
            "" => "/".to_string(),
            trimmed => trimmed.to_string(),
        };
        print_verdict(&selector, &path, is_dir);
    }

    if let Some(root) = &args.walk {
        walk(&selector, root)?;
    }

    Ok(())
}

fn walk(selector: &ArtifactSelector, root: &Path) -> Result<()> {
    if !root.is_dir() {
        anyhow::bail!("Path is not a directory: {}", root.display());
    }

    for entry in WalkDir::new(root).min_depth(1).sort_by_file_name() {
        let entry = entry.with_context(|| format!("Failed walking {}", root.display()))?;
        let rel = entry.path().strip_prefix(root).with_context(|| {
            format!("{} is outside {}", entry.path().display(), root.display())
        })?;
        let path = format!("/{}", normalize_path(&rel.to_string_lossy()));
        print_verdict(selector, &path, entry.file_type().is_dir());
    }
    Ok(())
}

fn print_verdict(selector: &ArtifactSelector, path: &str, is_dir: bool) {
    let props = if is_dir { ArtifactProps::dir(0o755) } else { ArtifactProps::regular(0o644) };
    let verdict = match selector.decide(path, &props) {
        Verdict::Copy => "keep",
        Verdict::CopyDirOnly => "dir-only",
        Verdict::Skip => "drop",
    };
    println!("{}\t{}", verdict, path);
}
