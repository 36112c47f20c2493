//! Match-list construction from configuration

use crate::domain::Config;
use crate::matcher::{FileList, ListMode, PathMatcher};
use crate::utils::{normalize_path, split_components};
use anyhow::{Context, Result};
use std::path::{Component, Path, PathBuf};

/// Build the active match list: the configured (or conventional) list file
/// if there is one, followed by the forced staging-directory exclusion.
pub fn build_file_list(cfg: &Config, cwd: &Path) -> Result<FileList> {
    let matcher = match locate_match_file(cfg, cwd) {
        Some((path, domain)) => {
            let loaded = PathMatcher::load(&path, &domain)
                .with_context(|| format!("Failed loading {} list {}", cfg.mode, path.display()))?;
            match &loaded.header {
                None => tracing::debug!("No version header in {}", path.display()),
                Some(Ok(header)) => tracing::debug!(
                    "{} written by slimtree {} (format {})",
                    path.display(),
                    header.tool_version,
                    header.list_format_version
                ),
                Some(Err(err)) => {
                    tracing::warn!("Ignoring version header in {}: {}", path.display(), err)
                }
            }
            tracing::debug!("Loaded {} rules from {}", loaded.matcher.len(), path.display());
            loaded.matcher
        }
        None => {
            tracing::debug!("No {} list found, using an empty one", cfg.mode);
            PathMatcher::new()
        }
    };

    if cfg.mode == ListMode::Keep && matcher.is_empty() {
        tracing::warn!("Keep list has no rules; nothing but fixed paths will be kept");
    }

    let mut list = FileList::new(cfg.mode, matcher);
    for rule in staging_rules(&cfg.staging_dir) {
        list.add_forced_exclusion(&rule)
            .with_context(|| format!("Invalid staging directory {:?}", cfg.staging_dir))?;
    }
    Ok(list)
}

/// Rules dropping the staging directory and everything below it.
pub fn staging_rules(staging_dir: &str) -> Vec<String> {
    let dir = normalize_path(staging_dir);
    let dir = dir.trim_end_matches('/');
    if dir.is_empty() {
        return Vec::new();
    }
    vec![dir.to_string(), format!("{}/**", dir)]
}

/// Match file path and the domain its rules are scoped to.
fn locate_match_file(cfg: &Config, cwd: &Path) -> Option<(PathBuf, Vec<String>)> {
    match &cfg.match_file {
        Some(path) => {
            let domain = match cfg.mode {
                ListMode::Ignore => relative_domain(path),
                ListMode::Keep => Vec::new(),
            };
            Some((cwd.join(path), domain))
        }
        None => {
            let path = cwd.join(cfg.mode.default_file_name());
            path.is_file().then_some((path, Vec::new()))
        }
    }
}

/// A nested relative ignore file (`sub/.slimignore`) scopes its rules to
/// `sub`; absolute paths are root-scoped.
fn relative_domain(path: &Path) -> Vec<String> {
    if path.has_root() {
        return Vec::new();
    }
    let Some(parent) = path.parent() else {
        return Vec::new();
    };
    if parent.components().any(|c| matches!(c, Component::ParentDir)) {
        return Vec::new();
    }
    let parent = parent.to_string_lossy();
    split_components(&normalize_path(&parent)).into_iter().map(str::to_string).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn missing_list_gives_mode_default_plus_staging_rule() {
        let tmp = TempDir::new().expect("tmp");
        let list = build_file_list(&Config::default(), tmp.path()).expect("list");
        assert_eq!(list.mode(), ListMode::Ignore);
        assert_eq!(list.matcher().len(), 2);
        assert!(list.keeps("/usr/bin/env", false));
        assert!(!list.keeps("/opt/slimtree", true));
        assert!(!list.keeps("/opt/slimtree/bin/sensor", false));
    }

    #[test]
    fn conventional_file_is_picked_up() {
        let tmp = TempDir::new().expect("tmp");
        fs::write(tmp.path().join(".slimkeep"), "/app/**\n/opt/**\n").expect("write");

        let cfg = Config { mode: ListMode::Keep, ..Config::default() };
        let list = build_file_list(&cfg, tmp.path()).expect("list");
        assert!(list.keeps("/app/index.js", false));
        assert!(list.keeps("/opt/other/x", false));
        assert!(!list.keeps("/opt/slimtree/x", false));
        assert!(!list.keeps("/etc/hosts", false));
    }

    #[test]
    fn user_rules_cannot_rescue_staging_dir() {
        let tmp = TempDir::new().expect("tmp");
        let path = tmp.path().join("rules.ignore");
        fs::write(&path, "!/opt/slimtree/**\n").expect("write");

        let cfg = Config { match_file: Some(path), ..Config::default() };
        let list = build_file_list(&cfg, tmp.path()).expect("list");
        assert!(list.explicitly_drops("/opt/slimtree/sensor", false));
    }

    #[test]
    fn nested_ignore_file_is_scoped() {
        let tmp = TempDir::new().expect("tmp");
        fs::create_dir_all(tmp.path().join("sub")).expect("mkdir");
        fs::write(tmp.path().join("sub/.slimignore"), "*.log\n").expect("write");

        let cfg = Config { match_file: Some(PathBuf::from("sub/.slimignore")), ..Config::default() };
        let list = build_file_list(&cfg, tmp.path()).expect("list");
        assert!(!list.keeps("/sub/a.log", false));
        assert!(list.keeps("/other/a.log", false));
    }

    #[test]
    fn bad_glob_is_fatal() {
        let tmp = TempDir::new().expect("tmp");
        fs::write(tmp.path().join(".slimignore"), "/etc/[oops\n").expect("write");
        let err = build_file_list(&Config::default(), tmp.path()).unwrap_err();
        assert!(format!("{:#}", err).contains("/etc/[oops"));
    }

    #[test]
    fn explicit_missing_file_is_fatal() {
        let tmp = TempDir::new().expect("tmp");
        let cfg = Config { match_file: Some(PathBuf::from("nope")), ..Config::default() };
        assert!(build_file_list(&cfg, tmp.path()).is_err());
    }

    #[test]
    fn malformed_header_does_not_fail_the_load() {
        let tmp = TempDir::new().expect("tmp");
        fs::write(
            tmp.path().join(".slimignore"),
            "#slimtree.ver.info:file.ver=v1alpha1\n#slimtree.ver.info:file.ver=v2\n/var/cache\n",
        )
        .expect("write");
        let list = build_file_list(&Config::default(), tmp.path()).expect("list");
        assert!(!list.keeps("/var/cache/x", false));
    }

    #[test]
    fn staging_rules_normalize_trailing_slash() {
        assert_eq!(staging_rules("/opt/sensor/"), vec!["/opt/sensor", "/opt/sensor/**"]);
        assert!(staging_rules("").is_empty());
    }

    #[test]
    fn relative_domain_rules() {
        assert_eq!(relative_domain(Path::new("a/b/.slimignore")), vec!["a", "b"]);
        assert!(relative_domain(Path::new(".slimignore")).is_empty());
        assert!(relative_domain(Path::new("/abs/.slimignore")).is_empty());
        assert!(relative_domain(Path::new("../up/.slimignore")).is_empty());
    }
}
