//! CLI-over-file configuration merging

use crate::domain::{Config, DependencyFailurePolicy};
use crate::matcher::ListMode;
use std::path::PathBuf;

/// Values given on the command line. `None` leaves the file value alone.
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub mode: Option<ListMode>,
    pub match_file: Option<PathBuf>,
    pub app_user: Option<String>,
    pub keep_perms: Option<bool>,
    /// Appended to the file's entries; later entries win for the same path.
    pub path_perms: Vec<String>,
    pub dependency_failure: Option<DependencyFailurePolicy>,
    pub staging_dir: Option<String>,
}

/// Apply CLI overrides on top of the loaded config (CLI > file > defaults).
pub fn merge_cli_with_config(mut config: Config, cli: CliOverrides) -> Config {
    if let Some(mode) = cli.mode {
        config.mode = mode;
    }
    if let Some(match_file) = cli.match_file {
        config.match_file = Some(match_file);
    }
    if let Some(app_user) = cli.app_user {
        config.app_user = Some(app_user);
    }
    if let Some(keep_perms) = cli.keep_perms {
        config.keep_perms = keep_perms;
    }
    config.path_perms.extend(cli.path_perms);
    if let Some(policy) = cli.dependency_failure {
        config.dependency_failure = Some(policy);
    }
    if let Some(staging_dir) = cli.staging_dir {
        config.staging_dir = staging_dir;
    }
    config
}
