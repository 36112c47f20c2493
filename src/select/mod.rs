//! Per-artifact keep/drop verdicts
//!
//! [`ArtifactSelector`] layers a few fixed rules over the active match list:
//! pid files are never copied (only their directory is recreated) and
//! `/etc/passwd` survives whenever a run-as user is configured. The staging
//! directory exclusion is a forced rule appended to the match list when the
//! list is built; it is the only rule that outranks the pid-file rule.

use crate::domain::ArtifactProps;
use crate::matcher::FileList;
use once_cell::sync::Lazy;
use std::collections::HashSet;

pub const PASSWD_FILE: &str = "/etc/passwd";

const PID_FILE_SUFFIX: &str = ".pid";

static KNOWN_PID_FILES: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "/var/run/nginx.pid",
        "/run/nginx.pid",
        "/tmp/nginx.pid",
        "/var/run/httpd.pid",
        "/var/run/apache2/apache2.pid",
        "/var/run/postgresql/postmaster.pid",
        "/var/run/redis/redis-server.pid",
        "/var/run/mysqld/mysqld.pid",
        "/tmp/pids/server.pid",
        "/app/tmp/pids/server.pid",
        "/var/run/crond.pid",
        "/var/run/supervisord.pid",
    ]
    .into_iter()
    .collect()
});

/// Outcome of [`ArtifactSelector::decide`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Copy,
    /// Recreate the parent directory only; the entry itself is runtime state.
    CopyDirOnly,
    Skip,
}

/// True for process-id files, recognized by well-known path or suffix.
pub fn is_pid_file(path: &str) -> bool {
    KNOWN_PID_FILES.contains(path) || path.ends_with(PID_FILE_SUFFIX)
}

#[derive(Debug, Clone)]
pub struct ArtifactSelector {
    list: FileList,
    app_user: Option<String>,
}

impl ArtifactSelector {
    pub fn new(list: FileList, app_user: Option<String>) -> Self {
        let app_user = app_user.filter(|user| !user.trim().is_empty());
        Self { list, app_user }
    }

    pub fn list(&self) -> &FileList {
        &self.list
    }

    /// Verdict for one report entry. Rules in order: the forced staging
    /// exclusion, the pid-file rule, then the list's own verdict with its
    /// mode default.
    pub fn decide(&self, path: &str, props: &ArtifactProps) -> Verdict {
        let is_dir = props.is_dir();

        if self.list.forced_drops(path, is_dir) {
            tracing::debug!("Excluding staging artifact {}", path);
            return Verdict::Skip;
        }

        if !is_dir && is_pid_file(path) {
            tracing::debug!("Keeping only the directory of pid file {}", path);
            return Verdict::CopyDirOnly;
        }

        if !self.list.keeps(path, is_dir) {
            tracing::debug!("Not selected by {} list: {}", self.list.mode(), path);
            return Verdict::Skip;
        }

        if props.checked_only() {
            tracing::debug!("Saving 'checked' artifact {}", path);
        } else {
            tracing::debug!("Saving artifact {}", path);
        }
        Verdict::Copy
    }

    /// Whether `/etc/passwd` must be carried over after the main pass.
    pub fn wants_passwd(&self) -> bool {
        if self.app_user.is_some() {
            return true;
        }
        self.list.keeps(PASSWD_FILE, false) && !self.list.explicitly_drops(PASSWD_FILE, false)
    }
}
