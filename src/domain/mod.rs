//! Core data types shared across modules

use crate::matcher::ListMode;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Staging directory the tracing sensor runs from; never part of an image.
pub const DEFAULT_STAGING_DIR: &str = "/opt/slimtree";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileType {
    Regular,
    #[serde(alias = "directory")]
    Dir,
    Symlink,
}

/// Access counters recorded by the tracer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AccessActivity {
    pub ops_all: u64,
    pub ops_read: u64,
    pub ops_write: u64,
    pub ops_check_file: u64,
}

/// Everything the tracer knows about one discovered path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactProps {
    pub file_type: FileType,
    #[serde(default)]
    pub mode: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link_target: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub activity: Option<AccessActivity>,
}

impl ArtifactProps {
    pub fn regular(mode: u32) -> Self {
        Self { file_type: FileType::Regular, mode, link_target: None, activity: None }
    }

    pub fn dir(mode: u32) -> Self {
        Self { file_type: FileType::Dir, mode, link_target: None, activity: None }
    }

    pub fn symlink(target: impl Into<String>) -> Self {
        Self {
            file_type: FileType::Symlink,
            mode: 0o777,
            link_target: Some(target.into()),
            activity: None,
        }
    }

    pub fn is_dir(&self) -> bool {
        self.file_type == FileType::Dir
    }

    /// The path was only probed for existence, never read.
    pub fn checked_only(&self) -> bool {
        self.activity.as_ref().is_some_and(|a| a.ops_check_file > 0 && a.ops_read == 0)
    }
}

/// Tracer output: absolute path to properties, in three groups.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArtifactReport {
    /// Regular files and directories touched by the traced process.
    pub files: BTreeMap<String, ArtifactProps>,
    /// Entries that are always present regardless of tracing.
    pub standalone: BTreeMap<String, ArtifactProps>,
    pub symlinks: BTreeMap<String, ArtifactProps>,
}

impl ArtifactReport {
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed reading report: {}", path.display()))?;
        serde_json::from_str(&content)
            .with_context(|| format!("Invalid report JSON: {}", path.display()))
    }

    pub fn len(&self) -> usize {
        self.files.len() + self.standalone.len() + self.symlinks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Permission/ownership override applied to a copied path.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessInfo {
    pub mode: Option<u32>,
    pub uid: Option<u32>,
    pub gid: Option<u32>,
}

/// Parse `PATH:OCTAL_MODE[#UID#GID]`, e.g. `/app/run.sh:755#1000#1000`.
pub fn parse_path_perm(spec: &str) -> Result<(String, AccessInfo)> {
    let (path, access) = spec
        .rsplit_once(':')
        .with_context(|| format!("Invalid path permission '{}': expected PATH:MODE", spec))?;
    if path.is_empty() {
        anyhow::bail!("Invalid path permission '{}': empty path", spec);
    }

    let mut parts = access.split('#');
    let mode = parts.next().unwrap_or("");
    let mode = u32::from_str_radix(mode, 8)
        .with_context(|| format!("Invalid octal mode '{}' in '{}'", mode, spec))?;

    let mut ids = parts.map(|id| {
        id.parse::<u32>().with_context(|| format!("Invalid owner id '{}' in '{}'", id, spec))
    });
    let uid = ids.next().transpose()?;
    let gid = ids.next().transpose()?;
    if ids.next().is_some() {
        anyhow::bail!("Invalid path permission '{}': too many fields", spec);
    }

    Ok((path.to_string(), AccessInfo { mode: Some(mode), uid, gid }))
}

/// What to do with a binary whose shared-library closure cannot be resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum DependencyFailurePolicy {
    /// Copy the binary alone; it may fail to load at runtime.
    BinaryOnly,
    /// Leave the binary out of the image entirely.
    SkipBinary,
}

impl DependencyFailurePolicy {
    pub fn default_for(mode: ListMode) -> Self {
        match mode {
            ListMode::Ignore => DependencyFailurePolicy::BinaryOnly,
            ListMode::Keep => DependencyFailurePolicy::SkipBinary,
        }
    }
}

/// Run configuration (file, environment of the caller, CLI overrides).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub mode: ListMode,
    pub match_file: Option<PathBuf>,
    pub app_user: Option<String>,
    pub keep_perms: bool,
    pub path_perms: Vec<String>,
    pub dependency_failure: Option<DependencyFailurePolicy>,
    pub staging_dir: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            mode: ListMode::Ignore,
            match_file: None,
            app_user: None,
            keep_perms: true,
            path_perms: Vec::new(),
            dependency_failure: None,
            staging_dir: DEFAULT_STAGING_DIR.to_string(),
        }
    }
}

impl Config {
    pub fn dependency_failure_policy(&self) -> DependencyFailurePolicy {
        self.dependency_failure.unwrap_or_else(|| DependencyFailurePolicy::default_for(self.mode))
    }

    /// Parsed `path_perms`, keyed by source path.
    pub fn path_perm_overrides(&self) -> Result<BTreeMap<String, AccessInfo>> {
        self.path_perms.iter().map(|spec| parse_path_perm(spec)).collect()
    }
}
