//! Destination tree construction
//!
//! A run goes through a fixed sequence of passes:
//!
//! 1. symlinks, ancestors before descendants, deferring any whose parent
//!    directory cannot be created yet
//! 2. one retry over the deferred symlinks
//! 3. regular files and directories from the traced and standalone sets
//! 4. fixed paths (`/etc/passwd`, `/tmp`, `/run`) and pid-file directories
//!
//! Per-entry failures are logged and skipped. Only failing to create the
//! destination root aborts the run.

use super::binary::{is_elf, is_shell_or_cmd, DependencyResolver};
use super::fsutil::{self, OPEN_DIR_MODE, STICKY_DIR_MODE};
use super::umask::UmaskGuard;
use super::StoreError;
use crate::domain::{AccessInfo, ArtifactProps, ArtifactReport, DependencyFailurePolicy};
use crate::select::{ArtifactSelector, Verdict, PASSWD_FILE};
use crate::utils::{parent_dir, rebase_under};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::io;
use std::os::unix::fs::symlink;
use std::path::{Path, PathBuf};

/// Subdirectory of the store location that mirrors the source root.
pub const FILES_DIR: &str = "files";

const TMP_DIR: &str = "/tmp";
const RUN_DIR: &str = "/run";
const RUN_DIR_MODE: u32 = 0o755;

#[derive(Debug, Clone)]
pub struct MaterializeOptions {
    pub store_location: PathBuf,
    pub keep_perms: bool,
    /// Overrides applied after copy, keyed by source path.
    pub path_perms: BTreeMap<String, AccessInfo>,
    pub dependency_failure: DependencyFailurePolicy,
}

impl MaterializeOptions {
    pub fn new(store_location: impl Into<PathBuf>) -> Self {
        Self {
            store_location: store_location.into(),
            keep_perms: true,
            path_perms: BTreeMap::new(),
            dependency_failure: DependencyFailurePolicy::BinaryOnly,
        }
    }
}

/// Counters for one run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MaterializeStats {
    pub symlinks_created: usize,
    pub symlinks_abandoned: usize,
    pub dirs_created: usize,
    pub files_copied: usize,
    pub binaries_copied: usize,
    pub dependencies_copied: usize,
    pub already_present: usize,
    pub skipped: usize,
    pub failed: usize,
}

enum LinkOutcome {
    Created,
    Present,
    Deferred,
    Failed,
}

pub struct Materializer<'a> {
    selector: &'a ArtifactSelector,
    resolver: &'a dyn DependencyResolver,
    opts: MaterializeOptions,
    files_root: PathBuf,
}

impl<'a> Materializer<'a> {
    pub fn new(
        selector: &'a ArtifactSelector,
        resolver: &'a dyn DependencyResolver,
        opts: MaterializeOptions,
    ) -> Self {
        let files_root = opts.store_location.join(FILES_DIR);
        Self { selector, resolver, opts, files_root }
    }

    /// Root of the mirrored tree (`<store>/files`).
    pub fn files_root(&self) -> &Path {
        &self.files_root
    }

    /// Destination for an absolute source path.
    pub fn dst_path(&self, src: &str) -> PathBuf {
        rebase_under(&self.files_root, src)
    }

    pub fn materialize(&self, report: &ArtifactReport) -> Result<MaterializeStats, StoreError> {
        let _umask = UmaskGuard::set(0);

        fsutil::create_dir_all(&self.files_root, OPEN_DIR_MODE)
            .map_err(|source| StoreError::Setup { path: self.files_root.clone(), source })?;

        let mut stats = MaterializeStats::default();
        let mut extra_dirs = BTreeSet::new();

        self.link_pass(report, &mut stats, &mut extra_dirs);

        tracing::debug!("Copying {} traced and {} standalone entries", report.files.len(), report.standalone.len());
        for (src, props) in report.files.iter().chain(&report.standalone) {
            match self.selector.decide(src, props) {
                Verdict::Copy => self.copy_entry(src, props, &mut stats),
                Verdict::CopyDirOnly => {
                    extra_dirs.insert(parent_dir(src).to_string());
                }
                Verdict::Skip => stats.skipped += 1,
            }
        }

        self.fixed_paths(&extra_dirs, &mut stats);

        tracing::info!(
            "Materialized into {}: {} files, {} binaries (+{} libraries), {} dirs, {} symlinks; {} skipped, {} failed",
            self.files_root.display(),
            stats.files_copied,
            stats.binaries_copied,
            stats.dependencies_copied,
            stats.dirs_created,
            stats.symlinks_created,
            stats.skipped,
            stats.failed + stats.symlinks_abandoned,
        );
        Ok(stats)
    }

    fn link_pass(
        &self,
        report: &ArtifactReport,
        stats: &mut MaterializeStats,
        extra_dirs: &mut BTreeSet<String>,
    ) {
        tracing::debug!("Checking {} symlinks", report.symlinks.len());

        // Sorted keys put every path after its ancestors.
        let mut deferred = Vec::new();
        for (link, props) in &report.symlinks {
            match self.selector.decide(link, props) {
                Verdict::Copy => {}
                Verdict::CopyDirOnly => {
                    extra_dirs.insert(parent_dir(link).to_string());
                    continue;
                }
                Verdict::Skip => {
                    stats.skipped += 1;
                    continue;
                }
            }
            match self.try_symlink(link, props) {
                LinkOutcome::Created => stats.symlinks_created += 1,
                LinkOutcome::Present => stats.already_present += 1,
                LinkOutcome::Deferred => deferred.push((link, props)),
                LinkOutcome::Failed => stats.failed += 1,
            }
        }

        if deferred.is_empty() {
            return;
        }

        tracing::debug!("Retrying {} deferred symlinks", deferred.len());
        for (link, props) in deferred {
            match self.try_symlink(link, props) {
                LinkOutcome::Created => stats.symlinks_created += 1,
                LinkOutcome::Present => stats.already_present += 1,
                LinkOutcome::Deferred => {
                    tracing::warn!("Giving up on symlink {} -> {}", link, self.dst_path(link).display());
                    stats.symlinks_abandoned += 1;
                }
                LinkOutcome::Failed => stats.failed += 1,
            }
        }
    }

    fn try_symlink(&self, link: &str, props: &ArtifactProps) -> LinkOutcome {
        let dst = self.dst_path(link);
        let Some(target) = props.link_target.as_deref() else {
            tracing::warn!("Symlink {} has no target in the report", link);
            return LinkOutcome::Failed;
        };

        if let Some(dir) = dst.parent() {
            // The parent may run through another link whose target does not
            // exist yet; try again once everything else is in place.
            if let Err(err) = fsutil::create_dir_all(dir, OPEN_DIR_MODE) {
                tracing::debug!("Deferring symlink {}: cannot create {}: {}", link, dir.display(), err);
                return LinkOutcome::Deferred;
            }
        }

        tracing::debug!("Symlinking {} -> {}", dst.display(), target);
        match symlink(target, &dst) {
            Ok(()) => LinkOutcome::Created,
            Err(err) if err.kind() == io::ErrorKind::AlreadyExists => {
                tracing::debug!("Symlink already exists: {}", dst.display());
                LinkOutcome::Present
            }
            Err(err) => {
                tracing::warn!("Failed to create symlink {} -> {}: {}", link, dst.display(), err);
                LinkOutcome::Failed
            }
        }
    }

    fn copy_entry(&self, src: &str, props: &ArtifactProps, stats: &mut MaterializeStats) {
        let dst = self.dst_path(src);

        if props.is_dir() {
            if fsutil::dir_exists(&dst) {
                tracing::debug!("Updating dir mode {}", dst.display());
                if let Err(err) = fsutil::set_mode(&dst, STICKY_DIR_MODE) {
                    tracing::warn!("Failed to set mode on {} -> {}: {}", src, dst.display(), err);
                }
            } else {
                tracing::debug!("Creating dir {} -> {}", src, dst.display());
                match fsutil::create_dir_all(&dst, STICKY_DIR_MODE) {
                    // The mode passed to mkdir cannot carry the sticky bit.
                    Ok(()) => match fsutil::set_mode(&dst, STICKY_DIR_MODE) {
                        Ok(()) => stats.dirs_created += 1,
                        Err(err) => {
                            tracing::warn!("Failed to set mode on {} -> {}: {}", src, dst.display(), err);
                        }
                    },
                    Err(err) => {
                        tracing::warn!("Failed to create dir {} -> {}: {}", src, dst.display(), err);
                        stats.failed += 1;
                    }
                }
            }
        } else if fsutil::exists(&dst) {
            // An earlier symlink can already have provided this file.
            tracing::debug!("Target already exists: {}", dst.display());
            stats.already_present += 1;
        } else if let Err(err) = self.copy_file(src, &dst, stats) {
            tracing::warn!("Failed to copy {} -> {}: {}", src, dst.display(), err);
            stats.failed += 1;
            return;
        }

        if let Some(access) = self.opts.path_perms.get(src) {
            tracing::debug!("Applying permission override to {}", dst.display());
            if let Err(err) = fsutil::set_access(&dst, access) {
                tracing::warn!("Failed to apply permissions to {} -> {}: {}", src, dst.display(), err);
            }
        }
    }

    fn copy_file(&self, src: &str, dst: &Path, stats: &mut MaterializeStats) -> io::Result<()> {
        let src_path = Path::new(src);

        if is_shell_or_cmd(src_path) {
            let resolved = which::which(src_path).map_err(|err| {
                tracing::debug!("Shell {} not found: {}", src, err);
                io::Error::new(io::ErrorKind::NotFound, err.to_string())
            })?;
            return self.copy_bin(&resolved, stats);
        }

        if is_elf(src_path)? {
            return self.copy_bin(src_path, stats);
        }

        fsutil::copy_regular_file(self.opts.keep_perms, src_path, dst)?;
        stats.files_copied += 1;
        Ok(())
    }

    /// Copy a binary and its shared-library closure. Individual library
    /// failures are logged; the last one is returned after the rest are
    /// attempted.
    fn copy_bin(&self, binary: &Path, stats: &mut MaterializeStats) -> io::Result<()> {
        let deps = match self.resolver.dependencies(binary) {
            Ok(deps) => deps,
            Err(err) => match self.opts.dependency_failure {
                DependencyFailurePolicy::BinaryOnly => {
                    tracing::warn!("{}; copying {} without its libraries", err, binary.display());
                    Vec::new()
                }
                DependencyFailurePolicy::SkipBinary => {
                    return Err(io::Error::new(io::ErrorKind::Other, err));
                }
            },
        };

        let mut artifacts = vec![binary.to_path_buf()];
        for dep in deps {
            if !artifacts.contains(&dep) {
                artifacts.push(dep);
            }
        }
        tracing::debug!("Including binary {} with {} libraries", binary.display(), artifacts.len() - 1);

        let mut last_err = None;
        for (idx, artifact) in artifacts.iter().enumerate() {
            let dst = rebase_under(&self.files_root, &artifact.to_string_lossy());
            if fsutil::exists(&dst) {
                continue;
            }
            match fsutil::copy_regular_file(self.opts.keep_perms, artifact, &dst) {
                Ok(()) if idx == 0 => stats.binaries_copied += 1,
                Ok(()) => stats.dependencies_copied += 1,
                Err(err) => {
                    tracing::warn!("Failed to copy {} -> {}: {}", artifact.display(), dst.display(), err);
                    last_err = Some(err);
                }
            }
        }

        match last_err {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn fixed_paths(&self, extra_dirs: &BTreeSet<String>, stats: &mut MaterializeStats) {
        if self.selector.wants_passwd() {
            let src = Path::new(PASSWD_FILE);
            let dst = self.dst_path(PASSWD_FILE);
            if !src.exists() {
                tracing::debug!("No {} to copy", PASSWD_FILE);
            } else if !fsutil::exists(&dst) {
                match fsutil::copy_regular_file(self.opts.keep_perms, src, &dst) {
                    Ok(()) => stats.files_copied += 1,
                    Err(err) => {
                        tracing::warn!("Failed to copy {} -> {}: {}", PASSWD_FILE, dst.display(), err);
                        stats.failed += 1;
                    }
                }
            }
        }

        let tmp = self.dst_path(TMP_DIR);
        if !fsutil::dir_exists(&tmp) {
            if let Err(err) = fsutil::create_dir_all(&tmp, OPEN_DIR_MODE) {
                tracing::warn!("Failed to create {} -> {}: {}", TMP_DIR, tmp.display(), err);
            }
        }
        if let Err(err) = fsutil::set_mode(&tmp, STICKY_DIR_MODE) {
            tracing::warn!("Failed to set mode on {} -> {}: {}", TMP_DIR, tmp.display(), err);
        }

        let run = self.dst_path(RUN_DIR);
        if !fsutil::dir_exists(&run) {
            if let Err(err) = fsutil::create_dir_all(&run, RUN_DIR_MODE) {
                tracing::warn!("Failed to create {} -> {}: {}", RUN_DIR, run.display(), err);
            }
        }

        for src in extra_dirs {
            let dst = self.dst_path(src);
            if fsutil::dir_exists(Path::new(src)) && !fsutil::dir_exists(&dst) {
                match fsutil::copy_dir_only(self.opts.keep_perms, Path::new(src), &dst) {
                    Ok(()) => stats.dirs_created += 1,
                    Err(err) => {
                        tracing::warn!("Failed to recreate dir {} -> {}: {}", src, dst.display(), err);
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matcher::{FileList, ListMode, PathMatcher};
    use crate::store::binary::ResolveError;
    use crate::store::umask::TEST_LOCK;
    use std::collections::HashMap;
    use std::fs;
    use std::os::unix::fs::PermissionsExt;
    use std::sync::MutexGuard;
    use tempfile::TempDir;

    const ELF_STUB: &[u8] = &[0x7f, b'E', b'L', b'F', 2, 1, 1, 0];

    #[derive(Default)]
    struct FakeResolver {
        deps: HashMap<PathBuf, Vec<PathBuf>>,
        fail: bool,
    }

    impl DependencyResolver for FakeResolver {
        fn dependencies(&self, binary: &Path) -> Result<Vec<PathBuf>, ResolveError> {
            if self.fail {
                return Err(ResolveError::Failed {
                    binary: binary.to_path_buf(),
                    message: "resolver unavailable".into(),
                });
            }
            Ok(self.deps.get(binary).cloned().unwrap_or_default())
        }
    }

    struct Fixture {
        _lock: MutexGuard<'static, ()>,
        src: TempDir,
        store: TempDir,
    }

    impl Fixture {
        fn new() -> Self {
            let lock = TEST_LOCK.lock().unwrap_or_else(|e| e.into_inner());
            Self {
                _lock: lock,
                src: TempDir::new().expect("src"),
                store: TempDir::new().expect("store"),
            }
        }

        /// Absolute source path for a fixture-relative one.
        fn path(&self, rel: &str) -> String {
            self.src.path().join(rel).to_string_lossy().into_owned()
        }

        fn write(&self, rel: &str, contents: &[u8]) -> String {
            let path = self.src.path().join(rel);
            fs::create_dir_all(path.parent().unwrap()).expect("mkdir");
            fs::write(&path, contents).expect("write");
            path.to_string_lossy().into_owned()
        }

        fn dst(&self, rel: &str) -> PathBuf {
            rebase_under(&self.store.path().join(FILES_DIR), &self.path(rel))
        }

        fn options(&self) -> MaterializeOptions {
            MaterializeOptions::new(self.store.path())
        }
    }

    fn selector(mode: ListMode, lines: &[&str]) -> ArtifactSelector {
        let mut matcher = PathMatcher::new();
        for line in lines {
            matcher.add_pattern(line, &[]).expect("add");
        }
        ArtifactSelector::new(FileList::new(mode, matcher), None)
    }

    fn run(
        selector: &ArtifactSelector,
        resolver: &dyn DependencyResolver,
        opts: MaterializeOptions,
        report: &ArtifactReport,
    ) -> MaterializeStats {
        Materializer::new(selector, resolver, opts).materialize(report).expect("materialize")
    }

    #[test]
    fn copies_selected_files_and_skips_dropped() {
        let fx = Fixture::new();
        let mut report = ArtifactReport::default();
        report.files.insert(fx.write("app/main.py", b"print()"), ArtifactProps::regular(0o644));
        report.files.insert(fx.write("app/cache/blob", b"x"), ArtifactProps::regular(0o644));
        report.files.insert(fx.path("app"), ArtifactProps::dir(0o755));

        let selector = selector(ListMode::Ignore, &["cache/"]);
        let stats = run(&selector, &FakeResolver::default(), fx.options(), &report);

        assert_eq!(fs::read(fx.dst("app/main.py")).expect("copied"), b"print()");
        assert!(!fx.dst("app/cache/blob").exists());
        assert_eq!(stats.files_copied, 1);
        assert_eq!(stats.skipped, 1);

        let mode = fs::metadata(fx.dst("app")).expect("dir").permissions().mode();
        assert_eq!(mode & 0o7777, STICKY_DIR_MODE);
    }

    #[test]
    fn second_run_is_idempotent() {
        let fx = Fixture::new();
        let mut report = ArtifactReport::default();
        report.files.insert(fx.write("etc/app.conf", b"a=1"), ArtifactProps::regular(0o644));
        report.files.insert(fx.path("etc"), ArtifactProps::dir(0o755));
        report.symlinks.insert(fx.path("etc/current"), ArtifactProps::symlink("app.conf"));

        let selector = selector(ListMode::Ignore, &[]);
        let first = run(&selector, &FakeResolver::default(), fx.options(), &report);
        assert_eq!(first.files_copied, 1);
        assert_eq!(first.symlinks_created, 1);

        let second = run(&selector, &FakeResolver::default(), fx.options(), &report);
        assert_eq!(second.files_copied, 0);
        assert_eq!(second.symlinks_created, 0);
        assert_eq!(second.dirs_created, 0);
        assert_eq!(second.failed, 0);
        assert_eq!(second.already_present, 2);
    }

    #[test]
    fn deferred_symlink_succeeds_on_retry() {
        let fx = Fixture::new();
        let mut report = ArtifactReport::default();
        // a/b -> c is dangling until a/c/z forces a/c into existence, so
        // a/b/d can only be created on the retry pass.
        report.symlinks.insert(fx.path("a/b"), ArtifactProps::symlink("c"));
        report.symlinks.insert(fx.path("a/b/d"), ArtifactProps::symlink("x"));
        report.symlinks.insert(fx.path("a/c/z"), ArtifactProps::symlink("q"));

        let selector = selector(ListMode::Ignore, &[]);
        let stats = run(&selector, &FakeResolver::default(), fx.options(), &report);

        assert_eq!(stats.symlinks_created, 3);
        assert_eq!(stats.symlinks_abandoned, 0);
        assert_eq!(fs::read_link(fx.dst("a/b")).expect("link"), PathBuf::from("c"));
        assert!(fx.dst("a/c").is_dir());
        assert_eq!(fs::read_link(fx.dst("a/c/d")).expect("link"), PathBuf::from("x"));
        assert_eq!(fs::read_link(fx.dst("a/c/z")).expect("link"), PathBuf::from("q"));
    }

    #[test]
    fn unresolvable_symlink_is_abandoned_after_one_retry() {
        let fx = Fixture::new();
        let mut report = ArtifactReport::default();
        report.symlinks.insert(fx.path("m/n"), ArtifactProps::symlink("nowhere"));
        report.symlinks.insert(fx.path("m/n/o"), ArtifactProps::symlink("y"));

        let selector = selector(ListMode::Ignore, &[]);
        let stats = run(&selector, &FakeResolver::default(), fx.options(), &report);

        assert_eq!(stats.symlinks_created, 1);
        assert_eq!(stats.symlinks_abandoned, 1);
    }

    #[test]
    fn binary_brings_its_dependency_closure() {
        let fx = Fixture::new();
        let bin = fx.write("usr/bin/server", ELF_STUB);
        let lib_a = fx.write("usr/lib/liba.so.1", b"liba");
        let lib_b = fx.write("usr/lib/libb.so.2", b"libb");

        let mut resolver = FakeResolver::default();
        resolver.deps.insert(
            PathBuf::from(&bin),
            vec![PathBuf::from(&lib_a), PathBuf::from(&lib_b), PathBuf::from(&lib_a)],
        );

        let mut report = ArtifactReport::default();
        report.files.insert(bin, ArtifactProps::regular(0o755));

        let selector = selector(ListMode::Ignore, &[]);
        let stats = run(&selector, &resolver, fx.options(), &report);

        assert_eq!(stats.binaries_copied, 1);
        assert_eq!(stats.dependencies_copied, 2);
        assert!(fx.dst("usr/bin/server").is_file());
        assert!(fx.dst("usr/lib/liba.so.1").is_file());
        assert!(fx.dst("usr/lib/libb.so.2").is_file());
        assert_eq!(fs::read_dir(fx.dst("usr/lib")).expect("lib dir").count(), 2);
    }

    #[test]
    fn missing_dependency_does_not_drop_the_others() {
        let fx = Fixture::new();
        let bin = fx.write("opt/tool/run", ELF_STUB);
        let lib_a = fx.write("lib/liba.so", b"a");
        let lib_c = fx.write("lib/libc-test.so", b"c");

        let mut resolver = FakeResolver::default();
        resolver.deps.insert(
            PathBuf::from(&bin),
            vec![PathBuf::from(&lib_a), PathBuf::from(fx.path("lib/libgone.so")), PathBuf::from(&lib_c)],
        );

        let mut report = ArtifactReport::default();
        report.files.insert(bin, ArtifactProps::regular(0o755));

        let selector = selector(ListMode::Ignore, &[]);
        let stats = run(&selector, &resolver, fx.options(), &report);

        assert!(fx.dst("opt/tool/run").is_file());
        assert!(fx.dst("lib/liba.so").is_file());
        assert!(fx.dst("lib/libc-test.so").is_file());
        assert!(!fx.dst("lib/libgone.so").exists());
        assert_eq!(stats.dependencies_copied, 2);
        assert_eq!(stats.failed, 1);
    }

    #[test]
    fn resolver_failure_follows_policy() {
        let fx = Fixture::new();
        let bin = fx.write("bin/agent", ELF_STUB);
        let mut report = ArtifactReport::default();
        report.files.insert(bin, ArtifactProps::regular(0o755));

        let resolver = FakeResolver { fail: true, ..Default::default() };
        let selector = selector(ListMode::Ignore, &[]);

        let mut opts = fx.options();
        opts.dependency_failure = DependencyFailurePolicy::SkipBinary;
        let stats = run(&selector, &resolver, opts, &report);
        assert!(!fx.dst("bin/agent").exists());
        assert_eq!(stats.failed, 1);

        let mut opts = fx.options();
        opts.dependency_failure = DependencyFailurePolicy::BinaryOnly;
        let stats = run(&selector, &resolver, opts, &report);
        assert!(fx.dst("bin/agent").is_file());
        assert_eq!(stats.binaries_copied, 1);
    }

    #[test]
    fn permission_override_is_applied_after_copy() {
        let fx = Fixture::new();
        let script = fx.write("app/start", b"#!/usr/bin/env node\n");
        let mut report = ArtifactReport::default();
        report.files.insert(script.clone(), ArtifactProps::regular(0o644));

        let mut opts = fx.options();
        opts.path_perms.insert(script, AccessInfo { mode: Some(0o750), uid: None, gid: None });

        let selector = selector(ListMode::Ignore, &[]);
        run(&selector, &FakeResolver::default(), opts, &report);

        let mode = fs::metadata(fx.dst("app/start")).expect("copied").permissions().mode();
        assert_eq!(mode & 0o777, 0o750);
    }

    #[test]
    fn pid_file_leaves_only_its_directory() {
        let fx = Fixture::new();
        let mut report = ArtifactReport::default();
        report.files.insert(fx.write("srv/run/app.pid", b"1234"), ArtifactProps::regular(0o644));

        let selector = selector(ListMode::Ignore, &[]);
        let stats = run(&selector, &FakeResolver::default(), fx.options(), &report);

        assert!(fx.dst("srv/run").is_dir());
        assert!(!fx.dst("srv/run/app.pid").exists());
        assert_eq!(stats.files_copied, 0);
    }

    #[test]
    fn fixed_directories_are_ensured() {
        let fx = Fixture::new();
        let selector = selector(ListMode::Keep, &[]);
        run(&selector, &FakeResolver::default(), fx.options(), &ArtifactReport::default());

        let files = fx.store.path().join(FILES_DIR);
        let tmp = fs::metadata(files.join("tmp")).expect("tmp");
        assert!(tmp.is_dir());
        assert_eq!(tmp.permissions().mode() & 0o7777, STICKY_DIR_MODE);

        let run_dir = fs::metadata(files.join("run")).expect("run");
        assert!(run_dir.is_dir());
        assert_eq!(run_dir.permissions().mode() & 0o7777, RUN_DIR_MODE);

        // Keep list without rules and no run-as user: passwd stays out.
        assert!(!files.join("etc/passwd").exists());
    }

    #[test]
    fn passwd_follows_app_user() {
        let fx = Fixture::new();
        let selector =
            ArtifactSelector::new(FileList::new(ListMode::Keep, PathMatcher::new()), Some("app".into()));
        run(&selector, &FakeResolver::default(), fx.options(), &ArtifactReport::default());

        let copied = fx.store.path().join(FILES_DIR).join("etc/passwd");
        assert_eq!(copied.exists(), Path::new(PASSWD_FILE).exists());
    }

    #[test]
    fn unwritable_store_is_a_setup_error() {
        let fx = Fixture::new();
        let blocker = fx.store.path().join("blocker");
        fs::write(&blocker, "not a dir").expect("write");

        let selector = selector(ListMode::Ignore, &[]);
        let resolver = FakeResolver::default();
        let err = Materializer::new(&selector, &resolver, MaterializeOptions::new(&blocker))
            .materialize(&ArtifactReport::default())
            .unwrap_err();
        assert!(matches!(err, StoreError::Setup { .. }));
    }

    #[test]
    fn umask_is_restored_after_setup_error() {
        let fx = Fixture::new();
        let blocker = fx.store.path().join("blocker");
        fs::write(&blocker, "not a dir").expect("write");

        let outer = UmaskGuard::set(0o027);
        let selector = selector(ListMode::Ignore, &[]);
        let resolver = FakeResolver::default();
        let result = Materializer::new(&selector, &resolver, MaterializeOptions::new(&blocker))
            .materialize(&ArtifactReport::default());
        assert!(result.is_err());

        let current = UmaskGuard::set(0o022);
        assert_eq!(current.previous(), 0o027);
        drop(current);
        drop(outer);
    }

    #[test]
    fn without_keep_perms_mode_follows_source_but_mtime_does_not() {
        let fx = Fixture::new();
        let src = fx.write("srv/config.ini", b"k=v");
        fs::set_permissions(&src, fs::Permissions::from_mode(0o640)).expect("chmod");
        let old = std::time::UNIX_EPOCH + std::time::Duration::from_secs(1_000_000);
        fs::File::options().write(true).open(&src).expect("open").set_modified(old).expect("mtime");

        let mut report = ArtifactReport::default();
        report.files.insert(src.clone(), ArtifactProps::regular(0o640));

        let mut opts = fx.options();
        opts.keep_perms = false;
        let selector = selector(ListMode::Ignore, &[]);
        let stats = run(&selector, &FakeResolver::default(), opts, &report);

        assert_eq!(stats.files_copied, 1);
        let meta = fs::metadata(fx.dst("srv/config.ini")).expect("copied");
        assert_eq!(meta.permissions().mode() & 0o7777, 0o640);
        assert_ne!(meta.modified().expect("mtime"), old);
    }
}
