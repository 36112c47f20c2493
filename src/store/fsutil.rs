//! Filesystem helpers for building the destination tree

use crate::domain::AccessInfo;
use std::fs::{self, DirBuilder, File, Permissions};
use std::io;
use std::os::unix::fs::{chown, DirBuilderExt, MetadataExt, PermissionsExt};
use std::path::Path;

/// Mode for directories the engine creates on its own behalf.
pub const OPEN_DIR_MODE: u32 = 0o777;
/// Mode for directories named in the report: sticky and world-writable.
pub const STICKY_DIR_MODE: u32 = 0o1777;

/// True if anything (including a dangling symlink) sits at `path`.
pub fn exists(path: &Path) -> bool {
    fs::symlink_metadata(path).is_ok()
}

/// True if `path` resolves to a directory.
pub fn dir_exists(path: &Path) -> bool {
    path.is_dir()
}

pub fn create_dir_all(path: &Path, mode: u32) -> io::Result<()> {
    DirBuilder::new().recursive(true).mode(mode).create(path)
}

pub fn set_mode(path: &Path, mode: u32) -> io::Result<()> {
    fs::set_permissions(path, Permissions::from_mode(mode))
}

/// Copy a file's contents to `dst`, creating missing parent directories.
///
/// Permission bits always follow the source. With `keep_perms` the owner
/// and modification time are carried over as well, and any parent
/// directories created here take the metadata of their source counterparts.
pub fn copy_regular_file(keep_perms: bool, src: &Path, dst: &Path) -> io::Result<()> {
    if let (Some(src_dir), Some(dst_dir)) = (src.parent(), dst.parent()) {
        make_parent_dirs(keep_perms, src_dir, dst_dir)?;
    }

    fs::copy(src, dst)?;

    if keep_perms {
        clone_metadata(src, dst)?;
    }
    Ok(())
}

/// Recreate `src` as an empty directory at `dst`.
pub fn copy_dir_only(keep_perms: bool, src: &Path, dst: &Path) -> io::Result<()> {
    create_dir_all(dst, OPEN_DIR_MODE)?;
    if keep_perms {
        clone_metadata(src, dst)?;
    }
    Ok(())
}

/// Apply a permission/ownership override; unset fields are left alone.
pub fn set_access(path: &Path, access: &AccessInfo) -> io::Result<()> {
    if let Some(mode) = access.mode {
        set_mode(path, mode)?;
    }
    if access.uid.is_some() || access.gid.is_some() {
        chown(path, access.uid, access.gid)?;
    }
    Ok(())
}

/// Copy owner, mode and mtime from `src` onto `dst`.
///
/// Ownership is best effort: unprivileged runs cannot give files away, so a
/// failed chown is logged and the rest still applies. The mode is set after
/// the chown, which clears setuid/setgid bits on Linux.
pub fn clone_metadata(src: &Path, dst: &Path) -> io::Result<()> {
    let meta = fs::metadata(src)?;

    if let Err(err) = chown(dst, Some(meta.uid()), Some(meta.gid())) {
        tracing::warn!(
            "Could not set owner {}:{} on {}: {}",
            meta.uid(),
            meta.gid(),
            dst.display(),
            err
        );
    }

    set_mode(dst, meta.mode() & 0o7777)?;

    let modified = meta.modified()?;
    File::open(dst)?.set_modified(modified)
}

fn make_parent_dirs(keep_perms: bool, src_dir: &Path, dst_dir: &Path) -> io::Result<()> {
    if dir_exists(dst_dir) {
        return Ok(());
    }

    // Destination ancestors mirror source ancestors from the bottom up.
    let missing: Vec<_> = src_dir
        .ancestors()
        .zip(dst_dir.ancestors())
        .take_while(|(_, dst)| !exists(dst))
        .collect();

    create_dir_all(dst_dir, OPEN_DIR_MODE)?;

    if keep_perms {
        for (src, dst) in missing.into_iter().rev() {
            if let Err(err) = clone_metadata(src, dst) {
                tracing::debug!("Could not clone {} onto {}: {}", src.display(), dst.display(), err);
            }
        }
    }
    Ok(())
}
