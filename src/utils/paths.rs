//! Slash-separated path helpers

use std::path::{Path, PathBuf};

/// Use `/` as the only separator.
pub fn normalize_path(path: &str) -> String {
    path.replace('\\', "/")
}

/// Split a slash-separated path into components, dropping the leading root,
/// empty components and `.` components.
pub fn split_components(path: &str) -> Vec<&str> {
    path.split('/').filter(|c| !c.is_empty() && *c != ".").collect()
}

/// Mirror an absolute source path under `root`, e.g. `/usr/bin/x` under
/// `/store/files` becomes `/store/files/usr/bin/x`.
pub fn rebase_under(root: &Path, path: &str) -> PathBuf {
    root.join(path.trim_start_matches('/'))
}

/// Parent directory of a slash-separated path (`/` for top-level entries).
pub fn parent_dir(path: &str) -> &str {
    match path.trim_end_matches('/').rfind('/') {
        Some(0) => "/",
        Some(idx) => &path[..idx],
        None => ".",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_drops_root_and_dots() {
        assert_eq!(split_components("/usr/./lib//x.so"), vec!["usr", "lib", "x.so"]);
        assert!(split_components("/").is_empty());
        assert_eq!(split_components("rel/path"), vec!["rel", "path"]);
    }

    #[test]
    fn rebase_keeps_absolute_layout() {
        let root = Path::new("/store/files");
        assert_eq!(rebase_under(root, "/usr/bin/x"), PathBuf::from("/store/files/usr/bin/x"));
        assert_eq!(rebase_under(root, "/"), PathBuf::from("/store/files"));
    }

    #[test]
    fn parent_dir_of_paths() {
        assert_eq!(parent_dir("/var/run/app.pid"), "/var/run");
        assert_eq!(parent_dir("/app.pid"), "/");
        assert_eq!(parent_dir("app.pid"), ".");
    }
}
