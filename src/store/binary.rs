//! Executable classification and shared-library dependency resolution

use once_cell::sync::Lazy;
use std::collections::HashSet;
use std::fs::File;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process::Command;
use thiserror::Error;

const ELF_MAGIC: [u8; 4] = [0x7f, b'E', b'L', b'F'];

static SHELL_NAMES: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    ["sh", "ash", "bash", "dash", "zsh", "ksh", "mksh", "csh", "tcsh", "fish", "busybox"]
        .into_iter()
        .collect()
});

static SHELL_COMMANDS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "ls", "cat", "cp", "mv", "rm", "mkdir", "rmdir", "ln", "chmod", "chown", "touch", "echo",
        "env", "test", "[", "pwd", "sleep", "grep", "sed", "awk", "head", "tail", "find", "xargs",
        "sort", "uniq", "cut", "tr", "wc", "id", "whoami", "which", "dirname", "basename", "readlink",
        "true", "false", "kill", "ps", "tar", "gzip", "date", "uname", "hostname",
    ]
    .into_iter()
    .collect()
});

/// True when the file name is a known shell or shell command.
pub fn is_shell_or_cmd(path: &Path) -> bool {
    let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
        return false;
    };
    SHELL_NAMES.contains(name) || SHELL_COMMANDS.contains(name)
}

/// True when the file starts with the ELF magic number.
pub fn is_elf(path: &Path) -> io::Result<bool> {
    let mut magic = [0u8; 4];
    let mut file = File::open(path)?;
    match file.read_exact(&mut magic) {
        Ok(()) => Ok(magic == ELF_MAGIC),
        Err(err) if err.kind() == io::ErrorKind::UnexpectedEof => Ok(false),
        Err(err) => Err(err),
    }
}

#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("failed to run dependency resolver for {}: {source}", binary.display())]
    Spawn {
        binary: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("dependency resolution failed for {}: {message}", binary.display())]
    Failed { binary: PathBuf, message: String },

    #[error("unexpected dependency resolver output for {}: {line:?}", binary.display())]
    Unparseable { binary: PathBuf, line: String },
}

/// Maps a binary to the absolute paths of every shared library it loads.
///
/// The list is the full transitive closure and excludes the binary itself.
pub trait DependencyResolver {
    fn dependencies(&self, binary: &Path) -> Result<Vec<PathBuf>, ResolveError>;
}

/// Resolver backed by the system `ldd`.
#[derive(Debug, Clone)]
pub struct LddResolver {
    program: PathBuf,
}

impl Default for LddResolver {
    fn default() -> Self {
        Self { program: PathBuf::from("ldd") }
    }
}

impl LddResolver {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self { program: program.into() }
    }
}

impl DependencyResolver for LddResolver {
    fn dependencies(&self, binary: &Path) -> Result<Vec<PathBuf>, ResolveError> {
        let output = Command::new(&self.program)
            .arg(binary)
            .output()
            .map_err(|source| ResolveError::Spawn { binary: binary.to_path_buf(), source })?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);

        if !output.status.success() {
            // Static binaries and scripts have nothing to resolve.
            if stderr.contains("not a dynamic executable") {
                return Ok(Vec::new());
            }
            return Err(ResolveError::Failed {
                binary: binary.to_path_buf(),
                message: stderr.trim().to_string(),
            });
        }

        parse_ldd_output(binary, &stdout)
    }
}

/// Parse `ldd` stdout into absolute library paths, in output order.
pub fn parse_ldd_output(binary: &Path, output: &str) -> Result<Vec<PathBuf>, ResolveError> {
    let mut deps = Vec::new();

    for line in output.lines().map(str::trim).filter(|l| !l.is_empty()) {
        if line.contains("statically linked") {
            continue;
        }

        let target = match line.split_once("=>") {
            Some((name, rest)) => {
                let rest = rest.trim();
                if rest.starts_with("not found") {
                    return Err(ResolveError::Failed {
                        binary: binary.to_path_buf(),
                        message: format!("missing library {}", name.trim()),
                    });
                }
                strip_load_address(rest)
            }
            None => strip_load_address(line),
        };

        match target {
            // Virtual objects such as linux-vdso.so.1 have no file behind them.
            "" => continue,
            path if path.starts_with('/') => deps.push(PathBuf::from(path)),
            _ if !line.contains("=>") => continue,
            _ => {
                return Err(ResolveError::Unparseable {
                    binary: binary.to_path_buf(),
                    line: line.to_string(),
                })
            }
        }
    }

    Ok(deps)
}

fn strip_load_address(text: &str) -> &str {
    match text.rfind(" (0x") {
        Some(idx) => text[..idx].trim(),
        None if text.starts_with("(0x") => "",
        None => text.trim(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    const LDD_OUTPUT: &str = "\tlinux-vdso.so.1 (0x00007ffd7c5f2000)
\tlibpcre2-8.so.0 => /lib/x86_64-linux-gnu/libpcre2-8.so.0 (0x00007f1c1a2b0000)
\tlibc.so.6 => /lib/x86_64-linux-gnu/libc.so.6 (0x00007f1c1a000000)
\t/lib64/ld-linux-x86-64.so.2 (0x00007f1c1a3a0000)
";

    #[test]
    fn parses_ldd_listing() {
        let deps = parse_ldd_output(Path::new("/usr/bin/grep"), LDD_OUTPUT).expect("parse");
        assert_eq!(
            deps,
            vec![
                PathBuf::from("/lib/x86_64-linux-gnu/libpcre2-8.so.0"),
                PathBuf::from("/lib/x86_64-linux-gnu/libc.so.6"),
                PathBuf::from("/lib64/ld-linux-x86-64.so.2"),
            ]
        );
    }

    #[test]
    fn static_binary_has_no_dependencies() {
        let deps = parse_ldd_output(Path::new("/bin/app"), "\tstatically linked\n").expect("parse");
        assert!(deps.is_empty());
    }

    #[test]
    fn missing_library_is_an_error() {
        let output = "\tlibmissing.so.1 => not found\n";
        let err = parse_ldd_output(Path::new("/bin/app"), output).unwrap_err();
        assert!(matches!(err, ResolveError::Failed { .. }));
        assert!(err.to_string().contains("libmissing.so.1"));
    }

    #[test]
    fn relative_resolution_is_unparseable() {
        let output = "\tlibodd.so => odd/libodd.so (0x0000)\n";
        let err = parse_ldd_output(Path::new("/bin/app"), output).unwrap_err();
        assert!(matches!(err, ResolveError::Unparseable { .. }));
    }

    #[test]
    fn shell_table_matches_basename() {
        assert!(is_shell_or_cmd(Path::new("/bin/sh")));
        assert!(is_shell_or_cmd(Path::new("/usr/bin/env")));
        assert!(!is_shell_or_cmd(Path::new("/usr/bin/python3")));
        assert!(!is_shell_or_cmd(Path::new("/")));
    }

    #[test]
    fn elf_detection_reads_magic() {
        let tmp = TempDir::new().expect("tmp");
        let elf = tmp.path().join("prog");
        fs::write(&elf, [0x7f, b'E', b'L', b'F', 2, 1, 1]).expect("write");
        let script = tmp.path().join("script");
        fs::write(&script, "#!/bin/sh\necho hi\n").expect("write");
        let tiny = tmp.path().join("tiny");
        fs::write(&tiny, "x").expect("write");

        assert!(is_elf(&elf).expect("elf"));
        assert!(!is_elf(&script).expect("script"));
        assert!(!is_elf(&tiny).expect("tiny"));
        assert!(is_elf(&tmp.path().join("absent")).is_err());
    }

    #[test]
    fn missing_resolver_program_is_spawn_error() {
        let resolver = LddResolver::new("/nonexistent/ldd-for-tests");
        let err = resolver.dependencies(Path::new("/bin/true")).unwrap_err();
        assert!(matches!(err, ResolveError::Spawn { .. }));
    }
}
