//! Match-list file generation
//!
//! Output layout: version header, banner, one section per requested stack
//! (sorted by name), a common section, then system certificate and private
//! key paths.

pub mod section;
pub mod stacks;

pub use section::{glob_all, FileSection};
pub use stacks::{AppStack, StackRegistry};

use crate::matcher::{ListMode, VersionHeader};
use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;

const CERT_DIRS: &[&str] = &[
    "/etc/ssl/certs",
    "/etc/pki/tls/certs",
    "/etc/pki/ca-trust/extracted",
    "/etc/ca-certificates",
    "/usr/share/ca-certificates",
    "/usr/local/share/ca-certificates",
];

const PRIVATE_KEY_DIRS: &[&str] = &["/etc/ssl/private", "/etc/pki/tls/private"];

const COMMON_DROPS: &[&str] = &["/var/cache/apt/**", "/var/lib/apt/lists/**", "/var/log/**/*.log"];

#[derive(Debug, Error)]
pub enum GenerateError {
    #[error("these stacks are not implemented yet: {}", .0.join(", "))]
    UnknownStacks(Vec<String>),

    #[error("failed writing {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

pub struct Generator<'a> {
    mode: ListMode,
    stacks: Vec<&'a dyn AppStack>,
    keep_certs: bool,
}

impl<'a> Generator<'a> {
    pub fn new(mode: ListMode) -> Self {
        Self { mode, stacks: Vec::new(), keep_certs: true }
    }

    /// Resolve `names` against `registry`; all unknown names are reported together.
    pub fn with_stacks<S: AsRef<str>>(
        mut self,
        registry: &'a StackRegistry,
        names: &[S],
    ) -> Result<Self, GenerateError> {
        let mut stacks = registry.select(names).map_err(GenerateError::UnknownStacks)?;
        stacks.sort_by_key(|stack| stack.name());
        stacks.dedup_by_key(|stack| stack.name());
        self.stacks = stacks;
        Ok(self)
    }

    pub fn keep_certs(mut self, keep: bool) -> Self {
        self.keep_certs = keep;
        self
    }

    pub fn run<W: Write>(&self, out: &mut W) -> io::Result<()> {
        VersionHeader::current().write(out)?;
        out.write_all(banner(self.mode).as_bytes())?;

        for stack in &self.stacks {
            out.write_all(stack.section(self.mode).as_str().as_bytes())?;
        }
        out.write_all(common_section(self.mode).as_str().as_bytes())?;
        out.write_all(certs_section(self.mode, self.keep_certs).as_str().as_bytes())?;
        out.flush()
    }

    /// Write to `path`, creating its directory and replacing any existing file.
    pub fn run_file(&self, path: &Path) -> Result<(), GenerateError> {
        let io_err = |source: io::Error| GenerateError::Io { path: path.to_path_buf(), source };

        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir).map_err(io_err)?;
        }
        let file = File::create(path).map_err(io_err)?;
        let mut out = BufWriter::new(file);
        self.run(&mut out).map_err(io_err)?;
        tracing::info!("Wrote {} list to {}", self.mode, path.display());
        Ok(())
    }
}

fn banner(mode: ListMode) -> String {
    let rule = "#".repeat(77);
    format!(
        "{rule}\n### This is a {name} file, consumed by 'slimtree materialize' to decide\n### which traced files make it into the pruned tree. Tailor it to your\n### application's needs.\n{rule}\n",
        name = mode.default_file_name(),
    )
}

fn common_section(mode: ListMode) -> FileSection {
    let mut f = FileSection::new(mode);
    f.header("\n## Common paths ##");
    for rule in COMMON_DROPS {
        f.drop(rule);
    }
    f
}

fn certs_section(mode: ListMode, keep: bool) -> FileSection {
    let mut f = FileSection::new(mode);
    let verb = if keep { "keep" } else { "drop" };

    f.header(&format!("\n## System cert paths to {verb} ##"));
    write_path_set(&mut f, CERT_DIRS, keep);

    f.header(&format!("\n## System private key paths to {verb} ##"));
    write_path_set(&mut f, PRIVATE_KEY_DIRS, keep);
    f
}

fn write_path_set(f: &mut FileSection, dirs: &[&str], keep: bool) {
    let mut rules: Vec<String> = dirs.iter().map(|dir| glob_all(dir)).collect();
    rules.sort();
    rules.dedup();
    for rule in &rules {
        if keep {
            f.keep(rule);
        } else {
            f.drop(rule);
        }
    }
}
