//! Version metadata embedded at the top of match-list files
//!
//! The header is two comment lines of `key=value` pairs behind a fixed
//! prefix, e.g.
//!
//! ```text
//! #slimtree.ver.info:file.ver=v1alpha1
//! #slimtree.ver.info:slimtree.ver=0.3.0
//! ```
//!
//! Pattern loaders treat these lines as comments; only this codec reads them.

use super::error::HeaderError;
use std::collections::HashSet;
use std::io::{self, Write};

const VERSION_LINE_PREFIX: &str = "slimtree.ver.info:";
const COMMENTED_PREFIX: &str = "#slimtree.ver.info:";

const FILE_VERSION_KEY: &str = "file.ver";
const TOOL_VERSION_KEY: &str = "slimtree.ver";

/// Current match-list format version.
pub const LIST_FORMAT_VERSION: &str = "v1alpha1";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VersionHeader {
    pub list_format_version: String,
    pub tool_version: String,
}

impl VersionHeader {
    /// Header describing files written by this build.
    pub fn current() -> Self {
        Self {
            list_format_version: LIST_FORMAT_VERSION.to_string(),
            tool_version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }

    /// Emit the two header lines followed by a blank separator line.
    pub fn write<W: Write>(&self, out: &mut W) -> io::Result<()> {
        writeln!(out, "#{VERSION_LINE_PREFIX}{FILE_VERSION_KEY}={}", self.list_format_version)?;
        writeln!(out, "#{VERSION_LINE_PREFIX}{TOOL_VERSION_KEY}={}", self.tool_version)?;
        writeln!(out)
    }

    /// Parse header lines. Lines without the version prefix are skipped.
    pub fn parse<'a, I>(lines: I) -> Result<Self, HeaderError>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut header = Self::default();
        let mut seen = HashSet::new();
        for line in lines.into_iter().filter(|line| is_version_line(line)) {
            let body = line.trim().trim_start_matches(COMMENTED_PREFIX);
            for pair in body.split(',') {
                let Some((key, value)) = pair.split_once('=') else {
                    return Err(HeaderError::Malformed(body.to_string()));
                };
                let slot = match key {
                    FILE_VERSION_KEY => &mut header.list_format_version,
                    TOOL_VERSION_KEY => &mut header.tool_version,
                    _ => return Err(HeaderError::UnknownKey(pair.to_string())),
                };
                if !seen.insert(key) {
                    return Err(HeaderError::DuplicateKey(key.to_string()));
                }
                *slot = value.to_string();
            }
        }
        Ok(header)
    }
}

/// True for comment lines carrying version metadata.
pub fn is_version_line(line: &str) -> bool {
    line.trim().starts_with(COMMENTED_PREFIX)
}
