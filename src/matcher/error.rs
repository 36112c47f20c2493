//! Match-list load and parse errors

use std::path::PathBuf;
use thiserror::Error;

/// Fatal error while building a [`PathMatcher`](super::PathMatcher).
#[derive(Debug, Error)]
pub enum MatchError {
    /// A rule line could not be compiled into a glob.
    #[error("failed to compile match pattern '{pattern}': {source}")]
    InvalidGlob {
        pattern: String,
        #[source]
        source: globset::Error,
    },

    /// The match-list file could not be read.
    #[error("failed reading match list {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl MatchError {
    /// Returns the offending pattern for glob errors.
    pub fn pattern(&self) -> Option<&str> {
        match self {
            MatchError::InvalidGlob { pattern, .. } => Some(pattern),
            MatchError::Io { .. } => None,
        }
    }
}

/// Malformed version metadata. Never fatal to a match-list load.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum HeaderError {
    #[error("malformed version line: {0:?}")]
    Malformed(String),

    #[error("malformed version line: duplicate key {0:?}")]
    DuplicateKey(String),

    #[error("malformed version line: unknown key in {0:?}")]
    UnknownKey(String),
}
