//! Ordered rule sets and match-list file loading

use super::error::{HeaderError, MatchError};
use super::header::{is_version_line, VersionHeader};
use super::pattern::{Pattern, Polarity};
use crate::utils::split_components;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

/// Append-only, ordered collection of [`Pattern`]s.
///
/// Later rules take precedence over earlier ones. The matcher only reports
/// which polarity won; turning that into keep/drop is the job of the list
/// mode wrappers in [`super::policy`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(try_from = "RuleListRepr", into = "RuleListRepr")]
pub struct PathMatcher {
    patterns: Vec<Pattern>,
}

/// Result of reading a match-list file.
#[derive(Debug)]
pub struct LoadedList {
    pub matcher: PathMatcher,
    /// `None` when the file carries no version lines.
    pub header: Option<Result<VersionHeader, HeaderError>>,
}

impl PathMatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, pattern: Pattern) {
        self.patterns.push(pattern);
    }

    /// Compile and append a rule; it outranks everything added before it.
    pub fn add_pattern(&mut self, text: &str, domain: &[String]) -> Result<(), MatchError> {
        self.add(Pattern::compile(text, domain)?);
        Ok(())
    }

    pub fn patterns(&self) -> &[Pattern] {
        &self.patterns
    }

    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    /// Polarity of the highest-precedence rule matching `path`, if any.
    ///
    /// Rules are scanned newest first and the first hit wins, which is the
    /// same answer a forward scan keeping the final hit would give.
    pub fn matches(&self, path: &str, is_dir: bool) -> Option<Polarity> {
        let components = split_components(path);
        self.patterns
            .iter()
            .rev()
            .find(|pattern| pattern.matches(&components, is_dir))
            .map(Pattern::polarity)
    }

    /// Index of the highest-precedence rule matching `path`, if any.
    pub fn winning_index(&self, path: &str, is_dir: bool) -> Option<usize> {
        let components = split_components(path);
        self.patterns.iter().rposition(|pattern| pattern.matches(&components, is_dir))
    }

    /// Load a match-list file with every rule scoped to `domain`.
    pub fn load(path: &Path, domain: &[String]) -> Result<LoadedList, MatchError> {
        let file = File::open(path)
            .map_err(|source| MatchError::Io { path: path.to_path_buf(), source })?;
        Self::from_reader(BufReader::new(file), domain)
            .map_err(|err| with_path(err, path))
    }

    /// Parse match-list text. Blank and `#` lines are skipped; version
    /// lines are collected for the header codec; everything else is a rule.
    pub fn from_reader<R: BufRead>(reader: R, domain: &[String]) -> Result<LoadedList, MatchError> {
        let mut matcher = Self::new();
        let mut version_lines = Vec::new();

        for line in reader.lines() {
            let line = line.map_err(|source| MatchError::Io { path: Default::default(), source })?;
            let line = line.trim();

            if is_version_line(line) {
                version_lines.push(line.to_string());
            } else if line.is_empty() || line.starts_with('#') {
                continue;
            } else {
                matcher.add_pattern(line, domain)?;
            }
        }

        let header = if version_lines.is_empty() {
            None
        } else {
            Some(VersionHeader::parse(version_lines.iter().map(String::as_str)))
        };

        Ok(LoadedList { matcher, header })
    }
}

fn with_path(err: MatchError, path: &Path) -> MatchError {
    match err {
        MatchError::Io { source, .. } => MatchError::Io { path: path.to_path_buf(), source },
        other => other,
    }
}

#[derive(Serialize, Deserialize)]
struct RuleRepr {
    #[serde(rename = "str")]
    text: String,
    domains: Vec<String>,
}

#[derive(Serialize, Deserialize)]
struct RuleListRepr {
    pats: Vec<RuleRepr>,
}

impl From<PathMatcher> for RuleListRepr {
    fn from(matcher: PathMatcher) -> Self {
        let pats = matcher
            .patterns
            .iter()
            .map(|p| RuleRepr { text: p.raw().to_string(), domains: p.domain().to_vec() })
            .collect();
        Self { pats }
    }
}

impl TryFrom<RuleListRepr> for PathMatcher {
    type Error = MatchError;

    fn try_from(repr: RuleListRepr) -> Result<Self, Self::Error> {
        let mut matcher = PathMatcher::new();
        for rule in repr.pats {
            matcher.add_pattern(&rule.text, &rule.domains)?;
        }
        Ok(matcher)
    }
}
