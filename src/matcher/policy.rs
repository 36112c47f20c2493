//! Keep/drop interpretation of matcher results
//!
//! Both list kinds share [`PathMatcher`]; they only differ in what a winning
//! rule's polarity means:
//!
//! | list   | no match | plain rule | `!` rule    |
//! |--------|----------|------------|-------------|
//! | ignore | keep     | drop       | force keep  |
//! | keep   | drop     | keep       | force drop  |

use super::error::MatchError;
use super::pattern::{Polarity, NEGATION_PREFIX};
use super::set::PathMatcher;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ListMode {
    /// Keep everything except what the list drops.
    #[default]
    Ignore,
    /// Drop everything except what the list keeps.
    Keep,
}

impl ListMode {
    /// Conventional match-list file name for this mode.
    pub fn default_file_name(self) -> &'static str {
        match self {
            ListMode::Ignore => ".slimignore",
            ListMode::Keep => ".slimkeep",
        }
    }
}

impl fmt::Display for ListMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ListMode::Ignore => write!(f, "ignore"),
            ListMode::Keep => write!(f, "keep"),
        }
    }
}

/// Ignore-list policy: a plain rule removes, a `!` rule rescues.
#[derive(Debug, Clone, Default)]
pub struct IgnoreList {
    matcher: PathMatcher,
    forced_from: Option<usize>,
}

impl IgnoreList {
    pub fn new(matcher: PathMatcher) -> Self {
        Self { matcher, forced_from: None }
    }

    pub fn is_excluded(&self, path: &str, is_dir: bool) -> bool {
        self.matcher.matches(path, is_dir) == Some(Polarity::Direct)
    }

    pub fn matcher(&self) -> &PathMatcher {
        &self.matcher
    }
}

/// Keep-list policy: a plain rule retains, a `!` rule removes.
#[derive(Debug, Clone, Default)]
pub struct KeepList {
    matcher: PathMatcher,
    forced_from: Option<usize>,
}

impl KeepList {
    pub fn new(matcher: PathMatcher) -> Self {
        Self { matcher, forced_from: None }
    }

    pub fn should_keep(&self, path: &str, is_dir: bool) -> bool {
        self.matcher.matches(path, is_dir) == Some(Polarity::Direct)
    }

    /// True only when the winning rule is a `!` rule.
    pub fn force_drop(&self, path: &str, is_dir: bool) -> bool {
        self.matcher.matches(path, is_dir) == Some(Polarity::Negated)
    }

    pub fn matcher(&self) -> &PathMatcher {
        &self.matcher
    }
}

/// A match list of either kind.
#[derive(Debug, Clone)]
pub enum FileList {
    Ignore(IgnoreList),
    Keep(KeepList),
}

impl FileList {
    pub fn new(mode: ListMode, matcher: PathMatcher) -> Self {
        match mode {
            ListMode::Ignore => FileList::Ignore(IgnoreList::new(matcher)),
            ListMode::Keep => FileList::Keep(KeepList::new(matcher)),
        }
    }

    pub fn mode(&self) -> ListMode {
        match self {
            FileList::Ignore(_) => ListMode::Ignore,
            FileList::Keep(_) => ListMode::Keep,
        }
    }

    pub fn matcher(&self) -> &PathMatcher {
        match self {
            FileList::Ignore(list) => list.matcher(),
            FileList::Keep(list) => list.matcher(),
        }
    }

    fn parts_mut(&mut self) -> (&mut PathMatcher, &mut Option<usize>) {
        match self {
            FileList::Ignore(list) => (&mut list.matcher, &mut list.forced_from),
            FileList::Keep(list) => (&mut list.matcher, &mut list.forced_from),
        }
    }

    fn forced_from(&self) -> Option<usize> {
        match self {
            FileList::Ignore(list) => list.forced_from,
            FileList::Keep(list) => list.forced_from,
        }
    }

    /// Final verdict: the highest-precedence rule decides, the mode default
    /// applies when nothing matches.
    pub fn keeps(&self, path: &str, is_dir: bool) -> bool {
        match self {
            FileList::Ignore(list) => !list.is_excluded(path, is_dir),
            FileList::Keep(list) => list.should_keep(path, is_dir),
        }
    }

    /// True when a rule (not the mode default) removed the path.
    pub fn explicitly_drops(&self, path: &str, is_dir: bool) -> bool {
        match self {
            FileList::Ignore(list) => list.is_excluded(path, is_dir),
            FileList::Keep(list) => list.force_drop(path, is_dir),
        }
    }

    /// Append a rule that removes `glob`, written with whatever polarity
    /// means "drop" in this list's mode. It outranks all earlier rules.
    pub fn add_forced_exclusion(&mut self, glob: &str) -> Result<(), MatchError> {
        let rule = match self.mode() {
            ListMode::Ignore => glob.to_string(),
            ListMode::Keep => format!("{NEGATION_PREFIX}{glob}"),
        };
        let (matcher, forced_from) = self.parts_mut();
        if forced_from.is_none() {
            *forced_from = Some(matcher.len());
        }
        matcher.add_pattern(&rule, &[])
    }

    /// True when the winning rule is one added by
    /// [`add_forced_exclusion`](Self::add_forced_exclusion).
    pub fn forced_drops(&self, path: &str, is_dir: bool) -> bool {
        match (self.forced_from(), self.matcher().winning_index(path, is_dir)) {
            (Some(start), Some(winner)) => winner >= start,
            _ => false,
        }
    }
}
