//! A single compiled match rule

use super::error::MatchError;
use globset::{GlobBuilder, GlobMatcher};

/// Prefix that flips a rule's polarity within its list mode.
pub const NEGATION_PREFIX: char = '!';

const SEPARATOR: char = '/';
const ANY_DEPTH: &str = "**";

/// Which way a matching rule points, before the list mode interprets it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Polarity {
    /// The rule had no negation prefix.
    Direct,
    /// The rule was written with a leading `!`.
    Negated,
}

#[derive(Debug, Clone)]
enum Segment {
    AnyDepth,
    Glob(GlobMatcher),
}

#[derive(Debug, Clone)]
enum Shape {
    /// No separator in the rule: matches a component at any depth.
    Name(GlobMatcher),
    /// Separator-bearing rule: matched component by component from the scope root.
    Path(Vec<Segment>),
}

/// One compiled rule: glob, scope and polarity. Immutable once built.
#[derive(Debug, Clone)]
pub struct Pattern {
    raw: String,
    domain: Vec<String>,
    negated: bool,
    dir_only: bool,
    anchored: bool,
    shape: Shape,
}

impl Pattern {
    /// Compile a single rule line scoped to `domain`.
    ///
    /// Grammar follows ignore files: `!` negates, a trailing `/` restricts the
    /// rule to directories, a separator anywhere but the end anchors the rule
    /// to the scope root, `*` stays within one component and `**` spans any
    /// number of them.
    pub fn compile(line: &str, domain: &[String]) -> Result<Self, MatchError> {
        let mut body = line;
        let negated = body.starts_with(NEGATION_PREFIX);
        if negated {
            body = &body[NEGATION_PREFIX.len_utf8()..];
        }

        // Trailing spaces are insignificant unless escaped.
        if !body.ends_with("\\ ") {
            body = body.trim_end_matches(' ');
        }

        let dir_only = body.ends_with(SEPARATOR);
        if dir_only {
            body = &body[..body.len() - 1];
        }

        let anchored = body.contains(SEPARATOR);
        let shape = if anchored {
            let segments = body
                .split(SEPARATOR)
                .filter(|segment| !segment.is_empty())
                .map(|segment| compile_segment(segment, line))
                .collect::<Result<Vec<_>, _>>()?;
            if segments.is_empty() {
                Shape::Name(compile_glob("", line)?)
            } else {
                Shape::Path(segments)
            }
        } else {
            Shape::Name(compile_glob(body, line)?)
        };

        Ok(Self { raw: line.to_string(), domain: domain.to_vec(), negated, dir_only, anchored, shape })
    }

    /// The rule exactly as it was written.
    pub fn raw(&self) -> &str {
        &self.raw
    }

    pub fn domain(&self) -> &[String] {
        &self.domain
    }

    pub fn is_negated(&self) -> bool {
        self.negated
    }

    pub fn is_dir_only(&self) -> bool {
        self.dir_only
    }

    pub fn is_anchored(&self) -> bool {
        self.anchored
    }

    pub fn polarity(&self) -> Polarity {
        if self.negated {
            Polarity::Negated
        } else {
            Polarity::Direct
        }
    }

    /// Structural match of path components against this rule.
    ///
    /// A rule also matches every descendant of a path it matches, so a rule
    /// naming a directory covers the whole subtree. Rules never match outside
    /// their domain or the domain directory itself.
    pub fn matches(&self, components: &[&str], is_dir: bool) -> bool {
        if components.len() <= self.domain.len() {
            return false;
        }
        if !self.domain.iter().zip(components).all(|(scope, component)| scope == component) {
            return false;
        }

        let rest = &components[self.domain.len()..];
        match &self.shape {
            Shape::Name(glob) => self.name_match(glob, rest, is_dir),
            Shape::Path(segments) => self.path_match(segments, rest, is_dir),
        }
    }

    fn name_match(&self, glob: &GlobMatcher, rest: &[&str], is_dir: bool) -> bool {
        match rest.iter().position(|component| glob.is_match(component)) {
            Some(idx) => !(self.dir_only && !is_dir && idx + 1 == rest.len()),
            None => false,
        }
    }

    fn path_match(&self, segments: &[Segment], rest: &[&str], is_dir: bool) -> bool {
        let Some((segment, tail)) = segments.split_first() else {
            // Every segment consumed; leftover components are descendants.
            return !rest.is_empty() || !self.dir_only || is_dir;
        };

        match segment {
            // Trailing `/**` covers strict descendants only.
            Segment::AnyDepth if tail.is_empty() => !rest.is_empty(),
            Segment::AnyDepth => {
                (0..=rest.len()).any(|skip| self.path_match(tail, &rest[skip..], is_dir))
            }
            Segment::Glob(glob) => match rest.split_first() {
                Some((first, remaining)) if glob.is_match(first) => {
                    self.path_match(tail, remaining, is_dir)
                }
                _ => false,
            },
        }
    }
}

fn compile_segment(segment: &str, line: &str) -> Result<Segment, MatchError> {
    if segment == ANY_DEPTH {
        return Ok(Segment::AnyDepth);
    }
    compile_glob(segment, line).map(Segment::Glob)
}

fn compile_glob(glob: &str, line: &str) -> Result<GlobMatcher, MatchError> {
    GlobBuilder::new(glob)
        .literal_separator(true)
        .backslash_escape(true)
        .build()
        .map(|glob| glob.compile_matcher())
        .map_err(|source| MatchError::InvalidGlob { pattern: line.to_string(), source })
}
