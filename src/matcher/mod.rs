//! Gitignore-style match lists
//!
//! One evaluator ([`PathMatcher`]) answers "which rule won, and with what
//! polarity"; [`IgnoreList`] and [`KeepList`] turn that answer into a
//! keep/drop decision with opposite defaults.

pub mod error;
pub mod header;
pub mod pattern;
pub mod policy;
pub mod set;

pub use error::{HeaderError, MatchError};
pub use header::VersionHeader;
pub use pattern::{Pattern, Polarity};
pub use policy::{FileList, IgnoreList, KeepList, ListMode};
pub use set::{LoadedList, PathMatcher};
