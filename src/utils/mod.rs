//! Shared helpers

pub mod paths;

pub use paths::{normalize_path, parent_dir, rebase_under, split_components};
