//! slimtree: prune traced container filesystems into minimal image trees
//!
//! A traced application run reports which filesystem entries it touched.
//! This crate decides, path by path, which of those entries survive (using
//! gitignore-style ignore or keep lists) and materializes the surviving set
//! as a real directory tree, including symlinks, permissions and the shared
//! library closure of every binary that is copied.

pub mod cli;
pub mod config;
pub mod domain;
pub mod generate;
pub mod matcher;
pub mod select;
pub mod store;
pub mod utils;
