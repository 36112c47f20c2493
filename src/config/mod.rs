//! Configuration loading and merging
//!
//! Handles loading from config files and CLI arguments with proper
//! precedence (CLI > File > Defaults), and building the active match list.

pub mod loader;
pub mod matcher;
pub mod merge;

pub use loader::load_config;
pub use matcher::{build_file_list, staging_rules};
pub use merge::{merge_cli_with_config, CliOverrides};
