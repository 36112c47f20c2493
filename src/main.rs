//! slimtree: prune traced container filesystems into minimal image trees
//!
//! Thin binary wrapper; all behavior lives in the library's `cli` module.

use anyhow::Result;

fn main() -> Result<()> {
    slimtree::cli::run()
}
