//! Artifact store: builds the pruned tree from selection verdicts

pub mod binary;
pub mod fsutil;
pub mod materializer;
pub mod umask;

pub use binary::{DependencyResolver, LddResolver, ResolveError};
pub use materializer::{MaterializeOptions, MaterializeStats, Materializer, FILES_DIR};
pub use umask::UmaskGuard;

use std::path::PathBuf;
use thiserror::Error;

/// Errors that abort a whole materialization run.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to create destination root {}: {source}", path.display())]
    Setup {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
