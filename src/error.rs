use std::path::PathBuf;

use thiserror::Error;

/// Named failure conditions of the pipeline
///
/// Everything else (unreadable sources, unscoreable answers) is recovered
/// locally and only logged.
#[derive(Error, Debug)]
pub enum ConsolidaError {
    #[error("No data was processed: none of the {sources} configured sources yielded rows")]
    NoDataProcessed { sources: usize },

    #[error("Consolidated dataset not found at {0:?}; run `consolida consolidate` first")]
    DatasetNotFound(PathBuf),

    #[error("Consolidated dataset {path:?} is missing column {column}")]
    MalformedDataset { path: PathBuf, column: &'static str },

    #[error("Invalid source manifest: {0}")]
    InvalidManifest(String),
}
