//! Unified error handling for the migration-replay library.
//!
//! Row-level defects (a malformed CSV row, an unparseable datetime) are
//! recovered during normalization and never surface here; only a dataset
//! that cannot be read at all produces an error.

use thiserror::Error;

/// Unified error type for migration-replay operations.
#[derive(Debug, Error)]
pub enum MigrationError {
    /// The compact dataset could not be deserialized at all.
    #[error("compact dataset is not valid JSON: {0}")]
    DatasetFormat(#[from] serde_json::Error),

    /// The CSV reader could not read the dataset's header row.
    #[error("csv dataset could not be read: {0}")]
    DatasetRead(#[from] csv::Error),

    /// Invalid construction parameters.
    #[error("invalid configuration: {message}")]
    Config { message: String },
}

/// Result type alias for migration-replay operations.
pub type Result<T> = std::result::Result<T, MigrationError>;
