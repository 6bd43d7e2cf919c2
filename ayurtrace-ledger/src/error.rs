//! Error types for the ledger
//!
//! Business-rule outcomes (a rejected transaction, an empty trace) are
//! ordinary return values and never appear here.

use thiserror::Error;

/// Result type for ledger operations
pub type Result<T> = std::result::Result<T, Error>;

/// Ledger errors
#[derive(Error, Debug)]
pub enum Error {
    /// Digest primitive unavailable or failed
    #[error("Hashing failed: {0}")]
    Hashing(String),

    /// Block does not extend the current tip
    #[error("Invalid block: {0}")]
    InvalidBlock(String),

    /// Block would give a parent a second child
    #[error("Fork rejected: block {index} with parent {parent} would branch the chain")]
    Fork {
        /// Index carried by the rejected block
        index: u64,
        /// Previous hash carried by the rejected block
        parent: String,
    },

    /// Chain integrity check failed
    #[error("Integrity violation at block {index}: {reason}")]
    Integrity {
        /// Offending block index
        index: u64,
        /// What was wrong
        reason: String,
    },

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Concurrency error (actor mailbox closed, etc.)
    #[error("Concurrency error: {0}")]
    Concurrency(String),

    /// Narrative summary service failure
    #[error("Summary service error: {0}")]
    Summary(String),

    /// Metrics registration error
    #[error("Metrics error: {0}")]
    Metrics(#[from] prometheus::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        Error::Summary(err.to_string())
    }
}
