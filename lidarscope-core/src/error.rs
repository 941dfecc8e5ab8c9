//! Error types for lidarscope

use thiserror::Error;

/// Main error type for lidarscope operations
///
/// Projection misses and failed picks are not errors; they are reported as
/// `None` by the functions that produce them.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Invalid data: {0}")]
    InvalidData(String),

    #[error("Invalid channel record: {0}")]
    InvalidRecord(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Result type alias for lidarscope operations
pub type Result<T> = std::result::Result<T, Error>;
