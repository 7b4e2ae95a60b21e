//! Error types for the SimpleDB storage engine.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// The result type used throughout SimpleDB.
pub type Result<T> = std::result::Result<T, Error>;

/// The error type for SimpleDB operations.
#[derive(Debug, Error)]
pub enum Error {
    /// An I/O error occurred in the underlying file.
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// A buffer read or write ran past the end of its fixed length.
    #[error("Buffer overflow: requested {requested} bytes, {remaining} remaining")]
    Overflow {
        /// Number of bytes the operation needed.
        requested: usize,
        /// Number of bytes left in the buffer.
        remaining: usize,
    },

    /// The database file could not be created or opened.
    #[error("Invalid file path: {0:?}")]
    InvalidPath(PathBuf),

    /// On-disk structures disagree with each other.
    #[error("Data corruption: {0}")]
    Corruption(String),

    /// An invalid argument was provided.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}

impl Error {
    /// Creates a new corruption error.
    pub fn corruption(msg: impl Into<String>) -> Self {
        Error::Corruption(msg.into())
    }

    /// Creates a new invalid argument error.
    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        Error::InvalidArgument(msg.into())
    }

    /// Creates a new overflow error.
    pub fn overflow(requested: usize, remaining: usize) -> Self {
        Error::Overflow { requested, remaining }
    }

    /// Returns true if this error signals on-disk corruption.
    pub fn is_corruption(&self) -> bool {
        matches!(self, Error::Corruption(_))
    }
}
