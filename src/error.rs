//! Error types for shardfs

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while serving or reconstructing shares
#[derive(Error, Debug)]
pub enum Error {
    /// Path does not exist (in the source tree or the virtual tree)
    #[error("not found: {}", .0.display())]
    NotFound(PathBuf),

    /// Access to an underlying file was denied
    #[error("permission denied: {}", .0.display())]
    Permission(PathBuf),

    /// I/O error from the underlying filesystem
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Share header failed validation
    #[error("corrupt share metadata: {0}")]
    CorruptMetadata(String),

    /// Fewer share files than the reconstruction threshold
    #[error("insufficient shares for reconstruction: have {available}, need {required}")]
    InsufficientShares { available: usize, required: usize },

    /// Share files disagree on metadata, size, or carry duplicate indices
    #[error("inconsistent shares: {0}")]
    InconsistentShares(String),

    /// Invariant violation inside the FEC engine
    #[error("internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Classify an open/stat failure, keeping the path for `NotFound` and
    /// `Permission` so the facade can report which entry was missing.
    pub fn from_io_at(err: std::io::Error, path: &std::path::Path) -> Self {
        match err.kind() {
            std::io::ErrorKind::NotFound => Error::NotFound(path.to_path_buf()),
            std::io::ErrorKind::PermissionDenied => Error::Permission(path.to_path_buf()),
            _ => Error::Io(err),
        }
    }

    /// Map to the host filesystem error code the facade replies with.
    pub fn errno(&self) -> i32 {
        match self {
            Error::NotFound(_) => libc::ENOENT,
            Error::Permission(_) => libc::EACCES,
            Error::Io(err) => err.raw_os_error().unwrap_or(libc::EIO),
            Error::CorruptMetadata(_)
            | Error::InsufficientShares { .. }
            | Error::InconsistentShares(_)
            | Error::Internal(_) => libc::EIO,
        }
    }
}
