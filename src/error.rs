//! Error types for the precache library.

use thiserror::Error;

/// Errors that can occur during cache operations.
#[derive(Error, Debug)]
pub enum Error {
    /// HTTP transport error while fetching a resource.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// I/O error from the disk store or a manifest file.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Snapshot metadata could not be encoded or decoded.
    #[error("snapshot codec error: {0}")]
    Snapshot(#[from] serde_json::Error),

    /// Configuration or URL list is invalid.
    #[error("configuration error: {0}")]
    Config(String),

    /// Precaching a listed resource failed, aborting the install.
    #[error("precache failed for {url}: {reason}")]
    Precache {
        /// Resource that could not be cached.
        url: String,
        /// Underlying failure description.
        reason: String,
    },

    /// A resource answered with a non-success status during install.
    #[error("unexpected status {status} for {url}")]
    UnexpectedStatus {
        /// Resource that was fetched.
        url: String,
        /// HTTP status code received.
        status: u16,
    },

    /// Neither the requested resource nor the offline fallback could be served.
    #[error("offline fallback is not cached")]
    OfflineUnavailable,
}

/// A specialized `Result` type for precache operations.
pub type Result<T> = std::result::Result<T, Error>;
