//! Common error types used throughout mixburn.
//!
//! These cover the media library collaborator: reading a manifest, decoding it,
//! and rejecting descriptors that break the data model.

use std::path::PathBuf;

/// Common error type for mixburn.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The library source could not be read.
    #[error("failed to read library {}: {source}", path.display())]
    LibraryRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The library source could not be decoded.
    #[error("failed to parse library {}: {source}", path.display())]
    LibraryParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// A track descriptor violates the data model.
    #[error("Invalid track: {0}")]
    InvalidTrack(String),
}

impl Error {
    /// Create a new InvalidTrack error.
    pub fn invalid_track<S: Into<String>>(msg: S) -> Self {
        Self::InvalidTrack(msg.into())
    }
}

/// Result type alias using the common Error type.
pub type Result<T> = std::result::Result<T, Error>;
