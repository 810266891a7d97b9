//! Unified error type for the hintbox workspace.
//!
//! All crates funnel their failures into [`Error`]. The mutation pipeline
//! wraps stage failures in [`Error::Stage`] so the caller always learns which
//! stage aborted the run.

use std::fmt;

/// Unified error type covering all failure modes in hintbox.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A media source could not be imported (bad or unsupported input).
    #[error("Import failed [{source_name}]: {message}")]
    ImportFailure {
        /// The source being imported (path or label).
        source_name: String,
        /// Human-readable error description.
        message: String,
    },

    /// No elementary stream descriptor where one was required.
    #[error("Missing stream descriptor: {0}")]
    DescriptorMissing(String),

    /// The stream type cannot be hinted or embedded.
    #[error("Unsupported stream type: {0}")]
    UnsupportedStreamType(String),

    /// An embed candidate exceeds the descriptor size limit.
    #[error("Size limit exceeded: {what} is {actual} bytes, limit {limit}")]
    SizeLimitExceeded {
        /// What was being embedded.
        what: String,
        /// Size after base64 expansion.
        actual: usize,
        /// The applicable descriptor limit.
        limit: usize,
    },

    /// The underlying container write failed.
    #[error("Storage failure: {0}")]
    StorageFailure(String),

    /// A mutation request was malformed or unresolvable.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// The referenced track does not exist in the movie.
    #[error("Track not found: {0}")]
    TrackNotFound(String),

    /// An I/O operation failed.
    #[error("IO error: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// A pipeline stage failed.
    #[error("Stage error [{stage}]: {message}")]
    Stage {
        /// The pipeline stage that failed.
        stage: String,
        /// Human-readable error description.
        message: String,
    },
}

impl Error {
    /// Convenience constructor for [`Error::ImportFailure`].
    pub fn import(source_name: impl Into<String>, message: impl Into<String>) -> Self {
        Error::ImportFailure {
            source_name: source_name.into(),
            message: message.into(),
        }
    }

    /// Convenience constructor for [`Error::TrackNotFound`].
    pub fn track_not_found(id: impl fmt::Display) -> Self {
        Error::TrackNotFound(id.to_string())
    }

    /// Convenience constructor for [`Error::Stage`].
    pub fn stage(stage: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Stage {
            stage: stage.into(),
            message: message.into(),
        }
    }

    /// Convenience constructor for [`Error::SizeLimitExceeded`].
    pub fn size_limit(what: impl Into<String>, actual: usize, limit: usize) -> Self {
        Error::SizeLimitExceeded {
            what: what.into(),
            actual,
            limit,
        }
    }
}

/// Result alias using the crate-level [`Error`].
pub type Result<T> = std::result::Result<T, Error>;
