//! Error handling for the media collaborator interfaces

use thiserror::Error;

/// Result type alias for media operations
pub type Result<T> = std::result::Result<T, MediaError>;

/// Error type for media acquisition, rendering, and detection
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MediaError {
    /// Local capture could not be acquired
    #[error("Media unavailable: {details}")]
    MediaUnavailable { details: String },

    /// Detection model could not be loaded
    #[error("Model unavailable: {uri}")]
    ModelUnavailable { uri: String },

    /// Frame data did not match the declared dimensions
    #[error("Invalid frame: expected {expected} bytes, got {actual}")]
    InvalidFrame { expected: usize, actual: usize },
}

impl MediaError {
    /// Helper for media acquisition failures
    pub fn media_unavailable(details: impl Into<String>) -> Self {
        Self::MediaUnavailable {
            details: details.into(),
        }
    }

    /// Helper for model load failures
    pub fn model_unavailable(uri: impl Into<String>) -> Self {
        Self::ModelUnavailable { uri: uri.into() }
    }
}
