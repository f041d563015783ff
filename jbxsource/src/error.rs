//! Error types shared by every playback backend.

/// Error types for backend operations
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    /// The backend needs the user to (re)authenticate before it can answer.
    #[error("Not Authenticated")]
    NotAuthenticated,

    #[error("Track from source '{found}' cannot be handled by the '{expected}' adapter")]
    SourceMismatch { expected: String, found: String },

    #[error("Backend operation failed: {0}")]
    Backend(String),

    #[error("Invalid track data: {0}")]
    InvalidTrack(String),
}

impl SourceError {
    pub fn backend(message: impl std::fmt::Display) -> Self {
        SourceError::Backend(message.to_string())
    }

    /// True when the caller should prompt for reauthentication rather than
    /// report a generic failure.
    pub fn is_not_authenticated(&self) -> bool {
        matches!(self, SourceError::NotAuthenticated)
    }
}

/// Result type for backend operations
pub type Result<T> = std::result::Result<T, SourceError>;
