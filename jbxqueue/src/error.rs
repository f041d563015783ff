//! Errors reported by the playback queue.

use jbxsource::SourceError;

#[derive(Debug, thiserror::Error)]
pub enum QueueError {
    /// No registered adapter handles this source id
    #[error("No adapter registered for source '{0}'")]
    AdapterNotFound(String),

    #[error("Queue index {index} out of range (queue length {len})")]
    OutOfRange { index: usize, len: usize },

    /// Another transition holds the guard; the command was not executed.
    #[error("Transition skipped: another transition is in progress")]
    TransitionSkipped,

    #[error(transparent)]
    Backend(#[from] SourceError),
}

impl QueueError {
    /// Guard contention is a no-op signal rather than a failure
    pub fn is_skipped(&self) -> bool {
        matches!(self, QueueError::TransitionSkipped)
    }
}

pub type Result<T> = std::result::Result<T, QueueError>;
