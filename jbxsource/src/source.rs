//! The capability contract every playback backend satisfies.

use std::fmt::Debug;
use std::sync::Arc;

use crate::error::{Result, SourceError};
use crate::track::{AudioStatus, AudioTrack};

/// Live, stateful playback handle bound to one [`AudioTrack`].
///
/// A source is owned by exactly one of the queue, the now-playing slot or
/// the history at any time. Backend resources are acquired lazily by
/// [`preload`](AudioSource::preload) or [`start`](AudioSource::start) and
/// released by [`stop`](AudioSource::stop).
///
/// # Thread Safety
///
/// Implementations must be `Send + Sync`; all methods take `&self` so that
/// implementors keep their mutable backend state behind interior mutability.
#[async_trait::async_trait]
pub trait AudioSource: Debug + Send + Sync {
    /// Current descriptor of the bound track.
    ///
    /// Backends may refine `name`/`artist` once the media is loaded.
    fn track(&self) -> AudioTrack;

    /// Readiness probe: true when backend resources are prepared
    async fn loaded(&self) -> bool;

    /// Prepares backend resources without starting playback. Idempotent.
    async fn preload(&self) -> Result<()>;

    async fn status(&self) -> Result<AudioStatus>;

    async fn pause(&self) -> Result<()>;

    async fn resume(&self) -> Result<()>;

    /// Starts playback from the beginning of the track
    async fn start(&self) -> Result<()>;

    /// Stops playback and releases every backend-held resource. Idempotent.
    async fn stop(&self) -> Result<()>;
}

/// Shared handle to a source; moving it between containers moves ownership.
pub type SharedSource = Arc<dyn AudioSource>;

/// Guards the invariant that an adapter only builds sources for its own tracks.
pub fn ensure_source(expected: &str, track: &AudioTrack) -> Result<()> {
    if track.source() == expected {
        Ok(())
    } else {
        Err(SourceError::SourceMismatch {
            expected: expected.to_string(),
            found: track.source().to_string(),
        })
    }
}
