//! Backend adapters: search and [`AudioSource`](crate::AudioSource) factories.

use std::fmt::Debug;

use crate::error::Result;
use crate::source::SharedSource;
use crate::track::AudioTrack;

/// A playback backend (YouTube, Spotify, ...).
///
/// # Examples
///
/// ```rust,ignore
/// let adapter = registry.resolve("youtube").await.ok_or(...)?;
/// let source = adapter.create_audio_source(track)?;
/// ```
#[async_trait::async_trait]
pub trait SourceAdapter: Debug + Send + Sync {
    /// Unique backend identifier, matched against [`AudioTrack::source`]
    fn id(&self) -> &str;

    /// Human-readable backend name
    fn display_name(&self) -> &str;

    /// Wraps a track into a playable source.
    ///
    /// Fails with [`SourceMismatch`](crate::SourceError::SourceMismatch) when
    /// the track belongs to another backend.
    fn create_audio_source(&self, track: AudioTrack) -> Result<SharedSource>;

    /// Searches the backend catalog.
    ///
    /// Returns [`NotAuthenticated`](crate::SourceError::NotAuthenticated)
    /// when the backend needs credentials; this is not "no results".
    async fn search_for(&self, query: &str) -> Result<Vec<AudioTrack>>;

    /// Whether the backend currently holds valid credentials
    async fn is_authenticated(&self) -> bool {
        true
    }
}
