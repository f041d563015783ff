//! # Player - Moteur de transitions de la file de lecture
//!
//! Le [`Player`] possède l'état queue / historique / lecture en cours et
//! sérialise toutes les transitions derrière un jeton d'exclusion.
//!
//! ## Verrouillage
//!
//! - L'état vit dans un `std::sync::Mutex<QueueStore>`, tenu uniquement le
//!   temps d'une mise à jour synchrone, jamais à travers un `.await`.
//! - Les transitions (`next`, `previous`, `playpause`, `status`, tick du
//!   poller) prennent un [`TransitionGuard`] par `try_lock` : si une autre
//!   transition est en cours, l'appel échoue immédiatement avec
//!   [`QueueError::TransitionSkipped`] au lieu d'attendre.
//! - `shift` et `remove` ne prennent pas le jeton : ce sont des opérations
//!   purement comptables sur la file.
//!
//! ## Échecs backend
//!
//! Pendant `next`/`previous`, les erreurs de `start`/`stop` sont journalisées
//! puis ignorées : la comptabilité de la file est toujours menée à terme.
//! Pendant `playpause`/`status`, elles remontent à l'appelant.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use jbxsource::{AdapterRegistry, AudioStatus, AudioTrack, SharedSource};
use tracing::{debug, info, trace, warn};

use crate::error::{QueueError, Result};
use crate::events::{EventSink, PlayerEvent};
use crate::store::QueueStore;

/// Proof that the caller holds the transition token.
///
/// Released on drop, on every exit path.
pub struct TransitionGuard<'a> {
    _token: tokio::sync::MutexGuard<'a, ()>,
}

/// What a poller tick did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// Nothing is playing
    Idle,
    /// A transition was in progress, the tick was dropped
    Skipped,
    /// Status read and broadcast, track still running
    Polled,
    /// Track finished, the queue advanced
    Advanced,
}

pub struct Player {
    registry: AdapterRegistry,
    store: Mutex<QueueStore>,
    transition: tokio::sync::Mutex<()>,
    events: Arc<dyn EventSink>,
    autoplay: bool,
}

impl Player {
    /// Creates an idle player with autoplay enabled
    pub fn new(registry: AdapterRegistry, events: Arc<dyn EventSink>) -> Self {
        Self {
            registry,
            store: Mutex::new(QueueStore::new()),
            transition: tokio::sync::Mutex::new(()),
            events,
            autoplay: true,
        }
    }

    pub fn with_autoplay(mut self, autoplay: bool) -> Self {
        self.autoplay = autoplay;
        self
    }

    pub fn autoplay(&self) -> bool {
        self.autoplay
    }

    pub fn registry(&self) -> &AdapterRegistry {
        &self.registry
    }

    /// Publishes an event through the player's sink
    pub fn broadcast(&self, event: PlayerEvent) {
        self.events.emit(event);
    }

    fn store(&self) -> MutexGuard<'_, QueueStore> {
        self.store.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Acquires the transition token without waiting
    pub fn try_begin_transition(&self) -> Result<TransitionGuard<'_>> {
        self.transition
            .try_lock()
            .map(|token| TransitionGuard { _token: token })
            .map_err(|_| QueueError::TransitionSkipped)
    }

    #[cfg(test)]
    fn is_transitioning(&self) -> bool {
        self.transition.try_lock().is_err()
    }

    // ------------------------------------------------------------------
    // Snapshots
    // ------------------------------------------------------------------

    pub fn current(&self) -> Option<AudioTrack> {
        self.store().current_track()
    }

    pub fn queue(&self) -> Vec<AudioTrack> {
        self.store().queue_tracks()
    }

    pub fn history(&self) -> Vec<AudioTrack> {
        self.store().history_tracks()
    }

    /// Handle of the now-playing source
    pub fn now_playing(&self) -> Option<SharedSource> {
        self.store().now_playing()
    }

    /// Number of sources held by the player (queue + history + now-playing)
    pub fn total(&self) -> usize {
        self.store().total()
    }

    /// Every source handle currently held, now-playing first
    #[doc(hidden)]
    pub fn handles(&self) -> Vec<SharedSource> {
        self.store().handles()
    }

    // ------------------------------------------------------------------
    // Queue bookkeeping
    // ------------------------------------------------------------------

    /// Appends a source to the queue.
    ///
    /// When nothing was queued nor playing and autoplay is on, playback
    /// starts right away. A skipped autoplay is not an error.
    pub async fn enqueue(&self, source: SharedSource) -> Result<()> {
        let track = source.track();
        info!(
            track = %track.name,
            artist = %track.artist,
            source = track.source(),
            "Queueing track"
        );

        let was_idle = {
            let mut store = self.store();
            let idle = store.is_idle();
            store.push(source);
            idle
        };
        self.broadcast(PlayerEvent::Queue(self.queue()));

        if was_idle && self.autoplay {
            match self.next().await {
                Err(QueueError::TransitionSkipped) => {
                    debug!("Autoplay skipped, a transition is already running");
                }
                other => other?,
            }
        }
        Ok(())
    }

    /// Resolves the track's adapter, builds its source and enqueues it
    pub async fn enqueue_track(&self, track: AudioTrack) -> Result<()> {
        let source_id = track.source();
        let adapter = self
            .registry
            .resolve(source_id)
            .await
            .ok_or_else(|| QueueError::AdapterNotFound(source_id.to_string()))?;

        let source = adapter.create_audio_source(track)?;
        self.enqueue(source).await
    }

    /// Moves a queued entry; out of range indices are ignored.
    pub fn shift(&self, old_index: usize, new_index: usize) -> bool {
        let moved = self.store().shift(old_index, new_index);
        if moved {
            debug!(old_index, new_index, "Queue entry moved");
            self.broadcast(PlayerEvent::Queue(self.queue()));
        } else {
            debug!(old_index, new_index, "Ignoring out of range queue move");
        }
        moved
    }

    /// Removes a queued entry and releases its backend resources.
    pub async fn remove(&self, index: usize) -> Result<AudioTrack> {
        let removed = self.store().remove(index)?;
        let track = removed.track();
        info!(index, track = %track.name, "Removed track from queue");
        self.broadcast(PlayerEvent::Queue(self.queue()));

        if let Err(e) = removed.stop().await {
            warn!(track = %track.name, error = %e, "Failed to release removed source");
        }
        Ok(track)
    }

    /// Prepares the queue head so the next transition starts faster
    pub async fn preload_next(&self) -> Result<()> {
        let head = self.store().head();
        let Some(source) = head else {
            info!("Went to preload next track, but the queue is empty");
            return Ok(());
        };

        if source.loaded().await {
            trace!("Queue head already loaded");
            return Ok(());
        }

        info!(track = %source.track().name, "Preloading next track...");
        source.preload().await?;
        info!("Preload complete");
        Ok(())
    }

    // ------------------------------------------------------------------
    // Guarded transitions
    // ------------------------------------------------------------------

    /// Advances to the queue head
    pub async fn next(&self) -> Result<()> {
        let guard = self.try_begin_transition()?;
        self.next_locked(&guard).await;
        Ok(())
    }

    /// Goes back to the most recent history entry
    pub async fn previous(&self) -> Result<()> {
        let guard = self.try_begin_transition()?;
        self.previous_locked(&guard).await;
        Ok(())
    }

    pub(crate) async fn next_locked(&self, _guard: &TransitionGuard<'_>) {
        info!("Transitioning to the next track...");
        self.broadcast(PlayerEvent::Loading);

        self.stop_now_playing().await;
        let started = self.store().advance();
        self.start_source(started).await;

        self.publish_state().await;
    }

    pub(crate) async fn previous_locked(&self, _guard: &TransitionGuard<'_>) {
        info!("Transitioning to the previous track...");
        self.broadcast(PlayerEvent::Loading);

        self.stop_now_playing().await;
        let started = self.store().rewind();
        self.start_source(started).await;

        self.publish_state().await;
    }

    /// Toggles pause on the now-playing source and returns the new status.
    pub async fn playpause(&self) -> Result<Option<AudioStatus>> {
        let _guard = self.try_begin_transition()?;
        let current = self.store().now_playing();
        let Some(source) = current else {
            return Ok(None);
        };

        let status = source.status().await?;
        if status.playing {
            debug!(track = %source.track().name, "Pausing");
            source.pause().await?;
        } else {
            debug!(track = %source.track().name, "Resuming");
            source.resume().await?;
        }

        let status = source.status().await?;
        self.broadcast(PlayerEvent::Status(Some(status)));
        Ok(Some(status))
    }

    /// Transport status of the now-playing source, `None` when idle.
    pub async fn status(&self) -> Result<Option<AudioStatus>> {
        let _guard = self.try_begin_transition()?;
        let current = self.store().now_playing();
        match current {
            Some(source) => Ok(Some(source.status().await?)),
            None => Ok(None),
        }
    }

    /// One status poll; advances when the track reported it finished.
    pub async fn tick(&self) -> TickOutcome {
        if self.store().now_playing().is_none() {
            return TickOutcome::Idle;
        }

        let Ok(guard) = self.try_begin_transition() else {
            trace!("Transition in progress, skipping status check");
            return TickOutcome::Skipped;
        };

        // Re-read under the guard: a transition may have emptied the slot
        let current = self.store().now_playing();
        let Some(source) = current else {
            return TickOutcome::Idle;
        };

        let finished = match source.status().await {
            Ok(status) => {
                trace!(
                    track = %source.track().name,
                    time = status.time,
                    duration = status.duration,
                    playing = status.playing,
                    finished = status.finished,
                    "Status checked"
                );
                self.broadcast(PlayerEvent::Status(Some(status)));
                status.finished
            }
            Err(e) => {
                debug!(error = %e, "Status read failed, assuming the track is still running");
                false
            }
        };

        if finished && self.autoplay {
            info!(track = %source.track().name, "Track finished! Loading the next one...");
            self.next_locked(&guard).await;
            TickOutcome::Advanced
        } else {
            TickOutcome::Polled
        }
    }

    /// Stops the now-playing source, waiting for any running transition.
    pub async fn shutdown(&self) -> Result<()> {
        let _token = self.transition.lock().await;
        let current = self.store().now_playing();
        if let Some(source) = current {
            info!(track = %source.track().name, "Stopping playback before shutdown");
            source.stop().await?;
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Helpers
    // ------------------------------------------------------------------

    async fn stop_now_playing(&self) {
        let current = self.store().now_playing();
        if let Some(source) = current {
            trace!("Audio currently playing, stopping that first...");
            if let Err(e) = source.stop().await {
                warn!(track = %source.track().name, error = %e, "Failed to stop audio source");
            }
        }
    }

    async fn start_source(&self, source: Option<SharedSource>) {
        let Some(source) = source else {
            info!("Went to start source, but no source was found");
            return;
        };

        let track = source.track();
        info!(track = %track.name, artist = %track.artist, "Starting audio source...");
        match source.start().await {
            Ok(()) => info!("Audio source started successfully"),
            Err(e) => warn!(track = %track.name, error = %e, "Failed to start audio source"),
        }
    }

    /// Broadcasts track, queue, history then status
    async fn publish_state(&self) {
        let (current, queue, history, source) = {
            let store = self.store();
            (
                store.current_track(),
                store.queue_tracks(),
                store.history_tracks(),
                store.now_playing(),
            )
        };

        self.broadcast(PlayerEvent::Track(current));
        self.broadcast(PlayerEvent::Queue(queue));
        self.broadcast(PlayerEvent::History(history));

        let status = match source {
            Some(source) => match source.status().await {
                Ok(status) => Some(status),
                Err(e) => {
                    debug!(error = %e, "Status unavailable after transition");
                    None
                }
            },
            None => None,
        };
        self.broadcast(PlayerEvent::Status(status));
    }
}
