//! Queue, history and now-playing containers.
//!
//! A source lives in exactly one of the three containers at any time. Every
//! move transfers the `Arc` handle; nothing here clones a source or calls the
//! backend, so the store can sit behind a synchronous mutex.

use std::collections::VecDeque;

use jbxsource::{AudioTrack, SharedSource};

use crate::error::{QueueError, Result};

#[derive(Debug, Default)]
pub struct QueueStore {
    queue: VecDeque<SharedSource>,
    history: Vec<SharedSource>,
    now_playing: Option<SharedSource>,
}

impl QueueStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Nothing playing and nothing waiting
    pub fn is_idle(&self) -> bool {
        self.queue.is_empty() && self.now_playing.is_none()
    }

    pub fn queue_len(&self) -> usize {
        self.queue.len()
    }

    pub fn history_len(&self) -> usize {
        self.history.len()
    }

    /// Number of sources held across all three containers
    pub fn total(&self) -> usize {
        self.queue.len() + self.history.len() + usize::from(self.now_playing.is_some())
    }

    /// Appends a source at the queue tail
    pub fn push(&mut self, source: SharedSource) {
        self.queue.push_back(source);
    }

    pub fn now_playing(&self) -> Option<SharedSource> {
        self.now_playing.clone()
    }

    /// Queue head, the next source `advance` would play
    pub fn head(&self) -> Option<SharedSource> {
        self.queue.front().cloned()
    }

    /// Now-playing goes to the history tail, the queue head becomes
    /// now-playing. Returns the new now-playing source.
    pub fn advance(&mut self) -> Option<SharedSource> {
        if let Some(current) = self.now_playing.take() {
            self.history.push(current);
        }
        self.now_playing = self.queue.pop_front();
        self.now_playing.clone()
    }

    /// Now-playing goes back to the queue front, the history tail becomes
    /// now-playing. Returns the new now-playing source.
    pub fn rewind(&mut self) -> Option<SharedSource> {
        if let Some(current) = self.now_playing.take() {
            self.queue.push_front(current);
        }
        self.now_playing = self.history.pop();
        self.now_playing.clone()
    }

    /// Moves the entry at `old_index` to `new_index` through adjacent swaps,
    /// keeping the relative order of the other entries.
    ///
    /// Out of range indices leave the queue untouched and return `false`.
    pub fn shift(&mut self, old_index: usize, new_index: usize) -> bool {
        let len = self.queue.len();
        if old_index >= len || new_index >= len {
            return false;
        }

        if old_index < new_index {
            for i in old_index..new_index {
                self.queue.swap(i, i + 1);
            }
        } else {
            for i in (new_index..old_index).rev() {
                self.queue.swap(i, i + 1);
            }
        }
        true
    }

    /// Takes the entry at `index` out of the queue.
    pub fn remove(&mut self, index: usize) -> Result<SharedSource> {
        let len = self.queue.len();
        self.queue
            .remove(index)
            .ok_or(QueueError::OutOfRange { index, len })
    }

    pub fn current_track(&self) -> Option<AudioTrack> {
        self.now_playing.as_ref().map(|s| s.track())
    }

    pub fn queue_tracks(&self) -> Vec<AudioTrack> {
        self.queue.iter().map(|s| s.track()).collect()
    }

    pub fn history_tracks(&self) -> Vec<AudioTrack> {
        self.history.iter().map(|s| s.track()).collect()
    }

    /// All held handles, now-playing first, then queue, then history
    #[doc(hidden)]
    pub fn handles(&self) -> Vec<SharedSource> {
        self.now_playing
            .iter()
            .chain(self.queue.iter())
            .chain(self.history.iter())
            .cloned()
            .collect()
    }
}
