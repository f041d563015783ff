//! Fakes shared by the integration tests.
#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use jbxqueue::{BroadcastSink, Player};
use jbxsource::{
    AdapterRegistry, AudioSource, AudioStatus, AudioTrack, Result, SharedSource, SourceAdapter,
    SourceError, YOUTUBE_SOURCE, ensure_source,
};

#[derive(Debug, Default)]
struct State {
    playing: bool,
    finished: bool,
    loaded: bool,
    delay: Option<Duration>,
    starts: usize,
    stops: usize,
}

/// In-memory source; every call can be slowed down to widen race windows.
#[derive(Debug)]
pub struct FakeSource {
    track: AudioTrack,
    state: Mutex<State>,
}

impl FakeSource {
    pub fn from_track(track: AudioTrack) -> Arc<Self> {
        Arc::new(Self {
            track,
            state: Mutex::new(State::default()),
        })
    }

    pub fn new(name: &str) -> Arc<Self> {
        Self::from_track(AudioTrack::youtube(name, name, "tester"))
    }

    pub fn finish(&self) {
        let mut s = self.state.lock().unwrap();
        s.playing = false;
        s.finished = true;
    }

    pub fn slow(&self, delay: Duration) {
        self.state.lock().unwrap().delay = Some(delay);
    }

    pub fn starts(&self) -> usize {
        self.state.lock().unwrap().starts
    }

    pub fn stops(&self) -> usize {
        self.state.lock().unwrap().stops
    }

    async fn wait(&self) {
        let delay = self.state.lock().unwrap().delay;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
    }
}

#[async_trait::async_trait]
impl AudioSource for FakeSource {
    fn track(&self) -> AudioTrack {
        self.track.clone()
    }

    async fn loaded(&self) -> bool {
        self.state.lock().unwrap().loaded
    }

    async fn preload(&self) -> Result<()> {
        self.wait().await;
        self.state.lock().unwrap().loaded = true;
        Ok(())
    }

    async fn status(&self) -> Result<AudioStatus> {
        self.wait().await;
        let s = self.state.lock().unwrap();
        Ok(AudioStatus::new(s.playing, s.finished, 1.0, 60.0))
    }

    async fn pause(&self) -> Result<()> {
        self.state.lock().unwrap().playing = false;
        Ok(())
    }

    async fn resume(&self) -> Result<()> {
        self.state.lock().unwrap().playing = true;
        Ok(())
    }

    async fn start(&self) -> Result<()> {
        self.wait().await;
        let mut s = self.state.lock().unwrap();
        s.starts += 1;
        s.playing = true;
        s.finished = false;
        s.loaded = true;
        Ok(())
    }

    async fn stop(&self) -> Result<()> {
        self.wait().await;
        let mut s = self.state.lock().unwrap();
        s.stops += 1;
        s.playing = false;
        s.loaded = false;
        Ok(())
    }
}

/// Adapter building [`FakeSource`]s for YouTube tracks
#[derive(Debug, Default)]
pub struct FakeYoutubeAdapter;

#[async_trait::async_trait]
impl SourceAdapter for FakeYoutubeAdapter {
    fn id(&self) -> &str {
        YOUTUBE_SOURCE
    }

    fn display_name(&self) -> &str {
        "Fake YouTube"
    }

    fn create_audio_source(&self, track: AudioTrack) -> Result<SharedSource> {
        ensure_source(YOUTUBE_SOURCE, &track)?;
        Ok(FakeSource::from_track(track))
    }

    async fn search_for(&self, query: &str) -> Result<Vec<AudioTrack>> {
        if query == "locked" {
            return Err(SourceError::NotAuthenticated);
        }
        Ok(vec![AudioTrack::youtube(query, query, "tester")])
    }
}

pub fn player() -> (Arc<Player>, BroadcastSink) {
    let sink = BroadcastSink::new(1024);
    let player = Arc::new(Player::new(AdapterRegistry::new(), Arc::new(sink.clone())));
    (player, sink)
}

pub fn names(tracks: Vec<AudioTrack>) -> Vec<String> {
    tracks.into_iter().map(|t| t.name).collect()
}
