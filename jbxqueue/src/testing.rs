//! In-memory audio source and adapter used by the unit tests.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use jbxsource::{
    AudioSource, AudioStatus, AudioTrack, Result, SharedSource, SourceAdapter, SourceError,
    YOUTUBE_SOURCE, ensure_source,
};

#[derive(Debug, Default)]
struct FakeState {
    loaded: bool,
    playing: bool,
    finished: bool,
    fail_start: bool,
    fail_stop: bool,
    fail_status: bool,
    delay: Option<Duration>,
    calls: Vec<&'static str>,
}

#[derive(Debug)]
pub struct FakeSource {
    track: AudioTrack,
    state: Mutex<FakeState>,
}

impl FakeSource {
    pub fn new(name: &str) -> Arc<Self> {
        Self::from_track(AudioTrack::youtube(name, name, "tester"))
    }

    pub fn from_track(track: AudioTrack) -> Arc<Self> {
        Arc::new(Self {
            track,
            state: Mutex::new(FakeState::default()),
        })
    }

    pub fn shared(name: &str) -> SharedSource {
        Self::new(name)
    }

    pub fn finish(&self) {
        let mut s = self.state.lock().unwrap();
        s.playing = false;
        s.finished = true;
    }

    pub fn fail_start(&self) {
        self.state.lock().unwrap().fail_start = true;
    }

    pub fn fail_stop(&self) {
        self.state.lock().unwrap().fail_stop = true;
    }

    pub fn fail_status(&self) {
        self.state.lock().unwrap().fail_status = true;
    }

    /// Every backend call sleeps this long before answering
    pub fn slow(&self, delay: Duration) {
        self.state.lock().unwrap().delay = Some(delay);
    }

    pub fn is_playing(&self) -> bool {
        self.state.lock().unwrap().playing
    }

    pub fn count(&self, call: &str) -> usize {
        self.state
            .lock()
            .unwrap()
            .calls
            .iter()
            .filter(|c| **c == call)
            .count()
    }

    async fn record(&self, call: &'static str) {
        let delay = {
            let mut s = self.state.lock().unwrap();
            s.calls.push(call);
            s.delay
        };
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
        self.record("preload").await;
        self.state.lock().unwrap().loaded = true;
        Ok(())
    }

    async fn status(&self) -> Result<AudioStatus> {
        self.record("status").await;
        let s = self.state.lock().unwrap();
        if s.fail_status {
            return Err(SourceError::backend("status unavailable"));
        }
        Ok(AudioStatus::new(s.playing, s.finished, 0.0, 180.0))
    }

    async fn pause(&self) -> Result<()> {
        self.record("pause").await;
        self.state.lock().unwrap().playing = false;
        Ok(())
    }

    async fn resume(&self) -> Result<()> {
        self.record("resume").await;
        self.state.lock().unwrap().playing = true;
        Ok(())
    }

    async fn start(&self) -> Result<()> {
        self.record("start").await;
        let mut s = self.state.lock().unwrap();
        if s.fail_start {
            return Err(SourceError::backend("start failed"));
        }
        s.loaded = true;
        s.playing = true;
        s.finished = false;
        Ok(())
    }

    async fn stop(&self) -> Result<()> {
        self.record("stop").await;
        let mut s = self.state.lock().unwrap();
        s.loaded = false;
        s.playing = false;
        if s.fail_stop {
            return Err(SourceError::backend("stop failed"));
        }
        Ok(())
    }
}

/// Builds [`FakeSource`]s for YouTube tracks
#[derive(Debug, Default)]
pub struct FakeAdapter;

#[async_trait::async_trait]
impl SourceAdapter for FakeAdapter {
    fn id(&self) -> &str {
        YOUTUBE_SOURCE
    }

    fn display_name(&self) -> &str {
        "Fake"
    }

    fn create_audio_source(&self, track: AudioTrack) -> Result<SharedSource> {
        ensure_source(YOUTUBE_SOURCE, &track)?;
        Ok(FakeSource::from_track(track))
    }

    async fn search_for(&self, _query: &str) -> Result<Vec<AudioTrack>> {
        Ok(Vec::new())
    }
}
