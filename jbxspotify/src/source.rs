//! Source de lecture Spotify (Spotify Connect)
//!
//! La lecture a lieu sur l'appareil Spotify de l'utilisateur ; la source
//! envoie les commandes et interprète l'état du lecteur distant.

use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use jbxsource::{AudioSource, AudioStatus, AudioTrack, Result, UNKNOWN_TIME};
use tracing::{debug, info};

use crate::api::SpotifyApi;
use crate::models::PlaybackState;

/// Marge sous laquelle une position est considérée comme la fin de piste
const END_MARGIN_MS: u64 = 2_000;

/// Ce que la source sait de sa propre lecture
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Flags {
    /// `start` a été appelé et `stop` pas encore
    pub started: bool,
    /// La dernière commande envoyée est une pause
    pub paused: bool,
    /// Le lecteur distant a été vu en train de jouer ce morceau depuis `start`
    pub seen_playing: bool,
}

#[derive(Debug)]
pub struct SpotifySource {
    api: Arc<SpotifyApi>,
    track: AudioTrack,
    uri: String,
    flags: Mutex<Flags>,
}

impl SpotifySource {
    pub fn new(api: Arc<SpotifyApi>, uri: impl Into<String>, track: AudioTrack) -> Self {
        Self {
            api,
            track,
            uri: uri.into(),
            flags: Mutex::new(Flags::default()),
        }
    }

    pub fn uri(&self) -> &str {
        &self.uri
    }

    fn flags(&self) -> Flags {
        *self.flags.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn update(&self, f: impl FnOnce(&mut Flags)) {
        f(&mut self.flags.lock().unwrap_or_else(PoisonError::into_inner));
    }
}

/// Interprète l'état distant pour le morceau `uri`
///
/// Tant que le lecteur n'a pas été vu jouer le morceau, rien n'est terminé :
/// l'état peut encore montrer le morceau précédent ou un chargement à 0 ms.
/// Ensuite le morceau est terminé s'il a été remplacé (autre morceau, plus
/// d'appareil) ou s'il est arrêté en fin de piste. Une pause venue d'un autre
/// client Spotify au milieu du morceau n'est pas une fin.
pub fn to_status(state: Option<&PlaybackState>, uri: &str, flags: Flags) -> AudioStatus {
    let watching = flags.started && !flags.paused && flags.seen_playing;
    let item = state.and_then(|s| s.item.as_ref().map(|item| (s, item)));
    match item {
        Some((state, item)) if item.uri == uri => {
            let time = state
                .progress_ms
                .map(|ms| ms as f64 / 1000.0)
                .unwrap_or(UNKNOWN_TIME);
            let duration = item.duration_ms as f64 / 1000.0;
            let at_end = state.progress_ms.is_some_and(|ms| {
                ms == 0 || ms.saturating_add(END_MARGIN_MS) >= item.duration_ms
            });
            let finished = watching && !state.is_playing && at_end;
            AudioStatus::new(state.is_playing, finished, time, duration)
        }
        _ => AudioStatus::new(false, watching, UNKNOWN_TIME, UNKNOWN_TIME),
    }
}

#[async_trait]
impl AudioSource for SpotifySource {
    fn track(&self) -> AudioTrack {
        self.track.clone()
    }

    async fn loaded(&self) -> bool {
        self.flags().started
    }

    /// Rien à précharger : seule l'autorisation est vérifiée
    async fn preload(&self) -> Result<()> {
        self.api.auth().access_token().await?;
        Ok(())
    }

    async fn status(&self) -> Result<AudioStatus> {
        let state = self.api.playback_state().await?;
        let playing_ours = state
            .as_ref()
            .filter(|s| s.is_playing)
            .and_then(|s| s.item.as_ref())
            .is_some_and(|item| item.uri == self.uri);
        if playing_ours {
            self.update(|f| {
                if f.started {
                    f.seen_playing = true;
                }
            });
        }
        Ok(to_status(state.as_ref(), &self.uri, self.flags()))
    }

    async fn pause(&self) -> Result<()> {
        self.api.pause().await?;
        self.update(|f| f.paused = true);
        Ok(())
    }

    async fn resume(&self) -> Result<()> {
        self.api.resume().await?;
        self.update(|f| f.paused = false);
        Ok(())
    }

    async fn start(&self) -> Result<()> {
        info!(uri = %self.uri, track = %self.track.name, "Starting Spotify track");
        self.api.play(&self.uri).await?;
        self.update(|f| {
            *f = Flags {
                started: true,
                ..Flags::default()
            };
        });
        Ok(())
    }

    async fn stop(&self) -> Result<()> {
        if !self.flags().started {
            return Ok(());
        }
        // On ne coupe le lecteur distant que s'il joue encore ce morceau
        let state = self.api.playback_state().await?;
        let ours = state
            .as_ref()
            .and_then(|s| s.item.as_ref())
            .is_some_and(|item| item.uri == self.uri);
        if ours && state.as_ref().is_some_and(|s| s.is_playing) {
            self.api.pause().await?;
        } else {
            debug!(uri = %self.uri, "Remote player moved on, nothing to stop");
        }
        self.update(|f| *f = Flags::default());
        Ok(())
    }
}
