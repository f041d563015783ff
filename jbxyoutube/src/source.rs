//! Source de lecture YouTube
//!
//! Chaque source pilote son propre navigateur : la session est ouverte par
//! `preload`/`start` et fermée par `stop`. La lecture se contrôle par des
//! clics sur le lecteur, l'état est lu dans l'élément `<video>`.

use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use jbxsource::{AudioSource, AudioStatus, AudioTrack, Result, SourceError, UNKNOWN_TIME};
use tokio::sync::Mutex as AsyncMutex;
use tracing::{debug, info, warn};

use crate::error::WebDriverError;
use crate::scripts::{self, PageInfo, PageState};
use crate::slug::watch_url;
use crate::webdriver::{Session, WebDriverClient};

/// Attente maximale de l'apparition du lecteur et de ses contrôles
const PAGE_READY_TIMEOUT: Duration = Duration::from_secs(20);

pub struct YoutubeSource {
    driver: WebDriverClient,
    slug: String,
    track: Mutex<AudioTrack>,
    session: AsyncMutex<Option<Session>>,
}

impl std::fmt::Debug for YoutubeSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("YoutubeSource")
            .field("slug", &self.slug)
            .finish_non_exhaustive()
    }
}

impl YoutubeSource {
    pub fn new(driver: WebDriverClient, slug: impl Into<String>, track: AudioTrack) -> Self {
        Self {
            driver,
            slug: slug.into(),
            track: Mutex::new(track),
            session: AsyncMutex::new(None),
        }
    }

    pub fn slug(&self) -> &str {
        &self.slug
    }

    /// Ouvre le navigateur sur la vidéo si ce n'est pas déjà fait
    async fn ensure_session(&self, slot: &mut Option<Session>) -> Result<()> {
        if slot.is_some() {
            return Ok(());
        }

        let url = watch_url(&self.slug);
        let session = self.driver.new_session().await?;
        match session.navigate(&url).await {
            Ok(landed) if landed.contains(&self.slug) => {
                *slot = Some(session);
                Ok(())
            }
            outcome => {
                let err = match outcome {
                    Ok(found) => WebDriverError::Navigation {
                        expected: url,
                        found,
                    },
                    Err(e) => e,
                };
                warn!(slug = %self.slug, error = %err, "Navigation failed, closing the driver");
                if let Err(e) = session.close().await {
                    debug!(error = %e, "Failed to close the driver after a navigation error");
                }
                Err(err.into())
            }
        }
    }

    async fn read_state(session: &Session) -> Result<PageState> {
        Ok(session.execute::<PageState>(scripts::STATE).await?)
    }

    /// Met à jour nom et artiste depuis la page
    async fn refresh_info(&self, session: &Session) {
        match session.execute::<PageInfo>(scripts::INFO).await {
            Ok(info) if !info.name.is_empty() => {
                let mut track = self.track.lock().unwrap_or_else(PoisonError::into_inner);
                track.name = info.name;
                if !info.artist.is_empty() {
                    track.artist = info.artist;
                }
            }
            Ok(_) => debug!(slug = %self.slug, "Page info not available yet"),
            Err(e) => debug!(slug = %self.slug, error = %e, "Failed to read page info"),
        }
    }

    /// Clique sur le lecteur si son état diffère de `playing`
    async fn set_playing(&self, playing: bool) -> Result<()> {
        let mut slot = self.session.lock().await;
        self.ensure_session(&mut slot).await?;
        let Some(session) = slot.as_ref() else {
            return Err(WebDriverError::NoSession.into());
        };

        let current = to_status(Self::read_state(session).await?);
        if current.playing == playing {
            debug!(slug = %self.slug, playing, "Player already in the requested state");
        } else {
            session
                .wait_for("the video player", scripts::PLAYPAUSE, PAGE_READY_TIMEOUT)
                .await?;
        }

        self.refresh_info(session).await;
        Ok(())
    }
}

/// Convertit l'état brut de la page; les valeurs manquantes valent `-1`
pub fn to_status(state: PageState) -> AudioStatus {
    let known = |v: Option<f64>| v.filter(|v| v.is_finite()).unwrap_or(UNKNOWN_TIME);
    AudioStatus::new(
        state.paused == Some(false),
        state.ended.unwrap_or(false),
        known(state.time),
        known(state.duration),
    )
}

#[async_trait]
impl AudioSource for YoutubeSource {
    fn track(&self) -> AudioTrack {
        self.track
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    async fn loaded(&self) -> bool {
        self.session.lock().await.is_some()
    }

    async fn preload(&self) -> Result<()> {
        let mut slot = self.session.lock().await;
        self.ensure_session(&mut slot).await
    }

    async fn status(&self) -> Result<AudioStatus> {
        let slot = self.session.lock().await;
        let session = slot.as_ref().ok_or(WebDriverError::NoSession)?;
        Ok(to_status(Self::read_state(session).await?))
    }

    async fn pause(&self) -> Result<()> {
        self.set_playing(false).await
    }

    async fn resume(&self) -> Result<()> {
        self.set_playing(true).await
    }

    async fn start(&self) -> Result<()> {
        info!(slug = %self.slug, "Starting YouTube video");
        {
            let mut slot = self.session.lock().await;
            self.ensure_session(&mut slot).await?;
            if let Some(session) = slot.as_ref() {
                session
                    .wait_for("the autoplay toggle", scripts::DISABLE_AUTOPLAY, PAGE_READY_TIMEOUT)
                    .await?;
            }
        }
        self.resume().await
    }

    async fn stop(&self) -> Result<()> {
        let session = self.session.lock().await.take();
        match session {
            Some(session) => {
                info!(slug = %self.slug, "Stopping YouTube video");
                session.close().await.map_err(SourceError::from)
            }
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        let status = to_status(PageState {
            paused: Some(false),
            time: Some(12.5),
            duration: Some(200.0),
            ended: Some(false),
        });
        assert_eq!(status, AudioStatus::new(true, false, 12.5, 200.0));

        let status = to_status(PageState {
            paused: Some(true),
            time: Some(200.0),
            duration: Some(200.0),
            ended: Some(true),
        });
        assert!(!status.playing);
        assert!(status.finished);
    }

    #[test]
    fn test_status_unknown_values() {
        let status = to_status(PageState::default());
        assert!(!status.playing);
        assert!(!status.finished);
        assert_eq!(status.time, UNKNOWN_TIME);
        assert_eq!(status.duration, UNKNOWN_TIME);

        let status = to_status(PageState {
            duration: Some(f64::NAN),
            ..PageState::default()
        });
        assert_eq!(status.duration, UNKNOWN_TIME);
    }

    #[tokio::test]
    async fn test_unstarted_source() {
        let driver = WebDriverClient::new("http://127.0.0.1:9", true).unwrap();
        let source = YoutubeSource::new(driver, "abc", AudioTrack::youtube("abc", "abc", ""));

        assert!(!source.loaded().await);
        assert!(source.status().await.is_err());
        // stop sans session ne contacte pas le driver
        assert!(source.stop().await.is_ok());
        assert!(source.stop().await.is_ok());
    }
}
