//! Adaptateur Spotify pour le registre des sources

use std::sync::Arc;

use async_trait::async_trait;
use jbxsource::{
    AudioTrack, Result, SPOTIFY_SOURCE, SharedSource, SourceAdapter, SourceError, TrackData,
    ensure_source,
};
use tracing::{debug, trace};

use crate::api::SpotifyApi;
use crate::auth::SpotifyAuth;
use crate::source::SpotifySource;

#[derive(Debug, Clone)]
pub struct SpotifyAdapter {
    api: Arc<SpotifyApi>,
}

impl SpotifyAdapter {
    pub fn new(api: Arc<SpotifyApi>) -> Self {
        Self { api }
    }

    /// Construit l'adaptateur depuis la configuration `spotify.*`
    ///
    /// Le refresh token est lu dans `<data>/spotify/refreshToken`.
    pub fn from_config() -> anyhow::Result<Self> {
        let config = jbxconfig::get_config();
        let (client_id, client_secret) = config.get_spotify_credentials()?;
        let auth = SpotifyAuth::new(
            client_id,
            client_secret,
            config.get_spotify_redirect_uri()?,
            config.get_data_dir()?,
        )?;

        let mut api = SpotifyApi::new(Arc::new(auth))?;
        if let Some(device) = config.get_spotify_device_id() {
            api = api.with_device(device);
        }
        Ok(Self::new(Arc::new(api)))
    }

    pub fn api(&self) -> &Arc<SpotifyApi> {
        &self.api
    }

    pub fn auth(&self) -> Arc<SpotifyAuth> {
        self.api.auth().clone()
    }
}

#[async_trait]
impl SourceAdapter for SpotifyAdapter {
    fn id(&self) -> &str {
        SPOTIFY_SOURCE
    }

    fn display_name(&self) -> &str {
        "Spotify"
    }

    fn create_audio_source(&self, track: AudioTrack) -> Result<SharedSource> {
        ensure_source(SPOTIFY_SOURCE, &track)?;
        let uri = match &track.data {
            TrackData::Spotify(data) => data.uri.clone(),
            _ => return Err(SourceError::InvalidTrack("missing track uri".into())),
        };
        debug!(uri = %uri, "Creating Spotify source");
        Ok(Arc::new(SpotifySource::new(self.api.clone(), uri, track)))
    }

    async fn search_for(&self, query: &str) -> Result<Vec<AudioTrack>> {
        trace!(query, "Searching Spotify");
        let tracks = self.api.search(query).await?;
        Ok(tracks.into_iter().map(AudioTrack::from).collect())
    }

    async fn is_authenticated(&self) -> bool {
        self.api.auth().is_authenticated().await
    }
}
