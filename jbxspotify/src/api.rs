//! Couche d'accès à l'API Web Spotify

use std::sync::Arc;
use std::time::Duration;

use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde_json::{Value, json};
use tracing::{debug, warn};

use crate::auth::SpotifyAuth;
use crate::error::{Result, SpotifyError};
use crate::models::{PlaybackState, SearchResponse, Track};

/// URL de base de l'API Web
const API_BASE_URL: &str = "https://api.spotify.com/v1";

const SEARCH_LIMIT: &str = "10";

/// Client de l'API Web, authentifié par [`SpotifyAuth`]
#[derive(Debug)]
pub struct SpotifyApi {
    client: Client,
    auth: Arc<SpotifyAuth>,
    base_url: String,
    device_id: Option<String>,
}

impl SpotifyApi {
    pub fn new(auth: Arc<SpotifyAuth>) -> Result<Self> {
        let client = Client::builder().timeout(Duration::from_secs(10)).build()?;
        Ok(Self {
            client,
            auth,
            base_url: API_BASE_URL.to_string(),
            device_id: None,
        })
    }

    /// Joue sur cet appareil Spotify Connect plutôt que sur l'appareil actif
    pub fn with_device(mut self, device_id: impl Into<String>) -> Self {
        self.device_id = Some(device_id.into());
        self
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn auth(&self) -> &Arc<SpotifyAuth> {
        &self.auth
    }

    pub async fn search(&self, query: &str) -> Result<Vec<Track>> {
        debug!(query, "Searching Spotify");
        let request = self
            .request(Method::GET, "/search")
            .await?
            .query(&[("q", query), ("type", "track"), ("limit", SEARCH_LIMIT)]);
        let response = self.send(request).await?;
        let parsed: SearchResponse = response.json().await?;
        Ok(parsed.tracks.items)
    }

    /// Lance la lecture d'un morceau depuis le début
    pub async fn play(&self, uri: &str) -> Result<()> {
        let request = self
            .player_request(Method::PUT, "/me/player/play")
            .await?
            .json(&json!({ "uris": [uri], "position_ms": 0 }));
        self.send(request).await.map(|_| ())
    }

    /// Reprend la lecture en cours
    pub async fn resume(&self) -> Result<()> {
        let request = self
            .player_request(Method::PUT, "/me/player/play")
            .await?
            .json(&Value::Object(Default::default()));
        self.send(request).await.map(|_| ())
    }

    pub async fn pause(&self) -> Result<()> {
        let request = self.player_request(Method::PUT, "/me/player/pause").await?;
        self.send(request).await.map(|_| ())
    }

    /// État du lecteur, `None` quand aucun appareil n'est actif
    pub async fn playback_state(&self) -> Result<Option<PlaybackState>> {
        let request = self.request(Method::GET, "/me/player").await?;
        let response = self.send(request).await?;
        if response.status() == StatusCode::NO_CONTENT {
            return Ok(None);
        }
        Ok(Some(response.json().await?))
    }

    async fn request(&self, method: Method, endpoint: &str) -> Result<RequestBuilder> {
        let token = self.auth.access_token().await?;
        Ok(self
            .client
            .request(method, format!("{}{}", self.base_url, endpoint))
            .bearer_auth(token))
    }

    async fn player_request(&self, method: Method, endpoint: &str) -> Result<RequestBuilder> {
        let request = self.request(method, endpoint).await?;
        Ok(match &self.device_id {
            Some(device) => request.query(&[("device_id", device.as_str())]),
            None => request,
        })
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response> {
        let response = request.send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        warn!(status = status.as_u16(), "Spotify API error");
        if status == StatusCode::UNAUTHORIZED {
            self.auth.invalidate_access().await;
        }
        Err(SpotifyError::from_status_code(status.as_u16(), body))
    }
}
