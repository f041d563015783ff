//! Adaptateur YouTube pour le registre des sources

use std::sync::Arc;

use async_trait::async_trait;
use jbxsource::{
    AudioTrack, Result, SharedSource, SourceAdapter, SourceError, TrackData, YOUTUBE_SOURCE,
    ensure_source,
};
use tracing::{debug, info};

use crate::search::YoutubeSearch;
use crate::slug::parse_slug;
use crate::source::YoutubeSource;
use crate::webdriver::WebDriverClient;

#[derive(Debug, Clone)]
pub struct YoutubeAdapter {
    driver: WebDriverClient,
    search: Option<YoutubeSearch>,
}

impl YoutubeAdapter {
    pub fn new(driver: WebDriverClient) -> Self {
        Self {
            driver,
            search: None,
        }
    }

    /// Active la recherche plein texte via l'API YouTube Data
    pub fn with_search(mut self, search: YoutubeSearch) -> Self {
        self.search = Some(search);
        self
    }

    /// Construit l'adaptateur depuis la configuration `youtube.*`
    pub fn from_config() -> anyhow::Result<Self> {
        let config = jbxconfig::get_config();
        let driver = WebDriverClient::new(
            config.get_webdriver_url()?,
            config.get_webdriver_headless()?,
        )?;

        let mut adapter = Self::new(driver);
        match config.get_youtube_api_key() {
            Some(key) => adapter = adapter.with_search(YoutubeSearch::new(key)?),
            None => info!("No YouTube API key configured, search only accepts video links"),
        }
        Ok(adapter)
    }

    pub fn driver(&self) -> &WebDriverClient {
        &self.driver
    }
}

#[async_trait]
impl SourceAdapter for YoutubeAdapter {
    fn id(&self) -> &str {
        YOUTUBE_SOURCE
    }

    fn display_name(&self) -> &str {
        "YouTube"
    }

    fn create_audio_source(&self, track: AudioTrack) -> Result<SharedSource> {
        ensure_source(YOUTUBE_SOURCE, &track)?;
        let slug = match &track.data {
            TrackData::Youtube(video) => video.slug.clone(),
            _ => return Err(SourceError::InvalidTrack("missing video slug".into())),
        };
        debug!(slug = %slug, "Creating YouTube source");
        Ok(Arc::new(YoutubeSource::new(self.driver.clone(), slug, track)))
    }

    async fn search_for(&self, query: &str) -> Result<Vec<AudioTrack>> {
        if let Some(slug) = parse_slug(query) {
            return Ok(vec![AudioTrack::youtube(slug.clone(), slug, "YouTube")]);
        }
        match &self.search {
            Some(search) => search.search(query).await,
            None => {
                debug!(query, "Not a video link and no API key, no results");
                Ok(Vec::new())
            }
        }
    }
}
