//! Recherche via l'API YouTube Data v3

use std::time::Duration;

use jbxsource::{AudioTrack, Result, SourceError};
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, warn};

const API_BASE_URL: &str = "https://www.googleapis.com/youtube/v3";
const MAX_RESULTS: &str = "10";

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    items: Vec<SearchItem>,
}

#[derive(Debug, Deserialize)]
struct SearchItem {
    id: ItemId,
    snippet: Snippet,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ItemId {
    video_id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Snippet {
    title: String,
    channel_title: String,
    #[serde(default)]
    thumbnails: Thumbnails,
}

#[derive(Debug, Default, Deserialize)]
struct Thumbnails {
    high: Option<Thumbnail>,
    medium: Option<Thumbnail>,
    default: Option<Thumbnail>,
}

#[derive(Debug, Deserialize)]
struct Thumbnail {
    url: String,
}

/// Client de recherche YouTube Data
#[derive(Debug, Clone)]
pub struct YoutubeSearch {
    client: Client,
    api_key: String,
    base_url: String,
}

impl YoutubeSearch {
    pub fn new(api_key: impl Into<String>) -> reqwest::Result<Self> {
        Self::with_base_url(api_key, API_BASE_URL)
    }

    pub fn with_base_url(
        api_key: impl Into<String>,
        base_url: impl Into<String>,
    ) -> reqwest::Result<Self> {
        let client = Client::builder().timeout(Duration::from_secs(10)).build()?;
        Ok(Self {
            client,
            api_key: api_key.into(),
            base_url: base_url.into(),
        })
    }

    pub async fn search(&self, query: &str) -> Result<Vec<AudioTrack>> {
        debug!(query, "Searching YouTube");
        let response = self
            .client
            .get(format!("{}/search", self.base_url))
            .query(&[
                ("part", "snippet"),
                ("type", "video"),
                ("maxResults", MAX_RESULTS),
                ("q", query),
                ("key", self.api_key.as_str()),
            ])
            .send()
            .await
            .map_err(SourceError::backend)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(status = status.as_u16(), "YouTube search failed");
            return Err(SourceError::Backend(format!(
                "YouTube API error (code {}): {}",
                status.as_u16(),
                body
            )));
        }

        let parsed: SearchResponse = response.json().await.map_err(SourceError::backend)?;
        Ok(parsed.items.into_iter().filter_map(to_track).collect())
    }
}

fn to_track(item: SearchItem) -> Option<AudioTrack> {
    let slug = item.id.video_id?;
    let Snippet {
        title,
        channel_title,
        thumbnails,
    } = item.snippet;

    let track = AudioTrack::youtube(slug, decode_entities(&title), decode_entities(&channel_title));
    let artwork = thumbnails
        .high
        .or(thumbnails.medium)
        .or(thumbnails.default)
        .map(|t| t.url);
    Some(match artwork {
        Some(url) => track.with_artwork(url),
        None => track,
    })
}

/// Les titres de l'API arrivent échappés pour HTML
fn decode_entities(s: &str) -> String {
    s.replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&amp;", "&")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn test_decode_entities() {
        assert_eq!(
            decode_entities("Tom &amp; Jerry&#39;s &quot;hit&quot;"),
            "Tom & Jerry's \"hit\""
        );
        assert_eq!(decode_entities("&amp;lt;"), "&lt;");
    }

    #[tokio::test]
    async fn test_search_maps_items() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/search"))
            .and(query_param("q", "daft punk"))
            .and(query_param("key", "k"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "items": [
                    {
                        "id": { "kind": "youtube#video", "videoId": "5NV6Rdv1a3I" },
                        "snippet": {
                            "title": "Daft Punk - Get Lucky",
                            "channelTitle": "Daft Punk",
                            "thumbnails": { "high": { "url": "https://i.ytimg.com/hq.jpg" } }
                        }
                    },
                    {
                        "id": { "kind": "youtube#channel", "channelId": "UC1" },
                        "snippet": { "title": "Daft Punk", "channelTitle": "Daft Punk" }
                    }
                ]
            })))
            .mount(&server)
            .await;

        let search = YoutubeSearch::with_base_url("k", server.uri()).unwrap();
        let tracks = search.search("daft punk").await.unwrap();
        assert_eq!(tracks.len(), 1);
        assert_eq!(tracks[0].id, "5NV6Rdv1a3I");
        assert_eq!(tracks[0].name, "Daft Punk - Get Lucky");
        assert_eq!(tracks[0].artwork.as_deref(), Some("https://i.ytimg.com/hq.jpg"));
        assert_eq!(tracks[0].source(), "youtube");
    }

    #[tokio::test]
    async fn test_search_api_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/search"))
            .respond_with(ResponseTemplate::new(403).set_body_string("quotaExceeded"))
            .mount(&server)
            .await;

        let search = YoutubeSearch::with_base_url("k", server.uri()).unwrap();
        let err = search.search("x").await.unwrap_err();
        assert!(matches!(err, SourceError::Backend(msg) if msg.contains("403")));
    }
}
