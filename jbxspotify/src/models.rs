//! Réponses de l'API Web Spotify (sous-ensemble utilisé)

use jbxsource::AudioTrack;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct SearchResponse {
    pub tracks: Paging<Track>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Paging<T> {
    #[serde(default = "Vec::new")]
    pub items: Vec<T>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Artist {
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Image {
    pub url: String,
    pub width: Option<u32>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Album {
    #[serde(default)]
    pub images: Vec<Image>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Track {
    pub id: String,
    pub uri: String,
    pub name: String,
    #[serde(default)]
    pub artists: Vec<Artist>,
    #[serde(default)]
    pub album: Album,
    pub duration_ms: u64,
}

impl Track {
    /// Pochette la plus grande proposée
    pub fn artwork(&self) -> Option<&str> {
        self.album
            .images
            .iter()
            .max_by_key(|image| image.width.unwrap_or(0))
            .map(|image| image.url.as_str())
    }

    pub fn artist_names(&self) -> String {
        self.artists
            .iter()
            .map(|a| a.name.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl From<Track> for AudioTrack {
    fn from(track: Track) -> Self {
        let artwork = track.artwork().map(str::to_string);
        let artist = track.artist_names();
        let audio = AudioTrack::spotify(track.id, track.uri, track.name, artist);
        match artwork {
            Some(url) => audio.with_artwork(url),
            None => audio,
        }
    }
}

/// `GET /v1/me/player`
#[derive(Debug, Clone, Deserialize)]
pub struct PlaybackState {
    #[serde(default)]
    pub is_playing: bool,
    pub progress_ms: Option<u64>,
    pub item: Option<PlayingItem>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PlayingItem {
    pub uri: String,
    pub duration_ms: u64,
}
