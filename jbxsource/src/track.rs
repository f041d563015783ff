//! Track descriptors and transport snapshots.

use serde::{Deserialize, Serialize};

use crate::error::SourceError;

/// Source identifier of the YouTube backend
pub const YOUTUBE_SOURCE: &str = "youtube";
/// Source identifier of the Spotify backend
pub const SPOTIFY_SOURCE: &str = "spotify";

/// Value reported for an unknown elapsed time or duration
pub const UNKNOWN_TIME: f64 = -1.0;

/// YouTube specific payload: the video slug (`v=` parameter)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct YoutubeVideo {
    pub slug: String,
}

/// Spotify specific payload: the track URI (`spotify:track:...`)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpotifyTrack {
    pub uri: String,
}

/// Backend payload of a track, keyed by the backend that produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TrackData {
    Youtube(YoutubeVideo),
    Spotify(SpotifyTrack),
}

impl TrackData {
    /// Identifier of the backend able to play this payload
    pub fn source_id(&self) -> &'static str {
        match self {
            TrackData::Youtube(_) => YOUTUBE_SOURCE,
            TrackData::Spotify(_) => SPOTIFY_SOURCE,
        }
    }
}

/// Immutable descriptor of a playable track.
///
/// Two tracks are the "same" track only by convention of the backend `id`;
/// equality here is structural.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "WireTrack", into = "WireTrack")]
pub struct AudioTrack {
    pub id: String,
    pub name: String,
    pub artist: String,
    pub artwork: Option<String>,
    pub data: TrackData,
}

impl AudioTrack {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        artist: impl Into<String>,
        data: TrackData,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            artist: artist.into(),
            artwork: None,
            data,
        }
    }

    pub fn with_artwork(mut self, artwork: impl Into<String>) -> Self {
        self.artwork = Some(artwork.into());
        self
    }

    /// Builds a YouTube track whose id is the video slug
    pub fn youtube(
        slug: impl Into<String>,
        name: impl Into<String>,
        artist: impl Into<String>,
    ) -> Self {
        let slug = slug.into();
        Self::new(
            slug.clone(),
            name,
            artist,
            TrackData::Youtube(YoutubeVideo { slug }),
        )
    }

    /// Builds a Spotify track from its catalog id and URI
    pub fn spotify(
        id: impl Into<String>,
        uri: impl Into<String>,
        name: impl Into<String>,
        artist: impl Into<String>,
    ) -> Self {
        Self::new(
            id,
            name,
            artist,
            TrackData::Spotify(SpotifyTrack { uri: uri.into() }),
        )
    }

    /// Backend identifier, derived from the payload variant
    pub fn source(&self) -> &'static str {
        self.data.source_id()
    }
}

/// JSON shape exchanged with observers:
/// `{"source", "id", "name", "artist", "artwork", "data"}`.
#[derive(Serialize, Deserialize)]
struct WireTrack {
    source: String,
    id: String,
    name: String,
    artist: String,
    #[serde(default)]
    artwork: Option<String>,
    data: serde_json::Value,
}

impl From<AudioTrack> for WireTrack {
    fn from(track: AudioTrack) -> Self {
        let source = track.source().to_string();
        let data = match &track.data {
            TrackData::Youtube(video) => serde_json::to_value(video),
            TrackData::Spotify(spotify) => serde_json::to_value(spotify),
        }
        .unwrap_or(serde_json::Value::Null);

        WireTrack {
            source,
            id: track.id,
            name: track.name,
            artist: track.artist,
            artwork: track.artwork,
            data,
        }
    }
}

impl TryFrom<WireTrack> for AudioTrack {
    type Error = SourceError;

    fn try_from(wire: WireTrack) -> Result<Self, Self::Error> {
        let data = match wire.source.as_str() {
            YOUTUBE_SOURCE => serde_json::from_value(wire.data).map(TrackData::Youtube),
            SPOTIFY_SOURCE => serde_json::from_value(wire.data).map(TrackData::Spotify),
            other => {
                return Err(SourceError::InvalidTrack(format!(
                    "unknown source '{}'",
                    other
                )));
            }
        }
        .map_err(|e| SourceError::InvalidTrack(e.to_string()))?;

        Ok(AudioTrack {
            id: wire.id,
            name: wire.name,
            artist: wire.artist,
            artwork: wire.artwork,
            data,
        })
    }
}

/// Point-in-time transport snapshot reported by a backend.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AudioStatus {
    pub playing: bool,
    /// True once the backend reports end-of-track
    pub finished: bool,
    /// Elapsed seconds, [`UNKNOWN_TIME`] when unknown
    pub time: f64,
    /// Duration in seconds, [`UNKNOWN_TIME`] when unknown
    pub duration: f64,
}

impl AudioStatus {
    pub fn new(playing: bool, finished: bool, time: f64, duration: f64) -> Self {
        Self {
            playing,
            finished,
            time,
            duration,
        }
    }

    /// Status of a source that is loaded but not playing
    pub fn paused(time: f64, duration: f64) -> Self {
        Self::new(false, false, time, duration)
    }

    /// Status of a source that reached the end of its track
    pub fn ended(duration: f64) -> Self {
        Self::new(false, true, duration, duration)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_is_derived_from_payload() {
        let yt = AudioTrack::youtube("dQw4w9WgXcQ", "Never Gonna", "Rick");
        assert_eq!(yt.source(), YOUTUBE_SOURCE);
        assert_eq!(yt.id, "dQw4w9WgXcQ");

        let sp = AudioTrack::spotify(
            "4uLU6hMCjMI75M1A2tKUQC",
            "spotify:track:4uLU6hMCjMI75M1A2tKUQC",
            "Song",
            "Band",
        );
        assert_eq!(sp.source(), SPOTIFY_SOURCE);
    }

    #[test]
    fn test_track_json_shape() {
        let track =
            AudioTrack::youtube("abc", "Title", "Channel").with_artwork("http://img/abc.jpg");
        let json = serde_json::to_value(&track).unwrap();

        assert_eq!(json["source"], "youtube");
        assert_eq!(json["name"], "Title");
        assert_eq!(json["artwork"], "http://img/abc.jpg");
        assert_eq!(json["data"]["slug"], "abc");

        let back: AudioTrack = serde_json::from_value(json).unwrap();
        assert_eq!(back, track);
    }

    #[test]
    fn test_unknown_source_is_rejected() {
        let json = serde_json::json!({
            "source": "soundcloud",
            "id": "1",
            "name": "n",
            "artist": "a",
            "data": {}
        });
        assert!(serde_json::from_value::<AudioTrack>(json).is_err());
    }

    #[test]
    fn test_payload_must_match_source() {
        let json = serde_json::json!({
            "source": "spotify",
            "id": "1",
            "name": "n",
            "artist": "a",
            "data": { "slug": "abc" }
        });
        assert!(serde_json::from_value::<AudioTrack>(json).is_err());
    }
}
