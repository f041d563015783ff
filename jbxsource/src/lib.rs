//! # JBXSource
//!
//! Common traits and types for JukeBox playback backends.
//!
//! Ce crate définit le contrat que chaque backend (YouTube, Spotify, ...)
//! doit respecter pour être piloté par la file de lecture :
//!
//! - **[`AudioTrack`]** : descripteur immuable d'une piste, sérialisé en JSON
//!   pour les observateurs.
//! - **[`AudioSource`]** : handle de lecture vivant, lié à une piste.
//! - **[`SourceAdapter`]** : fabrique de sources et recherche dans le catalogue.
//! - **[`AdapterRegistry`]** : registre des backends, résolution par
//!   identifiant et recherche agrégée.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use jbxsource::{AdapterRegistry, AudioTrack};
//!
//! let registry = AdapterRegistry::new();
//! registry.register(Arc::new(YoutubeAdapter::new(driver))).await;
//!
//! let results = registry.search_all("daft punk").await;
//! let adapter = registry.resolve("youtube").await.unwrap();
//! let source = adapter.create_audio_source(results[0].tracks[0].clone())?;
//! source.start().await?;
//! ```

pub mod adapter;
pub mod error;
pub mod registry;
pub mod source;
pub mod track;

pub use adapter::SourceAdapter;
pub use error::{Result, SourceError};
pub use registry::{AdapterRegistry, SearchResult, ServiceInfo};
pub use source::{AudioSource, SharedSource, ensure_source};
pub use track::{
    AudioStatus, AudioTrack, SPOTIFY_SOURCE, SpotifyTrack, TrackData, UNKNOWN_TIME,
    YOUTUBE_SOURCE, YoutubeVideo,
};
