//! # jbxspotify - Source Spotify du JukeBox
//!
//! Lecture via l'API Web Spotify sur un appareil Spotify Connect.
//!
//! - [`auth`] : flux OAuth « authorization code », refresh token persistant
//! - [`api`] : recherche et commandes du lecteur
//! - [`source`] / [`adapter`] : intégration au registre des sources
//! - `router` (feature `server`) : routes `/login` et `/auth`
//!
//! Sans refresh token valide, la recherche échoue avec
//! `SourceError::NotAuthenticated` et le registre omet Spotify des résultats.

pub mod adapter;
pub mod api;
pub mod auth;
pub mod error;
pub mod models;
pub mod source;

#[cfg(feature = "server")]
pub mod router;

pub use adapter::SpotifyAdapter;
pub use api::SpotifyApi;
pub use auth::{SCOPES, SpotifyAuth};
pub use error::{Result, SpotifyError};
pub use source::SpotifySource;

#[cfg(feature = "server")]
pub use router::{AuthNotifier, auth_router};
