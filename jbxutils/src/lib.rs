//! Petits utilitaires partagés par les crates JukeBox.
//!
//! - [`guess_local_ip`] : devine l'adresse IP locale utilisée pour les connexions sortantes
//! - [`mixer`] : pilotage du volume matériel via `amixer`
mod ip_utils;
pub mod mixer;

pub use ip_utils::guess_local_ip;
pub use mixer::{Mixer, clamp_volume};
