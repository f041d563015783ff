//! Scripts injectés dans la page de lecture YouTube

use serde::Deserialize;

/// Titre et chaîne de la vidéo chargée
pub const INFO: &str = include_str!("scripts/info.js");

/// État du lecteur `<video>`
pub const STATE: &str = include_str!("scripts/state.js");

/// Clic sur le lecteur (bascule lecture/pause); `false` tant qu'il n'est pas visible
pub const PLAYPAUSE: &str = include_str!("scripts/playpause.js");

/// Désactive l'enchaînement automatique; `false` tant que le bouton n'existe pas
pub const DISABLE_AUTOPLAY: &str = include_str!("scripts/autoplay.js");

#[derive(Debug, Clone, Deserialize)]
pub struct PageInfo {
    pub name: String,
    pub artist: String,
}

/// Valeurs brutes de `state.js`, `null` tant que la vidéo n'est pas chargée
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct PageState {
    pub paused: Option<bool>,
    pub time: Option<f64>,
    pub duration: Option<f64>,
    pub ended: Option<bool>,
}
