//! Gestion des erreurs pour le client Spotify

use jbxsource::SourceError;
use thiserror::Error;

/// Type Result personnalisé pour jbxspotify
pub type Result<T> = std::result::Result<T, SpotifyError>;

/// Erreurs possibles lors de l'utilisation de l'API Spotify
#[derive(Error, Debug)]
pub enum SpotifyError {
    /// Pas de refresh token, ou token révoqué : l'utilisateur doit se reconnecter
    #[error("Not Authenticated")]
    NotAuthenticated,

    /// Le paramètre `state` du retour OAuth ne correspond pas à la demande
    #[error("Invalid State")]
    InvalidState,

    /// Code d'autorisation refusé par le service de comptes
    #[error("Bad Request: {0}")]
    BadRequest(String),

    /// Aucun appareil Spotify Connect actif pour la lecture
    #[error("No active Spotify device: {0}")]
    NoActiveDevice(String),

    #[error("Rate limit exceeded, please try again later")]
    RateLimitExceeded,

    /// Erreur de l'API Spotify
    #[error("Spotify API error (code {code}): {message}")]
    ApiError { code: u16, message: String },

    /// Erreur HTTP
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Erreur de lecture/écriture du refresh token
    #[error("Token storage error: {0}")]
    Io(#[from] std::io::Error),

    /// Erreur de configuration (anyhow)
    #[error("Configuration error: {0}")]
    Config(#[from] anyhow::Error),
}

impl SpotifyError {
    /// Crée une erreur API depuis un code de statut HTTP et un message
    pub fn from_status_code(code: u16, message: impl Into<String>) -> Self {
        let message = message.into();
        match code {
            400 => Self::BadRequest(message),
            401 => Self::NotAuthenticated,
            404 if message.contains("NO_ACTIVE_DEVICE") || message.contains("device") => {
                Self::NoActiveDevice(message)
            }
            429 => Self::RateLimitExceeded,
            _ => Self::ApiError { code, message },
        }
    }

    pub fn is_auth_error(&self) -> bool {
        matches!(self, SpotifyError::NotAuthenticated)
    }
}

impl From<SpotifyError> for SourceError {
    fn from(e: SpotifyError) -> Self {
        match e {
            SpotifyError::NotAuthenticated => SourceError::NotAuthenticated,
            other => SourceError::Backend(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_status_code() {
        assert!(SpotifyError::from_status_code(401, "expired").is_auth_error());
        assert!(matches!(
            SpotifyError::from_status_code(400, "invalid_grant"),
            SpotifyError::BadRequest(_)
        ));
        assert!(matches!(
            SpotifyError::from_status_code(404, r#"{"reason":"NO_ACTIVE_DEVICE"}"#),
            SpotifyError::NoActiveDevice(_)
        ));
        assert!(matches!(
            SpotifyError::from_status_code(502, "bad gateway"),
            SpotifyError::ApiError { code: 502, .. }
        ));
    }

    #[test]
    fn test_source_error_conversion() {
        let e: SourceError = SpotifyError::NotAuthenticated.into();
        assert!(e.is_not_authenticated());

        let e: SourceError = SpotifyError::RateLimitExceeded.into();
        assert!(matches!(e, SourceError::Backend(_)));
    }
}
