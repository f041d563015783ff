//! Gestion des erreurs pour le client WebDriver

use jbxsource::SourceError;
use thiserror::Error;

/// Type Result personnalisé pour jbxyoutube
pub type Result<T> = std::result::Result<T, WebDriverError>;

/// Erreurs possibles lors du pilotage du navigateur
#[derive(Error, Debug)]
pub enum WebDriverError {
    /// Erreur HTTP (endpoint WebDriver injoignable, timeout, ...)
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Erreur renvoyée par le driver (`{"value": {"error": ..., "message": ...}}`)
    #[error("WebDriver command failed ({error}): {message}")]
    Command { error: String, message: String },

    /// Réponse qui ne suit pas le protocole W3C
    #[error("Invalid WebDriver response: {0}")]
    InvalidResponse(String),

    /// Aucune session de navigateur n'est ouverte pour cette vidéo
    #[error("Invalid video, driver has not been started")]
    NoSession,

    /// Le navigateur n'a pas atteint la page attendue
    #[error("Navigation to '{expected}' ended on '{found}'")]
    Navigation { expected: String, found: String },

    #[error("Timed out waiting for {0}")]
    Timeout(String),
}

impl WebDriverError {
    /// Construit une erreur depuis le corps d'erreur W3C
    pub fn from_status(status: u16, error: Option<String>, message: Option<String>) -> Self {
        Self::Command {
            error: error.unwrap_or_else(|| format!("http {}", status)),
            message: message.unwrap_or_default(),
        }
    }

    /// La session a disparu côté driver (navigateur fermé, crash)
    pub fn is_invalid_session(&self) -> bool {
        matches!(self, WebDriverError::Command { error, .. } if error == "invalid session id")
    }
}

impl From<WebDriverError> for SourceError {
    fn from(e: WebDriverError) -> Self {
        SourceError::Backend(e.to_string())
    }
}
