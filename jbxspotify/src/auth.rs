//! Autorisation OAuth (authorization code flow) auprès de Spotify
//!
//! Le refresh token est conservé sur disque pour survivre aux redémarrages ;
//! l'access token n'est gardé qu'en mémoire et renouvelé à l'expiration.

use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};

use reqwest::{Client, Url};
use serde::Deserialize;
use tokio::sync::RwLock;
use tracing::{debug, info, trace, warn};

use crate::error::{Result, SpotifyError};

const ACCOUNTS_URL: &str = "https://accounts.spotify.com";

/// Marge retirée à la durée de vie annoncée de l'access token
const EXPIRY_MARGIN: Duration = Duration::from_secs(60);

/// Nom du fichier contenant le refresh token
pub const TOKEN_FILE: &str = "refreshToken";

/// Permissions demandées à l'utilisateur
pub const SCOPES: &[&str] = &[
    // Contrôle de la lecture
    "user-modify-playback-state",
    // Morceau et état courants
    "user-read-currently-playing",
    "user-read-playback-state",
    // Recherche
    "user-read-private",
    // Bibliothèque et playlists privées
    "user-library-read",
    "playlist-read-private",
    "streaming",
];

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: u64,
    refresh_token: Option<String>,
}

#[derive(Debug, Default)]
struct Tokens {
    access: Option<(String, Instant)>,
    refresh: Option<String>,
}

/// Jetons OAuth de l'application
#[derive(Debug)]
pub struct SpotifyAuth {
    client: Client,
    client_id: String,
    client_secret: String,
    redirect_uri: String,
    accounts_url: String,
    token_path: PathBuf,
    tokens: RwLock<Tokens>,
    pending_state: Mutex<Option<String>>,
}

impl SpotifyAuth {
    /// Crée le gestionnaire et recharge le refresh token s'il existe
    pub fn new(
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
        redirect_uri: impl Into<String>,
        data_dir: impl AsRef<Path>,
    ) -> Result<Self> {
        let token_path = data_dir.as_ref().join("spotify").join(TOKEN_FILE);
        let refresh = match std::fs::read_to_string(&token_path) {
            Ok(token) if !token.trim().is_empty() => {
                trace!(path = %token_path.display(), "Found cached Spotify token");
                Some(token.trim().to_string())
            }
            _ => None,
        };

        Ok(Self {
            client: Client::builder().timeout(Duration::from_secs(10)).build()?,
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            redirect_uri: redirect_uri.into(),
            accounts_url: ACCOUNTS_URL.to_string(),
            token_path,
            tokens: RwLock::new(Tokens {
                access: None,
                refresh,
            }),
            pending_state: Mutex::new(None),
        })
    }

    /// Remplace l'URL du service de comptes (tests)
    pub fn with_accounts_url(mut self, url: impl Into<String>) -> Self {
        self.accounts_url = url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn token_path(&self) -> &Path {
        &self.token_path
    }

    /// URL d'autorisation à ouvrir dans le navigateur
    ///
    /// Chaque appel génère un nouveau `state` qui invalide le précédent.
    pub fn authorize_url(&self) -> Result<String> {
        let state = uuid::Uuid::new_v4().to_string();
        let scope = SCOPES.join(" ");
        let url = Url::parse_with_params(
            &format!("{}/authorize", self.accounts_url),
            &[
                ("client_id", self.client_id.as_str()),
                ("response_type", "code"),
                ("redirect_uri", self.redirect_uri.as_str()),
                ("scope", scope.as_str()),
                ("state", state.as_str()),
            ],
        )
        .map_err(|e| SpotifyError::Config(anyhow::anyhow!("invalid accounts url: {}", e)))?;

        *self
            .pending_state
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(state);
        Ok(url.into())
    }

    /// Échange le code reçu sur la redirection contre des jetons
    pub async fn exchange_code(&self, code: &str, state: &str) -> Result<()> {
        {
            let mut pending = self
                .pending_state
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            if pending.as_deref().is_some_and(|expected| expected != state) {
                warn!("Spotify authorization answered with an unknown state");
                return Err(SpotifyError::InvalidState);
            }
            *pending = None;
        }

        let form = [
            ("grant_type", "authorization_code"),
            ("code", code),
            ("redirect_uri", self.redirect_uri.as_str()),
        ];
        match self.request_token(&form).await {
            Ok(token) => {
                let refresh = token.refresh_token.clone().ok_or_else(|| {
                    SpotifyError::BadRequest("no refresh token in the response".into())
                })?;
                self.store_refresh_token(&refresh).await?;
                let mut tokens = self.tokens.write().await;
                tokens.access = Some(expiring(token));
                tokens.refresh = Some(refresh);
                info!("Successfully authenticated with Spotify");
                Ok(())
            }
            Err(e) => {
                warn!(error = %e, "Spotify code exchange failed, forgetting tokens");
                self.forget().await;
                Err(e)
            }
        }
    }

    /// Access token valide, renouvelé si nécessaire
    pub async fn access_token(&self) -> Result<String> {
        let refresh = {
            let tokens = self.tokens.read().await;
            if let Some((token, expires)) = &tokens.access {
                if Instant::now() < *expires {
                    return Ok(token.clone());
                }
            }
            tokens.refresh.clone().ok_or(SpotifyError::NotAuthenticated)?
        };

        let token = self
            .request_token(&[("grant_type", "refresh_token"), ("refresh_token", refresh.as_str())])
            .await
            .map_err(|e| match e {
                SpotifyError::BadRequest(_) => SpotifyError::NotAuthenticated,
                other => other,
            })?;
        trace!("Successfully refreshed the Spotify access token");

        // Spotify peut faire tourner le refresh token
        if let Some(rotated) = token.refresh_token.as_deref() {
            if rotated != refresh {
                self.store_refresh_token(rotated).await?;
                self.tokens.write().await.refresh = Some(rotated.to_string());
            }
        }

        let access = token.access_token.clone();
        self.tokens.write().await.access = Some(expiring(token));
        Ok(access)
    }

    /// Vrai si un access token est disponible ou peut être obtenu
    pub async fn is_authenticated(&self) -> bool {
        match self.access_token().await {
            Ok(_) => true,
            Err(e) => {
                debug!(error = %e, "Spotify is not authenticated");
                false
            }
        }
    }

    /// Oublie l'access token courant (réponse 401 de l'API)
    pub async fn invalidate_access(&self) {
        self.tokens.write().await.access = None;
    }

    async fn forget(&self) {
        *self.tokens.write().await = Tokens::default();
        if let Err(e) = tokio::fs::remove_file(&self.token_path).await {
            if e.kind() != std::io::ErrorKind::NotFound {
                warn!(error = %e, "Failed to remove the cached Spotify token");
            }
        }
    }

    async fn store_refresh_token(&self, refresh: &str) -> Result<()> {
        if let Some(dir) = self.token_path.parent() {
            tokio::fs::create_dir_all(dir).await?;
        }
        tokio::fs::write(&self.token_path, refresh).await?;
        debug!(path = %self.token_path.display(), "Stored Spotify refresh token");
        Ok(())
    }

    async fn request_token(&self, form: &[(&str, &str)]) -> Result<TokenResponse> {
        let response = self
            .client
            .post(format!("{}/api/token", self.accounts_url))
            .basic_auth(&self.client_id, Some(&self.client_secret))
            .form(form)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(status = status.as_u16(), "Spotify token request failed");
            return Err(match status.as_u16() {
                // Le service de comptes répond 400 pour un code ou un token rejeté
                400 | 401 => SpotifyError::BadRequest(body),
                code => SpotifyError::from_status_code(code, body),
            });
        }
        Ok(response.json().await?)
    }
}

fn expiring(token: TokenResponse) -> (String, Instant) {
    let lifetime = Duration::from_secs(token.expires_in).saturating_sub(EXPIRY_MARGIN);
    (token.access_token, Instant::now() + lifetime)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn auth(dir: &Path) -> SpotifyAuth {
        SpotifyAuth::new("id", "secret", "http://localhost:8080/api/v1/spotify/auth", dir).unwrap()
    }

    #[test]
    fn test_authorize_url() {
        let dir = tempfile::tempdir().unwrap();
        let auth = auth(dir.path());
        let url = Url::parse(&auth.authorize_url().unwrap()).unwrap();

        assert_eq!(url.host_str(), Some("accounts.spotify.com"));
        let params: std::collections::HashMap<_, _> = url.query_pairs().into_owned().collect();
        assert_eq!(params["client_id"], "id");
        assert_eq!(params["response_type"], "code");
        assert!(params["scope"].contains("user-modify-playback-state"));
        assert_eq!(
            auth.pending_state.lock().unwrap().as_deref(),
            Some(params["state"].as_str())
        );
    }

    #[tokio::test]
    async fn test_no_token_is_not_authenticated() {
        let dir = tempfile::tempdir().unwrap();
        let auth = auth(dir.path());
        assert!(matches!(
            auth.access_token().await,
            Err(SpotifyError::NotAuthenticated)
        ));
        assert!(!auth.is_authenticated().await);
    }

    #[tokio::test]
    async fn test_state_mismatch_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let auth = auth(dir.path());
        auth.authorize_url().unwrap();
        assert!(matches!(
            auth.exchange_code("code", "forged").await,
            Err(SpotifyError::InvalidState)
        ));
    }

    #[test]
    fn test_cached_token_loaded() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("spotify")).unwrap();
        std::fs::write(dir.path().join("spotify").join(TOKEN_FILE), "cached\n").unwrap();

        let auth = auth(dir.path());
        assert_eq!(
            auth.tokens.try_read().unwrap().refresh.as_deref(),
            Some("cached")
        );
    }
}
