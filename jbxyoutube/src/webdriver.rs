//! Client minimal du protocole W3C WebDriver
//!
//! Seules les commandes utiles à la lecture sont couvertes : création et
//! fermeture de session, navigation et exécution de scripts synchrones.
//! Le client parle à un `geckodriver` (ou un hub Selenium) via HTTP.

use std::time::Duration;

use reqwest::{Client, Response};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use tracing::{debug, info, trace, warn};

use crate::error::{Result, WebDriverError};

/// Délai HTTP par commande; la création de session lance un navigateur
const COMMAND_TIMEOUT: Duration = Duration::from_secs(60);

/// Intervalle entre deux essais de [`Session::wait_for`]
const WAIT_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Enveloppe `{"value": ...}` de toutes les réponses W3C
#[derive(Debug, Deserialize)]
struct Envelope<T> {
    value: T,
}

#[derive(Debug, Deserialize)]
struct ErrorValue {
    error: Option<String>,
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct NewSession {
    session_id: String,
}

/// Connexion à un endpoint WebDriver
#[derive(Debug, Clone)]
pub struct WebDriverClient {
    client: Client,
    base_url: String,
    headless: bool,
}

impl WebDriverClient {
    pub fn new(base_url: impl Into<String>, headless: bool) -> Result<Self> {
        let client = Client::builder().timeout(COMMAND_TIMEOUT).build()?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            headless,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn is_headless(&self) -> bool {
        self.headless
    }

    /// Capabilities Firefox de la session
    ///
    /// L'autoplay média est autorisé, sinon la vidéo reste bloquée sur
    /// l'écran de démarrage.
    pub fn capabilities(&self) -> Value {
        let args: Vec<&str> = if self.headless { vec!["-headless"] } else { vec![] };
        json!({
            "capabilities": {
                "alwaysMatch": {
                    "browserName": "firefox",
                    "moz:firefoxOptions": {
                        "args": args,
                        "prefs": {
                            "media.autoplay.default": 0,
                            "media.gmp-manager.updateEnabled": true
                        }
                    }
                }
            }
        })
    }

    /// Ouvre une nouvelle session de navigateur
    pub async fn new_session(&self) -> Result<Session> {
        info!(endpoint = %self.base_url, headless = self.headless, "Creating driver session");
        let url = format!("{}/session", self.base_url);
        let response = self.client.post(&url).json(&self.capabilities()).send().await?;
        let created: NewSession = handle_response(response).await?;
        debug!(session = %created.session_id, "Driver session created");

        Ok(Session {
            client: self.client.clone(),
            url: format!("{}/session/{}", self.base_url, created.session_id),
            id: created.session_id,
        })
    }
}

/// Session de navigateur ouverte
///
/// La session n'est pas fermée au drop : appeler [`Session::close`].
#[derive(Debug)]
pub struct Session {
    client: Client,
    id: String,
    url: String,
}

impl Session {
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Charge une page et retourne l'URL effectivement atteinte
    pub async fn navigate(&self, url: &str) -> Result<String> {
        info!(url, "Fetching URL");
        let response = self
            .client
            .post(format!("{}/url", self.url))
            .json(&json!({ "url": url }))
            .send()
            .await?;
        let _: Value = handle_response(response).await?;
        self.current_url().await
    }

    pub async fn current_url(&self) -> Result<String> {
        let response = self.client.get(format!("{}/url", self.url)).send().await?;
        handle_response(response).await
    }

    /// Exécute un script synchrone (le corps d'une fonction JS) dans la page
    pub async fn execute<T: DeserializeOwned>(&self, script: &str) -> Result<T> {
        trace!(session = %self.id, "Executing script");
        let response = self
            .client
            .post(format!("{}/execute/sync", self.url))
            .json(&json!({ "script": script, "args": [] }))
            .send()
            .await?;
        handle_response(response).await
    }

    /// Répète un script jusqu'à ce qu'il retourne `true`
    pub async fn wait_for(&self, what: &str, script: &str, timeout: Duration) -> Result<()> {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            if self.execute::<bool>(script).await? {
                return Ok(());
            }
            if tokio::time::Instant::now() >= deadline {
                warn!(what, "Gave up waiting on the page");
                return Err(WebDriverError::Timeout(what.to_string()));
            }
            tokio::time::sleep(WAIT_POLL_INTERVAL).await;
        }
    }

    /// Ferme le navigateur et libère la session
    pub async fn close(self) -> Result<()> {
        info!(session = %self.id, "Closing driver session");
        let response = self.client.delete(&self.url).send().await?;
        let _: Value = handle_response(response).await?;
        Ok(())
    }
}

async fn handle_response<T: DeserializeOwned>(response: Response) -> Result<T> {
    let status = response.status();
    let text = response.text().await?;

    if !status.is_success() {
        let detail = serde_json::from_str::<Envelope<ErrorValue>>(&text).ok();
        let (error, message) = match detail {
            Some(Envelope { value }) => (value.error, value.message),
            None => (None, Some(text)),
        };
        warn!(status = status.as_u16(), ?error, "WebDriver command failed");
        return Err(WebDriverError::from_status(status.as_u16(), error, message));
    }

    serde_json::from_str::<Envelope<T>>(&text)
        .map(|envelope| envelope.value)
        .map_err(|e| WebDriverError::InvalidResponse(e.to_string()))
}
