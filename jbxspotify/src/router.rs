//! Routes d'autorisation Spotify
//!
//! - `GET /login` : redirige vers la page d'autorisation Spotify
//! - `GET /auth?code&state` : URL de retour enregistrée auprès de Spotify

use std::sync::Arc;

use axum::{
    Router,
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
    routing::get,
};
use serde::Deserialize;
use tracing::{error, info};

use crate::auth::SpotifyAuth;
use crate::error::SpotifyError;

/// Appelé après chaque autorisation réussie
pub type AuthNotifier = Arc<dyn Fn() + Send + Sync>;

#[derive(Clone)]
struct AuthState {
    auth: Arc<SpotifyAuth>,
    notify: AuthNotifier,
}

#[derive(Debug, Deserialize)]
pub struct AuthCallback {
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
}

/// Router à monter sous `/api/v1/spotify`
pub fn auth_router(auth: Arc<SpotifyAuth>, notify: AuthNotifier) -> Router {
    Router::new()
        .route("/login", get(login))
        .route("/auth", get(callback))
        .with_state(AuthState { auth, notify })
}

async fn login(State(state): State<AuthState>) -> Response {
    if state.auth.is_authenticated().await {
        return "Already authenticated!".into_response();
    }
    match state.auth.authorize_url() {
        Ok(url) => Redirect::to(&url).into_response(),
        Err(e) => {
            error!(error = %e, "Failed to build the Spotify authorize URL");
            (StatusCode::INTERNAL_SERVER_ERROR, "Something went wrong.").into_response()
        }
    }
}

async fn callback(State(state): State<AuthState>, Query(query): Query<AuthCallback>) -> Response {
    if let Some(reason) = query.error {
        info!(reason = %reason, "Spotify authorization denied");
        return (StatusCode::FORBIDDEN, "Unauthorized").into_response();
    }
    let (Some(code), Some(oauth_state)) = (query.code, query.state) else {
        return (StatusCode::BAD_REQUEST, "Bad Request").into_response();
    };

    match state.auth.exchange_code(&code, &oauth_state).await {
        Ok(()) => {
            (state.notify)();
            "Success".into_response()
        }
        Err(SpotifyError::InvalidState) => {
            (StatusCode::FORBIDDEN, "Unauthorized").into_response()
        }
        Err(SpotifyError::BadRequest(_)) => {
            (StatusCode::BAD_REQUEST, "Bad Request").into_response()
        }
        Err(e) => {
            error!(error = %e, "Error during spotify auth");
            (StatusCode::INTERNAL_SERVER_ERROR, "Something went wrong.").into_response()
        }
    }
}
