//! # Player API - REST et commandes WebSocket
//!
//! Routes REST (servies sous `/api/player`) :
//!
//! - `GET /state` - État complet (track, status, queue, history, volume)
//! - `POST /playpause` - Pause / reprise
//! - `POST /next`, `POST /previous` - Transitions
//! - `POST /enqueue` - Ajoute une track à la file
//! - `POST /shift` - Déplace une entrée de la file
//! - `DELETE /queue/{index}` - Retire une entrée de la file
//! - `POST /preload` - Prépare la tête de file
//! - `GET /search?q=` - Recherche sur tous les backends
//! - `POST /volume` - Règle le volume du mixer

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{delete, get, post},
};
use jbxsource::{AudioStatus, AudioTrack, SearchResult, SourceError};
use jbxutils::Mixer;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use utoipa::{OpenApi, ToSchema};

use crate::error::QueueError;
use crate::events::{BroadcastSink, PlayerEvent};
use crate::player::Player;

/// Shared state of the player API: the engine, its event channel and the
/// volume mixer.
#[derive(Clone)]
pub struct PlayerApiState {
    player: Arc<Player>,
    events: BroadcastSink,
    mixer: Arc<Mixer>,
    volume: Arc<AtomicU8>,
}

impl PlayerApiState {
    pub fn new(player: Arc<Player>, events: BroadcastSink, mixer: Mixer) -> Self {
        Self {
            player,
            events,
            mixer: Arc::new(mixer),
            volume: Arc::new(AtomicU8::new(100)),
        }
    }

    pub fn player(&self) -> &Arc<Player> {
        &self.player
    }

    pub fn events(&self) -> &BroadcastSink {
        &self.events
    }

    /// Last volume applied, in percent
    pub fn volume(&self) -> u8 {
        self.volume.load(Ordering::Relaxed)
    }

    /// Reads the current mixer volume so observers start from the real value
    pub async fn sync_volume(&self) {
        let mixer = self.mixer.clone();
        match tokio::task::spawn_blocking(move || mixer.get_volume()).await {
            Ok(Ok(Some(volume))) => self.volume.store(volume, Ordering::Relaxed),
            Ok(Ok(None)) => {}
            Ok(Err(e)) => warn!(error = %e, "Failed to read mixer volume"),
            Err(e) => warn!(error = %e, "Mixer task panicked"),
        }
    }

    /// Applies `percent` (clamped to 0..=100) and broadcasts the new volume
    pub async fn set_volume(&self, percent: i64) -> Result<u8, ApiError> {
        let mixer = self.mixer.clone();
        let volume = tokio::task::spawn_blocking(move || mixer.set_volume(percent))
            .await
            .map_err(|e| ApiError::internal(e.to_string()))?
            .map_err(|e| ApiError::new(StatusCode::BAD_GATEWAY, e.to_string()))?;

        debug!(volume, "Volume changed");
        self.volume.store(volume, Ordering::Relaxed);
        self.player.broadcast(PlayerEvent::Volume(volume));
        Ok(volume)
    }

    /// Now-playing status, `None` when idle or while a transition runs
    async fn current_status(&self) -> Option<AudioStatus> {
        match self.player.status().await {
            Ok(status) => status,
            Err(e) => {
                debug!(error = %e, "Status unavailable for snapshot");
                None
            }
        }
    }

    pub async fn state(&self) -> PlayerState {
        PlayerState {
            track: self.player.current(),
            status: self.current_status().await,
            queue: self.player.queue(),
            history: self.player.history(),
            volume: self.volume(),
            autoplay: self.player.autoplay(),
            authentications: self.player.registry().authentications().await,
        }
    }

    /// Full state as events, sent to a newly connected observer
    pub async fn snapshot_events(&self) -> Vec<PlayerEvent> {
        let state = self.state().await;
        vec![
            PlayerEvent::Track(state.track),
            PlayerEvent::Status(state.status),
            PlayerEvent::Queue(state.queue),
            PlayerEvent::History(state.history),
            PlayerEvent::Volume(state.volume),
            PlayerEvent::Authentications(state.authentications),
        ]
    }

    /// Re-reads every backend's authentication state and broadcasts it
    pub async fn broadcast_authentications(&self) {
        let auths = self.player.registry().authentications().await;
        self.player.broadcast(PlayerEvent::Authentications(auths));
    }
}

// ============================================================================
// TYPES
// ============================================================================

/// État complet du lecteur
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct PlayerState {
    #[schema(value_type = Option<Object>)]
    pub track: Option<AudioTrack>,
    #[schema(value_type = Option<Object>)]
    pub status: Option<AudioStatus>,
    #[schema(value_type = Vec<Object>)]
    pub queue: Vec<AudioTrack>,
    #[schema(value_type = Vec<Object>)]
    pub history: Vec<AudioTrack>,
    pub volume: u8,
    pub autoplay: bool,
    pub authentications: BTreeMap<String, bool>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct EnqueueRequest {
    #[schema(value_type = Object)]
    pub track: AudioTrack,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ShiftRequest {
    pub old_index: usize,
    pub new_index: usize,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ShiftResponse {
    pub moved: bool,
    #[schema(value_type = Vec<Object>)]
    pub queue: Vec<AudioTrack>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct VolumeRequest {
    pub volume: i64,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct VolumeResponse {
    pub volume: u8,
}

#[derive(Debug, Deserialize, utoipa::IntoParams)]
pub struct SearchQuery {
    /// Texte recherché
    pub q: String,
}

/// Message d'erreur
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    pub error: String,
}

/// Erreur HTTP de l'API
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, message)
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl From<QueueError> for ApiError {
    fn from(e: QueueError) -> Self {
        let status = match &e {
            QueueError::AdapterNotFound(_) => StatusCode::NOT_FOUND,
            QueueError::OutOfRange { .. } => StatusCode::BAD_REQUEST,
            QueueError::TransitionSkipped => StatusCode::CONFLICT,
            QueueError::Backend(SourceError::SourceMismatch { .. })
            | QueueError::Backend(SourceError::InvalidTrack(_)) => StatusCode::BAD_REQUEST,
            QueueError::Backend(SourceError::NotAuthenticated) => StatusCode::UNAUTHORIZED,
            QueueError::Backend(_) => StatusCode::BAD_GATEWAY,
        };
        Self::new(status, e.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (
            self.status,
            Json(ErrorResponse {
                error: self.message,
            }),
        )
            .into_response()
    }
}

type ApiResult<T> = Result<Json<T>, ApiError>;

// ============================================================================
// HANDLERS
// ============================================================================

#[utoipa::path(
    get,
    path = "/state",
    responses((status = 200, description = "État du lecteur", body = PlayerState)),
    tag = "player"
)]
async fn get_state(State(state): State<PlayerApiState>) -> Json<PlayerState> {
    Json(state.state().await)
}

#[utoipa::path(
    post,
    path = "/playpause",
    responses(
        (status = 200, description = "Nouveau status (null si rien ne joue)"),
        (status = 409, description = "Transition en cours", body = ErrorResponse),
        (status = 502, description = "Échec du backend", body = ErrorResponse)
    ),
    tag = "player"
)]
async fn playpause(State(state): State<PlayerApiState>) -> ApiResult<Option<AudioStatus>> {
    Ok(Json(state.player.playpause().await?))
}

#[utoipa::path(
    post,
    path = "/next",
    responses(
        (status = 200, description = "État après la transition", body = PlayerState),
        (status = 409, description = "Transition en cours", body = ErrorResponse)
    ),
    tag = "player"
)]
async fn next(State(state): State<PlayerApiState>) -> ApiResult<PlayerState> {
    state.player.next().await?;
    Ok(Json(state.state().await))
}

#[utoipa::path(
    post,
    path = "/previous",
    responses(
        (status = 200, description = "État après la transition", body = PlayerState),
        (status = 409, description = "Transition en cours", body = ErrorResponse)
    ),
    tag = "player"
)]
async fn previous(State(state): State<PlayerApiState>) -> ApiResult<PlayerState> {
    state.player.previous().await?;
    Ok(Json(state.state().await))
}

#[utoipa::path(
    post,
    path = "/enqueue",
    request_body = EnqueueRequest,
    responses(
        (status = 200, description = "Track ajoutée", body = PlayerState),
        (status = 400, description = "Track invalide", body = ErrorResponse),
        (status = 404, description = "Aucun backend pour cette source", body = ErrorResponse)
    ),
    tag = "player"
)]
async fn enqueue(
    State(state): State<PlayerApiState>,
    Json(req): Json<EnqueueRequest>,
) -> ApiResult<PlayerState> {
    state.player.enqueue_track(req.track).await?;
    Ok(Json(state.state().await))
}

#[utoipa::path(
    post,
    path = "/shift",
    request_body = ShiftRequest,
    responses((status = 200, description = "File après déplacement", body = ShiftResponse)),
    tag = "player"
)]
async fn shift(
    State(state): State<PlayerApiState>,
    Json(req): Json<ShiftRequest>,
) -> Json<ShiftResponse> {
    let moved = state.player.shift(req.old_index, req.new_index);
    Json(ShiftResponse {
        moved,
        queue: state.player.queue(),
    })
}

#[utoipa::path(
    delete,
    path = "/queue/{index}",
    params(("index" = usize, Path, description = "Position dans la file")),
    responses(
        (status = 200, description = "Track retirée"),
        (status = 400, description = "Index hors limites", body = ErrorResponse)
    ),
    tag = "player"
)]
async fn remove(
    State(state): State<PlayerApiState>,
    Path(index): Path<usize>,
) -> ApiResult<AudioTrack> {
    Ok(Json(state.player.remove(index).await?))
}

#[utoipa::path(
    post,
    path = "/preload",
    responses(
        (status = 204, description = "Tête de file préparée"),
        (status = 502, description = "Échec du backend", body = ErrorResponse)
    ),
    tag = "player"
)]
async fn preload(State(state): State<PlayerApiState>) -> Result<StatusCode, ApiError> {
    state.player.preload_next().await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    get,
    path = "/search",
    params(SearchQuery),
    responses((status = 200, description = "Résultats par backend")),
    tag = "player"
)]
async fn search(
    State(state): State<PlayerApiState>,
    Query(query): Query<SearchQuery>,
) -> Json<Vec<SearchResult>> {
    Json(state.player.registry().search_all(&query.q).await)
}

#[utoipa::path(
    post,
    path = "/volume",
    request_body = VolumeRequest,
    responses(
        (status = 200, description = "Volume appliqué", body = VolumeResponse),
        (status = 502, description = "Échec du mixer", body = ErrorResponse)
    ),
    tag = "player"
)]
async fn set_volume(
    State(state): State<PlayerApiState>,
    Json(req): Json<VolumeRequest>,
) -> ApiResult<VolumeResponse> {
    let volume = state.set_volume(req.volume).await?;
    Ok(Json(VolumeResponse { volume }))
}

/// Crée le router REST du lecteur
pub fn create_api_router(state: PlayerApiState) -> Router {
    Router::new()
        .route("/state", get(get_state))
        .route("/playpause", post(playpause))
        .route("/next", post(next))
        .route("/previous", post(previous))
        .route("/enqueue", post(enqueue))
        .route("/shift", post(shift))
        .route("/queue/{index}", delete(remove))
        .route("/preload", post(preload))
        .route("/search", get(search))
        .route("/volume", post(set_volume))
        .with_state(state)
}

#[derive(OpenApi)]
#[openapi(
    info(
        title = "JukeBox Player API",
        version = "1.0.0",
        description = "Contrôle de la file de lecture : transport, file, historique, \
                       recherche et volume. Les changements d'état sont aussi diffusés \
                       sur le WebSocket `/ws`."
    ),
    paths(
        get_state, playpause, next, previous, enqueue, shift, remove, preload, search, set_volume
    ),
    components(schemas(
        PlayerState,
        EnqueueRequest,
        ShiftRequest,
        ShiftResponse,
        VolumeRequest,
        VolumeResponse,
        ErrorResponse
    )),
    tags((name = "player", description = "Playback queue control"))
)]
pub struct PlayerApiDoc;
