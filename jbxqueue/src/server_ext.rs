//! Extension jbxserver pour le lecteur
//!
//! Permet à `jbxqueue` d'ajouter ses routes à `jbxserver::Server` sans que
//! `jbxserver` ne connaisse la file de lecture.

use async_trait::async_trait;
use axum::{Router, routing::get};
use tracing::info;
use utoipa::OpenApi;

use crate::api::{PlayerApiDoc, PlayerApiState, create_api_router};
use crate::ws::ws_handler;

/// Trait d'extension pour brancher le lecteur sur un serveur
///
/// # Routes créées
///
/// - API REST : `/api/player/*`
/// - WebSocket : `/ws`
/// - Swagger : `/swagger-ui/player`
///
/// # Examples
///
/// ```rust,ignore
/// use jbxqueue::PlayerExt;
///
/// let mut server = ServerBuilder::new_configured().build();
/// server.init_player_api(PlayerApiState::new(player, sink, mixer)).await;
/// ```
#[async_trait]
pub trait PlayerExt {
    async fn init_player_api(&mut self, state: PlayerApiState);
}

#[async_trait]
impl PlayerExt for jbxserver::Server {
    async fn init_player_api(&mut self, state: PlayerApiState) {
        state.sync_volume().await;

        let api_router = create_api_router(state.clone());
        self.add_openapi(api_router, PlayerApiDoc::openapi(), "player")
            .await;

        let ws_router = Router::new().route("/ws", get(ws_handler)).with_state(state);
        self.add_router("/", ws_router).await;

        info!("✅ Player API registered:");
        info!("   - REST API: /api/player/*");
        info!("   - WebSocket: /ws");
        info!("   - OpenAPI docs: /swagger-ui/player");
    }
}
