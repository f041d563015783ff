use std::sync::Arc;
use std::time::Duration;

use jbxconfig::get_config;
use jbxqueue::{BroadcastSink, Player, PlayerApiState, PlayerExt, spawn_poller};
use jbxserver::ServerBuilder;
use jbxsource::{AdapterRegistry, SourceAdapter};
use jbxspotify::{SpotifyAdapter, auth_router};
use jbxutils::Mixer;
use jbxyoutube::YoutubeAdapter;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = get_config();

    let mut server = ServerBuilder::new_configured().build();
    server.init_logging().await;

    server
        .add_route("/api/v1/ping", || async { "Pong!" })
        .await;

    // ========== Sources ==========

    info!("🎵 Registering playback backends...");
    let registry = AdapterRegistry::new();

    match YoutubeAdapter::from_config() {
        Ok(youtube) => registry.register(Arc::new(youtube)).await,
        Err(e) => warn!("⚠️ Failed to register YouTube: {}", e),
    }

    let spotify = match SpotifyAdapter::from_config() {
        Ok(spotify) => {
            let auth = spotify.auth();
            registry.register(Arc::new(spotify)).await;
            Some(auth)
        }
        Err(e) => {
            warn!("⚠️ Spotify disabled: {}", e);
            None
        }
    };

    let adapters = registry.list().await;
    info!("✅ {} backend(s) registered", adapters.len());
    for adapter in adapters {
        info!("  - {} ({})", adapter.display_name(), adapter.id());
    }

    // ========== Lecteur ==========

    let events = BroadcastSink::default();
    let autoplay = config.get_player_autoplay()?;
    let player = Arc::new(Player::new(registry, Arc::new(events.clone())).with_autoplay(autoplay));

    let period = Duration::from_millis(config.get_player_poll_interval_ms()? as u64);
    info!("⏱️ Polling playback status every {:?}", period);
    let poller = spawn_poller(player.clone(), period);

    let mixer = Mixer::new(config.get_mixer_control()?, config.get_mixer_enabled()?);
    let api_state = PlayerApiState::new(player.clone(), events, mixer);

    info!("📡 Registering player API...");
    server.init_player_api(api_state.clone()).await;

    if let Some(auth) = spotify {
        let state = api_state.clone();
        let notify = Arc::new(move || {
            let state = state.clone();
            tokio::spawn(async move { state.broadcast_authentications().await });
        }) as jbxspotify::AuthNotifier;
        server
            .add_router("/api/v1/spotify", auth_router(auth, notify))
            .await;
        info!("✅ Spotify authorization at /api/v1/spotify/login");
    }

    // ========== Démarrage ==========

    info!("🌐 Starting HTTP server...");
    server.start().await?;

    info!("✅ JukeBox is ready!");
    info!("Press Ctrl+C to stop...");
    server.wait().await;

    poller.abort();
    if let Err(e) = player.shutdown().await {
        warn!("⚠️ Failed to stop the current track: {}", e);
    }
    info!("👋 JukeBox stopped");

    Ok(())
}
