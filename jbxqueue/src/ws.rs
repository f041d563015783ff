//! WebSocket observers.
//!
//! À la connexion, le client reçoit l'état complet (`track`, `status`,
//! `queue`, `history`, `volume`, `authentications`), puis chaque événement
//! diffusé. Il pilote le lecteur en envoyant des commandes JSON :
//!
//! ```json
//! {"command": "enqueue", "track": {...}}
//! {"command": "shift", "old_index": 2, "new_index": 0}
//! {"command": "search", "query": "daft punk"}
//! ```
//!
//! Les commandes d'une connexion s'exécutent une à une, dans l'ordre
//! d'arrivée. Seule `search` reçoit une réponse dédiée
//! (`{"event": "search", ...}`), une commande en échec renvoie
//! `{"event": "error", ...}` ; les autres se constatent via les événements
//! diffusés.

use axum::{
    extract::{
        State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    response::IntoResponse,
};
use futures::{SinkExt, StreamExt};
use jbxsource::AudioTrack;
use serde::Deserialize;
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, info, warn};

use crate::api::PlayerApiState;
use crate::error::QueueError;

/// Inbound command sent by an observer
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum PlayerCommand {
    Playpause,
    Enqueue { track: AudioTrack },
    Shift { old_index: usize, new_index: usize },
    Next,
    Previous,
    Remove { index: usize },
    Search { query: String },
    Volume { volume: i64 },
    Preload,
}

impl PlayerApiState {
    /// Runs one command; returns the frame to send back to the caller only.
    pub async fn execute(&self, command: PlayerCommand) -> Option<String> {
        debug!(?command, "Player command received");
        let player = self.player();

        let result = match command {
            PlayerCommand::Playpause => player.playpause().await.map(|_| ()),
            PlayerCommand::Enqueue { track } => player.enqueue_track(track).await,
            PlayerCommand::Shift {
                old_index,
                new_index,
            } => {
                player.shift(old_index, new_index);
                Ok(())
            }
            PlayerCommand::Next => player.next().await,
            PlayerCommand::Previous => player.previous().await,
            PlayerCommand::Remove { index } => player.remove(index).await.map(|_| ()),
            PlayerCommand::Preload => player.preload_next().await,
            PlayerCommand::Search { query } => {
                let results = player.registry().search_all(&query).await;
                return Some(
                    serde_json::json!({ "event": "search", "payload": results }).to_string(),
                );
            }
            PlayerCommand::Volume { volume } => {
                return match self.set_volume(volume).await {
                    Ok(_) => None,
                    Err(e) => {
                        warn!(error = e.message(), "Volume command failed");
                        Some(
                            serde_json::json!({ "event": "error", "payload": e.message() })
                                .to_string(),
                        )
                    }
                };
            }
        };

        match result {
            Ok(()) => None,
            Err(QueueError::TransitionSkipped) => {
                debug!("Command skipped, a transition is in progress");
                None
            }
            Err(e) => {
                warn!(error = %e, "Player command failed");
                Some(serde_json::json!({ "event": "error", "payload": e.to_string() }).to_string())
            }
        }
    }
}

/// Runs one connection's commands in arrival order.
///
/// Replies go to `replies`; the loop ends when the command channel closes.
async fn run_commands(
    state: PlayerApiState,
    mut commands: mpsc::UnboundedReceiver<PlayerCommand>,
    replies: mpsc::UnboundedSender<String>,
) {
    while let Some(command) = commands.recv().await {
        if let Some(reply) = state.execute(command).await {
            if replies.send(reply).is_err() {
                break;
            }
        }
    }
}

/// Handler `GET /ws`
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<PlayerApiState>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: PlayerApiState) {
    info!("WebSocket observer connected");
    let (mut sender, mut receiver) = socket.split();
    let mut events = state.events().subscribe();

    for event in state.snapshot_events().await {
        if sender
            .send(Message::Text(event.to_message().into()))
            .await
            .is_err()
        {
            return;
        }
    }

    let (reply_tx, mut reply_rx) = mpsc::unbounded_channel::<String>();

    let mut send_task = tokio::spawn(async move {
        loop {
            let frame = tokio::select! {
                event = events.recv() => match event {
                    Ok(event) => event.to_message(),
                    Err(broadcast::error::RecvError::Lagged(missed)) => {
                        debug!(missed, "WebSocket observer lagging, events dropped");
                        continue;
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                },
                reply = reply_rx.recv() => match reply {
                    Some(reply) => reply,
                    None => break,
                },
            };

            if sender.send(Message::Text(frame.into())).await.is_err() {
                break;
            }
        }
    });

    let (command_tx, command_rx) = mpsc::unbounded_channel::<PlayerCommand>();
    // termine quand `command_tx` disparaît avec la boucle de réception
    tokio::spawn(run_commands(state, command_rx, reply_tx));

    let mut recv_task = tokio::spawn(async move {
        while let Some(Ok(message)) = receiver.next().await {
            match message {
                Message::Text(text) => {
                    match serde_json::from_str::<PlayerCommand>(text.as_str()) {
                        Ok(command) => {
                            if command_tx.send(command).is_err() {
                                break;
                            }
                        }
                        Err(e) => warn!(error = %e, "Ignoring malformed command"),
                    }
                }
                Message::Close(_) => break,
                _ => {}
            }
        }
    });

    tokio::select! {
        _ = &mut send_task => recv_task.abort(),
        _ = &mut recv_task => send_task.abort(),
    }
    info!("WebSocket observer disconnected");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::{BroadcastSink, PlayerEvent};
    use crate::player::Player;
    use crate::testing::{FakeAdapter, FakeSource};
    use jbxsource::AdapterRegistry;
    use jbxutils::Mixer;
    use std::sync::Arc;

    fn state_with_mixer(mixer: Mixer) -> PlayerApiState {
        let sink = BroadcastSink::default();
        let player = Arc::new(Player::new(AdapterRegistry::new(), Arc::new(sink.clone())));
        PlayerApiState::new(player, sink, mixer)
    }

    fn state() -> PlayerApiState {
        state_with_mixer(Mixer::new("PCM,0", false))
    }

    fn enqueue(name: &str) -> PlayerCommand {
        PlayerCommand::Enqueue {
            track: AudioTrack::youtube(name, name, "tester"),
        }
    }

    fn names(state: &PlayerApiState) -> Vec<String> {
        state
            .player()
            .current()
            .into_iter()
            .chain(state.player().queue())
            .map(|t| t.name)
            .collect()
    }

    #[test]
    fn test_parse_commands() {
        let cmd: PlayerCommand = serde_json::from_str(r#"{"command":"playpause"}"#).unwrap();
        assert!(matches!(cmd, PlayerCommand::Playpause));

        let cmd: PlayerCommand =
            serde_json::from_str(r#"{"command":"shift","old_index":2,"new_index":0}"#).unwrap();
        assert!(matches!(
            cmd,
            PlayerCommand::Shift {
                old_index: 2,
                new_index: 0
            }
        ));

        let cmd: PlayerCommand = serde_json::from_value(serde_json::json!({
            "command": "enqueue",
            "track": {
                "source": "youtube",
                "id": "abc",
                "name": "n",
                "artist": "a",
                "data": { "slug": "abc" }
            }
        }))
        .unwrap();
        match cmd {
            PlayerCommand::Enqueue { track } => assert_eq!(track.id, "abc"),
            other => panic!("unexpected command: {:?}", other),
        }

        assert!(serde_json::from_str::<PlayerCommand>(r#"{"command":"dance"}"#).is_err());
    }

    #[tokio::test]
    async fn test_search_replies_to_caller() {
        let reply = state()
            .execute(PlayerCommand::Search {
                query: "anything".into(),
            })
            .await
            .unwrap();
        let json: serde_json::Value = serde_json::from_str(&reply).unwrap();
        assert_eq!(json["event"], "search");
        assert_eq!(json["payload"], serde_json::json!([]));
    }

    #[tokio::test]
    async fn test_failed_command_replies_with_error() {
        let state = state();
        let reply = state
            .execute(PlayerCommand::Remove { index: 4 })
            .await
            .unwrap();
        let json: serde_json::Value = serde_json::from_str(&reply).unwrap();
        assert_eq!(json["event"], "error");
    }

    #[tokio::test]
    async fn test_commands_drive_the_player() {
        let state = state();
        let mut rx = state.events().subscribe();
        state.player().enqueue(FakeSource::shared("a")).await.unwrap();
        state.player().enqueue(FakeSource::shared("b")).await.unwrap();

        assert!(state.execute(PlayerCommand::Next).await.is_none());
        assert_eq!(state.player().current().unwrap().name, "b");

        assert!(state.execute(PlayerCommand::Volume { volume: 30 }).await.is_none());
        let mut saw_volume = false;
        while let Ok(event) = rx.try_recv() {
            saw_volume |= event == PlayerEvent::Volume(30);
        }
        assert!(saw_volume);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 8)]
    async fn test_commands_run_in_arrival_order() {
        let state = state();
        state.player().registry().register(Arc::new(FakeAdapter)).await;

        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let (reply_tx, mut reply_rx) = mpsc::unbounded_channel();
        let worker = tokio::spawn(run_commands(state.clone(), command_rx, reply_tx));

        let expected: Vec<String> = (0..20).map(|i| format!("{:02}", i)).collect();
        for name in &expected {
            command_tx.send(enqueue(name)).unwrap();
        }
        drop(command_tx);
        worker.await.unwrap();

        assert_eq!(names(&state), expected);
        assert!(reply_rx.try_recv().is_err());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 8)]
    async fn test_remove_follows_the_enqueue_before_it() {
        let state = state();
        state.player().registry().register(Arc::new(FakeAdapter)).await;

        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let (reply_tx, mut reply_rx) = mpsc::unbounded_channel();
        let worker = tokio::spawn(run_commands(state.clone(), command_rx, reply_tx));

        for name in ["a", "b", "c"] {
            command_tx.send(enqueue(name)).unwrap();
        }
        command_tx.send(PlayerCommand::Remove { index: 0 }).unwrap();
        command_tx.send(enqueue("d")).unwrap();
        command_tx
            .send(PlayerCommand::Shift {
                old_index: 1,
                new_index: 0,
            })
            .unwrap();
        drop(command_tx);
        worker.await.unwrap();

        assert_eq!(names(&state), vec!["a", "d", "c"]);
        assert!(reply_rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_volume_failure_replies_with_error() {
        let state = state_with_mixer(Mixer::new("JukeBoxMissingControl,0", true));
        let mut rx = state.events().subscribe();

        let reply = state
            .execute(PlayerCommand::Volume { volume: 30 })
            .await
            .unwrap();
        let json: serde_json::Value = serde_json::from_str(&reply).unwrap();
        assert_eq!(json["event"], "error");
        assert!(!json["payload"].as_str().unwrap().is_empty());

        while let Ok(event) = rx.try_recv() {
            assert!(!matches!(event, PlayerEvent::Volume(_)));
        }
    }
}
