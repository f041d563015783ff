//! Events published to observers after every observable change.
//!
//! Chaque événement a un nom et une seule forme de payload :
//!
//! | event | payload |
//! |---|---|
//! | `track` | `AudioTrack \| null` |
//! | `status` | `AudioStatus \| null` |
//! | `queue` | `AudioTrack[]` |
//! | `history` | `AudioTrack[]` |
//! | `loading` | `null` |
//! | `volume` | `number` (0-100) |
//! | `authentications` | `{ backendId: bool }` |
//!
//! Les observateurs reçoivent `{"event": "<name>", "payload": <payload>}`.

use std::collections::BTreeMap;

use jbxsource::{AudioStatus, AudioTrack};
use serde::ser::{Serialize, SerializeStruct, Serializer};
use serde_json::Value;
use tokio::sync::broadcast;
use tracing::trace;

/// Default capacity of the broadcast channel
pub const DEFAULT_EVENT_CAPACITY: usize = 256;

#[derive(Debug, Clone, PartialEq)]
pub enum PlayerEvent {
    Track(Option<AudioTrack>),
    Status(Option<AudioStatus>),
    Queue(Vec<AudioTrack>),
    History(Vec<AudioTrack>),
    /// Emitted before a transition's backend calls
    Loading,
    Volume(u8),
    Authentications(BTreeMap<String, bool>),
}

impl PlayerEvent {
    pub fn name(&self) -> &'static str {
        match self {
            PlayerEvent::Track(_) => "track",
            PlayerEvent::Status(_) => "status",
            PlayerEvent::Queue(_) => "queue",
            PlayerEvent::History(_) => "history",
            PlayerEvent::Loading => "loading",
            PlayerEvent::Volume(_) => "volume",
            PlayerEvent::Authentications(_) => "authentications",
        }
    }

    pub fn payload(&self) -> Value {
        let value = match self {
            PlayerEvent::Track(track) => serde_json::to_value(track),
            PlayerEvent::Status(status) => serde_json::to_value(status),
            PlayerEvent::Queue(tracks) | PlayerEvent::History(tracks) => {
                serde_json::to_value(tracks)
            }
            PlayerEvent::Loading => Ok(Value::Null),
            PlayerEvent::Volume(volume) => Ok(Value::from(*volume)),
            PlayerEvent::Authentications(auths) => serde_json::to_value(auths),
        };
        value.unwrap_or(Value::Null)
    }

    /// Text frame sent to WebSocket observers
    pub fn to_message(&self) -> String {
        serde_json::json!({ "event": self.name(), "payload": self.payload() }).to_string()
    }
}

impl Serialize for PlayerEvent {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut s = serializer.serialize_struct("PlayerEvent", 2)?;
        s.serialize_field("event", self.name())?;
        s.serialize_field("payload", &self.payload())?;
        s.end()
    }
}

/// Fire-and-forget fan-out of player events.
///
/// `emit` is called from inside guarded transitions and must never block.
pub trait EventSink: Send + Sync {
    fn emit(&self, event: PlayerEvent);
}

/// [`EventSink`] backed by a `tokio::sync::broadcast` channel.
///
/// Les récepteurs trop lents perdent des événements (`Lagged`), sans
/// acquittement.
#[derive(Clone)]
pub struct BroadcastSink {
    tx: broadcast::Sender<PlayerEvent>,
}

impl BroadcastSink {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<PlayerEvent> {
        self.tx.subscribe()
    }

    pub fn receiver_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for BroadcastSink {
    fn default() -> Self {
        Self::new(DEFAULT_EVENT_CAPACITY)
    }
}

impl EventSink for BroadcastSink {
    fn emit(&self, event: PlayerEvent) {
        trace!(event = event.name(), "Broadcasting player event");
        // No subscriber is not an error
        let _ = self.tx.send(event);
    }
}
