//! # JBXQueue
//!
//! Orchestrateur de la file de lecture du JukeBox.
//!
//! Le [`Player`] possède la file, l'historique et la source en cours de
//! lecture. Il garantit qu'une source n'occupe jamais deux emplacements à la
//! fois et qu'une seule transition s'exécute à un instant donné ; les
//! déclencheurs concurrents (commandes, poller) qui perdent la course sont
//! ignorés avec [`QueueError::TransitionSkipped`].
//!
//! - [`store`] : conteneurs queue / historique / lecture en cours
//! - [`player`] : opérations de transition
//! - [`poller`] : avance automatique en fin de piste
//! - [`events`] : événements diffusés aux observateurs
//!
//! ## Server Integration (feature `server`)
//!
//! ```rust,ignore
//! use jbxqueue::{BroadcastSink, Player, PlayerApiState, PlayerExt, spawn_poller};
//!
//! let sink = BroadcastSink::default();
//! let player = Arc::new(Player::new(registry, Arc::new(sink.clone())));
//! let poller = spawn_poller(player.clone(), DEFAULT_POLL_INTERVAL);
//!
//! server.init_player_api(PlayerApiState::new(player, sink, mixer)).await;
//! ```

pub mod error;
pub mod events;
pub mod player;
pub mod poller;
pub mod store;

#[cfg(feature = "server")]
pub mod api;
#[cfg(feature = "server")]
pub mod server_ext;
#[cfg(feature = "server")]
pub mod ws;

#[cfg(test)]
mod testing;

pub use error::{QueueError, Result};
pub use events::{BroadcastSink, DEFAULT_EVENT_CAPACITY, EventSink, PlayerEvent};
pub use player::{Player, TickOutcome, TransitionGuard};
pub use poller::{DEFAULT_POLL_INTERVAL, spawn_poller};
pub use store::QueueStore;

#[cfg(feature = "server")]
pub use api::{ApiError, PlayerApiState, PlayerState};
#[cfg(feature = "server")]
pub use server_ext::PlayerExt;
#[cfg(feature = "server")]
pub use ws::PlayerCommand;
