//! Periodic status poller.
//!
//! Each period spawns an independent [`Player::tick`]. A tick that finds the
//! transition token taken is dropped, so ticks never pile up behind a slow
//! backend.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};
use tracing::{debug, info};

use crate::player::{Player, TickOutcome};

/// Default polling period
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Starts polling `player` every `period`.
///
/// The returned handle runs until aborted.
pub fn spawn_poller(player: Arc<Player>, period: Duration) -> JoinHandle<()> {
    info!(period_ms = period.as_millis() as u64, "Starting status poller");

    tokio::spawn(async move {
        let mut interval = time::interval(period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            interval.tick().await;
            let player = player.clone();
            tokio::spawn(async move {
                let outcome = player.tick().await;
                if outcome == TickOutcome::Advanced {
                    debug!("Poller advanced the queue");
                }
            });
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::BroadcastSink;
    use crate::testing::FakeSource;
    use jbxsource::AdapterRegistry;

    #[tokio::test(start_paused = true)]
    async fn test_poller_advances_finished_track_once() {
        let player = Arc::new(Player::new(
            AdapterRegistry::new(),
            Arc::new(BroadcastSink::default()),
        ));
        let a = FakeSource::new("a");
        let b = FakeSource::new("b");
        player.enqueue(a.clone()).await.unwrap();
        player.enqueue(b.clone()).await.unwrap();
        player.enqueue(FakeSource::shared("c")).await.unwrap();

        // Stopping "a" outlasts several ticks
        a.slow(Duration::from_millis(600));
        a.finish();

        let handle = spawn_poller(player.clone(), DEFAULT_POLL_INTERVAL);
        time::sleep(Duration::from_secs(3)).await;
        handle.abort();

        assert_eq!(a.count("stop"), 1);
        assert_eq!(player.current().unwrap().name, "b");
        assert_eq!(player.history().len(), 1);
        assert_eq!(player.queue().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_poller_is_idle_without_now_playing() {
        let sink = Arc::new(BroadcastSink::default());
        let player = Arc::new(Player::new(AdapterRegistry::new(), sink).with_autoplay(false));
        let a = FakeSource::new("a");
        player.enqueue(a.clone()).await.unwrap();

        let handle = spawn_poller(player.clone(), DEFAULT_POLL_INTERVAL);
        time::sleep(Duration::from_secs(1)).await;
        handle.abort();

        assert_eq!(a.count("status"), 0);
        assert!(player.current().is_none());
    }
}
