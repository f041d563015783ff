mod common;

use std::sync::Arc;
use std::time::Duration;

use common::{FakeSource, FakeYoutubeAdapter, names, player};
use jbxqueue::{QueueError, TickOutcome};
use jbxsource::{AudioTrack, SourceError};
use rand::{Rng, SeedableRng, rngs::StdRng};
use tokio_test::{assert_err, assert_ok};

#[tokio::test]
async fn enqueue_next_previous_scenario() {
    let (player, _sink) = player();
    let a = FakeSource::new("a");
    let b = FakeSource::new("b");

    assert_ok!(player.enqueue(a.clone()).await);
    assert_eq!(player.current().unwrap().name, "a");
    assert!(player.queue().is_empty());

    assert_ok!(player.enqueue(b.clone()).await);
    assert_eq!(player.current().unwrap().name, "a");
    assert_eq!(names(player.queue()), vec!["b"]);

    assert_ok!(player.next().await);
    assert_eq!(names(player.history()), vec!["a"]);
    assert_eq!(player.current().unwrap().name, "b");
    assert!(player.queue().is_empty());

    assert_ok!(player.previous().await);
    assert!(player.history().is_empty());
    assert_eq!(player.current().unwrap().name, "a");
    assert_eq!(names(player.queue()), vec!["b"]);

    // start only ever runs on the now-playing source
    assert_eq!(a.starts(), 2);
    assert_eq!(b.starts(), 1);
    assert_eq!(b.stops(), 1);
}

#[tokio::test]
async fn enqueue_track_resolves_the_adapter() {
    let (player, _sink) = player();
    player
        .registry()
        .register(Arc::new(FakeYoutubeAdapter))
        .await;

    assert_ok!(
        player
            .enqueue_track(AudioTrack::youtube("abc", "Song", "Band"))
            .await
    );
    assert_eq!(player.current().unwrap().id, "abc");

    let spotify = AudioTrack::spotify("1", "spotify:track:1", "Other", "Band");
    match player.enqueue_track(spotify).await {
        Err(QueueError::AdapterNotFound(id)) => assert_eq!(id, "spotify"),
        other => panic!("unexpected result: {:?}", other),
    }
    assert_eq!(player.total(), 1);
}

#[tokio::test]
async fn adapters_reject_foreign_tracks() {
    let adapter = FakeYoutubeAdapter;
    let spotify = AudioTrack::spotify("1", "spotify:track:1", "Other", "Band");
    let err = jbxsource::SourceAdapter::create_audio_source(&adapter, spotify).unwrap_err();
    assert!(matches!(err, SourceError::SourceMismatch { .. }));
}

#[tokio::test]
async fn remove_twice_fails_without_mutation() {
    let (player, _sink) = player();
    for name in ["a", "b", "c"] {
        assert_ok!(player.enqueue(FakeSource::new(name)).await);
    }

    assert_eq!(assert_ok!(player.remove(1).await).name, "c");
    let before = names(player.queue());
    let err = assert_err!(player.remove(1).await);
    assert!(matches!(err, QueueError::OutOfRange { index: 1, len: 1 }));
    assert_eq!(names(player.queue()), before);
}

#[tokio::test]
async fn no_autoplay_when_something_is_queued_or_playing() {
    let (player, _sink) = player();
    let a = FakeSource::new("a");
    let b = FakeSource::new("b");
    assert_ok!(player.enqueue(a.clone()).await);
    assert_ok!(player.enqueue(b.clone()).await);

    assert_eq!(a.starts(), 1);
    assert_eq!(b.starts(), 0);
}

#[tokio::test(start_paused = true)]
async fn back_to_back_next_runs_once() {
    let (player, _sink) = player();
    let a = FakeSource::new("a");
    for source in [a.clone(), FakeSource::new("b"), FakeSource::new("c")] {
        assert_ok!(player.enqueue(source).await);
    }
    a.slow(Duration::from_millis(50));

    let (first, second) = tokio::join!(player.next(), player.next());
    assert_ok!(first);
    assert!(matches!(second, Err(QueueError::TransitionSkipped)));
    assert_eq!(player.current().unwrap().name, "b");
    assert_eq!(names(player.history()), vec!["a"]);
}

#[tokio::test(start_paused = true)]
async fn concurrent_ticks_advance_once() {
    let (player, _sink) = player();
    let a = FakeSource::new("a");
    assert_ok!(player.enqueue(a.clone()).await);
    assert_ok!(player.enqueue(FakeSource::new("b")).await);
    assert_ok!(player.enqueue(FakeSource::new("c")).await);

    a.finish();
    a.slow(Duration::from_millis(100));

    let (t1, t2) = tokio::join!(player.tick(), player.tick());
    let mut outcomes = [t1, t2];
    outcomes.sort_by_key(|o| *o == TickOutcome::Advanced);
    assert_eq!(outcomes, [TickOutcome::Skipped, TickOutcome::Advanced]);

    assert_eq!(player.current().unwrap().name, "b");
    assert_eq!(names(player.queue()), vec!["c"]);
    assert_eq!(a.stops(), 1);
}

#[tokio::test]
async fn random_operations_keep_ownership_invariants() {
    let (player, _sink) = player();
    let mut rng = StdRng::seed_from_u64(0x5eed);
    let mut enqueued = 0usize;
    let mut removed = 0usize;

    for step in 0..400 {
        match rng.random_range(0..6) {
            0 | 1 => {
                assert_ok!(player.enqueue(FakeSource::new(&format!("t{}", step))).await);
                enqueued += 1;
            }
            2 => assert_ok!(player.next().await),
            3 => assert_ok!(player.previous().await),
            4 => {
                let len = player.queue().len();
                let i = rng.random_range(0..len + 1);
                let j = rng.random_range(0..len + 1);
                assert_eq!(player.shift(i, j), i < len && j < len);
            }
            _ => {
                let len = player.queue().len();
                let index = rng.random_range(0..len + 1);
                match player.remove(index).await {
                    Ok(_) => removed += 1,
                    Err(QueueError::OutOfRange { .. }) => assert_eq!(index, len),
                    Err(e) => panic!("unexpected error: {}", e),
                }
            }
        }

        let handles = player.handles();
        assert_eq!(handles.len(), enqueued - removed);
        assert_eq!(player.total(), enqueued - removed);
        for (i, x) in handles.iter().enumerate() {
            for y in handles.iter().skip(i + 1) {
                assert!(!Arc::ptr_eq(x, y), "source held twice at step {}", step);
            }
        }
    }
}

#[tokio::test]
async fn shift_round_trip_restores_order() {
    let (player, _sink) = player();
    for name in ["a", "b", "c", "d", "e", "f"] {
        assert_ok!(player.enqueue(FakeSource::new(name)).await);
    }
    let before = names(player.queue());

    for (i, j) in [(0, 4), (4, 0), (1, 2), (3, 3)] {
        assert!(player.shift(i, j));
        assert!(player.shift(j, i));
        assert_eq!(names(player.queue()), before);
    }
    assert!(!player.shift(0, 5));
}
