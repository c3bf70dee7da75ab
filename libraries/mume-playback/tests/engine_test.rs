//! Playback engine scenarios against a scripted backend


use mume_core::{AudioStatus, RepeatMode};
use mume_playback::{
    EngineConfig, EngineHandle, PlaybackEngine, PlaybackError, QueueStore, SlotState,
};
use std::sync::Arc;
use test_helpers::{
    create_test_track, init_tracing, settle, uri_for, wait_until, within, Call, MockBackend,
};
use tokio::task::JoinHandle;

fn unthrottled() -> EngineConfig {
    EngineConfig {
        position_throttle_ms: 0,
    }
}

fn start(store: &QueueStore, backend: &MockBackend) -> (EngineHandle, JoinHandle<()>) {
    PlaybackEngine::spawn(store.clone(), Arc::new(backend.clone()), unthrottled())
}

fn two_track_store() -> QueueStore {
    let store = QueueStore::in_memory().with_rng_seed(3);
    store.set_queue(vec![create_test_track("a", 200), create_test_track("b", 180)]);
    store
}

async fn wait_ready(engine: &EngineHandle, id: &str) {
    wait_until(&format!("{id} ready"), || {
        matches!(engine.slot_state(), SlotState::Ready { ref track_id, .. } if track_id == id)
    })
    .await;
}

fn approx(a: f64, b: f64) -> bool {
    (a - b).abs() < 1e-6
}

#[tokio::test]
async fn first_track_loads_paused_then_plays_on_intent() {
    init_tracing();
    let store = two_track_store();
    let backend = MockBackend::new();
    let (engine, _task) = start(&store, &backend);

    wait_until("a loaded", || backend.live_uris() == [uri_for("a")]).await;
    assert!(!backend.is_playing(&uri_for("a")));

    engine.play();
    wait_until("a playing", || backend.is_playing(&uri_for("a"))).await;

    engine.toggle();
    wait_until("a paused", || !backend.is_playing(&uri_for("a"))).await;
    assert!(!store.transport().is_playing);
}

#[tokio::test]
async fn duration_is_read_after_load() {
    init_tracing();
    let store = two_track_store();
    let backend = MockBackend::new();
    backend.set_duration(&uri_for("a"), 200_000);
    let (engine, _task) = start(&store, &backend);

    wait_ready(&engine, "a").await;
    assert!(approx(store.transport().duration, 200.0));
}

#[tokio::test]
async fn rapid_switch_discards_stale_load() {
    init_tracing();
    let store = two_track_store();
    let backend = MockBackend::new();
    backend.gate(&uri_for("a"));
    let (engine, _task) = start(&store, &backend);

    let mut slot = engine.watch_slot();
    within(slot.wait_for(|s| matches!(s, SlotState::Loading { track_id, .. } if track_id == "a")))
        .await
        .unwrap();

    engine.play();
    store.go_to_index(1);
    wait_until("b playing", || backend.is_playing(&uri_for("b"))).await;

    // A's load finishes late
    backend.release(&uri_for("a"));
    wait_until("stale a unloaded", || {
        backend
            .handles_for(&uri_for("a"))
            .iter()
            .any(|h| h.unloaded)
    })
    .await;

    let stale = &backend.handles_for(&uri_for("a"))[0];
    assert_eq!(stale.calls, [Call::Load, Call::Unload]);
    assert_eq!(backend.live_uris(), [uri_for("b")]);
    assert!(backend.is_playing(&uri_for("b")));
}

#[tokio::test]
async fn switching_tracks_keeps_one_live_handle() {
    init_tracing();
    let store = QueueStore::in_memory();
    store.set_queue((0..5).map(|i| create_test_track(&i.to_string(), 100)).collect());
    let backend = MockBackend::new();
    let (engine, _task) = start(&store, &backend);
    engine.play();

    for index in [1, 3, 0, 4, 2] {
        store.go_to_index(index);
    }

    wait_until("last selection playing", || backend.is_playing(&uri_for("2"))).await;
    settle().await;
    assert_eq!(backend.live_uris(), [uri_for("2")]);
}

#[tokio::test]
async fn stale_status_ticks_are_ignored() {
    init_tracing();
    let store = two_track_store();
    let backend = MockBackend::new();
    let (engine, _task) = start(&store, &backend);

    wait_ready(&engine, "a").await;
    store.go_to_index(1);
    wait_ready(&engine, "b").await;

    backend.emit(0, AudioStatus::loaded(50_000, Some(999_000)));
    backend.emit(1, AudioStatus::loaded(1_000, None));

    wait_until("b position", || approx(store.transport().position, 1.0)).await;
    assert!(!approx(store.transport().duration, 999.0));
}

#[tokio::test]
async fn position_and_duration_follow_ticks() {
    init_tracing();
    let store = two_track_store();
    let backend = MockBackend::new();
    let (engine, _task) = start(&store, &backend);
    wait_ready(&engine, "a").await;

    backend.emit_latest(AudioStatus::loaded(12_500, Some(200_000)));
    wait_until("tick applied", || approx(store.transport().position, 12.5)).await;
    assert!(approx(store.transport().duration, 200.0));
}

#[tokio::test]
async fn position_writes_are_throttled() {
    init_tracing();
    let store = two_track_store();
    let backend = MockBackend::new();
    let (engine, _task) = PlaybackEngine::spawn(
        store.clone(),
        Arc::new(backend.clone()),
        EngineConfig {
            position_throttle_ms: 60_000,
        },
    );
    wait_ready(&engine, "a").await;

    backend.emit_latest(AudioStatus::loaded(1_000, Some(200_000)));
    wait_until("first tick", || approx(store.transport().position, 1.0)).await;

    backend.emit_latest(AudioStatus::loaded(2_000, Some(201_000)));
    wait_until("duration updated", || approx(store.transport().duration, 201.0)).await;
    assert!(approx(store.transport().position, 1.0));
}

#[tokio::test]
async fn finish_advances_then_stops_at_end() {
    init_tracing();
    let store = two_track_store();
    let backend = MockBackend::new();
    let (engine, _task) = start(&store, &backend);
    engine.play();
    wait_until("a playing", || backend.is_playing(&uri_for("a"))).await;

    backend.emit_latest(AudioStatus::finished(200_000));
    wait_until("b playing", || backend.is_playing(&uri_for("b"))).await;
    assert_eq!(store.current_index(), 1);
    assert_eq!(backend.live_uris(), [uri_for("b")]);

    backend.emit_latest(AudioStatus::finished(180_000));
    wait_until("stopped", || !store.transport().is_playing).await;
    wait_until("b paused", || !backend.is_playing(&uri_for("b"))).await;
    assert_eq!(store.current_index(), 1);
    assert!(approx(store.transport().position, 180.0));
}

#[tokio::test]
async fn repeat_all_wraps_to_first_track() {
    init_tracing();
    let store = two_track_store();
    store.go_to_index(1);
    store.set_repeat_mode(RepeatMode::All);
    let backend = MockBackend::new();
    let (engine, _task) = start(&store, &backend);
    engine.play();
    wait_until("b playing", || backend.is_playing(&uri_for("b"))).await;

    backend.emit_latest(AudioStatus::finished(180_000));
    wait_until("a playing", || backend.is_playing(&uri_for("a"))).await;
    assert_eq!(store.current_index(), 0);
    assert!(store.transport().is_playing);
}

#[tokio::test]
async fn repeat_one_restarts_same_handle() {
    init_tracing();
    let store = two_track_store();
    store.set_repeat_mode(RepeatMode::One);
    let backend = MockBackend::new();
    let (engine, _task) = start(&store, &backend);
    engine.play();
    wait_until("a playing", || backend.is_playing(&uri_for("a"))).await;

    backend.emit_latest(AudioStatus::finished(200_000));
    wait_until("restarted", || {
        backend.handles()[0].calls.ends_with(&[Call::Seek(0), Call::Play])
    })
    .await;

    assert_eq!(backend.load_count(), 1);
    assert_eq!(store.current_index(), 0);
    assert!(store.transport().is_playing);
    assert!(approx(store.transport().position, 0.0));
}

#[tokio::test]
async fn load_failure_pauses_and_retries_on_play() {
    init_tracing();
    let store = two_track_store();
    let backend = MockBackend::new();
    backend.fail_loads_of(&uri_for("a"));
    let (engine, _task) = start(&store, &backend);

    wait_until("load failed", || backend.failed_loads() == 1).await;
    wait_until("idle", || engine.slot_state() == SlotState::Idle).await;
    assert!(!store.transport().is_playing);
    assert_eq!(store.len(), 2);

    backend.heal(&uri_for("a"));
    engine.play();
    wait_until("a playing after retry", || backend.is_playing(&uri_for("a"))).await;
}

#[tokio::test]
async fn play_failure_falls_back_to_paused() {
    init_tracing();
    let store = two_track_store();
    let backend = MockBackend::new();
    backend.fail_play(true);
    let (engine, _task) = start(&store, &backend);
    wait_until("a loaded", || backend.load_count() == 1).await;

    engine.play();
    wait_until("paused again", || !store.transport().is_playing).await;
    assert!(!backend.is_playing(&uri_for("a")));
}

#[tokio::test]
async fn emptied_queue_unloads_and_resets() {
    init_tracing();
    let store = QueueStore::in_memory();
    store.set_queue(vec![create_test_track("a", 200)]);
    let backend = MockBackend::new();
    let (engine, _task) = start(&store, &backend);
    engine.play();
    wait_until("a playing", || backend.is_playing(&uri_for("a"))).await;
    backend.emit_latest(AudioStatus::loaded(30_000, Some(200_000)));
    wait_until("position", || approx(store.transport().position, 30.0)).await;

    store.remove_from_queue(0);
    wait_until("a unloaded", || backend.live().is_empty()).await;
    wait_until("transport reset", || !store.transport().is_playing).await;
    assert!(approx(store.transport().position, 0.0));
    assert!(approx(store.transport().duration, 0.0));
    assert_eq!(engine.slot_state(), SlotState::Idle);
}

#[tokio::test]
async fn seek_updates_store_before_backend() {
    init_tracing();
    let store = two_track_store();
    let backend = MockBackend::new();
    let (engine, _task) = start(&store, &backend);
    wait_ready(&engine, "a").await;

    engine.seek_to(42.5).unwrap();
    assert!(approx(store.transport().position, 42.5));

    wait_until("backend seeked", || {
        backend.handles()[0].calls.contains(&Call::Seek(42_500))
    })
    .await;
}

#[tokio::test]
async fn failed_seek_keeps_commanded_position() {
    init_tracing();
    let store = two_track_store();
    let backend = MockBackend::new();
    let (engine, _task) = start(&store, &backend);
    wait_ready(&engine, "a").await;
    backend.fail_seek(true);

    engine.seek_to(42.5).unwrap();
    settle().await;

    assert!(approx(store.transport().position, 42.5));
    assert!(!backend.handles()[0]
        .calls
        .iter()
        .any(|call| matches!(call, Call::Seek(_))));
    assert!(engine.is_running());
    assert!(matches!(engine.slot_state(), SlotState::Ready { .. }));
}

#[tokio::test]
async fn failed_unload_does_not_block_next_load() {
    init_tracing();
    let store = two_track_store();
    let backend = MockBackend::new();
    backend.fail_unload(true);
    let (engine, _task) = start(&store, &backend);
    engine.play();
    wait_until("a playing", || backend.is_playing(&uri_for("a"))).await;

    engine.next();
    wait_ready(&engine, "b").await;
    wait_until("b playing", || backend.is_playing(&uri_for("b"))).await;

    assert_eq!(backend.load_count(), 2);
    assert!(backend.handles_for(&uri_for("a"))[0]
        .calls
        .contains(&Call::Unload));
    assert!(store.transport().is_playing);
}

#[tokio::test]
async fn track_without_source_resets_instead_of_loading() {
    init_tracing();
    let store = QueueStore::in_memory();
    store.set_queue(vec![
        create_test_track("a", 200),
        mume_core::Track::new("x", "X", ""),
    ]);
    let backend = MockBackend::new();
    let (engine, _task) = start(&store, &backend);
    engine.play();
    wait_until("a playing", || backend.is_playing(&uri_for("a"))).await;
    backend.emit_latest(AudioStatus::loaded(30_000, Some(200_000)));
    wait_until("position", || approx(store.transport().position, 30.0)).await;

    engine.next();
    wait_until("a unloaded", || backend.live().is_empty()).await;
    wait_until("transport reset", || !store.transport().is_playing).await;
    settle().await;

    assert_eq!(backend.load_count(), 1);
    assert_eq!(store.current_index(), 1);
    assert!(approx(store.transport().position, 0.0));
    assert!(approx(store.transport().duration, 0.0));
    assert_eq!(engine.slot_state(), SlotState::Idle);
}

#[tokio::test]
async fn prev_restarts_when_past_threshold() {
    init_tracing();
    let store = two_track_store();
    store.go_to_index(1);
    let backend = MockBackend::new();
    let (engine, _task) = start(&store, &backend);
    wait_ready(&engine, "b").await;

    store.set_position(10.0);
    engine.prev().unwrap();

    assert_eq!(store.current_index(), 1);
    assert!(approx(store.transport().position, 0.0));
    wait_until("restarted", || backend.handles()[0].calls.contains(&Call::Seek(0))).await;
    assert_eq!(backend.load_count(), 1);
}

#[tokio::test]
async fn prev_moves_back_near_start() {
    init_tracing();
    let store = two_track_store();
    store.go_to_index(1);
    let backend = MockBackend::new();
    let (engine, _task) = start(&store, &backend);

    store.set_position(2.0);
    engine.prev().unwrap();
    assert_eq!(store.current_index(), 0);
    wait_until("a loaded", || backend.live_uris() == [uri_for("a")]).await;
}

#[tokio::test]
async fn next_at_end_without_repeat_stays() {
    init_tracing();
    let store = two_track_store();
    store.go_to_index(1);
    store.set_position(50.0);
    let backend = MockBackend::new();
    let (engine, _task) = start(&store, &backend);

    engine.next();
    assert_eq!(store.current_index(), 1);

    store.set_repeat_mode(RepeatMode::All);
    engine.next();
    assert_eq!(store.current_index(), 0);
}

#[tokio::test]
async fn downloaded_file_replaces_stream_for_current_track() {
    init_tracing();
    let store = two_track_store();
    let backend = MockBackend::new();
    let (_engine, _task) = start(&store, &backend);
    wait_until("stream loaded", || backend.live_uris() == [uri_for("a")]).await;

    store.set_item_local_uri("a", "/music/a.mp4");
    wait_until("file loaded", || backend.live_uris() == ["/music/a.mp4"]).await;
    assert!(backend.handles_for(&uri_for("a"))[0].unloaded);
}

#[tokio::test]
async fn shutdown_unloads_and_stops() {
    init_tracing();
    let store = two_track_store();
    let backend = MockBackend::new();
    let (engine, task) = start(&store, &backend);
    engine.play();
    wait_until("a playing", || backend.is_playing(&uri_for("a"))).await;

    within(engine.shutdown()).await.unwrap();
    within(task).await.unwrap();

    assert!(backend.live().is_empty());
    assert!(!engine.is_running());
    assert!(matches!(engine.seek_to(1.0), Err(PlaybackError::EngineStopped)));
}

#[tokio::test]
async fn dropping_every_handle_stops_engine() {
    init_tracing();
    let store = two_track_store();
    let backend = MockBackend::new();
    let (engine, task) = start(&store, &backend);
    wait_until("a loaded", || backend.load_count() == 1).await;

    drop(engine);
    within(task).await.unwrap();
    assert!(backend.live().is_empty());
}
