//! S5 — stream enqueue then shutdown: a full queue blocks the caller
//! instead of failing fast, resolving only once a slot frees (the worker
//! drains an item) or `stop` wins the race, and once `stop` is already set
//! no further enqueue blocks at all.

use tokio_util::sync::CancellationToken;

use vith::config::AppConfig;
use vith::model::{ItemType, Request, Source};
use vith::worker::{StreamWorker, WorkerState};
use vith::{AppState, VithError};

fn video_request(n: usize) -> Request {
    Request {
        input: format!("in{n}.mp4"),
        output: format!("v{n}/out.m3u8"),
        item_type: ItemType::Video,
        scale: 150,
    }
}

async fn local_state(tmp: &std::path::Path) -> AppState {
    let mut config = AppConfig::default();
    config.store.local_root = tmp.to_string_lossy().to_string();
    config.server.tmp_folder = tmp.join("tmp").to_string_lossy().to_string();
    // A path that cannot resolve to a real binary: every queued request
    // fails fast inside the tool stage without needing a real ffmpeg,
    // which still exercises full enqueue -> drain -> Done.
    config.tools.ffmpeg_path = "vith-test-nonexistent-ffmpeg".to_string();
    AppState::new(config).unwrap()
}

#[tokio::test(flavor = "current_thread")]
async fn fifth_enqueue_blocks_then_succeeds_once_the_worker_drains_a_slot() {
    let dir = tempfile::tempdir().unwrap();
    let state = local_state(dir.path()).await;
    let cancel = CancellationToken::new();
    // The worker task is spawned but cannot run until this test yields to
    // the executor; on a current-thread runtime no `.await` has happened
    // yet, so the queue is still exactly as empty as `mpsc::channel(4)`
    // left it.
    let worker = StreamWorker::spawn(state, cancel.clone());

    for n in 0..4 {
        worker.enqueue(Source::Http, video_request(n)).await.expect("capacity not yet exhausted");
    }

    // The queue is now full. Awaiting a fifth enqueue hands control to the
    // executor, which gives the worker task its first poll; the worker
    // dequeues and fails fast on the first queued item (no real ffmpeg),
    // freeing a slot, which is exactly what this call is waiting on.
    worker.enqueue(Source::Http, video_request(4)).await.expect("blocks, then succeeds once a slot frees");

    cancel.cancel();
    worker.wait_done().await;
    assert_eq!(worker.state(), WorkerState::Done);
}

#[tokio::test(flavor = "current_thread")]
async fn fifth_enqueue_resolves_unavailable_when_stop_wins_the_race() {
    let dir = tempfile::tempdir().unwrap();
    let state = local_state(dir.path()).await;
    let cancel = CancellationToken::new();
    let worker = StreamWorker::spawn(state, cancel.clone());

    for n in 0..4 {
        worker.enqueue(Source::Http, video_request(n)).await.expect("capacity not yet exhausted");
    }

    // Cancel before the worker task has ever been polled: its first poll
    // will see `cancelled()` ready via the `biased` select arm and signal
    // `stop` before touching the queue at all, so the fifth enqueue below
    // can only unblock via the stop race, never via a drained slot.
    cancel.cancel();

    let err = worker.enqueue(Source::Http, video_request(4)).await.unwrap_err();
    assert!(matches!(err, VithError::Unavailable(_)));

    worker.wait_done().await;
    assert!(worker.is_stopped());
    assert_eq!(worker.state(), WorkerState::Done);
}

#[tokio::test]
async fn stop_blocks_new_enqueues_but_worker_still_reaches_done() {
    let dir = tempfile::tempdir().unwrap();
    let state = local_state(dir.path()).await;
    let cancel = CancellationToken::new();
    let worker = StreamWorker::spawn(state, cancel.clone());

    worker.enqueue(Source::Http, video_request(0)).await.unwrap();

    cancel.cancel();
    worker.wait_done().await;

    assert!(worker.is_stopped());
    assert_eq!(worker.state(), WorkerState::Done);
    let err = worker.enqueue(Source::Http, video_request(1)).await.unwrap_err();
    assert!(matches!(err, VithError::Unavailable(_)));
}
