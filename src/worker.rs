//! Stream Worker: the single serial consumer of stream-generation requests.
//!
//! Mirrors the teacher's `tokio::select!`-based graceful shutdown in
//! `main.rs`: one task drains a bounded queue, a close-once `stop` flag
//! fences off new work, and a `Notify` lets callers await full drain.

use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, Notify};
use tokio_util::sync::CancellationToken;
use tracing as log;

use crate::derive::derive_stream;
use crate::error::{Result, VithError};
use crate::model::{ItemType, Request, Source};
use crate::state::AppState;

const QUEUE_CAPACITY: usize = 4;

#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerState {
    Idle = 0,
    Running = 1,
    Draining = 2,
    Done = 3,
}

impl WorkerState {
    fn from_u8(v: u8) -> Self {
        match v {
            0 => WorkerState::Idle,
            1 => WorkerState::Running,
            2 => WorkerState::Draining,
            _ => WorkerState::Done,
        }
    }
}

/// Handle shared between producers (HTTP/AMQP) and the worker task itself.
pub struct StreamWorker {
    tx: mpsc::Sender<(Source, Request)>,
    stop: Arc<AtomicBool>,
    stop_signal: Arc<Notify>,
    done: Arc<Notify>,
    state: Arc<AtomicU8>,
}

/// Flips `stop` to `true` if it isn't already, waking anyone blocked in
/// `enqueue`. Safe to call repeatedly or concurrently; returns whether this
/// call was the one that actually flipped it.
fn signal_stop(stop: &AtomicBool, stop_signal: &Notify) -> bool {
    let flipped = stop.compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst).is_ok();
    stop_signal.notify_waiters();
    flipped
}

impl StreamWorker {
    /// Spawns the worker task and returns the shared handle. If the store is
    /// disabled, the worker transitions straight to `Done` without ever
    /// running, closing both signals immediately.
    pub fn spawn(state: AppState, cancel: CancellationToken) -> Arc<Self> {
        let (tx, rx) = mpsc::channel(QUEUE_CAPACITY);
        let stop = Arc::new(AtomicBool::new(false));
        let stop_signal = Arc::new(Notify::new());
        let done = Arc::new(Notify::new());
        let worker_state = Arc::new(AtomicU8::new(WorkerState::Idle as u8));

        let handle = Arc::new(Self {
            tx,
            stop: stop.clone(),
            stop_signal: stop_signal.clone(),
            done: done.clone(),
            state: worker_state.clone(),
        });

        if !state.store_enabled() {
            log::info!("store disabled; stream worker starting in Done state");
            signal_stop(&stop, &stop_signal);
            worker_state.store(WorkerState::Done as u8, Ordering::SeqCst);
            done.notify_waiters();
            return handle;
        }

        tokio::spawn(run_worker(state, rx, stop, stop_signal, done, worker_state, cancel));
        handle
    }

    /// Enqueues a stream request, blocking until a queue slot frees up —
    /// only a full queue backpressures the caller, not the queue being
    /// momentarily busy. Returns `Unavailable` the instant `stop` wins the
    /// race against a freed slot, never blocking past shutdown.
    pub async fn enqueue(&self, source: Source, req: Request) -> Result<()> {
        if req.item_type != ItemType::Video {
            return Err(VithError::Forbidden(format!(
                "stream generation only supports video, got {}",
                req.item_type.as_str()
            )));
        }
        if self.stop.load(Ordering::SeqCst) {
            return Err(VithError::Unavailable("stream worker is stopping".into()));
        }

        tokio::select! {
            biased;
            _ = self.stop_signal.notified() => Err(VithError::Unavailable("stream worker is stopping".into())),
            result = self.tx.send((source, req)) => result.map_err(|_| VithError::Unavailable("stream worker has stopped".into())),
        }
    }

    pub fn state(&self) -> WorkerState {
        WorkerState::from_u8(self.state.load(Ordering::SeqCst))
    }

    pub fn is_stopped(&self) -> bool {
        self.stop.load(Ordering::SeqCst)
    }

    /// Signals `stop` at most once; safe to call repeatedly or concurrently.
    /// Wakes any caller currently blocked in `enqueue`.
    pub fn stop_once(&self) {
        signal_stop(&self.stop, &self.stop_signal);
    }

    /// Awaits the worker's `Done` signal. Idempotent: if the worker already
    /// reached `Done` before this call, returns immediately next poll.
    pub async fn wait_done(&self) {
        if self.state() == WorkerState::Done {
            return;
        }
        self.done.notified().await;
    }
}

async fn run_worker(
    state: AppState,
    mut rx: mpsc::Receiver<(Source, Request)>,
    stop: Arc<AtomicBool>,
    stop_signal: Arc<Notify>,
    done: Arc<Notify>,
    worker_state: Arc<AtomicU8>,
    cancel: CancellationToken,
) {
    worker_state.store(WorkerState::Running as u8, Ordering::SeqCst);

    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                signal_stop(&stop, &stop_signal);
                worker_state.store(WorkerState::Draining as u8, Ordering::SeqCst);
                rx.close();
                drain_remaining(&state, &mut rx, &cancel).await;
                break;
            }
            item = rx.recv() => {
                match item {
                    Some((source, req)) => {
                        process_one(&state, source, req, &cancel).await;
                    }
                    None => {
                        signal_stop(&stop, &stop_signal);
                        break;
                    }
                }
            }
        }
    }

    worker_state.store(WorkerState::Done as u8, Ordering::SeqCst);
    done.notify_waiters();
    log::info!("stream worker done");
}

/// Finishes any requests already accepted into the queue before the close
/// signal fired; new enqueues are rejected the moment `stop` flips, but
/// requests already sitting in the channel still get a FIFO turn.
async fn drain_remaining(state: &AppState, rx: &mut mpsc::Receiver<(Source, Request)>, cancel: &CancellationToken) {
    while let Some((source, req)) = rx.recv().await {
        process_one(state, source, req, cancel).await;
    }
}

async fn process_one(state: &AppState, source: Source, req: Request, cancel: &CancellationToken) {
    log::info!(source = %source.as_str(), input = %req.input, output = %req.output, "running queued stream generation");
    if let Err(e) = derive_stream(state, source, &req, cancel).await {
        log::warn!(input = %req.input, output = %req.output, "stream generation failed: {e}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;

    fn video_request() -> Request {
        Request {
            input: "in.mp4".into(),
            output: "v/out.m3u8".into(),
            item_type: ItemType::Video,
            scale: 150,
        }
    }

    #[tokio::test]
    async fn disabled_store_starts_done() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = AppConfig::default();
        config.store.local_root = dir.path().to_string_lossy().to_string();
        config.store.enabled = false;
        config.server.tmp_folder = dir.path().join("tmp").to_string_lossy().to_string();
        let state = AppState::new(config).unwrap();

        let worker = StreamWorker::spawn(state, CancellationToken::new());
        assert_eq!(worker.state(), WorkerState::Done);
        assert!(worker.is_stopped());
    }

    #[tokio::test]
    async fn enqueue_rejects_non_video() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = AppConfig::default();
        config.store.local_root = dir.path().to_string_lossy().to_string();
        config.server.tmp_folder = dir.path().join("tmp").to_string_lossy().to_string();
        let state = AppState::new(config).unwrap();
        let cancel = CancellationToken::new();
        let worker = StreamWorker::spawn(state, cancel.clone());

        let req = Request {
            input: "a.png".into(),
            output: "b.webp".into(),
            item_type: ItemType::Image,
            scale: 150,
        };
        let err = worker.enqueue(Source::Http, req).await.unwrap_err();
        assert!(matches!(err, VithError::Forbidden(_)));
        cancel.cancel();
    }

    #[tokio::test]
    async fn stop_once_is_idempotent_and_unblocks_future_enqueues() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = AppConfig::default();
        config.store.local_root = dir.path().to_string_lossy().to_string();
        config.server.tmp_folder = dir.path().join("tmp").to_string_lossy().to_string();
        let state = AppState::new(config).unwrap();
        let cancel = CancellationToken::new();
        let worker = StreamWorker::spawn(state, cancel.clone());

        worker.stop_once();
        worker.stop_once();
        assert!(worker.is_stopped());

        let err = worker.enqueue(Source::Http, video_request()).await.unwrap_err();
        assert!(matches!(err, VithError::Unavailable(_)));
        cancel.cancel();
    }

    #[tokio::test]
    async fn cancellation_drains_and_reaches_done() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = AppConfig::default();
        config.store.local_root = dir.path().to_string_lossy().to_string();
        config.server.tmp_folder = dir.path().join("tmp").to_string_lossy().to_string();
        let state = AppState::new(config).unwrap();
        let cancel = CancellationToken::new();
        let worker = StreamWorker::spawn(state, cancel.clone());

        cancel.cancel();
        worker.wait_done().await;
        assert_eq!(worker.state(), WorkerState::Done);
    }
}
