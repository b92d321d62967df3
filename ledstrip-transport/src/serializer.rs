//! Single-lane command serializer
//!
//! Every driver call goes through one worker task draining a channel of
//! pending jobs, so at most one job touches the driver at a time and jobs
//! run in the order they were enqueued.
//!
//! ```text
//! [direct API call]   [effect step]
//!          \             /
//!      CommandSerializer::enqueue     ← mpsc of boxed jobs
//!                |
//!          lane worker                ← awaits one job, then the next
//!                |
//!          DriverClient → DriverTransport
//! ```
//!
//! A job that fails or panics settles its own future and the worker moves
//! on to the next job.

use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

use futures::FutureExt;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, warn};

use crate::error::TransportError;

type Job = Pin<Box<dyn Future<Output = ()> + Send>>;

#[derive(Default)]
struct LaneStats {
    in_flight: AtomicUsize,
    completed: AtomicU64,
    panicked: AtomicU64,
    running: AtomicBool,
}

/// Ordered, one-at-a-time executor for driver work.
///
/// Cloning yields another handle onto the same lane.
#[derive(Clone)]
pub struct CommandSerializer {
    tx: mpsc::Sender<Job>,
    depth: usize,
    stats: Arc<LaneStats>,
}

impl CommandSerializer {
    /// Spawn the lane worker on the current Tokio runtime.
    pub fn new(depth: usize) -> Self {
        let depth = depth.max(1);
        let (tx, rx) = mpsc::channel(depth);
        let stats = Arc::new(LaneStats::default());
        stats.running.store(true, Ordering::SeqCst);
        tokio::spawn(lane_worker(rx, Arc::clone(&stats)));
        Self { tx, depth, stats }
    }

    /// Run `op` after every previously enqueued job has settled.
    ///
    /// `op` is not invoked until the lane reaches it. Returns
    /// `QueueClosed` if the worker is gone, `JobPanicked` if `op` panicked.
    pub async fn enqueue<F, Fut, T>(&self, op: F) -> Result<T, TransportError>
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = T> + Send + 'static,
        T: Send + 'static,
    {
        let (done_tx, done_rx) = oneshot::channel();
        let stats = Arc::clone(&self.stats);
        let job: Job = Box::pin(async move {
            let outcome = AssertUnwindSafe(async move { op().await })
                .catch_unwind()
                .await
                .map_err(panic_message);
            if let Err(msg) = &outcome {
                stats.panicked.fetch_add(1, Ordering::Relaxed);
                warn!("Command job panicked: {msg}");
            }
            stats.completed.fetch_add(1, Ordering::Relaxed);
            // Caller may have stopped waiting; the job still counts as settled
            let _ = done_tx.send(outcome);
        });

        self.tx
            .send(job)
            .await
            .map_err(|_| TransportError::QueueClosed)?;

        match done_rx.await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(msg)) => Err(TransportError::JobPanicked(msg)),
            Err(_) => Err(TransportError::QueueClosed),
        }
    }

    /// Jobs queued but not yet started
    pub fn pending(&self) -> usize {
        self.depth - self.tx.capacity()
    }

    /// Jobs currently executing (0 or 1)
    pub fn in_flight(&self) -> usize {
        self.stats.in_flight.load(Ordering::SeqCst)
    }

    /// Jobs that have settled since the lane started
    pub fn completed(&self) -> u64 {
        self.stats.completed.load(Ordering::Relaxed)
    }

    pub fn is_running(&self) -> bool {
        self.stats.running.load(Ordering::SeqCst)
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

async fn lane_worker(mut rx: mpsc::Receiver<Job>, stats: Arc<LaneStats>) {
    debug!("Command lane worker started");

    while let Some(job) = rx.recv().await {
        stats.in_flight.fetch_add(1, Ordering::SeqCst);
        // catch_unwind lives inside the job, so this await cannot unwind
        job.await;
        stats.in_flight.fetch_sub(1, Ordering::SeqCst);
    }

    stats.running.store(false, Ordering::SeqCst);
    let panicked = stats.panicked.load(Ordering::Relaxed);
    if panicked > 0 {
        warn!("Command lane stopped after {panicked} panicked jobs");
    } else {
        debug!("Command lane worker stopped");
    }
}
