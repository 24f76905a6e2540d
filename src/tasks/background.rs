//! Background Task Set
//!
//! Tracks the fetches the cache spawns so a clear can cancel background
//! work and a shutdown can cancel everything and wait for it to finish.

use std::future::Future;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::debug;

/// Cancellable, drainable set of spawned tasks.
///
/// Background tasks are cancelled by [`cancel_all`](Self::cancel_all);
/// foreground tasks only by [`shutdown`](Self::shutdown). Clones share the
/// same set.
#[derive(Clone, Default)]
pub struct BackgroundTasks {
    tracker: TaskTracker,
    token: Arc<Mutex<CancellationToken>>,
    shutdown: CancellationToken,
    /// Serializes the close/wait/reopen cycle of concurrent drains
    drain_lock: Arc<tokio::sync::Mutex<()>>,
}

impl BackgroundTasks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Spawns `future` on the current tokio runtime.
    ///
    /// The handle resolves to `None` if the task was cancelled before
    /// `future` completed. Must be called from within a runtime.
    pub fn spawn<F>(&self, future: F) -> JoinHandle<Option<F::Output>>
    where
        F: Future + Send + 'static,
        F::Output: Send + 'static,
    {
        let token = self.token.lock().clone();
        let shutdown = self.shutdown.clone();
        self.tracker.spawn(async move {
            tokio::select! {
                biased;
                () = shutdown.cancelled() => None,
                () = token.cancelled() => None,
                output = future => Some(output),
            }
        })
    }

    /// Like [`spawn`](Self::spawn), but survives [`cancel_all`](Self::cancel_all).
    /// Used for work a caller is waiting on.
    pub fn spawn_foreground<F>(&self, future: F) -> JoinHandle<Option<F::Output>>
    where
        F: Future + Send + 'static,
        F::Output: Send + 'static,
    {
        let shutdown = self.shutdown.clone();
        self.tracker.spawn(async move {
            tokio::select! {
                biased;
                () = shutdown.cancelled() => None,
                output = future => Some(output),
            }
        })
    }

    /// Cancels every background task spawned so far. Foreground tasks and
    /// tasks spawned afterwards are unaffected.
    pub fn cancel_all(&self) {
        let mut token = self.token.lock();
        token.cancel();
        *token = CancellationToken::new();
        debug!(outstanding = self.tracker.len(), "Cancelled background tasks");
    }

    /// Waits until every task spawned so far has finished.
    ///
    /// Concurrent drains run one after another.
    pub async fn drain(&self) {
        let _guard = self.drain_lock.lock().await;
        self.tracker.close();
        self.tracker.wait().await;
        self.tracker.reopen();
    }

    /// Cancels every task, foreground included, and waits for them to
    /// unwind. Tasks spawned afterwards are cancelled immediately.
    pub async fn shutdown(&self) {
        self.shutdown.cancel();
        self.cancel_all();
        self.drain().await;
    }

    /// Number of tasks still running.
    pub fn len(&self) -> usize {
        self.tracker.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracker.is_empty()
    }
}
