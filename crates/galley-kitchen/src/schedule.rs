//! One-shot completion timers.
//!
//! Every accepted kitchen order gets exactly one task on the
//! [`CompletionScheduler`]: sleep for a [`PrepDelay`] sample, then run the
//! completion step. Tasks are never cancelled individually; the completion
//! step re-reads the order and decides for itself whether there is anything
//! left to do. The only cooperative cancellation is process shutdown, which
//! wakes every pending sleep through a shared [`CancellationToken`].
//!
//! Timers run on their own runtime so a burst of HTTP traffic never delays
//! them, and so a slow callback never ties up a request worker.

use core::{future::Future, time::Duration};
use parking_lot::Mutex;
use rand::Rng;
use tokio::{
    runtime::{Builder, Handle, Runtime},
    time::{sleep, timeout},
};
use tokio_util::{sync::CancellationToken, task::TaskTracker};

/// How long [`CompletionScheduler::shutdown`] waits for in-flight work.
const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(3);

/// Inclusive range of whole seconds a simulated preparation takes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PrepDelay {
    min_secs: u64,
    max_secs: u64,
}

impl PrepDelay {
    /// Builds a delay range, clamping `min` to at least 1 and `max` to at
    /// least `min`.
    pub fn new(min_secs: u64, max_secs: u64) -> Self {
        let min_secs = min_secs.max(1);
        let max_secs = max_secs.max(min_secs);
        Self { min_secs, max_secs }
    }

    pub const fn min_secs(&self) -> u64 {
        self.min_secs
    }

    pub const fn max_secs(&self) -> u64 {
        self.max_secs
    }

    /// Draws a delay uniformly from `[min, max]`.
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Duration {
        Duration::from_secs(rng.random_range(self.min_secs..=self.max_secs))
    }
}

impl Default for PrepDelay {
    fn default() -> Self {
        Self::new(5, 20)
    }
}

/// Runs delayed one-shot tasks on a pool separate from request handling.
pub struct CompletionScheduler {
    handle: Handle,
    /// Present only when the scheduler owns its runtime.
    runtime: Mutex<Option<Runtime>>,
    tracker: TaskTracker,
    shutdown_token: CancellationToken,
}

impl CompletionScheduler {
    /// Creates a scheduler backed by its own multi-threaded runtime with
    /// `workers` threads named `kitchen-prep`.
    pub fn dedicated(workers: usize) -> std::io::Result<Self> {
        let runtime = Builder::new_multi_thread()
            .worker_threads(workers.max(1))
            .thread_name("kitchen-prep")
            .enable_all()
            .build()?;
        let handle = runtime.handle().clone();
        Ok(Self {
            handle,
            runtime: Mutex::new(Some(runtime)),
            tracker: TaskTracker::new(),
            shutdown_token: CancellationToken::new(),
        })
    }

    /// Creates a scheduler that spawns onto an existing runtime.
    pub fn with_handle(handle: Handle) -> Self {
        Self {
            handle,
            runtime: Mutex::new(None),
            tracker: TaskTracker::new(),
            shutdown_token: CancellationToken::new(),
        }
    }

    /// Runs `task` once `delay` has elapsed.
    ///
    /// Returns `false` without spawning anything once shutdown has begun.
    pub fn schedule<F>(&self, delay: Duration, task: F) -> bool
    where
        F: Future<Output = ()> + Send + 'static,
    {
        if self.shutdown_token.is_cancelled() {
            return false;
        }
        let token = self.shutdown_token.clone();
        self.tracker.spawn_on(
            async move {
                tokio::select! {
                    biased;
                    () = token.cancelled() => return,
                    () = sleep(delay) => {}
                }
                task.await;
            },
            &self.handle,
        );
        true
    }

    /// Number of tasks that have been scheduled and not yet finished.
    pub fn pending(&self) -> usize {
        self.tracker.len()
    }

    pub fn is_shutting_down(&self) -> bool {
        self.shutdown_token.is_cancelled()
    }

    /// Stops accepting work, wakes pending sleeps, and waits up to 3 seconds
    /// for tasks already past their sleep.
    pub async fn shutdown(&self) {
        tracing::info!(pending = self.pending(), "Shutting down completion scheduler");
        self.shutdown_token.cancel();
        self.tracker.close();

        match timeout(SHUTDOWN_TIMEOUT, self.tracker.wait()).await {
            Ok(()) => tracing::debug!("Completion scheduler drained"),
            Err(_) => tracing::warn!(
                pending = self.pending(),
                "Completion scheduler drain timed out"
            ),
        }

        // Dropping a runtime from async context panics.
        if let Some(runtime) = self.runtime.lock().take() {
            runtime.shutdown_background();
        }
        tracing::info!("Completion scheduler shutdown complete");
    }
}

impl Drop for CompletionScheduler {
    fn drop(&mut self) {
        self.shutdown_token.cancel();
        if let Some(runtime) = self.runtime.get_mut().take() {
            runtime.shutdown_background();
        }
    }
}
