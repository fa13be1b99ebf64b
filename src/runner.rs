use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use futures_util::future::join_all;
use tokio::task::JoinHandle;
use tracing::{info, info_span, warn, Instrument};

use crate::backoff::{ExponentialBackoff, RetryPolicy};
use crate::dispatcher::Dispatcher;
use crate::executor::JobExecutor;
use crate::store::Store;
use crate::worker::Worker;

const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);
const DEFAULT_JITTER: Duration = Duration::from_millis(100);

/// Spawns and supervises a pool of workers over one store and one execution
/// capability.
///
/// Every collaborator is passed in explicitly; the runner holds no global
/// state, so independent pools (e.g. in tests) never interfere.
pub struct Runner {
    store: Arc<dyn Store>,
    executor: Arc<dyn JobExecutor>,
    retry_policy: Arc<dyn RetryPolicy>,
    num_workers: usize,
    poll_interval: Duration,
    jitter: Duration,
    shutdown_when_queue_empty: bool,
}

impl fmt::Debug for Runner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Runner")
            .field("num_workers", &self.num_workers)
            .field("poll_interval", &self.poll_interval)
            .field("jitter", &self.jitter)
            .field("shutdown_when_queue_empty", &self.shutdown_when_queue_empty)
            .finish()
    }
}

impl Runner {
    /// Create a runner with a single worker, the default
    /// [`ExponentialBackoff`] policy, and a one-second poll interval.
    pub fn new(store: Arc<dyn Store>, executor: Arc<dyn JobExecutor>) -> Self {
        Self {
            store,
            executor,
            retry_policy: Arc::new(ExponentialBackoff::default()),
            num_workers: 1,
            poll_interval: DEFAULT_POLL_INTERVAL,
            jitter: DEFAULT_JITTER,
            shutdown_when_queue_empty: false,
        }
    }

    /// Substitute the retry/backoff policy.
    pub fn retry_policy(mut self, retry_policy: Arc<dyn RetryPolicy>) -> Self {
        self.retry_policy = retry_policy;
        self
    }

    /// Set the number of concurrent workers.
    pub fn num_workers(mut self, num_workers: usize) -> Self {
        self.num_workers = num_workers;
        self
    }

    /// Set how long an idle worker sleeps before polling again.
    pub fn poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    /// Set the maximum random jitter added to each idle sleep.
    ///
    /// Jitter spreads out the polls of concurrent workers so they do not
    /// hit the store in lockstep. The applied jitter is a random value
    /// between zero and the given duration.
    pub fn jitter(mut self, jitter: Duration) -> Self {
        self.jitter = jitter;
        self
    }

    /// Make workers exit when a poll finds no eligible job, instead of
    /// sleeping and polling again. Useful for tests and batch runs.
    pub fn shutdown_when_queue_empty(mut self) -> Self {
        self.shutdown_when_queue_empty = true;
        self
    }

    /// Start the workers.
    ///
    /// Returns a [`RunHandle`] that waits for them; with the default
    /// configuration the workers never stop, making
    /// `start().wait_for_shutdown().await` the blocking entry point for a
    /// worker process.
    pub fn start(&self) -> RunHandle {
        let mut handles = Vec::new();
        for i in 1..=self.num_workers {
            let name = format!("worker-{i}");
            info!(worker.name = %name, "Starting worker…");

            let worker = Worker {
                store: self.store.clone(),
                dispatcher: Dispatcher::new(self.store.clone()),
                executor: self.executor.clone(),
                retry_policy: self.retry_policy.clone(),
                shutdown_when_queue_empty: self.shutdown_when_queue_empty,
                poll_interval: self.poll_interval,
                jitter: self.jitter,
            };

            let span = info_span!("worker", worker.name = %name);
            let handle = tokio::spawn(async move { worker.run().instrument(span).await });

            handles.push(handle);
        }

        RunHandle { handles }
    }
}

/// Handle to a running pool of workers.
#[derive(Debug)]
pub struct RunHandle {
    handles: Vec<JoinHandle<()>>,
}

impl RunHandle {
    /// Wait for all workers to shut down.
    pub async fn wait_for_shutdown(self) {
        join_all(self.handles).await.into_iter().for_each(|result| {
            if let Err(error) = result {
                warn!(%error, "Worker task panicked");
            }
        });
    }
}
