use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use futures_util::FutureExt;
use rand::Rng;
use tokio::time::sleep;
use tracing::{debug, error, info_span, trace, warn, Instrument};

use crate::backoff::RetryPolicy;
use crate::dispatcher::Dispatcher;
use crate::errors::StoreError;
use crate::executor::JobExecutor;
use crate::job::{JobId, JobStatus};
use crate::store::{JobUpdate, Store};
use crate::util;

pub(crate) struct Worker {
    pub(crate) store: Arc<dyn Store>,
    pub(crate) dispatcher: Dispatcher,
    pub(crate) executor: Arc<dyn JobExecutor>,
    pub(crate) retry_policy: Arc<dyn RetryPolicy>,
    pub(crate) shutdown_when_queue_empty: bool,
    pub(crate) poll_interval: Duration,
    pub(crate) jitter: Duration,
}

impl Worker {
    /// Calculate the sleep duration with random jitter applied.
    fn sleep_duration_with_jitter(&self) -> Duration {
        if self.jitter.is_zero() {
            return self.poll_interval;
        }

        let jitter_millis = u64::try_from(self.jitter.as_millis()).unwrap_or(u64::MAX);
        let random_jitter = rand::thread_rng().gen_range(0..=jitter_millis);
        self.poll_interval + Duration::from_millis(random_jitter)
    }

    /// Run jobs forever, or until a poll finds nothing if
    /// `shutdown_when_queue_empty` is set.
    ///
    /// A store error fails the iteration, not the loop: nothing is known
    /// about the store's actual state at that point, so no job record is
    /// touched and the dispatch attempt is retried after a pause.
    #[allow(clippy::cognitive_complexity)]
    pub(crate) async fn run(&self) {
        loop {
            match self.run_next_job().await {
                Ok(Some(_)) => {}
                Ok(None) if self.shutdown_when_queue_empty => {
                    debug!("No eligible jobs found. Shutting down the worker…");
                    break;
                }
                Ok(None) => {
                    let sleep_duration = self.sleep_duration_with_jitter();
                    trace!("No eligible jobs found. Polling again in {sleep_duration:?}…");
                    sleep(sleep_duration).await;
                }
                Err(error) => {
                    error!("Failed to run job: {error}");
                    sleep(self.sleep_duration_with_jitter()).await;
                }
            }
        }
    }

    /// Drive one job through claim → execute → finalize.
    ///
    /// Returns:
    /// - `Ok(Some(job_id))` if a queue entry was consumed
    /// - `Ok(None)` if no job was eligible this round
    /// - `Err(...)` if the store failed mid-iteration
    #[allow(clippy::cognitive_complexity)]
    async fn run_next_job(&self) -> Result<Option<JobId>, StoreError> {
        trace!("Looking for the next eligible job…");

        let Some(job_id) = self.dispatcher.next_eligible().await? else {
            return Ok(None);
        };

        // The pop and this read are separate operations; anything may have
        // happened to the record in between, so re-check everything the
        // dispatcher already checked.
        let Some(job) = self.store.get_record(job_id).await? else {
            warn!(job.id = %job_id, "Claimed job has no stored record; skipping");
            return Ok(Some(job_id));
        };

        if job.status != JobStatus::Pending {
            warn!(job.id = %job_id, job.status = %job.status, "Claimed job is not pending; discarding entry");
            return Ok(Some(job_id));
        }

        let now = util::now();
        if !job.is_eligible_at(now) {
            self.store.push(job.priority, job_id).await?;
            return Ok(None);
        }

        let span = info_span!("job", job.id = %job_id, job.kind = %job.job_type);

        let claim = JobUpdate {
            status: Some(JobStatus::Processing),
            picked_ts: Some(now),
            ..JobUpdate::default()
        };
        self.store.update_fields(job_id, claim).await?;

        debug!("Running job…");
        let result = AssertUnwindSafe(self.executor.execute(job.job_type, &job.payload))
            .catch_unwind()
            .instrument(span.clone())
            .await
            .map_err(|e| util::try_to_extract_panic_info(&*e))
            // TODO: Replace with flatten() once that stabilizes
            .and_then(std::convert::identity);

        let _enter = span.enter();
        match result {
            Ok(()) => {
                debug!("Job completed");
                let update = JobUpdate {
                    status: Some(JobStatus::Completed),
                    completed_ts: Some(util::now()),
                    ..JobUpdate::default()
                };
                self.store.update_fields(job_id, update).await?;
            }
            Err(error) if job.retry_count < self.retry_policy.max_retries() => {
                let delay = self.retry_policy.backoff(job.retry_count);
                warn!(
                    "Failed to run job (attempt {}): {error}. Retrying in {delay:?}…",
                    job.retry_count + 1
                );
                // Write the record back before re-enqueueing, so the id is
                // never poppable while the record still looks claimed.
                let update = JobUpdate {
                    status: Some(JobStatus::Pending),
                    retry_count: Some(job.retry_count + 1),
                    available_after: Some(util::now_plus(delay)),
                    ..JobUpdate::default()
                };
                self.store.update_fields(job_id, update).await?;
                self.store.push(job.priority, job_id).await?;
            }
            Err(error) => {
                warn!(
                    "Failed to run job: {error}. Giving up after {} attempts",
                    job.retry_count + 1
                );
                let update = JobUpdate {
                    status: Some(JobStatus::Failed),
                    completed_ts: Some(util::now()),
                    ..JobUpdate::default()
                };
                self.store.update_fields(job_id, update).await?;
            }
        }

        Ok(Some(job_id))
    }
}
