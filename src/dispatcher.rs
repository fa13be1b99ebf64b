//! Job selection: strict priority plus backoff eligibility.

use std::sync::Arc;

use tracing::warn;

use crate::errors::StoreError;
use crate::job::{JobId, Priority};
use crate::store::Store;
use crate::util;

/// Selects the next job id a worker should claim.
///
/// The high list is always drained before the low list is considered, even
/// when the job at the head of the high list is not yet eligible: strict
/// priority takes precedence over readiness, and the caller's poll loop
/// absorbs the "nothing ready" case.
#[derive(Clone)]
pub(crate) struct Dispatcher {
    store: Arc<dyn Store>,
}

impl Dispatcher {
    pub(crate) fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// Pop the next eligible job id, or `None` if nothing can run this round.
    ///
    /// A popped id without a stored record is treated as a lost entry: it is
    /// logged, discarded, and selection starts over. A popped id whose
    /// record is not yet eligible goes back to the tail of its own list, so
    /// FIFO order among the eligible entries of that priority survives
    /// repeated checks.
    pub(crate) async fn next_eligible(&self) -> Result<Option<JobId>, StoreError> {
        loop {
            let Some((job_id, priority)) = self.pop_next().await? else {
                return Ok(None);
            };

            let Some(job) = self.store.get_record(job_id).await? else {
                warn!(job.id = %job_id, "Queued job has no stored record; discarding entry");
                continue;
            };

            if !job.is_eligible_at(util::now()) {
                self.store.push(priority, job_id).await?;
                return Ok(None);
            }

            return Ok(Some(job_id));
        }
    }

    async fn pop_next(&self) -> Result<Option<(JobId, Priority)>, StoreError> {
        for priority in [Priority::High, Priority::Low] {
            if let Some(job_id) = self.store.pop(priority).await? {
                return Ok(Some((job_id, priority)));
            }
        }
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::job::{JobRecord, JobType};
    use crate::memory::MemoryStore;
    use claims::{assert_none, assert_some_eq};
    use chrono::Duration;
    use serde_json::json;

    async fn enqueue(store: &Arc<MemoryStore>, priority: Priority, offset: Duration) -> JobId {
        let now = util::now();
        let mut record = JobRecord::new(JobType::SendEmail, priority, json!({}), now);
        record.available_after = now + offset;
        store.put_record(&record).await.unwrap();
        store.push(priority, record.job_id).await.unwrap();
        record.job_id
    }

    #[tokio::test]
    async fn high_priority_wins_regardless_of_submission_order() {
        let store = Arc::new(MemoryStore::new());
        let low = enqueue(&store, Priority::Low, Duration::zero()).await;
        let high = enqueue(&store, Priority::High, Duration::zero()).await;

        let dispatcher = Dispatcher::new(store.clone());
        assert_some_eq!(dispatcher.next_eligible().await.unwrap(), high);
        assert_some_eq!(dispatcher.next_eligible().await.unwrap(), low);
        assert_none!(dispatcher.next_eligible().await.unwrap());
    }

    #[tokio::test]
    async fn ineligible_jobs_are_requeued_not_skipped_past() {
        let store = Arc::new(MemoryStore::new());
        let waiting = enqueue(&store, Priority::High, Duration::hours(1)).await;
        // an eligible low-priority job must NOT jump the queue
        enqueue(&store, Priority::Low, Duration::zero()).await;

        let dispatcher = Dispatcher::new(store.clone());
        assert_none!(dispatcher.next_eligible().await.unwrap());

        // the waiting job went back to its own list's tail
        assert_some_eq!(store.pop(Priority::High).await.unwrap(), waiting);
    }

    #[tokio::test]
    async fn lost_entries_are_discarded_and_selection_retries() {
        let store = Arc::new(MemoryStore::new());
        store.push(Priority::High, JobId::new_v4()).await.unwrap();
        let real = enqueue(&store, Priority::High, Duration::zero()).await;

        let dispatcher = Dispatcher::new(store.clone());
        assert_some_eq!(dispatcher.next_eligible().await.unwrap(), real);
    }

    #[tokio::test]
    async fn empty_lists_mean_no_job() {
        let store = Arc::new(MemoryStore::new());
        let dispatcher = Dispatcher::new(store);
        assert_none!(dispatcher.next_eligible().await.unwrap());
    }
}
