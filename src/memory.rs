//! In-memory store adapter.

use std::collections::{HashMap, VecDeque};

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::errors::StoreError;
use crate::job::{JobId, JobRecord, Priority};
use crate::store::{JobUpdate, Store};

/// A [`Store`] backed by process memory.
///
/// Keeps one string-keyed field map per job plus two id lists, mirroring the
/// layout a key-value store with list support would use, so records take the
/// same encode/decode path they would against real persistence. A single
/// mutex guards all state, which makes `pop` the atomic remove-and-return
/// the engine requires.
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

#[derive(Debug, Default)]
struct Inner {
    records: HashMap<JobId, HashMap<String, String>>,
    high: VecDeque<JobId>,
    low: VecDeque<JobId>,
}

impl Inner {
    fn list_mut(&mut self, priority: Priority) -> &mut VecDeque<JobId> {
        match priority {
            Priority::High => &mut self.high,
            Priority::Low => &mut self.low,
        }
    }
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn put_record(&self, record: &JobRecord) -> Result<(), StoreError> {
        self.inner
            .lock()
            .records
            .insert(record.job_id, record.to_fields());
        Ok(())
    }

    async fn get_record(&self, id: JobId) -> Result<Option<JobRecord>, StoreError> {
        match self.inner.lock().records.get(&id) {
            None => Ok(None),
            Some(fields) => JobRecord::from_fields(fields)
                .map(Some)
                .map_err(|e| StoreError::Malformed {
                    id,
                    reason: e.to_string(),
                }),
        }
    }

    async fn update_fields(&self, id: JobId, update: JobUpdate) -> Result<(), StoreError> {
        let mut inner = self.inner.lock();
        let fields = inner.records.get_mut(&id).ok_or(StoreError::NotFound(id))?;
        update.apply_to(fields);
        Ok(())
    }

    async fn push(&self, priority: Priority, id: JobId) -> Result<(), StoreError> {
        self.inner.lock().list_mut(priority).push_back(id);
        Ok(())
    }

    async fn pop(&self, priority: Priority) -> Result<Option<JobId>, StoreError> {
        Ok(self.inner.lock().list_mut(priority).pop_front())
    }

    async fn exists(&self, id: JobId) -> Result<bool, StoreError> {
        Ok(self.inner.lock().records.contains_key(&id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::job::{JobStatus, JobType};
    use claims::{assert_none, assert_some_eq};
    use serde_json::json;

    fn record(priority: Priority) -> JobRecord {
        let now = "2025-06-02T08:20:00".parse().unwrap();
        JobRecord::new(JobType::SendEmail, priority, json!({}), now)
    }

    #[tokio::test]
    async fn lists_are_fifo() {
        let store = MemoryStore::new();
        let (a, b) = (JobId::new_v4(), JobId::new_v4());
        store.push(Priority::High, a).await.unwrap();
        store.push(Priority::High, b).await.unwrap();

        assert_some_eq!(store.pop(Priority::High).await.unwrap(), a);
        assert_some_eq!(store.pop(Priority::High).await.unwrap(), b);
        assert_none!(store.pop(Priority::High).await.unwrap());
    }

    #[tokio::test]
    async fn lists_are_independent_per_priority() {
        let store = MemoryStore::new();
        let id = JobId::new_v4();
        store.push(Priority::Low, id).await.unwrap();

        assert_none!(store.pop(Priority::High).await.unwrap());
        assert_some_eq!(store.pop(Priority::Low).await.unwrap(), id);
    }

    #[tokio::test]
    async fn updates_do_not_resurrect_missing_records() {
        let store = MemoryStore::new();
        let id = JobId::new_v4();

        let update = JobUpdate {
            status: Some(JobStatus::Processing),
            ..JobUpdate::default()
        };
        let err = store.update_fields(id, update).await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound(missing) if missing == id));
        assert!(!store.exists(id).await.unwrap());
    }

    #[tokio::test]
    async fn partial_updates_leave_other_fields_alone() {
        let store = MemoryStore::new();
        let record = record(Priority::High);
        store.put_record(&record).await.unwrap();

        let update = JobUpdate {
            status: Some(JobStatus::Processing),
            retry_count: Some(2),
            ..JobUpdate::default()
        };
        store.update_fields(record.job_id, update).await.unwrap();

        let stored = store.get_record(record.job_id).await.unwrap().unwrap();
        assert_eq!(stored.status, JobStatus::Processing);
        assert_eq!(stored.retry_count, 2);
        assert_eq!(stored.created_ts, record.created_ts);
        assert_eq!(stored.payload, record.payload);
        assert_none!(stored.picked_ts);
    }

    #[tokio::test]
    async fn corrupt_records_surface_as_malformed() {
        let store = MemoryStore::new();
        let record = record(Priority::Low);
        store.put_record(&record).await.unwrap();
        store
            .inner
            .lock()
            .records
            .get_mut(&record.job_id)
            .unwrap()
            .insert("status".to_owned(), "gone".to_owned());

        let err = store.get_record(record.job_id).await.unwrap_err();
        assert!(matches!(err, StoreError::Malformed { .. }));
    }
}
