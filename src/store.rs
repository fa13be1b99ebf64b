//! The store adapter contract.
//!
//! Persistence is a hash-like record collection plus one FIFO list of job ids
//! per priority. The adapter holds no business logic; every decision about
//! lifecycle and ordering is made by the engine on top of these operations.
//!
//! Pop, read, and update are three separate, independently observable
//! operations. The engine takes no claim lock around `pending → processing`:
//! [`Store::pop`] MUST be an atomic remove-and-return, or two workers can
//! claim the same job. If an adapter cannot provide that, duplicate claims
//! must be tolerated by an idempotent executor instead.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::NaiveDateTime;

use crate::errors::StoreError;
use crate::job::{encode_ts, JobId, JobRecord, JobStatus, Priority};

/// A partial update to a stored job record.
///
/// Only the set fields are written; everything else is left untouched.
#[derive(Debug, Clone, Default)]
pub struct JobUpdate {
    /// New lifecycle state.
    pub status: Option<JobStatus>,
    /// New retry count.
    pub retry_count: Option<u32>,
    /// New claim timestamp.
    pub picked_ts: Option<NaiveDateTime>,
    /// New terminal timestamp.
    pub completed_ts: Option<NaiveDateTime>,
    /// New eligibility gate.
    pub available_after: Option<NaiveDateTime>,
}

impl JobUpdate {
    /// Apply this update to a record's string-keyed field map, using the
    /// same encoding as [`JobRecord::to_fields`].
    pub fn apply_to(&self, fields: &mut HashMap<String, String>) {
        if let Some(status) = self.status {
            fields.insert("status".to_owned(), status.as_str().to_owned());
        }
        if let Some(retry_count) = self.retry_count {
            fields.insert("retry_count".to_owned(), retry_count.to_string());
        }
        if let Some(picked_ts) = self.picked_ts {
            fields.insert("picked_ts".to_owned(), encode_ts(picked_ts));
        }
        if let Some(completed_ts) = self.completed_ts {
            fields.insert("completed_ts".to_owned(), encode_ts(completed_ts));
        }
        if let Some(available_after) = self.available_after {
            fields.insert("available_after".to_owned(), encode_ts(available_after));
        }
    }
}

/// Abstract persistence for job records and the two priority lists.
#[async_trait]
pub trait Store: Send + Sync {
    /// Create or overwrite the full record.
    async fn put_record(&self, record: &JobRecord) -> Result<(), StoreError>;

    /// Fetch a record, or `None` if no record exists for this id.
    async fn get_record(&self, id: JobId) -> Result<Option<JobRecord>, StoreError>;

    /// Apply a partial update to an existing record.
    ///
    /// Errors with [`StoreError::NotFound`] if the record does not exist; an
    /// update must never resurrect a deleted record.
    async fn update_fields(&self, id: JobId, update: JobUpdate) -> Result<(), StoreError>;

    /// Append a job id to the tail of the given priority list.
    async fn push(&self, priority: Priority, id: JobId) -> Result<(), StoreError>;

    /// Atomically remove and return the id at the head of the given priority
    /// list, or `None` if the list is empty.
    async fn pop(&self, priority: Priority) -> Result<Option<JobId>, StoreError>;

    /// Whether a record exists for this id.
    async fn exists(&self, id: JobId) -> Result<bool, StoreError>;
}
