//! The client-facing surface: job submission and status queries.

use std::sync::Arc;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, instrument};

use crate::errors::{StatusError, SubmitError, ValidationError};
use crate::job::{EmailPayload, JobId, JobRecord, JobStatus, JobType, Priority};
use crate::store::Store;
use crate::util;

/// A request to enqueue one job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitRequest {
    /// The kind of work to perform.
    pub job_type: JobType,
    /// Which priority list the job queues on.
    pub priority: Priority,
    /// Type-specific payload, validated against the job type's schema.
    pub payload: Value,
}

/// The externally visible view of a job record, as returned by
/// [`JobQueue::status`].
#[derive(Debug, Clone, Serialize)]
pub struct JobView {
    /// Unique identifier for the job.
    pub job_id: JobId,
    /// The kind of work this job represents.
    pub job_type: JobType,
    /// Dispatch priority.
    pub priority: Priority,
    /// The payload exactly as submitted.
    pub payload: Value,
    /// Current lifecycle state.
    pub status: JobStatus,
    /// Number of failed executions so far.
    pub retry_count: u32,
    /// When the job was submitted.
    pub created_ts: NaiveDateTime,
    /// When a worker last claimed the job, if ever.
    pub picked_ts: Option<NaiveDateTime>,
    /// When the job reached a terminal state, if it has.
    pub completed_ts: Option<NaiveDateTime>,
    /// The job is not dispatched before this instant.
    pub available_after: NaiveDateTime,
}

impl From<JobRecord> for JobView {
    fn from(record: JobRecord) -> Self {
        Self {
            job_id: record.job_id,
            job_type: record.job_type,
            priority: record.priority,
            payload: record.payload,
            status: record.status,
            retry_count: record.retry_count,
            created_ts: record.created_ts,
            picked_ts: record.picked_ts,
            completed_ts: record.completed_ts,
            available_after: record.available_after,
        }
    }
}

/// Client handle for submitting jobs and polling their status.
///
/// Cheap to clone; every clone talks to the same store.
#[derive(Clone)]
pub struct JobQueue {
    store: Arc<dyn Store>,
}

impl JobQueue {
    /// Create a handle over the given store.
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// Validate and enqueue a job, returning its fresh id.
    ///
    /// Rejected submissions create no state at all. For accepted ones the
    /// record is persisted before its id is pushed, so a worker can never
    /// pop an id whose record does not exist yet.
    #[instrument(
        name = "jobq.submit",
        skip_all,
        fields(job.kind = %request.job_type, job.priority = %request.priority)
    )]
    pub async fn submit(&self, request: SubmitRequest) -> Result<JobId, SubmitError> {
        validate_payload(request.job_type, &request.payload)?;

        let record = JobRecord::new(
            request.job_type,
            request.priority,
            request.payload,
            util::now(),
        );
        self.store.put_record(&record).await?;
        self.store.push(record.priority, record.job_id).await?;

        debug!(job.id = %record.job_id, "Job enqueued");
        Ok(record.job_id)
    }

    /// Look up the current state of a job. Pure read; no side effects.
    pub async fn status(&self, job_id: JobId) -> Result<JobView, StatusError> {
        match self.store.get_record(job_id).await? {
            Some(record) => Ok(record.into()),
            None => Err(StatusError::NotFound(job_id)),
        }
    }
}

fn validate_payload(job_type: JobType, payload: &Value) -> Result<(), ValidationError> {
    match job_type {
        JobType::SendEmail => {
            let email: EmailPayload = serde_json::from_value(payload.clone())
                .map_err(|e| ValidationError::MalformedPayload(e.to_string()))?;
            email.validate()
        }
    }
}
