//! Job records and their lifecycle types.
//!
//! A [`JobRecord`] is the typed, in-process representation of one unit of
//! work. At the store boundary records travel as string-keyed field maps
//! (timestamps as timezone-naive ISO-8601, empty string meaning "not set");
//! the encoding lives here so every store adapter shares one layout.

use std::collections::HashMap;
use std::fmt;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use uuid::Uuid;

use crate::errors::ValidationError;

/// Unique identifier of a job. Assigned once at submission, never reused.
pub type JobId = Uuid;

/// Maximum length of an email subject, in characters.
pub const MAX_SUBJECT_LENGTH: usize = 255;

const TS_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.6f";

/// The kind of work a job represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobType {
    /// Deliver an email described by an [`EmailPayload`].
    SendEmail,
}

impl JobType {
    /// Stable wire name of the job type.
    pub fn as_str(self) -> &'static str {
        match self {
            JobType::SendEmail => "send_email",
        }
    }

    fn parse(s: &str) -> Option<Self> {
        match s {
            "send_email" => Some(JobType::SendEmail),
            _ => None,
        }
    }
}

impl fmt::Display for JobType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Dispatch priority. High-priority jobs are always dequeued before
/// low-priority ones, even when the high-priority job is not yet eligible.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    /// Dispatched before any low-priority job.
    High,
    /// Dispatched only when the high-priority list is empty.
    Low,
}

impl Priority {
    /// Stable wire name of the priority.
    pub fn as_str(self) -> &'static str {
        match self {
            Priority::High => "high",
            Priority::Low => "low",
        }
    }

    fn parse(s: &str) -> Option<Self> {
        match s {
            "high" => Some(Priority::High),
            "low" => Some(Priority::Low),
            _ => None,
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle state of a job.
///
/// Valid transitions: `Pending → Processing` (claim), `Processing →
/// Completed` (success), `Processing → Pending` (transient failure, retried
/// later), `Processing → Failed` (retries exhausted). `Completed` and
/// `Failed` are terminal; a terminal record is never mutated again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    /// Queued and waiting to be claimed by a worker.
    Pending,
    /// Claimed by a worker; execution is in flight.
    Processing,
    /// Execution succeeded. Terminal.
    Completed,
    /// Retries exhausted. Terminal.
    Failed,
}

impl JobStatus {
    /// Whether this state permits no further transitions.
    pub fn is_terminal(self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }

    /// Stable wire name of the status.
    pub fn as_str(self) -> &'static str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::Processing => "processing",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
        }
    }

    fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(JobStatus::Pending),
            "processing" => Some(JobStatus::Processing),
            "completed" => Some(JobStatus::Completed),
            "failed" => Some(JobStatus::Failed),
            _ => None,
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Payload of a [`JobType::SendEmail`] job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailPayload {
    /// Recipient address.
    pub to: String,
    /// Subject line. Non-empty, at most [`MAX_SUBJECT_LENGTH`] characters.
    pub subject: String,
    /// Message body. Non-empty.
    pub message: String,
}

impl EmailPayload {
    pub(crate) fn validate(&self) -> Result<(), ValidationError> {
        if !is_well_formed_address(&self.to) {
            return Err(ValidationError::InvalidRecipient(self.to.clone()));
        }
        if self.subject.is_empty() {
            return Err(ValidationError::EmptySubject);
        }
        let len = self.subject.chars().count();
        if len > MAX_SUBJECT_LENGTH {
            return Err(ValidationError::SubjectTooLong {
                len,
                max: MAX_SUBJECT_LENGTH,
            });
        }
        if self.message.is_empty() {
            return Err(ValidationError::EmptyMessage);
        }
        Ok(())
    }
}

// Well-formedness only: one `@`, non-empty local part, dotted domain, no
// whitespace. Deliverability is the executor's problem.
fn is_well_formed_address(addr: &str) -> bool {
    let Some((local, domain)) = addr.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.is_empty()
        && !domain.contains('@')
        && domain.contains('.')
        && !domain.starts_with('.')
        && !domain.ends_with('.')
        && !addr.chars().any(char::is_whitespace)
}

/// One unit of work and its lifecycle state.
#[derive(Debug, Clone)]
pub struct JobRecord {
    /// Unique identifier for the job.
    pub job_id: JobId,
    /// The kind of work this job represents.
    pub job_type: JobType,
    /// Dispatch priority; also names the list the job queues on.
    pub priority: Priority,
    /// Type-specific payload, validated at submission time only.
    pub payload: Value,
    /// Current lifecycle state.
    pub status: JobStatus,
    /// Number of failed executions so far. Capped at the policy's maximum.
    pub retry_count: u32,
    /// When the job was submitted. Immutable.
    pub created_ts: NaiveDateTime,
    /// When a worker last claimed the job. `None` until first claimed.
    pub picked_ts: Option<NaiveDateTime>,
    /// When the job reached a terminal state. `None` until then.
    pub completed_ts: Option<NaiveDateTime>,
    /// The job is not eligible for dispatch before this instant.
    pub available_after: NaiveDateTime,
}

impl JobRecord {
    pub(crate) fn new(job_type: JobType, priority: Priority, payload: Value, now: NaiveDateTime) -> Self {
        Self {
            job_id: Uuid::new_v4(),
            job_type,
            priority,
            payload,
            status: JobStatus::Pending,
            retry_count: 0,
            created_ts: now,
            picked_ts: None,
            completed_ts: None,
            available_after: now,
        }
    }

    /// Whether the job may be dispatched at `now`.
    pub fn is_eligible_at(&self, now: NaiveDateTime) -> bool {
        self.available_after <= now
    }

    /// Encode the record as the store's string-keyed field map.
    pub fn to_fields(&self) -> HashMap<String, String> {
        HashMap::from([
            ("job_id".to_owned(), self.job_id.to_string()),
            ("job_type".to_owned(), self.job_type.as_str().to_owned()),
            ("priority".to_owned(), self.priority.as_str().to_owned()),
            ("payload".to_owned(), self.payload.to_string()),
            ("status".to_owned(), self.status.as_str().to_owned()),
            ("retry_count".to_owned(), self.retry_count.to_string()),
            ("created_ts".to_owned(), encode_ts(self.created_ts)),
            ("picked_ts".to_owned(), encode_opt_ts(self.picked_ts)),
            ("completed_ts".to_owned(), encode_opt_ts(self.completed_ts)),
            ("available_after".to_owned(), encode_ts(self.available_after)),
        ])
    }

    /// Decode a record from the store's string-keyed field map.
    pub fn from_fields(fields: &HashMap<String, String>) -> Result<Self, DecodeError> {
        let job_id = required(fields, "job_id")?
            .parse::<Uuid>()
            .map_err(|e| DecodeError::new("job_id", e))?;
        let job_type = JobType::parse(required(fields, "job_type")?)
            .ok_or_else(|| DecodeError::new("job_type", "unrecognized job type"))?;
        let priority = Priority::parse(required(fields, "priority")?)
            .ok_or_else(|| DecodeError::new("priority", "unrecognized priority"))?;
        let payload = serde_json::from_str(required(fields, "payload")?)
            .map_err(|e| DecodeError::new("payload", e))?;
        let status = JobStatus::parse(required(fields, "status")?)
            .ok_or_else(|| DecodeError::new("status", "unrecognized status"))?;
        let retry_count = required(fields, "retry_count")?
            .parse::<u32>()
            .map_err(|e| DecodeError::new("retry_count", e))?;
        let created_ts = decode_ts("created_ts", required(fields, "created_ts")?)?;
        let picked_ts = decode_opt_ts(fields, "picked_ts")?;
        let completed_ts = decode_opt_ts(fields, "completed_ts")?;
        let available_after = decode_ts("available_after", required(fields, "available_after")?)?;

        Ok(Self {
            job_id,
            job_type,
            priority,
            payload,
            status,
            retry_count,
            created_ts,
            picked_ts,
            completed_ts,
            available_after,
        })
    }
}

/// A stored field map that could not be decoded into a [`JobRecord`].
#[derive(Debug, Error)]
#[error("field `{field}`: {reason}")]
pub struct DecodeError {
    field: &'static str,
    reason: String,
}

impl DecodeError {
    fn new(field: &'static str, reason: impl fmt::Display) -> Self {
        Self {
            field,
            reason: reason.to_string(),
        }
    }
}

pub(crate) fn encode_ts(ts: NaiveDateTime) -> String {
    ts.format(TS_FORMAT).to_string()
}

fn encode_opt_ts(ts: Option<NaiveDateTime>) -> String {
    ts.map(encode_ts).unwrap_or_default()
}

fn decode_ts(field: &'static str, value: &str) -> Result<NaiveDateTime, DecodeError> {
    value
        .parse::<NaiveDateTime>()
        .map_err(|e| DecodeError::new(field, e))
}

fn decode_opt_ts(
    fields: &HashMap<String, String>,
    field: &'static str,
) -> Result<Option<NaiveDateTime>, DecodeError> {
    match fields.get(field).map(String::as_str) {
        None | Some("") => Ok(None),
        Some(value) => decode_ts(field, value).map(Some),
    }
}

fn required<'a>(
    fields: &'a HashMap<String, String>,
    field: &'static str,
) -> Result<&'a str, DecodeError> {
    fields
        .get(field)
        .map(String::as_str)
        .ok_or_else(|| DecodeError::new(field, "missing"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use claims::{assert_none, assert_ok, assert_some};
    use serde_json::json;

    fn email() -> EmailPayload {
        EmailPayload {
            to: "user@example.com".to_owned(),
            subject: "Hi".to_owned(),
            message: "Hello".to_owned(),
        }
    }

    #[test]
    fn fresh_records_round_trip_through_the_field_map() {
        let now = "2025-06-02T08:20:00.123456".parse().unwrap();
        let record = JobRecord::new(JobType::SendEmail, Priority::High, json!({"k": "v"}), now);

        let decoded = JobRecord::from_fields(&record.to_fields()).unwrap();

        assert_eq!(decoded.job_id, record.job_id);
        assert_eq!(decoded.job_type, JobType::SendEmail);
        assert_eq!(decoded.priority, Priority::High);
        assert_eq!(decoded.payload, record.payload);
        assert_eq!(decoded.status, JobStatus::Pending);
        assert_eq!(decoded.retry_count, 0);
        assert_eq!(decoded.created_ts, now);
        assert_eq!(decoded.available_after, now);
        // unset timestamps must come back as the semantic null, not an error
        assert_none!(decoded.picked_ts);
        assert_none!(decoded.completed_ts);
    }

    #[test]
    fn set_timestamps_survive_the_field_map() {
        let now = "2025-06-02T08:20:00.123456".parse().unwrap();
        let picked = "2025-06-02T08:20:05.000001".parse().unwrap();
        let mut record = JobRecord::new(JobType::SendEmail, Priority::Low, json!({}), now);
        record.picked_ts = Some(picked);

        let decoded = JobRecord::from_fields(&record.to_fields()).unwrap();
        assert_eq!(assert_some!(decoded.picked_ts), picked);
    }

    #[test]
    fn malformed_fields_are_rejected() {
        let now = "2025-06-02T08:20:00".parse().unwrap();
        let mut fields = JobRecord::new(JobType::SendEmail, Priority::High, json!({}), now).to_fields();
        fields.insert("retry_count".to_owned(), "soon".to_owned());

        let err = JobRecord::from_fields(&fields).unwrap_err();
        assert!(err.to_string().contains("retry_count"));
    }

    #[test]
    fn valid_email_payload_passes_validation() {
        assert_ok!(email().validate());
    }

    #[test]
    fn recipient_addresses_must_be_well_formed() {
        for bad in [
            "",
            "userexample.com",
            "@example.com",
            "user@",
            "user@nodot",
            "user@.example.com",
            "user@example.com.",
            "us er@example.com",
            "user@exa@mple.com",
        ] {
            let mut payload = email();
            payload.to = bad.to_owned();
            assert!(
                matches!(payload.validate(), Err(ValidationError::InvalidRecipient(_))),
                "accepted {bad:?}"
            );
        }
    }

    #[test]
    fn subjects_are_bounded() {
        let mut payload = email();
        payload.subject = String::new();
        assert!(matches!(payload.validate(), Err(ValidationError::EmptySubject)));

        let mut payload = email();
        payload.subject = "s".repeat(MAX_SUBJECT_LENGTH + 1);
        assert!(matches!(
            payload.validate(),
            Err(ValidationError::SubjectTooLong { len: 256, max: 255 })
        ));

        let mut payload = email();
        payload.subject = "s".repeat(MAX_SUBJECT_LENGTH);
        assert_ok!(payload.validate());
    }

    #[test]
    fn message_bodies_must_not_be_empty() {
        let mut payload = email();
        payload.message = String::new();
        assert!(matches!(payload.validate(), Err(ValidationError::EmptyMessage)));
    }
}
