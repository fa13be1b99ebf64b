use thiserror::Error;

use crate::job::JobId;

/// A submission rejected before any state was created.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    /// The payload does not deserialize to the job type's schema.
    #[error("payload does not match the job type's schema: {0}")]
    MalformedPayload(String),
    /// The recipient address is not well-formed.
    #[error("`{0}` is not a well-formed recipient address")]
    InvalidRecipient(String),
    /// The subject line is empty.
    #[error("subject must not be empty")]
    EmptySubject,
    /// The subject line exceeds the maximum length.
    #[error("subject must be at most {max} characters, got {len}")]
    SubjectTooLong {
        /// Length of the rejected subject, in characters.
        len: usize,
        /// The enforced maximum.
        max: usize,
    },
    /// The message body is empty.
    #[error("message body must not be empty")]
    EmptyMessage,
}

/// Error type for job submission.
#[derive(Debug, Error)]
pub enum SubmitError {
    /// The request was rejected by validation; no record was created.
    #[error("invalid submission: {0}")]
    Validation(#[from] ValidationError),
    /// The store could not persist or enqueue the job.
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Error type for status queries.
#[derive(Debug, Error)]
pub enum StatusError {
    /// No record exists for this id (it never existed, or was purged).
    #[error("job `{0}` was not found")]
    NotFound(JobId),
    /// The store could not be read.
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Error type for store adapter operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The record does not exist. Partial updates return this rather than
    /// resurrecting a deleted record.
    #[error("job `{0}` does not exist in the store")]
    NotFound(JobId),
    /// The stored field map does not decode into a job record.
    #[error("stored record for job `{id}` is malformed: {reason}")]
    Malformed {
        /// The job whose record is corrupt.
        id: JobId,
        /// What failed to decode.
        reason: String,
    },
    /// The store cannot be reached. Callers treat this as transient.
    #[error("store unavailable: {0}")]
    Unavailable(String),
}
