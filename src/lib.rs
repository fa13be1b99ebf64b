#![doc = include_str!("../README.md")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod backoff;
mod dispatcher;
mod errors;
mod executor;
mod job;
mod memory;
mod queue;
mod runner;
mod store;
mod util;
mod worker;

/// Retry/backoff policies.
pub use self::backoff::{ExponentialBackoff, RetryPolicy};
/// Error types for submission, status queries, and store operations.
pub use self::errors::{StatusError, StoreError, SubmitError, ValidationError};
/// The injected execution capability.
pub use self::executor::JobExecutor;
/// Job records and their lifecycle types.
pub use self::job::{
    DecodeError, EmailPayload, JobId, JobRecord, JobStatus, JobType, Priority, MAX_SUBJECT_LENGTH,
};
/// In-memory store adapter.
pub use self::memory::MemoryStore;
/// Submission and status queries.
pub use self::queue::{JobQueue, JobView, SubmitRequest};
/// The worker pool.
pub use self::runner::{RunHandle, Runner};
/// The store adapter contract.
pub use self::store::{JobUpdate, Store};
