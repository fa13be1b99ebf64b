//! The injected execution capability.

use async_trait::async_trait;
use serde_json::Value;

use crate::job::JobType;

/// Performs the actual side effect of a job (e.g. sending the email).
///
/// The engine treats this call as opaque: it may take arbitrary wall-clock
/// time and must be assumed fallible. Any `Err` (and any panic, which the
/// worker catches) counts as a failed execution and is retried per the
/// configured [`RetryPolicy`](crate::RetryPolicy); the error itself is
/// logged but carries no policy meaning.
///
/// Delivery is at-least-once, so implementations should be idempotent where
/// duplicate side effects matter.
#[async_trait]
pub trait JobExecutor: Send + Sync {
    /// Execute one job. The payload is exactly what was submitted, already
    /// validated against `job_type`'s schema at submission time.
    async fn execute(&self, job_type: JobType, payload: &Value) -> anyhow::Result<()>;
}
