use async_trait::async_trait;
use uuid::Uuid;

use crate::error::JobResult;
use crate::models::{CreateJob, Job, JobFilter};

/// Repository trait for the job store.
///
/// Implementations own the transactional semantics behind `claim`,
/// `mark_completed`, `mark_retrying`, and `mark_dead_letter` — callers never
/// read-modify-write a `Job` themselves.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait JobRepository: Send + Sync {
    /// Insert a new job row in `pending` status with `attempts = 0`.
    ///
    /// Returns `JobError::DuplicateIdempotencyKey` if `input.idempotency_key`
    /// is already claimed by another row.
    async fn create(&self, input: CreateJob) -> JobResult<Job>;

    /// Fetch a job by id without mutating it.
    async fn get_by_id(&self, id: Uuid) -> JobResult<Option<Job>>;

    /// Fetch a job by its idempotency key, if one was recorded.
    async fn get_by_idempotency_key(&self, key: &str) -> JobResult<Option<Job>>;

    /// List jobs, newest first, with optional status filter and pagination.
    async fn list(&self, filter: JobFilter) -> JobResult<Vec<Job>>;

    /// Phase A claim: atomically transition `{pending, retrying} ->
    /// processing`, incrementing `attempts`. Returns `None` if the row is
    /// missing or not in a claimable status — the caller treats that as a
    /// no-op, never an error.
    async fn claim(&self, id: Uuid) -> JobResult<Option<Job>>;

    /// Phase C success outcome: `status = completed`, clears `error_message`.
    async fn mark_completed(&self, id: Uuid) -> JobResult<()>;

    /// Phase C retry outcome: `status = retrying`, records the truncated
    /// error message.
    async fn mark_retrying(&self, id: Uuid, error_message: &str) -> JobResult<()>;

    /// Phase C exhausted-retries outcome: `status = dead_letter`, records the
    /// truncated error message.
    async fn mark_dead_letter(&self, id: Uuid, error_message: &str) -> JobResult<()>;
}
