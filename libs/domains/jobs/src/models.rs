use chrono::{DateTime, Utc};
use sea_orm::{DeriveActiveEnum, EnumIter};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use strum::{Display, EnumString};
use uuid::Uuid;
use validator::Validate;

/// Maximum length an error message is truncated to before persisting.
pub const ERROR_MESSAGE_MAX_LEN: usize = 2000;

/// Default retry ceiling applied when a producer omits `max_attempts`.
pub const DEFAULT_MAX_ATTEMPTS: i32 = 3;

/// Truncate `message` to at most `ERROR_MESSAGE_MAX_LEN` characters, respecting
/// UTF-8 boundaries.
pub fn truncate_error(message: &str) -> String {
    if message.chars().count() <= ERROR_MESSAGE_MAX_LEN {
        return message.to_string();
    }
    message.chars().take(ERROR_MESSAGE_MAX_LEN).collect()
}

/// Status of a job row.
///
/// `Completed` and `DeadLetter` are terminal: the core never transitions a job
/// out of either. `Failed` is part of the persisted schema but is never set by
/// the dispatcher or scheduler themselves; it is reserved for out-of-core
/// producer-initiated bookkeeping.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    Default,
    DeriveActiveEnum,
    EnumIter,
)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "job_status")]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum JobStatus {
    #[default]
    #[sea_orm(string_value = "pending")]
    Pending,
    #[sea_orm(string_value = "processing")]
    Processing,
    #[sea_orm(string_value = "retrying")]
    Retrying,
    #[sea_orm(string_value = "completed")]
    Completed,
    #[sea_orm(string_value = "failed")]
    Failed,
    #[sea_orm(string_value = "dead_letter")]
    DeadLetter,
}

impl JobStatus {
    /// Statuses a job must be in for the dispatcher to claim it.
    pub fn is_claimable(self) -> bool {
        matches!(self, JobStatus::Pending | JobStatus::Retrying)
    }

    /// Terminal statuses the core never transitions out of.
    pub fn is_terminal(self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::DeadLetter)
    }
}

/// A durable unit of work.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    pub id: Uuid,
    #[serde(rename = "type")]
    pub job_type: String,
    pub payload: Value,
    pub status: JobStatus,
    pub attempts: i32,
    pub max_attempts: i32,
    pub error_message: Option<String>,
    pub idempotency_key: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Job {
    /// `0 <= attempts <= max_attempts`.
    pub fn attempts_within_budget(&self) -> bool {
        self.attempts >= 0 && self.attempts <= self.max_attempts
    }

    /// Seconds to wait before the next retry, given the post-increment attempt
    /// count. First retry waits 2s, then 4s, 8s, ....
    pub fn retry_delay_secs(attempts_after_increment: i32) -> i64 {
        2i64.saturating_pow(attempts_after_increment.max(0) as u32)
    }

    /// Whether the just-incremented attempt count exhausted the retry budget.
    pub fn retries_exhausted(&self) -> bool {
        self.attempts >= self.max_attempts
    }
}

/// Producer-supplied input for creating a job.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateJob {
    #[validate(length(min = 1, max = 255))]
    #[serde(rename = "type")]
    pub job_type: String,
    #[serde(default = "default_payload")]
    pub payload: Value,
    #[serde(default = "default_max_attempts")]
    pub max_attempts: i32,
    pub idempotency_key: Option<String>,
}

fn default_payload() -> Value {
    Value::Object(Default::default())
}

fn default_max_attempts() -> i32 {
    DEFAULT_MAX_ATTEMPTS
}

/// Query filters for listing jobs.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct JobFilter {
    pub status: Option<JobStatus>,
    #[serde(default = "default_limit")]
    pub limit: u64,
    #[serde(default)]
    pub offset: u64,
}

fn default_limit() -> u64 {
    50
}

/// DTO for API responses.
#[derive(Debug, Clone, Serialize)]
pub struct JobResponse {
    pub id: Uuid,
    #[serde(rename = "type")]
    pub job_type: String,
    pub payload: Value,
    pub status: JobStatus,
    pub attempts: i32,
    pub max_attempts: i32,
    pub error_message: Option<String>,
    pub idempotency_key: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Job> for JobResponse {
    fn from(job: Job) -> Self {
        Self {
            id: job.id,
            job_type: job.job_type,
            payload: job.payload,
            status: job.status,
            attempts: job.attempts,
            max_attempts: job.max_attempts,
            error_message: job.error_message,
            idempotency_key: job.idempotency_key,
            created_at: job.created_at,
            updated_at: job.updated_at,
        }
    }
}
