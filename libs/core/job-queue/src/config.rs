//! Worker configuration, loaded from the environment.

use core_config::{ConfigError, FromEnv, env_or_default, env_required};

/// Tunables for the dispatcher and scheduler.
///
/// `DATABASE_URL` and `REDIS_URL` are loaded separately by the connectors in
/// `database`; this struct owns only the job-queue-specific overrides.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Ready stream name (default `job_queue`).
    pub queue_name: String,
    /// Retry stream name (default `retry_queue`).
    pub retry_queue_name: String,
    /// Dead-letter stream name (default `dead_letter_queue`).
    pub dlq_name: String,
    /// Per-process handler parallelism (default 5).
    pub max_concurrency: usize,
    /// Seconds to sleep when the ready stream is empty (default 1).
    pub queue_poll_timeout_secs: u64,
    /// Seconds between scheduler ticks (default 1.0).
    pub retry_poll_interval_secs: f64,
    /// TCP port for the worker's health/metrics surface (default 8080).
    pub health_port: u16,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            queue_name: "job_queue".to_string(),
            retry_queue_name: "retry_queue".to_string(),
            dlq_name: "dead_letter_queue".to_string(),
            max_concurrency: 5,
            queue_poll_timeout_secs: 1,
            retry_poll_interval_secs: 1.0,
            health_port: 8080,
        }
    }
}

impl FromEnv for WorkerConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();

        Ok(Self {
            queue_name: env_or_default("QUEUE_NAME", &defaults.queue_name),
            retry_queue_name: env_or_default("RETRY_QUEUE_NAME", &defaults.retry_queue_name),
            dlq_name: env_or_default("DLQ_NAME", &defaults.dlq_name),
            max_concurrency: parse_or_default("MAX_CONCURRENCY", defaults.max_concurrency)?,
            queue_poll_timeout_secs: parse_or_default(
                "QUEUE_POLL_TIMEOUT",
                defaults.queue_poll_timeout_secs,
            )?,
            retry_poll_interval_secs: parse_or_default(
                "RETRY_POLL_INTERVAL",
                defaults.retry_poll_interval_secs,
            )?,
            health_port: parse_or_default("HEALTH_PORT", defaults.health_port)?,
        })
    }
}

fn parse_or_default<T>(key: &'static str, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
{
    match std::env::var(key) {
        Err(_) => Ok(default),
        Ok(raw) => raw.parse().map_err(|_| ConfigError::ParseError {
            key: key.to_string(),
            details: format!("expected a number, got '{raw}'"),
        }),
    }
}

/// The connection string required by the job store. Not part of
/// `WorkerConfig` itself since `database::postgres` owns its own loading,
/// but validated eagerly at startup so misconfiguration fails fast.
pub fn require_database_url() -> Result<String, ConfigError> {
    env_required("DATABASE_URL")
}

/// The connection string required by the streams broker.
pub fn require_redis_url() -> Result<String, ConfigError> {
    env_required("REDIS_URL")
}
