//! Prometheus-compatible metrics for the job execution pipeline.
//!
//! ## Available metrics
//!
//! - `job_queue_jobs_total` - counter of jobs processed, labeled by outcome
//! - `job_queue_job_duration_seconds` - histogram of handler execution time
//! - `job_queue_stream_depth` - gauge of ready/retry/dead-letter depth
//! - `job_queue_promoted_total` - counter of retry entries promoted

use std::sync::OnceLock;

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

static PROMETHEUS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

pub mod names {
    pub const JOBS_TOTAL: &str = "job_queue_jobs_total";
    pub const JOB_DURATION: &str = "job_queue_job_duration_seconds";
    pub const STREAM_DEPTH: &str = "job_queue_stream_depth";
    pub const PROMOTED_TOTAL: &str = "job_queue_promoted_total";
}

/// Terminal or near-terminal outcome of a single `process(id)` run.
#[derive(Debug, Clone, Copy)]
pub enum JobOutcome {
    Completed,
    Retrying,
    DeadLetter,
}

impl JobOutcome {
    fn as_str(self) -> &'static str {
        match self {
            Self::Completed => "completed",
            Self::Retrying => "retrying",
            Self::DeadLetter => "dead_letter",
        }
    }
}

/// Which broker-hosted collection a depth gauge describes.
#[derive(Debug, Clone, Copy)]
pub enum StreamName {
    Ready,
    Retry,
    DeadLetter,
}

impl StreamName {
    fn as_str(self) -> &'static str {
        match self {
            Self::Ready => "ready",
            Self::Retry => "retry",
            Self::DeadLetter => "dead_letter",
        }
    }
}

/// Install the Prometheus recorder. Idempotent; call once at startup.
pub fn init_metrics() -> PrometheusHandle {
    PROMETHEUS_HANDLE
        .get_or_init(|| {
            PrometheusBuilder::new()
                .install_recorder()
                .expect("failed to install Prometheus recorder")
        })
        .clone()
}

/// Returns `None` if [`init_metrics`] hasn't run yet.
pub fn get_metrics_handle() -> Option<PrometheusHandle> {
    PROMETHEUS_HANDLE.get().cloned()
}

/// Record a completed, retrying, or dead-lettered job.
pub fn record_outcome(outcome: JobOutcome) {
    counter!(names::JOBS_TOTAL, "outcome" => outcome.as_str()).increment(1);
}

/// Record the handler execution time for a `process(id)` run.
pub fn record_duration(duration_ms: u64) {
    histogram!(names::JOB_DURATION).record(duration_ms as f64 / 1000.0);
}

/// Update a stream depth gauge.
pub fn set_stream_depth(stream: StreamName, depth: i64) {
    gauge!(names::STREAM_DEPTH, "stream" => stream.as_str()).set(depth as f64);
}

/// Record a batch of retry entries promoted to ready by the scheduler.
pub fn record_promoted(count: usize) {
    if count > 0 {
        counter!(names::PROMOTED_TOTAL).increment(count as u64);
    }
}
