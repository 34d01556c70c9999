//! Job store domain.
//!
//! Owns the durable `Job` record: the source of truth for status, attempts,
//! error, and timestamps. The worker dispatcher and retry scheduler (in
//! `job_queue`) are the only callers that mutate jobs, via the transactional
//! operations on [`JobRepository`].

pub mod entity;
pub mod error;
pub mod models;
pub mod postgres;
pub mod repository;

pub use error::{JobError, JobResult};
pub use models::{
    CreateJob, DEFAULT_MAX_ATTEMPTS, ERROR_MESSAGE_MAX_LEN, Job, JobFilter, JobResponse,
    JobStatus, truncate_error,
};
pub use postgres::PgJobRepository;
pub use repository::JobRepository;
