//! Worker Dispatcher: pops ready ids, enforces per-process
//! concurrency, claims and executes jobs, writes outcomes.

use std::sync::Arc;
use std::time::{Duration, Instant};

use domain_jobs::{Job, JobRepository, JobStatus};
use tokio::sync::{Semaphore, watch};
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::error::StreamError;
use crate::metrics::{self, JobOutcome};
use crate::registry::HandlerRegistry;
use crate::streams::Streams;

/// Bounds parallel handler execution and pops ready ids until shutdown.
pub struct Dispatcher {
    repository: Arc<dyn JobRepository>,
    streams: Streams,
    registry: Arc<HandlerRegistry>,
    semaphore: Arc<Semaphore>,
    poll_timeout: Duration,
}

impl Dispatcher {
    pub fn new(
        repository: Arc<dyn JobRepository>,
        streams: Streams,
        registry: Arc<HandlerRegistry>,
        max_concurrency: usize,
        poll_timeout: Duration,
    ) -> Self {
        Self {
            repository,
            streams,
            registry,
            semaphore: Arc::new(Semaphore::new(max_concurrency)),
            poll_timeout,
        }
    }

    /// Run the dispatch loop until `shutdown` is set, then await every
    /// in-flight `process(id)` task before returning.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        info!("worker dispatcher starting");
        let mut in_flight: JoinSet<()> = JoinSet::new();

        loop {
            if *shutdown.borrow() {
                info!("dispatcher observed shutdown, no longer popping ready ids");
                break;
            }

            match self.streams.ready_pop().await {
                Ok(Some(id)) => {
                    let permit = Arc::clone(&self.semaphore);
                    let repository = Arc::clone(&self.repository);
                    let streams = self.streams.clone();
                    let registry = Arc::clone(&self.registry);

                    in_flight.spawn(async move {
                        let _permit = permit
                            .acquire_owned()
                            .await
                            .expect("dispatcher semaphore never closes");
                        process(repository.as_ref(), &streams, registry.as_ref(), id).await;
                    });
                }
                Ok(None) => {
                    tokio::select! {
                        _ = shutdown.changed() => {
                            if *shutdown.borrow() {
                                info!("dispatcher observed shutdown during poll sleep");
                                break;
                            }
                        }
                        _ = tokio::time::sleep(self.poll_timeout) => {}
                    }
                }
                Err(StreamError::MalformedEntry(raw)) => {
                    warn!(entry = %raw, "malformed ready stream entry, discarding");
                }
                Err(e) => {
                    warn!(error = %e, "ready stream read failed, backing off");
                    tokio::time::sleep(Duration::from_secs(1)).await;
                }
            }
        }

        info!(in_flight = in_flight.len(), "draining in-flight jobs");
        while in_flight.join_next().await.is_some() {}
        info!("worker dispatcher stopped");
    }
}

/// The execution protocol for a single job id.
async fn process(
    repository: &dyn JobRepository,
    streams: &Streams,
    registry: &HandlerRegistry,
    id: Uuid,
) {
    let started = Instant::now();

    // Phase A: claim.
    let job = match repository.claim(id).await {
        Ok(Some(job)) => job,
        Ok(None) => {
            debug!(job_id = %id, "claim skipped: missing row or not in a claimable status");
            return;
        }
        Err(e) => {
            error!(job_id = %id, error = %e, "claim failed");
            return;
        }
    };

    info!(job_id = %job.id, job_type = %job.job_type, attempts = job.attempts, "job claimed");

    // Phase B: execute.
    let outcome = registry.dispatch(&job.job_type, &job.payload).await;
    let duration_ms = started.elapsed().as_millis() as u64;

    match outcome {
        Ok(()) => complete(repository, &job, duration_ms).await,
        Err(e) => fail(repository, streams, &job, &e.to_string(), duration_ms).await,
    }
}

async fn complete(repository: &dyn JobRepository, job: &Job, duration_ms: u64) {
    if let Err(e) = repository.mark_completed(job.id).await {
        error!(job_id = %job.id, error = %e, "failed to record completion");
        return;
    }
    metrics::record_outcome(JobOutcome::Completed);
    metrics::record_duration(duration_ms);
    info!(
        job_id = %job.id,
        job_type = %job.job_type,
        attempts = job.attempts,
        duration_ms,
        "job completed"
    );
}

async fn fail(
    repository: &dyn JobRepository,
    streams: &Streams,
    job: &Job,
    error: &str,
    duration_ms: u64,
) {
    // Reload so `attempts` reflects the post-claim increment even if this
    // task raced with another outcome writer.
    let current = match repository.get_by_id(job.id).await {
        Ok(Some(current)) => current,
        Ok(None) => {
            error!(job_id = %job.id, "job vanished before outcome could be recorded");
            return;
        }
        Err(e) => {
            error!(job_id = %job.id, error = %e, "failed to reload job for outcome");
            return;
        }
    };

    if current.status != JobStatus::Processing {
        warn!(job_id = %job.id, status = %current.status, "job no longer processing, skipping outcome write");
        return;
    }

    if !current.retries_exhausted() {
        let delay = Job::retry_delay_secs(current.attempts);
        let due_at = chrono::Utc::now().timestamp() + delay;

        if let Err(e) = repository.mark_retrying(job.id, error).await {
            error!(job_id = %job.id, error = %e, "failed to record retrying outcome");
            return;
        }
        if let Err(e) = streams.retry_add(job.id, due_at).await {
            error!(job_id = %job.id, error = %e, "failed to enqueue retry entry");
            return;
        }

        metrics::record_outcome(JobOutcome::Retrying);
        metrics::record_duration(duration_ms);
        warn!(
            job_id = %job.id,
            job_type = %job.job_type,
            attempts = current.attempts,
            error,
            duration_ms,
            retry_delay_s = delay,
            "job failed, scheduled for retry"
        );
    } else {
        if let Err(e) = repository.mark_dead_letter(job.id, error).await {
            error!(job_id = %job.id, error = %e, "failed to record dead-letter outcome");
            return;
        }
        if let Err(e) = streams.dead_letter_push(job.id).await {
            error!(job_id = %job.id, error = %e, "failed to enqueue dead-letter entry");
            return;
        }

        metrics::record_outcome(JobOutcome::DeadLetter);
        metrics::record_duration(duration_ms);
        error!(
            job_id = %job.id,
            job_type = %job.job_type,
            attempts = current.attempts,
            error,
            duration_ms,
            "job exhausted retries, moved to dead letter"
        );
    }
}
