//! Job intake routes: create, fetch, and list jobs.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use domain_jobs::{CreateJob, JobError, JobFilter, JobResponse};
use tracing::{error, info, warn};
use uuid::Uuid;
use validator::Validate;

use crate::state::AppState;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", post(create_job).get(list_jobs))
        .route("/{id}", get(get_job))
        .with_state(state)
}

/// Insert the job row, then push its id onto the ready stream. These two
/// steps are not transactional: a crash between them leaves a `pending` row
/// that nothing will ever dequeue. That gap is accepted rather than papered
/// over with a compensating transaction or outbox.
async fn create_job(
    State(state): State<AppState>,
    Json(input): Json<CreateJob>,
) -> Result<(StatusCode, Json<JobResponse>), (StatusCode, String)> {
    input
        .validate()
        .map_err(|e| (StatusCode::BAD_REQUEST, e.to_string()))?;

    if let Some(key) = input.idempotency_key.as_deref() {
        if let Some(existing) = state
            .repository
            .get_by_idempotency_key(key)
            .await
            .map_err(internal_error)?
        {
            info!(job_id = %existing.id, idempotency_key = key, "idempotency pre-check hit, returning existing job");
            return Ok((StatusCode::OK, Json(existing.into())));
        }
    }

    let idempotency_key = input.idempotency_key.clone();
    match state.repository.create(input).await {
        Ok(job) => {
            if let Err(e) = state.streams.ready_push(job.id).await {
                error!(job_id = %job.id, error = %e, "job persisted but could not be pushed to ready stream");
            }
            Ok((StatusCode::CREATED, Json(job.into())))
        }
        Err(JobError::DuplicateIdempotencyKey) => {
            // Lost the race between the pre-check and the insert. The row
            // that won is the authoritative one; return it instead of
            // erroring the producer.
            let key = idempotency_key.as_deref().unwrap_or_default();
            warn!(idempotency_key = key, "idempotency key race on insert, refetching winner");
            let existing = state
                .repository
                .get_by_idempotency_key(key)
                .await
                .map_err(internal_error)?
                .ok_or_else(|| {
                    (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        "duplicate key reported but no row found".to_string(),
                    )
                })?;
            Ok((StatusCode::OK, Json(existing.into())))
        }
        Err(JobError::Validation(msg)) => Err((StatusCode::BAD_REQUEST, msg)),
        Err(e) => Err(internal_error(e)),
    }
}

async fn get_job(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<JobResponse>, (StatusCode, String)> {
    state
        .repository
        .get_by_id(id)
        .await
        .map_err(internal_error)?
        .map(|job| Json(job.into()))
        .ok_or((StatusCode::NOT_FOUND, "job not found".to_string()))
}

async fn list_jobs(
    State(state): State<AppState>,
    Query(filter): Query<JobFilter>,
) -> Result<Json<Vec<JobResponse>>, (StatusCode, String)> {
    let jobs = state
        .repository
        .list(filter)
        .await
        .map_err(internal_error)?;
    Ok(Json(jobs.into_iter().map(Into::into).collect()))
}

fn internal_error(e: JobError) -> (StatusCode, String) {
    (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
}
