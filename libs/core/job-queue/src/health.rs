//! Worker process health surface: `/health`, `/ready`, `/metrics`.

use axum::extract::State;
use axum::http::{StatusCode, header};
use axum::response::IntoResponse;
use axum::{Json, Router, routing::get};
use sea_orm::{ConnectionTrait, DatabaseConnection, Statement};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::metrics::{self, StreamName};
use crate::streams::Streams;

#[derive(Clone)]
pub struct HealthState {
    pub db: DatabaseConnection,
    pub streams: Streams,
    pub app_name: String,
    pub app_version: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub name: String,
    pub version: String,
}

/// Liveness probe: always OK if the process is serving HTTP at all.
pub async fn health_handler(State(state): State<HealthState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        name: state.app_name,
        version: state.app_version,
    })
}

/// Readiness probe: checks database and broker reachability.
pub async fn ready_handler(
    State(state): State<HealthState>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    let db_check = state
        .db
        .execute(Statement::from_string(
            state.db.get_database_backend(),
            "SELECT 1",
        ))
        .await;

    let redis_check = state.streams.ready_depth().await;

    match (db_check, redis_check) {
        (Ok(_), Ok(_)) => Ok(Json(json!({
            "status": "ready",
            "checks": { "database": "ok", "redis": "ok" },
        }))),
        (db, redis) => Err((
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({
                "status": "not_ready",
                "checks": {
                    "database": db.err().map(|e| e.to_string()).unwrap_or_else(|| "ok".to_string()),
                    "redis": redis.err().map(|e| e.to_string()).unwrap_or_else(|| "ok".to_string()),
                },
            })),
        )),
    }
}

/// Prometheus-format metrics endpoint. Also refreshes the stream depth
/// gauges on scrape, since they're cheap point reads rather than something
/// worth polling continuously from the dispatcher/scheduler hot path.
pub async fn metrics_handler(State(state): State<HealthState>) -> impl IntoResponse {
    if let Ok(depth) = state.streams.ready_depth().await {
        metrics::set_stream_depth(StreamName::Ready, depth);
    }
    if let Ok(depth) = state.streams.retry_depth().await {
        metrics::set_stream_depth(StreamName::Retry, depth);
    }
    if let Ok(depth) = state.streams.dead_letter_depth().await {
        metrics::set_stream_depth(StreamName::DeadLetter, depth);
    }

    match metrics::get_metrics_handle() {
        Some(handle) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
            handle.render(),
        )
            .into_response(),
        None => (
            StatusCode::SERVICE_UNAVAILABLE,
            [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
            "metrics not initialized".to_string(),
        )
            .into_response(),
    }
}

/// Standard health/ready/metrics router for the worker binary.
pub fn health_router(state: HealthState) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/healthz", get(health_handler))
        .route("/ready", get(ready_handler))
        .route("/readyz", get(ready_handler))
        .route("/metrics", get(metrics_handler))
        .with_state(state)
}
