//! Handler tests for the HTTP intake surface: request deserialization,
//! response shape, status codes, and the insert-then-push producer contract
//! from a real (containerized) Postgres and Redis, without binding to a
//! TCP port.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use domain_jobs::{JobRepository, JobStatus, JobResponse, PgJobRepository};
use http_body_util::BodyExt;
use jobqueue_api::build_app;
use jobqueue_api::state::AppState;
use job_queue::{HealthState, Streams};
use serde_json::{Value, json};
use test_utils::{TestDatabase, TestRedis};
use tower::ServiceExt;

async fn json_body<T: serde::de::DeserializeOwned>(body: Body) -> T {
    let bytes = body.collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

async fn test_app(db: &TestDatabase, redis: &TestRedis) -> (axum::Router, AppState) {
    let client = redis::Client::open(redis.connection_string().to_string()).unwrap();
    let conn = client.get_connection_manager().await.unwrap();
    let streams = Streams::new(conn, "ready", "retry", "dlq");

    let state = AppState {
        repository: Arc::new(PgJobRepository::new(db.connection())),
        streams: streams.clone(),
    };

    let health_state = HealthState {
        db: db.connection(),
        streams,
        app_name: "jobqueue-api-test".to_string(),
        app_version: "test".to_string(),
    };

    (build_app(state.clone(), health_state), state)
}

fn post_jobs(body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/jobs")
        .header("content-type", "application/json")
        .body(Body::from(serde_json::to_string(&body).unwrap()))
        .unwrap()
}

#[tokio::test]
async fn create_job_returns_201_and_pushes_to_ready() {
    let db = TestDatabase::new().await;
    let redis = TestRedis::new().await;
    let (app, state) = test_app(&db, &redis).await;

    let request = post_jobs(json!({
        "type": "email.send",
        "payload": {"to": "a@x"},
        "max_attempts": 3
    }));

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    let job: JobResponse = json_body(response.into_body()).await;
    assert_eq!(job.job_type, "email.send");
    assert_eq!(job.status, JobStatus::Pending);
    assert_eq!(job.attempts, 0);

    assert_eq!(state.streams.ready_depth().await.unwrap(), 1);
}

#[tokio::test]
async fn create_job_rejects_empty_type() {
    let db = TestDatabase::new().await;
    let redis = TestRedis::new().await;
    let (app, _state) = test_app(&db, &redis).await;

    let request = post_jobs(json!({"type": "", "payload": {}}));
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn create_job_is_idempotent_on_repeated_key() {
    let db = TestDatabase::new().await;
    let redis = TestRedis::new().await;
    let (app, state) = test_app(&db, &redis).await;

    let body = json!({
        "type": "email.send",
        "payload": {},
        "idempotency_key": "order-42"
    });

    let first = app.clone().oneshot(post_jobs(body.clone())).await.unwrap();
    assert_eq!(first.status(), StatusCode::CREATED);
    let first_job: JobResponse = json_body(first.into_body()).await;

    let second = app.oneshot(post_jobs(body)).await.unwrap();
    assert_eq!(second.status(), StatusCode::OK);
    let second_job: JobResponse = json_body(second.into_body()).await;

    assert_eq!(first_job.id, second_job.id);
    // Only the first insert should have pushed to ready.
    assert_eq!(state.streams.ready_depth().await.unwrap(), 1);
}

#[tokio::test]
async fn get_job_returns_404_for_unknown_id() {
    let db = TestDatabase::new().await;
    let redis = TestRedis::new().await;
    let (app, _state) = test_app(&db, &redis).await;

    let request = Request::builder()
        .method("GET")
        .uri(format!("/jobs/{}", uuid::Uuid::new_v4()))
        .body(Body::empty())
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn get_job_returns_the_created_job() {
    let db = TestDatabase::new().await;
    let redis = TestRedis::new().await;
    let (app, _state) = test_app(&db, &redis).await;

    let create_response = app
        .clone()
        .oneshot(post_jobs(json!({"type": "report.generate", "payload": {}})))
        .await
        .unwrap();
    let created: JobResponse = json_body(create_response.into_body()).await;

    let request = Request::builder()
        .method("GET")
        .uri(format!("/jobs/{}", created.id))
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let fetched: JobResponse = json_body(response.into_body()).await;
    assert_eq!(fetched.id, created.id);
}

#[tokio::test]
async fn list_jobs_filters_by_status() {
    let db = TestDatabase::new().await;
    let redis = TestRedis::new().await;
    let (app, state) = test_app(&db, &redis).await;

    for _ in 0..2 {
        app.clone()
            .oneshot(post_jobs(json!({"type": "email.send", "payload": {}})))
            .await
            .unwrap();
    }

    // Drive one job to completion through the repository directly, so the
    // list filter has more than one status represented.
    let jobs = state
        .repository
        .list(domain_jobs::JobFilter {
            status: None,
            limit: 50,
            offset: 0,
        })
        .await
        .unwrap();
    let target = &jobs[0];
    state.repository.claim(target.id).await.unwrap();
    state.repository.mark_completed(target.id).await.unwrap();

    let request = Request::builder()
        .method("GET")
        .uri("/jobs?status=completed")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let completed: Vec<JobResponse> = json_body(response.into_body()).await;
    assert_eq!(completed.len(), 1);
    assert_eq!(completed[0].id, target.id);
}

#[tokio::test]
async fn health_and_ready_endpoints_are_reachable() {
    let db = TestDatabase::new().await;
    let redis = TestRedis::new().await;
    let (app, _state) = test_app(&db, &redis).await;

    let health = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/health")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(health.status(), StatusCode::OK);

    let ready = app
        .oneshot(Request::builder().uri("/ready").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(ready.status(), StatusCode::OK);
}
