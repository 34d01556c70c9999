//! Integration tests for the job store, backed by real PostgreSQL via
//! testcontainers. Covers the invariants in SPEC_FULL §3 and §8: attempt
//! budget, terminal-state stability, claim atomicity, and idempotency-key
//! sparse uniqueness.

use domain_jobs::{CreateJob, JobError, JobFilter, JobRepository, JobStatus, PgJobRepository};
use serde_json::json;
use test_utils::TestDatabase;

fn sample_job(job_type: &str) -> CreateJob {
    CreateJob {
        job_type: job_type.to_string(),
        payload: json!({"k": "v"}),
        max_attempts: 3,
        idempotency_key: None,
    }
}

#[tokio::test]
async fn create_and_get_round_trip() {
    let db = TestDatabase::new().await;
    let repo = PgJobRepository::new(db.connection());

    let created = repo.create(sample_job("email.send")).await.unwrap();
    assert_eq!(created.status, JobStatus::Pending);
    assert_eq!(created.attempts, 0);
    assert_eq!(created.max_attempts, 3);
    assert!(created.error_message.is_none());

    let fetched = repo.get_by_id(created.id).await.unwrap().unwrap();
    assert_eq!(fetched.id, created.id);
    assert_eq!(fetched.job_type, "email.send");
}

#[tokio::test]
async fn get_by_id_missing_row_is_none_not_error() {
    let db = TestDatabase::new().await;
    let repo = PgJobRepository::new(db.connection());

    let result = repo.get_by_id(uuid::Uuid::new_v4()).await.unwrap();
    assert!(result.is_none());
}

#[tokio::test]
async fn idempotency_key_is_sparse_unique() {
    let db = TestDatabase::new().await;
    let repo = PgJobRepository::new(db.connection());

    let mut first = sample_job("email.send");
    first.idempotency_key = Some("order-123".to_string());
    repo.create(first).await.unwrap();

    let mut second = sample_job("email.send");
    second.idempotency_key = Some("order-123".to_string());
    let err = repo.create(second).await.unwrap_err();
    assert!(matches!(err, JobError::DuplicateIdempotencyKey));

    // Absent idempotency keys never collide with each other.
    repo.create(sample_job("email.send")).await.unwrap();
    repo.create(sample_job("email.send")).await.unwrap();
}

#[tokio::test]
async fn get_by_idempotency_key_finds_the_row() {
    let db = TestDatabase::new().await;
    let repo = PgJobRepository::new(db.connection());

    let mut input = sample_job("report.generate");
    input.idempotency_key = Some("report-7".to_string());
    let created = repo.create(input).await.unwrap();

    let found = repo
        .get_by_idempotency_key("report-7")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(found.id, created.id);

    let missing = repo.get_by_idempotency_key("no-such-key").await.unwrap();
    assert!(missing.is_none());
}

#[tokio::test]
async fn claim_transitions_pending_to_processing_and_increments_attempts() {
    let db = TestDatabase::new().await;
    let repo = PgJobRepository::new(db.connection());

    let created = repo.create(sample_job("email.send")).await.unwrap();
    let claimed = repo.claim(created.id).await.unwrap().unwrap();

    assert_eq!(claimed.status, JobStatus::Processing);
    assert_eq!(claimed.attempts, 1);
}

#[tokio::test]
async fn claim_is_a_no_op_on_an_already_processing_job() {
    let db = TestDatabase::new().await;
    let repo = PgJobRepository::new(db.connection());

    let created = repo.create(sample_job("email.send")).await.unwrap();
    repo.claim(created.id).await.unwrap().unwrap();

    // A second claim attempt (simulating a racing dispatcher) sees the row
    // is no longer claimable and returns None without mutating it further.
    let second = repo.claim(created.id).await.unwrap();
    assert!(second.is_none());

    let after = repo.get_by_id(created.id).await.unwrap().unwrap();
    assert_eq!(after.attempts, 1, "second claim must not double-increment");
}

#[tokio::test]
async fn claim_on_unknown_id_returns_none() {
    let db = TestDatabase::new().await;
    let repo = PgJobRepository::new(db.connection());

    let claimed = repo.claim(uuid::Uuid::new_v4()).await.unwrap();
    assert!(claimed.is_none());
}

#[tokio::test]
async fn claim_accepts_retrying_as_well_as_pending() {
    let db = TestDatabase::new().await;
    let repo = PgJobRepository::new(db.connection());

    let created = repo.create(sample_job("email.send")).await.unwrap();
    repo.claim(created.id).await.unwrap();
    repo.mark_retrying(created.id, "transient").await.unwrap();

    let reclaimed = repo.claim(created.id).await.unwrap().unwrap();
    assert_eq!(reclaimed.status, JobStatus::Processing);
    assert_eq!(reclaimed.attempts, 2);
}

#[tokio::test]
async fn mark_completed_clears_error_message() {
    let db = TestDatabase::new().await;
    let repo = PgJobRepository::new(db.connection());

    let created = repo.create(sample_job("email.send")).await.unwrap();
    repo.claim(created.id).await.unwrap();
    repo.mark_retrying(created.id, "boom").await.unwrap();
    repo.claim(created.id).await.unwrap();
    repo.mark_completed(created.id).await.unwrap();

    let after = repo.get_by_id(created.id).await.unwrap().unwrap();
    assert_eq!(after.status, JobStatus::Completed);
    assert!(after.error_message.is_none());
}

#[tokio::test]
async fn mark_retrying_truncates_long_error_messages() {
    let db = TestDatabase::new().await;
    let repo = PgJobRepository::new(db.connection());

    let created = repo.create(sample_job("email.send")).await.unwrap();
    repo.claim(created.id).await.unwrap();

    let long_error = "x".repeat(domain_jobs::ERROR_MESSAGE_MAX_LEN + 1000);
    repo.mark_retrying(created.id, &long_error).await.unwrap();

    let after = repo.get_by_id(created.id).await.unwrap().unwrap();
    assert_eq!(after.status, JobStatus::Retrying);
    assert_eq!(
        after.error_message.unwrap().chars().count(),
        domain_jobs::ERROR_MESSAGE_MAX_LEN
    );
}

#[tokio::test]
async fn mark_dead_letter_is_terminal() {
    let db = TestDatabase::new().await;
    let repo = PgJobRepository::new(db.connection());

    let mut input = sample_job("email.send");
    input.max_attempts = 1;
    let created = repo.create(input).await.unwrap();
    repo.claim(created.id).await.unwrap();
    repo.mark_dead_letter(created.id, "exhausted").await.unwrap();

    let after = repo.get_by_id(created.id).await.unwrap().unwrap();
    assert_eq!(after.status, JobStatus::DeadLetter);
    assert!(after.status.is_terminal());

    // The core never claims out of a terminal status.
    let reclaimed = repo.claim(created.id).await.unwrap();
    assert!(reclaimed.is_none());
}

#[tokio::test]
async fn list_filters_by_status_and_paginates() {
    let db = TestDatabase::new().await;
    let repo = PgJobRepository::new(db.connection());

    for _ in 0..3 {
        repo.create(sample_job("email.send")).await.unwrap();
    }
    let dead = repo.create(sample_job("email.send")).await.unwrap();
    repo.claim(dead.id).await.unwrap();
    repo.mark_dead_letter(dead.id, "nope").await.unwrap();

    let pending = repo
        .list(JobFilter {
            status: Some(JobStatus::Pending),
            limit: 50,
            offset: 0,
        })
        .await
        .unwrap();
    assert_eq!(pending.len(), 3);

    let dead_letter = repo
        .list(JobFilter {
            status: Some(JobStatus::DeadLetter),
            limit: 50,
            offset: 0,
        })
        .await
        .unwrap();
    assert_eq!(dead_letter.len(), 1);
    assert_eq!(dead_letter[0].id, dead.id);

    let page_one = repo
        .list(JobFilter {
            status: None,
            limit: 2,
            offset: 0,
        })
        .await
        .unwrap();
    assert_eq!(page_one.len(), 2);

    let page_two = repo
        .list(JobFilter {
            status: None,
            limit: 2,
            offset: 2,
        })
        .await
        .unwrap();
    assert_eq!(page_two.len(), 2);
    assert_ne!(page_one[0].id, page_two[0].id);
}
