use async_trait::async_trait;
use sea_orm::ActiveValue::Set;
use sea_orm::{
    ColumnTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter, QueryOrder, QuerySelect,
    TransactionTrait,
};
use uuid::Uuid;

use crate::{
    entity,
    error::{JobError, JobResult},
    models::{CreateJob, Job, JobFilter, JobStatus, truncate_error},
    repository::JobRepository,
};

pub struct PgJobRepository {
    db: DatabaseConnection,
}

impl PgJobRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl JobRepository for PgJobRepository {
    async fn create(&self, input: CreateJob) -> JobResult<Job> {
        let now = chrono::Utc::now();
        let active_model = entity::ActiveModel {
            id: Set(Uuid::new_v4()),
            job_type: Set(input.job_type),
            payload: Set(input.payload),
            status: Set(JobStatus::Pending),
            attempts: Set(0),
            max_attempts: Set(input.max_attempts),
            error_message: Set(None),
            idempotency_key: Set(input.idempotency_key),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
        };

        let model = entity::Entity::insert(active_model)
            .exec_with_returning(&self.db)
            .await
            .map_err(map_insert_error)?;

        tracing::info!(job_id = %model.id, job_type = %model.job_type, "job received");
        Ok(model.into())
    }

    async fn get_by_id(&self, id: Uuid) -> JobResult<Option<Job>> {
        let model = entity::Entity::find_by_id(id).one(&self.db).await?;
        Ok(model.map(Into::into))
    }

    async fn get_by_idempotency_key(&self, key: &str) -> JobResult<Option<Job>> {
        let model = entity::Entity::find()
            .filter(entity::Column::IdempotencyKey.eq(key))
            .one(&self.db)
            .await?;
        Ok(model.map(Into::into))
    }

    async fn list(&self, filter: JobFilter) -> JobResult<Vec<Job>> {
        let mut query = entity::Entity::find();

        if let Some(status) = filter.status {
            query = query.filter(entity::Column::Status.eq(status));
        }

        let models = query
            .order_by_desc(entity::Column::CreatedAt)
            .limit(filter.limit)
            .offset(filter.offset)
            .all(&self.db)
            .await?;

        Ok(models.into_iter().map(Into::into).collect())
    }

    async fn claim(&self, id: Uuid) -> JobResult<Option<Job>> {
        let txn = self.db.begin().await?;

        // A single conditional UPDATE makes the claim atomic: two dispatchers
        // racing on the same id can never both flip `pending`/`retrying` to
        // `processing`.
        let result = entity::Entity::update_many()
            .col_expr(
                entity::Column::Status,
                sea_orm::sea_query::Expr::value(JobStatus::Processing),
            )
            .col_expr(
                entity::Column::Attempts,
                sea_orm::sea_query::Expr::col(entity::Column::Attempts).add(1),
            )
            .col_expr(
                entity::Column::UpdatedAt,
                sea_orm::sea_query::Expr::value(chrono::Utc::now()),
            )
            .filter(entity::Column::Id.eq(id))
            .filter(
                entity::Column::Status
                    .eq(JobStatus::Pending)
                    .or(entity::Column::Status.eq(JobStatus::Retrying)),
            )
            .exec(&txn)
            .await?;

        if result.rows_affected == 0 {
            txn.commit().await?;
            return Ok(None);
        }

        let claimed = entity::Entity::find_by_id(id).one(&txn).await?;
        txn.commit().await?;
        Ok(claimed.map(Into::into))
    }

    async fn mark_completed(&self, id: Uuid) -> JobResult<()> {
        let txn = self.db.begin().await?;
        entity::Entity::update_many()
            .col_expr(
                entity::Column::Status,
                sea_orm::sea_query::Expr::value(JobStatus::Completed),
            )
            .col_expr(
                entity::Column::ErrorMessage,
                sea_orm::sea_query::Expr::value(None::<String>),
            )
            .col_expr(
                entity::Column::UpdatedAt,
                sea_orm::sea_query::Expr::value(chrono::Utc::now()),
            )
            .filter(entity::Column::Id.eq(id))
            .exec(&txn)
            .await?;
        txn.commit().await?;
        Ok(())
    }

    async fn mark_retrying(&self, id: Uuid, error_message: &str) -> JobResult<()> {
        let txn = self.db.begin().await?;
        entity::Entity::update_many()
            .col_expr(
                entity::Column::Status,
                sea_orm::sea_query::Expr::value(JobStatus::Retrying),
            )
            .col_expr(
                entity::Column::ErrorMessage,
                sea_orm::sea_query::Expr::value(Some(truncate_error(error_message))),
            )
            .col_expr(
                entity::Column::UpdatedAt,
                sea_orm::sea_query::Expr::value(chrono::Utc::now()),
            )
            .filter(entity::Column::Id.eq(id))
            .exec(&txn)
            .await?;
        txn.commit().await?;
        Ok(())
    }

    async fn mark_dead_letter(&self, id: Uuid, error_message: &str) -> JobResult<()> {
        let txn = self.db.begin().await?;
        entity::Entity::update_many()
            .col_expr(
                entity::Column::Status,
                sea_orm::sea_query::Expr::value(JobStatus::DeadLetter),
            )
            .col_expr(
                entity::Column::ErrorMessage,
                sea_orm::sea_query::Expr::value(Some(truncate_error(error_message))),
            )
            .col_expr(
                entity::Column::UpdatedAt,
                sea_orm::sea_query::Expr::value(chrono::Utc::now()),
            )
            .filter(entity::Column::Id.eq(id))
            .exec(&txn)
            .await?;
        txn.commit().await?;
        Ok(())
    }
}

fn map_insert_error(err: DbErr) -> JobError {
    let message = err.to_string();
    if message.contains("idempotency_key") && message.contains("unique") {
        JobError::DuplicateIdempotencyKey
    } else {
        JobError::Database(err)
    }
}
