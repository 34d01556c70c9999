use sea_orm_migration::sea_query::extension::postgres::Type;
use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_type(
                Type::create()
                    .as_enum(JobStatus::Enum)
                    .values([
                        JobStatus::Pending,
                        JobStatus::Processing,
                        JobStatus::Retrying,
                        JobStatus::Completed,
                        JobStatus::Failed,
                        JobStatus::DeadLetter,
                    ])
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Jobs::Table)
                    .if_not_exists()
                    .col(pk_uuid(Jobs::Id))
                    .col(string(Jobs::Type))
                    .col(
                        ColumnDef::new(Jobs::Payload)
                            .json_binary()
                            .not_null()
                            .default("{}"),
                    )
                    .col(
                        ColumnDef::new(Jobs::Status)
                            .enumeration(
                                JobStatus::Enum,
                                [
                                    JobStatus::Pending,
                                    JobStatus::Processing,
                                    JobStatus::Retrying,
                                    JobStatus::Completed,
                                    JobStatus::Failed,
                                    JobStatus::DeadLetter,
                                ],
                            )
                            .not_null()
                            .default("pending"),
                    )
                    .col(integer(Jobs::Attempts).default(0))
                    .col(integer(Jobs::MaxAttempts).default(3))
                    .col(text_null(Jobs::ErrorMessage))
                    .col(string_null(Jobs::IdempotencyKey))
                    .col(
                        timestamp_with_time_zone(Jobs::CreatedAt)
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        timestamp_with_time_zone(Jobs::UpdatedAt)
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_jobs_status")
                    .table(Jobs::Table)
                    .col(Jobs::Status)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_jobs_created_at")
                    .table(Jobs::Table)
                    .col(Jobs::CreatedAt)
                    .to_owned(),
            )
            .await?;

        // Sparse unique index: idempotency_key is optional, and only jobs
        // that set one participate in the uniqueness constraint.
        manager
            .get_connection()
            .execute_unprepared(
                r#"
                CREATE UNIQUE INDEX idx_jobs_idempotency_key
                    ON jobs (idempotency_key)
                    WHERE idempotency_key IS NOT NULL
                "#,
            )
            .await?;

        manager
            .get_connection()
            .execute_unprepared(
                r#"
                CREATE TRIGGER jobs_touch_updated_at
                    BEFORE UPDATE ON jobs
                    FOR EACH ROW
                    EXECUTE FUNCTION util.touch_updated_at()
                "#,
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .get_connection()
            .execute_unprepared("DROP TRIGGER IF EXISTS jobs_touch_updated_at ON jobs")
            .await?;

        manager
            .drop_table(Table::drop().table(Jobs::Table).to_owned())
            .await?;

        manager
            .drop_type(Type::drop().name(JobStatus::Enum).to_owned())
            .await?;

        Ok(())
    }
}

#[derive(DeriveIden)]
enum Jobs {
    Table,
    Id,
    #[sea_orm(iden = "type")]
    Type,
    Payload,
    Status,
    Attempts,
    MaxAttempts,
    ErrorMessage,
    IdempotencyKey,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum JobStatus {
    #[sea_orm(iden = "job_status")]
    Enum,
    #[sea_orm(iden = "pending")]
    Pending,
    #[sea_orm(iden = "processing")]
    Processing,
    #[sea_orm(iden = "retrying")]
    Retrying,
    #[sea_orm(iden = "completed")]
    Completed,
    #[sea_orm(iden = "failed")]
    Failed,
    #[sea_orm(iden = "dead_letter")]
    DeadLetter,
}
