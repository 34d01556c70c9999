//! Worker process: runs the dispatcher and retry scheduler against the
//! job store and streams broker, and serves the health/metrics surface.

use std::sync::Arc;

use core_config::FromEnv;
use core_config::tracing::{init_tracing, install_color_eyre};
use database::postgres::run_migrations;
use database::postgres::PostgresConfig;
use database::redis::RedisConfig;
use domain_jobs::PgJobRepository;
use job_queue::{HandlerRegistry, HealthState, Runtime, Streams, WorkerConfig, health_router, metrics, shutdown_signal};
use tokio::net::TcpListener;
use tokio::sync::watch;
use tracing::info;

mod handlers;

pub async fn run() -> eyre::Result<()> {
    install_color_eyre();

    let environment = core_config::Environment::from_env();
    init_tracing(&environment);
    metrics::init_metrics();

    let config = WorkerConfig::from_env()?;

    let (db, redis) = tokio::try_join!(
        database::postgres::connect_from_config_with_retry(PostgresConfig::from_env()?, None),
        database::redis::connect_from_config_with_retry(RedisConfig::from_env()?, None),
    )
    .map_err(|e| eyre::eyre!("failed to connect to backing services: {e}"))?;

    run_migrations::<migration::Migrator>(&db, "jobqueue-worker").await?;

    let streams = Streams::new(
        redis,
        config.queue_name.clone(),
        config.retry_queue_name.clone(),
        config.dlq_name.clone(),
    );

    let registry = Arc::new(
        HandlerRegistry::default()
            .register("email.send", Arc::new(handlers::EmailSendHandler))
            .register("report.generate", Arc::new(handlers::ReportGenerateHandler)),
    );

    let health_state = HealthState {
        db: db.clone(),
        streams: streams.clone(),
        app_name: "jobqueue-worker".to_string(),
        app_version: env!("CARGO_PKG_VERSION").to_string(),
    };
    let health_port = config.health_port;

    let repository = Arc::new(PgJobRepository::new(db));
    let runtime = Runtime::new(repository, streams, registry, config);

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let health_server = tokio::spawn(async move {
        let listener = TcpListener::bind(("0.0.0.0", health_port)).await?;
        info!(port = health_port, "health/metrics surface listening");
        axum::serve(listener, health_router(health_state)).await
    });

    tokio::spawn(async move {
        shutdown_signal().await;
        let _ = shutdown_tx.send(true);
    });

    info!("jobqueue-worker starting");
    runtime.run(shutdown_rx).await;
    health_server.abort();

    info!("jobqueue-worker shut down");
    Ok(())
}
