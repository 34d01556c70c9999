//! HTTP intake process: validates and persists incoming jobs, then pushes
//! their id onto the ready stream for the worker fleet to pick up.

use std::sync::Arc;

use axum::Router;
use core_config::FromEnv;
use core_config::tracing::{init_tracing, install_color_eyre};
use database::postgres::run_migrations;
use domain_jobs::PgJobRepository;
use job_queue::{HealthState, Streams, WorkerConfig, health_router, shutdown_signal};
use tokio::net::TcpListener;
use tokio::sync::watch;
use tower_http::trace::TraceLayer;
use tracing::info;

pub mod api;
pub mod config;
pub mod state;

use config::Config;
use state::AppState;

/// Build the router for a given [`AppState`], without binding to a port.
/// Split out from [`run`] so tests can exercise it directly with
/// `tower::ServiceExt::oneshot`.
pub fn build_app(state: AppState, health_state: HealthState) -> Router {
    Router::new()
        .merge(api::routes(state))
        .merge(health_router(health_state))
        .layer(TraceLayer::new_for_http())
}

pub async fn run() -> eyre::Result<()> {
    install_color_eyre();

    let config = Config::from_env()?;
    init_tracing(&config.environment);

    let (db, redis) = tokio::try_join!(
        database::postgres::connect_from_config_with_retry(config.database.clone(), None),
        database::redis::connect_from_config_with_retry(config.redis.clone(), None),
    )
    .map_err(|e| eyre::eyre!("failed to connect to backing services: {e}"))?;

    run_migrations::<migration::Migrator>(&db, "jobqueue-api").await?;

    let stream_names = WorkerConfig::from_env()?;
    let streams = Streams::new(
        redis,
        stream_names.queue_name,
        stream_names.retry_queue_name,
        stream_names.dlq_name,
    );

    let health_state = HealthState {
        db: db.clone(),
        streams: streams.clone(),
        app_name: "jobqueue-api".to_string(),
        app_version: env!("CARGO_PKG_VERSION").to_string(),
    };

    let state = AppState {
        repository: Arc::new(PgJobRepository::new(db)),
        streams,
    };

    let app = build_app(state, health_state);

    let listener = TcpListener::bind(("0.0.0.0", config.port)).await?;
    info!(port = config.port, "jobqueue-api listening");

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        shutdown_signal().await;
        let _ = shutdown_tx.send(true);
    });

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            let mut rx = shutdown_rx;
            let _ = rx.changed().await;
        })
        .await?;

    info!("jobqueue-api shut down");
    Ok(())
}
