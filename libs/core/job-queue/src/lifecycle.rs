//! Lifecycle wiring: bundles the job repository, broker, handler registry
//! and config into an explicit [`Runtime`] value constructed once at
//! startup and passed to the dispatcher and scheduler. No process-global
//! handles; both components stay constructible in tests without touching
//! statics.

use std::sync::Arc;
use std::time::Duration;

use domain_jobs::JobRepository;
use tokio::signal;
use tokio::sync::watch;
use tracing::info;

use crate::config::WorkerConfig;
use crate::dispatcher::Dispatcher;
use crate::registry::HandlerRegistry;
use crate::scheduler::RetryScheduler;
use crate::streams::Streams;

/// Everything the dispatcher and scheduler need, wired once at startup.
pub struct Runtime {
    repository: Arc<dyn JobRepository>,
    streams: Streams,
    registry: Arc<HandlerRegistry>,
    config: WorkerConfig,
}

impl Runtime {
    pub fn new(
        repository: Arc<dyn JobRepository>,
        streams: Streams,
        registry: Arc<HandlerRegistry>,
        config: WorkerConfig,
    ) -> Self {
        Self {
            repository,
            streams,
            registry,
            config,
        }
    }

    /// Launch the dispatcher and scheduler concurrently and run them until
    /// `shutdown` fires, then wait for both to finish their drain.
    pub async fn run(self, shutdown: watch::Receiver<bool>) {
        let dispatcher = Dispatcher::new(
            self.repository,
            self.streams.clone(),
            self.registry,
            self.config.max_concurrency,
            Duration::from_secs(self.config.queue_poll_timeout_secs),
        );
        let scheduler = RetryScheduler::new(
            self.streams,
            Duration::from_secs_f64(self.config.retry_poll_interval_secs),
        );

        tokio::join!(
            dispatcher.run(shutdown.clone()),
            scheduler.run(shutdown),
        );
    }
}

/// Resolves once SIGINT or SIGTERM arrives. Callers typically spawn this
/// alongside a `watch::channel(false)` and forward the signal by sending
/// `true`.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("received SIGINT, initiating graceful shutdown"),
        _ = terminate => info!("received SIGTERM, initiating graceful shutdown"),
    }
}
