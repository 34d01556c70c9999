//! Durable job execution pipeline.
//!
//! The Job Store (`domain_jobs`) is the source of truth for a job's status,
//! attempts, and error history. This crate owns everything that moves a job
//! through that lifecycle once it has been persisted:
//!
//! - [`streams`] — the ready/retry/dead-letter broker collections and the
//!   atomic `promote_due` promotion.
//! - [`registry`] — the immutable `type -> handler` mapping.
//! - [`dispatcher`] — pops ready ids, claims, executes, and records
//!   outcomes.
//! - [`scheduler`] — periodically promotes due retries back to ready.
//! - [`lifecycle`] — wires the above into a [`lifecycle::Runtime`] and
//!   handles graceful shutdown.
//! - [`health`] and [`metrics`] — the worker process's ambient HTTP surface.
//!
//! # Example
//!
//! ```rust,ignore
//! use job_queue::{HandlerRegistry, Runtime, Streams, WorkerConfig};
//!
//! let registry = HandlerRegistry::default()
//!     .register("email.send", Arc::new(my_email_handler));
//! let runtime = Runtime::new(repository, streams, Arc::new(registry), config);
//! runtime.run(shutdown_rx).await;
//! ```

pub mod config;
pub mod dispatcher;
pub mod error;
pub mod health;
pub mod lifecycle;
pub mod metrics;
pub mod registry;
pub mod scheduler;
pub mod streams;

pub use config::WorkerConfig;
pub use dispatcher::Dispatcher;
pub use error::{DispatchError, DispatchResult, HandlerError, HandlerResult, StreamError, StreamResult};
pub use health::{HealthState, health_handler, health_router, metrics_handler, ready_handler};
pub use lifecycle::{Runtime, shutdown_signal};
pub use registry::{HandlerRegistry, JobHandler};
pub use scheduler::RetryScheduler;
pub use streams::{DEFAULT_PROMOTE_BATCH_CAP, Streams};
