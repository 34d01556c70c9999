//! Handler registry.
//!
//! A process-lifetime immutable mapping from job `type` to a handler
//! capability. Built once at startup and shared read-only across every
//! concurrently-running dispatcher task.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::{HandlerError, HandlerResult};

/// A type-specific unit of work.
///
/// Handlers are asynchronous and may suspend on I/O. The registry does not
/// interpret the result payload: success is success, and any failure
/// (including a timeout the handler chooses to enforce on itself) is an
/// execution failure subject to the retry/dead-letter path.
#[async_trait]
pub trait JobHandler: Send + Sync {
    /// Execute the job with the given payload.
    async fn handle(&self, payload: &Value) -> HandlerResult<()>;
}

/// Blanket impl so a plain async closure can be registered directly.
#[async_trait]
impl<F, Fut> JobHandler for F
where
    F: Fn(Value) -> Fut + Send + Sync,
    Fut: std::future::Future<Output = HandlerResult<()>> + Send,
{
    async fn handle(&self, payload: &Value) -> HandlerResult<()> {
        (self)(payload.clone()).await
    }
}

/// Immutable `type -> handler` mapping, built once and shared across tasks.
#[derive(Clone, Default)]
pub struct HandlerRegistry {
    handlers: HashMap<String, Arc<dyn JobHandler>>,
}

impl HandlerRegistry {
    /// Build a registry from a list of `(type, handler)` pairs.
    pub fn new(handlers: Vec<(impl Into<String>, Arc<dyn JobHandler>)>) -> Self {
        Self {
            handlers: handlers.into_iter().map(|(t, h)| (t.into(), h)).collect(),
        }
    }

    /// Register a handler for the given job type, consuming and returning
    /// `self` for builder-style startup wiring.
    pub fn register(mut self, job_type: impl Into<String>, handler: Arc<dyn JobHandler>) -> Self {
        self.handlers.insert(job_type.into(), handler);
        self
    }

    /// Resolve and invoke the handler for `job_type`.
    ///
    /// An unknown type is itself a `HandlerError::UnknownType`, which the
    /// dispatcher treats exactly like any other handler failure.
    pub async fn dispatch(&self, job_type: &str, payload: &Value) -> HandlerResult<()> {
        match self.handlers.get(job_type) {
            Some(handler) => handler.handle(payload).await,
            None => Err(HandlerError::UnknownType(job_type.to_string())),
        }
    }

    /// Number of registered job types.
    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    struct AlwaysOk;

    #[async_trait]
    impl JobHandler for AlwaysOk {
        async fn handle(&self, _payload: &Value) -> HandlerResult<()> {
            Ok(())
        }
    }

    struct AlwaysFails;

    #[async_trait]
    impl JobHandler for AlwaysFails {
        async fn handle(&self, _payload: &Value) -> HandlerResult<()> {
            Err(HandlerError::Failed("boom".to_string()))
        }
    }

    #[tokio::test]
    async fn dispatches_to_registered_handler() {
        let registry =
            HandlerRegistry::default().register("email.send", Arc::new(AlwaysOk));

        assert_eq!(registry.len(), 1);
        registry
            .dispatch("email.send", &json!({"to": "a@x"}))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn unknown_type_is_a_handler_error() {
        let registry = HandlerRegistry::default();
        let err = registry.dispatch("nope", &json!({})).await.unwrap_err();
        assert!(matches!(err, HandlerError::UnknownType(t) if t == "nope"));
    }

    #[tokio::test]
    async fn propagates_handler_failure() {
        let registry =
            HandlerRegistry::default().register("report.generate", Arc::new(AlwaysFails));
        let err = registry
            .dispatch("report.generate", &json!({}))
            .await
            .unwrap_err();
        assert!(matches!(err, HandlerError::Failed(_)));
    }
}
