//! Shared application state for the HTTP intake handlers.

use std::sync::Arc;

use domain_jobs::JobRepository;
use job_queue::Streams;

/// Cloned into every handler. `repository` and `streams` are both cheap to
/// clone (`Arc` and an internal `ConnectionManager` respectively).
#[derive(Clone)]
pub struct AppState {
    pub repository: Arc<dyn JobRepository>,
    pub streams: Streams,
}
