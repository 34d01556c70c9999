use axum::Router;

pub mod jobs;

/// Job routes, to be nested under `/jobs` by the caller.
pub fn routes(state: crate::state::AppState) -> Router {
    Router::new().nest("/jobs", jobs::router(state))
}
