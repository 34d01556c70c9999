//! Error taxonomy for the streams broker, dispatcher, and scheduler.

use thiserror::Error;

/// Errors raised by the streams broker (ready/retry/dead-letter).
#[derive(Error, Debug)]
pub enum StreamError {
    #[error("redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("malformed queue entry: {0}")]
    MalformedEntry(String),
}

pub type StreamResult<T> = Result<T, StreamError>;

/// Outcome of a handler invocation.
///
/// Represented as a tagged result rather than a raised exception so the
/// dispatcher branches on the tag instead of catching panics.
#[derive(Error, Debug)]
pub enum HandlerError {
    #[error("unknown job type: {0}")]
    UnknownType(String),

    #[error("{0}")]
    Failed(String),
}

pub type HandlerResult<T> = Result<T, HandlerError>;

/// Errors surfaced by the dispatcher and scheduler loops themselves.
///
/// These never propagate out of the core's run loops; they are logged and
/// the loop continues, per the "nothing in the core panics" policy.
#[derive(Error, Debug)]
pub enum DispatchError {
    #[error("job store error: {0}")]
    JobStore(#[from] domain_jobs::JobError),

    #[error("streams error: {0}")]
    Stream(#[from] StreamError),
}

pub type DispatchResult<T> = Result<T, DispatchError>;
