use thiserror::Error;

/// Transient I/O failure from a backing store or outbound port.
///
/// Surfaced to the consumer loop, which lets the upstream queue redeliver
/// the message rather than acknowledging it.
#[derive(Debug, Error)]
pub enum DatastoreError {
    #[error("datastore operation timed out")]
    Timeout,
    #[error("transient datastore error: {0}")]
    Transient(String),
    #[error("datastore constraint violation: {0}")]
    Constraint(String),
}

#[derive(Debug, Error)]
pub enum PublishError {
    #[error("publish operation timed out")]
    Timeout,
    #[error("transient publish error: {0}")]
    Transient(String),
}

#[derive(Debug, Error)]
pub enum QueueError {
    #[error("queue poll timed out")]
    Timeout,
    #[error("transient queue error: {0}")]
    Transient(String),
}

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("catalog fetch failed: {0}")]
    Fetch(String),
    #[error("catalog payload malformed: {0}")]
    Malformed(String),
}

/// Top-level error returned by a single message handler.
///
/// Every variant corresponds to one of the error kinds in the error-handling
/// design: only [`HandlerError::Datastore`] and [`HandlerError::Publish`]
/// are retriable (they mean "redeliver this message"); [`HandlerError::Panicked`]
/// means a dispatch branch that should be unreachable was hit, which is a
/// programming-invariant violation rather than an I/O failure, but is still
/// treated as a redeliverable per-handler failure rather than a process abort.
#[derive(Debug, Error)]
pub enum HandlerError {
    #[error("datastore error: {0}")]
    Datastore(#[from] DatastoreError),
    #[error("publish error: {0}")]
    Publish(#[from] PublishError),
    #[error("handler task panicked: {0}")]
    Panicked(String),
}

/// Fatal startup error: a self-updating cache's first refresh failed.
#[derive(Debug, Error)]
#[error("fatal startup error: {0}")]
pub struct StartupError(pub String);

impl From<CacheError> for StartupError {
    fn from(e: CacheError) -> Self {
        StartupError(e.to_string())
    }
}
