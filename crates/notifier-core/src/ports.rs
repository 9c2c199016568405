//! External collaborators the processor is built against, injected at
//! construction so every dependency (datastore, caches, publisher, clock)
//! can be swapped for a fake in tests. No concrete queue/topic SDK or HTTP
//! catalog client is a hard dependency of this crate; only the traits are.

use async_trait::async_trait;

use crate::error::{CacheError, DatastoreError, PublishError, QueueError};

/// Persists and queries which (user_id, client_id) pairs have logged in.
#[async_trait]
pub trait Datastore: Send + Sync {
    /// Idempotent insert; duplicate pairs must not error.
    async fn store_login(&self, user_id: &str, client_id: &str) -> Result<(), DatastoreError>;

    /// All client_ids the user has logged into. Order is unspecified;
    /// duplicates must not appear.
    async fn fetch_client_ids(&self, user_id: &str) -> Result<Vec<String>, DatastoreError>;
}

/// Publishes one message to a named outbound topic.
#[async_trait]
pub trait Publisher: Send + Sync {
    /// Returns the broker-assigned message id on success.
    async fn publish(&self, topic: &str, body: serde_json::Value) -> Result<String, PublishError>;
}

/// A single message pulled from the upstream queue.
#[derive(Debug, Clone)]
pub struct QueueMessage {
    /// Raw UTF-8 JSON payload, not yet decoded.
    pub body: Vec<u8>,
    /// Opaque handle used to acknowledge or otherwise settle the message.
    /// Not used by the processor directly; owned by the concrete queue
    /// adapter and surfaced here only so a fuller adapter could extend this
    /// struct (e.g. visibility-timeout extension) without changing the port.
    pub receipt: String,
}

/// Pull-based upstream queue consumer.
#[async_trait]
pub trait QueueSource: Send + Sync {
    /// Fetch up to `max` messages. May return fewer, including zero, if
    /// none are currently available; callers should poll again.
    async fn receive_batch(&self, max: usize) -> Result<Vec<QueueMessage>, QueueError>;
}

/// Fetches a full catalog snapshot for a self-updating cache.
#[async_trait]
pub trait CatalogSource<T>: Send + Sync {
    async fn fetch(&self) -> Result<T, CacheError>;
}
