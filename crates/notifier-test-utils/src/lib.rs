//! In-memory fakes for every port in `notifier-core`, shared between that
//! crate's own unit tests (as a dev-dependency) and `services/processor`'s
//! integration tests.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use notifier_core::catalog::{CapabilityMap, WebhookMap};
use notifier_core::error::{CacheError, DatastoreError, PublishError, QueueError};
use notifier_core::ports::{CatalogSource, Datastore, Publisher, QueueMessage, QueueSource};

/// Records every published (topic, body) pair. Never fails; tests assert on
/// `calls()` rather than injecting failure here -- use [`FailingPublisher`]
/// for failure-path tests.
#[derive(Default)]
pub struct RecordingPublisher {
    calls: Mutex<Vec<(String, serde_json::Value)>>,
}

impl RecordingPublisher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> Vec<(String, serde_json::Value)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl Publisher for RecordingPublisher {
    async fn publish(&self, topic: &str, body: serde_json::Value) -> Result<String, PublishError> {
        self.calls.lock().unwrap().push((topic.to_owned(), body));
        Ok(uuid::Uuid::new_v4().to_string())
    }
}

/// Always fails with a transient error; exercises the fail-the-whole-handler
/// fan-out rule.
pub struct FailingPublisher;

#[async_trait]
impl Publisher for FailingPublisher {
    async fn publish(&self, _topic: &str, _body: serde_json::Value) -> Result<String, PublishError> {
        Err(PublishError::Transient("injected failure".to_owned()))
    }
}

/// Backed by a plain `HashMap<user_id, Vec<client_id>>`; `store_login` is
/// idempotent the way the real upsert is.
#[derive(Default)]
pub struct InMemoryDatastore {
    logins: Mutex<HashMap<String, Vec<String>>>,
}

impl InMemoryDatastore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seed(&self, user_id: impl Into<String>, client_ids: Vec<String>) {
        self.logins.lock().unwrap().insert(user_id.into(), client_ids);
    }

    pub fn logins(&self) -> HashMap<String, Vec<String>> {
        self.logins.lock().unwrap().clone()
    }
}

#[async_trait]
impl Datastore for InMemoryDatastore {
    async fn store_login(&self, user_id: &str, client_id: &str) -> Result<(), DatastoreError> {
        let mut logins = self.logins.lock().unwrap();
        let clients = logins.entry(user_id.to_owned()).or_default();
        if !clients.iter().any(|c| c == client_id) {
            clients.push(client_id.to_owned());
        }
        Ok(())
    }

    async fn fetch_client_ids(&self, user_id: &str) -> Result<Vec<String>, DatastoreError> {
        Ok(self.logins.lock().unwrap().get(user_id).cloned().unwrap_or_default())
    }
}

/// A queue of pre-loaded messages; `receive_batch` drains up to `max` of
/// them per call and returns an empty batch once exhausted, the way a real
/// long-poll consumer returns empty on a quiet queue.
#[derive(Default)]
pub struct InMemoryQueueSource {
    messages: Mutex<Vec<QueueMessage>>,
}

impl InMemoryQueueSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_json(&self, body: serde_json::Value) {
        let bytes = serde_json::to_vec(&body).expect("test fixture body must serialize");
        self.messages.lock().unwrap().push(QueueMessage { body: bytes, receipt: uuid::Uuid::new_v4().to_string() });
    }

    pub fn remaining(&self) -> usize {
        self.messages.lock().unwrap().len()
    }
}

#[async_trait]
impl QueueSource for InMemoryQueueSource {
    async fn receive_batch(&self, max: usize) -> Result<Vec<QueueMessage>, QueueError> {
        let mut messages = self.messages.lock().unwrap();
        let drained = messages.drain(..max.min(messages.len())).collect();
        Ok(drained)
    }
}

/// A fixed catalog snapshot, generic over the map type so it serves both
/// the capability and webhook caches.
pub struct FixedCatalogSource<T>(pub T);

#[async_trait]
impl CatalogSource<CapabilityMap> for FixedCatalogSource<CapabilityMap> {
    async fn fetch(&self) -> Result<CapabilityMap, CacheError> {
        Ok(self.0.clone())
    }
}

#[async_trait]
impl CatalogSource<WebhookMap> for FixedCatalogSource<WebhookMap> {
    async fn fetch(&self) -> Result<WebhookMap, CacheError> {
        Ok(self.0.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn in_memory_queue_source_drains_in_fifo_order_up_to_max() {
        let queue = InMemoryQueueSource::new();
        queue.push_json(serde_json::json!({"event": "a"}));
        queue.push_json(serde_json::json!({"event": "b"}));
        queue.push_json(serde_json::json!({"event": "c"}));

        let first = queue.receive_batch(2).await.unwrap();
        assert_eq!(first.len(), 2);
        assert_eq!(queue.remaining(), 1);

        let second = queue.receive_batch(2).await.unwrap();
        assert_eq!(second.len(), 1);
        assert_eq!(queue.remaining(), 0);
    }

    #[tokio::test]
    async fn in_memory_datastore_store_login_is_idempotent() {
        let datastore = InMemoryDatastore::new();
        datastore.store_login("U1", "C1").await.unwrap();
        datastore.store_login("U1", "C1").await.unwrap();
        assert_eq!(datastore.fetch_client_ids("U1").await.unwrap(), vec!["C1".to_owned()]);
    }
}
