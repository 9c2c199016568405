//! Reference [`Publisher`] used where the real topic-publishing SDK is out
//! of scope (see the publisher port doc): logs the outbound message and
//! mints a message id locally, like a no-op adapter.

use async_trait::async_trait;
use tracing::info;
use uuid::Uuid;

use crate::error::PublishError;
use crate::ports::Publisher;

pub struct LoggingPublisher;

#[async_trait]
impl Publisher for LoggingPublisher {
    async fn publish(&self, topic: &str, body: serde_json::Value) -> Result<String, PublishError> {
        let message_id = Uuid::new_v4().to_string();
        info!(topic, message_id = %message_id, body = %body, "publishing message");
        Ok(message_id)
    }
}
