//! Reference [`QueueSource`]: long-polls a single HTTP endpoint for up to
//! `max` pending messages. The real upstream queue SDK is abstracted behind
//! the port entirely (see [`crate::ports::QueueSource`]); this adapter
//! exists so the service binary has something to run against, the same way
//! [`crate::publisher::LoggingPublisher`] is a reference, not a required,
//! `Publisher`.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

use crate::error::QueueError;
use crate::ports::{QueueMessage, QueueSource};

#[derive(Debug, Deserialize)]
struct RawQueueMessage {
    body: serde_json::Value,
    receipt: String,
}

pub struct HttpLongPollQueueSource {
    client: Client,
    url: String,
}

impl HttpLongPollQueueSource {
    pub fn new(url: impl Into<String>) -> Self {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(5))
            .timeout(Duration::from_secs(30))
            .build()
            .expect("reqwest client builder should not fail with these settings");
        Self { client, url: url.into() }
    }
}

#[async_trait]
impl QueueSource for HttpLongPollQueueSource {
    async fn receive_batch(&self, max: usize) -> Result<Vec<QueueMessage>, QueueError> {
        let resp = self
            .client
            .get(&self.url)
            .query(&[("max", max.to_string())])
            .send()
            .await
            .map_err(|e| QueueError::Transient(e.to_string()))?
            .error_for_status()
            .map_err(|e| QueueError::Transient(e.to_string()))?;
        let raw: Vec<RawQueueMessage> = resp.json().await.map_err(|e| QueueError::Transient(e.to_string()))?;
        Ok(raw
            .into_iter()
            .map(|m| QueueMessage {
                body: serde_json::to_vec(&m.body).unwrap_or_default(),
                receipt: m.receipt,
            })
            .collect())
    }
}
