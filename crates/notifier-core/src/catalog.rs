//! Reference `CatalogSource` implementations that fetch a full snapshot of
//! the upstream client catalog over a single HTTP GET.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use notifier_protocol::{CapabilityCatalogEntry, WebhookCatalogEntry};
use reqwest::Client;

use crate::cache::malformed;
use crate::error::CacheError;
use crate::ports::CatalogSource;

/// `client_id -> capabilities`. Vec preserves catalog order; the cache does
/// not need a `HashSet` since the fan-out algorithm never dedupes either.
pub type CapabilityMap = HashMap<String, Vec<String>>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WebhookEntry {
    pub url: String,
    pub enabled: bool,
}

pub type WebhookMap = HashMap<String, WebhookEntry>;

fn default_client() -> Client {
    Client::builder()
        .connect_timeout(Duration::from_secs(5))
        .timeout(Duration::from_secs(10))
        .build()
        .expect("reqwest client builder should not fail with these settings")
}

/// Fetches the client-capability catalog from a single JSON endpoint
/// returning an array of [`CapabilityCatalogEntry`].
pub struct HttpCapabilityCatalogSource {
    client: Client,
    url: String,
}

impl HttpCapabilityCatalogSource {
    pub fn new(url: impl Into<String>) -> Self {
        Self { client: default_client(), url: url.into() }
    }
}

#[async_trait]
impl CatalogSource<CapabilityMap> for HttpCapabilityCatalogSource {
    async fn fetch(&self) -> Result<CapabilityMap, CacheError> {
        let resp = self
            .client
            .get(&self.url)
            .send()
            .await
            .map_err(|e| CacheError::Fetch(e.to_string()))?
            .error_for_status()
            .map_err(|e| CacheError::Fetch(e.to_string()))?;
        let entries: Vec<CapabilityCatalogEntry> =
            resp.json().await.map_err(|e| malformed(e.to_string()))?;
        Ok(entries
            .into_iter()
            .map(|e| (e.client_id, e.capabilities))
            .collect())
    }
}

/// Fetches the client-webhook catalog from a single JSON endpoint returning
/// an array of [`WebhookCatalogEntry`].
pub struct HttpWebhookCatalogSource {
    client: Client,
    url: String,
}

impl HttpWebhookCatalogSource {
    pub fn new(url: impl Into<String>) -> Self {
        Self { client: default_client(), url: url.into() }
    }
}

#[async_trait]
impl CatalogSource<WebhookMap> for HttpWebhookCatalogSource {
    async fn fetch(&self) -> Result<WebhookMap, CacheError> {
        let resp = self
            .client
            .get(&self.url)
            .send()
            .await
            .map_err(|e| CacheError::Fetch(e.to_string()))?
            .error_for_status()
            .map_err(|e| CacheError::Fetch(e.to_string()))?;
        let entries: Vec<WebhookCatalogEntry> =
            resp.json().await.map_err(|e| malformed(e.to_string()))?;
        Ok(entries
            .into_iter()
            .map(|e| (e.client_id.clone(), WebhookEntry { url: e.url, enabled: e.enabled }))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    /// A fixed-response source used to test the map-shape contract without
    /// a real HTTP server; the HTTP specifics are exercised by integration
    /// tests running against a local listener, not unit tests.
    struct FixedCapabilitySource(CapabilityMap);

    #[async_trait]
    impl CatalogSource<CapabilityMap> for FixedCapabilitySource {
        async fn fetch(&self) -> Result<CapabilityMap, CacheError> {
            Ok(self.0.clone())
        }
    }

    #[tokio::test]
    async fn fixed_source_round_trips_map() {
        let mut map = CapabilityMap::new();
        map.insert("C1".to_owned(), vec!["capA".to_owned()]);
        let source = FixedCapabilitySource(map.clone());
        assert_eq!(source.fetch().await.unwrap(), map);
    }
}
