//! Processor configuration loading.
//!
//! TOML is the sole config source; `NOTIFIER_CONFIG` overrides the config
//! file path, `DATABASE_URL` overrides `datastore.url` (the one value
//! operators most often need to set per-environment without editing the
//! file). Default config path: `/etc/notification-processor/config.toml`.

use serde::Deserialize;
use std::path::Path;

// ---------------------------------------------------------------------------
// Config types (validated, ready to use)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct ProcessorSettings {
    pub batch_size: usize,
    pub queue_url: String,
    pub topic_prefix: String,
    pub capability_catalog_url: String,
    pub capability_refresh_interval_sec: u64,
    pub webhook_catalog_url: String,
    pub webhook_refresh_interval_sec: u64,
    pub operation_timeout_sec: u64,
    pub datastore: DatastoreSettings,
}

#[derive(Debug, Clone)]
pub struct DatastoreSettings {
    pub url: String,
    pub max_connections: u32,
}

// ---------------------------------------------------------------------------
// Raw TOML deserialization types (everything optional; defaults applied below)
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct RawConfig {
    batch_size: Option<usize>,
    queue_url: Option<String>,
    topic_prefix: Option<String>,
    capability_cache: Option<RawCatalogCacheConfig>,
    webhook_cache: Option<RawCatalogCacheConfig>,
    operation_timeout_sec: Option<u64>,
    datastore: Option<RawDatastoreConfig>,
}

#[derive(Debug, Deserialize)]
struct RawCatalogCacheConfig {
    url: Option<String>,
    refresh_interval_sec: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct RawDatastoreConfig {
    url: Option<String>,
    max_connections: Option<u32>,
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

pub fn load_config() -> Result<ProcessorSettings, ConfigError> {
    let path = std::env::var("NOTIFIER_CONFIG")
        .unwrap_or_else(|_| "/etc/notification-processor/config.toml".to_owned());
    load_config_from_path(Path::new(&path))
}

pub fn load_config_from_path(path: &Path) -> Result<ProcessorSettings, ConfigError> {
    let toml_str = std::fs::read_to_string(path)
        .map_err(|e| ConfigError::Io(format!("reading config file '{}': {e}", path.display())))?;
    load_config_from_str(&toml_str)
}

pub fn load_config_from_str(toml_str: &str) -> Result<ProcessorSettings, ConfigError> {
    let raw: RawConfig = toml::from_str(toml_str).map_err(|e| ConfigError::Parse(e.to_string()))?;

    let queue_url = raw.queue_url.ok_or_else(|| ConfigError::MissingField("queue_url".to_owned()))?;

    let raw_capability = raw.capability_cache.ok_or_else(|| ConfigError::MissingField("capability_cache".to_owned()))?;
    let capability_catalog_url = raw_capability
        .url
        .ok_or_else(|| ConfigError::MissingField("capability_cache.url".to_owned()))?;
    let capability_refresh_interval_sec = raw_capability.refresh_interval_sec.unwrap_or(60);

    let raw_webhook = raw.webhook_cache.ok_or_else(|| ConfigError::MissingField("webhook_cache".to_owned()))?;
    let webhook_catalog_url = raw_webhook
        .url
        .ok_or_else(|| ConfigError::MissingField("webhook_cache.url".to_owned()))?;
    let webhook_refresh_interval_sec = raw_webhook.refresh_interval_sec.unwrap_or(60);

    let raw_datastore = raw.datastore.ok_or_else(|| ConfigError::MissingField("datastore".to_owned()))?;
    let configured_url = raw_datastore.url.ok_or_else(|| ConfigError::MissingField("datastore.url".to_owned()))?;
    let url = std::env::var("DATABASE_URL").unwrap_or(configured_url);
    let max_connections = raw_datastore.max_connections.unwrap_or(10);

    Ok(ProcessorSettings {
        batch_size: raw.batch_size.unwrap_or(10),
        queue_url,
        topic_prefix: raw.topic_prefix.unwrap_or_default(),
        capability_catalog_url,
        capability_refresh_interval_sec,
        webhook_catalog_url,
        webhook_refresh_interval_sec,
        operation_timeout_sec: raw.operation_timeout_sec.unwrap_or(10),
        datastore: DatastoreSettings { url, max_connections },
    })
}

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(String),
    #[error("parse error: {0}")]
    Parse(String),
    #[error("missing required field: {0}")]
    MissingField(String),
}
