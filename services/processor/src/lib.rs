pub mod config;

use std::sync::Arc;
use std::time::Duration;

use notifier_core::ports::QueueSource;
use notifier_core::{
    HttpCapabilityCatalogSource, HttpWebhookCatalogSource, LoggingPublisher, NotificationProcessor,
    PgDatastore, ProcessorConfig,
};
use sqlx::PgPool;

use config::ProcessorSettings;

pub type Processor<Q> = NotificationProcessor<Q, PgDatastore, LoggingPublisher, HttpCapabilityCatalogSource, HttpWebhookCatalogSource>;

/// Wires the real adapters (Postgres datastore, logging publisher, HTTP
/// catalog sources) around an injected queue source and an already-migrated
/// pool. Split out from `main` so integration tests can build the same
/// processor over an in-memory queue and a per-test pool.
pub fn build_processor<Q: QueueSource + 'static>(
    settings: &ProcessorSettings,
    pool: PgPool,
    queue: Arc<Q>,
) -> Processor<Q> {
    let datastore = Arc::new(PgDatastore::new(pool));
    let publisher = Arc::new(LoggingPublisher);
    let capability_source = Arc::new(HttpCapabilityCatalogSource::new(settings.capability_catalog_url.clone()));
    let webhook_source = Arc::new(HttpWebhookCatalogSource::new(settings.webhook_catalog_url.clone()));

    let config = ProcessorConfig {
        batch_size: settings.batch_size,
        topic_prefix: settings.topic_prefix.clone(),
        capability_refresh_interval: Duration::from_secs(settings.capability_refresh_interval_sec),
        webhook_refresh_interval: Duration::from_secs(settings.webhook_refresh_interval_sec),
        operation_timeout: Duration::from_secs(settings.operation_timeout_sec),
    };

    NotificationProcessor::new(config, queue, datastore, publisher, capability_source, webhook_source)
}
