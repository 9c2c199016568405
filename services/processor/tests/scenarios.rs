//! End-to-end scenarios driving a real `NotificationProcessor` through its
//! `start`/`stop` lifecycle and consumer loop, over in-memory fakes instead
//! of a live Postgres/queue/catalog deployment.

use std::sync::Arc;
use std::time::Duration;

use notifier_core::catalog::CapabilityMap;
use notifier_core::{NotificationProcessor, ProcessorConfig};
use notifier_test_utils::{FixedCatalogSource, InMemoryDatastore, InMemoryQueueSource, RecordingPublisher};

fn test_config() -> ProcessorConfig {
    ProcessorConfig {
        batch_size: 10,
        topic_prefix: "rp-".to_owned(),
        capability_refresh_interval: Duration::from_secs(3600),
        webhook_refresh_interval: Duration::from_secs(3600),
        operation_timeout: Duration::from_secs(5),
    }
}

async fn drain(queue: &InMemoryQueueSource) {
    // The consumer loop polls on its own task; give it a few scheduler
    // turns to drain the seeded batch before asserting on side effects.
    for _ in 0..50 {
        if queue.remaining() == 0 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

#[tokio::test]
async fn login_with_client_id_persists_and_publishes_nothing() {
    let queue = Arc::new(InMemoryQueueSource::new());
    let datastore = Arc::new(InMemoryDatastore::new());
    let publisher = Arc::new(RecordingPublisher::new());
    let capability_source = Arc::new(FixedCatalogSource(CapabilityMap::new()));
    let webhook_source = Arc::new(FixedCatalogSource(notifier_core::catalog::WebhookMap::new()));

    queue.push_json(serde_json::json!({"event":"login","uid":"U1","clientId":"C1","ts":1_700_000_000}));

    let processor = NotificationProcessor::new(
        test_config(),
        queue.clone(),
        datastore.clone(),
        publisher.clone(),
        capability_source,
        webhook_source,
    );
    processor.start().await.unwrap();
    drain(&queue).await;
    processor.stop().await;

    assert_eq!(datastore.logins().get("U1").cloned().unwrap_or_default(), vec!["C1".to_owned()]);
    assert!(publisher.calls().is_empty());
}

#[tokio::test]
async fn login_without_client_id_has_no_side_effects() {
    let queue = Arc::new(InMemoryQueueSource::new());
    let datastore = Arc::new(InMemoryDatastore::new());
    let publisher = Arc::new(RecordingPublisher::new());
    let capability_source = Arc::new(FixedCatalogSource(CapabilityMap::new()));
    let webhook_source = Arc::new(FixedCatalogSource(notifier_core::catalog::WebhookMap::new()));

    queue.push_json(serde_json::json!({"event":"login","uid":"U1","ts":1_700_000_000}));

    let processor = NotificationProcessor::new(
        test_config(),
        queue.clone(),
        datastore.clone(),
        publisher.clone(),
        capability_source,
        webhook_source,
    );
    processor.start().await.unwrap();
    drain(&queue).await;
    processor.stop().await;

    assert!(datastore.logins().is_empty());
    assert!(publisher.calls().is_empty());
}

#[tokio::test]
async fn delete_fans_out_to_every_logged_in_client() {
    let queue = Arc::new(InMemoryQueueSource::new());
    let datastore = Arc::new(InMemoryDatastore::new());
    datastore.seed("U1", vec!["C1".to_owned(), "C2".to_owned()]);
    let publisher = Arc::new(RecordingPublisher::new());
    let capability_source = Arc::new(FixedCatalogSource(CapabilityMap::new()));
    let webhook_source = Arc::new(FixedCatalogSource(notifier_core::catalog::WebhookMap::new()));

    queue.push_json(serde_json::json!({"event":"delete","uid":"U1","ts":1_700_000_000}));

    let processor = NotificationProcessor::new(
        test_config(),
        queue.clone(),
        datastore,
        publisher.clone(),
        capability_source,
        webhook_source,
    );
    processor.start().await.unwrap();
    drain(&queue).await;
    processor.stop().await;

    let mut topics: Vec<String> = publisher.calls().into_iter().map(|(t, _)| t).collect();
    topics.sort();
    assert_eq!(topics, vec!["rp-C1".to_owned(), "rp-C2".to_owned()]);
}

#[tokio::test]
async fn unknown_event_is_dropped_without_side_effects() {
    let queue = Arc::new(InMemoryQueueSource::new());
    let datastore = Arc::new(InMemoryDatastore::new());
    let publisher = Arc::new(RecordingPublisher::new());
    let capability_source = Arc::new(FixedCatalogSource(CapabilityMap::new()));
    let webhook_source = Arc::new(FixedCatalogSource(notifier_core::catalog::WebhookMap::new()));

    queue.push_json(serde_json::json!({"event":"helloWorld","uid":"U1"}));

    let processor = NotificationProcessor::new(
        test_config(),
        queue.clone(),
        datastore.clone(),
        publisher.clone(),
        capability_source,
        webhook_source,
    );
    processor.start().await.unwrap();
    drain(&queue).await;
    processor.stop().await;

    assert!(datastore.logins().is_empty());
    assert!(publisher.calls().is_empty());
}

#[tokio::test]
async fn cache_initial_refresh_failure_is_fatal_to_start() {
    use notifier_core::catalog::CapabilityMap;
    use notifier_core::error::CacheError;
    use notifier_core::ports::CatalogSource;
    use async_trait::async_trait;

    struct AlwaysFails;
    #[async_trait]
    impl CatalogSource<CapabilityMap> for AlwaysFails {
        async fn fetch(&self) -> Result<CapabilityMap, CacheError> {
            Err(CacheError::Fetch("catalog unreachable".to_owned()))
        }
    }

    let queue = Arc::new(InMemoryQueueSource::new());
    let datastore = Arc::new(InMemoryDatastore::new());
    let publisher = Arc::new(RecordingPublisher::new());
    let capability_source = Arc::new(AlwaysFails);
    let webhook_source = Arc::new(FixedCatalogSource(notifier_core::catalog::WebhookMap::new()));

    let processor =
        NotificationProcessor::new(test_config(), queue, datastore, publisher, capability_source, webhook_source);
    assert!(processor.start().await.is_err());
}
