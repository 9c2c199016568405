//! Orchestrates the consumer loop, message dispatch and fan-out: one
//! long-lived task polling a source, bounded concurrent handlers per batch,
//! graceful drain on stop.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tracing::{debug, error, info, warn};

use crate::cache::SelfUpdatingCache;
use crate::catalog::{CapabilityMap, WebhookMap};
use crate::codec::{self, ServiceNotification};
use crate::error::{DatastoreError, HandlerError, PublishError, StartupError};
use crate::fanout;
use crate::ports::{Datastore, Publisher, QueueSource};

/// How long the consumer loop sleeps after an empty poll or a queue error
/// before retrying, so a non-blocking `QueueSource` doesn't spin the task.
const EMPTY_POLL_BACKOFF: Duration = Duration::from_millis(200);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Idle,
    Running,
    Stopping,
    Stopped,
}

/// Tunables that would otherwise live in the service's config file; kept
/// here as plain fields so `notifier-core` has no config-parsing dependency
/// of its own.
#[derive(Debug, Clone)]
pub struct ProcessorConfig {
    pub batch_size: usize,
    pub topic_prefix: String,
    pub capability_refresh_interval: Duration,
    pub webhook_refresh_interval: Duration,
    pub operation_timeout: Duration,
}

impl Default for ProcessorConfig {
    fn default() -> Self {
        Self {
            batch_size: 10,
            topic_prefix: String::new(),
            capability_refresh_interval: Duration::from_secs(60),
            webhook_refresh_interval: Duration::from_secs(60),
            operation_timeout: Duration::from_secs(10),
        }
    }
}

fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// Orchestrates the full broker: consumer loop, login persistence and
/// fan-out, plus the two caches it depends on. Every collaborator is
/// injected so the whole thing can run against fakes in tests.
pub struct NotificationProcessor<Q, D, P, CC, WC> {
    config: ProcessorConfig,
    queue: Arc<Q>,
    datastore: Arc<D>,
    publisher: Arc<P>,
    capability_cache: Arc<SelfUpdatingCache<CapabilityMap>>,
    webhook_cache: Arc<SelfUpdatingCache<WebhookMap>>,
    capability_source: Arc<CC>,
    webhook_source: Arc<WC>,
    state: Mutex<State>,
    stopping: Arc<AtomicBool>,
    consumer_handle: Mutex<Option<JoinHandle<()>>>,
}

impl<Q, D, P, CC, WC> NotificationProcessor<Q, D, P, CC, WC>
where
    Q: QueueSource + 'static,
    D: Datastore + 'static,
    P: Publisher + 'static,
    CC: crate::ports::CatalogSource<CapabilityMap> + 'static,
    WC: crate::ports::CatalogSource<WebhookMap> + 'static,
{
    pub fn new(
        config: ProcessorConfig,
        queue: Arc<Q>,
        datastore: Arc<D>,
        publisher: Arc<P>,
        capability_source: Arc<CC>,
        webhook_source: Arc<WC>,
    ) -> Self {
        Self {
            config,
            queue,
            datastore,
            publisher,
            capability_cache: Arc::new(SelfUpdatingCache::new("capability")),
            webhook_cache: Arc::new(SelfUpdatingCache::new("webhook")),
            capability_source,
            webhook_source,
            state: Mutex::new(State::Idle),
            stopping: Arc::new(AtomicBool::new(false)),
            consumer_handle: Mutex::new(None),
        }
    }

    /// Starts both caches (fatal on initial-refresh failure, per the cache
    /// contract) and the consumer loop. Valid only from `Idle`.
    pub async fn start(&self) -> Result<(), StartupError> {
        let mut state = self.state.lock().await;
        if *state != State::Idle {
            return Err(StartupError("processor already started".to_owned()));
        }

        self.capability_cache
            .start(self.capability_source.clone(), self.config.capability_refresh_interval)
            .await?;
        self.webhook_cache
            .start(self.webhook_source.clone(), self.config.webhook_refresh_interval)
            .await?;

        self.stopping.store(false, Ordering::SeqCst);
        let handle = self.spawn_consumer_loop();
        *self.consumer_handle.lock().await = Some(handle);
        *state = State::Running;
        info!("processor started");
        Ok(())
    }

    /// Signals the consumer to stop fetching new batches, waits for the
    /// in-flight batch to drain, then stops both caches. Valid only from
    /// `Running`.
    pub async fn stop(&self) {
        {
            let mut state = self.state.lock().await;
            if *state != State::Running {
                return;
            }
            *state = State::Stopping;
        }

        self.stopping.store(true, Ordering::SeqCst);
        if let Some(handle) = self.consumer_handle.lock().await.take() {
            let _ = handle.await;
        }

        self.capability_cache.stop().await;
        self.webhook_cache.stop().await;

        *self.state.lock().await = State::Stopped;
        info!("processor stopped");
    }

    fn spawn_consumer_loop(&self) -> JoinHandle<()> {
        let queue = self.queue.clone();
        let datastore = self.datastore.clone();
        let publisher = self.publisher.clone();
        let capability_cache = self.capability_cache.clone();
        let stopping = self.stopping.clone();
        let batch_size = self.config.batch_size;
        let topic_prefix = self.config.topic_prefix.clone();
        let operation_timeout = self.config.operation_timeout;

        tokio::spawn(async move {
            while !stopping.load(Ordering::SeqCst) {
                let batch = match queue.receive_batch(batch_size).await {
                    Ok(batch) => batch,
                    Err(e) => {
                        warn!(error = %e, "queue poll failed, retrying");
                        tokio::time::sleep(EMPTY_POLL_BACKOFF).await;
                        continue;
                    }
                };

                if batch.is_empty() {
                    tokio::time::sleep(EMPTY_POLL_BACKOFF).await;
                    continue;
                }

                let mut handlers = Vec::with_capacity(batch.len());
                for message in batch {
                    let datastore = datastore.clone();
                    let publisher = publisher.clone();
                    let capability_cache = capability_cache.clone();
                    let topic_prefix = topic_prefix.clone();
                    handlers.push(tokio::spawn(async move {
                        handle_message(
                            &message.body,
                            datastore.as_ref(),
                            publisher.as_ref(),
                            capability_cache.as_ref(),
                            &topic_prefix,
                            operation_timeout,
                        )
                        .await
                    }));
                }

                for handler in handlers {
                    match handler.await {
                        Ok(Ok(())) => {}
                        Ok(Err(e)) => {
                            metrics::counter!("handler.failure").increment(1);
                            error!(error = %e, "handler failed, message left for redelivery");
                        }
                        Err(join_err) => {
                            metrics::counter!("handler.failure").increment(1);
                            error!(error = %join_err, "handler task panicked, message left for redelivery");
                        }
                    }
                }
            }
        })
    }
}

/// Decode and dispatch one raw message. Returns `Ok(())` for a dropped
/// (unrecognized / invalid) message as well as a successfully handled one;
/// only datastore/publish failures are `Err`.
async fn handle_message<D, P>(
    body: &[u8],
    datastore: &D,
    publisher: &P,
    capability_cache: &SelfUpdatingCache<CapabilityMap>,
    topic_prefix: &str,
    operation_timeout: Duration,
) -> Result<(), HandlerError>
where
    D: Datastore,
    P: Publisher,
{
    let Some(notification) = codec::decode(body) else {
        return Ok(());
    };

    let queue_delay_ms = now_ms() - notification.message_time_ms();
    metrics::histogram!("queue.delay.ms").record(queue_delay_ms as f64);

    let start = std::time::Instant::now();
    let result = dispatch(&notification, datastore, publisher, capability_cache, topic_prefix, operation_timeout).await;
    metrics::histogram!("processing.total.ms").record(start.elapsed().as_secs_f64() * 1000.0);

    metrics::counter!("message.type", "eventType" => notification.event_type_label()).increment(1);

    result
}

async fn dispatch<D, P>(
    notification: &ServiceNotification,
    datastore: &D,
    publisher: &P,
    capability_cache: &SelfUpdatingCache<CapabilityMap>,
    topic_prefix: &str,
    operation_timeout: Duration,
) -> Result<(), HandlerError>
where
    D: Datastore,
    P: Publisher,
{
    match notification {
        ServiceNotification::Login { uid, client_id, .. } => {
            let Some(client_id) = client_id else {
                debug!(uid = %uid, "dropping login with no clientId");
                return Ok(());
            };
            datastore_with_timeout(operation_timeout, datastore.store_login(uid, client_id)).await?;
            Ok(())
        }
        ServiceNotification::SubscriptionUpdate {
            uid,
            event_created_at_ms,
            is_active,
            product_capabilities,
            ..
        } => {
            let user_clients =
                datastore_with_timeout(operation_timeout, datastore.fetch_client_ids(uid)).await?;

            let Some(capability_map) = capability_cache.service_data() else {
                return Err(HandlerError::Panicked(
                    "capability cache has no snapshot after successful start".to_owned(),
                ));
            };

            let event_delay_ms = now_ms() - event_created_at_ms;
            metrics::histogram!("sub.eventDelay.ms").record(event_delay_ms as f64);

            let plan = fanout::plan_subscription_fanout(product_capabilities, &capability_map, &user_clients);
            let now = now_ms();

            let publishes = plan.into_iter().map(|(client_id, capabilities)| {
                let topic = format!("{topic_prefix}{client_id}");
                let body = json!({
                    "event": "subscription:update",
                    "uid": uid,
                    "isActive": is_active,
                    "changeTime": event_created_at_ms,
                    "capabilities": capabilities,
                    "timestamp": now,
                });
                publish_with_timeout(publisher, topic, body, operation_timeout)
            });
            futures_util::future::try_join_all(publishes).await?;
            Ok(())
        }
        ServiceNotification::Delete { uid, message_time_ms }
        | ServiceNotification::ProfileChange { uid, message_time_ms }
        | ServiceNotification::PasswordChange { uid, message_time_ms } => {
            let user_clients =
                datastore_with_timeout(operation_timeout, datastore.fetch_client_ids(uid)).await?;

            let targets = fanout::generic_fanout_targets(&user_clients);
            let event = notification.event_type_label();
            let now = now_ms();

            let publishes = targets.into_iter().map(|client_id| {
                let topic = format!("{topic_prefix}{client_id}");
                let body = json!({
                    "event": event,
                    "uid": uid,
                    "changeTime": message_time_ms,
                    "timestamp": now,
                });
                publish_with_timeout(publisher, topic, body, operation_timeout)
            });
            futures_util::future::try_join_all(publishes).await?;
            Ok(())
        }
    }
}

async fn publish_with_timeout<P: Publisher>(
    publisher: &P,
    topic: String,
    body: serde_json::Value,
    operation_timeout: Duration,
) -> Result<String, HandlerError> {
    match timeout(operation_timeout, publisher.publish(&topic, body)).await {
        Ok(inner) => inner.map_err(HandlerError::from),
        Err(_) => Err(HandlerError::from(PublishError::Timeout)),
    }
}

/// Runs a datastore call under the configured operation timeout, folding a
/// timeout into the same [`DatastoreError::Timeout`] the datastore itself
/// would report for a slow backend.
async fn datastore_with_timeout<T>(
    operation_timeout: Duration,
    fut: impl std::future::Future<Output = Result<T, DatastoreError>>,
) -> Result<T, HandlerError> {
    match timeout(operation_timeout, fut).await {
        Ok(inner) => inner.map_err(HandlerError::from),
        Err(_) => Err(HandlerError::from(DatastoreError::Timeout)),
    }
}
