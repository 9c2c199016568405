//! Consumer loop, message classification, fan-out and the self-updating
//! catalog caches backing the notification broker. Every external
//! collaborator -- datastore, publisher, upstream queue, catalog source --
//! is a trait in [`ports`], injected at construction so [`processor`] can
//! run against fakes in tests and against real adapters in the service
//! binary.

pub mod cache;
pub mod catalog;
pub mod codec;
pub mod datastore;
pub mod error;
pub mod fanout;
pub mod ports;
pub mod processor;
pub mod publisher;
pub mod queue;

pub use cache::SelfUpdatingCache;
pub use catalog::{CapabilityMap, HttpCapabilityCatalogSource, HttpWebhookCatalogSource, WebhookEntry, WebhookMap};
pub use codec::ServiceNotification;
pub use datastore::PgDatastore;
pub use processor::{NotificationProcessor, ProcessorConfig};
pub use publisher::LoggingPublisher;
pub use queue::HttpLongPollQueueSource;
