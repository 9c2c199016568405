//! Decodes raw queue payloads into [`ServiceNotification`] variants.
//!
//! Returns `Option` instead of a `Result` with an error variant for the
//! "unwanted" case: an unrecognized `event` or a payload that fails
//! validation for a recognized one is not an error to retry, it's dropped
//! for good, so there is nothing to propagate.

use notifier_protocol::RawEnvelope;
use tracing::{debug, trace};

/// A decoded, validated notification. All timestamps are milliseconds since
/// epoch; `eventCreatedAt`/`ts` sources (seconds) are multiplied by 1000
/// here so downstream code never has to think about units again.
#[derive(Debug, Clone, PartialEq)]
pub enum ServiceNotification {
    Login {
        uid: String,
        client_id: Option<String>,
        message_time_ms: i64,
    },
    SubscriptionUpdate {
        uid: String,
        message_time_ms: i64,
        event_created_at_ms: i64,
        is_active: bool,
        product_capabilities: Vec<String>,
    },
    Delete {
        uid: String,
        message_time_ms: i64,
    },
    ProfileChange {
        uid: String,
        message_time_ms: i64,
    },
    PasswordChange {
        uid: String,
        message_time_ms: i64,
    },
}

impl ServiceNotification {
    /// Label used for the `message.type{eventType=...}` counter and the
    /// generic fan-out's outbound `event` field.
    pub fn event_type_label(&self) -> &'static str {
        match self {
            ServiceNotification::Login { .. } => "login",
            ServiceNotification::SubscriptionUpdate { .. } => "subscription:update",
            ServiceNotification::Delete { .. } => "delete",
            ServiceNotification::ProfileChange { .. } => "profile",
            ServiceNotification::PasswordChange { .. } => "password",
        }
    }

    pub fn uid(&self) -> &str {
        match self {
            ServiceNotification::Login { uid, .. }
            | ServiceNotification::SubscriptionUpdate { uid, .. }
            | ServiceNotification::Delete { uid, .. }
            | ServiceNotification::ProfileChange { uid, .. }
            | ServiceNotification::PasswordChange { uid, .. } => uid,
        }
    }

    /// The time used for the queue-delay metric: `now - message_time_ms`.
    pub fn message_time_ms(&self) -> i64 {
        match self {
            ServiceNotification::Login { message_time_ms, .. }
            | ServiceNotification::SubscriptionUpdate { message_time_ms, .. }
            | ServiceNotification::Delete { message_time_ms, .. }
            | ServiceNotification::ProfileChange { message_time_ms, .. }
            | ServiceNotification::PasswordChange { message_time_ms, .. } => *message_time_ms,
        }
    }
}

/// Coerce a `timestamp` (already ms) / `ts` (seconds) pair into milliseconds.
/// Returns `None` if neither is present.
fn coerce_ms(timestamp: Option<i64>, ts: Option<i64>) -> Option<i64> {
    timestamp.or_else(|| ts.map(|secs| secs * 1000))
}

/// Decode and validate a raw queue payload.
///
/// Returns `None` for malformed JSON, an unrecognized `event`, or a
/// recognized `event` missing one of its required fields -- all three are
/// "unwanted" in the sense of the error-handling design: logged and
/// swallowed, never retried.
pub fn decode(body: &[u8]) -> Option<ServiceNotification> {
    let envelope: RawEnvelope = match serde_json::from_slice(body) {
        Ok(e) => e,
        Err(e) => {
            trace!(error = %e, "dropping message: invalid JSON");
            return None;
        }
    };

    let message_time_ms = coerce_ms(envelope.timestamp, envelope.ts);

    match envelope.event.as_str() {
        "login" => {
            let uid = envelope.uid?;
            let message_time_ms = message_time_ms?;
            Some(ServiceNotification::Login {
                uid,
                client_id: envelope.client_id,
                message_time_ms,
            })
        }
        "subscription:update" => {
            let uid = envelope.uid?;
            let event_created_at_ms = envelope.event_created_at? * 1000;
            // ts/timestamp aren't required for this event; fall back to
            // eventCreatedAt for the queue-delay metric when absent.
            let message_time_ms = message_time_ms.unwrap_or(event_created_at_ms);
            let is_active = envelope.is_active?;
            let product_capabilities = envelope.product_capabilities?;
            Some(ServiceNotification::SubscriptionUpdate {
                uid,
                message_time_ms,
                event_created_at_ms,
                is_active,
                product_capabilities,
            })
        }
        "delete" => Some(ServiceNotification::Delete {
            uid: envelope.uid?,
            message_time_ms: message_time_ms?,
        }),
        "primaryEmailChanged" | "profileDataChange" => Some(ServiceNotification::ProfileChange {
            uid: envelope.uid?,
            message_time_ms: message_time_ms?,
        }),
        "passwordChange" | "reset" => Some(ServiceNotification::PasswordChange {
            uid: envelope.uid?,
            message_time_ms: message_time_ms?,
        }),
        other => {
            debug!(event = %other, "dropping unrecognized event");
            None
        }
    }
}
