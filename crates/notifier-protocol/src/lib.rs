// notifier-protocol: wire types for the auth-domain notification broker.
//
// Inbound queue messages use a top-level `event` field for discriminated
// deserialization. Outbound topic messages are plain JSON bodies built by
// the processor, not an enum, since each kind is published independently.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Inbound queue message (raw, pre-validation)
// ---------------------------------------------------------------------------

/// The raw shape of an inbound queue message, before kind-specific
/// validation. All fields are optional here; `notifier_core::codec` is
/// responsible for checking which ones are required per `event` and for
/// coercing `ts`/`eventCreatedAt` (seconds) into milliseconds.
#[derive(Debug, Clone, Deserialize)]
pub struct RawEnvelope {
    pub event: String,
    pub uid: Option<String>,
    #[serde(rename = "clientId")]
    pub client_id: Option<String>,
    pub timestamp: Option<i64>,
    pub ts: Option<i64>,
    #[serde(rename = "eventCreatedAt")]
    pub event_created_at: Option<i64>,
    #[serde(rename = "isActive")]
    pub is_active: Option<bool>,
    #[serde(rename = "productCapabilities")]
    pub product_capabilities: Option<Vec<String>>,
}

// ---------------------------------------------------------------------------
// Outbound topic message bodies
// ---------------------------------------------------------------------------

/// Body published for delete / profile / primary-email-change / password
/// change / password-reset events.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenericChangeBody {
    pub event: String,
    pub uid: String,
    #[serde(rename = "changeTime")]
    pub change_time: i64,
    pub timestamp: i64,
}

/// Body published for a subscription update fan-out to one matching client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubscriptionUpdateBody {
    pub event: String,
    pub uid: String,
    #[serde(rename = "isActive")]
    pub is_active: bool,
    #[serde(rename = "changeTime")]
    pub change_time: i64,
    pub capabilities: Vec<String>,
    pub timestamp: i64,
}

// ---------------------------------------------------------------------------
// Catalog snapshot payloads (capability / webhook cache refresh responses)
// ---------------------------------------------------------------------------

/// One entry of the upstream client-capability catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapabilityCatalogEntry {
    #[serde(rename = "clientId")]
    pub client_id: String,
    pub capabilities: Vec<String>,
}

/// One entry of the upstream client-webhook catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebhookCatalogEntry {
    #[serde(rename = "clientId")]
    pub client_id: String,
    pub url: String,
    pub enabled: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raw_envelope_parses_login_with_client_id() {
        let json = r#"{"event":"login","uid":"U1","clientId":"C1","ts":1700000000}"#;
        let env: RawEnvelope = serde_json::from_str(json).unwrap();
        assert_eq!(env.event, "login");
        assert_eq!(env.uid.as_deref(), Some("U1"));
        assert_eq!(env.client_id.as_deref(), Some("C1"));
        assert_eq!(env.ts, Some(1_700_000_000));
    }

    #[test]
    fn raw_envelope_parses_subscription_update() {
        let json = r#"{"event":"subscription:update","uid":"U1","eventCreatedAt":1700000000,
                        "isActive":true,"productCapabilities":["capA","capB"]}"#;
        let env: RawEnvelope = serde_json::from_str(json).unwrap();
        assert_eq!(env.event_created_at, Some(1_700_000_000));
        assert_eq!(env.is_active, Some(true));
        assert_eq!(
            env.product_capabilities,
            Some(vec!["capA".to_owned(), "capB".to_owned()])
        );
    }

    #[test]
    fn generic_change_body_serializes_expected_fields() {
        let body = GenericChangeBody {
            event: "delete".to_owned(),
            uid: "U1".to_owned(),
            change_time: 1_700_000_000_000,
            timestamp: 1_700_000_001_234,
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["event"], "delete");
        assert_eq!(json["changeTime"], 1_700_000_000_000i64);
    }
}
