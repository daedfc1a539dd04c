//! Inbound event model.
//!
//! Every message the bridge service pushes to the client decodes into a
//! [`HardwareEvent`]: a kind tag, the originating device, a free-form data
//! object, and a millisecond timestamp. The client additionally emits two
//! synthetic kinds ([`EventKind::Connected`] and [`EventKind::Disconnected`])
//! so connectivity changes flow through the same dispatch path as device
//! events.

use cashbridge_core::constants::BRIDGE_DEVICE_ID;
use cashbridge_core::{Error, Result};
use chrono::Utc;
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use serde_json::{Map, Value};
use std::fmt;

/// Kind of a hardware event.
///
/// This is a closed enumeration: the bridge protocol defines exactly these
/// kinds and a message carrying anything else fails to decode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    /// Synthetic: the client established a connection to the bridge.
    Connected,

    /// Synthetic: the connection to the bridge was closed.
    Disconnected,

    /// A coin or bill was accepted.
    Credit,

    /// Hopper fill-level snapshot, response to `get_hopper_levels`.
    HopperLevel,

    /// Change dispense completed, response to `dispense_change`.
    DispenseSuccess,

    /// Change dispense failed, response to `dispense_change`.
    DispenseError,

    /// Periodic or solicited device status report.
    Status,

    /// A device reported a mechanical jam.
    Jam,

    /// A device reported a generic error.
    Error,
}

impl EventKind {
    /// Wire name of this kind (snake_case).
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Connected => "connected",
            Self::Disconnected => "disconnected",
            Self::Credit => "credit",
            Self::HopperLevel => "hopper_level",
            Self::DispenseSuccess => "dispense_success",
            Self::DispenseError => "dispense_error",
            Self::Status => "status",
            Self::Jam => "jam",
            Self::Error => "error",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// An immutable event received from (or synthesized about) the bridge.
///
/// Events carry no identity beyond their fields and are never persisted;
/// the `data` object holds the kind-specific payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HardwareEvent {
    /// Event kind tag.
    pub kind: EventKind,

    /// Identifier of the device that produced the event.
    pub device_id: String,

    /// Kind-specific payload.
    #[serde(default)]
    pub data: Map<String, Value>,

    /// Event time in milliseconds since the Unix epoch.
    pub timestamp: i64,
}

impl HardwareEvent {
    /// Decode an event from raw message text.
    ///
    /// # Errors
    /// Returns `Error::InvalidMessage` if the text is not valid JSON, the
    /// kind is not part of the protocol, or a required field is missing.
    /// Callers log and drop such messages; they must never escalate.
    pub fn decode(text: &str) -> Result<Self> {
        serde_json::from_str(text).map_err(|e| Error::invalid_message(e.to_string()))
    }

    /// Encode the event as message text.
    ///
    /// # Errors
    /// Returns `Error::InvalidMessage` if serialization fails.
    pub fn encode(&self) -> Result<String> {
        serde_json::to_string(self).map_err(|e| Error::invalid_message(e.to_string()))
    }

    /// Synthetic event marking a successfully opened connection.
    #[must_use]
    pub fn connected() -> Self {
        Self::synthetic(EventKind::Connected)
    }

    /// Synthetic event marking a closed connection.
    #[must_use]
    pub fn disconnected() -> Self {
        Self::synthetic(EventKind::Disconnected)
    }

    fn synthetic(kind: EventKind) -> Self {
        Self {
            kind,
            device_id: BRIDGE_DEVICE_ID.to_string(),
            data: Map::new(),
            timestamp: Utc::now().timestamp_millis(),
        }
    }

    /// Deserialize the `data` object into a typed payload.
    ///
    /// # Errors
    /// Returns `Error::InvalidMessage` if the payload does not match `T`.
    pub fn payload<T: DeserializeOwned>(&self) -> Result<T> {
        serde_json::from_value(Value::Object(self.data.clone()))
            .map_err(|e| Error::invalid_message(format!("{} payload: {e}", self.kind)))
    }

    /// Deserialize a single field of the `data` object.
    ///
    /// # Errors
    /// Returns `Error::InvalidMessage` if the field is absent or does not
    /// match `T`.
    pub fn data_field<T: DeserializeOwned>(&self, field: &str) -> Result<T> {
        let value = self.data.get(field).ok_or_else(|| {
            Error::invalid_message(format!("{} event missing '{field}' field", self.kind))
        })?;
        serde_json::from_value(value.clone())
            .map_err(|e| Error::invalid_message(format!("{} field '{field}': {e}", self.kind)))
    }

    /// Device-supplied error message, if the payload carries one.
    #[must_use]
    pub fn error_message(&self) -> Option<&str> {
        self.data.get("message").and_then(Value::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(EventKind::Credit, "credit")]
    #[case(EventKind::HopperLevel, "hopper_level")]
    #[case(EventKind::DispenseSuccess, "dispense_success")]
    #[case(EventKind::DispenseError, "dispense_error")]
    #[case(EventKind::Status, "status")]
    #[case(EventKind::Jam, "jam")]
    #[case(EventKind::Error, "error")]
    fn test_event_kind_wire_name(#[case] kind: EventKind, #[case] expected: &str) {
        assert_eq!(kind.as_str(), expected);
        assert_eq!(kind.to_string(), expected);
        // as_str and the serde representation must agree
        let json = serde_json::to_string(&kind).unwrap();
        assert_eq!(json, format!("\"{expected}\""));
    }

    #[test]
    fn test_decode_credit_event() {
        let raw = r#"{
            "kind": "credit",
            "deviceId": "coin-acceptor-1",
            "data": {"denomination": 0.5, "kind": "coin", "deviceId": "coin-acceptor-1"},
            "timestamp": 1700000000123
        }"#;

        let event = HardwareEvent::decode(raw).unwrap();
        assert_eq!(event.kind, EventKind::Credit);
        assert_eq!(event.device_id, "coin-acceptor-1");
        assert_eq!(event.timestamp, 1_700_000_000_123);
        assert_eq!(event.data["denomination"], 0.5);
    }

    #[test]
    fn test_decode_event_without_data() {
        let raw = r#"{"kind": "jam", "deviceId": "hopper-2", "timestamp": 1}"#;
        let event = HardwareEvent::decode(raw).unwrap();
        assert_eq!(event.kind, EventKind::Jam);
        assert!(event.data.is_empty());
    }

    #[rstest]
    #[case("not json at all")]
    #[case(r#"{"kind": "warp_core_breach", "deviceId": "d", "timestamp": 1}"#)]
    #[case(r#"{"deviceId": "d", "timestamp": 1}"#)]
    #[case(r#"{"kind": "credit", "timestamp": 1}"#)]
    fn test_decode_malformed_is_error(#[case] raw: &str) {
        let result = HardwareEvent::decode(raw);
        assert!(matches!(
            result,
            Err(cashbridge_core::Error::InvalidMessage { .. })
        ));
    }

    #[test]
    fn test_encode_decode_preserves_fields() {
        let mut data = Map::new();
        data.insert("message".to_string(), Value::from("coin path blocked"));
        let event = HardwareEvent {
            kind: EventKind::DispenseError,
            device_id: "hopper-1".to_string(),
            data,
            timestamp: 42,
        };

        let text = event.encode().unwrap();
        assert!(text.contains("\"deviceId\":\"hopper-1\""));
        assert_eq!(HardwareEvent::decode(&text).unwrap(), event);
    }

    #[test]
    fn test_synthetic_events() {
        let up = HardwareEvent::connected();
        assert_eq!(up.kind, EventKind::Connected);
        assert_eq!(up.device_id, BRIDGE_DEVICE_ID);
        assert!(up.data.is_empty());
        assert!(up.timestamp > 0);

        let down = HardwareEvent::disconnected();
        assert_eq!(down.kind, EventKind::Disconnected);
    }

    #[test]
    fn test_error_message_extraction() {
        let raw = r#"{
            "kind": "dispense_error",
            "deviceId": "hopper-1",
            "data": {"message": "hopper empty"},
            "timestamp": 1
        }"#;
        let event = HardwareEvent::decode(raw).unwrap();
        assert_eq!(event.error_message(), Some("hopper empty"));

        let bare = HardwareEvent::connected();
        assert_eq!(bare.error_message(), None);
    }

    #[test]
    fn test_data_field_missing() {
        let event = HardwareEvent::connected();
        let result: Result<Vec<i64>> = event.data_field("hoppers");
        assert!(result.is_err());
    }
}
