//! Wire model for the hardware bridge protocol.
//!
//! The bridge service speaks JSON over a WebSocket. Inbound messages are
//! [`HardwareEvent`]s (device events plus responses to correlated commands);
//! outbound messages are [`CommandMessage`]s. Field names on the wire are
//! camelCase, event and command kinds are snake_case strings.
//!
//! # Example
//!
//! ```
//! use cashbridge_protocol::{CommandMessage, DispenseItem, DispenseRequest, HardwareEvent};
//!
//! let request = DispenseRequest::from_plan(vec![DispenseItem::new(0.10, 3)]);
//! let command = CommandMessage::dispense_change(&request).unwrap();
//! assert_eq!(command.encode().unwrap().contains("dispense_change"), true);
//!
//! let raw = r#"{"kind":"credit","deviceId":"coin-acceptor-1",
//!               "data":{"denomination":0.5,"kind":"coin","deviceId":"coin-acceptor-1"},
//!               "timestamp":1700000000000}"#;
//! let event = HardwareEvent::decode(raw).unwrap();
//! assert_eq!(event.device_id, "coin-acceptor-1");
//! ```

mod commands;
mod events;
mod payloads;

pub use commands::{CommandKind, CommandMessage};
pub use events::{EventKind, HardwareEvent};
pub use payloads::{CreditEvent, CreditKind, DispenseItem, DispenseRequest, HopperLevel};
