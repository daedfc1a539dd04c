//! Persistent client for the cash-hardware bridge service.
//!
//! The bridge is a local WebSocket service fronting coin acceptors, bill
//! validators and change hoppers. This crate keeps one connection to it
//! alive, reconnects with exponential backoff when it drops, fans decoded
//! events out to listeners and correlates the two request-style commands
//! with their response events.
//!
//! Entry point is [`BridgeClient`]; see its documentation for an example.

pub use cashbridge_core::{Error, Result};
pub use cashbridge_protocol as protocol;

mod client;
mod correlator;
mod dispatcher;
mod supervisor;
mod transport;

pub use client::{BridgeClient, BridgeConfig, EventSubscription};
pub use dispatcher::{EventDispatcher, ListenerId};
pub use supervisor::ConnectionState;
