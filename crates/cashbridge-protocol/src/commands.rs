//! Outbound command model.
//!
//! Commands are fire-and-forget on the wire: the bridge never acknowledges
//! them directly. The two correlated commands (`dispense_change`,
//! `get_hopper_levels`) are answered later by events of the corresponding
//! kind; the rest produce no response at all.

use crate::DispenseRequest;
use cashbridge_core::{Error, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Kind of an outbound command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommandKind {
    /// Begin a payment session: devices start reporting credits.
    StartSession,

    /// End the current payment session.
    EndSession,

    /// Pay out change according to a dispense plan.
    DispenseChange,

    /// Request a hopper fill-level snapshot.
    GetHopperLevels,

    /// Enable coin/bill acceptance.
    EnableAcceptance,

    /// Disable coin/bill acceptance.
    DisableAcceptance,
}

impl CommandKind {
    /// Wire name of this command (snake_case).
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::StartSession => "start_session",
            Self::EndSession => "end_session",
            Self::DispenseChange => "dispense_change",
            Self::GetHopperLevels => "get_hopper_levels",
            Self::EnableAcceptance => "enable_acceptance",
            Self::DisableAcceptance => "disable_acceptance",
        }
    }
}

impl fmt::Display for CommandKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A command message sent to the bridge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandMessage {
    /// Command kind tag.
    pub command: CommandKind,

    /// Command-specific payload; an empty object for most commands.
    #[serde(default)]
    pub data: Map<String, Value>,
}

impl CommandMessage {
    fn bare(command: CommandKind) -> Self {
        Self {
            command,
            data: Map::new(),
        }
    }

    /// Build a `start_session` command.
    #[must_use]
    pub fn start_session() -> Self {
        Self::bare(CommandKind::StartSession)
    }

    /// Build an `end_session` command.
    #[must_use]
    pub fn end_session() -> Self {
        Self::bare(CommandKind::EndSession)
    }

    /// Build an `enable_acceptance` command.
    #[must_use]
    pub fn enable_acceptance() -> Self {
        Self::bare(CommandKind::EnableAcceptance)
    }

    /// Build a `disable_acceptance` command.
    #[must_use]
    pub fn disable_acceptance() -> Self {
        Self::bare(CommandKind::DisableAcceptance)
    }

    /// Build a `get_hopper_levels` command.
    #[must_use]
    pub fn get_hopper_levels() -> Self {
        Self::bare(CommandKind::GetHopperLevels)
    }

    /// Build a `dispense_change` command carrying the request.
    ///
    /// # Errors
    /// Returns `Error::InvalidMessage` if the request fails to serialize.
    pub fn dispense_change(request: &DispenseRequest) -> Result<Self> {
        let value =
            serde_json::to_value(request).map_err(|e| Error::invalid_message(e.to_string()))?;
        let Value::Object(data) = value else {
            return Err(Error::invalid_message(
                "dispense request did not serialize to an object",
            ));
        };
        Ok(Self {
            command: CommandKind::DispenseChange,
            data,
        })
    }

    /// Encode the command as message text.
    ///
    /// # Errors
    /// Returns `Error::InvalidMessage` if serialization fails.
    pub fn encode(&self) -> Result<String> {
        serde_json::to_string(self).map_err(|e| Error::invalid_message(e.to_string()))
    }
}
