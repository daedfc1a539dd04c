//! Error types for hardware bridge operations.
//!
//! This module defines the single error enum shared by the protocol and
//! client crates, covering connection failures, wire-format problems,
//! correlation timeouts, and device-reported dispense failures.

use thiserror::Error;

/// Result type alias for bridge operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while talking to the hardware bridge.
#[derive(Debug, Error)]
pub enum Error {
    /// Initial connection attempt to the bridge failed.
    #[error("Connection failed: {message}")]
    ConnectionFailed { message: String },

    /// No connection is currently open to the bridge.
    #[error("Not connected to hardware bridge")]
    NotConnected,

    /// Inbound or outbound message did not match the wire format.
    #[error("Invalid message: {message}")]
    InvalidMessage { message: String },

    /// A correlated command received no matching response in time.
    #[error("{operation} timed out after {duration_ms}ms")]
    Timeout { operation: String, duration_ms: u64 },

    /// The bridge reported a dispense failure.
    #[error("Dispense failed: {message}")]
    DispenseFailed { message: String },

    /// The connection closed while a correlated command was in flight.
    #[error("Bridge connection closed while awaiting response")]
    ConnectionClosed,

    /// Generic I/O error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Create a new connection failure error.
    pub fn connection_failed(message: impl Into<String>) -> Self {
        Self::ConnectionFailed {
            message: message.into(),
        }
    }

    /// Create a new invalid message error.
    pub fn invalid_message(message: impl Into<String>) -> Self {
        Self::InvalidMessage {
            message: message.into(),
        }
    }

    /// Create a new timeout error for the named operation.
    pub fn timeout(operation: impl Into<String>, duration_ms: u64) -> Self {
        Self::Timeout {
            operation: operation.into(),
            duration_ms,
        }
    }

    /// Create a new device-reported dispense failure.
    pub fn dispense_failed(message: impl Into<String>) -> Self {
        Self::DispenseFailed {
            message: message.into(),
        }
    }

    /// Returns `true` if this error is a correlation timeout.
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_connection_failed_display() {
        let error = Error::connection_failed("refused");
        assert!(matches!(error, Error::ConnectionFailed { .. }));
        assert_eq!(error.to_string(), "Connection failed: refused");
    }

    #[test]
    fn test_timeout_display() {
        let error = Error::timeout("dispense_change", 30_000);
        assert_eq!(
            error.to_string(),
            "dispense_change timed out after 30000ms"
        );
        assert!(error.is_timeout());
    }

    #[test]
    fn test_dispense_failed_display() {
        let error = Error::dispense_failed("hopper empty");
        assert_eq!(error.to_string(), "Dispense failed: hopper empty");
        assert!(!error.is_timeout());
    }

    #[rstest]
    #[case(Error::NotConnected)]
    #[case(Error::ConnectionClosed)]
    #[case(Error::invalid_message("bad frame"))]
    fn test_error_debug_and_display(#[case] error: Error) {
        let _ = format!("{error}");
        let _ = format!("{error:?}");
    }
}
