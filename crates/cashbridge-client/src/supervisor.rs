//! Connection lifecycle state and the reconnection state machine.
//!
//! Reconnection is modeled as a bounded retry state machine rather than
//! recursive scheduling: the state holds the attempt counter and the pending
//! timer handle, which makes cancellation on manual disconnect and timing
//! tests straightforward.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use tokio::task::JoinHandle;

/// Lifecycle state of the bridge connection.
///
/// Exactly one transport is live at a time and transitions are strictly
/// sequential; no two connection attempts ever overlap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionState {
    /// No connection and no reconnection pending.
    Disconnected,

    /// Initial connection attempt in progress.
    Connecting,

    /// Connection established and usable.
    Connected,

    /// Connection lost; a reconnection attempt is pending or in progress.
    Reconnecting,
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Disconnected => write!(f, "disconnected"),
            Self::Connecting => write!(f, "connecting"),
            Self::Connected => write!(f, "connected"),
            Self::Reconnecting => write!(f, "reconnecting"),
        }
    }
}

/// Bounded-retry reconnection state.
///
/// Owned by the client behind a mutex; the pump task and the reconnect timer
/// task both consult it. `suppressed` is set by a manual disconnect and stays
/// set until the next explicit `connect()`, so a timer that was already in
/// flight when the user disconnected never reopens the transport.
pub(crate) struct ReconnectState {
    attempts: u32,
    timer: Option<JoinHandle<()>>,
    suppressed: bool,
    generation: u64,
    base_delay: Duration,
    max_attempts: u32,
}

impl ReconnectState {
    pub(crate) fn new(base_delay: Duration, max_attempts: u32) -> Self {
        Self {
            attempts: 0,
            timer: None,
            suppressed: false,
            generation: 0,
            base_delay,
            max_attempts,
        }
    }

    /// Start the next attempt, returning the delay to wait before it.
    ///
    /// Returns `None` once the attempt cap is exhausted; the caller logs the
    /// terminal condition and stops.
    pub(crate) fn begin_attempt(&mut self) -> Option<Duration> {
        if self.attempts >= self.max_attempts {
            return None;
        }
        self.attempts += 1;
        Some(self.base_delay * (1u32 << (self.attempts - 1)))
    }

    /// Current attempt number (for logging).
    pub(crate) fn attempts(&self) -> u32 {
        self.attempts
    }

    /// Reset the attempt counter after a successful (re)connection.
    pub(crate) fn reset(&mut self) {
        self.attempts = 0;
    }

    /// Record the pending timer task for the attempt just scheduled.
    pub(crate) fn set_timer(&mut self, timer: JoinHandle<()>) {
        self.timer = Some(timer);
    }

    /// Whether a reconnection attempt is already scheduled.
    ///
    /// Attempts are serialized: a new one must not be scheduled while this
    /// returns `true`.
    pub(crate) fn timer_pending(&self) -> bool {
        self.timer.is_some()
    }

    /// Clear the timer slot when its task starts running.
    pub(crate) fn clear_timer(&mut self) {
        self.timer = None;
    }

    /// Abort any pending timer. Idempotent.
    pub(crate) fn cancel_timer(&mut self) {
        if let Some(timer) = self.timer.take() {
            timer.abort();
        }
    }

    /// Suppress reconnection after a manual disconnect.
    pub(crate) fn suppress(&mut self) {
        self.suppressed = true;
    }

    /// Re-arm reconnection for a fresh manual `connect()`.
    pub(crate) fn resume(&mut self) {
        self.suppressed = false;
    }

    pub(crate) fn is_suppressed(&self) -> bool {
        self.suppressed
    }

    /// Invalidate every connection attempt currently in flight.
    ///
    /// A handshake captures the generation when it starts and may only
    /// install its stream if the generation is unchanged when it completes.
    /// `connect()` and `disconnect()` bump it, so a handshake they overtook
    /// discards its stream instead of resurrecting a stale connection.
    pub(crate) fn bump_generation(&mut self) -> u64 {
        self.generation += 1;
        self.generation
    }

    pub(crate) fn generation(&self) -> u64 {
        self.generation
    }
}
