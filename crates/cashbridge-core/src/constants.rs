//! Protocol and client constants for the hardware bridge.
//!
//! The bridge service translates device-level protocols (MDB/ccTalk) into a
//! JSON-over-WebSocket message protocol; these constants cover the client
//! side of that protocol only.

/// Default WebSocket endpoint of the local peripheral-control service.
///
/// The bridge always runs on the same machine as the point-of-sale host,
/// so the default is a loopback address. Override it through
/// `BridgeConfig` when the service listens elsewhere.
pub const DEFAULT_BRIDGE_URL: &str = "ws://localhost:8765";

/// Base delay for reconnection backoff (milliseconds).
///
/// After an unexpected close, attempt `n` is scheduled
/// `RECONNECT_BASE_DELAY_MS * 2^(n-1)` ms out: 2000, 4000, 8000, …
pub const RECONNECT_BASE_DELAY_MS: u64 = 2000;

/// Maximum number of consecutive reconnection attempts.
///
/// Once this many attempts have failed, reconnection stops permanently and
/// the client stays disconnected until `connect()` is called again.
pub const MAX_RECONNECT_ATTEMPTS: u32 = 10;

/// Timeout for a dispense command to produce a success or error event
/// (milliseconds).
///
/// Dispensing is mechanical and can legitimately take many seconds when
/// several hoppers run in sequence, hence the generous window.
pub const DISPENSE_TIMEOUT_MS: u64 = 30_000;

/// Timeout for a hopper-level query to produce its snapshot event
/// (milliseconds).
pub const HOPPER_LEVELS_TIMEOUT_MS: u64 = 5_000;

/// Timeout for the initial WebSocket handshake (milliseconds).
pub const CONNECT_TIMEOUT_MS: u64 = 5_000;

/// Device identifier used on synthetic connectivity events emitted by the
/// client itself rather than by a peripheral.
pub const BRIDGE_DEVICE_ID: &str = "bridge";
