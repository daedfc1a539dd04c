//! The bridge client façade.
//!
//! [`BridgeClient`] ties the transport, the connection supervisor, the event
//! dispatcher and the command correlator together behind one handle. It is
//! cheap to clone and safe to share; all clones drive the same connection.

use cashbridge_core::{Error, Result};
use cashbridge_core::constants::{
    CONNECT_TIMEOUT_MS, DEFAULT_BRIDGE_URL, DISPENSE_TIMEOUT_MS, HOPPER_LEVELS_TIMEOUT_MS,
    MAX_RECONNECT_ATTEMPTS, RECONNECT_BASE_DELAY_MS,
};
use cashbridge_protocol::{CommandMessage, DispenseRequest, EventKind, HardwareEvent, HopperLevel};
use futures::{SinkExt, StreamExt};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, error, info, warn};

use crate::correlator::Correlation;
use crate::dispatcher::{EventDispatcher, ListenerId};
use crate::supervisor::{ConnectionState, ReconnectState};
use crate::transport::{self, Connection, WsStream};

/// Client configuration.
///
/// The defaults match the bridge service as deployed on kiosk hardware;
/// tests shorten the timeouts instead of mocking the clock.
#[derive(Debug, Clone)]
pub struct BridgeConfig {
    /// WebSocket endpoint of the peripheral-control service.
    pub url: String,

    /// Handshake timeout for each connection attempt.
    pub connect_timeout: Duration,

    /// Delay before the first reconnection attempt; doubles per attempt.
    pub reconnect_base_delay: Duration,

    /// Reconnection attempts before giving up until the next `connect()`.
    pub max_reconnect_attempts: u32,

    /// How long `dispense_change` waits for its outcome event.
    pub dispense_timeout: Duration,

    /// How long `request_hopper_levels` waits for its snapshot event.
    pub hopper_levels_timeout: Duration,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_BRIDGE_URL.to_string(),
            connect_timeout: Duration::from_millis(CONNECT_TIMEOUT_MS),
            reconnect_base_delay: Duration::from_millis(RECONNECT_BASE_DELAY_MS),
            max_reconnect_attempts: MAX_RECONNECT_ATTEMPTS,
            dispense_timeout: Duration::from_millis(DISPENSE_TIMEOUT_MS),
            hopper_levels_timeout: Duration::from_millis(HOPPER_LEVELS_TIMEOUT_MS),
        }
    }
}

/// Handle to the hardware bridge.
///
/// # Examples
///
/// ```no_run
/// use cashbridge_client::BridgeClient;
/// use cashbridge_client::protocol::EventKind;
///
/// # async fn run() -> cashbridge_core::Result<()> {
/// let client = BridgeClient::new();
/// client.on(EventKind::Credit, |event| {
///     println!("credit from {}", event.device_id);
/// });
/// client.connect().await?;
/// client.start_session();
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct BridgeClient {
    inner: Arc<Inner>,
}

struct Inner {
    config: BridgeConfig,
    dispatcher: EventDispatcher,
    state: Mutex<ConnectionState>,
    conn: Mutex<Option<Connection>>,
    reconnect: Mutex<ReconnectState>,
}

impl BridgeClient {
    /// Create a client with the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(BridgeConfig::default())
    }

    /// Create a client with an explicit configuration.
    #[must_use]
    pub fn with_config(config: BridgeConfig) -> Self {
        let reconnect = ReconnectState::new(config.reconnect_base_delay, config.max_reconnect_attempts);
        Self {
            inner: Arc::new(Inner {
                config,
                dispatcher: EventDispatcher::new(),
                state: Mutex::new(ConnectionState::Disconnected),
                conn: Mutex::new(None),
                reconnect: Mutex::new(reconnect),
            }),
        }
    }

    /// Current lifecycle state of the connection.
    #[must_use]
    pub fn state(&self) -> ConnectionState {
        *self.inner.state.lock()
    }

    /// Whether a connection to the bridge is currently established.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.state() == ConnectionState::Connected
    }

    /// Connect to the bridge.
    ///
    /// A fresh `connect()` re-arms automatic reconnection even after a manual
    /// disconnect or an exhausted retry schedule. Calling it while already
    /// connected is a no-op.
    ///
    /// # Errors
    /// Returns `Error::ConnectionFailed` if the initial attempt fails; no
    /// automatic retry follows a failed explicit connect.
    pub async fn connect(&self) -> Result<()> {
        let generation = {
            let mut rec = self.inner.reconnect.lock();
            rec.cancel_timer();
            rec.reset();
            rec.resume();
            // Invalidate any reconnect handshake already in flight; this
            // call owns the connection from here on.
            rec.bump_generation()
        };

        if self.is_connected() {
            debug!("Already connected to bridge");
            return Ok(());
        }
        *self.inner.state.lock() = ConnectionState::Connecting;

        match transport::open(&self.inner.config.url, self.inner.config.connect_timeout).await {
            Ok(stream) => {
                if Inner::install_if_current(&self.inner, stream, generation).await {
                    Ok(())
                } else {
                    Err(Error::connection_failed("connection attempt superseded"))
                }
            }
            Err(e) => {
                let current = self.inner.reconnect.lock().generation() == generation;
                if current {
                    *self.inner.state.lock() = ConnectionState::Disconnected;
                }
                Err(e)
            }
        }
    }

    /// Disconnect from the bridge and suppress automatic reconnection.
    ///
    /// Cancels any pending reconnection timer. Safe to call when already
    /// disconnected.
    pub async fn disconnect(&self) {
        {
            let mut rec = self.inner.reconnect.lock();
            rec.suppress();
            rec.cancel_timer();
            rec.bump_generation();
        }

        let conn = self.inner.conn.lock().take();
        match conn {
            Some(conn) => {
                info!("Disconnecting from bridge");
                // The pump emits the disconnected event and settles the state.
                conn.close().await;
            }
            None => {
                *self.inner.state.lock() = ConnectionState::Disconnected;
            }
        }
    }

    /// Register an ambient listener for an event kind.
    ///
    /// Listeners live until removed with [`BridgeClient::off`]; they survive
    /// disconnection and reconnection cycles.
    pub fn on(
        &self,
        kind: EventKind,
        callback: impl Fn(&HardwareEvent) + Send + Sync + 'static,
    ) -> ListenerId {
        self.inner.dispatcher.on(kind, callback)
    }

    /// Remove a listener registered with [`BridgeClient::on`].
    pub fn off(&self, kind: EventKind, id: ListenerId) {
        self.inner.dispatcher.off(kind, id);
    }

    /// Subscribe to an event kind through an async channel.
    ///
    /// The subscription buffers events until received and removes its
    /// listener when dropped.
    #[must_use]
    pub fn subscribe(&self, kind: EventKind) -> EventSubscription {
        let (tx, rx) = mpsc::unbounded_channel();
        let id = self.inner.dispatcher.on(kind, move |event| {
            let _ = tx.send(event.clone());
        });
        EventSubscription {
            dispatcher: self.inner.dispatcher.clone(),
            kind,
            id,
            rx,
        }
    }

    /// Begin a payment session.
    ///
    /// Fire-and-forget: if no connection is open the command is dropped with
    /// a warning.
    pub fn start_session(&self) {
        self.send_command(&CommandMessage::start_session());
    }

    /// End the current payment session. Fire-and-forget.
    pub fn end_session(&self) {
        self.send_command(&CommandMessage::end_session());
    }

    /// Enable coin/bill acceptance. Fire-and-forget.
    pub fn enable_acceptance(&self) {
        self.send_command(&CommandMessage::enable_acceptance());
    }

    /// Disable coin/bill acceptance. Fire-and-forget.
    pub fn disable_acceptance(&self) {
        self.send_command(&CommandMessage::disable_acceptance());
    }

    /// Dispense change and wait for the outcome.
    ///
    /// The listeners are registered before the command is sent, so the
    /// outcome event cannot be missed however fast the hardware answers.
    ///
    /// # Errors
    /// - `Error::DispenseFailed` if the bridge reports a dispense error.
    /// - `Error::Timeout` if no outcome arrives in time, including when the
    ///   command was dropped because no connection was open.
    pub async fn dispense_change(&self, request: &DispenseRequest) -> Result<()> {
        let command = CommandMessage::dispense_change(request)?;
        let correlation = Correlation::register(
            &self.inner.dispatcher,
            EventKind::DispenseSuccess,
            Some(EventKind::DispenseError),
        );

        info!(total = request.total_amount, "Dispensing change");
        self.send_command(&command);

        correlation
            .wait("dispense_change", self.inner.config.dispense_timeout)
            .await?;
        Ok(())
    }

    /// Request a hopper fill-level snapshot.
    ///
    /// # Errors
    /// - `Error::Timeout` if no `hopper_level` event arrives in time.
    /// - `Error::InvalidMessage` if the snapshot payload is malformed.
    pub async fn request_hopper_levels(&self) -> Result<Vec<HopperLevel>> {
        let correlation =
            Correlation::register(&self.inner.dispatcher, EventKind::HopperLevel, None);

        self.send_command(&CommandMessage::get_hopper_levels());

        let event = correlation
            .wait("get_hopper_levels", self.inner.config.hopper_levels_timeout)
            .await?;
        event.data_field("hoppers")
    }

    /// Serialize a command and queue it on the live connection, if any.
    fn send_command(&self, command: &CommandMessage) {
        let conn = self.inner.conn.lock();
        let Some(conn) = conn.as_ref() else {
            warn!(command = %command.command, "No connection open; dropping command");
            return;
        };
        match command.encode() {
            Ok(text) => {
                if let Err(e) = conn.send(text) {
                    warn!(command = %command.command, error = %e, "Failed to queue command");
                }
            }
            Err(e) => {
                warn!(command = %command.command, error = %e, "Failed to encode command");
            }
        }
    }
}

impl Default for BridgeClient {
    fn default() -> Self {
        Self::new()
    }
}

impl Inner {
    /// Wire up a freshly opened stream: spawn the pump, publish the
    /// connection handle and announce the state change.
    ///
    /// The handshake ran without holding any lock, so a `disconnect()` or a
    /// newer `connect()` may have landed meanwhile. The stream is installed
    /// only if `generation` is still current and reconnection is not
    /// suppressed; otherwise it is closed and discarded. Returns whether the
    /// stream was installed.
    async fn install_if_current(inner: &Arc<Inner>, stream: WsStream, generation: u64) -> bool {
        let superseded = {
            let mut rec = inner.reconnect.lock();
            if rec.generation() == generation && !rec.is_suppressed() {
                let (tx, rx) = mpsc::unbounded_channel();
                let pump = tokio::spawn(Inner::pump(inner.clone(), stream, rx));
                *inner.conn.lock() = Some(Connection::new(tx, pump));
                *inner.state.lock() = ConnectionState::Connected;
                rec.reset();
                None
            } else {
                Some(stream)
            }
        };

        match superseded {
            None => {
                info!(url = %inner.config.url, "Connected to hardware bridge");
                inner.dispatcher.dispatch(&HardwareEvent::connected());
                true
            }
            Some(mut stream) => {
                debug!("Discarding connection superseded before handshake completion");
                let _ = stream.close(None).await;
                false
            }
        }
    }

    /// Single task owning the socket: forwards queued commands out and
    /// dispatches decoded events in, until either side ends the connection.
    async fn pump(
        inner: Arc<Inner>,
        stream: WsStream,
        mut outbound: mpsc::UnboundedReceiver<String>,
    ) {
        let (mut sink, mut source) = stream.split();
        let mut manual = false;

        loop {
            tokio::select! {
                queued = outbound.recv() => match queued {
                    Some(text) => {
                        if let Err(e) = sink.send(Message::Text(text.into())).await {
                            warn!(error = %e, "Failed to send command to bridge");
                            break;
                        }
                    }
                    // Sender dropped: a manual disconnect. Close cleanly.
                    None => {
                        let _ = sink.close().await;
                        manual = true;
                        break;
                    }
                },
                frame = source.next() => match frame {
                    Some(Ok(Message::Text(text))) => match HardwareEvent::decode(text.as_str()) {
                        Ok(event) => {
                            debug!(kind = %event.kind, device = %event.device_id, "Event from bridge");
                            inner.dispatcher.dispatch(&event);
                        }
                        Err(e) => {
                            warn!(error = %e, "Dropping malformed message from bridge");
                        }
                    },
                    Some(Ok(Message::Close(_))) => {
                        info!("Bridge closed the connection");
                        break;
                    }
                    // Pings are answered by the protocol layer; other frame
                    // kinds carry nothing for us.
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        warn!(error = %e, "WebSocket read error");
                        break;
                    }
                    None => {
                        info!("Bridge connection ended");
                        break;
                    }
                },
            }
        }

        Inner::finish_connection(&inner, manual);
    }

    /// Tear down after the pump exits: announce the disconnect and either
    /// settle as disconnected or start the reconnection schedule.
    fn finish_connection(inner: &Arc<Inner>, manual: bool) {
        drop(inner.conn.lock().take());

        {
            let mut rec = inner.reconnect.lock();
            if manual || rec.is_suppressed() {
                *inner.state.lock() = ConnectionState::Disconnected;
                info!("Disconnected from bridge");
            } else {
                *inner.state.lock() = ConnectionState::Reconnecting;
                warn!("Connection to bridge lost");
                Inner::schedule_reconnect(inner, &mut rec);
            }
        }

        // State is settled first so listeners observe it consistently.
        inner.dispatcher.dispatch(&HardwareEvent::disconnected());
    }

    /// Schedule the next reconnection attempt, or give up when the cap is
    /// reached. Caller holds the reconnect lock.
    fn schedule_reconnect(inner: &Arc<Inner>, rec: &mut ReconnectState) {
        if rec.timer_pending() {
            return;
        }
        match rec.begin_attempt() {
            None => {
                error!(
                    attempts = rec.attempts(),
                    "Reconnection attempts exhausted; call connect() to retry"
                );
                *inner.state.lock() = ConnectionState::Disconnected;
            }
            Some(delay) => {
                info!(
                    attempt = rec.attempts(),
                    delay_ms = delay.as_millis() as u64,
                    "Scheduling reconnection attempt"
                );
                let task_inner = inner.clone();
                rec.set_timer(tokio::spawn(async move {
                    tokio::time::sleep(delay).await;
                    Inner::try_reconnect(task_inner).await;
                }));
            }
        }
    }

    /// Body of the reconnection timer task.
    async fn try_reconnect(inner: Arc<Inner>) {
        let (attempt, generation) = {
            let mut rec = inner.reconnect.lock();
            rec.clear_timer();
            if rec.is_suppressed() {
                debug!("Reconnection suppressed by manual disconnect");
                return;
            }
            (rec.attempts(), rec.generation())
        };

        info!(attempt, "Attempting reconnection");
        match transport::open(&inner.config.url, inner.config.connect_timeout).await {
            Ok(stream) => {
                if !Inner::install_if_current(&inner, stream, generation).await {
                    debug!(attempt, "Reconnection overtaken by connect() or disconnect()");
                }
            }
            Err(e) => {
                warn!(attempt, error = %e, "Reconnection attempt failed");
                let mut rec = inner.reconnect.lock();
                // connect() or disconnect() may have landed while the
                // handshake ran; the schedule then belongs to them.
                if rec.generation() == generation && !rec.is_suppressed() {
                    Inner::schedule_reconnect(&inner, &mut rec);
                }
            }
        }
    }
}

/// Channel-based subscription to one event kind.
///
/// Returned by [`BridgeClient::subscribe`]; dropping it removes the
/// underlying listener.
pub struct EventSubscription {
    dispatcher: EventDispatcher,
    kind: EventKind,
    id: ListenerId,
    rx: mpsc::UnboundedReceiver<HardwareEvent>,
}

impl EventSubscription {
    /// Event kind this subscription delivers.
    #[must_use]
    pub fn kind(&self) -> EventKind {
        self.kind
    }

    /// Receive the next event of the subscribed kind.
    pub async fn recv(&mut self) -> Option<HardwareEvent> {
        self.rx.recv().await
    }
}

impl Drop for EventSubscription {
    fn drop(&mut self) {
        self.dispatcher.off(self.kind, self.id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_values() {
        let config = BridgeConfig::default();
        assert_eq!(config.url, "ws://localhost:8765");
        assert_eq!(config.reconnect_base_delay, Duration::from_millis(2000));
        assert_eq!(config.max_reconnect_attempts, 10);
        assert_eq!(config.dispense_timeout, Duration::from_secs(30));
        assert_eq!(config.hopper_levels_timeout, Duration::from_secs(5));
    }

    #[test]
    fn test_fresh_client_is_disconnected() {
        let client = BridgeClient::new();
        assert_eq!(client.state(), ConnectionState::Disconnected);
        assert!(!client.is_connected());
    }

    #[test]
    fn test_commands_without_connection_do_not_panic() {
        let client = BridgeClient::new();
        client.start_session();
        client.end_session();
        client.enable_acceptance();
        client.disable_acceptance();
        assert!(!client.is_connected());
    }

    #[test]
    fn test_subscription_drop_removes_listener() {
        let client = BridgeClient::new();
        let subscription = client.subscribe(EventKind::Credit);
        assert_eq!(
            client.inner.dispatcher.listener_count(EventKind::Credit),
            1
        );

        drop(subscription);
        assert_eq!(
            client.inner.dispatcher.listener_count(EventKind::Credit),
            0
        );
    }

    #[tokio::test]
    async fn test_disconnect_when_not_connected_is_noop() {
        let client = BridgeClient::new();
        client.disconnect().await;
        assert_eq!(client.state(), ConnectionState::Disconnected);
    }
}
