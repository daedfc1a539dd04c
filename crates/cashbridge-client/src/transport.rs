//! WebSocket transport to the peripheral-control service.
//!
//! The transport owns a single connection at a time. Outbound messages go
//! through an unbounded channel to the pump task, so sending is synchronous
//! and non-blocking from the caller's perspective; inbound messages are
//! handled entirely inside the pump.

use cashbridge_core::{Error, Result};
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tracing::{debug, info, warn};

pub(crate) type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Open a WebSocket connection to the bridge with a handshake timeout.
///
/// # Errors
/// Returns `Error::ConnectionFailed` if the endpoint refuses the connection
/// or the handshake does not complete within `connect_timeout`.
pub(crate) async fn open(url: &str, connect_timeout: Duration) -> Result<WsStream> {
    info!(%url, "Connecting to hardware bridge");

    match tokio::time::timeout(connect_timeout, connect_async(url)).await {
        Ok(Ok((stream, _response))) => {
            debug!(%url, "WebSocket handshake complete");
            Ok(stream)
        }
        Ok(Err(e)) => {
            warn!(%url, error = %e, "Connection to bridge failed");
            Err(Error::connection_failed(e.to_string()))
        }
        Err(_) => {
            warn!(
                %url,
                timeout_ms = connect_timeout.as_millis() as u64,
                "Connection to bridge timed out"
            );
            Err(Error::connection_failed(format!(
                "handshake timeout after {}ms",
                connect_timeout.as_millis()
            )))
        }
    }
}

/// Handle to a live connection: the outbound channel plus the pump task.
///
/// Dropping the handle (or calling [`Connection::close`]) drops the outbound
/// sender; the pump drains any queued commands, sends a close frame, and
/// exits through the manual-shutdown path.
pub(crate) struct Connection {
    outbound: mpsc::UnboundedSender<String>,
    pump: JoinHandle<()>,
}

impl Connection {
    pub(crate) fn new(outbound: mpsc::UnboundedSender<String>, pump: JoinHandle<()>) -> Self {
        Self { outbound, pump }
    }

    /// Queue a message for sending.
    ///
    /// # Errors
    /// Returns `Error::NotConnected` if the pump has already exited.
    pub(crate) fn send(&self, text: String) -> Result<()> {
        self.outbound.send(text).map_err(|_| Error::NotConnected)
    }

    /// Close the connection and wait for the pump to finish.
    pub(crate) async fn close(self) {
        drop(self.outbound);
        let _ = self.pump.await;
        debug!("Bridge connection closed");
    }
}
