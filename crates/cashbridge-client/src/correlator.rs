//! Correlation of fire-and-wait commands with their response events.
//!
//! The bridge protocol carries no request identifiers: a command is matched
//! to its response purely by event kind. Each correlated call registers a
//! one-shot success listener (and, for dispense, an error listener) before
//! the command is sent, then waits for whichever of {matching event,
//! timeout} happens first. Resolution is exactly-once: the listeners share a
//! take-once sender slot, and a single teardown path removes both listeners
//! no matter how the call settles.

use cashbridge_core::{Error, Result};
use cashbridge_protocol::{EventKind, HardwareEvent};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;

use crate::dispatcher::{EventDispatcher, ListenerId};

/// First matching event: `Ok` from the success kind, `Err` from the error kind.
type Outcome = std::result::Result<HardwareEvent, HardwareEvent>;

/// One in-flight correlated command.
///
/// Construct with [`Correlation::register`] *before* sending the command so
/// a fast response cannot slip past the listeners, then settle the call with
/// [`Correlation::wait`]. Dropping an unsettled correlation also removes its
/// listeners.
pub(crate) struct Correlation {
    dispatcher: EventDispatcher,
    success: (EventKind, ListenerId),
    error: Option<(EventKind, ListenerId)>,
    rx: oneshot::Receiver<Outcome>,
    torn_down: bool,
}

impl Correlation {
    /// Register the one-shot listeners for a correlated call.
    pub(crate) fn register(
        dispatcher: &EventDispatcher,
        success_kind: EventKind,
        error_kind: Option<EventKind>,
    ) -> Self {
        let (tx, rx) = oneshot::channel();
        let slot: Arc<Mutex<Option<oneshot::Sender<Outcome>>>> = Arc::new(Mutex::new(Some(tx)));

        let success_id = {
            let slot = slot.clone();
            dispatcher.on(success_kind, move |event| {
                if let Some(tx) = slot.lock().take() {
                    let _ = tx.send(Ok(event.clone()));
                }
            })
        };

        let error = error_kind.map(|kind| {
            let slot = slot.clone();
            let id = dispatcher.on(kind, move |event| {
                if let Some(tx) = slot.lock().take() {
                    let _ = tx.send(Err(event.clone()));
                }
            });
            (kind, id)
        });

        Self {
            dispatcher: dispatcher.clone(),
            success: (success_kind, success_id),
            error,
            rx,
            torn_down: false,
        }
    }

    /// Wait for the first matching event or the timeout, whichever comes
    /// first, and tear the listeners down.
    ///
    /// # Errors
    /// - `Error::Timeout` if neither event arrives within `timeout`.
    /// - `Error::DispenseFailed` carrying the device-supplied message (or a
    ///   generic fallback) if the error-kind event arrives first.
    /// - `Error::ConnectionClosed` if the client is torn down mid-call.
    pub(crate) async fn wait(mut self, operation: &str, timeout: Duration) -> Result<HardwareEvent> {
        let outcome = tokio::time::timeout(timeout, &mut self.rx).await;
        self.teardown();

        match outcome {
            Err(_elapsed) => Err(Error::timeout(operation, timeout.as_millis() as u64)),
            Ok(Err(_dropped)) => Err(Error::ConnectionClosed),
            Ok(Ok(Ok(event))) => Ok(event),
            Ok(Ok(Err(event))) => Err(Error::dispense_failed(
                event.error_message().unwrap_or("dispense failed"),
            )),
        }
    }

    /// Remove both listeners. Runs exactly once across all exit paths.
    fn teardown(&mut self) {
        if self.torn_down {
            return;
        }
        self.torn_down = true;
        self.dispatcher.off(self.success.0, self.success.1);
        if let Some((kind, id)) = self.error {
            self.dispatcher.off(kind, id);
        }
    }
}

impl Drop for Correlation {
    fn drop(&mut self) {
        self.teardown();
    }
}
