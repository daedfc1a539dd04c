//! Event fan-out keyed by event kind.
//!
//! The dispatcher holds an explicit dispatch table mapping each
//! [`EventKind`] to its registered listeners. Both ambient subscribers and
//! the one-shot listeners of in-flight correlated commands register here;
//! there is no request-id routing, matching the bridge protocol.

use cashbridge_protocol::{EventKind, HardwareEvent};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::trace;

type Callback = Arc<dyn Fn(&HardwareEvent) + Send + Sync>;

/// Opaque handle identifying one listener registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

/// Fan-out of decoded events to listeners keyed by kind.
///
/// Cloning is cheap; all clones share one dispatch table. The dispatcher is
/// owned by the client façade and outlives individual connections, so
/// ambient listeners survive reconnection cycles.
#[derive(Clone, Default)]
pub struct EventDispatcher {
    inner: Arc<DispatcherInner>,
}

#[derive(Default)]
struct DispatcherInner {
    listeners: Mutex<HashMap<EventKind, Vec<(ListenerId, Callback)>>>,
    next_id: AtomicU64,
}

impl EventDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a listener for an event kind.
    ///
    /// Listeners are invoked in registration order.
    pub fn on(
        &self,
        kind: EventKind,
        callback: impl Fn(&HardwareEvent) + Send + Sync + 'static,
    ) -> ListenerId {
        let id = ListenerId(self.inner.next_id.fetch_add(1, Ordering::Relaxed));
        self.inner
            .listeners
            .lock()
            .entry(kind)
            .or_default()
            .push((id, Arc::new(callback)));
        trace!(%kind, ?id, "Listener registered");
        id
    }

    /// Remove a listener. Removing an unregistered listener is a no-op.
    pub fn off(&self, kind: EventKind, id: ListenerId) {
        let mut listeners = self.inner.listeners.lock();
        if let Some(entries) = listeners.get_mut(&kind) {
            entries.retain(|(entry_id, _)| *entry_id != id);
            if entries.is_empty() {
                listeners.remove(&kind);
            }
        }
    }

    /// Deliver an event to every listener registered for its kind.
    ///
    /// Dispatch iterates a snapshot of the listener set, so a listener that
    /// removes itself (or others) during its own invocation does not affect
    /// delivery to the remaining listeners of the same dispatch call.
    pub fn dispatch(&self, event: &HardwareEvent) {
        let snapshot: Vec<Callback> = {
            let listeners = self.inner.listeners.lock();
            listeners
                .get(&event.kind)
                .map(|entries| entries.iter().map(|(_, cb)| cb.clone()).collect())
                .unwrap_or_default()
        };

        trace!(kind = %event.kind, listeners = snapshot.len(), "Dispatching event");
        for callback in snapshot {
            callback(event);
        }
    }

    /// Number of listeners currently registered for a kind.
    pub fn listener_count(&self, kind: EventKind) -> usize {
        self.inner
            .listeners
            .lock()
            .get(&kind)
            .map_or(0, Vec::len)
    }
}
