//! Change event fan-out to notification sinks.
//!
//! After each poll the orchestrator broadcasts a [`ChangeEvent`] per polled
//! mailbox so an external push relay (server-sent events, websockets) can
//! forward it to connected clients. Delivery is fire-and-forget: a failing
//! or slow sink must never fail the poll.
//!
//! Sinks live in an explicit [`SinkRegistry`] with scoped subscribe and
//! unsubscribe, owned by whoever manages client connections.

use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tracing::debug;

/// One mailbox's outcome of a completed poll, as seen by notification
/// consumers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeEvent {
    /// The polled mailbox.
    pub mailbox_id: u64,
    /// The newly stored code, or `None` when the latest message had none.
    pub code: Option<String>,
    /// When the poll completed.
    pub timestamp: DateTime<Utc>,
}

/// Receives change events after each poll.
pub trait NotificationSink: Send + Sync {
    /// Delivers one event. Implementations must not block; delivery is
    /// best-effort and errors stay inside the sink.
    fn publish(&self, event: &ChangeEvent);
}

/// Token identifying one registered sink.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SinkId(u64);

/// Registry of notification sinks.
///
/// # Example
///
/// ```
/// use codewatch::notify::{ChangeEvent, NotificationSink, SinkRegistry};
/// use std::sync::{Arc, Mutex};
///
/// struct Collector(Mutex<Vec<ChangeEvent>>);
/// impl NotificationSink for Collector {
///     fn publish(&self, event: &ChangeEvent) {
///         self.0.lock().unwrap().push(event.clone());
///     }
/// }
///
/// let registry = SinkRegistry::new();
/// let sink = Arc::new(Collector(Mutex::new(Vec::new())));
/// let id = registry.subscribe(sink.clone());
/// // ... events flow while subscribed ...
/// registry.unsubscribe(id);
/// ```
#[derive(Default)]
pub struct SinkRegistry {
    sinks: Mutex<HashMap<u64, Arc<dyn NotificationSink>>>,
    next_id: AtomicU64,
}

impl SinkRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a sink and returns its id for later removal.
    pub fn subscribe(&self, sink: Arc<dyn NotificationSink>) -> SinkId {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.sinks
            .lock()
            .expect("sink registry lock poisoned")
            .insert(id, sink);
        debug!(sink_id = id, "Notification sink subscribed");
        SinkId(id)
    }

    /// Removes a sink. Removing an unknown id is a no-op.
    pub fn unsubscribe(&self, id: SinkId) {
        self.sinks
            .lock()
            .expect("sink registry lock poisoned")
            .remove(&id.0);
        debug!(sink_id = id.0, "Notification sink unsubscribed");
    }

    /// Returns the number of registered sinks.
    #[must_use]
    pub fn len(&self) -> usize {
        self.sinks.lock().expect("sink registry lock poisoned").len()
    }

    /// Returns `true` if no sinks are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Delivers an event to every registered sink.
    ///
    /// Sinks are invoked outside the registry lock, so a sink may
    /// subscribe or unsubscribe others from within `publish`.
    pub fn broadcast(&self, event: &ChangeEvent) {
        let sinks: Vec<Arc<dyn NotificationSink>> = self
            .sinks
            .lock()
            .expect("sink registry lock poisoned")
            .values()
            .cloned()
            .collect();

        debug!(
            mailbox_id = event.mailbox_id,
            sink_count = sinks.len(),
            has_code = event.code.is_some(),
            "Broadcasting change event"
        );

        for sink in sinks {
            sink.publish(event);
        }
    }
}

impl std::fmt::Debug for SinkRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SinkRegistry")
            .field("sink_count", &self.len())
            .finish_non_exhaustive()
    }
}
