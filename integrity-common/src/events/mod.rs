//! Event system for IntegrityOS
//!
//! Provides the shared event definitions and the EventBus that couples the
//! client stores. The bus is an ordinary value owned by a composition root
//! and handed to the components that need it; there is no process-wide
//! instance.

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::models::{Filter, ImportStats, ObjectId};

/// Which component changed the filter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FilterOrigin {
    /// Map interaction (legend click, pipeline selector on the map)
    MapStore,
    /// Dashboard filter panel
    DataStore,
}

/// IntegrityOS event types
///
/// Events are broadcast via EventBus and can be serialized for logging or
/// forwarding to another process.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum IntegrityEvent {
    /// Active filter changed
    ///
    /// Triggers:
    /// - Data store: re-apply the filter and re-fetch (when origin is MapStore)
    FilterChanged {
        /// New filter, `None` for reset
        filter: Option<Filter>,
        origin: FilterOrigin,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Object collection and stats replaced after a successful fetch
    DataRefreshed {
        object_count: usize,
        filter: Option<Filter>,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Fetch failed; stale data is still shown
    RefreshFailed {
        message: String,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Highlighted marker changed
    MarkerHighlighted {
        object_id: Option<ObjectId>,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Map camera moved to a point
    CameraMoved {
        object_id: Option<ObjectId>,
        lat: f64,
        lon: f64,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Import finished on the backend
    ImportCompleted {
        stats: ImportStats,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Report export written
    ExportCompleted {
        format: String,
        bytes: usize,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Work permit issued for an object
    PermitIssued {
        permit_number: String,
        object_id: ObjectId,
        timestamp: chrono::DateTime<chrono::Utc>,
    },
}

impl IntegrityEvent {
    /// Get event type as string for filtering
    pub fn event_type(&self) -> &str {
        match self {
            IntegrityEvent::FilterChanged { .. } => "FilterChanged",
            IntegrityEvent::DataRefreshed { .. } => "DataRefreshed",
            IntegrityEvent::RefreshFailed { .. } => "RefreshFailed",
            IntegrityEvent::MarkerHighlighted { .. } => "MarkerHighlighted",
            IntegrityEvent::CameraMoved { .. } => "CameraMoved",
            IntegrityEvent::ImportCompleted { .. } => "ImportCompleted",
            IntegrityEvent::ExportCompleted { .. } => "ExportCompleted",
            IntegrityEvent::PermitIssued { .. } => "PermitIssued",
        }
    }
}

// ========================================
// EventBus Implementation
// ========================================

/// Event distribution bus between client components
///
/// The EventBus uses tokio::broadcast internally, providing:
/// - Non-blocking publish (slow subscribers don't block producers)
/// - Multiple concurrent subscribers
/// - Automatic cleanup when subscribers drop
/// - Lagged message detection for slow subscribers
///
/// # Examples
///
/// ```
/// use integrity_common::events::{EventBus, FilterOrigin, IntegrityEvent};
/// use integrity_common::Filter;
///
/// let event_bus = EventBus::new(100);
/// let mut rx = event_bus.subscribe();
///
/// event_bus.emit_lossy(IntegrityEvent::FilterChanged {
///     filter: Some(Filter::pipeline("MT-01")),
///     origin: FilterOrigin::MapStore,
///     timestamp: chrono::Utc::now(),
/// });
///
/// assert_eq!(rx.try_recv().unwrap().event_type(), "FilterChanged");
/// ```
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<IntegrityEvent>,
    capacity: usize,
}

impl EventBus {
    /// Creates a new EventBus with specified channel capacity
    ///
    /// * `capacity` - Number of events to buffer before dropping old events
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx, capacity }
    }

    /// Subscribe to all future events
    ///
    /// Events emitted before subscription are not received.
    pub fn subscribe(&self) -> broadcast::Receiver<IntegrityEvent> {
        self.tx.subscribe()
    }

    /// Emit an event to all subscribers
    ///
    /// Returns `Ok(subscriber_count)` if at least one subscriber exists.
    /// Returns `Err` if no subscribers are listening.
    #[allow(clippy::result_large_err)]
    pub fn emit(
        &self,
        event: IntegrityEvent,
    ) -> Result<usize, broadcast::error::SendError<IntegrityEvent>> {
        self.tx.send(event)
    }

    /// Emit an event, ignoring if no subscribers are listening
    pub fn emit_lossy(&self, event: IntegrityEvent) {
        let _ = self.tx.send(event);
    }

    /// Get the current number of active subscribers
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    /// Get the configured channel capacity
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filter_event(filter: Option<Filter>) -> IntegrityEvent {
        IntegrityEvent::FilterChanged {
            filter,
            origin: FilterOrigin::MapStore,
            timestamp: chrono::Utc::now(),
        }
    }

    #[test]
    fn test_eventbus_new() {
        let bus = EventBus::new(100);
        assert_eq!(bus.capacity(), 100);
        assert_eq!(bus.subscriber_count(), 0);
    }

    #[test]
    fn test_eventbus_subscribe() {
        let bus = EventBus::new(10);
        let _rx = bus.subscribe();
        assert_eq!(bus.subscriber_count(), 1);

        let _rx2 = bus.subscribe();
        assert_eq!(bus.subscriber_count(), 2);
    }

    #[test]
    fn test_eventbus_emit_without_subscribers_fails() {
        let bus = EventBus::new(10);
        assert!(bus.emit(filter_event(None)).is_err());
    }

    #[test]
    fn test_eventbus_emit_delivers_payload() {
        let bus = EventBus::new(10);
        let mut rx = bus.subscribe();

        bus.emit(filter_event(Some(Filter::pipeline("MT-04"))))
            .expect("emit should succeed");

        match rx.try_recv().expect("Should receive event") {
            IntegrityEvent::FilterChanged { filter, origin, .. } => {
                assert_eq!(filter, Some(Filter::pipeline("MT-04")));
                assert_eq!(origin, FilterOrigin::MapStore);
            }
            other => panic!("Unexpected event: {}", other.event_type()),
        }
    }

    #[test]
    fn test_eventbus_emit_lossy_on_full_channel() {
        let bus = EventBus::new(2);
        let mut rx = bus.subscribe();

        for i in 0..10 {
            bus.emit_lossy(IntegrityEvent::DataRefreshed {
                object_count: i,
                filter: None,
                timestamp: chrono::Utc::now(),
            });
        }

        // Slow subscriber observes the lag instead of blocking the producer
        assert!(matches!(
            rx.try_recv(),
            Err(broadcast::error::TryRecvError::Lagged(_))
        ));
    }

    #[test]
    fn test_eventbus_multiple_subscribers() {
        let bus = EventBus::new(10);
        let mut rx1 = bus.subscribe();
        let mut rx2 = bus.subscribe();

        bus.emit(IntegrityEvent::MarkerHighlighted {
            object_id: Some(5),
            timestamp: chrono::Utc::now(),
        })
        .expect("emit should succeed");

        assert_eq!(rx1.try_recv().unwrap().event_type(), "MarkerHighlighted");
        assert_eq!(rx2.try_recv().unwrap().event_type(), "MarkerHighlighted");
    }

    #[test]
    fn test_event_serialization_tagged() {
        let json = serde_json::to_value(filter_event(None)).unwrap();
        assert_eq!(json["type"], "FilterChanged");
        assert_eq!(json["origin"], "MapStore");
        assert!(json["filter"].is_null());
    }
}
