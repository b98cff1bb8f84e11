//! Event types for Cadence transport
//!
//! Provides shared event definitions and the EventBus used to fan transport
//! notifications out to UI and telemetry consumers.

mod playback_types;

pub use playback_types::{LoopMode, PlaybackStatus};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use uuid::Uuid;

/// Transport event types
///
/// Events are broadcast via EventBus and can be serialized for any outer
/// surface (IPC, logs, UI bridges). Every event carries the id of the
/// playback session it belongs to.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum TransportEvent {
    /// Transport status changed (e.g. Playing -> Paused)
    StatusChanged {
        session_id: Uuid,
        old_status: PlaybackStatus,
        new_status: PlaybackStatus,
        timestamp: DateTime<Utc>,
    },

    /// A different item was loaded into the engine
    TrackChanged {
        session_id: Uuid,
        item_id: Uuid,
        location: String,
        timestamp: DateTime<Utc>,
    },

    /// Playback of an item started
    PlaybackStarted {
        session_id: Uuid,
        item_id: Uuid,
        timestamp: DateTime<Utc>,
    },

    /// An item reached its end, naturally or through an engine failure
    ///
    /// Triggers:
    /// - Statistics: record listening time (`real_time_ms`)
    /// - UI: show error for failed items
    PlaybackEnded {
        session_id: Uuid,
        item_id: Option<Uuid>,
        /// Cumulative listening time for the item
        real_time_ms: u64,
        /// Engine failure reason, `None` for a natural end
        error: Option<String>,
        timestamp: DateTime<Utc>,
    },

    /// Periodic position update
    PositionChanged {
        session_id: Uuid,
        position_ms: u64,
        duration_ms: u64,
        real_time_ms: u64,
        timestamp: DateTime<Utc>,
    },

    /// A seek finished and the playhead landed on `position_ms`
    SeekDone {
        session_id: Uuid,
        position_ms: u64,
        timestamp: DateTime<Utc>,
    },

    /// Listening time crossed a configured mark for the current item
    TimeReached {
        session_id: Uuid,
        item_id: Option<Uuid>,
        mark_ms: u64,
        real_time_ms: u64,
        timestamp: DateTime<Utc>,
    },

    /// Volume, balance, rate or mute changed
    ControlsChanged {
        session_id: Uuid,
        volume: f64,
        balance: f64,
        rate: f64,
        mute: bool,
        timestamp: DateTime<Utc>,
    },

    /// Loop mode changed
    LoopModeChanged {
        session_id: Uuid,
        loop_mode: LoopMode,
        timestamp: DateTime<Utc>,
    },

    /// Session persisted and engine released
    Suspended {
        session_id: Uuid,
        status: PlaybackStatus,
        position_ms: u64,
        timestamp: DateTime<Utc>,
    },

    /// Session restored from a snapshot and steady again
    Activated {
        session_id: Uuid,
        status: PlaybackStatus,
        position_ms: u64,
        timestamp: DateTime<Utc>,
    },
}

impl TransportEvent {
    /// Session the event belongs to
    pub fn session_id(&self) -> Uuid {
        match self {
            TransportEvent::StatusChanged { session_id, .. }
            | TransportEvent::TrackChanged { session_id, .. }
            | TransportEvent::PlaybackStarted { session_id, .. }
            | TransportEvent::PlaybackEnded { session_id, .. }
            | TransportEvent::PositionChanged { session_id, .. }
            | TransportEvent::SeekDone { session_id, .. }
            | TransportEvent::TimeReached { session_id, .. }
            | TransportEvent::ControlsChanged { session_id, .. }
            | TransportEvent::LoopModeChanged { session_id, .. }
            | TransportEvent::Suspended { session_id, .. }
            | TransportEvent::Activated { session_id, .. } => *session_id,
        }
    }

    /// Short event name, matching the serialized `type` tag
    pub fn event_type(&self) -> &'static str {
        match self {
            TransportEvent::StatusChanged { .. } => "StatusChanged",
            TransportEvent::TrackChanged { .. } => "TrackChanged",
            TransportEvent::PlaybackStarted { .. } => "PlaybackStarted",
            TransportEvent::PlaybackEnded { .. } => "PlaybackEnded",
            TransportEvent::PositionChanged { .. } => "PositionChanged",
            TransportEvent::SeekDone { .. } => "SeekDone",
            TransportEvent::TimeReached { .. } => "TimeReached",
            TransportEvent::ControlsChanged { .. } => "ControlsChanged",
            TransportEvent::LoopModeChanged { .. } => "LoopModeChanged",
            TransportEvent::Suspended { .. } => "Suspended",
            TransportEvent::Activated { .. } => "Activated",
        }
    }
}

// ========================================
// EventBus Implementation
// ========================================

/// Central event distribution bus for transport events
///
/// The EventBus uses tokio::broadcast internally, providing:
/// - Non-blocking publish (slow subscribers don't block the control task)
/// - Multiple concurrent subscribers
/// - Automatic cleanup when subscribers drop
/// - Lagged message detection for slow subscribers
///
/// # Examples
///
/// ```
/// use cadence_common::events::{EventBus, PlaybackStatus, TransportEvent};
///
/// let event_bus = EventBus::new(100);
/// let mut rx = event_bus.subscribe();
///
/// event_bus.emit_lossy(TransportEvent::StatusChanged {
///     session_id: uuid::Uuid::new_v4(),
///     old_status: PlaybackStatus::Paused,
///     new_status: PlaybackStatus::Playing,
///     timestamp: chrono::Utc::now(),
/// });
///
/// assert!(rx.try_recv().is_ok());
/// ```
#[derive(Debug, Clone)]
pub struct EventBus {
    tx: broadcast::Sender<TransportEvent>,
    capacity: usize,
}

impl EventBus {
    /// Creates a new EventBus with specified channel capacity
    ///
    /// `capacity` is the number of events buffered per subscriber before the
    /// oldest are dropped (subscriber sees `Lagged`).
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self {
            tx,
            capacity: capacity.max(1),
        }
    }

    /// Subscribe to all future events
    ///
    /// Events emitted before subscription are not received.
    pub fn subscribe(&self) -> broadcast::Receiver<TransportEvent> {
        self.tx.subscribe()
    }

    /// Emit an event to all subscribers
    ///
    /// Returns `Ok(subscriber_count)` if at least one subscriber exists.
    /// Returns `Err` if no subscribers are listening.
    #[allow(clippy::result_large_err)]
    pub fn emit(
        &self,
        event: TransportEvent,
    ) -> Result<usize, broadcast::error::SendError<TransportEvent>> {
        self.tx.send(event)
    }

    /// Emit an event, ignoring if no subscribers are listening
    pub fn emit_lossy(&self, event: TransportEvent) {
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

    fn status_event() -> TransportEvent {
        TransportEvent::StatusChanged {
            session_id: Uuid::new_v4(),
            old_status: PlaybackStatus::Paused,
            new_status: PlaybackStatus::Playing,
            timestamp: Utc::now(),
        }
    }

    #[test]
    fn test_eventbus_new() {
        let bus = EventBus::new(100);
        assert_eq!(bus.capacity(), 100);
        assert_eq!(bus.subscriber_count(), 0);
    }

    #[test]
    fn test_eventbus_zero_capacity_is_raised_to_one() {
        let bus = EventBus::new(0);
        assert_eq!(bus.capacity(), 1);
    }

    #[test]
    fn test_eventbus_subscribe() {
        let bus = EventBus::new(100);
        let _rx = bus.subscribe();
        assert_eq!(bus.subscriber_count(), 1);

        let _rx2 = bus.subscribe();
        assert_eq!(bus.subscriber_count(), 2);
    }

    #[test]
    fn test_eventbus_emit_no_subscribers() {
        let bus = EventBus::new(10);
        assert!(bus.emit(status_event()).is_err());
        // Lossy variant never fails
        bus.emit_lossy(status_event());
    }

    #[tokio::test]
    async fn test_eventbus_emit_with_subscriber() {
        let bus = EventBus::new(10);
        let mut rx = bus.subscribe();

        let event = status_event();
        let expected_session = event.session_id();
        assert_eq!(bus.emit(event).unwrap(), 1);

        let received = rx.recv().await.unwrap();
        assert_eq!(received.session_id(), expected_session);
        assert_eq!(received.event_type(), "StatusChanged");
    }

    #[test]
    fn test_event_serializes_with_type_tag() {
        let event = TransportEvent::SeekDone {
            session_id: Uuid::nil(),
            position_ms: 150_000,
            timestamp: Utc::now(),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "SeekDone");
        assert_eq!(json["position_ms"], 150_000);
    }
}
