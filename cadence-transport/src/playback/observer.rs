//! Transport observers
//!
//! Observers are notified synchronously on the control task, in registration
//! order. They only ever see `&PlaybackState`, so a handler cannot re-enter
//! the controller while it is dispatching.

use super::{MediaItem, PlaybackState};
use crate::engine::MediaOutcome;
use cadence_common::events::{EventBus, PlaybackStatus, TransportEvent};
use chrono::Utc;

/// Receives transport notifications; every method defaults to a no-op
pub trait TransportObserver: Send {
    fn on_status_changed(&self, _state: &PlaybackState, _old: PlaybackStatus) {}

    /// A different item was loaded (not fired while restoring a session)
    fn on_track_changed(&self, _state: &PlaybackState, _item: &MediaItem) {}

    fn on_playback_start(&self, _state: &PlaybackState, _item: &MediaItem) {}

    fn on_playback_end(&self, _state: &PlaybackState, _item: Option<&MediaItem>, _outcome: &MediaOutcome) {}

    /// Position update from the engine (not fired while restoring a session)
    fn on_position_changed(&self, _state: &PlaybackState) {}

    fn on_seek_done(&self, _state: &PlaybackState) {}

    /// Listening time crossed `mark_ms` for the current item
    fn on_time_reached(&self, _state: &PlaybackState, _item: Option<&MediaItem>, _mark_ms: u64) {}

    fn on_controls_changed(&self, _state: &PlaybackState) {}

    fn on_loop_mode_changed(&self, _state: &PlaybackState) {}

    fn on_suspended(&self, _state: &PlaybackState) {}

    /// Restored session is steady again
    fn on_activated(&self, _state: &PlaybackState) {}
}

/// Ordered list of observers
#[derive(Default)]
pub struct ObserverList {
    observers: Vec<Box<dyn TransportObserver>>,
}

impl std::fmt::Debug for ObserverList {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObserverList")
            .field("len", &self.observers.len())
            .finish()
    }
}

impl ObserverList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, observer: Box<dyn TransportObserver>) {
        self.observers.push(observer);
    }

    pub fn len(&self) -> usize {
        self.observers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observers.is_empty()
    }

    /// Call `f` on each observer in registration order
    pub fn notify(&self, f: impl Fn(&dyn TransportObserver)) {
        for observer in &self.observers {
            f(observer.as_ref());
        }
    }
}

/// Forwards notifications onto the broadcast EventBus
#[derive(Debug, Clone)]
pub struct EventBusObserver {
    bus: EventBus,
}

impl EventBusObserver {
    pub fn new(bus: EventBus) -> Self {
        Self { bus }
    }
}

impl TransportObserver for EventBusObserver {
    fn on_status_changed(&self, state: &PlaybackState, old: PlaybackStatus) {
        self.bus.emit_lossy(TransportEvent::StatusChanged {
            session_id: state.id(),
            old_status: old,
            new_status: state.status(),
            timestamp: Utc::now(),
        });
    }

    fn on_track_changed(&self, state: &PlaybackState, item: &MediaItem) {
        self.bus.emit_lossy(TransportEvent::TrackChanged {
            session_id: state.id(),
            item_id: item.id,
            location: item.location.clone(),
            timestamp: Utc::now(),
        });
    }

    fn on_playback_start(&self, state: &PlaybackState, item: &MediaItem) {
        self.bus.emit_lossy(TransportEvent::PlaybackStarted {
            session_id: state.id(),
            item_id: item.id,
            timestamp: Utc::now(),
        });
    }

    fn on_playback_end(&self, state: &PlaybackState, item: Option<&MediaItem>, outcome: &MediaOutcome) {
        self.bus.emit_lossy(TransportEvent::PlaybackEnded {
            session_id: state.id(),
            item_id: item.map(|i| i.id),
            real_time_ms: state.real_time_ms(),
            error: outcome.error().map(str::to_string),
            timestamp: Utc::now(),
        });
    }

    fn on_position_changed(&self, state: &PlaybackState) {
        self.bus.emit_lossy(TransportEvent::PositionChanged {
            session_id: state.id(),
            position_ms: state.current_time_ms(),
            duration_ms: state.duration_ms(),
            real_time_ms: state.real_time_ms(),
            timestamp: Utc::now(),
        });
    }

    fn on_seek_done(&self, state: &PlaybackState) {
        self.bus.emit_lossy(TransportEvent::SeekDone {
            session_id: state.id(),
            position_ms: state.current_time_ms(),
            timestamp: Utc::now(),
        });
    }

    fn on_time_reached(&self, state: &PlaybackState, item: Option<&MediaItem>, mark_ms: u64) {
        self.bus.emit_lossy(TransportEvent::TimeReached {
            session_id: state.id(),
            item_id: item.map(|i| i.id),
            mark_ms,
            real_time_ms: state.real_time_ms(),
            timestamp: Utc::now(),
        });
    }

    fn on_controls_changed(&self, state: &PlaybackState) {
        self.bus.emit_lossy(TransportEvent::ControlsChanged {
            session_id: state.id(),
            volume: state.volume(),
            balance: state.balance(),
            rate: state.rate(),
            mute: state.mute(),
            timestamp: Utc::now(),
        });
    }

    fn on_loop_mode_changed(&self, state: &PlaybackState) {
        self.bus.emit_lossy(TransportEvent::LoopModeChanged {
            session_id: state.id(),
            loop_mode: state.loop_mode(),
            timestamp: Utc::now(),
        });
    }

    fn on_suspended(&self, state: &PlaybackState) {
        self.bus.emit_lossy(TransportEvent::Suspended {
            session_id: state.id(),
            status: state.status(),
            position_ms: state.current_time_ms(),
            timestamp: Utc::now(),
        });
    }

    fn on_activated(&self, state: &PlaybackState) {
        self.bus.emit_lossy(TransportEvent::Activated {
            session_id: state.id(),
            status: state.status(),
            position_ms: state.current_time_ms(),
            timestamp: Utc::now(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    struct Tagged {
        tag: &'static str,
        log: Arc<Mutex<Vec<&'static str>>>,
    }

    impl TransportObserver for Tagged {
        fn on_seek_done(&self, _state: &PlaybackState) {
            self.log.lock().unwrap().push(self.tag);
        }
    }

    #[test]
    fn test_dispatch_in_registration_order() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut list = ObserverList::new();
        for tag in ["first", "second", "third"] {
            list.register(Box::new(Tagged {
                tag,
                log: Arc::clone(&log),
            }));
        }

        let state = PlaybackState::new();
        list.notify(|o| o.on_seek_done(&state));
        list.notify(|o| o.on_position_changed(&state));

        assert_eq!(list.len(), 3);
        assert_eq!(*log.lock().unwrap(), vec!["first", "second", "third"]);
    }

    #[test]
    fn test_event_bus_observer_forwards() {
        let bus = EventBus::new(16);
        let mut rx = bus.subscribe();
        let observer = EventBusObserver::new(bus);

        let mut state = PlaybackState::new();
        state.set_status(PlaybackStatus::Playing);
        observer.on_status_changed(&state, PlaybackStatus::Paused);

        match rx.try_recv().unwrap() {
            TransportEvent::StatusChanged {
                session_id,
                old_status,
                new_status,
                ..
            } => {
                assert_eq!(session_id, state.id());
                assert_eq!(old_status, PlaybackStatus::Paused);
                assert_eq!(new_status, PlaybackStatus::Playing);
            }
            other => panic!("unexpected event {:?}", other),
        }
    }

    #[test]
    fn test_playback_end_carries_failure_reason() {
        let bus = EventBus::new(16);
        let mut rx = bus.subscribe();
        let observer = EventBusObserver::new(bus);

        let state = PlaybackState::new();
        let item = MediaItem::from_location("/music/broken.flac");
        observer.on_playback_end(&state, Some(&item), &MediaOutcome::Failed("corrupt".to_string()));

        match rx.try_recv().unwrap() {
            TransportEvent::PlaybackEnded { item_id, error, .. } => {
                assert_eq!(item_id, Some(item.id));
                assert_eq!(error.as_deref(), Some("corrupt"));
            }
            other => panic!("unexpected event {:?}", other),
        }
    }
}
