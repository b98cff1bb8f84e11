//! Media engine boundary
//!
//! The engine is a black box: it takes transport primitives and reports
//! back through an event channel. Engines run decode/output on their own
//! threads and must never touch transport state directly; every callback is
//! an `EngineEvent` sent to the control task.
//!
//! **Generations:** each `play`, `seek` and `stop` carries the controller's
//! current generation. The engine stamps every event with the most recent
//! generation it was given, so the controller can drop callbacks that belong
//! to a superseded operation.

pub mod clock;

pub use clock::ClockEngine;

use crate::playback::MediaItem;
use tokio::sync::mpsc;

/// Monotonic operation counter shared by commands and events
pub type Generation = u64;

/// Sending half handed to engines at construction
pub type EngineEventSender = mpsc::UnboundedSender<EngineEvent>;

/// Receiving half owned by the control task
pub type EngineEventReceiver = mpsc::UnboundedReceiver<EngineEvent>;

/// Create the engine callback channel
pub fn event_channel() -> (EngineEventSender, EngineEventReceiver) {
    mpsc::unbounded_channel()
}

/// How an item ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MediaOutcome {
    /// Reached the end naturally
    Finished,
    /// Could not be opened or decoded, or the output failed
    Failed(String),
}

impl MediaOutcome {
    pub fn is_failure(&self) -> bool {
        matches!(self, MediaOutcome::Failed(_))
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            MediaOutcome::Finished => None,
            MediaOutcome::Failed(reason) => Some(reason),
        }
    }
}

/// What the engine is reporting
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineEventKind {
    /// Item loaded and its duration is known (ms)
    DurationChanged(u64),
    /// Raw playhead position (ms)
    PositionChanged(u64),
    /// Output is running steadily after a play/resume
    PlaybackConfirmed,
    /// Item ended
    EndOfMedia(MediaOutcome),
}

/// Engine callback, tagged with the generation it belongs to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineEvent {
    pub generation: Generation,
    pub kind: EngineEventKind,
}

impl EngineEvent {
    pub fn new(generation: Generation, kind: EngineEventKind) -> Self {
        Self { generation, kind }
    }
}

/// Transport primitives of a decode/output engine
///
/// Calls come from the control task only. Implementations must not block for
/// long; loading and decoding happen on the engine's own threads.
pub trait MediaEngine: Send {
    /// Load `item` and start output
    fn play(&mut self, item: &MediaItem, generation: Generation);

    fn pause(&mut self);

    fn resume(&mut self);

    /// Halt output and unload the current item
    fn stop(&mut self, generation: Generation);

    /// Move the playhead; returns the position actually reached (ms)
    fn seek(&mut self, position_ms: u64, generation: Generation) -> u64;

    /// Latest playhead position, `None` when nothing is loaded
    fn position(&self) -> Option<u64>;

    fn set_volume(&mut self, volume: f64);

    fn set_balance(&mut self, balance: f64);

    fn set_rate(&mut self, rate: f64);

    fn set_mute(&mut self, mute: bool);

    /// Release output resources; a later `play` must work again
    fn dispose(&mut self);
}
