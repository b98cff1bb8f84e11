//! Listening-time clock
//!
//! Real time is the time actually spent listening to the current item. It
//! follows the raw engine position between seeks and ignores the jump of a
//! seek itself:
//!
//! ```text
//! real_time = real_anchor + (position - pos_anchor)
//! ```
//!
//! `real_anchor` is frozen just before a seek, `pos_anchor` is taken from the
//! position the engine landed on just after it.

/// Derives listening time from engine positions
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RealTimeClock {
    real_anchor_ms: u64,
    pos_anchor_ms: u64,
    real_time_ms: u64,
}

impl RealTimeClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// New item started: listening time restarts from zero
    pub fn on_played(&mut self) {
        self.reset();
    }

    /// Playback stopped: listening time restarts from zero
    pub fn on_stopped(&mut self) {
        self.reset();
    }

    /// Freeze the accumulated listening time before the playhead jumps
    pub fn on_pre_seek(&mut self) {
        self.real_anchor_ms = self.real_time_ms;
    }

    /// Take the landed position as the new reference point
    pub fn on_post_seek(&mut self, position_ms: u64) {
        self.pos_anchor_ms = position_ms;
    }

    /// Recompute listening time from a raw engine position
    ///
    /// Positions below the anchor (engine jitter right after a seek) count as
    /// zero progress rather than negative time.
    pub fn on_position_changed(&mut self, position_ms: u64) -> u64 {
        self.real_time_ms = self
            .real_anchor_ms
            .saturating_add(position_ms.saturating_sub(self.pos_anchor_ms));
        self.real_time_ms
    }

    /// Continue counting from a persisted listening time at a restored position
    pub fn restore(&mut self, real_time_ms: u64, position_ms: u64) {
        self.real_anchor_ms = real_time_ms;
        self.pos_anchor_ms = position_ms;
        self.real_time_ms = real_time_ms;
    }

    pub fn real_time_ms(&self) -> u64 {
        self.real_time_ms
    }

    pub fn real_anchor_ms(&self) -> u64 {
        self.real_anchor_ms
    }

    pub fn pos_anchor_ms(&self) -> u64 {
        self.pos_anchor_ms
    }

    fn reset(&mut self) {
        *self = Self::default();
    }
}
