//! Playback state snapshot
//!
//! `PlaybackState` is the data observers bind to. It has one writer (the
//! transport controller) and is compared by session `id` only: `change(to)`
//! rewrites every field in place, and observers holding on to "the session"
//! must still see the same subject afterwards.

use crate::error::{Error, Result};
use cadence_common::events::{LoopMode, PlaybackStatus};
use uuid::Uuid;

/// Current transport state of one playback session
#[derive(Debug, Clone)]
pub struct PlaybackState {
    id: Uuid,
    status: PlaybackStatus,
    duration_ms: u64,
    current_time_ms: u64,
    real_time_ms: u64,
    volume: f64,
    balance: f64,
    rate: f64,
    mute: bool,
    loop_mode: LoopMode,
}

impl PlaybackState {
    /// Fresh session with a new id and default values
    pub fn new() -> Self {
        Self::with_id(Uuid::new_v4())
    }

    /// Fresh session with a known id
    pub fn with_id(id: Uuid) -> Self {
        Self {
            id,
            status: PlaybackStatus::Unknown,
            duration_ms: 0,
            current_time_ms: 0,
            real_time_ms: 0,
            volume: 1.0,
            balance: 0.0,
            rate: 1.0,
            mute: false,
            loop_mode: LoopMode::Off,
        }
    }

    /// Replace every field with the values of `to`, including the id
    pub fn change(&mut self, to: &PlaybackState) {
        self.clone_from(to);
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn status(&self) -> PlaybackStatus {
        self.status
    }

    pub fn set_status(&mut self, status: PlaybackStatus) {
        self.status = status;
    }

    pub fn duration_ms(&self) -> u64 {
        self.duration_ms
    }

    /// Set the item duration
    ///
    /// A playhead beyond the new duration is pulled back to it.
    pub fn set_duration_ms(&mut self, duration_ms: u64) {
        self.duration_ms = duration_ms;
        if self.current_time_ms > duration_ms {
            self.current_time_ms = duration_ms;
        }
    }

    pub fn current_time_ms(&self) -> u64 {
        self.current_time_ms
    }

    /// Set the playhead; positions past the duration are rejected, callers clamp first
    pub fn set_current_time_ms(&mut self, position_ms: u64) -> Result<()> {
        if position_ms > self.duration_ms {
            return Err(Error::InvalidArgument(format!(
                "position {} ms beyond duration {} ms",
                position_ms, self.duration_ms
            )));
        }
        self.current_time_ms = position_ms;
        Ok(())
    }

    pub fn real_time_ms(&self) -> u64 {
        self.real_time_ms
    }

    /// Only the controller writes real time, always from its `RealTimeClock`
    pub(crate) fn set_real_time_ms(&mut self, real_time_ms: u64) {
        self.real_time_ms = real_time_ms;
    }

    pub fn volume(&self) -> f64 {
        self.volume
    }

    pub fn set_volume(&mut self, volume: f64) {
        self.volume = volume;
    }

    pub fn balance(&self) -> f64 {
        self.balance
    }

    pub fn set_balance(&mut self, balance: f64) {
        self.balance = balance;
    }

    pub fn rate(&self) -> f64 {
        self.rate
    }

    /// Set the playback rate; must be finite and positive
    pub fn set_rate(&mut self, rate: f64) -> Result<()> {
        if !(rate.is_finite() && rate > 0.0) {
            return Err(Error::InvalidArgument(format!("rate must be positive, got {}", rate)));
        }
        self.rate = rate;
        Ok(())
    }

    pub fn mute(&self) -> bool {
        self.mute
    }

    pub fn set_mute(&mut self, mute: bool) {
        self.mute = mute;
    }

    pub fn loop_mode(&self) -> LoopMode {
        self.loop_mode
    }

    pub fn set_loop_mode(&mut self, loop_mode: LoopMode) {
        self.loop_mode = loop_mode;
    }

    /// Progress through the item in [0, 1], 0 when duration is unknown
    pub fn progress(&self) -> f64 {
        if self.duration_ms == 0 {
            0.0
        } else {
            self.current_time_ms as f64 / self.duration_ms as f64
        }
    }
}

impl Default for PlaybackState {
    fn default() -> Self {
        Self::new()
    }
}

impl PartialEq for PlaybackState {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for PlaybackState {}
