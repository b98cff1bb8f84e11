//! Transport controller
//!
//! **Responsibilities:**
//! - Play status transitions (play, pause, resume, stop)
//! - Seeking (absolute, fractional, stepped) with real-time anchoring
//! - Bounded controls (volume, balance, rate, mute) and loop mode
//! - End-of-media policy per loop mode
//! - Session suspend/activate
//!
//! The controller is plain synchronous code with a single owner. It is driven
//! either directly (tests, embedding) or by `TransportService`, which owns it
//! on the control task and feeds it commands and engine events in order.
//!
//! **Engine event filtering:** every engine command is tagged with a
//! generation. Item-level events (duration, confirmation, load failures) are
//! accepted for the current item; position updates and natural ends only for
//! the latest operation, so callbacks from a superseded seek or play are
//! dropped.

use super::controls::TransportControls;
use super::observer::{ObserverList, TransportObserver};
use super::real_time::RealTimeClock;
use super::session::SessionPhase;
use super::snapshot::{self, PlaybackSnapshot};
use super::{MediaItem, PlaybackState, PlaylistProvider};
use crate::config::TransportSettings;
use crate::engine::{EngineEvent, EngineEventKind, Generation, MediaEngine, MediaOutcome};
use crate::error::{Error, Result};
use cadence_common::events::{LoopMode, PlaybackStatus};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, trace, warn};

/// Unit of a stepped seek
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SeekUnit {
    /// Configured number of milliseconds
    Absolute,
    /// Configured fraction of the item duration
    Relative,
}

/// Step sizes for stepped seeks
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SeekSteps {
    pub absolute_ms: u64,
    pub fraction: f64,
}

/// Listening-time marks, each reported once per item
#[derive(Debug, Clone, Default)]
struct TimeMarks {
    marks: Vec<u64>,
    next: usize,
}

impl TimeMarks {
    fn new(mut marks: Vec<u64>) -> Self {
        marks.sort_unstable();
        marks.dedup();
        Self { marks, next: 0 }
    }

    fn reset(&mut self) {
        self.next = 0;
    }

    /// Treat every mark at or below `real_time_ms` as already reported
    fn skip_reached(&mut self, real_time_ms: u64) {
        self.next = self.marks.partition_point(|m| *m <= real_time_ms);
    }

    /// Marks crossed since the last call
    fn crossed(&mut self, real_time_ms: u64) -> Vec<u64> {
        let end = self.marks.partition_point(|m| *m <= real_time_ms);
        if end <= self.next {
            return Vec::new();
        }
        let crossed = self.marks[self.next..end].to_vec();
        self.next = end;
        crossed
    }
}

/// State machine and command surface of the transport
pub struct TransportController<E, P> {
    state: PlaybackState,
    clock: RealTimeClock,
    controls: TransportControls,
    seek_steps: SeekSteps,
    engine: E,
    playlist: P,
    observers: ObserverList,
    /// Item loaded in the engine
    item: Option<MediaItem>,
    phase: SessionPhase,
    generation: Generation,
    /// Generation at which the current item was loaded
    item_generation: Generation,
    time_marks: TimeMarks,
    /// Engine failures since the last item that loaded
    consecutive_failures: usize,
    /// Snapshot taken by the last suspend, kept until the next activation
    last_snapshot: Option<PlaybackSnapshot>,
}

impl<E, P> std::fmt::Debug for TransportController<E, P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransportController")
            .field("state", &self.state)
            .field("phase", &self.phase)
            .field("generation", &self.generation)
            .field("item", &self.item)
            .finish()
    }
}

impl<E: MediaEngine, P: PlaylistProvider> TransportController<E, P> {
    pub fn new(mut engine: E, playlist: P, settings: &TransportSettings) -> Result<Self> {
        settings.validate()?;
        let controls = TransportControls::from_settings(settings)?;

        let mut state = PlaybackState::new();
        state.set_volume(controls.volume.clamp(settings.initial_volume));

        engine.set_volume(state.volume());
        engine.set_balance(state.balance());
        engine.set_rate(state.rate());
        engine.set_mute(state.mute());

        Ok(Self {
            state,
            clock: RealTimeClock::new(),
            controls,
            seek_steps: SeekSteps {
                absolute_ms: settings.seek_step_ms,
                fraction: settings.seek_step_fraction,
            },
            engine,
            playlist,
            observers: ObserverList::new(),
            item: None,
            phase: SessionPhase::Active,
            generation: 0,
            item_generation: 0,
            time_marks: TimeMarks::new(settings.time_marks_ms.clone()),
            consecutive_failures: 0,
            last_snapshot: None,
        })
    }

    // ========================================
    // Accessors
    // ========================================

    pub fn state(&self) -> &PlaybackState {
        &self.state
    }

    pub fn real_time_clock(&self) -> &RealTimeClock {
        &self.clock
    }

    pub fn controls(&self) -> &TransportControls {
        &self.controls
    }

    pub fn current_item(&self) -> Option<&MediaItem> {
        self.item.as_ref()
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    pub fn generation(&self) -> Generation {
        self.generation
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    pub fn engine_mut(&mut self) -> &mut E {
        &mut self.engine
    }

    pub fn playlist(&self) -> &P {
        &self.playlist
    }

    pub fn playlist_mut(&mut self) -> &mut P {
        &mut self.playlist
    }

    /// Add an observer; dispatch follows registration order
    pub fn register_observer(&mut self, observer: Box<dyn TransportObserver>) {
        self.observers.register(observer);
    }

    // ========================================
    // Play status
    // ========================================

    /// Load and play `item`, or the playlist's active item when `None`
    ///
    /// An unreadable item is not an error here; the engine reports it as a
    /// failed end-of-media.
    pub fn play(&mut self, item: Option<MediaItem>) -> Result<()> {
        self.ensure_live("play")?;

        let item = match item {
            Some(item) => {
                // Keep the playlist position in step with explicit picks
                self.playlist.select(item.id);
                item
            }
            None => self
                .playlist
                .active_item()
                .or_else(|| self.playlist.advance_to_next())
                .ok_or_else(|| Error::InvalidState("nothing to play".to_string()))?,
        };

        self.consecutive_failures = 0;
        self.load_and_play(item);
        Ok(())
    }

    pub fn pause(&mut self) -> Result<()> {
        self.ensure_live("pause")?;
        if self.item.is_none() || self.state.status() != PlaybackStatus::Playing {
            debug!("Pause ignored in status {}", self.state.status());
            return Ok(());
        }
        self.engine.pause();
        self.set_status(PlaybackStatus::Paused);
        Ok(())
    }

    pub fn resume(&mut self) -> Result<()> {
        self.ensure_live("resume")?;
        if self.item.is_none() || self.state.status() != PlaybackStatus::Paused {
            debug!("Resume ignored in status {}", self.state.status());
            return Ok(());
        }
        self.engine.resume();
        self.set_status(PlaybackStatus::Playing);
        Ok(())
    }

    pub fn toggle_pause(&mut self) -> Result<()> {
        match self.state.status() {
            PlaybackStatus::Playing => self.pause(),
            PlaybackStatus::Paused => self.resume(),
            _ => {
                self.ensure_live("toggle pause")?;
                debug!("Toggle ignored: nothing loaded");
                Ok(())
            }
        }
    }

    pub fn stop(&mut self) -> Result<()> {
        self.ensure_live("stop")?;
        self.stop_playback();
        Ok(())
    }

    // ========================================
    // Seeking
    // ========================================

    /// Seek to an absolute position, clamped to `[0, duration]`
    pub fn seek_to(&mut self, position_ms: u64) -> Result<()> {
        self.ensure_live("seek")?;
        self.seek_internal(position_ms);
        Ok(())
    }

    /// Seek to `fraction` of the duration; `fraction` must be in `[0, 1]`
    ///
    /// While paused the engine is resumed around the seek so it refreshes
    /// its output, and paused again; the status stays `Paused`.
    pub fn seek_fraction(&mut self, fraction: f64) -> Result<()> {
        if !(fraction.is_finite() && (0.0..=1.0).contains(&fraction)) {
            return Err(Error::InvalidArgument(format!(
                "seek fraction must be in [0, 1], got {}",
                fraction
            )));
        }
        self.ensure_live("seek")?;
        if self.item.is_none() {
            debug!("Seek ignored: nothing loaded");
            return Ok(());
        }

        let target = (self.state.duration_ms() as f64 * fraction).round() as u64;
        let paused = self.state.status() == PlaybackStatus::Paused;
        if paused {
            self.engine.resume();
        }
        self.seek_internal(target);
        if paused {
            self.engine.pause();
        }
        Ok(())
    }

    pub fn seek_forward(&mut self, unit: SeekUnit) -> Result<()> {
        self.ensure_live("seek forward")?;
        let target = self.state.current_time_ms().saturating_add(self.seek_delta(unit));
        self.seek_internal(target);
        Ok(())
    }

    pub fn seek_backward(&mut self, unit: SeekUnit) -> Result<()> {
        self.ensure_live("seek backward")?;
        let target = self.state.current_time_ms().saturating_sub(self.seek_delta(unit));
        self.seek_internal(target);
        Ok(())
    }

    fn seek_delta(&self, unit: SeekUnit) -> u64 {
        match unit {
            SeekUnit::Absolute => self.seek_steps.absolute_ms,
            SeekUnit::Relative => {
                (self.state.duration_ms() as f64 * self.seek_steps.fraction).round() as u64
            }
        }
    }

    fn seek_internal(&mut self, position_ms: u64) {
        if self.item.is_none() {
            debug!("Seek ignored: nothing loaded");
            return;
        }

        let target = position_ms.min(self.state.duration_ms());
        let generation = self.next_generation();

        self.clock.on_pre_seek();
        let reached = self.engine.seek(target, generation);
        let landed = self.set_position(reached);
        self.clock.on_post_seek(landed);

        debug!("Seek to {} ms landed at {} ms (generation {})", target, landed, generation);
        self.observers.notify(|o| o.on_seek_done(&self.state));
    }

    // ========================================
    // Controls
    // ========================================

    /// Set the playback rate; must be positive, then clamped to the rate bounds
    pub fn set_rate(&mut self, rate: f64) -> Result<()> {
        if !(rate.is_finite() && rate > 0.0) {
            return Err(Error::InvalidArgument(format!("rate must be positive, got {}", rate)));
        }
        self.ensure_live("rate")?;

        let clamped = self.controls.rate.clamp(rate);
        self.state.set_rate(clamped)?;
        self.engine.set_rate(clamped);
        info!("Rate set to {}", clamped);
        self.observers.notify(|o| o.on_controls_changed(&self.state));
        Ok(())
    }

    pub fn set_volume(&mut self, volume: f64) -> Result<()> {
        if !volume.is_finite() {
            return Err(Error::InvalidArgument(format!("volume must be finite, got {}", volume)));
        }
        self.ensure_live("volume")?;
        let volume = self.controls.volume.clamp(volume);
        self.apply_volume(volume);
        Ok(())
    }

    pub fn volume_up(&mut self) -> Result<()> {
        self.ensure_live("volume up")?;
        let volume = self.controls.volume.increment(self.state.volume());
        self.apply_volume(volume);
        Ok(())
    }

    pub fn volume_down(&mut self) -> Result<()> {
        self.ensure_live("volume down")?;
        let volume = self.controls.volume.decrement(self.state.volume());
        self.apply_volume(volume);
        Ok(())
    }

    fn apply_volume(&mut self, volume: f64) {
        if volume == self.state.volume() {
            return;
        }
        self.state.set_volume(volume);
        self.engine.set_volume(volume);
        debug!("Volume set to {}", volume);
        self.observers.notify(|o| o.on_controls_changed(&self.state));
    }

    pub fn set_balance(&mut self, balance: f64) -> Result<()> {
        if !balance.is_finite() {
            return Err(Error::InvalidArgument(format!("balance must be finite, got {}", balance)));
        }
        self.ensure_live("balance")?;
        let balance = self.controls.balance.clamp(balance);
        self.apply_balance(balance);
        Ok(())
    }

    pub fn balance_left(&mut self) -> Result<()> {
        self.ensure_live("balance left")?;
        let balance = self.controls.balance.decrement(self.state.balance());
        self.apply_balance(balance);
        Ok(())
    }

    pub fn balance_right(&mut self) -> Result<()> {
        self.ensure_live("balance right")?;
        let balance = self.controls.balance.increment(self.state.balance());
        self.apply_balance(balance);
        Ok(())
    }

    fn apply_balance(&mut self, balance: f64) {
        if balance == self.state.balance() {
            return;
        }
        self.state.set_balance(balance);
        self.engine.set_balance(balance);
        debug!("Balance set to {}", balance);
        self.observers.notify(|o| o.on_controls_changed(&self.state));
    }

    pub fn toggle_mute(&mut self) -> Result<()> {
        self.ensure_live("mute")?;
        let mute = !self.state.mute();
        self.state.set_mute(mute);
        self.engine.set_mute(mute);
        info!("Mute {}", if mute { "on" } else { "off" });
        self.observers.notify(|o| o.on_controls_changed(&self.state));
        Ok(())
    }

    pub fn set_loop_mode(&mut self, mode: LoopMode) -> Result<()> {
        self.ensure_live("loop mode")?;
        self.playlist.set_loop_mode(mode);
        if mode != self.state.loop_mode() {
            self.state.set_loop_mode(mode);
            info!("Loop mode set to {}", mode);
            self.observers.notify(|o| o.on_loop_mode_changed(&self.state));
        }
        Ok(())
    }

    // ========================================
    // Engine events
    // ========================================

    /// Apply one engine callback; stale callbacks are dropped
    pub fn handle_engine_event(&mut self, event: EngineEvent) {
        if self.phase.is_suspended() {
            trace!("Dropping engine event while suspended: {:?}", event);
            return;
        }

        let for_current_item = event.generation >= self.item_generation && event.generation <= self.generation;
        let for_latest_op = event.generation == self.generation;
        let accepted = match &event.kind {
            EngineEventKind::DurationChanged(_)
            | EngineEventKind::PlaybackConfirmed
            | EngineEventKind::EndOfMedia(MediaOutcome::Failed(_)) => for_current_item,
            EngineEventKind::PositionChanged(_) | EngineEventKind::EndOfMedia(MediaOutcome::Finished) => {
                for_latest_op
            }
        };
        if !accepted {
            trace!(
                "Dropping stale engine event {:?} (current generation {})",
                event,
                self.generation
            );
            return;
        }

        if !matches!(event.kind, EngineEventKind::EndOfMedia(MediaOutcome::Failed(_))) {
            self.consecutive_failures = 0;
        }

        // Accepted events during a restore belong to its reload or its seek
        let restoring = matches!(self.phase, SessionPhase::Activating { .. });
        match event.kind {
            EngineEventKind::DurationChanged(duration_ms) => self.on_duration_changed(duration_ms, restoring),
            EngineEventKind::PositionChanged(position_ms) => self.on_position_changed(position_ms, restoring),
            EngineEventKind::PlaybackConfirmed => {
                if self.phase.is_restoring(event.generation) {
                    self.finish_activation();
                } else {
                    trace!("Engine confirmed playback (generation {})", event.generation);
                }
            }
            EngineEventKind::EndOfMedia(outcome) => self.on_end_of_media(outcome),
        }
    }

    fn on_duration_changed(&mut self, duration_ms: u64, restoring: bool) {
        if self.item.is_none() {
            return;
        }
        debug!("Engine reported duration {} ms", duration_ms);
        self.state.set_duration_ms(duration_ms);
        if !restoring {
            self.observers.notify(|o| o.on_position_changed(&self.state));
        }
    }

    fn on_position_changed(&mut self, position_ms: u64, restoring: bool) {
        if self.item.is_none() || !self.state.status().is_loaded() {
            trace!("Position update ignored in status {}", self.state.status());
            return;
        }

        let position = self.set_position(position_ms);
        let real_time = self.clock.on_position_changed(position);
        self.state.set_real_time_ms(real_time);

        for mark in self.time_marks.crossed(real_time) {
            info!("Listening time reached {} ms", mark);
            self.observers
                .notify(|o| o.on_time_reached(&self.state, self.item.as_ref(), mark));
        }

        if !restoring {
            self.observers.notify(|o| o.on_position_changed(&self.state));
        }
    }

    /// Loop-mode policy; natural ends and engine failures take the same path
    fn on_end_of_media(&mut self, outcome: MediaOutcome) {
        match &outcome {
            MediaOutcome::Finished => info!("End of media"),
            MediaOutcome::Failed(reason) => {
                self.consecutive_failures += 1;
                warn!("Engine failed on current item: {}", reason);
            }
        }

        if matches!(self.phase, SessionPhase::Activating { .. }) {
            self.finish_activation();
        }

        self.observers
            .notify(|o| o.on_playback_end(&self.state, self.item.as_ref(), &outcome));

        match self.state.loop_mode() {
            LoopMode::Off => self.stop_playback(),
            LoopMode::Playlist if self.consecutive_failures >= self.playlist.item_count().max(1) => {
                warn!(
                    "{} items failed in a row, stopping playlist",
                    self.consecutive_failures
                );
                self.stop_playback();
            }
            LoopMode::Playlist => match self.playlist.advance_to_next() {
                Some(next) => self.load_and_play(next),
                None => self.stop_playback(),
            },
            LoopMode::Song => {
                self.seek_internal(0);
                // A paused transport stays paused at the start
                if self.state.status() == PlaybackStatus::Playing {
                    self.engine.resume();
                }
            }
        }
    }

    // ========================================
    // Session lifecycle
    // ========================================

    /// Capture the session, release the engine and enter `Suspended`
    ///
    /// Suspending an already suspended session returns the same snapshot.
    pub fn suspend(&mut self) -> Result<PlaybackSnapshot> {
        if self.phase.is_suspended() {
            return self
                .last_snapshot
                .clone()
                .ok_or_else(|| Error::InvalidState("suspended session has no snapshot".to_string()));
        }

        self.refresh_from_engine();
        let snapshot = snapshot::save(&self.state, self.item.as_ref(), self.playlist.id());

        self.engine.dispose();
        self.phase.transition(SessionPhase::Suspended)?;
        self.item = None;
        self.last_snapshot = Some(snapshot.clone());

        info!(
            "Session suspended: status={} position={} ms real={} ms",
            snapshot.status, snapshot.current_time_ms, snapshot.real_time_ms
        );
        self.observers.notify(|o| o.on_suspended(&self.state));
        Ok(snapshot)
    }

    /// Restore a session from `snapshot`
    ///
    /// With no snapshot, a suspended session restores from its own last
    /// snapshot and a fresh one simply becomes `Stopped`. Any failure leaves
    /// the session `Stopped` and `Active`.
    pub fn activate(&mut self, snapshot: Option<&PlaybackSnapshot>) -> Result<()> {
        self.check_can_activate()?;

        let Some(snapshot) = snapshot.cloned().or_else(|| self.last_snapshot.clone()) else {
            info!("No persisted session, starting stopped");
            self.enter_phase(SessionPhase::Active)?;
            self.set_status(PlaybackStatus::Stopped);
            self.observers.notify(|o| o.on_activated(&self.state));
            return Ok(());
        };

        let restored = match snapshot::load(&snapshot) {
            Ok(restored) => restored,
            Err(e) => {
                self.abandon_restore();
                return Err(e);
            }
        };

        self.state.change(&restored);
        self.clock.restore(restored.real_time_ms(), restored.current_time_ms());
        self.time_marks.skip_reached(restored.real_time_ms());
        self.playlist.set_loop_mode(restored.loop_mode());
        self.engine.set_volume(restored.volume());
        self.engine.set_balance(restored.balance());
        self.engine.set_rate(restored.rate());
        self.engine.set_mute(restored.mute());
        self.last_snapshot = None;

        if !restored.status().is_loaded() {
            info!("Restored {} session", restored.status());
            self.item = None;
            if restored.status() == PlaybackStatus::Unknown {
                self.state.set_status(PlaybackStatus::Stopped);
            }
            self.enter_phase(SessionPhase::Active)?;
            self.observers.notify(|o| o.on_activated(&self.state));
            return Ok(());
        }

        let item_id = snapshot
            .item_id
            .ok_or_else(|| Error::Persistence("snapshot has no item".to_string()))?;
        let Some(item) = self.playlist.select(item_id) else {
            self.abandon_restore();
            return Err(Error::ItemUnavailable(item_id));
        };

        // Reload paused, then restore the position under a fresh generation so
        // anything the engine emitted before the seek is stale.
        let load_generation = self.next_generation();
        self.item_generation = load_generation;
        self.engine.play(&item, load_generation);
        self.engine.pause();

        let restore_generation = self.next_generation();
        let reached = self.engine.seek(restored.current_time_ms(), restore_generation);
        let landed = self.set_position(reached);
        self.clock.restore(restored.real_time_ms(), landed);
        self.item = Some(item);

        if restored.status() == PlaybackStatus::Playing {
            self.engine.resume();
            self.enter_phase(SessionPhase::Activating {
                generation: restore_generation,
            })?;
            info!(
                "Restoring playing session at {} ms, waiting for engine confirmation",
                landed
            );
        } else {
            self.enter_phase(SessionPhase::Active)?;
            info!("Restored paused session at {} ms", landed);
            self.observers.notify(|o| o.on_activated(&self.state));
        }
        Ok(())
    }

    fn enter_phase(&mut self, next: SessionPhase) -> Result<()> {
        if self.phase == next {
            return Ok(());
        }
        self.phase.transition(next)
    }

    fn finish_activation(&mut self) {
        if let SessionPhase::Activating { generation } = self.phase {
            self.phase = SessionPhase::Active;
            info!("Session activation complete (generation {})", generation);
            self.observers.notify(|o| o.on_activated(&self.state));
        }
    }

    /// Give up on restoring: the session becomes `Stopped` and `Active`
    ///
    /// Valid wherever `activate` is, e.g. when the snapshot could not be read.
    pub fn abort_activation(&mut self) -> Result<()> {
        self.check_can_activate()?;
        self.abandon_restore();
        Ok(())
    }

    /// Only a suspended session or a fresh one (nothing played yet) can be activated
    fn check_can_activate(&self) -> Result<()> {
        let fresh_session =
            self.phase == SessionPhase::Active && self.state.status() == PlaybackStatus::Unknown;
        if self.phase.is_suspended() || fresh_session {
            return Ok(());
        }
        Err(Error::InvalidState(format!(
            "activate rejected: session is {} and {}",
            self.phase,
            self.state.status()
        )))
    }

    fn abandon_restore(&mut self) {
        warn!("Session activation failed, leaving transport stopped");
        let generation = self.next_generation();
        self.item_generation = generation;
        self.engine.stop(generation);
        self.clock.on_stopped();
        self.reset_times();
        self.item = None;
        self.phase = SessionPhase::Active;
        self.last_snapshot = None;
        self.set_status(PlaybackStatus::Stopped);
    }

    // ========================================
    // Internals
    // ========================================

    /// Commands are rejected while suspended; while activating they end the restore
    fn ensure_live(&mut self, command: &str) -> Result<()> {
        match self.phase {
            SessionPhase::Suspended => Err(Error::InvalidState(format!(
                "{} rejected: session suspended",
                command
            ))),
            SessionPhase::Activating { .. } => {
                debug!("{} supersedes session restore", command);
                self.finish_activation();
                Ok(())
            }
            SessionPhase::Active => Ok(()),
        }
    }

    fn next_generation(&mut self) -> Generation {
        self.generation += 1;
        self.generation
    }

    fn load_and_play(&mut self, item: MediaItem) {
        let generation = self.next_generation();
        self.item_generation = generation;
        info!("Playing {} (generation {})", item.display_name(), generation);

        self.engine.play(&item, generation);
        self.clock.on_played();
        self.state.set_duration_ms(item.duration_hint_ms.unwrap_or(0));
        self.reset_times();

        let track_changed = self.item.as_ref().map(|i| i.id) != Some(item.id);
        self.item = Some(item.clone());
        if track_changed {
            self.observers.notify(|o| o.on_track_changed(&self.state, &item));
        }
        self.set_status(PlaybackStatus::Playing);
        self.observers.notify(|o| o.on_playback_start(&self.state, &item));
    }

    fn stop_playback(&mut self) {
        if self.state.status() == PlaybackStatus::Stopped {
            debug!("Already stopped");
            return;
        }
        let generation = self.next_generation();
        self.item_generation = generation;
        self.engine.stop(generation);
        self.clock.on_stopped();
        self.reset_times();
        self.item = None;
        self.consecutive_failures = 0;
        self.set_status(PlaybackStatus::Stopped);
    }

    /// Playhead and listening time back to zero
    fn reset_times(&mut self) {
        self.time_marks.reset();
        self.set_position(0);
        self.state.set_real_time_ms(0);
    }

    /// Pull the latest engine position into the state before persisting
    fn refresh_from_engine(&mut self) {
        if self.item.is_none() {
            return;
        }
        if let Some(position_ms) = self.engine.position() {
            let position = self.set_position(position_ms);
            let real_time = self.clock.on_position_changed(position);
            self.state.set_real_time_ms(real_time);
        }
    }

    /// Clamp to the duration and store; returns the stored position
    fn set_position(&mut self, position_ms: u64) -> u64 {
        let clamped = position_ms.min(self.state.duration_ms());
        // Clamped above, cannot exceed the duration
        let _ = self.state.set_current_time_ms(clamped);
        clamped
    }

    fn set_status(&mut self, status: PlaybackStatus) {
        let old = self.state.status();
        if old == status {
            return;
        }
        self.state.set_status(status);
        info!("Playback status changed: {} -> {}", old, status);
        self.observers.notify(|o| o.on_status_changed(&self.state, old));
    }
}
