//! Timer-driven engine that plays silence in real time
//!
//! `ClockEngine` advances a virtual playhead on a tokio interval and reports
//! it like a real engine would: duration on load, periodic positions, a
//! confirmation once output is running, and end-of-media. It lets the
//! transport run headless (no audio device) with realistic event timing.

use super::{EngineEvent, EngineEventKind, EngineEventSender, Generation, MediaEngine, MediaOutcome};
use crate::config::EngineSettings;
use crate::playback::MediaItem;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, error, trace};

#[derive(Debug, Default)]
struct ClockState {
    generation: Generation,
    loaded: bool,
    running: bool,
    ended: bool,
    /// Emit `PlaybackConfirmed` on the next tick
    confirm_pending: bool,
    duration_ms: u64,
    position_ms: u64,
    rate: f64,
}

impl ClockState {
    /// Advance one tick and collect the events it produces
    fn tick(&mut self, tick_ms: u64) -> Vec<EngineEvent> {
        let mut events = Vec::new();
        if !self.running || self.ended {
            return events;
        }

        let generation = self.generation;
        if self.confirm_pending {
            self.confirm_pending = false;
            events.push(EngineEvent::new(generation, EngineEventKind::PlaybackConfirmed));
        }

        let advance = (tick_ms as f64 * self.rate).round() as u64;
        self.position_ms = self.position_ms.saturating_add(advance).min(self.duration_ms);
        events.push(EngineEvent::new(generation, EngineEventKind::PositionChanged(self.position_ms)));

        // Stays running so a seek back resumes ticking
        if self.position_ms >= self.duration_ms {
            self.ended = true;
            events.push(EngineEvent::new(
                generation,
                EngineEventKind::EndOfMedia(MediaOutcome::Finished),
            ));
        }
        events
    }
}

/// Silent real-time engine
pub struct ClockEngine {
    shared: Arc<Mutex<ClockState>>,
    events: EngineEventSender,
    tick: Duration,
    default_duration_ms: u64,
    ticker: Option<JoinHandle<()>>,
    volume: f64,
    balance: f64,
    mute: bool,
}

impl std::fmt::Debug for ClockEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClockEngine")
            .field("tick", &self.tick)
            .field("default_duration_ms", &self.default_duration_ms)
            .finish()
    }
}

impl ClockEngine {
    pub fn new(events: EngineEventSender, settings: &EngineSettings) -> Self {
        Self {
            shared: Arc::new(Mutex::new(ClockState {
                rate: 1.0,
                ..ClockState::default()
            })),
            events,
            tick: Duration::from_millis(settings.tick_ms.max(1)),
            default_duration_ms: settings.default_duration_ms,
            ticker: None,
            volume: 1.0,
            balance: 0.0,
            mute: false,
        }
    }

    pub fn volume(&self) -> f64 {
        self.volume
    }

    pub fn balance(&self) -> f64 {
        self.balance
    }

    pub fn is_muted(&self) -> bool {
        self.mute
    }

    fn lock(&self) -> MutexGuard<'_, ClockState> {
        self.shared.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn send(&self, generation: Generation, kind: EngineEventKind) {
        if self.events.send(EngineEvent::new(generation, kind)).is_err() {
            debug!("Engine event dropped: control task gone");
        }
    }

    fn fail(&self, generation: Generation, reason: String) {
        self.send(generation, EngineEventKind::EndOfMedia(MediaOutcome::Failed(reason)));
    }

    /// Start the tick task if it is not running
    fn ensure_ticker(&mut self) -> bool {
        if self.ticker.as_ref().is_some_and(|t| !t.is_finished()) {
            return true;
        }

        let runtime = match tokio::runtime::Handle::try_current() {
            Ok(handle) => handle,
            Err(e) => {
                error!("ClockEngine needs a tokio runtime: {}", e);
                return false;
            }
        };

        let shared = Arc::clone(&self.shared);
        let events = self.events.clone();
        let tick = self.tick;
        let tick_ms = tick.as_millis() as u64;

        self.ticker = Some(runtime.spawn(async move {
            let mut interval = tokio::time::interval(tick);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            // First tick completes immediately
            interval.tick().await;
            loop {
                interval.tick().await;
                let batch = {
                    let mut state = shared.lock().unwrap_or_else(PoisonError::into_inner);
                    state.tick(tick_ms)
                };
                for event in batch {
                    trace!("ClockEngine event {:?}", event);
                    if events.send(event).is_err() {
                        return;
                    }
                }
            }
        }));
        true
    }
}

impl MediaEngine for ClockEngine {
    fn play(&mut self, item: &MediaItem, generation: Generation) {
        debug!("ClockEngine loading {} (generation {})", item.location, generation);

        {
            let mut state = self.lock();
            state.generation = generation;
            state.loaded = false;
            state.running = false;
        }

        if item.location.trim().is_empty() {
            self.fail(generation, "empty item location".to_string());
            return;
        }

        let duration_ms = item.duration_hint_ms.unwrap_or(self.default_duration_ms);
        if duration_ms == 0 {
            self.fail(generation, format!("unknown duration for {}", item.location));
            return;
        }

        if !self.ensure_ticker() {
            self.fail(generation, "no runtime for engine clock".to_string());
            return;
        }

        {
            let mut state = self.lock();
            state.loaded = true;
            state.running = true;
            state.ended = false;
            state.confirm_pending = true;
            state.duration_ms = duration_ms;
            state.position_ms = 0;
        }
        self.send(generation, EngineEventKind::DurationChanged(duration_ms));
    }

    fn pause(&mut self) {
        self.lock().running = false;
    }

    fn resume(&mut self) {
        let mut state = self.lock();
        if state.loaded {
            state.running = true;
            state.confirm_pending = true;
        }
    }

    fn stop(&mut self, generation: Generation) {
        let mut state = self.lock();
        state.generation = generation;
        state.loaded = false;
        state.running = false;
        state.ended = false;
        state.position_ms = 0;
    }

    fn seek(&mut self, position_ms: u64, generation: Generation) -> u64 {
        let mut state = self.lock();
        state.generation = generation;
        if !state.loaded {
            return 0;
        }
        state.position_ms = position_ms.min(state.duration_ms);
        // A landing on the end is reported by the next tick
        state.ended = false;
        state.position_ms
    }

    fn position(&self) -> Option<u64> {
        let state = self.lock();
        state.loaded.then_some(state.position_ms)
    }

    fn set_volume(&mut self, volume: f64) {
        self.volume = volume;
    }

    fn set_balance(&mut self, balance: f64) {
        self.balance = balance;
    }

    fn set_rate(&mut self, rate: f64) {
        self.lock().rate = rate;
    }

    fn set_mute(&mut self, mute: bool) {
        self.mute = mute;
    }

    fn dispose(&mut self) {
        if let Some(ticker) = self.ticker.take() {
            ticker.abort();
        }
        let rate = self.lock().rate;
        *self.lock() = ClockState {
            rate,
            ..ClockState::default()
        };
        debug!("ClockEngine disposed");
    }
}

impl Drop for ClockEngine {
    fn drop(&mut self) {
        if let Some(ticker) = self.ticker.take() {
            ticker.abort();
        }
    }
}
