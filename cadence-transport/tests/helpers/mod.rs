//! Test helpers for cadence-transport integration tests
//!
//! Provides reusable test infrastructure components:
//! - RecordingEngine: MediaEngine that records every call
//! - ScriptedPlaylist: PlaylistProvider with a fixed "next" queue and call counts
//! - RecordingObserver: TransportObserver that records notifications
//! - FailingStore: SnapshotStore whose every operation fails

#![allow(dead_code)]

use cadence_common::events::{LoopMode, PlaybackStatus};
use cadence_transport::config::TransportSettings;
use cadence_transport::db::SnapshotStore;
use cadence_transport::engine::{EngineEvent, EngineEventKind, Generation, MediaEngine, MediaOutcome};
use cadence_transport::playback::{
    MediaItem, PlaybackSnapshot, PlaybackState, Playlist, PlaylistProvider, TransportController,
    TransportObserver,
};
use cadence_transport::{Error, Result};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use uuid::Uuid;

// ================================================================================================
// RecordingEngine
// ================================================================================================

#[derive(Debug, Clone, PartialEq)]
pub enum EngineCall {
    Play(Uuid, Generation),
    Pause,
    Resume,
    Stop(Generation),
    Seek(u64, Generation),
    SetVolume(f64),
    SetBalance(f64),
    SetRate(f64),
    SetMute(bool),
    Dispose,
}

/// Shared view of a RecordingEngine, usable after the engine moved into a controller
#[derive(Debug, Clone, Default)]
pub struct EngineLog {
    calls: Arc<Mutex<Vec<EngineCall>>>,
    position: Arc<Mutex<Option<u64>>>,
}

impl EngineLog {
    pub fn calls(&self) -> Vec<EngineCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn clear(&self) {
        self.calls.lock().unwrap().clear();
    }

    pub fn count(&self, matches: impl Fn(&EngineCall) -> bool) -> usize {
        self.calls.lock().unwrap().iter().filter(|c| matches(c)).count()
    }

    /// Generation of the most recent play/stop/seek
    pub fn last_generation(&self) -> Generation {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .rev()
            .find_map(|call| match call {
                EngineCall::Play(_, g) | EngineCall::Stop(g) | EngineCall::Seek(_, g) => Some(*g),
                _ => None,
            })
            .unwrap_or(0)
    }

    /// Position reported by `MediaEngine::position`
    pub fn set_position(&self, position_ms: Option<u64>) {
        *self.position.lock().unwrap() = position_ms;
    }
}

/// MediaEngine that records calls; seeks land exactly on the target
#[derive(Debug, Default)]
pub struct RecordingEngine {
    log: EngineLog,
}

impl RecordingEngine {
    pub fn new() -> (Self, EngineLog) {
        let engine = Self::default();
        let log = engine.log.clone();
        (engine, log)
    }

    fn record(&self, call: EngineCall) {
        self.log.calls.lock().unwrap().push(call);
    }
}

impl MediaEngine for RecordingEngine {
    fn play(&mut self, item: &MediaItem, generation: Generation) {
        self.record(EngineCall::Play(item.id, generation));
    }

    fn pause(&mut self) {
        self.record(EngineCall::Pause);
    }

    fn resume(&mut self) {
        self.record(EngineCall::Resume);
    }

    fn stop(&mut self, generation: Generation) {
        self.record(EngineCall::Stop(generation));
    }

    fn seek(&mut self, position_ms: u64, generation: Generation) -> u64 {
        self.record(EngineCall::Seek(position_ms, generation));
        *self.log.position.lock().unwrap() = Some(position_ms);
        position_ms
    }

    fn position(&self) -> Option<u64> {
        *self.log.position.lock().unwrap()
    }

    fn set_volume(&mut self, volume: f64) {
        self.record(EngineCall::SetVolume(volume));
    }

    fn set_balance(&mut self, balance: f64) {
        self.record(EngineCall::SetBalance(balance));
    }

    fn set_rate(&mut self, rate: f64) {
        self.record(EngineCall::SetRate(rate));
    }

    fn set_mute(&mut self, mute: bool) {
        self.record(EngineCall::SetMute(mute));
    }

    fn dispose(&mut self) {
        self.record(EngineCall::Dispose);
        *self.log.position.lock().unwrap() = None;
    }
}

// ================================================================================================
// ScriptedPlaylist
// ================================================================================================

/// Counters shared with a ScriptedPlaylist
#[derive(Debug, Clone, Default)]
pub struct PlaylistProbe {
    advance_calls: Arc<AtomicUsize>,
    loop_mode: Arc<Mutex<LoopMode>>,
}

impl PlaylistProbe {
    pub fn advance_calls(&self) -> usize {
        self.advance_calls.load(Ordering::SeqCst)
    }

    pub fn loop_mode(&self) -> LoopMode {
        *self.loop_mode.lock().unwrap()
    }
}

/// Provider that hands out a fixed queue of "next" items
#[derive(Debug, Default)]
pub struct ScriptedPlaylist {
    catalog: Vec<MediaItem>,
    active: Option<MediaItem>,
    upcoming: VecDeque<MediaItem>,
    probe: PlaylistProbe,
}

impl ScriptedPlaylist {
    /// `active` is current; `upcoming` is returned by successive advances
    pub fn new(active: Option<MediaItem>, upcoming: Vec<MediaItem>) -> (Self, PlaylistProbe) {
        let mut catalog: Vec<MediaItem> = active.iter().cloned().collect();
        catalog.extend(upcoming.iter().cloned());
        let playlist = Self {
            catalog,
            active,
            upcoming: upcoming.into(),
            probe: PlaylistProbe::default(),
        };
        let probe = playlist.probe.clone();
        (playlist, probe)
    }
}

impl PlaylistProvider for ScriptedPlaylist {
    fn id(&self) -> Option<Uuid> {
        None
    }

    fn active_item(&self) -> Option<MediaItem> {
        self.active.clone()
    }

    fn advance_to_next(&mut self) -> Option<MediaItem> {
        self.probe.advance_calls.fetch_add(1, Ordering::SeqCst);
        let next = self.upcoming.pop_front()?;
        self.active = Some(next.clone());
        Some(next)
    }

    fn select(&mut self, item_id: Uuid) -> Option<MediaItem> {
        let item = self.catalog.iter().find(|i| i.id == item_id).cloned()?;
        self.active = Some(item.clone());
        Some(item)
    }

    fn set_loop_mode(&mut self, mode: LoopMode) {
        *self.probe.loop_mode.lock().unwrap() = mode;
    }

    fn item_count(&self) -> usize {
        self.catalog.len()
    }
}

// ================================================================================================
// RecordingObserver
// ================================================================================================

#[derive(Debug, Clone, PartialEq)]
pub enum Notification {
    Status(PlaybackStatus, PlaybackStatus),
    Track(Uuid),
    Start(Uuid),
    End { item: Option<Uuid>, failed: bool },
    Position(u64),
    SeekDone(u64),
    TimeReached(u64),
    Controls,
    LoopMode(LoopMode),
    Suspended,
    Activated(PlaybackStatus),
}

#[derive(Debug, Clone, Default)]
pub struct ObserverLog {
    entries: Arc<Mutex<Vec<Notification>>>,
}

impl ObserverLog {
    pub fn entries(&self) -> Vec<Notification> {
        self.entries.lock().unwrap().clone()
    }

    pub fn clear(&self) {
        self.entries.lock().unwrap().clear();
    }

    pub fn count(&self, matches: impl Fn(&Notification) -> bool) -> usize {
        self.entries.lock().unwrap().iter().filter(|n| matches(n)).count()
    }
}

pub struct RecordingObserver {
    log: ObserverLog,
}

impl RecordingObserver {
    pub fn new() -> (Self, ObserverLog) {
        let log = ObserverLog::default();
        (Self { log: log.clone() }, log)
    }

    fn push(&self, notification: Notification) {
        self.log.entries.lock().unwrap().push(notification);
    }
}

impl TransportObserver for RecordingObserver {
    fn on_status_changed(&self, state: &PlaybackState, old: PlaybackStatus) {
        self.push(Notification::Status(old, state.status()));
    }

    fn on_track_changed(&self, _state: &PlaybackState, item: &MediaItem) {
        self.push(Notification::Track(item.id));
    }

    fn on_playback_start(&self, _state: &PlaybackState, item: &MediaItem) {
        self.push(Notification::Start(item.id));
    }

    fn on_playback_end(&self, _state: &PlaybackState, item: Option<&MediaItem>, outcome: &MediaOutcome) {
        self.push(Notification::End {
            item: item.map(|i| i.id),
            failed: outcome.is_failure(),
        });
    }

    fn on_position_changed(&self, state: &PlaybackState) {
        self.push(Notification::Position(state.current_time_ms()));
    }

    fn on_seek_done(&self, state: &PlaybackState) {
        self.push(Notification::SeekDone(state.current_time_ms()));
    }

    fn on_time_reached(&self, _state: &PlaybackState, _item: Option<&MediaItem>, mark_ms: u64) {
        self.push(Notification::TimeReached(mark_ms));
    }

    fn on_controls_changed(&self, _state: &PlaybackState) {
        self.push(Notification::Controls);
    }

    fn on_loop_mode_changed(&self, state: &PlaybackState) {
        self.push(Notification::LoopMode(state.loop_mode()));
    }

    fn on_suspended(&self, _state: &PlaybackState) {
        self.push(Notification::Suspended);
    }

    fn on_activated(&self, state: &PlaybackState) {
        self.push(Notification::Activated(state.status()));
    }
}

// ================================================================================================
// FailingStore
// ================================================================================================

/// Store whose reads and writes always fail
#[derive(Debug, Clone, Default)]
pub struct FailingStore;

impl SnapshotStore for FailingStore {
    async fn save(&self, _snapshot: &PlaybackSnapshot) -> Result<()> {
        Err(Error::Persistence("disk full".to_string()))
    }

    async fn load_latest(&self) -> Result<Option<PlaybackSnapshot>> {
        Err(Error::Persistence("database locked".to_string()))
    }
}

// ================================================================================================
// Builders
// ================================================================================================

pub fn settings() -> TransportSettings {
    TransportSettings::default()
}

/// Item with a known duration
pub fn item(name: &str, duration_ms: u64) -> MediaItem {
    MediaItem::from_location(format!("/music/{}.flac", name)).with_duration_hint(duration_ms)
}

pub fn duration(generation: Generation, duration_ms: u64) -> EngineEvent {
    EngineEvent::new(generation, EngineEventKind::DurationChanged(duration_ms))
}

pub fn position(generation: Generation, position_ms: u64) -> EngineEvent {
    EngineEvent::new(generation, EngineEventKind::PositionChanged(position_ms))
}

pub fn confirmed(generation: Generation) -> EngineEvent {
    EngineEvent::new(generation, EngineEventKind::PlaybackConfirmed)
}

pub fn finished(generation: Generation) -> EngineEvent {
    EngineEvent::new(generation, EngineEventKind::EndOfMedia(MediaOutcome::Finished))
}

pub fn failed(generation: Generation, reason: &str) -> EngineEvent {
    EngineEvent::new(
        generation,
        EngineEventKind::EndOfMedia(MediaOutcome::Failed(reason.to_string())),
    )
}

/// Controller over a RecordingEngine and an in-memory Playlist, with one recording observer
pub fn controller_with(
    items: Vec<MediaItem>,
    settings: &TransportSettings,
) -> (TransportController<RecordingEngine, Playlist>, EngineLog, ObserverLog) {
    let (engine, engine_log) = RecordingEngine::new();
    let mut controller = TransportController::new(engine, Playlist::new(items), settings).unwrap();
    let (observer, observer_log) = RecordingObserver::new();
    controller.register_observer(Box::new(observer));
    (controller, engine_log, observer_log)
}

/// Controller over a RecordingEngine and a ScriptedPlaylist
pub fn scripted_controller(
    active: Option<MediaItem>,
    upcoming: Vec<MediaItem>,
) -> (
    TransportController<RecordingEngine, ScriptedPlaylist>,
    EngineLog,
    ObserverLog,
    PlaylistProbe,
) {
    let (engine, engine_log) = RecordingEngine::new();
    let (playlist, probe) = ScriptedPlaylist::new(active, upcoming);
    let mut controller = TransportController::new(engine, playlist, &settings()).unwrap();
    let (observer, observer_log) = RecordingObserver::new();
    controller.register_observer(Box::new(observer));
    (controller, engine_log, observer_log, probe)
}
