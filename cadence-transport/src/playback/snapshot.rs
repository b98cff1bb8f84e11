//! Persisted form of a playback session
//!
//! `save` and `load` are pure: they convert between the live state and the
//! record a `SnapshotStore` writes. The record is complete on its own; no
//! other persisted value is needed to restore a session.

use super::{MediaItem, PlaybackState};
use crate::error::{Error, Result};
use cadence_common::events::{LoopMode, PlaybackStatus};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Everything that survives a suspend/activate cycle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaybackSnapshot {
    pub session_id: Uuid,
    pub status: PlaybackStatus,
    pub duration_ms: u64,
    pub current_time_ms: u64,
    pub real_time_ms: u64,
    pub volume: f64,
    pub balance: f64,
    pub rate: f64,
    pub mute: bool,
    pub loop_mode: LoopMode,
    /// Playlist that was active when the session was saved
    pub playlist_id: Option<Uuid>,
    /// Item that was loaded when the session was saved
    pub item_id: Option<Uuid>,
    pub saved_at: DateTime<Utc>,
}

/// Capture `state` together with the active item and playlist
pub fn save(state: &PlaybackState, item: Option<&MediaItem>, playlist_id: Option<Uuid>) -> PlaybackSnapshot {
    PlaybackSnapshot {
        session_id: state.id(),
        status: state.status(),
        duration_ms: state.duration_ms(),
        current_time_ms: state.current_time_ms(),
        real_time_ms: state.real_time_ms(),
        volume: state.volume(),
        balance: state.balance(),
        rate: state.rate(),
        mute: state.mute(),
        loop_mode: state.loop_mode(),
        playlist_id,
        item_id: item.map(|i| i.id),
        saved_at: Utc::now(),
    }
}

/// Rebuild a state equivalent to the one `snapshot` was taken from
///
/// Rejects records that violate state invariants (non-positive rate,
/// non-finite scalars, a loaded status without an item).
pub fn load(snapshot: &PlaybackSnapshot) -> Result<PlaybackState> {
    if !(snapshot.volume.is_finite() && snapshot.balance.is_finite()) {
        return Err(Error::Persistence("snapshot has non-finite volume or balance".to_string()));
    }
    if snapshot.status.is_loaded() && snapshot.item_id.is_none() {
        return Err(Error::Persistence(format!(
            "snapshot status {} has no item",
            snapshot.status
        )));
    }
    if snapshot.current_time_ms > snapshot.duration_ms {
        return Err(Error::Persistence(format!(
            "snapshot position {} ms beyond duration {} ms",
            snapshot.current_time_ms, snapshot.duration_ms
        )));
    }

    let mut state = PlaybackState::with_id(snapshot.session_id);
    state.set_status(snapshot.status);
    state.set_duration_ms(snapshot.duration_ms);
    state.set_current_time_ms(snapshot.current_time_ms)?;
    state.set_real_time_ms(snapshot.real_time_ms);
    state.set_volume(snapshot.volume);
    state.set_balance(snapshot.balance);
    state
        .set_rate(snapshot.rate)
        .map_err(|_| Error::Persistence(format!("snapshot rate {} is not positive", snapshot.rate)))?;
    state.set_mute(snapshot.mute);
    state.set_loop_mode(snapshot.loop_mode);
    Ok(state)
}
