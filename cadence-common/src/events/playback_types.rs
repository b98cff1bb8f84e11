//! Playback-related type definitions
//!
//! Supporting enums for transport status and loop policy. Both are part of
//! persisted snapshots and broadcast events, so their serialized names are
//! stable.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::Error;

/// Transport status enumeration
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum PlaybackStatus {
    /// Nothing has happened yet this session
    #[default]
    Unknown,
    /// No item loaded or playback stopped
    Stopped,
    /// Item loaded, output halted
    Paused,
    /// Item loaded and producing output
    Playing,
}

impl PlaybackStatus {
    /// True when an item is loaded in the engine (Paused or Playing)
    pub fn is_loaded(self) -> bool {
        matches!(self, PlaybackStatus::Paused | PlaybackStatus::Playing)
    }
}

impl std::fmt::Display for PlaybackStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PlaybackStatus::Unknown => write!(f, "unknown"),
            PlaybackStatus::Stopped => write!(f, "stopped"),
            PlaybackStatus::Paused => write!(f, "paused"),
            PlaybackStatus::Playing => write!(f, "playing"),
        }
    }
}

impl FromStr for PlaybackStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "unknown" => Ok(PlaybackStatus::Unknown),
            "stopped" => Ok(PlaybackStatus::Stopped),
            "paused" => Ok(PlaybackStatus::Paused),
            "playing" => Ok(PlaybackStatus::Playing),
            other => Err(Error::InvalidInput(format!("unknown playback status '{}'", other))),
        }
    }
}

/// What happens when an item reaches its end
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LoopMode {
    /// Stop at the end of the item
    #[default]
    Off,
    /// Advance to the next playlist item, wrapping at the end
    Playlist,
    /// Repeat the current item
    Song,
}

impl std::fmt::Display for LoopMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LoopMode::Off => write!(f, "off"),
            LoopMode::Playlist => write!(f, "playlist"),
            LoopMode::Song => write!(f, "song"),
        }
    }
}

impl FromStr for LoopMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "off" | "none" => Ok(LoopMode::Off),
            "playlist" | "all" => Ok(LoopMode::Playlist),
            "song" | "one" => Ok(LoopMode::Song),
            other => Err(Error::InvalidInput(format!("unknown loop mode '{}'", other))),
        }
    }
}
