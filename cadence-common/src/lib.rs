//! # Cadence Common Library
//!
//! Shared code for the Cadence transport crates including:
//! - Transport enums shared with UI consumers (`PlaybackStatus`, `LoopMode`)
//! - Event types (`TransportEvent`) and the broadcast `EventBus`
//! - Configuration file discovery and data directory defaults

pub mod config;
pub mod error;
pub mod events;

pub use error::{Error, Result};
pub use events::{EventBus, LoopMode, PlaybackStatus, TransportEvent};
