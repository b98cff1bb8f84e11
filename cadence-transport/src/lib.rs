//! # Cadence Transport Library (cadence-transport)
//!
//! Playback transport and real-time tracking.
//!
//! **Purpose:** Turn user commands (play, pause, seek, loop, suspend/activate)
//! into a consistent, observable play state, and derive the time actually
//! spent listening so it stays correct across seeks, pauses, track changes
//! and session restarts.
//!
//! **Architecture:** a synchronous `TransportController` owned by a single
//! control task (`TransportService`). The media engine and the playlist are
//! boundaries (`MediaEngine`, `PlaylistProvider`); engine callbacks come back
//! over a channel tagged with a generation so stale ones are dropped.

pub mod config;
pub mod console;
pub mod db;
pub mod engine;
pub mod error;
pub mod playback;
pub mod service;

pub use error::{Error, Result};
pub use playback::{PlaybackState, TransportController};
pub use service::{TransportCommand, TransportHandle, TransportService};
