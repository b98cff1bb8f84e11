//! Playback transport
//!
//! State, clocks, controls and the controller that ties them to a
//! `MediaEngine` and a `PlaylistProvider`.

pub mod controller;
pub mod controls;
pub mod observer;
pub mod playlist;
pub mod real_time;
pub mod session;
pub mod snapshot;
pub mod state;

pub use controller::{SeekSteps, SeekUnit, TransportController};
pub use controls::{BoundedControl, TransportControls};
pub use observer::{EventBusObserver, ObserverList, TransportObserver};
pub use playlist::{MediaItem, Playlist, PlaylistProvider};
pub use real_time::RealTimeClock;
pub use session::SessionPhase;
pub use snapshot::PlaybackSnapshot;
pub use state::PlaybackState;
