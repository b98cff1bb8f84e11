//! Media items and the playlist boundary
//!
//! The controller only needs "what is active" and "what comes next" from a
//! playlist. `Playlist` is a simple in-memory provider; richer selection
//! logic (shuffle, smart queues) lives outside this crate behind the
//! `PlaylistProvider` trait.

use cadence_common::events::LoopMode;
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

/// A playable item
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaItem {
    /// Stable identifier used to find the item again after a restart
    pub id: Uuid,
    /// File path or URI handed to the engine
    pub location: String,
    pub title: Option<String>,
    /// Duration known from library metadata, before the engine reports one
    pub duration_hint_ms: Option<u64>,
}

impl MediaItem {
    /// Item whose id is derived from its location, so it is the same across runs
    pub fn from_location(location: impl Into<String>) -> Self {
        let location = location.into();
        Self {
            id: Uuid::new_v5(&Uuid::NAMESPACE_URL, location.as_bytes()),
            location,
            title: None,
            duration_hint_ms: None,
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_duration_hint(mut self, duration_ms: u64) -> Self {
        self.duration_hint_ms = Some(duration_ms);
        self
    }

    /// Title if known, otherwise the location
    pub fn display_name(&self) -> &str {
        self.title.as_deref().unwrap_or(&self.location)
    }
}

/// Supplies the active item and the next one
pub trait PlaylistProvider: Send {
    /// Identifier of the playlist, persisted with the session
    fn id(&self) -> Option<Uuid>;

    /// Currently active item, if any
    fn active_item(&self) -> Option<MediaItem>;

    /// Move to the next item under the current loop policy and return it
    fn advance_to_next(&mut self) -> Option<MediaItem>;

    /// Make the item with `item_id` active and return it
    fn select(&mut self, item_id: Uuid) -> Option<MediaItem>;

    /// Reconfigure next-item selection for a loop mode
    fn set_loop_mode(&mut self, mode: LoopMode);

    /// Number of items a full pass visits
    fn item_count(&self) -> usize;
}

/// In-memory ordered playlist
#[derive(Debug, Clone)]
pub struct Playlist {
    id: Uuid,
    items: Vec<MediaItem>,
    current: Option<usize>,
    loop_mode: LoopMode,
}

impl Playlist {
    pub fn new(items: Vec<MediaItem>) -> Self {
        Self::with_id(Uuid::new_v4(), items)
    }

    pub fn with_id(id: Uuid, items: Vec<MediaItem>) -> Self {
        Self {
            id,
            items,
            current: None,
            loop_mode: LoopMode::Off,
        }
    }

    pub fn push(&mut self, item: MediaItem) {
        self.items.push(item);
    }

    pub fn items(&self) -> &[MediaItem] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn current_index(&self) -> Option<usize> {
        self.current
    }

    pub fn loop_mode(&self) -> LoopMode {
        self.loop_mode
    }
}

impl PlaylistProvider for Playlist {
    fn id(&self) -> Option<Uuid> {
        Some(self.id)
    }

    fn active_item(&self) -> Option<MediaItem> {
        self.current.and_then(|i| self.items.get(i)).cloned()
    }

    fn advance_to_next(&mut self) -> Option<MediaItem> {
        if self.items.is_empty() {
            return None;
        }

        let next = match self.current {
            None => Some(0),
            Some(i) if i + 1 < self.items.len() => Some(i + 1),
            // Only playlist looping wraps; otherwise the end is the end
            Some(_) if self.loop_mode == LoopMode::Playlist => Some(0),
            Some(_) => None,
        };

        match next {
            Some(index) => {
                self.current = Some(index);
                debug!("Playlist advanced to index {}", index);
                self.items.get(index).cloned()
            }
            None => {
                debug!("Playlist exhausted");
                None
            }
        }
    }

    fn select(&mut self, item_id: Uuid) -> Option<MediaItem> {
        let index = self.items.iter().position(|item| item.id == item_id)?;
        self.current = Some(index);
        self.items.get(index).cloned()
    }

    fn set_loop_mode(&mut self, mode: LoopMode) {
        self.loop_mode = mode;
    }

    fn item_count(&self) -> usize {
        self.items.len()
    }
}
