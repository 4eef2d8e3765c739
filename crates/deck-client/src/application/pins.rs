//! Pin Manager: the ordered list of action ids shown as deck buttons.
//!
//! Pins are stored under the `"pins"` key as a JSON array of action ids.
//!
//! Until a list has been stored, the manager shows the two control buttons.
//! The first time a scene list is available, [`PinManager::set_defaults`]
//! seeds storage with the first four scenes plus the controls.  Once any
//! list has been stored (by seeding or by the user toggling a pin) seeding
//! never happens again for that storage location.

use std::sync::Arc;

use deck_core::{CONTROL_RECORD, CONTROL_STREAM};
use tracing::{debug, info, warn};

use crate::infrastructure::storage::{load_json, save_json, Loaded, PersistenceAdapter, StorageError};

/// Storage key of the pin list.
pub const PINS_KEY: &str = "pins";

/// How many scenes [`PinManager::set_defaults`] pins.
pub const DEFAULT_SCENE_PINS: usize = 4;

/// Owns the pin list and writes it through to storage on every change.
pub struct PinManager {
    adapter: Arc<dyn PersistenceAdapter>,
    pins: Vec<String>,
    /// Whether a record exists under [`PINS_KEY`].
    stored: bool,
}

impl PinManager {
    /// Loads the stored pin list.
    ///
    /// - No record: the two control ids, kept in memory only.
    /// - Valid record: that list, with duplicates dropped.
    /// - Unreadable record: an empty list (the record still counts as present).
    pub async fn load(adapter: Arc<dyn PersistenceAdapter>) -> Self {
        let (pins, stored) = match load_json::<Vec<String>>(adapter.as_ref(), PINS_KEY).await {
            Loaded::Missing => (default_controls(), false),
            Loaded::Value(list) => (dedup(list), true),
            Loaded::Corrupt => (Vec::new(), true),
        };
        debug!("loaded {} pin(s), stored={stored}", pins.len());
        Self {
            adapter,
            pins,
            stored,
        }
    }

    /// Returns `true` when `id` is pinned.
    pub fn is_pinned(&self, id: &str) -> bool {
        self.pins.iter().any(|p| p == id)
    }

    /// The pinned action ids in display order.
    pub fn pinned(&self) -> &[String] {
        &self.pins
    }

    /// Pins `id` if absent (at the end), unpins it if present, then persists
    /// the whole list.
    ///
    /// Returns whether `id` is pinned afterwards.
    ///
    /// # Errors
    ///
    /// Returns the storage error if persisting fails.  The in-memory change
    /// is kept either way.
    pub async fn toggle_pin(&mut self, id: &str) -> Result<bool, StorageError> {
        let now_pinned = if let Some(pos) = self.pins.iter().position(|p| p == id) {
            self.pins.remove(pos);
            false
        } else {
            self.pins.push(id.to_string());
            true
        };
        info!("{} '{id}'", if now_pinned { "pinned" } else { "unpinned" });
        self.persist().await?;
        Ok(now_pinned)
    }

    /// Seeds the list with the first four of `scene_ids` followed by the two
    /// controls, but only when no list has ever been stored.
    ///
    /// Returns `true` when seeding happened.
    ///
    /// # Errors
    ///
    /// Returns the storage error if persisting the seeded list fails.
    pub async fn set_defaults(&mut self, scene_ids: &[String]) -> Result<bool, StorageError> {
        if self.stored {
            return Ok(false);
        }
        let seeded: Vec<String> = scene_ids
            .iter()
            .take(DEFAULT_SCENE_PINS)
            .cloned()
            .chain(default_controls())
            .collect();
        self.pins = dedup(seeded);
        info!("seeded {} default pin(s)", self.pins.len());
        self.persist().await?;
        Ok(true)
    }

    async fn persist(&mut self) -> Result<(), StorageError> {
        match save_json(self.adapter.as_ref(), PINS_KEY, &self.pins).await {
            Ok(()) => {
                self.stored = true;
                Ok(())
            }
            Err(e) => {
                warn!("failed to save pins: {e}");
                Err(e)
            }
        }
    }
}

fn default_controls() -> Vec<String> {
    vec![CONTROL_STREAM.to_string(), CONTROL_RECORD.to_string()]
}

/// Drops repeated ids, keeping the first occurrence.
fn dedup(list: Vec<String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(list.len());
    for id in list {
        if !out.contains(&id) {
            out.push(id);
        }
    }
    out
}

// ── Tests ─────────────────────────────────────────────────────────────────────
