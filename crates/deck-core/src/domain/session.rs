//! The mirrored session snapshot and the scene view derived from it.
//!
//! The host pushes its complete item table on every change.  The client never
//! merges individual fields: each push replaces the whole [`SessionSnapshot`].
//!
//! Only items whose `type` is `"scene"` are interpreted.  Everything else
//! (audio tracks, layers, effects, ...) is kept as opaque JSON so that a newer
//! host version never breaks the client.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Item `type` discriminator for scenes.
pub const SCENE_TYPE: &str = "scene";

/// A single entry of the host's item table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    /// Type discriminator, e.g. `"scene"` or `"track"`.
    #[serde(rename = "type", default)]
    pub item_type: String,
    /// All remaining fields, kept verbatim.
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl Item {
    /// Builds a scene item.  Mostly useful in tests and fixtures.
    pub fn scene(name: &str, index: i64, current: bool) -> Self {
        let mut fields = Map::new();
        fields.insert("name".to_string(), Value::from(name));
        fields.insert("index".to_string(), Value::from(index));
        fields.insert("current".to_string(), Value::from(current));
        Self {
            item_type: SCENE_TYPE.to_string(),
            fields,
        }
    }

    /// Returns `true` when this item is a scene.
    pub fn is_scene(&self) -> bool {
        self.item_type == SCENE_TYPE
    }

    /// Display name, or an empty string when the host did not send one.
    pub fn name(&self) -> &str {
        self.fields.get("name").and_then(Value::as_str).unwrap_or("")
    }

    /// Whether the host marks this item as the active one.
    pub fn is_current(&self) -> bool {
        self.fields
            .get("current")
            .and_then(Value::as_bool)
            .unwrap_or(false)
    }

    /// Display order.  Hosts occasionally encode integers as doubles, so both
    /// representations are accepted; anything else sorts as `0`.
    pub fn index(&self) -> i64 {
        match self.fields.get("index") {
            Some(v) => v
                .as_i64()
                .or_else(|| v.as_f64().map(|f| f as i64))
                .unwrap_or(0),
            None => 0,
        }
    }
}

/// A scene as presented to the UI, hotkeys, and the command router.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scene {
    /// Host-assigned item id (also the scene's action id).
    pub id: String,
    pub name: String,
    pub current: bool,
    pub index: i64,
}

/// The complete item table mirrored from the host.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionSnapshot {
    items: BTreeMap<String, Item>,
}

impl SessionSnapshot {
    /// Creates an empty snapshot.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses the `items` object published by the host.
    ///
    /// # Errors
    ///
    /// Returns a [`serde_json::Error`] when `items` is not an object of
    /// item objects.
    pub fn from_items_value(items: &Value) -> Result<Self, serde_json::Error> {
        let items = BTreeMap::<String, Item>::deserialize(items)?;
        Ok(Self { items })
    }

    /// Inserts or replaces one item.  Used by fixtures; live updates always
    /// replace the whole snapshot.
    pub fn insert(&mut self, id: impl Into<String>, item: Item) {
        self.items.insert(id.into(), item);
    }

    /// Returns the item with the given id.
    pub fn get(&self, id: &str) -> Option<&Item> {
        self.items.get(id)
    }

    /// Number of items of every type.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// `true` when the host reported no items (or the client is disconnected).
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Iterates over all `(id, item)` pairs in id order.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &Item)> {
        self.items.iter()
    }

    /// Derives the scene list: only `scene` items, sorted ascending by
    /// `index` (ties broken by id so the order is stable).
    ///
    /// This is computed on every call and never cached, so it is always
    /// consistent with the latest snapshot.
    pub fn scenes(&self) -> Vec<Scene> {
        let mut scenes: Vec<Scene> = self
            .items
            .iter()
            .filter(|(_, item)| item.is_scene())
            .map(|(id, item)| Scene {
                id: id.clone(),
                name: item.name().to_string(),
                current: item.is_current(),
                index: item.index(),
            })
            .collect();
        scenes.sort_by(|a, b| a.index.cmp(&b.index).then_with(|| a.id.cmp(&b.id)));
        scenes
    }

    /// The scene the host currently shows, if any.
    pub fn current_scene(&self) -> Option<Scene> {
        self.scenes().into_iter().find(|s| s.current)
    }
}

/// Everything the client mirrors from the host in one full pull.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HostState {
    pub snapshot: SessionSnapshot,
    pub streaming: bool,
    pub recording: bool,
}

// ── Tests ─────────────────────────────────────────────────────────────────────
