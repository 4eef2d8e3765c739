//! Read model for a deck UI or tray icon.
//!
//! The session runtime publishes a [`SessionState`]; the hotkey and pin
//! managers own their own maps.  A UI wants one flat, JSON-serialisable value
//! that combines all three, which is what [`build_deck_view`] produces.
//!
//! # Data Transfer Objects
//!
//! The DTOs here contain only plain fields (`String`, `bool`, `i64`) and
//! derive `Serialize`/`Deserialize`, so a web or native front-end can consume
//! them without knowing about `SessionSnapshot` or `PendingOverlay`.
//!
//! Any change to a DTO here changes the JSON printed by the console's `deck`
//! command.

use std::collections::BTreeMap;

use deck_core::{Action, Scene};
use serde::{Deserialize, Serialize};

use crate::application::session_sync::SessionState;

/// Tray title shown while no channel is live.
pub const DISCONNECTED_TITLE: &str = "Disconnected";

// ── Data Transfer Objects ─────────────────────────────────────────────────────

/// One scene in display order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SceneDto {
    pub id: String,
    pub name: String,
    pub current: bool,
    pub index: i64,
    /// A `showScene` for this scene is awaiting confirmation.
    pub pending: bool,
    pub hotkey: Option<String>,
}

/// One pinned button on the deck.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeckButtonDto {
    pub action_id: String,
    pub label: String,
    /// Current scene, or a control whose flag is on.
    pub active: bool,
    pub pending: bool,
    pub hotkey: Option<String>,
}

/// Everything a deck UI renders.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeckViewDto {
    pub connection: String,
    pub streaming: bool,
    pub recording: bool,
    pub pending_stream: bool,
    pub pending_record: bool,
    pub scenes: Vec<SceneDto>,
    pub buttons: Vec<DeckButtonDto>,
    pub tray_title: String,
}

/// Uniform response wrapper: `{ success, data, error }`.
#[derive(Debug, Serialize, Deserialize)]
pub struct CommandResult<T: Serialize> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<String>,
}

impl<T: Serialize> CommandResult<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }
    pub fn err(msg: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(msg.into()),
        }
    }
}

// ── View construction ─────────────────────────────────────────────────────────

/// Combines session state, pins, and hotkeys into a [`DeckViewDto`].
///
/// Pins are resolved against the live scene list: a pin whose scene the host
/// no longer has is left out rather than shown as a dead button.
pub fn build_deck_view(
    state: &SessionState,
    pins: &[String],
    hotkeys: &BTreeMap<String, String>,
) -> DeckViewDto {
    let scenes = state.scenes();
    let pending_scene = state.pending_scene.as_deref();

    let scene_dtos = scenes
        .iter()
        .map(|scene| SceneDto {
            id: scene.id.clone(),
            name: scene.name.clone(),
            current: scene.current,
            index: scene.index,
            pending: pending_scene == Some(scene.id.as_str()),
            hotkey: hotkeys.get(&scene.id).cloned(),
        })
        .collect();

    let buttons = pins
        .iter()
        .filter_map(|id| button_for(state, &scenes, id, hotkeys))
        .collect();

    let tray_title = match state.current_scene() {
        Some(scene) if state.is_connected() => scene.name,
        _ => DISCONNECTED_TITLE.to_string(),
    };

    DeckViewDto {
        connection: state.connection.to_string(),
        streaming: state.streaming,
        recording: state.recording,
        pending_stream: state.pending_stream,
        pending_record: state.pending_record,
        scenes: scene_dtos,
        buttons,
        tray_title,
    }
}

fn button_for(
    state: &SessionState,
    scenes: &[Scene],
    action_id: &str,
    hotkeys: &BTreeMap<String, String>,
) -> Option<DeckButtonDto> {
    let (label, active, pending) = match Action::from_id(action_id) {
        Action::ToggleStream => ("Stream".to_string(), state.streaming, state.pending_stream),
        Action::ToggleRecord => ("Record".to_string(), state.recording, state.pending_record),
        Action::ShowScene(id) => {
            let scene = scenes.iter().find(|s| s.id == id)?;
            (
                scene.name.clone(),
                scene.current,
                state.pending_scene.as_deref() == Some(id.as_str()),
            )
        }
    };
    Some(DeckButtonDto {
        action_id: action_id.to_string(),
        label,
        active,
        pending,
        hotkey: hotkeys.get(action_id).cloned(),
    })
}

// ── Tests ─────────────────────────────────────────────────────────────────────
