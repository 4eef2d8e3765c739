//! Command Router: turns an action id into a session command.
//!
//! Hotkeys, deck buttons, and the console all speak in action ids.  The
//! router is the single place that decides what an id means:
//!
//! | Action id        | Command                  |
//! |------------------|--------------------------|
//! | `control_stream` | `toggle_stream()`        |
//! | `control_record` | `toggle_record()`        |
//! | a scene's id     | `show_scene(id)`         |
//! | anything else    | nothing                  |
//!
//! Scene ids are looked up in the *current* scene list, so a hotkey bound to
//! a scene that has since been deleted is silently ignored.

use deck_core::{Action, Scene};
use tracing::debug;

/// The commands the router needs from the session.
///
/// Implemented by [`SessionSyncClient`](crate::application::session_sync::SessionSyncClient).
#[cfg_attr(test, mockall::automock)]
pub trait SessionCommands {
    /// The current scene list.
    fn scenes(&self) -> Vec<Scene>;
    fn show_scene(&mut self, id: &str);
    fn toggle_stream(&mut self);
    fn toggle_record(&mut self);
}

/// Stateless action-id dispatcher.
pub struct CommandRouter;

impl CommandRouter {
    /// Resolves `action_id` and invokes the matching command on `session`.
    ///
    /// Returns the action that was dispatched, or `None` when the id names
    /// neither a control nor a known scene.
    pub fn dispatch<S: SessionCommands + ?Sized>(session: &mut S, action_id: &str) -> Option<Action> {
        let action = Self::resolve(&session.scenes(), action_id)?;
        match &action {
            Action::ToggleStream => session.toggle_stream(),
            Action::ToggleRecord => session.toggle_record(),
            Action::ShowScene(id) => session.show_scene(id),
        }
        debug!("dispatched {action}");
        Some(action)
    }

    /// Resolves `action_id` against `scenes` without side effects.
    pub fn resolve(scenes: &[Scene], action_id: &str) -> Option<Action> {
        match Action::from_id(action_id) {
            Action::ShowScene(id) => {
                if scenes.iter().any(|s| s.id == id) {
                    Some(Action::ShowScene(id))
                } else {
                    debug!("action '{action_id}' matches no control or scene");
                    None
                }
            }
            control => Some(control),
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
