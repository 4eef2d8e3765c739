//! Optimistic overlay of commands the host has not confirmed yet.
//!
//! When the user presses "Stream", the UI should react immediately rather
//! than wait for the host's round trip.  The client records a *pending entry*
//! for the command kind and clears it when either:
//!
//! - the host confirms (the matching state field changes), or
//! - the pending timeout elapses (the host may silently ignore a command).
//!
//! # Generations
//!
//! Each entry carries a generation number taken from a counter that only ever
//! grows.  A timeout timer remembers the generation it was started for, and
//! [`PendingOverlay::expire`] only clears an entry whose generation still
//! matches.  A rapid second press therefore cannot be cleared early by the
//! first press's timer, and a timer that fires after a confirmation (or after
//! a reconnect wiped the overlay) is a no-op.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::action::Action;

/// The three kinds of host command that get an optimistic overlay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CommandKind {
    ShowScene,
    ToggleStream,
    ToggleRecord,
}

impl CommandKind {
    /// The overlay slot an action occupies while unconfirmed.
    pub fn of(action: &Action) -> Self {
        match action {
            Action::ShowScene(_) => CommandKind::ShowScene,
            Action::ToggleStream => CommandKind::ToggleStream,
            Action::ToggleRecord => CommandKind::ToggleRecord,
        }
    }
}

/// One in-flight, unconfirmed command.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingEntry {
    pub kind: CommandKind,
    /// Scene id for [`CommandKind::ShowScene`]; `None` for the toggles.
    pub target: Option<String>,
    pub generation: u64,
}

/// At most one pending entry per [`CommandKind`].
#[derive(Debug, Clone, Default)]
pub struct PendingOverlay {
    entries: HashMap<CommandKind, PendingEntry>,
    next_generation: u64,
}

impl PendingOverlay {
    /// Creates an empty overlay.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a pending entry for `action`, replacing any older entry of
    /// the same kind, and returns its generation.
    pub fn begin(&mut self, action: &Action) -> u64 {
        let kind = CommandKind::of(action);
        let target = match action {
            Action::ShowScene(id) => Some(id.clone()),
            Action::ToggleStream | Action::ToggleRecord => None,
        };
        let generation = self.next_generation;
        self.next_generation = self.next_generation.wrapping_add(1);
        self.entries.insert(
            kind,
            PendingEntry {
                kind,
                target,
                generation,
            },
        );
        generation
    }

    /// Returns `true` while a command of `kind` awaits confirmation.
    pub fn is_pending(&self, kind: CommandKind) -> bool {
        self.entries.contains_key(&kind)
    }

    /// The scene id of the pending `ShowScene`, if any.
    pub fn pending_scene(&self) -> Option<&str> {
        self.entries
            .get(&CommandKind::ShowScene)
            .and_then(|e| e.target.as_deref())
    }

    /// Clears the entry for `kind` because the host confirmed it.
    ///
    /// Returns `true` if an entry was removed.
    pub fn confirm(&mut self, kind: CommandKind) -> bool {
        self.entries.remove(&kind).is_some()
    }

    /// Clears the pending `ShowScene` only if its target is `current_scene`.
    ///
    /// Returns `true` if an entry was removed.
    pub fn confirm_scene(&mut self, current_scene: Option<&str>) -> bool {
        match (self.pending_scene(), current_scene) {
            (Some(pending), Some(current)) if pending == current => {
                self.entries.remove(&CommandKind::ShowScene);
                true
            }
            _ => false,
        }
    }

    /// Clears the entry for `kind` if it is still the one started with
    /// `generation`.
    ///
    /// Returns `true` if an entry was removed.
    pub fn expire(&mut self, kind: CommandKind, generation: u64) -> bool {
        match self.entries.get(&kind) {
            Some(entry) if entry.generation == generation => {
                self.entries.remove(&kind);
                true
            }
            _ => false,
        }
    }

    /// Drops every entry.  The generation counter is kept so that timers
    /// started before the wipe can never match a later entry.
    pub fn clear_all(&mut self) -> usize {
        let count = self.entries.len();
        self.entries.clear();
        count
    }

    /// `true` when nothing is pending.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of pending entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
