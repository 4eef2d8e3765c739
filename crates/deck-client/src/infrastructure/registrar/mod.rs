//! In-process shortcut registrar.
//!
//! A desktop shell would register shortcuts with the OS.  The console build
//! has no global keyboard hook, so [`ConsoleRegistrar`] keeps the table
//! itself and the user "presses" a shortcut by typing `press <shortcut>`.
//! It still behaves like an OS registrar where it matters:
//!
//! - shortcuts are parsed and normalised (`ctrl+shift+a` → `Ctrl+Shift+A`);
//! - an invalid accelerator is refused;
//! - the same accelerator cannot be registered twice.

use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use tracing::debug;

use crate::application::hotkeys::{ShortcutRegistrar, TriggerFn};

/// Canonical modifier names, in the order they are printed.
const MODIFIERS: &[(&str, &[&str])] = &[
    ("CmdOrCtrl", &["cmdorctrl", "commandorcontrol"]),
    ("Ctrl", &["ctrl", "control"]),
    ("Alt", &["alt", "option"]),
    ("Shift", &["shift"]),
    ("Super", &["super", "cmd", "command", "meta", "win"]),
];

/// Parses an accelerator such as `"ctrl+alt+F5"` into its canonical form.
///
/// Returns `None` when a part is empty, a modifier repeats, or the final key
/// is missing or is itself a modifier.
pub fn normalize_shortcut(shortcut: &str) -> Option<String> {
    let parts: Vec<&str> = shortcut.split('+').map(str::trim).collect();
    let (key, modifiers) = parts.split_last()?;
    if key.is_empty() || modifier_name(key).is_some() {
        return None;
    }

    let mut seen = [false; MODIFIERS.len()];
    for part in modifiers {
        let idx = MODIFIERS
            .iter()
            .position(|(_, aliases)| aliases.contains(&part.to_ascii_lowercase().as_str()))?;
        if seen[idx] {
            return None;
        }
        seen[idx] = true;
    }

    let mut out: Vec<String> = MODIFIERS
        .iter()
        .zip(seen)
        .filter(|(_, on)| *on)
        .map(|((name, _), _)| (*name).to_string())
        .collect();
    out.push(normalize_key(key));
    Some(out.join("+"))
}

fn modifier_name(part: &str) -> Option<&'static str> {
    let lower = part.to_ascii_lowercase();
    MODIFIERS
        .iter()
        .find(|(_, aliases)| aliases.contains(&lower.as_str()))
        .map(|(name, _)| *name)
}

/// Single characters are upper-cased; named keys get a capital first letter
/// (`space` → `Space`, `f5` → `F5`).
fn normalize_key(key: &str) -> String {
    let mut chars = key.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => String::new(),
    }
}

/// Shortcut table driven from the console.
#[derive(Default)]
pub struct ConsoleRegistrar {
    active: Mutex<BTreeMap<String, TriggerFn>>,
}

impl ConsoleRegistrar {
    pub fn new() -> Self {
        Self::default()
    }

    fn table(&self) -> MutexGuard<'_, BTreeMap<String, TriggerFn>> {
        self.active.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Simulates the OS delivering `shortcut`.  Returns `false` when nothing
    /// is registered for it.
    pub fn fire(&self, shortcut: &str) -> bool {
        let Some(key) = normalize_shortcut(shortcut) else {
            return false;
        };
        match self.table().get(&key) {
            Some(on_trigger) => {
                on_trigger();
                true
            }
            None => false,
        }
    }

    /// Currently registered accelerators, in canonical form.
    pub fn registered(&self) -> Vec<String> {
        self.table().keys().cloned().collect()
    }
}

impl ShortcutRegistrar for ConsoleRegistrar {
    fn unregister_all(&self) {
        self.table().clear();
    }

    fn register(&self, shortcut: &str, on_trigger: TriggerFn) -> bool {
        let Some(key) = normalize_shortcut(shortcut) else {
            debug!("refusing invalid shortcut '{shortcut}'");
            return false;
        };
        let mut table = self.table();
        if table.contains_key(&key) {
            debug!("refusing duplicate shortcut '{key}'");
            return false;
        }
        table.insert(key, on_trigger);
        true
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
