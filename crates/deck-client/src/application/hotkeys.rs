//! Hotkey Binding Manager: global shortcuts mapped to action ids.
//!
//! The binding map (`action id → shortcut`) is stored under the `"hotkeys"`
//! key and mirrored into the OS shortcut registrar.  Every mutation rewrites
//! the stored map and then re-syncs the registrar from scratch:
//!
//! 1. `unregister_all()`
//! 2. `register(shortcut, callback)` for every non-empty binding
//!
//! A registration the OS refuses (already taken, invalid accelerator) is
//! logged and skipped; it never stops the remaining bindings.
//!
//! When a shortcut fires, its callback pushes the bound action id onto the
//! trigger channel returned by [`HotkeyBindingManager::load`].
//! [`forward_triggers`] drains that channel into the session runtime, which
//! routes each id through the Command Router.

use std::collections::BTreeMap;
use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::application::session_runtime::SessionHandle;
use crate::infrastructure::storage::{load_json, save_json, Loaded, PersistenceAdapter, StorageError};

/// Storage key of the binding map.
pub const HOTKEYS_KEY: &str = "hotkeys";

/// Callback a registrar invokes when its shortcut fires.
pub type TriggerFn = Box<dyn Fn() + Send + Sync>;

/// Receives the action id of every fired shortcut.
pub type HotkeyTriggers = mpsc::UnboundedReceiver<String>;

/// The OS-level global shortcut facility.
pub trait ShortcutRegistrar: Send + Sync {
    /// Drops every shortcut this process registered.
    fn unregister_all(&self);

    /// Registers `shortcut`; returns `false` when the OS refuses it.
    fn register(&self, shortcut: &str, on_trigger: TriggerFn) -> bool;
}

/// Owns the binding map and keeps the registrar in sync with it.
pub struct HotkeyBindingManager {
    adapter: Arc<dyn PersistenceAdapter>,
    registrar: Arc<dyn ShortcutRegistrar>,
    bindings: BTreeMap<String, String>,
    trigger_tx: mpsc::UnboundedSender<String>,
}

impl HotkeyBindingManager {
    /// Loads the stored bindings and registers them.
    ///
    /// A missing or unreadable record yields an empty map.  Returns the
    /// manager together with the trigger channel.
    pub async fn load(
        adapter: Arc<dyn PersistenceAdapter>,
        registrar: Arc<dyn ShortcutRegistrar>,
    ) -> (Self, HotkeyTriggers) {
        let bindings = match load_json::<BTreeMap<String, String>>(adapter.as_ref(), HOTKEYS_KEY)
            .await
        {
            Loaded::Value(map) => map,
            Loaded::Missing | Loaded::Corrupt => BTreeMap::new(),
        };
        let (trigger_tx, trigger_rx) = mpsc::unbounded_channel();
        let manager = Self {
            adapter,
            registrar,
            bindings,
            trigger_tx,
        };
        let active = manager.resync();
        info!("{active} hotkey(s) active");
        (manager, trigger_rx)
    }

    /// Binds `shortcut` to `action_id`, replacing any previous shortcut for
    /// that action.
    ///
    /// # Errors
    ///
    /// Returns the storage error if persisting fails.  The binding is kept in
    /// memory and the registrar is re-synced either way.
    pub async fn set_hotkey(&mut self, action_id: &str, shortcut: &str) -> Result<(), StorageError> {
        self.bindings
            .insert(action_id.to_string(), shortcut.to_string());
        self.commit().await
    }

    /// Removes the binding for `action_id`.
    ///
    /// # Errors
    ///
    /// As for [`set_hotkey`](Self::set_hotkey).
    pub async fn remove_hotkey(&mut self, action_id: &str) -> Result<(), StorageError> {
        if self.bindings.remove(action_id).is_none() {
            debug!("no hotkey bound to '{action_id}'");
        }
        self.commit().await
    }

    /// The shortcut bound to `action_id`, if any.
    pub fn get_hotkey(&self, action_id: &str) -> Option<&str> {
        self.bindings.get(action_id).map(String::as_str)
    }

    /// All bindings, ordered by action id.
    pub fn hotkeys(&self) -> &BTreeMap<String, String> {
        &self.bindings
    }

    async fn commit(&mut self) -> Result<(), StorageError> {
        let saved = save_json(self.adapter.as_ref(), HOTKEYS_KEY, &self.bindings).await;
        if let Err(e) = &saved {
            warn!("failed to save hotkeys: {e}");
        }
        self.resync();
        saved
    }

    /// Re-registers every binding from scratch.  Returns how many the
    /// registrar accepted.
    pub fn resync(&self) -> usize {
        self.registrar.unregister_all();
        let mut active = 0;
        for (action_id, shortcut) in &self.bindings {
            if shortcut.is_empty() {
                continue;
            }
            let tx = self.trigger_tx.clone();
            let id = action_id.clone();
            let on_trigger: TriggerFn = Box::new(move || {
                // The receiver is gone only during shutdown.
                let _ = tx.send(id.clone());
            });
            if self.registrar.register(shortcut, on_trigger) {
                active += 1;
            } else {
                warn!("could not register hotkey '{shortcut}' for '{action_id}'");
            }
        }
        active
    }
}

/// Forwards fired action ids to the session runtime until either side closes.
pub async fn forward_triggers(mut triggers: HotkeyTriggers, session: SessionHandle) {
    while let Some(action_id) = triggers.recv().await {
        debug!("hotkey fired for '{action_id}'");
        if session.dispatch(&action_id).await.is_err() {
            break;
        }
    }
    debug!("hotkey trigger forwarding stopped");
}

// ── Tests ─────────────────────────────────────────────────────────────────────
