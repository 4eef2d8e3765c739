//! Line-oriented console front-end.
//!
//! Reads one command per line, applies it through the session handle and the
//! hotkey/pin managers, and writes a short reply.  It also watches the
//! published session state so it can seed the default pins the first time
//! the host reports a scene list.
//!
//! ```text
//! > scenes
//! * s-intro   Intro      [Ctrl+1]
//!   s-game    Gameplay
//! > bind s-game ctrl+2
//! bound s-game to Ctrl+2
//! > press ctrl+2
//! fired Ctrl+2
//! ```

use std::fmt::Write as _;
use std::str::FromStr;
use std::sync::Arc;

use thiserror::Error;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tracing::{debug, info, warn};

use crate::application::command_router::CommandRouter;
use crate::application::hotkeys::HotkeyBindingManager;
use crate::application::pins::PinManager;
use crate::application::session_runtime::{RuntimeStopped, SessionHandle};
use crate::application::session_sync::SessionState;
use crate::infrastructure::registrar::{normalize_shortcut, ConsoleRegistrar};
use crate::infrastructure::storage::StorageError;
use crate::infrastructure::ui_bridge::{build_deck_view, CommandResult};

/// Printed by `help` and after a command that could not be parsed.
pub const USAGE: &str = "\
commands:
  status                       connection, scene, stream and record state
  scenes                       list scenes in display order
  scene <id>                   switch to a scene
  stream | record              toggle streaming or recording
  go <action-id>               run an action (scene id, control_stream, control_record)
  pins                         list pinned actions
  pin <action-id>              pin or unpin an action
  hotkeys                      list hotkey bindings
  bind <action-id> <shortcut>  bind a shortcut, e.g. `bind control_stream ctrl+alt+s`
  unbind <action-id>           remove a binding
  press <shortcut>             deliver a shortcut as if pressed
  deck                         print the deck view as JSON
  help | quit";

// ── Commands ──────────────────────────────────────────────────────────────────

/// One parsed console line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsoleCommand {
    Status,
    Scenes,
    Scene(String),
    Stream,
    Record,
    Go(String),
    Pins,
    Pin(String),
    Hotkeys,
    Bind { action_id: String, shortcut: String },
    Unbind(String),
    Press(String),
    Deck,
    Help,
    Quit,
}

/// Why a line could not be parsed.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("empty command")]
    Empty,
    #[error("unknown command '{0}'")]
    Unknown(String),
    #[error("usage: {0}")]
    MissingArgument(&'static str),
}

impl FromStr for ConsoleCommand {
    type Err = ParseError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let mut parts = line.split_whitespace();
        let Some(word) = parts.next() else {
            return Err(ParseError::Empty);
        };
        let mut arg = |usage: &'static str| {
            parts
                .next()
                .map(str::to_string)
                .ok_or(ParseError::MissingArgument(usage))
        };

        let cmd = match word.to_ascii_lowercase().as_str() {
            "status" => ConsoleCommand::Status,
            "scenes" => ConsoleCommand::Scenes,
            "scene" => ConsoleCommand::Scene(arg("scene <id>")?),
            "stream" => ConsoleCommand::Stream,
            "record" => ConsoleCommand::Record,
            "go" => ConsoleCommand::Go(arg("go <action-id>")?),
            "pins" => ConsoleCommand::Pins,
            "pin" => ConsoleCommand::Pin(arg("pin <action-id>")?),
            "hotkeys" => ConsoleCommand::Hotkeys,
            "bind" => {
                let usage = "bind <action-id> <shortcut>";
                let action_id = arg(usage)?;
                let shortcut = arg(usage)?;
                ConsoleCommand::Bind {
                    action_id,
                    shortcut,
                }
            }
            "unbind" => ConsoleCommand::Unbind(arg("unbind <action-id>")?),
            "press" => ConsoleCommand::Press(arg("press <shortcut>")?),
            "deck" => ConsoleCommand::Deck,
            "help" | "?" => ConsoleCommand::Help,
            "quit" | "exit" => ConsoleCommand::Quit,
            other => return Err(ParseError::Unknown(other.to_string())),
        };
        Ok(cmd)
    }
}

// ── Console application ───────────────────────────────────────────────────────

/// What the read loop should do after a command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Reply(String),
    Quit,
}

/// Errors raised while executing a command.
#[derive(Debug, Error)]
pub enum ConsoleError {
    #[error(transparent)]
    Stopped(#[from] RuntimeStopped),

    #[error("could not save: {0}")]
    Storage(#[from] StorageError),

    #[error("could not encode deck view: {0}")]
    Json(#[from] serde_json::Error),

    #[error("console I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// The console's view of the running client.
pub struct ConsoleApp {
    session: SessionHandle,
    hotkeys: HotkeyBindingManager,
    pins: PinManager,
    registrar: Arc<ConsoleRegistrar>,
    /// Set once the default pins have been offered a scene list.
    defaults_checked: bool,
}

impl ConsoleApp {
    pub fn new(
        session: SessionHandle,
        hotkeys: HotkeyBindingManager,
        pins: PinManager,
        registrar: Arc<ConsoleRegistrar>,
    ) -> Self {
        Self {
            session,
            hotkeys,
            pins,
            registrar,
            defaults_checked: false,
        }
    }

    pub fn pins(&self) -> &PinManager {
        &self.pins
    }

    pub fn hotkeys(&self) -> &HotkeyBindingManager {
        &self.hotkeys
    }

    /// Reads commands from `input` until `quit`, end of input, or the
    /// session runtime stopping.
    ///
    /// # Errors
    ///
    /// Returns [`ConsoleError::Io`] if reading or writing fails.  Storage
    /// failures are reported inline and do not end the loop.
    pub async fn run<R, W>(&mut self, input: R, mut output: W) -> Result<(), ConsoleError>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let mut lines = input.lines();
        let mut state = self.session.subscribe();
        let initial = state.borrow_and_update().clone();
        self.observe(&initial).await;

        loop {
            tokio::select! {
                line = lines.next_line() => {
                    let Some(line) = line? else {
                        debug!("console input closed");
                        break;
                    };
                    if line.trim().is_empty() {
                        continue;
                    }
                    let reply = match line.parse::<ConsoleCommand>() {
                        Ok(cmd) => match self.execute(cmd).await {
                            Ok(Outcome::Reply(text)) => text,
                            Ok(Outcome::Quit) => break,
                            Err(ConsoleError::Stopped(e)) => return Err(ConsoleError::Stopped(e)),
                            Err(e) => format!("error: {e}"),
                        },
                        Err(e) => format!("{e}\n{USAGE}"),
                    };
                    output.write_all(reply.as_bytes()).await?;
                    output.write_all(b"\n").await?;
                    output.flush().await?;
                }
                changed = state.changed() => {
                    if changed.is_err() {
                        info!("session runtime gone; leaving console");
                        break;
                    }
                    let current = state.borrow_and_update().clone();
                    self.observe(&current).await;
                }
            }
        }
        Ok(())
    }

    /// Seeds the default pins from the first scene list seen while connected.
    pub async fn observe(&mut self, state: &SessionState) {
        if self.defaults_checked || !state.is_connected() {
            return;
        }
        let ids: Vec<String> = state.scenes().into_iter().map(|s| s.id).collect();
        if ids.is_empty() {
            return;
        }
        self.defaults_checked = true;
        if let Err(e) = self.pins.set_defaults(&ids).await {
            warn!("default pins were not saved: {e}");
        }
    }

    /// Applies one command.
    ///
    /// # Errors
    ///
    /// [`ConsoleError::Stopped`] when the session runtime has gone away, or
    /// the storage/encoding error of the command.
    pub async fn execute(&mut self, cmd: ConsoleCommand) -> Result<Outcome, ConsoleError> {
        let state = self.session.state();
        let reply = match cmd {
            ConsoleCommand::Status => status_line(&state),
            ConsoleCommand::Scenes => self.scene_list(&state),
            ConsoleCommand::Scene(id) => {
                if !state.is_connected() {
                    return Ok(not_connected());
                }
                self.session.show_scene(&id).await?;
                format!("switching to {id}")
            }
            ConsoleCommand::Stream => {
                if !state.is_connected() {
                    return Ok(not_connected());
                }
                self.session.toggle_stream().await?;
                "toggling stream".to_string()
            }
            ConsoleCommand::Record => {
                if !state.is_connected() {
                    return Ok(not_connected());
                }
                self.session.toggle_record().await?;
                "toggling record".to_string()
            }
            ConsoleCommand::Go(action_id) => {
                if !state.is_connected() {
                    return Ok(not_connected());
                }
                match CommandRouter::resolve(&state.scenes(), &action_id) {
                    Some(action) => {
                        self.session.dispatch(&action_id).await?;
                        format!("dispatched {action}")
                    }
                    None => format!("unknown action '{action_id}'"),
                }
            }
            ConsoleCommand::Pins => self.pin_list(&state),
            ConsoleCommand::Pin(action_id) => {
                let pinned = self.pins.toggle_pin(&action_id).await?;
                format!("{} {action_id}", if pinned { "pinned" } else { "unpinned" })
            }
            ConsoleCommand::Hotkeys => self.hotkey_list(),
            ConsoleCommand::Bind {
                action_id,
                shortcut,
            } => match normalize_shortcut(&shortcut) {
                Some(canonical) => {
                    self.hotkeys.set_hotkey(&action_id, &canonical).await?;
                    format!("bound {action_id} to {canonical}")
                }
                None => format!("invalid shortcut '{shortcut}'"),
            },
            ConsoleCommand::Unbind(action_id) => {
                self.hotkeys.remove_hotkey(&action_id).await?;
                format!("unbound {action_id}")
            }
            ConsoleCommand::Press(shortcut) => {
                if self.registrar.fire(&shortcut) {
                    format!("fired {}", normalize_shortcut(&shortcut).unwrap_or(shortcut))
                } else {
                    format!("no hotkey registered for '{shortcut}'")
                }
            }
            ConsoleCommand::Deck => {
                let view = build_deck_view(&state, self.pins.pinned(), self.hotkeys.hotkeys());
                serde_json::to_string_pretty(&CommandResult::ok(view))?
            }
            ConsoleCommand::Help => USAGE.to_string(),
            ConsoleCommand::Quit => return Ok(Outcome::Quit),
        };
        Ok(Outcome::Reply(reply))
    }

    fn scene_list(&self, state: &SessionState) -> String {
        let scenes = state.scenes();
        if scenes.is_empty() {
            return "no scenes".to_string();
        }
        let mut out = String::new();
        for scene in scenes {
            let marker = if scene.current { '*' } else { ' ' };
            let _ = write!(out, "{marker} {:<12} {}", scene.id, scene.name);
            if state.pending_scene.as_deref() == Some(scene.id.as_str()) {
                out.push_str(" (pending)");
            }
            if let Some(shortcut) = self.hotkeys.get_hotkey(&scene.id) {
                let _ = write!(out, " [{shortcut}]");
            }
            out.push('\n');
        }
        out.truncate(out.trim_end().len());
        out
    }

    fn pin_list(&self, state: &SessionState) -> String {
        let view = build_deck_view(state, self.pins.pinned(), self.hotkeys.hotkeys());
        if view.buttons.is_empty() {
            return "no pins".to_string();
        }
        view.buttons
            .iter()
            .map(|b| format!("{:<16} {}", b.action_id, b.label))
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn hotkey_list(&self) -> String {
        let bindings = self.hotkeys.hotkeys();
        if bindings.is_empty() {
            return "no hotkeys".to_string();
        }
        bindings
            .iter()
            .map(|(action_id, shortcut)| format!("{action_id:<16} {shortcut}"))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

fn not_connected() -> Outcome {
    Outcome::Reply("not connected to host".to_string())
}

fn on_off(flag: bool, pending: bool) -> String {
    let word = if flag { "on" } else { "off" };
    if pending {
        format!("{word} (pending)")
    } else {
        word.to_string()
    }
}

fn status_line(state: &SessionState) -> String {
    let scene = state
        .current_scene()
        .map(|s| s.name)
        .unwrap_or_else(|| "-".to_string());
    format!(
        "{} | scene: {scene} | stream: {} | record: {}",
        state.connection,
        on_off(state.streaming, state.pending_stream),
        on_off(state.recording, state.pending_record),
    )
}

// ── Tests ─────────────────────────────────────────────────────────────────────
