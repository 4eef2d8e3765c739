//! Application layer use cases for the deck client.
//!
//! # What use cases does the client have?
//!
//! - **`session_sync`** – The connection state machine.  Mirrors the host's
//!   session, streaming, and recording state, overlays unconfirmed commands
//!   for a few seconds, and reconnects after the channel drops.
//!
//! - **`session_runtime`** – Runs the sync client on a single Tokio task and
//!   hands out cloneable [`SessionHandle`](session_runtime::SessionHandle)s.
//!
//! - **`command_router`** – Maps an action id (a scene id or one of the two
//!   control ids) onto a session command.
//!
//! - **`hotkeys`** – Persists `action id → shortcut` bindings and keeps the
//!   shortcut registrar in sync with them.
//!
//! - **`pins`** – Persists the ordered list of actions shown on the deck.

pub mod command_router;
pub mod hotkeys;
pub mod pins;
pub mod session_runtime;
pub mod session_sync;
