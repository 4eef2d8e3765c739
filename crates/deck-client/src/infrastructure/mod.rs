//! Infrastructure layer for the deck client.
//!
//! Contains the adapters around the application layer: the WebSocket
//! channel to the host, on-disk storage, configuration, the shortcut
//! registrar, and the console front-end.
//!
//! # Sub-modules
//!
//! - **`network`** – Opens the WebSocket, runs the WebChannel handshake,
//!   and turns host pushes into session events.
//!
//! - **`storage`** – The key/value persistence adapter plus its JSON-file and
//!   in-memory implementations.
//!
//! - **`config`** – TOML configuration file.
//!
//! - **`registrar`** – In-process shortcut table used in place of an OS
//!   global-shortcut API.
//!
//! - **`ui_bridge`** – Serialisable deck view for a UI or tray.
//!
//! - **`console`** – stdin command loop used by the binary.

pub mod config;
pub mod console;
pub mod network;
pub mod registrar;
pub mod storage;
pub mod ui_bridge;
