//! # deck-core
//!
//! Shared library for Scene Deck containing the mirrored session domain and
//! the host's WebChannel wire protocol.
//!
//! This crate has zero dependencies on sockets, timers, or the file system.
//! The client crate (`deck-client`) drives it from the Tokio runtime.
//!
//! # Architecture overview (for beginners)
//!
//! Scene Deck is a remote control for a streaming application that is already
//! running on the same machine (called the "host").  The host publishes its
//! state (scenes, streaming flag, recording flag) over a WebSocket, and
//! accepts commands such as "show this scene" or "toggle the stream".
//!
//! This crate (`deck-core`) is the shared foundation.  It defines:
//!
//! - **`domain`** – What the client knows about the host: the session
//!   snapshot, the derived list of scenes, the action identifiers used by
//!   hotkeys and pins, and the optimistic overlay of commands that the host
//!   has not yet confirmed.
//!
//! - **`protocol`** – How bytes travel over the WebSocket.  The host speaks a
//!   remote-object protocol ("WebChannel"): JSON frames that describe an
//!   object's methods, properties, and signals, then carry property updates
//!   and method invocations.

pub mod domain;
pub mod protocol;

// Re-export the most-used types at the crate root so callers can write
// `deck_core::Scene` instead of `deck_core::domain::session::Scene`.
pub use domain::action::{Action, CONTROL_RECORD, CONTROL_STREAM};
pub use domain::pending::{CommandKind, PendingEntry, PendingOverlay};
pub use domain::session::{HostState, Item, Scene, SessionSnapshot, SCENE_TYPE};
pub use protocol::codec::{decode_frame, encode_frame, ProtocolError};
pub use protocol::messages::{ClientMessage, HostMessage};
pub use protocol::object::{HostBinding, HostNotification, ObjectDescriptor};
pub use protocol::sequence::RequestIds;
