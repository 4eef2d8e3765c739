//! deck-client library entry point.
//!
//! Re-exports all public modules so that integration tests in `tests/`
//! and the binary entry point in `main.rs` share the same module tree.
//!
//! # What does deck-client do? (for beginners)
//!
//! The host is a streaming application running on the same machine.  It
//! publishes an object over a local WebSocket; this client connects to it
//! and acts as a remote control:
//!
//! 1. Connects to the host and completes the WebChannel handshake.
//! 2. Mirrors the host's scene list and its streaming/recording flags, and
//!    keeps the mirror current as the host pushes changes.
//! 3. Sends commands (show a scene, toggle stream, toggle record) and shows
//!    them as "pending" until the host confirms or three seconds pass.
//! 4. Binds global shortcuts and deck pins to those commands, persisting
//!    both as JSON.
//! 5. Reconnects five seconds after the host goes away.

/// Application layer: use cases for the client.
pub mod application;

/// Infrastructure layer: network, storage, configuration, and front-end.
pub mod infrastructure;
