//! Domain entities for Scene Deck.
//!
//! This module contains pure business logic with no infrastructure dependencies.
//!
//! # What is "domain" in Clean Architecture? (for beginners)
//!
//! The innermost layer of the program holds the rules that make the system
//! what it is.  Here that means:
//!
//! - The **session snapshot** mirrored from the host and the **scene** view
//!   derived from it.
//! - The **action identifiers** shared by hotkeys, pins, and the command router.
//! - The **pending overlay**: optimistic markers for commands the host has not
//!   confirmed yet.
//!
//! Code in outer layers (application, infrastructure) depends on the domain,
//! but the domain never depends on them.  This makes it easy to unit-test in
//! isolation.

pub mod action;
pub mod pending;
pub mod session;
