//! Persistence Adapter: small string records keyed by name.
//!
//! Hotkeys and pins are the only state that outlives a session.  Each is a
//! single JSON document stored under a fixed key (`"hotkeys"`, `"pins"`).
//!
//! Two adapters are provided:
//!
//! - [`JsonFileStore`] writes one `<key>.json` file per record into the
//!   platform data directory.
//! - [`MemoryStore`] keeps records in a map, for tests and `--ephemeral` runs.
//!
//! # Decode faults
//!
//! A record that exists but cannot be decoded is not fatal: callers log the
//! fault and fall back to a default.  [`load_json`] encodes that policy as
//! [`Loaded::Corrupt`] so each caller can still tell "never stored" apart
//! from "stored but unreadable".

pub mod file;
pub mod memory;

pub use file::JsonFileStore;
pub use memory::MemoryStore;

use std::path::PathBuf;

use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};
use thiserror::Error;
use tracing::error;

/// Errors raised by persistence adapters.
#[derive(Debug, Error)]
pub enum StorageError {
    /// The platform data directory could not be determined.
    #[error("could not determine platform data directory")]
    NoPlatformDataDir,

    /// A file system I/O error occurred.
    #[error("I/O error accessing {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A value could not be encoded as JSON.
    #[error("failed to encode record '{key}': {source}")]
    Encode {
        key: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Key-value storage of UTF-8 strings.
#[async_trait]
pub trait PersistenceAdapter: Send + Sync {
    /// Returns the stored value, or `None` when nothing was ever saved.
    async fn load(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Replaces the stored value.
    async fn save(&self, key: &str, value: &str) -> Result<(), StorageError>;
}

/// Outcome of loading a typed record.
#[derive(Debug, Clone, PartialEq)]
pub enum Loaded<T> {
    /// No record exists under the key.
    Missing,
    /// The record was decoded.
    Value(T),
    /// A record exists but could not be read or decoded.
    Corrupt,
}

/// Loads and decodes the JSON record under `key`.
///
/// Read errors and decode errors are logged and reported as
/// [`Loaded::Corrupt`]; they never propagate.
pub async fn load_json<T: DeserializeOwned>(
    adapter: &dyn PersistenceAdapter,
    key: &str,
) -> Loaded<T> {
    let text = match adapter.load(key).await {
        Ok(Some(text)) => text,
        Ok(None) => return Loaded::Missing,
        Err(e) => {
            error!("failed to read record '{key}': {e}");
            return Loaded::Corrupt;
        }
    };
    match serde_json::from_str(&text) {
        Ok(value) => Loaded::Value(value),
        Err(e) => {
            error!("record '{key}' is not valid JSON for its type: {e}");
            Loaded::Corrupt
        }
    }
}

/// Encodes `value` as JSON and saves it under `key`.
///
/// # Errors
///
/// Returns [`StorageError::Encode`] if serialisation fails, or whatever the
/// adapter's `save` returns.
pub async fn save_json<T: Serialize + ?Sized>(
    adapter: &dyn PersistenceAdapter,
    key: &str,
    value: &T,
) -> Result<(), StorageError> {
    let text = serde_json::to_string(value).map_err(|source| StorageError::Encode {
        key: key.to_string(),
        source,
    })?;
    adapter.save(key, &text).await
}

// ── Tests ─────────────────────────────────────────────────────────────────────
