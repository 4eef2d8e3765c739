//! JSON-file persistence adapter.
//!
//! Each record lives in its own file, `<dir>/<key>.json`.  The default
//! directory is the platform data directory:
//!
//! - Windows:  `%APPDATA%\scene-deck\`
//! - Linux:    `~/.local/share/scene-deck/`
//! - macOS:    `~/Library/Application Support/scene-deck/`
//!
//! Writes go to `<key>.json.tmp` first and are then renamed over the real
//! file, so a crash mid-write leaves the previous record intact.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::debug;

use super::{PersistenceAdapter, StorageError};

/// Name of the per-user directory under the platform data dir.
pub const APP_DIR_NAME: &str = "scene-deck";

/// Stores each record as a JSON file in one directory.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    dir: PathBuf,
}

impl JsonFileStore {
    /// Uses `dir` as the record directory.  The directory is created on the
    /// first save, not here.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Uses the platform data directory.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::NoPlatformDataDir`] when the platform has no
    /// data directory (e.g. `$HOME` is unset).
    pub fn in_platform_data_dir() -> Result<Self, StorageError> {
        let base = dirs::data_dir().ok_or(StorageError::NoPlatformDataDir)?;
        Ok(Self::new(base.join(APP_DIR_NAME)))
    }

    /// The record directory.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the file backing `key`.
    pub fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }
}

#[async_trait]
impl PersistenceAdapter for JsonFileStore {
    async fn load(&self, key: &str) -> Result<Option<String>, StorageError> {
        let path = self.path_for(key);
        match tokio::fs::read_to_string(&path).await {
            Ok(text) => Ok(Some(text)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(source) => Err(StorageError::Io { path, source }),
        }
    }

    async fn save(&self, key: &str, value: &str) -> Result<(), StorageError> {
        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|source| StorageError::Io {
                path: self.dir.clone(),
                source,
            })?;

        let path = self.path_for(key);
        let tmp = self.dir.join(format!("{key}.json.tmp"));
        tokio::fs::write(&tmp, value)
            .await
            .map_err(|source| StorageError::Io {
                path: tmp.clone(),
                source,
            })?;
        tokio::fs::rename(&tmp, &path)
            .await
            .map_err(|source| StorageError::Io {
                path: path.clone(),
                source,
            })?;

        debug!("saved record '{key}' to {}", path.display());
        Ok(())
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
