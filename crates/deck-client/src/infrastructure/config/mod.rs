//! TOML-based configuration for the deck client.
//!
//! Read from the platform config directory:
//! - Windows:  `%APPDATA%\scene-deck\config.toml`
//! - Linux:    `~/.config/scene-deck/config.toml`
//! - macOS:    `~/Library/Application Support/scene-deck/config.toml`
//!
//! Every field has a default, so the file is optional and may list only the
//! values that differ:
//!
//! ```toml
//! log_level = "debug"
//!
//! [host]
//! address = "127.0.0.1"
//! port = 13376
//! object_name = "meld"
//!
//! [session]
//! reconnect_delay_secs = 5
//! pending_timeout_secs = 3
//! ```
//!
//! Command-line flags override the file (see `main.rs`).

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::application::session_sync::SyncTimings;
use crate::infrastructure::network::ChannelConfig;
use crate::infrastructure::storage::file::APP_DIR_NAME;

/// Error type for configuration file operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The platform config directory could not be determined.
    #[error("could not determine platform config directory")]
    NoPlatformConfigDir,

    /// A file system I/O error occurred.
    #[error("I/O error accessing config at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The TOML content could not be parsed.
    #[error("failed to parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),
}

// ── Config schema types ───────────────────────────────────────────────────────

/// Top-level configuration file.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DeckConfig {
    /// `tracing` filter used when `RUST_LOG` is unset.
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Overrides the directory for hotkey and pin records.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_dir: Option<PathBuf>,
    // Tables last: TOML forbids plain keys after a table header.
    #[serde(default)]
    pub host: HostConfig,
    #[serde(default)]
    pub session: SessionConfig,
}

/// Where the host listens.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HostConfig {
    #[serde(default = "default_address")]
    pub address: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Name of the object the host publishes on its channel.
    #[serde(default = "default_object_name")]
    pub object_name: String,
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
    #[serde(default = "default_handshake_timeout_secs")]
    pub handshake_timeout_secs: u64,
}

/// Session timing.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SessionConfig {
    /// Fixed delay between a close and the next connection attempt.
    #[serde(default = "default_reconnect_delay_secs")]
    pub reconnect_delay_secs: u64,
    /// How long a command shows as pending without confirmation.
    #[serde(default = "default_pending_timeout_secs")]
    pub pending_timeout_secs: u64,
}

// ── Default helpers ───────────────────────────────────────────────────────────

fn default_log_level() -> String {
    "info".to_string()
}
fn default_address() -> String {
    "127.0.0.1".to_string()
}
fn default_port() -> u16 {
    13376
}
fn default_object_name() -> String {
    "meld".to_string()
}
fn default_connect_timeout_secs() -> u64 {
    5
}
fn default_handshake_timeout_secs() -> u64 {
    10
}
fn default_reconnect_delay_secs() -> u64 {
    5
}
fn default_pending_timeout_secs() -> u64 {
    3
}

impl Default for DeckConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            data_dir: None,
            host: HostConfig::default(),
            session: SessionConfig::default(),
        }
    }
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            address: default_address(),
            port: default_port(),
            object_name: default_object_name(),
            connect_timeout_secs: default_connect_timeout_secs(),
            handshake_timeout_secs: default_handshake_timeout_secs(),
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            reconnect_delay_secs: default_reconnect_delay_secs(),
            pending_timeout_secs: default_pending_timeout_secs(),
        }
    }
}

impl DeckConfig {
    /// Channel settings derived from `[host]`.
    pub fn channel(&self) -> ChannelConfig {
        ChannelConfig {
            connect_timeout: Duration::from_secs(self.host.connect_timeout_secs),
            handshake_timeout: Duration::from_secs(self.host.handshake_timeout_secs),
            ..ChannelConfig::for_address(&self.host.address, self.host.port, &self.host.object_name)
        }
    }

    /// Session timings derived from `[session]`.
    pub fn timings(&self) -> SyncTimings {
        SyncTimings {
            reconnect_delay: Duration::from_secs(self.session.reconnect_delay_secs),
            pending_timeout: Duration::from_secs(self.session.pending_timeout_secs),
        }
    }
}

// ── Config repository ─────────────────────────────────────────────────────────

/// Resolves the default config file path.
///
/// # Errors
///
/// Returns [`ConfigError::NoPlatformConfigDir`] if the base directory cannot be
/// determined.
pub fn config_file_path() -> Result<PathBuf, ConfigError> {
    let base = dirs::config_dir().ok_or(ConfigError::NoPlatformConfigDir)?;
    Ok(base.join(APP_DIR_NAME).join("config.toml"))
}

/// Loads `DeckConfig` from `path`, returning defaults if the file does not
/// exist.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] for file-system errors other than "not found",
/// and [`ConfigError::Parse`] if the TOML is malformed.
pub fn load_config(path: &Path) -> Result<DeckConfig, ConfigError> {
    match std::fs::read_to_string(path) {
        Ok(content) => Ok(toml::from_str(&content)?),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(DeckConfig::default()),
        Err(source) => Err(ConfigError::Io {
            path: path.to_path_buf(),
            source,
        }),
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
