//! Scene Deck client: entry point.
//!
//! Connects to the host's WebChannel endpoint, mirrors its session, and reads
//! console commands from stdin until `quit`, end of input, or Ctrl+C.
//!
//! # Usage
//!
//! ```text
//! deck-client [OPTIONS]
//!
//! Options:
//!   --config <PATH>       Config file [default: platform config dir]
//!   --host <ADDR>         Host address [default: 127.0.0.1]
//!   --port <PORT>         Host WebChannel port [default: 13376]
//!   --object <NAME>       Published host object [default: meld]
//!   --data-dir <PATH>     Where hotkeys and pins are stored
//!   --ephemeral           Keep hotkeys and pins in memory only
//!   --log-level <FILTER>  tracing filter when RUST_LOG is unset
//! ```
//!
//! # Environment variable overrides
//!
//! | Variable          | Flag          |
//! |-------------------|---------------|
//! | `DECK_CONFIG`     | `--config`    |
//! | `DECK_HOST`       | `--host`      |
//! | `DECK_PORT`       | `--port`      |
//! | `DECK_OBJECT`     | `--object`    |
//! | `DECK_DATA_DIR`   | `--data-dir`  |
//! | `DECK_LOG`        | `--log-level` |
//!
//! Flags take precedence over the config file, which takes precedence over
//! built-in defaults.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tokio::io::{AsyncWriteExt, BufReader};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use deck_client::application::hotkeys::{forward_triggers, HotkeyBindingManager};
use deck_client::application::pins::PinManager;
use deck_client::application::session_runtime::SessionRuntime;
use deck_client::application::session_sync::Connector;
use deck_client::infrastructure::config::{config_file_path, load_config, DeckConfig};
use deck_client::infrastructure::console::{ConsoleApp, USAGE};
use deck_client::infrastructure::network::WebChannelConnector;
use deck_client::infrastructure::registrar::ConsoleRegistrar;
use deck_client::infrastructure::storage::{JsonFileStore, MemoryStore, PersistenceAdapter};

// ── CLI argument definitions ──────────────────────────────────────────────────

/// Remote control for the Meld Studio host.
#[derive(Debug, Parser)]
#[command(name = "deck-client", about = "Scene and stream remote control", version)]
struct Cli {
    /// Config file to read instead of the platform default.
    #[arg(long, env = "DECK_CONFIG")]
    config: Option<PathBuf>,

    /// Address the host listens on.
    #[arg(long, env = "DECK_HOST")]
    host: Option<String>,

    /// Port of the host's WebChannel endpoint.
    #[arg(long, env = "DECK_PORT")]
    port: Option<u16>,

    /// Name of the object the host publishes.
    #[arg(long = "object", env = "DECK_OBJECT")]
    object_name: Option<String>,

    /// Directory for the hotkey and pin records.
    #[arg(long, env = "DECK_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// Keep hotkeys and pins in memory; nothing is written to disk.
    #[arg(long)]
    ephemeral: bool,

    /// `tracing` filter used when `RUST_LOG` is unset.
    #[arg(long, env = "DECK_LOG")]
    log_level: Option<String>,
}

impl Cli {
    /// Loads the config file and applies the flags on top of it.
    ///
    /// # Errors
    ///
    /// Returns an error if an explicitly named config file cannot be read or
    /// parsed.
    fn into_config(self) -> anyhow::Result<(DeckConfig, bool)> {
        let mut config = match &self.config {
            Some(path) => load_config(path)
                .with_context(|| format!("failed to load config from {}", path.display()))?,
            // No platform config dir is not fatal; run on defaults.
            None => match config_file_path() {
                Ok(path) => load_config(&path)
                    .with_context(|| format!("failed to load config from {}", path.display()))?,
                Err(_) => DeckConfig::default(),
            },
        };

        if let Some(host) = self.host {
            config.host.address = host;
        }
        if let Some(port) = self.port {
            config.host.port = port;
        }
        if let Some(object_name) = self.object_name {
            config.host.object_name = object_name;
        }
        if let Some(dir) = self.data_dir {
            config.data_dir = Some(dir);
        }
        if let Some(level) = self.log_level {
            config.log_level = level;
        }
        Ok((config, self.ephemeral))
    }
}

/// Picks the persistence adapter for hotkeys and pins.
fn open_store(config: &DeckConfig, ephemeral: bool) -> anyhow::Result<Arc<dyn PersistenceAdapter>> {
    if ephemeral {
        return Ok(Arc::new(MemoryStore::new()));
    }
    let store = match &config.data_dir {
        Some(dir) => JsonFileStore::new(dir),
        None => JsonFileStore::in_platform_data_dir()
            .context("no data directory; pass --data-dir or --ephemeral")?,
    };
    info!("storing hotkeys and pins in {}", store.dir().display());
    Ok(Arc::new(store))
}

// ── Entry point ───────────────────────────────────────────────────────────────

/// Program entry point.
///
/// # What happens at startup
///
/// 1. CLI arguments are parsed and merged over the config file.
/// 2. `tracing_subscriber` is initialised from `RUST_LOG`, falling back to
///    the configured `log_level`.
/// 3. The session runtime is spawned with a WebChannel connector.
/// 4. Hotkeys and pins are loaded; fired hotkeys are forwarded to the
///    session.
/// 5. The session starts connecting and the console loop takes over stdin.
///
/// The sync client is single-threaded by nature, so a `current_thread`
/// runtime is enough.
#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let (config, ephemeral) = Cli::parse().into_config()?;

    // ── Logging setup ─────────────────────────────────────────────────────────
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.log_level)),
        )
        .init();

    let channel = config.channel();
    info!(
        "deck-client starting: host={} object={}",
        channel.url, channel.object_name
    );

    // ── Session ───────────────────────────────────────────────────────────────
    let (runtime, session) = SessionRuntime::new(
        move |events| Arc::new(WebChannelConnector::new(channel, events)) as Arc<dyn Connector>,
        config.timings(),
    );
    let runtime_task = tokio::spawn(runtime.run());

    // ── Hotkeys and pins ──────────────────────────────────────────────────────
    let store = open_store(&config, ephemeral)?;
    let registrar = Arc::new(ConsoleRegistrar::new());
    let (hotkeys, triggers) = HotkeyBindingManager::load(store.clone(), registrar.clone()).await;
    let pins = PinManager::load(store).await;
    tokio::spawn(forward_triggers(triggers, session.clone()));

    session
        .connect()
        .await
        .context("session runtime stopped before connecting")?;

    // ── Console ───────────────────────────────────────────────────────────────
    let mut stdout = tokio::io::stdout();
    stdout.write_all(USAGE.as_bytes()).await?;
    stdout.write_all(b"\n").await?;

    let mut app = ConsoleApp::new(session.clone(), hotkeys, pins, registrar);
    let interrupted = tokio::select! {
        result = app.run(BufReader::new(tokio::io::stdin()), stdout) => {
            result.context("console loop failed")?;
            false
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Ctrl+C received");
            true
        }
    };

    // ── Shutdown ──────────────────────────────────────────────────────────────
    if session.shutdown().await.is_err() {
        warn!("session runtime had already stopped");
    }
    drop(app);
    drop(session);
    if let Err(e) = runtime_task.await {
        warn!("session runtime task failed: {e}");
    }
    info!("deck-client stopped");
    if interrupted {
        // A pending stdin read runs on a blocking thread that would hold the
        // runtime open until the next line arrives.
        std::process::exit(0);
    }
    Ok(())
}
