//! Channel Transport: the WebSocket connection to the host.
//!
//! [`WebChannelConnector`] implements the session's
//! [`Connector`](crate::application::session_sync::Connector) seam.  Every
//! `open(channel)` spawns one task that owns one socket for its whole life:
//!
//! ```text
//! connect_async ──► TransportOpened
//!   send  {"type":3,"id":0}                  init
//!   await {"type":10,"id":0,"data":{...}}    object descriptors
//!   resolve HostBinding                      (ProtocolMismatch on failure)
//!   send  {"type":7,...} per plain signal, then {"type":4}
//! ──► HandshakeCompleted { proxy }
//!   pump: proxy invocations → frames
//!         property updates  → cache + notifications, then {"type":4}
//! ──► TransportError (if any) ──► TransportClosed
//! ```
//!
//! The session never sees the socket.  It receives events and holds a
//! [`RemoteHost`] proxy; dropping that proxy is how it closes the channel.

pub mod remote_host;

pub use remote_host::{PropertyCache, RemoteHost};

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use deck_core::protocol::object::HostNotification;
use deck_core::protocol::RequestIds;
use deck_core::{
    decode_frame, encode_frame, ClientMessage, HostBinding, HostMessage, HostState,
    ObjectDescriptor, ProtocolError,
};
use futures_util::{Sink, SinkExt, Stream, StreamExt};
use serde_json::Value;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::time::timeout;
use tokio_tungstenite::{
    connect_async,
    tungstenite::{Error as WsError, Message as WsMessage},
};
use tracing::{debug, info, warn};

use crate::application::session_runtime::EventSender;
use crate::application::session_sync::{ChannelId, Connector, HostProxy, SessionEvent};

use remote_host::read_cache;

/// Capacity of the per-channel invocation queue.
const OUTGOING_CAPACITY: usize = 32;

/// Errors that end a channel.
#[derive(Debug, Error)]
pub enum ChannelError {
    /// The WebSocket connection could not be established.
    #[error("failed to connect to {url}: {source}")]
    ConnectFailed {
        url: String,
        #[source]
        source: WsError,
    },

    /// A stage of the channel did not finish in time.
    #[error("timed out while {0}")]
    Timeout(&'static str),

    /// An I/O or framing error on the established socket.
    #[error("websocket error: {0}")]
    WebSocket(#[from] WsError),

    /// The host does not publish the object interface the client needs.
    #[error("host interface mismatch: {0}")]
    ProtocolMismatch(#[source] ProtocolError),

    /// The host closed the socket before the handshake finished.
    #[error("connection closed by host during handshake")]
    ClosedDuringHandshake,
}

/// Where and how to reach the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelConfig {
    /// WebSocket URL, e.g. `ws://127.0.0.1:13376`.
    pub url: String,
    /// Name of the published host object.
    pub object_name: String,
    pub connect_timeout: Duration,
    pub handshake_timeout: Duration,
}

impl ChannelConfig {
    /// Builds the URL from an address and a port.
    pub fn for_address(address: &str, port: u16, object_name: &str) -> Self {
        Self {
            url: format!("ws://{address}:{port}"),
            object_name: object_name.to_string(),
            ..Self::default()
        }
    }
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            url: "ws://127.0.0.1:13376".to_string(),
            object_name: "meld".to_string(),
            connect_timeout: Duration::from_secs(5),
            handshake_timeout: Duration::from_secs(10),
        }
    }
}

// ── Connector ─────────────────────────────────────────────────────────────────

/// Opens WebChannel connections and reports them to the session runtime.
#[derive(Debug, Clone)]
pub struct WebChannelConnector {
    config: Arc<ChannelConfig>,
    events: EventSender,
}

impl WebChannelConnector {
    pub fn new(config: ChannelConfig, events: EventSender) -> Self {
        Self {
            config: Arc::new(config),
            events,
        }
    }
}

impl Connector for WebChannelConnector {
    fn open(&self, channel: ChannelId) {
        let config = Arc::clone(&self.config);
        let events = self.events.clone();
        tokio::spawn(run_channel(channel, config, events));
    }
}

/// Drives one channel and always finishes with `TransportClosed`.
async fn run_channel(channel: ChannelId, config: Arc<ChannelConfig>, events: EventSender) {
    match drive_channel(channel, &config, &events).await {
        Ok(()) => info!("channel {channel} to {} closed", config.url),
        Err(e) => {
            warn!("channel {channel} to {} failed: {e}", config.url);
            let _ = events
                .send(SessionEvent::TransportError {
                    channel,
                    message: e.to_string(),
                })
                .await;
        }
    }
    let _ = events.send(SessionEvent::TransportClosed { channel }).await;
}

async fn drive_channel(
    channel: ChannelId,
    config: &ChannelConfig,
    events: &EventSender,
) -> Result<(), ChannelError> {
    // ── Step 1: connect ───────────────────────────────────────────────────────
    let (socket, _response) = timeout(config.connect_timeout, connect_async(config.url.as_str()))
        .await
        .map_err(|_| ChannelError::Timeout("connecting"))?
        .map_err(|source| ChannelError::ConnectFailed {
            url: config.url.clone(),
            source,
        })?;
    debug!("channel {channel}: socket open to {}", config.url);
    let _ = events.send(SessionEvent::TransportOpened { channel }).await;

    let (mut sink, mut stream) = socket.split();

    // ── Step 2: handshake ─────────────────────────────────────────────────────
    let ids = RequestIds::new();
    let init_id = ids.next();
    send_frame(&mut sink, &ClientMessage::Init { id: init_id }).await?;
    let data = timeout(config.handshake_timeout, await_response(&mut stream, init_id))
        .await
        .map_err(|_| ChannelError::Timeout("waiting for the host's object list"))??;

    let descriptor = ObjectDescriptor::from_init_response(&data, &config.object_name)
        .map_err(ChannelError::ProtocolMismatch)?;
    let binding = HostBinding::resolve(&descriptor).map_err(ChannelError::ProtocolMismatch)?;
    let initial = binding
        .initial_state(&descriptor)
        .map_err(ChannelError::ProtocolMismatch)?;

    for signal in binding.plain_signals() {
        send_frame(
            &mut sink,
            &ClientMessage::ConnectToSignal {
                object: binding.object.clone(),
                signal,
            },
        )
        .await?;
    }
    send_frame(&mut sink, &ClientMessage::Idle).await?;

    // ── Step 3: hand the proxy to the session ─────────────────────────────────
    let cache: PropertyCache = Arc::new(Mutex::new(initial));
    let (outgoing_tx, mut outgoing_rx) = mpsc::channel(OUTGOING_CAPACITY);
    let proxy: Arc<dyn HostProxy> = Arc::new(RemoteHost::new(
        outgoing_tx,
        binding.clone(),
        ids,
        Arc::clone(&cache),
    ));
    info!("channel {channel}: host object '{}' ready", binding.object);
    let _ = events
        .send(SessionEvent::HandshakeCompleted { channel, proxy })
        .await;

    // ── Step 4: pump ──────────────────────────────────────────────────────────
    loop {
        tokio::select! {
            outgoing = outgoing_rx.recv() => match outgoing {
                Some(msg) => send_frame(&mut sink, &msg).await?,
                None => {
                    debug!("channel {channel}: proxy released, closing");
                    let _ = sink.send(WsMessage::Close(None)).await;
                    return Ok(());
                }
            },
            incoming = stream.next() => match incoming {
                Some(Ok(WsMessage::Text(text))) => {
                    handle_text(channel, &text, &binding, &cache, &mut sink, events).await?;
                }
                Some(Ok(WsMessage::Close(frame))) => {
                    debug!("channel {channel}: host sent close {frame:?}");
                    return Ok(());
                }
                Some(Ok(_)) => {}
                Some(Err(e)) => return Err(e.into()),
                None => return Ok(()),
            },
        }
    }
}

/// Reads frames until the response to request `id` arrives.
async fn await_response<S>(stream: &mut S, id: u64) -> Result<Value, ChannelError>
where
    S: Stream<Item = Result<WsMessage, WsError>> + Unpin,
{
    while let Some(frame) = stream.next().await {
        let text = match frame? {
            WsMessage::Text(text) => text,
            WsMessage::Close(_) => break,
            _ => continue,
        };
        match decode_frame(&text) {
            Ok(HostMessage::Response { id: got, data }) if got == id => return Ok(data),
            Ok(other) => debug!("ignoring {:?} frame during handshake", other.message_type()),
            Err(e) => warn!("ignoring undecodable frame during handshake: {e}"),
        }
    }
    Err(ChannelError::ClosedDuringHandshake)
}

async fn send_frame<S>(sink: &mut S, msg: &ClientMessage) -> Result<(), ChannelError>
where
    S: Sink<WsMessage, Error = WsError> + Unpin,
{
    sink.send(WsMessage::Text(encode_frame(msg))).await?;
    Ok(())
}

/// Applies one host frame received after the handshake.
async fn handle_text<S>(
    channel: ChannelId,
    text: &str,
    binding: &HostBinding,
    cache: &PropertyCache,
    sink: &mut S,
    events: &EventSender,
) -> Result<(), ChannelError>
where
    S: Sink<WsMessage, Error = WsError> + Unpin,
{
    let notifications = match decode_frame(text) {
        Ok(HostMessage::PropertyUpdate(updates)) => {
            let fired = apply_updates(binding, cache, &updates);
            send_frame(sink, &ClientMessage::Idle).await?;
            fired
        }
        Ok(HostMessage::Signal { object, signal, .. }) if object == binding.object => binding
            .notification_for_signal(signal)
            .into_iter()
            .collect(),
        Ok(HostMessage::Response { id, .. }) => {
            debug!("channel {channel}: host acknowledged request {id}");
            Vec::new()
        }
        Ok(other) => {
            debug!("channel {channel}: ignoring {:?} frame", other.message_type());
            Vec::new()
        }
        Err(e) => {
            warn!("channel {channel}: ignoring undecodable frame: {e}");
            Vec::new()
        }
    };

    if notifications.is_empty() {
        return Ok(());
    }
    let state = read_cache(cache);
    for notification in notifications {
        let _ = events.send(notification_event(channel, notification, &state)).await;
    }
    Ok(())
}

/// Applies every object update to the cache and returns the distinct
/// notifications that fired.  A malformed value is logged and skipped.
fn apply_updates(
    binding: &HostBinding,
    cache: &PropertyCache,
    updates: &[deck_core::protocol::PropertyUpdate],
) -> Vec<HostNotification> {
    let mut guard = cache.lock().unwrap_or_else(PoisonError::into_inner);
    let state: &mut HostState = &mut guard;
    let mut fired = Vec::new();
    for update in updates {
        match binding.apply_update(state, update) {
            Ok(notifications) => {
                for n in notifications {
                    if !fired.contains(&n) {
                        fired.push(n);
                    }
                }
            }
            Err(e) => warn!("ignoring malformed property update: {e}"),
        }
    }
    fired
}

fn notification_event(
    channel: ChannelId,
    notification: HostNotification,
    state: &HostState,
) -> SessionEvent {
    match notification {
        HostNotification::SessionChanged => SessionEvent::SessionChanged {
            channel,
            snapshot: state.snapshot.clone(),
        },
        HostNotification::StreamingChanged => SessionEvent::StreamingChanged {
            channel,
            streaming: state.streaming,
        },
        HostNotification::RecordingChanged => SessionEvent::RecordingChanged {
            channel,
            recording: state.recording,
        },
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
