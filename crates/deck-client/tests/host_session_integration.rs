//! Integration tests for the session against a scripted WebChannel host.
//!
//! # Purpose
//!
//! These tests run the real [`WebChannelConnector`] over a real WebSocket on
//! `127.0.0.1`.  The other end is a small fake host that speaks just enough of
//! the WebChannel protocol to exercise the client:
//!
//! ```text
//! Client                                  Fake host
//! ──────                                  ─────────
//! {"type":3,"id":0}                 ──►
//!                                   ◄──   {"type":10,"id":0,"data":{"meld":{...}}}
//! {"type":4}                        ──►
//! {"type":6,"method":11,...}        ──►   flips isStreaming
//!                                   ◄──   {"type":2,"data":[{"object":"meld",...}]}
//! {"type":4}                        ──►
//! ```
//!
//! The host can also be told to drop every open socket, which is how the
//! reconnect path is tested.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use deck_client::application::session_runtime::{SessionHandle, SessionRuntime};
use deck_client::application::session_sync::{Connector, SessionState, SyncTimings};
use deck_client::infrastructure::network::{ChannelConfig, WebChannelConnector};
use futures_util::{SinkExt, StreamExt};
use serde_json::{json, Value};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::watch;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::WebSocketStream;

const METHOD_SHOW_SCENE: u64 = 10;
const METHOD_TOGGLE_STREAM: u64 = 11;
const METHOD_TOGGLE_RECORD: u64 = 12;

/// Upper bound on any single wait; keeps a broken client from hanging CI.
const WAIT: Duration = Duration::from_secs(5);

// ── Fake host ─────────────────────────────────────────────────────────────────

/// Mutable host-side state.
#[derive(Debug, Clone)]
struct HostModel {
    current: String,
    streaming: bool,
    recording: bool,
}

impl HostModel {
    fn session(&self) -> Value {
        let scene = |name: &str, index: i64, id: &str| {
            json!({"type": "scene", "name": name, "index": index, "current": self.current == id})
        };
        json!({"items": {
            "s-intro": scene("Intro", 0, "s-intro"),
            "s-game": scene("Gameplay", 1, "s-game"),
            "t-mic": {"type": "track", "name": "Mic"}
        }})
    }

    fn descriptor(&self, with_record: bool) -> Value {
        let mut methods = vec![
            json!(["showScene", METHOD_SHOW_SCENE]),
            json!(["toggleStream", METHOD_TOGGLE_STREAM]),
        ];
        if with_record {
            methods.push(json!(["toggleRecord", METHOD_TOGGLE_RECORD]));
        }
        json!({"meld": {
            "methods": methods,
            "signals": [["destroyed", 0]],
            "properties": [
                [1, "session", ["sessionChanged", 5], self.session()],
                [2, "isStreaming", [1, 6], self.streaming],
                [3, "isRecording", [1, 7], self.recording]
            ],
            "enums": {}
        }})
    }
}

struct FakeHost {
    addr: SocketAddr,
    connections: Arc<AtomicUsize>,
    received: Arc<Mutex<Vec<Value>>>,
    /// Bumped to drop every socket accepted before the bump.
    drops: watch::Sender<u64>,
}

impl FakeHost {
    /// Starts a host on an ephemeral port.  With `with_record == false` the
    /// host omits `toggleRecord`, so the client cannot bind to it.
    async fn start(with_record: bool) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let connections = Arc::new(AtomicUsize::new(0));
        let received = Arc::new(Mutex::new(Vec::new()));
        let (drops, drop_rx) = watch::channel(0_u64);
        let model = Arc::new(Mutex::new(HostModel {
            current: "s-intro".to_string(),
            streaming: false,
            recording: true,
        }));

        let (conns, log) = (connections.clone(), received.clone());
        tokio::spawn(async move {
            while let Ok((tcp, _)) = listener.accept().await {
                conns.fetch_add(1, Ordering::SeqCst);
                // Only drops requested after this accept apply to the socket.
                let epoch = *drop_rx.borrow();
                tokio::spawn(serve(
                    tcp,
                    model.clone(),
                    log.clone(),
                    drop_rx.clone(),
                    epoch,
                    with_record,
                ));
            }
        });

        Self {
            addr,
            connections,
            received,
            drops,
        }
    }

    fn connections(&self) -> usize {
        self.connections.load(Ordering::SeqCst)
    }

    /// Frames of the given `type` the host has received.
    fn frames_of_type(&self, kind: u64) -> Vec<Value> {
        self.received
            .lock()
            .unwrap()
            .iter()
            .filter(|f| f["type"] == kind)
            .cloned()
            .collect()
    }

    /// Waits until the host has received at least `count` frames of `kind`.
    async fn wait_for_frames(&self, kind: u64, count: usize) {
        tokio::time::timeout(WAIT, async {
            while self.frames_of_type(kind).len() < count {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .expect("timed out waiting for client frames");
    }

    /// Drops every open socket without a close frame.  The request stays
    /// visible to a socket that is busy replying when it is made.
    fn drop_connections(&self) {
        self.drops.send_modify(|epoch| *epoch += 1);
    }
}

async fn serve(
    tcp: TcpStream,
    model: Arc<Mutex<HostModel>>,
    log: Arc<Mutex<Vec<Value>>>,
    mut drops: watch::Receiver<u64>,
    epoch: u64,
    with_record: bool,
) {
    let Ok(mut ws) = tokio_tungstenite::accept_async(tcp).await else {
        return;
    };
    loop {
        tokio::select! {
            _ = async { drops.wait_for(|current| *current > epoch).await.is_ok() } => return,
            frame = ws.next() => {
                let Some(Ok(Message::Text(text))) = frame else { return };
                let value: Value = serde_json::from_str(&text).unwrap();
                log.lock().unwrap().push(value.clone());
                if respond(&mut ws, &model, &value, with_record).await.is_err() {
                    return;
                }
            }
        }
    }
}

async fn respond(
    ws: &mut WebSocketStream<TcpStream>,
    model: &Mutex<HostModel>,
    frame: &Value,
    with_record: bool,
) -> Result<(), tokio_tungstenite::tungstenite::Error> {
    let reply = match frame["type"].as_u64() {
        Some(3) => {
            let data = model.lock().unwrap().descriptor(with_record);
            json!({"type": 10, "id": frame["id"], "data": data})
        }
        Some(6) => {
            let mut m = model.lock().unwrap();
            let (signal, property, value) = match frame["method"].as_u64() {
                Some(METHOD_SHOW_SCENE) => {
                    m.current = frame["args"][0].as_str().unwrap_or_default().to_string();
                    (5, 1, m.session())
                }
                Some(METHOD_TOGGLE_STREAM) => {
                    m.streaming = !m.streaming;
                    (6, 2, json!(m.streaming))
                }
                Some(METHOD_TOGGLE_RECORD) => {
                    m.recording = !m.recording;
                    (7, 3, json!(m.recording))
                }
                _ => return Ok(()),
            };
            let mut signals = serde_json::Map::new();
            signals.insert(signal.to_string(), json!([]));
            let mut properties = serde_json::Map::new();
            properties.insert(property.to_string(), value);
            json!({"type": 2, "data": [{
                "object": "meld",
                "signals": signals,
                "properties": properties
            }]})
        }
        _ => return Ok(()),
    };
    ws.send(Message::Text(reply.to_string())).await
}

// ── Client helpers ────────────────────────────────────────────────────────────

fn timings() -> SyncTimings {
    SyncTimings {
        reconnect_delay: Duration::from_millis(100),
        pending_timeout: Duration::from_secs(3),
    }
}

fn start_client(host: &FakeHost) -> SessionHandle {
    let config = ChannelConfig {
        connect_timeout: Duration::from_secs(2),
        handshake_timeout: Duration::from_secs(2),
        ..ChannelConfig::for_address("127.0.0.1", host.addr.port(), "meld")
    };
    let (runtime, handle) = SessionRuntime::new(
        move |events| Arc::new(WebChannelConnector::new(config, events)) as Arc<dyn Connector>,
        timings(),
    );
    tokio::spawn(runtime.run());
    handle
}

async fn wait_until(handle: &SessionHandle, condition: impl FnMut(&SessionState) -> bool) {
    let mut rx = handle.subscribe();
    tokio::time::timeout(WAIT, rx.wait_for(condition))
        .await
        .expect("timed out waiting for session state")
        .expect("session runtime stopped");
}

async fn connected_client(host: &FakeHost) -> SessionHandle {
    let handle = start_client(host);
    handle.connect().await.unwrap();
    wait_until(&handle, SessionState::is_connected).await;
    handle
}

// ── Tests ─────────────────────────────────────────────────────────────────────

/// After the handshake the client mirrors the host's scenes and flags, and
/// has announced itself idle.
#[tokio::test]
async fn test_connect_mirrors_host_state() {
    // Arrange
    let host = FakeHost::start(true).await;

    // Act
    let handle = connected_client(&host).await;

    // Assert
    let state = handle.state();
    let names: Vec<String> = state.scenes().into_iter().map(|s| s.name).collect();
    assert_eq!(names, vec!["Intro", "Gameplay"]);
    assert_eq!(state.current_scene().unwrap().id, "s-intro");
    assert!(!state.streaming);
    assert!(state.recording);
    assert_eq!(host.frames_of_type(3).len(), 1, "exactly one init");
    // The idle frame precedes the handshake event but the host reads it on
    // its own task.
    host.wait_for_frames(4, 1).await;
    assert!(
        host.frames_of_type(7).is_empty(),
        "notify signals need no explicit subscription"
    );
}

/// A toggle shows as pending until the host's property update confirms it.
#[tokio::test]
async fn test_toggle_stream_is_confirmed_by_host() {
    // Arrange
    let host = FakeHost::start(true).await;
    let handle = connected_client(&host).await;

    // Act
    handle.toggle_stream().await.unwrap();
    wait_until(&handle, |s| s.streaming && !s.pending_stream).await;

    // Assert
    let invokes = host.frames_of_type(6);
    assert_eq!(invokes.len(), 1);
    assert_eq!(invokes[0]["object"], "meld");
    assert_eq!(invokes[0]["method"], METHOD_TOGGLE_STREAM);
    assert_eq!(invokes[0]["args"], json!([]));
}

/// Dispatching a scene id switches the host and the mirror follows.
#[tokio::test]
async fn test_dispatch_scene_id_switches_scene() {
    // Arrange
    let host = FakeHost::start(true).await;
    let handle = connected_client(&host).await;

    // Act
    handle.dispatch("s-game").await.unwrap();
    wait_until(&handle, |s| {
        s.current_scene().map(|c| c.id).as_deref() == Some("s-game") && s.pending_scene.is_none()
    })
    .await;

    // Assert
    let invokes = host.frames_of_type(6);
    assert_eq!(invokes[0]["method"], METHOD_SHOW_SCENE);
    assert_eq!(invokes[0]["args"], json!(["s-game"]));
}

/// Unknown action ids never reach the host.
#[tokio::test]
async fn test_dispatch_unknown_id_sends_nothing() {
    let host = FakeHost::start(true).await;
    let handle = connected_client(&host).await;

    handle.dispatch("s-deleted").await.unwrap();
    handle.toggle_record().await.unwrap();
    wait_until(&handle, |s| !s.recording).await;

    let invokes = host.frames_of_type(6);
    assert_eq!(invokes.len(), 1);
    assert_eq!(invokes[0]["method"], METHOD_TOGGLE_RECORD);
}

/// When the host drops the socket the client clears its mirror and comes
/// back on a fresh channel after the reconnect delay.
#[tokio::test]
async fn test_client_reconnects_after_host_drops() {
    // Arrange
    let host = FakeHost::start(true).await;
    let handle = connected_client(&host).await;
    assert_eq!(host.connections(), 1);

    // Act
    host.drop_connections();
    // The mirror must be cleared together with the disconnect.
    wait_until(&handle, |s| !s.is_connected() && s.snapshot.is_empty()).await;
    wait_until(&handle, SessionState::is_connected).await;

    // Assert
    assert_eq!(host.connections(), 2);
    assert_eq!(handle.state().scenes().len(), 2);
}

/// Every drop is seen by the socket it targets, including one opened by an
/// earlier reconnect, and each reconnect starts from an empty mirror.
#[tokio::test]
async fn test_client_recovers_from_repeated_drops() {
    // Arrange
    let host = FakeHost::start(true).await;
    let handle = connected_client(&host).await;

    for expected in 2..=3 {
        // Act
        host.drop_connections();
        wait_until(&handle, |s| !s.is_connected() && s.snapshot.is_empty()).await;
        wait_until(&handle, SessionState::is_connected).await;

        // Assert
        assert_eq!(host.connections(), expected);
        assert_eq!(host.frames_of_type(3).len(), expected, "one init per channel");
    }
    assert_eq!(handle.state().current_scene().unwrap().id, "s-intro");
}

/// An intentional shutdown closes the channel and does not reconnect.
#[tokio::test]
async fn test_shutdown_does_not_reconnect() {
    // Arrange
    let host = FakeHost::start(true).await;
    let handle = connected_client(&host).await;

    // Act
    handle.shutdown().await.unwrap();
    wait_until(&handle, |s| !s.is_connected()).await;
    tokio::time::sleep(Duration::from_millis(400)).await;

    // Assert
    assert_eq!(host.connections(), 1);
    assert!(!handle.state().is_connected());
}

/// A host without the expected interface is never treated as connected,
/// and the client keeps retrying on its fixed delay.
#[tokio::test]
async fn test_incompatible_host_is_retried() {
    // Arrange
    let host = FakeHost::start(false).await;
    let handle = start_client(&host);

    // Act
    handle.connect().await.unwrap();
    tokio::time::timeout(WAIT, async {
        while host.connections() < 3 {
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
    })
    .await
    .expect("client should keep retrying");

    // Assert
    assert!(!handle.state().is_connected());
    assert!(host.frames_of_type(6).is_empty());
}
