//! Session Sync Client: mirrors the host's session and drives its commands.
//!
//! [`SessionSyncClient`] is a plain synchronous state machine.  It never
//! blocks, never spawns, and never touches a socket.  Everything that happens
//! over time reaches it as a [`SessionEvent`]:
//!
//! ```text
//!            connect()                 HandshakeCompleted
//! Disconnected ───────► Connecting ─────────────────────► Connected
//!      ▲                    │                                 │
//!      └────────────────────┴──────── TransportClosed ◄───────┘
//!                 (ReconnectDue scheduled after 5 s)
//! ```
//!
//! It talks to the outside world through three seams, injected as trait
//! objects so tests can substitute recording fakes:
//!
//! - [`Connector`] opens a channel and later reports what happened to it.
//! - [`Scheduler`] delivers an event back after a delay (timers).
//! - [`HostProxy`] is the host object itself, handed over once the channel's
//!   handshake completes.
//!
//! # Channel ids
//!
//! Every connection attempt gets a fresh [`ChannelId`].  Events that carry
//! an id other than the live one belong to a channel that has already been
//! closed or abandoned and are dropped.  This keeps a slow close from an old
//! socket from tearing down a newer, healthy one.
//!
//! # Optimistic overlay
//!
//! Commands record a pending entry in a [`PendingOverlay`] before calling the
//! host, so a UI can show the button as "working" immediately.  The entry is
//! cleared by the matching host notification or by a `PendingExpired` timer
//! carrying the entry's generation, whichever comes first.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use deck_core::{Action, CommandKind, HostState, PendingOverlay, Scene, SessionSnapshot};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::application::command_router::SessionCommands;

// ── Timings ───────────────────────────────────────────────────────────────────

/// Fixed reconnect delay after a channel closes.
pub const DEFAULT_RECONNECT_DELAY: Duration = Duration::from_secs(5);

/// How long a command stays pending without host confirmation.
pub const DEFAULT_PENDING_TIMEOUT: Duration = Duration::from_secs(3);

/// Delays used by the sync client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncTimings {
    pub reconnect_delay: Duration,
    pub pending_timeout: Duration,
}

impl Default for SyncTimings {
    fn default() -> Self {
        Self {
            reconnect_delay: DEFAULT_RECONNECT_DELAY,
            pending_timeout: DEFAULT_PENDING_TIMEOUT,
        }
    }
}

// ── Seams ─────────────────────────────────────────────────────────────────────

/// Tag of one connection attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ChannelId(pub u64);

impl fmt::Display for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Errors a [`HostProxy`] invocation can report.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum HostError {
    /// The channel behind the proxy has already closed.
    #[error("host channel is closed")]
    ChannelClosed,
    /// Too many invocations are queued on the channel.
    #[error("host channel is busy")]
    Busy,
}

/// The host object's capability interface.
///
/// Invocations are fire-and-forget: the host answers through change
/// notifications, not through return values.
pub trait HostProxy: Send + Sync + fmt::Debug {
    /// Asks the host to switch to the scene with item id `id`.
    fn show_scene(&self, id: &str) -> Result<(), HostError>;
    /// Asks the host to start or stop streaming.
    fn toggle_stream(&self) -> Result<(), HostError>;
    /// Asks the host to start or stop recording.
    fn toggle_record(&self) -> Result<(), HostError>;
    /// Full pull of everything the proxy currently knows about the host.
    fn state(&self) -> HostState;
}

/// Opens channels to the host.
///
/// After `open`, the connector must report `TransportOpened`,
/// `HandshakeCompleted`, and the change notifications as they happen, and
/// must always finish with exactly one `TransportClosed` for that channel.
pub trait Connector: Send + Sync {
    fn open(&self, channel: ChannelId);
}

/// Delivers an event back to the client after a delay.
pub trait Scheduler: Send + Sync {
    fn schedule(&self, delay: Duration, event: SessionEvent);
}

// ── Events ────────────────────────────────────────────────────────────────────

/// Everything that can happen to the sync client besides direct calls.
#[derive(Debug, Clone)]
pub enum SessionEvent {
    /// The socket for `channel` is up; the handshake is in progress.
    TransportOpened { channel: ChannelId },
    /// The host object was resolved and its proxy is ready.
    HandshakeCompleted {
        channel: ChannelId,
        proxy: Arc<dyn HostProxy>,
    },
    /// The host pushed a new session snapshot.
    SessionChanged {
        channel: ChannelId,
        snapshot: SessionSnapshot,
    },
    StreamingChanged { channel: ChannelId, streaming: bool },
    RecordingChanged { channel: ChannelId, recording: bool },
    /// A transport fault.  Informational only; a `TransportClosed` follows.
    TransportError { channel: ChannelId, message: String },
    TransportClosed { channel: ChannelId },
    /// The deadline of a pending command elapsed.
    PendingExpired { kind: CommandKind, generation: u64 },
    /// The reconnect delay after `channel` closed has elapsed.
    ReconnectDue { channel: ChannelId },
}

// ── Observable state ──────────────────────────────────────────────────────────

/// Connection lifecycle of the sync client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connecting,
    Connected,
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ConnectionState::Disconnected => "disconnected",
            ConnectionState::Connecting => "connecting",
            ConnectionState::Connected => "connected",
        };
        f.write_str(s)
    }
}

/// A read-only copy of everything a UI needs, published after every change.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionState {
    pub connection: ConnectionState,
    pub snapshot: SessionSnapshot,
    pub streaming: bool,
    pub recording: bool,
    /// Target of the unconfirmed `showScene`, if any.
    pub pending_scene: Option<String>,
    pub pending_stream: bool,
    pub pending_record: bool,
}

impl SessionState {
    /// Scene list derived from the snapshot.
    pub fn scenes(&self) -> Vec<Scene> {
        self.snapshot.scenes()
    }

    pub fn current_scene(&self) -> Option<Scene> {
        self.snapshot.current_scene()
    }

    pub fn is_connected(&self) -> bool {
        self.connection == ConnectionState::Connected
    }
}

// ── Client ────────────────────────────────────────────────────────────────────

/// The session synchronisation state machine.
pub struct SessionSyncClient {
    connector: Arc<dyn Connector>,
    scheduler: Arc<dyn Scheduler>,
    timings: SyncTimings,

    state: ConnectionState,
    /// Channel whose events are currently accepted.
    live: Option<ChannelId>,
    /// Most recently allocated channel id.
    last_channel: ChannelId,
    proxy: Option<Arc<dyn HostProxy>>,

    host: HostState,
    pending: PendingOverlay,
    auto_reconnect: bool,
}

impl SessionSyncClient {
    /// Creates a disconnected client.  Call [`connect`](Self::connect) to start.
    pub fn new(
        connector: Arc<dyn Connector>,
        scheduler: Arc<dyn Scheduler>,
        timings: SyncTimings,
    ) -> Self {
        Self {
            connector,
            scheduler,
            timings,
            state: ConnectionState::Disconnected,
            live: None,
            last_channel: ChannelId(0),
            proxy: None,
            host: HostState::default(),
            pending: PendingOverlay::new(),
            auto_reconnect: true,
        }
    }

    // ── Lifecycle ─────────────────────────────────────────────────────────────

    /// Starts a new connection attempt.
    ///
    /// Only acts while `Disconnected`; re-enables auto-reconnect if an
    /// earlier [`shutdown`](Self::shutdown) disabled it.
    pub fn connect(&mut self) {
        if self.state != ConnectionState::Disconnected {
            debug!("connect ignored: already {}", self.state);
            return;
        }
        self.auto_reconnect = true;
        let channel = ChannelId(self.last_channel.0.wrapping_add(1));
        self.last_channel = channel;
        self.live = Some(channel);
        self.state = ConnectionState::Connecting;
        info!("opening host channel {channel}");
        self.connector.open(channel);
    }

    /// Disconnects on purpose: drops the proxy (closing its channel), clears
    /// the mirrored state, and suppresses auto-reconnect.
    pub fn shutdown(&mut self) {
        self.auto_reconnect = false;
        if self.live.is_some() {
            info!("shutting down host channel {}", self.last_channel);
        }
        self.reset_to_disconnected();
    }

    /// Feeds one event into the state machine.
    pub fn handle(&mut self, event: SessionEvent) {
        match event {
            SessionEvent::PendingExpired { kind, generation } => {
                if self.pending.expire(kind, generation) {
                    debug!("pending {kind:?} expired without confirmation");
                }
            }
            SessionEvent::ReconnectDue { channel } => self.on_reconnect_due(channel),
            SessionEvent::TransportOpened { channel } => {
                if self.accepts(channel) {
                    debug!("channel {channel} open, awaiting handshake");
                }
            }
            SessionEvent::HandshakeCompleted { channel, proxy } => {
                if self.accepts(channel) {
                    self.on_handshake(channel, proxy);
                }
            }
            SessionEvent::SessionChanged { channel, snapshot } => {
                if self.accepts(channel) && self.is_connected() {
                    self.host.snapshot = snapshot;
                    let current = self.host.snapshot.current_scene().map(|s| s.id);
                    if self.pending.confirm_scene(current.as_deref()) {
                        debug!("scene switch confirmed by host");
                    }
                }
            }
            SessionEvent::StreamingChanged { channel, streaming } => {
                if self.accepts(channel) && self.is_connected() {
                    self.host.streaming = streaming;
                    self.pending.confirm(CommandKind::ToggleStream);
                    info!("streaming is now {}", on_off(streaming));
                }
            }
            SessionEvent::RecordingChanged { channel, recording } => {
                if self.accepts(channel) && self.is_connected() {
                    self.host.recording = recording;
                    self.pending.confirm(CommandKind::ToggleRecord);
                    info!("recording is now {}", on_off(recording));
                }
            }
            SessionEvent::TransportError { channel, message } => {
                if self.accepts(channel) {
                    warn!("host channel {channel} error: {message}");
                }
            }
            SessionEvent::TransportClosed { channel } => {
                if self.accepts(channel) {
                    self.on_closed(channel);
                }
            }
        }
    }

    fn accepts(&self, channel: ChannelId) -> bool {
        let live = self.live == Some(channel);
        if !live {
            debug!("dropping event from stale channel {channel}");
        }
        live
    }

    fn on_handshake(&mut self, channel: ChannelId, proxy: Arc<dyn HostProxy>) {
        if self.state == ConnectionState::Connected {
            debug!("duplicate handshake on channel {channel} ignored");
            return;
        }
        self.host = proxy.state();
        self.proxy = Some(proxy);
        self.state = ConnectionState::Connected;
        info!(
            "connected to host on channel {channel} ({} scenes)",
            self.host.snapshot.scenes().len()
        );
    }

    fn on_closed(&mut self, channel: ChannelId) {
        let dropped = self.pending.len();
        self.reset_to_disconnected();
        if dropped > 0 {
            debug!("discarded {dropped} pending command(s)");
        }
        if self.auto_reconnect {
            warn!(
                "host channel {channel} closed; reconnecting in {:?}",
                self.timings.reconnect_delay
            );
            self.scheduler
                .schedule(self.timings.reconnect_delay, SessionEvent::ReconnectDue { channel });
        } else {
            info!("host channel {channel} closed");
        }
    }

    fn on_reconnect_due(&mut self, channel: ChannelId) {
        // A newer attempt (manual connect) supersedes this timer.
        if channel != self.last_channel || !self.auto_reconnect {
            debug!("reconnect timer for {channel} is stale");
            return;
        }
        self.connect();
    }

    fn reset_to_disconnected(&mut self) {
        self.live = None;
        self.proxy = None;
        self.state = ConnectionState::Disconnected;
        self.host = HostState::default();
        self.pending.clear_all();
    }

    // ── Commands ──────────────────────────────────────────────────────────────

    /// Asks the host to show scene `id`.  No-op unless connected.
    pub fn show_scene(&mut self, id: &str) {
        self.issue(Action::ShowScene(id.to_string()));
    }

    /// Asks the host to toggle streaming.  No-op unless connected.
    pub fn toggle_stream(&mut self) {
        self.issue(Action::ToggleStream);
    }

    /// Asks the host to toggle recording.  No-op unless connected.
    pub fn toggle_record(&mut self) {
        self.issue(Action::ToggleRecord);
    }

    fn issue(&mut self, action: Action) {
        let kind = CommandKind::of(&action);
        let proxy = match (&self.proxy, self.state) {
            (Some(proxy), ConnectionState::Connected) => Arc::clone(proxy),
            _ => {
                debug!("{kind:?} ignored: not connected");
                return;
            }
        };

        let generation = self.pending.begin(&action);

        let result = match &action {
            Action::ShowScene(id) => proxy.show_scene(id),
            Action::ToggleStream => proxy.toggle_stream(),
            Action::ToggleRecord => proxy.toggle_record(),
        };
        if let Err(e) = result {
            warn!("{kind:?} failed: {e}");
        }

        self.scheduler.schedule(
            self.timings.pending_timeout,
            SessionEvent::PendingExpired { kind, generation },
        );
    }

    // ── Queries ───────────────────────────────────────────────────────────────

    pub fn connection_state(&self) -> ConnectionState {
        self.state
    }

    pub fn is_connected(&self) -> bool {
        self.state == ConnectionState::Connected
    }

    /// `false` after an explicit [`shutdown`](Self::shutdown).
    pub fn auto_reconnect(&self) -> bool {
        self.auto_reconnect
    }

    pub fn snapshot(&self) -> &SessionSnapshot {
        &self.host.snapshot
    }

    /// Scenes sorted by index, derived fresh from the current snapshot.
    pub fn scenes(&self) -> Vec<Scene> {
        self.host.snapshot.scenes()
    }

    pub fn is_streaming(&self) -> bool {
        self.host.streaming
    }

    pub fn is_recording(&self) -> bool {
        self.host.recording
    }

    pub fn pending(&self) -> &PendingOverlay {
        &self.pending
    }

    /// Copies the observable state for publication.
    pub fn view(&self) -> SessionState {
        SessionState {
            connection: self.state,
            snapshot: self.host.snapshot.clone(),
            streaming: self.host.streaming,
            recording: self.host.recording,
            pending_scene: self.pending.pending_scene().map(str::to_string),
            pending_stream: self.pending.is_pending(CommandKind::ToggleStream),
            pending_record: self.pending.is_pending(CommandKind::ToggleRecord),
        }
    }
}

impl SessionCommands for SessionSyncClient {
    fn scenes(&self) -> Vec<Scene> {
        SessionSyncClient::scenes(self)
    }

    fn show_scene(&mut self, id: &str) {
        SessionSyncClient::show_scene(self, id);
    }

    fn toggle_stream(&mut self) {
        SessionSyncClient::toggle_stream(self);
    }

    fn toggle_record(&mut self) {
        SessionSyncClient::toggle_record(self);
    }
}

fn on_off(flag: bool) -> &'static str {
    if flag {
        "on"
    } else {
        "off"
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use deck_core::Item;
    use std::sync::Mutex;

    // ── Test doubles ──────────────────────────────────────────────────────────

    #[derive(Default)]
    struct RecordingConnector {
        opened: Mutex<Vec<ChannelId>>,
    }

    impl Connector for RecordingConnector {
        fn open(&self, channel: ChannelId) {
            self.opened.lock().unwrap().push(channel);
        }
    }

    #[derive(Default)]
    struct RecordingScheduler {
        scheduled: Mutex<Vec<(Duration, SessionEvent)>>,
    }

    impl RecordingScheduler {
        fn take(&self) -> Vec<(Duration, SessionEvent)> {
            std::mem::take(&mut *self.scheduled.lock().unwrap())
        }
    }

    impl Scheduler for RecordingScheduler {
        fn schedule(&self, delay: Duration, event: SessionEvent) {
            self.scheduled.lock().unwrap().push((delay, event));
        }
    }

    #[derive(Debug, Default)]
    struct FakeHost {
        state: HostState,
        calls: Mutex<Vec<String>>,
    }

    impl FakeHost {
        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    impl HostProxy for FakeHost {
        fn show_scene(&self, id: &str) -> Result<(), HostError> {
            self.calls.lock().unwrap().push(format!("showScene({id})"));
            Ok(())
        }
        fn toggle_stream(&self) -> Result<(), HostError> {
            self.calls.lock().unwrap().push("toggleStream".into());
            Ok(())
        }
        fn toggle_record(&self) -> Result<(), HostError> {
            self.calls.lock().unwrap().push("toggleRecord".into());
            Ok(())
        }
        fn state(&self) -> HostState {
            self.state.clone()
        }
    }

    struct Harness {
        connector: Arc<RecordingConnector>,
        scheduler: Arc<RecordingScheduler>,
        client: SessionSyncClient,
    }

    fn harness() -> Harness {
        let connector = Arc::new(RecordingConnector::default());
        let scheduler = Arc::new(RecordingScheduler::default());
        let client = SessionSyncClient::new(
            connector.clone(),
            scheduler.clone(),
            SyncTimings::default(),
        );
        Harness {
            connector,
            scheduler,
            client,
        }
    }

    fn snapshot(scenes: &[(&str, &str, i64, bool)]) -> SessionSnapshot {
        let mut snap = SessionSnapshot::new();
        for (id, name, index, current) in scenes {
            snap.insert(*id, Item::scene(name, *index, *current));
        }
        snap
    }

    fn host_with_scenes() -> Arc<FakeHost> {
        Arc::new(FakeHost {
            state: HostState {
                snapshot: snapshot(&[("a", "Intro", 0, true), ("b", "Game", 1, false)]),
                streaming: false,
                recording: true,
            },
            calls: Mutex::new(Vec::new()),
        })
    }

    /// Connects the harness and returns the live channel and the fake host.
    fn connected(h: &mut Harness) -> (ChannelId, Arc<FakeHost>) {
        h.client.connect();
        let channel = *h.connector.opened.lock().unwrap().last().unwrap();
        let host = host_with_scenes();
        h.client.handle(SessionEvent::TransportOpened { channel });
        h.client.handle(SessionEvent::HandshakeCompleted {
            channel,
            proxy: host.clone(),
        });
        (channel, host)
    }

    // ── Connection lifecycle ──────────────────────────────────────────────────

    #[test]
    fn test_connect_moves_to_connecting_and_opens_channel() {
        // Arrange
        let mut h = harness();

        // Act
        h.client.connect();

        // Assert
        assert_eq!(h.client.connection_state(), ConnectionState::Connecting);
        assert_eq!(*h.connector.opened.lock().unwrap(), vec![ChannelId(1)]);
    }

    #[test]
    fn test_connect_while_connecting_is_noop() {
        let mut h = harness();
        h.client.connect();

        h.client.connect();

        assert_eq!(h.connector.opened.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_handshake_performs_full_pull() {
        // Arrange
        let mut h = harness();

        // Act
        let _ = connected(&mut h);

        // Assert
        assert!(h.client.is_connected());
        assert_eq!(h.client.scenes().len(), 2);
        assert!(!h.client.is_streaming());
        assert!(h.client.is_recording());
    }

    #[test]
    fn test_close_clears_state_and_schedules_reconnect() {
        // Arrange
        let mut h = harness();
        let (channel, _host) = connected(&mut h);
        h.client.toggle_stream();
        h.scheduler.take();

        // Act
        h.client.handle(SessionEvent::TransportClosed { channel });

        // Assert
        assert_eq!(h.client.connection_state(), ConnectionState::Disconnected);
        assert!(h.client.snapshot().is_empty());
        assert!(!h.client.is_recording());
        assert!(h.client.pending().is_empty());
        let scheduled = h.scheduler.take();
        assert_eq!(scheduled.len(), 1);
        assert_eq!(scheduled[0].0, Duration::from_secs(5));
        assert!(matches!(
            scheduled[0].1,
            SessionEvent::ReconnectDue { channel: c } if c == channel
        ));
    }

    #[test]
    fn test_consecutive_closes_each_schedule_one_reconnect() {
        // Arrange
        let mut h = harness();
        let rounds = 4;
        let mut reconnects = 0;

        // Act: open, fail, wait, repeat
        h.client.connect();
        for _ in 0..rounds {
            let channel = *h.connector.opened.lock().unwrap().last().unwrap();
            h.client.handle(SessionEvent::TransportError {
                channel,
                message: "refused".into(),
            });
            h.client.handle(SessionEvent::TransportClosed { channel });
            for (delay, event) in h.scheduler.take() {
                assert_eq!(delay, Duration::from_secs(5));
                reconnects += 1;
                h.client.handle(event);
            }
        }

        // Assert
        assert_eq!(reconnects, rounds);
        assert_eq!(h.connector.opened.lock().unwrap().len(), rounds + 1);
    }

    #[test]
    fn test_events_from_stale_channel_are_ignored() {
        // Arrange: channel 1 closes, channel 2 connects
        let mut h = harness();
        let (old, _) = connected(&mut h);
        h.client.handle(SessionEvent::TransportClosed { channel: old });
        let _ = connected(&mut h);

        // Act: a late notification and a late close from channel 1
        h.client.handle(SessionEvent::StreamingChanged {
            channel: old,
            streaming: true,
        });
        h.client.handle(SessionEvent::TransportClosed { channel: old });

        // Assert
        assert!(h.client.is_connected());
        assert!(!h.client.is_streaming());
    }

    #[test]
    fn test_shutdown_suppresses_reconnect() {
        // Arrange
        let mut h = harness();
        let (channel, _) = connected(&mut h);

        // Act
        h.client.shutdown();
        h.client.handle(SessionEvent::TransportClosed { channel });

        // Assert
        assert_eq!(h.client.connection_state(), ConnectionState::Disconnected);
        assert!(!h.client.auto_reconnect());
        assert!(h.scheduler.take().is_empty());
    }

    #[test]
    fn test_stale_reconnect_timer_does_not_open_second_channel() {
        // Arrange: close schedules a reconnect, user reconnects manually first
        let mut h = harness();
        let (channel, _) = connected(&mut h);
        h.client.handle(SessionEvent::TransportClosed { channel });
        let due = h.scheduler.take().remove(0).1;
        h.client.connect();

        // Act
        h.client.handle(due);

        // Assert
        assert_eq!(h.connector.opened.lock().unwrap().len(), 2);
    }

    // ── Commands and overlay ──────────────────────────────────────────────────

    #[test]
    fn test_show_scene_when_disconnected_does_nothing() {
        // Arrange
        let mut h = harness();
        let before = h.client.view();

        // Act
        h.client.show_scene("a");

        // Assert
        assert_eq!(h.client.view(), before);
        assert!(h.scheduler.take().is_empty());
    }

    #[test]
    fn test_show_scene_while_connecting_makes_no_proxy_call() {
        let mut h = harness();
        h.client.connect();

        h.client.toggle_stream();

        assert!(h.client.pending().is_empty());
    }

    #[test]
    fn test_command_records_pending_and_schedules_expiry() {
        // Arrange
        let mut h = harness();
        let (_, host) = connected(&mut h);

        // Act
        h.client.show_scene("b");

        // Assert
        assert_eq!(host.calls(), vec!["showScene(b)"]);
        assert_eq!(h.client.view().pending_scene.as_deref(), Some("b"));
        let scheduled = h.scheduler.take();
        assert_eq!(scheduled[0].0, Duration::from_secs(3));
        assert!(matches!(
            scheduled[0].1,
            SessionEvent::PendingExpired {
                kind: CommandKind::ShowScene,
                ..
            }
        ));
    }

    #[test]
    fn test_confirmation_clears_pending_and_later_expiry_is_noop() {
        // Arrange
        let mut h = harness();
        let (channel, _) = connected(&mut h);
        h.client.toggle_stream();
        let expiry = h.scheduler.take().remove(0).1;

        // Act
        h.client.handle(SessionEvent::StreamingChanged {
            channel,
            streaming: true,
        });
        let after_confirm = h.client.view();
        h.client.handle(expiry);

        // Assert
        assert!(!after_confirm.pending_stream);
        assert!(after_confirm.streaming);
        assert_eq!(h.client.view(), after_confirm);
    }

    #[test]
    fn test_unconfirmed_command_expires_after_deadline() {
        let mut h = harness();
        let _ = connected(&mut h);
        h.client.toggle_record();
        let expiry = h.scheduler.take().remove(0).1;

        h.client.handle(expiry);

        assert!(!h.client.view().pending_record);
    }

    #[test]
    fn test_scene_confirmation_requires_target_to_be_current() {
        // Arrange
        let mut h = harness();
        let (channel, _) = connected(&mut h);
        h.client.show_scene("b");

        // Act: a push that does not make "b" current
        h.client.handle(SessionEvent::SessionChanged {
            channel,
            snapshot: snapshot(&[("a", "Intro", 0, true), ("b", "Game", 1, false)]),
        });
        let still_pending = h.client.view().pending_scene;
        h.client.handle(SessionEvent::SessionChanged {
            channel,
            snapshot: snapshot(&[("a", "Intro", 0, false), ("b", "Game", 1, true)]),
        });

        // Assert
        assert_eq!(still_pending.as_deref(), Some("b"));
        assert_eq!(h.client.view().pending_scene, None);
        assert_eq!(h.client.view().current_scene().unwrap().id, "b");
    }

    #[test]
    fn test_expiry_from_before_reconnect_does_not_clear_new_entry() {
        // Arrange: pending toggle, then the channel drops and comes back
        let mut h = harness();
        let (channel, _) = connected(&mut h);
        h.client.toggle_stream();
        let old_expiry = h.scheduler.take().remove(0).1;
        h.client.handle(SessionEvent::TransportClosed { channel });
        h.scheduler.take();
        let _ = connected(&mut h);
        h.client.toggle_stream();

        // Act
        h.client.handle(old_expiry);

        // Assert
        assert!(h.client.view().pending_stream);
    }

    #[test]
    fn test_scenes_follow_every_snapshot_replacement() {
        // Arrange
        let mut h = harness();
        let (channel, _) = connected(&mut h);

        // Act
        h.client.handle(SessionEvent::SessionChanged {
            channel,
            snapshot: snapshot(&[("z", "Last", 9, false), ("y", "First", -1, true)]),
        });

        // Assert
        let ids: Vec<String> = h.client.scenes().into_iter().map(|s| s.id).collect();
        assert_eq!(ids, vec!["y", "z"]);
        assert_eq!(
            h.client.scenes().iter().filter(|s| s.current).count(),
            1
        );
    }
}
