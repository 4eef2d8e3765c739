//! Session runtime: the single task that owns the [`SessionSyncClient`].
//!
//! # Why one task? (for beginners)
//!
//! The sync client is plain mutable state.  Instead of wrapping it in a
//! `Mutex` and sharing it, exactly one Tokio task owns it.  Everyone else
//! talks to that task through channels:
//!
//! ```text
//! SessionHandle ──requests──► ┌────────────────┐ ──watch──► UI / console
//! transport task ──events───► │ SessionRuntime │
//! timer tasks ─────events───► └────────────────┘
//! ```
//!
//! `tokio::select!` takes whichever input is ready first, applies it to the
//! client, and then publishes a fresh [`SessionState`] on a `watch` channel.
//! Reactions therefore never interleave, and readers always see a complete
//! state, never a half-applied one.

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::sync::{mpsc, watch};
use tracing::{debug, info};

use crate::application::command_router::CommandRouter;
use crate::application::session_sync::{
    Connector, Scheduler, SessionEvent, SessionState, SessionSyncClient, SyncTimings,
};

/// Capacity of the request and event queues.
const QUEUE_CAPACITY: usize = 128;

/// Sender half used by connectors and timers to post [`SessionEvent`]s.
pub type EventSender = mpsc::Sender<SessionEvent>;

/// Returned by [`SessionHandle`] once the runtime task has stopped.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[error("session runtime has stopped")]
pub struct RuntimeStopped;

/// Requests a [`SessionHandle`] can make.
#[derive(Debug, Clone, PartialEq, Eq)]
enum SessionRequest {
    Connect,
    ShowScene(String),
    ToggleStream,
    ToggleRecord,
    Dispatch(String),
    Shutdown,
}

// ── Scheduler ─────────────────────────────────────────────────────────────────

/// [`Scheduler`] backed by `tokio::time::sleep`.
///
/// Each scheduled event gets its own short-lived task.  Timers are never
/// cancelled; the client ignores the ones that became stale.
#[derive(Debug, Clone)]
pub struct TokioScheduler {
    events: EventSender,
}

impl TokioScheduler {
    pub fn new(events: EventSender) -> Self {
        Self { events }
    }
}

impl Scheduler for TokioScheduler {
    fn schedule(&self, delay: Duration, event: SessionEvent) {
        let events = self.events.clone();
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            // The runtime is gone only during shutdown.
            let _ = events.send(event).await;
        });
    }
}

// ── Runtime ───────────────────────────────────────────────────────────────────

/// Owns the sync client and serialises every input to it.
pub struct SessionRuntime {
    client: SessionSyncClient,
    events: mpsc::Receiver<SessionEvent>,
    requests: mpsc::Receiver<SessionRequest>,
    state: watch::Sender<SessionState>,
}

impl SessionRuntime {
    /// Builds the runtime and its handle.
    ///
    /// `make_connector` receives the event sender the connector must report
    /// on.  Nothing happens until [`run`](Self::run) is spawned and
    /// [`SessionHandle::connect`] is called.
    pub fn new<F>(make_connector: F, timings: SyncTimings) -> (Self, SessionHandle)
    where
        F: FnOnce(EventSender) -> Arc<dyn Connector>,
    {
        let (event_tx, event_rx) = mpsc::channel(QUEUE_CAPACITY);
        let (request_tx, request_rx) = mpsc::channel(QUEUE_CAPACITY);

        let connector = make_connector(event_tx.clone());
        let scheduler: Arc<dyn Scheduler> = Arc::new(TokioScheduler::new(event_tx));
        let client = SessionSyncClient::new(connector, scheduler, timings);

        let (state_tx, state_rx) = watch::channel(client.view());
        let runtime = Self {
            client,
            events: event_rx,
            requests: request_rx,
            state: state_tx,
        };
        let handle = SessionHandle {
            requests: request_tx,
            state: state_rx,
        };
        (runtime, handle)
    }

    /// Runs until every [`SessionHandle`] has been dropped.
    pub async fn run(mut self) {
        info!("session runtime started");
        loop {
            tokio::select! {
                Some(event) = self.events.recv() => self.client.handle(event),
                request = self.requests.recv() => match request {
                    Some(request) => self.apply(request),
                    None => break,
                },
            }
            self.publish();
        }
        self.client.shutdown();
        self.publish();
        info!("session runtime stopped");
    }

    fn apply(&mut self, request: SessionRequest) {
        debug!("session request: {request:?}");
        match request {
            SessionRequest::Connect => self.client.connect(),
            SessionRequest::ShowScene(id) => self.client.show_scene(&id),
            SessionRequest::ToggleStream => self.client.toggle_stream(),
            SessionRequest::ToggleRecord => self.client.toggle_record(),
            SessionRequest::Dispatch(action_id) => {
                CommandRouter::dispatch(&mut self.client, &action_id);
            }
            SessionRequest::Shutdown => self.client.shutdown(),
        }
    }

    fn publish(&self) {
        let next = self.client.view();
        self.state.send_if_modified(|current| {
            if *current == next {
                false
            } else {
                *current = next;
                true
            }
        });
    }
}

// ── Handle ────────────────────────────────────────────────────────────────────

/// Cheap, cloneable access to a running [`SessionRuntime`].
#[derive(Debug, Clone)]
pub struct SessionHandle {
    requests: mpsc::Sender<SessionRequest>,
    state: watch::Receiver<SessionState>,
}

impl SessionHandle {
    async fn send(&self, request: SessionRequest) -> Result<(), RuntimeStopped> {
        self.requests.send(request).await.map_err(|_| RuntimeStopped)
    }

    /// Starts connecting (and re-enables auto-reconnect).
    pub async fn connect(&self) -> Result<(), RuntimeStopped> {
        self.send(SessionRequest::Connect).await
    }

    pub async fn show_scene(&self, id: &str) -> Result<(), RuntimeStopped> {
        self.send(SessionRequest::ShowScene(id.to_string())).await
    }

    pub async fn toggle_stream(&self) -> Result<(), RuntimeStopped> {
        self.send(SessionRequest::ToggleStream).await
    }

    pub async fn toggle_record(&self) -> Result<(), RuntimeStopped> {
        self.send(SessionRequest::ToggleRecord).await
    }

    /// Routes `action_id` through the Command Router.
    pub async fn dispatch(&self, action_id: &str) -> Result<(), RuntimeStopped> {
        self.send(SessionRequest::Dispatch(action_id.to_string()))
            .await
    }

    /// Disconnects on purpose; no reconnect follows.
    pub async fn shutdown(&self) -> Result<(), RuntimeStopped> {
        self.send(SessionRequest::Shutdown).await
    }

    /// The most recently published state.
    pub fn state(&self) -> SessionState {
        self.state.borrow().clone()
    }

    /// A receiver that wakes on every state change.
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state.clone()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
