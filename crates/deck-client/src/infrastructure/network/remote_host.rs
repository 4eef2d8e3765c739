//! [`RemoteHost`]: the [`HostProxy`] handed to the session once a channel's
//! handshake completes.
//!
//! Invocations are encoded as `InvokeMethod` frames and queued to the channel
//! task, which owns the socket.  The proxy also shares the channel task's
//! property cache, so [`HostProxy::state`] is a full pull of the latest values
//! the host pushed.
//!
//! Dropping the last clone drops the queue's sender.  The channel task sees
//! the queue close, sends a close frame, and exits.

use std::sync::{Arc, Mutex, PoisonError};

use deck_core::protocol::RequestIds;
use deck_core::{ClientMessage, HostBinding, HostState};
use serde_json::Value;
use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::trace;

use crate::application::session_sync::{HostError, HostProxy};

/// Property values last pushed by the host, shared with the channel task.
pub type PropertyCache = Arc<Mutex<HostState>>;

/// Reads the cache.  The cache is replaced field by field, so a poisoned lock
/// still holds consistent values.
pub(crate) fn read_cache(cache: &PropertyCache) -> HostState {
    cache.lock().unwrap_or_else(PoisonError::into_inner).clone()
}

/// Capability proxy for the host object on one channel.
#[derive(Debug)]
pub struct RemoteHost {
    outgoing: mpsc::Sender<ClientMessage>,
    binding: HostBinding,
    ids: RequestIds,
    cache: PropertyCache,
}

impl RemoteHost {
    pub fn new(
        outgoing: mpsc::Sender<ClientMessage>,
        binding: HostBinding,
        ids: RequestIds,
        cache: PropertyCache,
    ) -> Self {
        Self {
            outgoing,
            binding,
            ids,
            cache,
        }
    }

    fn invoke(&self, method: u32, args: Vec<Value>) -> Result<(), HostError> {
        let msg = ClientMessage::InvokeMethod {
            object: self.binding.object.clone(),
            method,
            args,
            id: self.ids.next(),
        };
        trace!("queueing {msg:?}");
        self.outgoing.try_send(msg).map_err(|e| match e {
            TrySendError::Closed(_) => HostError::ChannelClosed,
            TrySendError::Full(_) => HostError::Busy,
        })
    }
}

impl HostProxy for RemoteHost {
    fn show_scene(&self, id: &str) -> Result<(), HostError> {
        self.invoke(self.binding.show_scene, vec![Value::from(id)])
    }

    fn toggle_stream(&self) -> Result<(), HostError> {
        self.invoke(self.binding.toggle_stream, Vec::new())
    }

    fn toggle_record(&self) -> Result<(), HostError> {
        self.invoke(self.binding.toggle_record, Vec::new())
    }

    fn state(&self) -> HostState {
        read_cache(&self.cache)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
