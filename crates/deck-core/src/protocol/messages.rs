//! WebChannel protocol message types.
//!
//! The host exposes a remote object over a WebSocket using the WebChannel
//! protocol.  Every frame is a JSON object with an integer `"type"` field.
//!
//! # Message flow
//!
//! ```text
//! Client → Host:  {"type":3,"id":0}                       init
//! Host → Client:  {"type":10,"id":0,"data":{...}}         object descriptors
//! Client → Host:  {"type":4}                              idle
//! Host → Client:  {"type":2,"data":[{...}]}               property update
//! Client → Host:  {"type":4}                              idle (ack)
//! Client → Host:  {"type":6,"object":"meld","method":7,"args":["id"],"id":1}
//! ```
//!
//! Client and host messages are separate enums so that it is a compile-time
//! error to try to send a host-only message.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

// ── Message type codes ────────────────────────────────────────────────────────

/// All message type codes defined by the WebChannel protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum MessageType {
    Signal = 1,
    PropertyUpdate = 2,
    Init = 3,
    Idle = 4,
    Debug = 5,
    InvokeMethod = 6,
    ConnectToSignal = 7,
    DisconnectFromSignal = 8,
    SetProperty = 9,
    Response = 10,
}

impl TryFrom<u64> for MessageType {
    type Error = ();

    fn try_from(value: u64) -> Result<Self, ()> {
        match value {
            1 => Ok(MessageType::Signal),
            2 => Ok(MessageType::PropertyUpdate),
            3 => Ok(MessageType::Init),
            4 => Ok(MessageType::Idle),
            5 => Ok(MessageType::Debug),
            6 => Ok(MessageType::InvokeMethod),
            7 => Ok(MessageType::ConnectToSignal),
            8 => Ok(MessageType::DisconnectFromSignal),
            9 => Ok(MessageType::SetProperty),
            10 => Ok(MessageType::Response),
            _ => Err(()),
        }
    }
}

// ── Client → Host ─────────────────────────────────────────────────────────────

/// Frames the client sends to the host.
#[derive(Debug, Clone, PartialEq)]
pub enum ClientMessage {
    /// Requests the descriptors of every published object.  Always the first
    /// frame on a new channel.
    Init { id: u64 },
    /// Tells the host the client has processed everything so far and is ready
    /// for the next batch of property updates.
    Idle,
    /// Calls a method on a published object.
    InvokeMethod {
        object: String,
        method: u32,
        args: Vec<Value>,
        id: u64,
    },
    /// Subscribes to a signal that is not a property notify signal (notify
    /// signals are always delivered inside property updates).
    ConnectToSignal { object: String, signal: u32 },
}

impl ClientMessage {
    /// The wire type code of this frame.
    pub fn message_type(&self) -> MessageType {
        match self {
            ClientMessage::Init { .. } => MessageType::Init,
            ClientMessage::Idle => MessageType::Idle,
            ClientMessage::InvokeMethod { .. } => MessageType::InvokeMethod,
            ClientMessage::ConnectToSignal { .. } => MessageType::ConnectToSignal,
        }
    }
}

// ── Host → Client ─────────────────────────────────────────────────────────────

/// One object's share of a property-update frame.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PropertyUpdate {
    pub object: String,
    /// Signal index → signal arguments, for every notify signal that fired.
    #[serde(default)]
    pub signals: BTreeMap<u32, Vec<Value>>,
    /// Property index → new value.
    #[serde(default)]
    pub properties: BTreeMap<u32, Value>,
}

/// Frames the client receives from the host.
#[derive(Debug, Clone, PartialEq)]
pub enum HostMessage {
    /// A subscribed (non-notify) signal fired.
    Signal {
        object: String,
        signal: u32,
        args: Vec<Value>,
    },
    /// One or more properties changed.  The client must answer with `Idle`.
    PropertyUpdate(Vec<PropertyUpdate>),
    /// Reply to `Init` or `InvokeMethod`.
    Response { id: u64, data: Value },
    /// A valid frame the client has no use for (e.g. `Debug`).
    Ignored(MessageType),
}

impl HostMessage {
    /// The wire type code of this frame.
    pub fn message_type(&self) -> MessageType {
        match self {
            HostMessage::Signal { .. } => MessageType::Signal,
            HostMessage::PropertyUpdate(_) => MessageType::PropertyUpdate,
            HostMessage::Response { .. } => MessageType::Response,
            HostMessage::Ignored(t) => *t,
        }
    }
}
