//! JSON frame codec for the WebChannel protocol.
//!
//! Wire format: one WebSocket text frame carries exactly one JSON object whose
//! integer `"type"` field selects the message kind (see
//! [`MessageType`](crate::protocol::messages::MessageType)).

use serde::Deserialize;
use serde_json::{json, Value};
use thiserror::Error;

use crate::protocol::messages::{ClientMessage, HostMessage, MessageType, PropertyUpdate};

/// Errors that can occur while encoding, decoding, or interpreting frames.
#[derive(Debug, Error, PartialEq)]
pub enum ProtocolError {
    /// The frame is not valid JSON.
    #[error("invalid JSON frame: {0}")]
    InvalidJson(String),

    /// The frame has no integer `"type"` field.
    #[error("frame has no message type")]
    MissingType,

    /// The `"type"` field is not a known WebChannel message type.
    #[error("unknown message type: {0}")]
    UnknownMessageType(u64),

    /// The frame's fields do not match its declared type.
    #[error("malformed {kind:?} payload: {reason}")]
    MalformedPayload { kind: MessageType, reason: String },

    /// The host did not publish the expected object.
    #[error("host did not publish object '{0}'")]
    MissingObject(String),

    /// The published object lacks a method, property, or signal the client
    /// depends on.
    #[error("host object '{object}' has no {kind} named '{name}'")]
    MissingMember {
        object: String,
        kind: &'static str,
        name: String,
    },

    /// A property value has an unexpected shape.
    #[error("property '{name}' has an unexpected value: {reason}")]
    MalformedProperty { name: String, reason: String },
}

/// Encodes a client message into a JSON text frame.
pub fn encode_frame(msg: &ClientMessage) -> String {
    let code = msg.message_type() as u8;
    let value = match msg {
        ClientMessage::Init { id } => json!({ "type": code, "id": id }),
        ClientMessage::Idle => json!({ "type": code }),
        ClientMessage::InvokeMethod {
            object,
            method,
            args,
            id,
        } => json!({
            "type": code,
            "object": object,
            "method": method,
            "args": args,
            "id": id,
        }),
        ClientMessage::ConnectToSignal { object, signal } => json!({
            "type": code,
            "object": object,
            "signal": signal,
        }),
    };
    value.to_string()
}

/// Decodes one JSON text frame received from the host.
///
/// # Errors
///
/// - [`ProtocolError::InvalidJson`] if the text is not JSON.
/// - [`ProtocolError::MissingType`] if there is no integer `"type"` field.
/// - [`ProtocolError::UnknownMessageType`] for codes outside 1–10.
/// - [`ProtocolError::MalformedPayload`] if the fields do not fit the type.
pub fn decode_frame(text: &str) -> Result<HostMessage, ProtocolError> {
    let value: Value =
        serde_json::from_str(text).map_err(|e| ProtocolError::InvalidJson(e.to_string()))?;

    let code = value
        .get("type")
        .and_then(Value::as_u64)
        .ok_or(ProtocolError::MissingType)?;
    let kind = MessageType::try_from(code).map_err(|()| ProtocolError::UnknownMessageType(code))?;

    match kind {
        MessageType::Signal => {
            let frame: SignalFrame = parse_payload(kind, value)?;
            Ok(HostMessage::Signal {
                object: frame.object,
                signal: frame.signal,
                args: frame.args,
            })
        }
        MessageType::PropertyUpdate => {
            let frame: PropertyUpdateFrame = parse_payload(kind, value)?;
            Ok(HostMessage::PropertyUpdate(frame.data))
        }
        MessageType::Response => {
            let frame: ResponseFrame = parse_payload(kind, value)?;
            Ok(HostMessage::Response {
                id: frame.id,
                data: frame.data,
            })
        }
        other => Ok(HostMessage::Ignored(other)),
    }
}

// ── Payload shapes ────────────────────────────────────────────────────────────

#[derive(Deserialize)]
struct SignalFrame {
    object: String,
    signal: u32,
    #[serde(default)]
    args: Vec<Value>,
}

#[derive(Deserialize)]
struct PropertyUpdateFrame {
    data: Vec<PropertyUpdate>,
}

#[derive(Deserialize)]
struct ResponseFrame {
    id: u64,
    #[serde(default)]
    data: Value,
}

fn parse_payload<T: for<'de> Deserialize<'de>>(
    kind: MessageType,
    value: Value,
) -> Result<T, ProtocolError> {
    serde_json::from_value(value).map_err(|e| ProtocolError::MalformedPayload {
        kind,
        reason: e.to_string(),
    })
}

// ── Tests ─────────────────────────────────────────────────────────────────────
