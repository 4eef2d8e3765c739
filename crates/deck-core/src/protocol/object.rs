//! Host object descriptors and the resolved binding the client depends on.
//!
//! The `Init` response describes each published object as index tables:
//!
//! ```json
//! {
//!   "methods":    [["showScene", 12], ["toggleStream", 13], ...],
//!   "signals":    [["somethingHappened", 4], ...],
//!   "properties": [[1, "session", ["sessionChanged", 5], {"items": {...}}],
//!                  [2, "isStreaming", [1, 6], false], ...],
//!   "enums": {}
//! }
//! ```
//!
//! Notify signals are listed with their property, not in `signals`.  A notify
//! name of `1` is the protocol's shorthand for `"<property>Changed"`.
//!
//! [`HostBinding`] turns the loosely-typed descriptor into the fixed set of
//! indices this client needs, failing with [`ProtocolError::MissingMember`]
//! when the host does not speak the expected interface.

use serde::Deserialize;
use serde_json::Value;

use crate::domain::session::{HostState, SessionSnapshot};
use crate::protocol::codec::ProtocolError;
use crate::protocol::messages::PropertyUpdate;

/// Method, property, and signal names the client requires.
pub mod names {
    pub const SHOW_SCENE: &str = "showScene";
    pub const TOGGLE_STREAM: &str = "toggleStream";
    pub const TOGGLE_RECORD: &str = "toggleRecord";
    pub const SESSION: &str = "session";
    pub const IS_STREAMING: &str = "isStreaming";
    pub const IS_RECORDING: &str = "isRecording";
    pub const SESSION_CHANGED: &str = "sessionChanged";
    pub const IS_STREAMING_CHANGED: &str = "isStreamingChanged";
    pub const IS_RECORDING_CHANGED: &str = "isRecordingChanged";
}

/// One published property.
#[derive(Debug, Clone, PartialEq)]
pub struct PropertyDescriptor {
    pub index: u32,
    pub name: String,
    /// `(signal name, signal index)` of the notify signal, if the property has one.
    pub notify: Option<(String, u32)>,
    pub value: Value,
}

/// The decoded descriptor of one published object.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ObjectDescriptor {
    pub name: String,
    pub methods: Vec<(String, u32)>,
    pub signals: Vec<(String, u32)>,
    pub properties: Vec<PropertyDescriptor>,
}

#[derive(Deserialize)]
struct RawObject {
    #[serde(default)]
    methods: Vec<(String, u32)>,
    #[serde(default)]
    signals: Vec<(String, u32)>,
    #[serde(default)]
    properties: Vec<(u32, String, Value, Value)>,
}

impl ObjectDescriptor {
    /// Extracts the descriptor of `object` from the `data` of an `Init` response.
    ///
    /// # Errors
    ///
    /// - [`ProtocolError::MissingObject`] if `object` is not published.
    /// - [`ProtocolError::MalformedPayload`] if its tables have the wrong shape.
    pub fn from_init_response(data: &Value, object: &str) -> Result<Self, ProtocolError> {
        let raw = data
            .get(object)
            .ok_or_else(|| ProtocolError::MissingObject(object.to_string()))?;
        let raw = RawObject::deserialize(raw).map_err(|e| ProtocolError::MalformedPayload {
            kind: crate::protocol::messages::MessageType::Response,
            reason: format!("object '{object}': {e}"),
        })?;

        let properties = raw
            .properties
            .into_iter()
            .map(|(index, name, notify, value)| {
                let notify = parse_notify(&name, &notify);
                PropertyDescriptor {
                    index,
                    name,
                    notify,
                    value,
                }
            })
            .collect();

        Ok(Self {
            name: object.to_string(),
            methods: raw.methods,
            signals: raw.signals,
            properties,
        })
    }

    /// Index of the method called exactly `name`.
    pub fn method(&self, name: &str) -> Option<u32> {
        self.methods
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, idx)| *idx)
    }

    /// The property called `name`.
    pub fn property(&self, name: &str) -> Option<&PropertyDescriptor> {
        self.properties.iter().find(|p| p.name == name)
    }

    /// Looks up a signal by name, first among property notify signals and
    /// then among plain signals.
    pub fn signal(&self, name: &str) -> Option<SignalRef> {
        let notify = self.properties.iter().find_map(|p| match &p.notify {
            Some((n, idx)) if n == name => Some(SignalRef {
                index: *idx,
                is_notify: true,
            }),
            _ => None,
        });
        notify.or_else(|| {
            self.signals
                .iter()
                .find(|(n, _)| n == name)
                .map(|(_, idx)| SignalRef {
                    index: *idx,
                    is_notify: false,
                })
        })
    }
}

fn parse_notify(property: &str, notify: &Value) -> Option<(String, u32)> {
    let pair = notify.as_array()?;
    let index = u32::try_from(pair.get(1)?.as_u64()?).ok()?;
    let name = match pair.first()? {
        Value::String(s) => s.clone(),
        // Shorthand: the signal is called "<property>Changed".
        Value::Number(n) if n.as_u64() == Some(1) => format!("{property}Changed"),
        _ => return None,
    };
    Some((name, index))
}

/// A resolved signal index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SignalRef {
    pub index: u32,
    /// Notify signals arrive inside property updates without subscribing.
    pub is_notify: bool,
}

/// The three change notifications the host publishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostNotification {
    SessionChanged,
    StreamingChanged,
    RecordingChanged,
}

/// The fixed interface of the host object, resolved to wire indices.
#[derive(Debug, Clone, PartialEq)]
pub struct HostBinding {
    pub object: String,
    pub show_scene: u32,
    pub toggle_stream: u32,
    pub toggle_record: u32,
    pub session_property: u32,
    pub streaming_property: u32,
    pub recording_property: u32,
    pub session_changed: SignalRef,
    pub streaming_changed: SignalRef,
    pub recording_changed: SignalRef,
}

impl HostBinding {
    /// Resolves every member the client depends on.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::MissingMember`] naming the first member the
    /// host does not publish.
    pub fn resolve(desc: &ObjectDescriptor) -> Result<Self, ProtocolError> {
        let missing = |kind: &'static str, name: &str| ProtocolError::MissingMember {
            object: desc.name.clone(),
            kind,
            name: name.to_string(),
        };
        let method = |name: &str| desc.method(name).ok_or_else(|| missing("method", name));
        let property = |name: &str| {
            desc.property(name)
                .map(|p| p.index)
                .ok_or_else(|| missing("property", name))
        };
        let signal = |name: &str| desc.signal(name).ok_or_else(|| missing("signal", name));

        Ok(Self {
            object: desc.name.clone(),
            show_scene: method(names::SHOW_SCENE)?,
            toggle_stream: method(names::TOGGLE_STREAM)?,
            toggle_record: method(names::TOGGLE_RECORD)?,
            session_property: property(names::SESSION)?,
            streaming_property: property(names::IS_STREAMING)?,
            recording_property: property(names::IS_RECORDING)?,
            session_changed: signal(names::SESSION_CHANGED)?,
            streaming_changed: signal(names::IS_STREAMING_CHANGED)?,
            recording_changed: signal(names::IS_RECORDING_CHANGED)?,
        })
    }

    /// Signals that must be subscribed explicitly with `ConnectToSignal`.
    pub fn plain_signals(&self) -> Vec<u32> {
        [
            self.session_changed,
            self.streaming_changed,
            self.recording_changed,
        ]
        .into_iter()
        .filter(|s| !s.is_notify)
        .map(|s| s.index)
        .collect()
    }

    /// Maps a signal index to the notification it represents.
    pub fn notification_for_signal(&self, index: u32) -> Option<HostNotification> {
        if index == self.session_changed.index {
            Some(HostNotification::SessionChanged)
        } else if index == self.streaming_changed.index {
            Some(HostNotification::StreamingChanged)
        } else if index == self.recording_changed.index {
            Some(HostNotification::RecordingChanged)
        } else {
            None
        }
    }

    /// Reads the full host state from the descriptor's initial property values.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::MalformedProperty`] if a value has the wrong shape.
    pub fn initial_state(&self, desc: &ObjectDescriptor) -> Result<HostState, ProtocolError> {
        let mut state = HostState::default();
        for prop in &desc.properties {
            self.apply_property(&mut state, prop.index, &prop.value)?;
        }
        Ok(state)
    }

    /// Applies one property-update entry to `state` and returns the
    /// notifications it fired, in signal-index order without duplicates.
    ///
    /// Entries for other objects are ignored.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::MalformedProperty`] if a value has the wrong
    /// shape; `state` may then be partially updated.
    pub fn apply_update(
        &self,
        state: &mut HostState,
        update: &PropertyUpdate,
    ) -> Result<Vec<HostNotification>, ProtocolError> {
        if update.object != self.object {
            return Ok(Vec::new());
        }
        for (index, value) in &update.properties {
            self.apply_property(state, *index, value)?;
        }
        let mut fired = Vec::new();
        for index in update.signals.keys() {
            if let Some(n) = self.notification_for_signal(*index) {
                if !fired.contains(&n) {
                    fired.push(n);
                }
            }
        }
        Ok(fired)
    }

    fn apply_property(
        &self,
        state: &mut HostState,
        index: u32,
        value: &Value,
    ) -> Result<(), ProtocolError> {
        if index == self.session_property {
            state.snapshot = parse_session(value)?;
        } else if index == self.streaming_property {
            state.streaming = parse_flag(names::IS_STREAMING, value)?;
        } else if index == self.recording_property {
            state.recording = parse_flag(names::IS_RECORDING, value)?;
        }
        Ok(())
    }
}

/// Parses the `session` property: `{"items": {id: item, ...}}`.
///
/// A null session (no project open in the host) or one without `items`
/// yields an empty snapshot.
pub fn parse_session(value: &Value) -> Result<SessionSnapshot, ProtocolError> {
    let malformed = |reason: String| ProtocolError::MalformedProperty {
        name: names::SESSION.to_string(),
        reason,
    };
    match value {
        Value::Null => Ok(SessionSnapshot::new()),
        Value::Object(map) => match map.get("items") {
            None | Some(Value::Null) => Ok(SessionSnapshot::new()),
            Some(items) => {
                SessionSnapshot::from_items_value(items).map_err(|e| malformed(e.to_string()))
            }
        },
        other => Err(malformed(format!("expected an object, got {other}"))),
    }
}

fn parse_flag(name: &str, value: &Value) -> Result<bool, ProtocolError> {
    value
        .as_bool()
        .ok_or_else(|| ProtocolError::MalformedProperty {
            name: name.to_string(),
            reason: format!("expected a boolean, got {value}"),
        })
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::collections::BTreeMap;

    fn init_data() -> Value {
        json!({
            "meld": {
                "methods": [["showScene", 10], ["showScene(QString)", 10], ["toggleStream", 11], ["toggleRecord", 12]],
                "signals": [["destroyed", 0]],
                "properties": [
                    [1, "session", ["sessionChanged", 5], {"items": {
                        "a": {"type": "scene", "name": "Intro", "index": 0, "current": true}
                    }}],
                    [2, "isStreaming", [1, 6], false],
                    [3, "isRecording", [1, 7], true]
                ],
                "enums": {}
            }
        })
    }

    fn binding() -> (ObjectDescriptor, HostBinding) {
        let desc = ObjectDescriptor::from_init_response(&init_data(), "meld").unwrap();
        let binding = HostBinding::resolve(&desc).unwrap();
        (desc, binding)
    }

    #[test]
    fn test_resolve_finds_all_members() {
        // Arrange / Act
        let (_, b) = binding();

        // Assert
        assert_eq!(b.show_scene, 10);
        assert_eq!(b.toggle_stream, 11);
        assert_eq!(b.toggle_record, 12);
        assert_eq!(b.session_property, 1);
        assert_eq!(b.session_changed.index, 5);
        assert!(b.session_changed.is_notify);
    }

    #[test]
    fn test_shorthand_notify_name_is_expanded() {
        let (desc, b) = binding();

        assert_eq!(
            desc.property("isStreaming").unwrap().notify,
            Some(("isStreamingChanged".to_string(), 6))
        );
        assert_eq!(b.streaming_changed.index, 6);
    }

    #[test]
    fn test_out_of_range_notify_index_is_not_truncated() {
        // Arrange: 2^32 + 6 would wrap to 6 if narrowed blindly
        let mut data = init_data();
        data["meld"]["properties"][1][2] = json!([1, 4_294_967_302_u64]);

        // Act
        let desc = ObjectDescriptor::from_init_response(&data, "meld").unwrap();

        // Assert
        assert_eq!(desc.property("isStreaming").unwrap().notify, None);
        assert!(matches!(
            HostBinding::resolve(&desc),
            Err(ProtocolError::MissingMember { .. })
        ));
    }

    #[test]
    fn test_notify_signals_need_no_subscription() {
        let (_, b) = binding();
        assert!(b.plain_signals().is_empty());
    }

    #[test]
    fn test_plain_signal_is_reported_for_subscription() {
        // Arrange: sessionChanged published as a plain signal instead of a notify
        let mut data = init_data();
        data["meld"]["properties"][0][2] = json!([]);
        data["meld"]["signals"] = json!([["sessionChanged", 9]]);
        let desc = ObjectDescriptor::from_init_response(&data, "meld").unwrap();

        // Act
        let b = HostBinding::resolve(&desc).unwrap();

        // Assert
        assert_eq!(b.plain_signals(), vec![9]);
    }

    #[test]
    fn test_missing_object_is_reported() {
        let result = ObjectDescriptor::from_init_response(&init_data(), "obs");
        assert_eq!(result, Err(ProtocolError::MissingObject("obs".to_string())));
    }

    #[test]
    fn test_missing_method_is_protocol_mismatch() {
        // Arrange
        let mut data = init_data();
        data["meld"]["methods"] = json!([["showScene", 10], ["toggleStream", 11]]);
        let desc = ObjectDescriptor::from_init_response(&data, "meld").unwrap();

        // Act
        let result = HostBinding::resolve(&desc);

        // Assert
        assert_eq!(
            result,
            Err(ProtocolError::MissingMember {
                object: "meld".to_string(),
                kind: "method",
                name: "toggleRecord".to_string(),
            })
        );
    }

    #[test]
    fn test_malformed_tables_are_rejected() {
        let data = json!({"meld": {"methods": "nope"}});
        let result = ObjectDescriptor::from_init_response(&data, "meld");
        assert!(matches!(result, Err(ProtocolError::MalformedPayload { .. })));
    }

    #[test]
    fn test_initial_state_reads_property_values() {
        let (desc, b) = binding();

        let state = b.initial_state(&desc).unwrap();

        assert!(!state.streaming);
        assert!(state.recording);
        assert_eq!(state.snapshot.scenes()[0].id, "a");
    }

    #[test]
    fn test_apply_update_sets_values_and_reports_notifications() {
        // Arrange
        let (desc, b) = binding();
        let mut state = b.initial_state(&desc).unwrap();
        let update = PropertyUpdate {
            object: "meld".to_string(),
            signals: BTreeMap::from([(6, vec![]), (5, vec![])]),
            properties: BTreeMap::from([
                (2, json!(true)),
                (1, json!({"items": {}})),
            ]),
        };

        // Act
        let fired = b.apply_update(&mut state, &update).unwrap();

        // Assert
        assert!(state.streaming);
        assert!(state.snapshot.is_empty());
        assert_eq!(
            fired,
            vec![HostNotification::SessionChanged, HostNotification::StreamingChanged]
        );
    }

    #[test]
    fn test_apply_update_for_other_object_is_ignored() {
        let (desc, b) = binding();
        let mut state = b.initial_state(&desc).unwrap();
        let update = PropertyUpdate {
            object: "other".to_string(),
            signals: BTreeMap::from([(6, vec![])]),
            properties: BTreeMap::from([(2, json!(true))]),
        };

        let fired = b.apply_update(&mut state, &update).unwrap();

        assert!(fired.is_empty());
        assert!(!state.streaming);
    }

    #[test]
    fn test_parse_session_accepts_null() {
        assert!(parse_session(&Value::Null).unwrap().is_empty());
    }

    #[test]
    fn test_parse_session_rejects_non_object() {
        assert!(matches!(
            parse_session(&json!(5)),
            Err(ProtocolError::MalformedProperty { .. })
        ));
    }

    #[test]
    fn test_malformed_flag_is_rejected() {
        let (desc, b) = binding();
        let mut state = b.initial_state(&desc).unwrap();
        let update = PropertyUpdate {
            object: "meld".to_string(),
            signals: BTreeMap::new(),
            properties: BTreeMap::from([(3, json!("yes"))]),
        };

        assert!(b.apply_update(&mut state, &update).is_err());
    }
}
