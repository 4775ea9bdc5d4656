//! Broadcast envelopes and their JSON wire format.

use crate::direction::SyncDirection;
use crate::error::{ProtocolError, ProtocolResult};
use crate::peer::PeerId;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use tracing::debug;

/// A full copy of one tab's key-value mapping.
pub type Snapshot = BTreeMap<String, String>;

/// Type tag of an envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageType {
    /// Every key was removed.
    Clear,
    /// One key was removed.
    RemoveItem,
    /// One key was set.
    SetItem,
    /// A directional state exchange.
    Sync,
}

impl MessageType {
    /// Returns the wire name.
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageType::Clear => "clear",
            MessageType::RemoveItem => "removeItem",
            MessageType::SetItem => "setItem",
            MessageType::Sync => "sync",
        }
    }
}

impl FromStr for MessageType {
    type Err = ProtocolError;

    fn from_str(s: &str) -> ProtocolResult<Self> {
        match s {
            "clear" => Ok(MessageType::Clear),
            "removeItem" => Ok(MessageType::RemoveItem),
            "setItem" => Ok(MessageType::SetItem),
            "sync" => Ok(MessageType::Sync),
            other => Err(ProtocolError::UnrecognizedMessage(other.to_string())),
        }
    }
}

impl fmt::Display for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The unit carried by one broadcast notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Envelope {
    /// The sender cleared its store.
    Clear,
    /// The sender removed `key`.
    RemoveItem {
        /// Removed key.
        key: String,
    },
    /// The sender set `key` to `value`.
    SetItem {
        /// Written key.
        key: String,
        /// Written value.
        value: String,
    },
    /// A directional state exchange.
    Sync {
        /// What the sender pushes and/or asks for.
        direction: SyncDirection,
        /// The sender's state at send time.
        snapshot: Snapshot,
        /// Addressed peer, if the message is directed.
        origin: Option<PeerId>,
    },
}

/// JSON shape of an envelope on the broadcast slot.
///
/// `key` doubles as the direction slot for peers that predate the
/// dedicated `direction` field; decoding accepts either.
#[derive(Debug, Default, Serialize, Deserialize)]
struct WireEnvelope {
    message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    direction: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    value: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    guid: Option<String>,
}

impl Envelope {
    /// Creates a set-item envelope.
    pub fn set_item(key: impl Into<String>, value: impl Into<String>) -> Self {
        Envelope::SetItem {
            key: key.into(),
            value: value.into(),
        }
    }

    /// Creates a remove-item envelope.
    pub fn remove_item(key: impl Into<String>) -> Self {
        Envelope::RemoveItem { key: key.into() }
    }

    /// Creates a sync envelope.
    pub fn sync(direction: SyncDirection, snapshot: Snapshot, origin: Option<PeerId>) -> Self {
        Envelope::Sync {
            direction,
            snapshot,
            origin,
        }
    }

    /// Returns the message type.
    pub fn message_type(&self) -> MessageType {
        match self {
            Envelope::Clear => MessageType::Clear,
            Envelope::RemoveItem { .. } => MessageType::RemoveItem,
            Envelope::SetItem { .. } => MessageType::SetItem,
            Envelope::Sync { .. } => MessageType::Sync,
        }
    }

    /// Encodes to the JSON wire format.
    pub fn encode(&self) -> ProtocolResult<String> {
        let mut wire = WireEnvelope {
            message: self.message_type().as_str().to_string(),
            ..WireEnvelope::default()
        };

        match self {
            Envelope::Clear => {}
            Envelope::RemoveItem { key } => {
                wire.key = Some(key.clone());
            }
            Envelope::SetItem { key, value } => {
                wire.key = Some(key.clone());
                wire.value = Some(Value::String(value.clone()));
            }
            Envelope::Sync {
                direction,
                snapshot,
                origin,
            } => {
                wire.direction = Some(direction.as_str().to_string());
                wire.value = Some(Value::String(serde_json::to_string(snapshot)?));
                wire.guid = origin.map(|id| id.to_string());
            }
        }

        Ok(serde_json::to_string(&wire)?)
    }

    /// Decodes from the JSON wire format.
    pub fn decode(payload: &str) -> ProtocolResult<Self> {
        let wire: WireEnvelope = serde_json::from_str(payload)?;
        let message_type: MessageType = wire.message.parse()?;

        match message_type {
            MessageType::Clear => Ok(Envelope::Clear),
            MessageType::RemoveItem => Ok(Envelope::RemoveItem {
                key: require_key(message_type, wire.key)?,
            }),
            MessageType::SetItem => {
                let key = require_key(message_type, wire.key)?;
                let value = match wire.value {
                    Some(Value::String(value)) => value,
                    None | Some(Value::Null) => {
                        return Err(ProtocolError::MissingField {
                            message: message_type.as_str(),
                            field: "value",
                        })
                    }
                    Some(other) => json_text(&key, other),
                };
                Ok(Envelope::SetItem { key, value })
            }
            MessageType::Sync => {
                let direction: SyncDirection = wire
                    .direction
                    .or(wire.key)
                    .ok_or(ProtocolError::MissingField {
                        message: message_type.as_str(),
                        field: "direction",
                    })?
                    .parse()?;
                let snapshot = decode_snapshot(wire.value)?;
                let origin = wire
                    .guid
                    .map(|guid| guid.parse::<PeerId>())
                    .transpose()?;
                Ok(Envelope::Sync {
                    direction,
                    snapshot,
                    origin,
                })
            }
        }
    }
}

fn require_key(message_type: MessageType, key: Option<String>) -> ProtocolResult<String> {
    key.ok_or(ProtocolError::MissingField {
        message: message_type.as_str(),
        field: "key",
    })
}

/// Snapshots travel as a JSON string holding an object; an inline object
/// is accepted too, and an absent value is an empty snapshot.
fn decode_snapshot(value: Option<Value>) -> ProtocolResult<Snapshot> {
    match value {
        None | Some(Value::Null) => Ok(Snapshot::new()),
        Some(Value::String(text)) => parse_snapshot(&text),
        Some(Value::Object(object)) => Ok(snapshot_from_object(object)),
        Some(_) => Err(ProtocolError::InvalidField {
            field: "value",
            expected: "string or object",
        }),
    }
}

/// Parses a JSON object into a snapshot.
///
/// Values that are not strings are kept as their JSON text, so a mapping
/// written by a peer that stores numbers or booleans loses no entry.
///
/// # Errors
///
/// Returns [`ProtocolError::InvalidSnapshot`] if `text` is not a JSON object.
pub fn parse_snapshot(text: &str) -> ProtocolResult<Snapshot> {
    let object: Map<String, Value> =
        serde_json::from_str(text).map_err(|e| ProtocolError::InvalidSnapshot(e.to_string()))?;
    Ok(snapshot_from_object(object))
}

fn snapshot_from_object(object: Map<String, Value>) -> Snapshot {
    object
        .into_iter()
        .map(|(key, value)| match value {
            Value::String(text) => (key, text),
            other => {
                let text = json_text(&key, other);
                (key, text)
            }
        })
        .collect()
}

fn json_text(key: &str, value: Value) -> String {
    debug!(key, "non-string value kept as JSON text");
    value.to_string()
}
