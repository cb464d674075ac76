//! Text-frame codec for the gateway signalling protocol.
//!
//! Wire format: each frame is one complete JSON object sent as a single text
//! message on the persistent connection.  There is no length prefix or
//! framing layer here — the transport is message-oriented, so one inbound
//! text frame always carries exactly one object.
//!
//! Inbound, [`decode_incoming`] classifies the frame by its `"janus"` field
//! into an [`IncomingMessage`].  Outbound, requests are plain field maps
//! ([`FieldMap`]) assembled by the caller and serialized by
//! [`encode_request`]; the reserved fields (`janus`, `transaction`,
//! `session_id`, `handle_id`, authentication) are merged in by the layers
//! that own them.

use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

use crate::messages::IncomingMessage;

/// Outbound requests are built up as ordinary JSON object maps.
pub type FieldMap = serde_json::Map<String, Value>;

/// Message classes this codec understands.
///
/// Used to tell an unknown `"janus"` discriminant apart from a known class
/// whose body failed to parse.
const KNOWN_CLASSES: &[&str] = &[
    "server_info",
    "success",
    "error",
    "ack",
    "event",
    "webrtcup",
    "media",
    "hangup",
    "slowlink",
    "detached",
    "timeout",
];

/// Errors that can occur while encoding or decoding frames.
#[derive(Debug, Error)]
pub enum CodecError {
    /// The frame is not valid JSON, or a known class failed to parse.
    #[error("malformed frame: {0}")]
    Malformed(#[from] serde_json::Error),

    /// The frame's `"janus"` field names a class this codec does not know.
    #[error("unknown message class: {0:?}")]
    UnknownClass(String),

    /// The frame has no `"janus"` field at all.
    #[error("frame carries no message class tag")]
    MissingClassTag,

    /// A value that must encode as a JSON object encoded as something else.
    #[error("expected a JSON object, got {0}")]
    NotAnObject(&'static str),

    /// No response shape is registered for this (plugin, action) pair.
    #[error("no response shape registered for plugin {plugin:?} action {action:?}")]
    UnknownResponseShape { plugin: String, action: String },
}

// ── Inbound ───────────────────────────────────────────────────────────────────

/// Decodes one inbound text frame into a classified [`IncomingMessage`].
///
/// # Errors
///
/// - [`CodecError::Malformed`] when the text is not valid JSON or a known
///   class carries an ill-typed body.
/// - [`CodecError::UnknownClass`] when the `"janus"` field names a class
///   outside the known set.
/// - [`CodecError::MissingClassTag`] when the `"janus"` field is absent.
///
/// # Examples
///
/// ```rust
/// use janus_proto::{decode_incoming, IncomingMessage};
///
/// let msg = decode_incoming(r#"{"janus":"ack","transaction":"t","session_id":1}"#).unwrap();
/// assert!(matches!(msg, IncomingMessage::Ack(_)));
/// ```
pub fn decode_incoming(text: &str) -> Result<IncomingMessage, CodecError> {
    match serde_json::from_str::<IncomingMessage>(text) {
        Ok(msg) => Ok(msg),
        Err(err) => {
            // Re-parse as a bare value to produce a more precise error: an
            // unknown class tag is routine (newer gateway), malformed JSON
            // is not.
            let Ok(value) = serde_json::from_str::<Value>(text) else {
                return Err(CodecError::Malformed(err));
            };
            match value.get("janus").and_then(Value::as_str) {
                Some(class) if !KNOWN_CLASSES.contains(&class) => {
                    Err(CodecError::UnknownClass(class.to_string()))
                }
                Some(_) => Err(CodecError::Malformed(err)),
                None => Err(CodecError::MissingClassTag),
            }
        }
    }
}

// ── Outbound ──────────────────────────────────────────────────────────────────

/// Starts an outbound request map for `method`.
///
/// The caller merges in scope ids, authentication, and body fields before
/// handing the map to [`encode_request`].
pub fn new_request(method: &str) -> FieldMap {
    let mut fields = FieldMap::new();
    fields.insert("janus".to_string(), Value::String(method.to_string()));
    fields
}

/// Serializes an outbound field map into the text to write on the wire.
///
/// # Errors
///
/// Returns [`CodecError::Malformed`] if a field value fails to serialize
/// (e.g. a non-string key map smuggled in through a `Value`).
pub fn encode_request(fields: &FieldMap) -> Result<String, CodecError> {
    Ok(serde_json::to_string(fields)?)
}

/// Converts any serializable value into a [`FieldMap`].
///
/// Room descriptors and plugin commands are plain structs; this turns them
/// into the field/value records that get merged into a request body.
///
/// # Errors
///
/// Returns [`CodecError::NotAnObject`] if the value serializes to something
/// other than a JSON object.
pub fn to_field_map<T: Serialize>(value: &T) -> Result<FieldMap, CodecError> {
    match serde_json::to_value(value)? {
        Value::Object(map) => Ok(map),
        Value::Null => Err(CodecError::NotAnObject("null")),
        Value::Bool(_) => Err(CodecError::NotAnObject("a boolean")),
        Value::Number(_) => Err(CodecError::NotAnObject("a number")),
        Value::String(_) => Err(CodecError::NotAnObject("a string")),
        Value::Array(_) => Err(CodecError::NotAnObject("an array")),
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
