//! # janus-proto
//!
//! Wire-level types for the Janus WebRTC gateway signalling protocol.
//!
//! The gateway speaks JSON text frames over a persistent, message-oriented
//! connection.  Every frame is an object whose `"janus"` field names the
//! message class; correlation and addressing ride along in reserved fields
//! (`transaction`, `session_id`, `sender`, `plugindata`).
//!
//! This crate is transport-agnostic: it knows nothing about sockets, tasks,
//! or the connection's resource tree.  It defines:
//!
//! - **`messages`** – The typed inbound message set and its envelope
//!   accessors (call identifier, session id, handle id, plugin scope).
//! - **`codec`** – Text-frame decoding into a classified message, outbound
//!   field-map encoding, and the [`codec::CodecError`] taxonomy.
//! - **`plugins`** – Per-plugin request builders and typed responses for the
//!   audiobridge, videoroom, and textroom plugins, plus the registry that
//!   maps a (plugin, action) pair to its expected response shape.

pub mod codec;
pub mod messages;
pub mod plugins;

// Re-export the most-used items at the crate root so callers can write
// `janus_proto::IncomingMessage` instead of the full path.
pub use codec::{decode_incoming, encode_request, new_request, to_field_map, CodecError, FieldMap};
pub use messages::{
    AckPayload, ComponentInfo, DetachedPayload, ErrorData, ErrorPayload, EventPayload,
    HangupPayload, IncomingMessage, InfoPayload, MediaPayload, PluginData, ResourceData,
    SlowLinkPayload, SuccessPayload, TimeoutPayload, WebrtcUpPayload,
};
