//! Typed inbound message set for the gateway signalling protocol.
//!
//! Every frame the gateway sends is a JSON object whose `"janus"` field names
//! the message class.  Serde's internally-tagged enum representation decodes
//! that directly into [`IncomingMessage`]:
//!
//! ```json
//! {"janus":"success","transaction":"0190…","data":{"id":1}}
//! {"janus":"ack","transaction":"0190…","session_id":1}
//! {"janus":"event","session_id":1,"sender":5,"plugindata":{"plugin":"janus.plugin.videoroom","data":{}}}
//! ```
//!
//! # Envelope vs. payload
//!
//! The dispatcher only cares about four envelope fields — call identifier
//! (`transaction`), session id, handle id (`sender`), and the plugin-scope
//! name inside `plugindata`.  Those are exposed uniformly through accessor
//! methods on [`IncomingMessage`] so routing code never has to match on the
//! payload variant it is about to deliver.
//!
//! # Message classes
//!
//! | Class        | Meaning                                                |
//! |--------------|--------------------------------------------------------|
//! | `server_info`| Reply to an `info` request                             |
//! | `success`    | Synchronous success (may carry a new resource id)      |
//! | `error`      | The gateway rejected a request                         |
//! | `ack`        | Immediate acknowledgement; a real answer may follow    |
//! | `event`      | Asynchronous outcome of a plugin message               |
//! | `webrtcup`   | PeerConnection is up (push, per handle)                |
//! | `media`      | Media started/stopped flowing (push, per handle)       |
//! | `hangup`     | PeerConnection closed (push, per handle)               |
//! | `slowlink`   | Too many NACKs in the last second (push, per handle)   |
//! | `detached`   | The plugin detached the handle (push, per handle)      |
//! | `timeout`    | The session timed out (push, per session)              |

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

// ── Shared blocks ─────────────────────────────────────────────────────────────

/// The `{"id": …}` block carried by `create` and `attach` replies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceData {
    /// Server-assigned numeric id of the new session or handle.
    pub id: u64,
}

/// The `plugindata` block present on plugin-originated payloads.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PluginData {
    /// Canonical plugin package name, e.g. `janus.plugin.videoroom`.
    pub plugin: String,
    /// Plugin-defined payload; its shape depends on (plugin, action).
    #[serde(default)]
    pub data: Value,
}

/// The `error` block of an error-class frame.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorData {
    /// Numeric gateway error code (e.g. 458 = session not found).
    pub code: i32,
    /// Human-readable description of the failure.
    pub reason: String,
}

/// Version/author metadata for one transport or plugin in a `server_info`
/// reply.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ComponentInfo {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub author: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub version_string: String,
    #[serde(default)]
    pub version: u64,
}

// ── Per-class payloads ────────────────────────────────────────────────────────

/// Reply to an `info` request: gateway identity and capability summary.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InfoPayload {
    #[serde(default)]
    pub transaction: Option<String>,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub version: u64,
    #[serde(default)]
    pub version_string: String,
    #[serde(default)]
    pub author: String,
    #[serde(default)]
    pub data_channels: bool,
    #[serde(default)]
    pub ipv6: bool,
    #[serde(default, rename = "local-ip")]
    pub local_ip: String,
    #[serde(default, rename = "ice-tcp")]
    pub ice_tcp: bool,
    /// Available transport modules, keyed by package name.
    #[serde(default)]
    pub transports: HashMap<String, ComponentInfo>,
    /// Available plugins, keyed by package name.
    #[serde(default)]
    pub plugins: HashMap<String, ComponentInfo>,
}

/// Synchronous success reply.
///
/// `create`/`attach` replies carry the new resource id in `data`; plugin
/// synchronous requests carry the plugin's answer in `plugindata` instead.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SuccessPayload {
    #[serde(default)]
    pub transaction: Option<String>,
    #[serde(default)]
    pub session_id: u64,
    #[serde(default)]
    pub sender: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<ResourceData>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plugindata: Option<PluginData>,
}

/// The gateway rejected a request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorPayload {
    #[serde(default)]
    pub transaction: Option<String>,
    #[serde(default)]
    pub session_id: u64,
    pub error: ErrorData,
}

/// Immediate acknowledgement.  For asynchronous requests the real answer
/// arrives later as an event-class frame carrying the same call identifier.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AckPayload {
    #[serde(default)]
    pub transaction: Option<String>,
    #[serde(default)]
    pub session_id: u64,
}

/// Asynchronous outcome of a plugin message, or a plugin-originated push.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EventPayload {
    #[serde(default)]
    pub transaction: Option<String>,
    #[serde(default)]
    pub session_id: u64,
    #[serde(default)]
    pub sender: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plugindata: Option<PluginData>,
    /// Optional session-description payload (SDP offer/answer).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jsep: Option<Value>,
}

/// The gateway detected the PeerConnection for a handle is up.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WebrtcUpPayload {
    #[serde(default)]
    pub session_id: u64,
    #[serde(default)]
    pub sender: u64,
}

/// Media of one kind started or stopped flowing on a handle.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MediaPayload {
    #[serde(default)]
    pub session_id: u64,
    #[serde(default)]
    pub sender: u64,
    /// `"audio"` or `"video"`.
    #[serde(default, rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub receiving: bool,
}

/// The PeerConnection for a handle was closed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HangupPayload {
    #[serde(default)]
    pub session_id: u64,
    #[serde(default)]
    pub sender: u64,
    #[serde(default)]
    pub reason: String,
}

/// The gateway saw too many NACKs on a handle in the last second.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SlowLinkPayload {
    #[serde(default)]
    pub session_id: u64,
    #[serde(default)]
    pub sender: u64,
    /// `true` when the lossy direction is client → gateway.
    #[serde(default)]
    pub uplink: bool,
    #[serde(default)]
    pub lost: u64,
}

/// The plugin detached a handle on its own initiative.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DetachedPayload {
    #[serde(default)]
    pub session_id: u64,
    #[serde(default)]
    pub sender: u64,
}

/// A session was reclaimed by the gateway after its keep-alive lapsed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TimeoutPayload {
    #[serde(default)]
    pub session_id: u64,
}

// ── The classified inbound frame ──────────────────────────────────────────────

/// One classified inbound frame.
///
/// The `"janus"` field of the JSON object selects the variant; all remaining
/// fields deserialize into the variant's payload struct.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "janus", rename_all = "lowercase")]
pub enum IncomingMessage {
    #[serde(rename = "server_info")]
    Info(InfoPayload),
    Success(SuccessPayload),
    Error(ErrorPayload),
    Ack(AckPayload),
    Event(EventPayload),
    WebrtcUp(WebrtcUpPayload),
    Media(MediaPayload),
    Hangup(HangupPayload),
    SlowLink(SlowLinkPayload),
    Detached(DetachedPayload),
    Timeout(TimeoutPayload),
}

impl IncomingMessage {
    /// The echoed call identifier, when the frame carries one.
    ///
    /// Push-only classes (`webrtcup`, `media`, …) never carry an identifier.
    pub fn transaction(&self) -> Option<&str> {
        match self {
            Self::Info(p) => p.transaction.as_deref(),
            Self::Success(p) => p.transaction.as_deref(),
            Self::Error(p) => p.transaction.as_deref(),
            Self::Ack(p) => p.transaction.as_deref(),
            Self::Event(p) => p.transaction.as_deref(),
            Self::WebrtcUp(_)
            | Self::Media(_)
            | Self::Hangup(_)
            | Self::SlowLink(_)
            | Self::Detached(_)
            | Self::Timeout(_) => None,
        }
    }

    /// The session id the frame is scoped to; `0` when absent.
    pub fn session_id(&self) -> u64 {
        match self {
            Self::Info(_) => 0,
            Self::Success(p) => p.session_id,
            Self::Error(p) => p.session_id,
            Self::Ack(p) => p.session_id,
            Self::Event(p) => p.session_id,
            Self::WebrtcUp(p) => p.session_id,
            Self::Media(p) => p.session_id,
            Self::Hangup(p) => p.session_id,
            Self::SlowLink(p) => p.session_id,
            Self::Detached(p) => p.session_id,
            Self::Timeout(p) => p.session_id,
        }
    }

    /// The originating handle id (the wire's `sender` field); `0` when absent.
    pub fn sender(&self) -> u64 {
        match self {
            Self::Success(p) => p.sender,
            Self::Event(p) => p.sender,
            Self::WebrtcUp(p) => p.sender,
            Self::Media(p) => p.sender,
            Self::Hangup(p) => p.sender,
            Self::SlowLink(p) => p.sender,
            Self::Detached(p) => p.sender,
            Self::Info(_) | Self::Error(_) | Self::Ack(_) | Self::Timeout(_) => 0,
        }
    }

    /// The plugin-scope name, present only on plugin-originated payloads.
    ///
    /// Only event-class frames carry a routing-relevant scope: a plugin
    /// block inside a synchronous success reply is payload for the caller
    /// that issued the request, not an address.  An empty `plugin` string
    /// counts as absent.
    pub fn plugin_scope(&self) -> Option<&str> {
        match self {
            Self::Event(p) => p
                .plugindata
                .as_ref()
                .map(|pd| pd.plugin.as_str())
                .filter(|name| !name.is_empty()),
            _ => None,
        }
    }

    /// `true` for event-class payloads.
    ///
    /// Observing an event-class reply is the one-way trigger that retires a
    /// call identifier from reply matching.
    pub fn is_event(&self) -> bool {
        matches!(self, Self::Event(_))
    }

    /// Wire name of the message class, for diagnostics.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Info(_) => "server_info",
            Self::Success(_) => "success",
            Self::Error(_) => "error",
            Self::Ack(_) => "ack",
            Self::Event(_) => "event",
            Self::WebrtcUp(_) => "webrtcup",
            Self::Media(_) => "media",
            Self::Hangup(_) => "hangup",
            Self::SlowLink(_) => "slowlink",
            Self::Detached(_) => "detached",
            Self::Timeout(_) => "timeout",
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
