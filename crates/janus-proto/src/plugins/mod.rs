//! Plugin request/response schemas.
//!
//! Plugin traffic rides inside the generic signalling envelope: the request
//! body is a field map whose `"request"` field names the action, and the
//! reply comes back inside a `plugindata` block.  This module provides:
//!
//! - [`PluginRequest`] – the builder interface every plugin request
//!   implements: a plugin-scope name, an action name, and a body field map.
//! - [`BasePluginRequest`] / [`PluginRequestFactory`] – shared plumbing for
//!   actions that need nothing beyond `request` (+ optional admin key).
//! - [`PluginError`] – the error shape shared by all plugin replies.
//! - [`decode_plugin_response`] – the registry mapping a (plugin-scope,
//!   action) pair to the typed response shape expected in `plugindata.data`.
//!
//! One module per supported plugin: [`audiobridge`], [`videoroom`],
//! [`textroom`].

pub mod audiobridge;
pub mod textroom;
pub mod videoroom;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use thiserror::Error;

use crate::codec::{CodecError, FieldMap};

/// Canonical package name of the audiobridge plugin.
pub const AUDIOBRIDGE_PLUGIN: &str = "janus.plugin.audiobridge";
/// Canonical package name of the videoroom plugin.
pub const VIDEOROOM_PLUGIN: &str = "janus.plugin.videoroom";
/// Canonical package name of the textroom plugin.
pub const TEXTROOM_PLUGIN: &str = "janus.plugin.textroom";

// ── Request side ──────────────────────────────────────────────────────────────

/// A typed plugin request that can be turned into an outbound body.
///
/// The body returned by [`payload`](Self::payload) becomes the `body` field
/// of a handle-scoped call; the connection layer supplies everything else
/// (method, ids, authentication).
pub trait PluginRequest {
    /// Plugin-scope name the request targets, e.g. `janus.plugin.videoroom`.
    fn plugin_name(&self) -> &str;

    /// Action name, e.g. `create` — becomes the body's `"request"` field.
    fn action(&self) -> &str;

    /// Builds the request body field map.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError`] if a room/command descriptor fails to encode
    /// as a JSON object.
    fn payload(&self) -> Result<FieldMap, CodecError>;
}

/// A plugin request with no fields beyond the action and an optional admin
/// key.  `list` is the canonical example.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BasePluginRequest {
    pub plugin: String,
    pub action: String,
    pub admin_key: Option<String>,
}

impl PluginRequest for BasePluginRequest {
    fn plugin_name(&self) -> &str {
        &self.plugin
    }

    fn action(&self) -> &str {
        &self.action
    }

    fn payload(&self) -> Result<FieldMap, CodecError> {
        let mut body = FieldMap::new();
        body.insert("request".to_string(), json!(self.action));
        if let Some(key) = &self.admin_key {
            body.insert("admin_key".to_string(), json!(key));
        }
        Ok(body)
    }
}

/// Stamps out [`BasePluginRequest`]s for one plugin, carrying the configured
/// admin key into every request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PluginRequestFactory {
    plugin: String,
    admin_key: Option<String>,
}

impl PluginRequestFactory {
    pub fn new(plugin: impl Into<String>, admin_key: Option<String>) -> Self {
        Self {
            plugin: plugin.into(),
            admin_key,
        }
    }

    /// The plugin-scope name this factory builds requests for.
    pub fn plugin(&self) -> &str {
        &self.plugin
    }

    fn request(&self, action: &str) -> BasePluginRequest {
        BasePluginRequest {
            plugin: self.plugin.clone(),
            action: action.to_string(),
            admin_key: self.admin_key.clone(),
        }
    }
}

// ── Response side ─────────────────────────────────────────────────────────────

/// The error shape shared by every plugin's error replies.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Error)]
#[error("plugin error {code}: {reason}")]
pub struct PluginError {
    #[serde(rename = "error_code")]
    pub code: i64,
    #[serde(rename = "error")]
    pub reason: String,
}

/// A typed plugin reply, as selected by the (plugin-scope, action) registry.
#[derive(Debug, Clone, PartialEq)]
pub enum PluginResponse {
    AudiobridgeList(audiobridge::ListResponse),
    AudiobridgeCreate(audiobridge::CreateResponse),
    AudiobridgeEdit(audiobridge::EditResponse),
    AudiobridgeDestroy(audiobridge::DestroyResponse),
    VideoroomList(videoroom::ListResponse),
    VideoroomCreate(videoroom::CreateResponse),
    VideoroomEdit(videoroom::EditResponse),
    VideoroomDestroy(videoroom::DestroyResponse),
    TextroomList(textroom::ListResponse),
    TextroomCreate(textroom::CreateResponse),
    TextroomEdit(textroom::EditResponse),
    TextroomDestroy(textroom::DestroyResponse),
    /// The plugin rejected the request; one shape across all plugins.
    Error(PluginError),
}

/// Decodes a `plugindata.data` block against the response shape registered
/// for `(plugin, action)`.
///
/// Error replies are recognised by their `error_code` field before the
/// registry is consulted, since every action can fail with the same shape.
///
/// # Errors
///
/// - [`CodecError::UnknownResponseShape`] when no shape is registered for
///   the pair.
/// - [`CodecError::Malformed`] when the data block does not match the
///   registered shape.
pub fn decode_plugin_response(
    plugin: &str,
    action: &str,
    data: &Value,
) -> Result<PluginResponse, CodecError> {
    if data.get("error_code").is_some() {
        return Ok(PluginResponse::Error(serde_json::from_value(data.clone())?));
    }

    match (plugin, action) {
        (AUDIOBRIDGE_PLUGIN, "list") => Ok(PluginResponse::AudiobridgeList(
            serde_json::from_value(data.clone())?,
        )),
        (AUDIOBRIDGE_PLUGIN, "create") => Ok(PluginResponse::AudiobridgeCreate(
            serde_json::from_value(data.clone())?,
        )),
        (AUDIOBRIDGE_PLUGIN, "edit") => Ok(PluginResponse::AudiobridgeEdit(
            serde_json::from_value(data.clone())?,
        )),
        (AUDIOBRIDGE_PLUGIN, "destroy") => Ok(PluginResponse::AudiobridgeDestroy(
            serde_json::from_value(data.clone())?,
        )),
        (VIDEOROOM_PLUGIN, "list") => Ok(PluginResponse::VideoroomList(
            serde_json::from_value(data.clone())?,
        )),
        (VIDEOROOM_PLUGIN, "create") => Ok(PluginResponse::VideoroomCreate(
            serde_json::from_value(data.clone())?,
        )),
        (VIDEOROOM_PLUGIN, "edit") => Ok(PluginResponse::VideoroomEdit(
            serde_json::from_value(data.clone())?,
        )),
        (VIDEOROOM_PLUGIN, "destroy") => Ok(PluginResponse::VideoroomDestroy(
            serde_json::from_value(data.clone())?,
        )),
        (TEXTROOM_PLUGIN, "list") => Ok(PluginResponse::TextroomList(
            serde_json::from_value(data.clone())?,
        )),
        (TEXTROOM_PLUGIN, "create") => Ok(PluginResponse::TextroomCreate(
            serde_json::from_value(data.clone())?,
        )),
        (TEXTROOM_PLUGIN, "edit") => Ok(PluginResponse::TextroomEdit(
            serde_json::from_value(data.clone())?,
        )),
        (TEXTROOM_PLUGIN, "destroy") => Ok(PluginResponse::TextroomDestroy(
            serde_json::from_value(data.clone())?,
        )),
        _ => Err(CodecError::UnknownResponseShape {
            plugin: plugin.to_string(),
            action: action.to_string(),
        }),
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
