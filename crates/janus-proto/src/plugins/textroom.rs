//! Request builders and typed responses for the textroom plugin
//! (data-channel chat rooms).

use serde::{Deserialize, Serialize};
use serde_json::json;

use super::{BasePluginRequest, PluginRequest, PluginRequestFactory, TEXTROOM_PLUGIN};
use crate::codec::{to_field_map, CodecError, FieldMap};

// ── Room descriptors ──────────────────────────────────────────────────────────

/// Settings for a new textroom.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Room {
    pub room: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub is_private: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub secret: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pin: Option<String>,
    /// Number of past messages replayed to new participants.
    pub history: u32,
    /// HTTP backend to mirror every message to, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub post: Option<String>,
}

/// Changes to an existing room.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RoomEdit {
    pub room: u64,
    #[serde(rename = "new_description", skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(rename = "new_is_private")]
    pub is_private: bool,
    #[serde(rename = "new_secret", skip_serializing_if = "Option::is_none")]
    pub secret: Option<String>,
    #[serde(rename = "new_pin", skip_serializing_if = "Option::is_none")]
    pub pin: Option<String>,
    #[serde(rename = "new_post", skip_serializing_if = "Option::is_none")]
    pub post: Option<String>,
}

// ── Requests ──────────────────────────────────────────────────────────────────

/// Builds textroom requests, carrying the configured admin key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestFactory {
    inner: PluginRequestFactory,
}

impl RequestFactory {
    pub fn new(admin_key: Option<String>) -> Self {
        Self {
            inner: PluginRequestFactory::new(TEXTROOM_PLUGIN, admin_key),
        }
    }

    pub fn list(&self) -> BasePluginRequest {
        self.inner.request("list")
    }

    pub fn create(&self, room: Room, permanent: bool, allowed: Vec<String>) -> CreateRequest {
        CreateRequest {
            base: self.inner.request("create"),
            room,
            permanent,
            allowed,
        }
    }

    pub fn edit(&self, room: RoomEdit, permanent: bool, secret: Option<String>) -> EditRequest {
        EditRequest {
            base: self.inner.request("edit"),
            room,
            permanent,
            secret,
        }
    }

    pub fn destroy(&self, room: u64, permanent: bool, secret: Option<String>) -> DestroyRequest {
        DestroyRequest {
            base: self.inner.request("destroy"),
            room,
            permanent,
            secret,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateRequest {
    base: BasePluginRequest,
    pub room: Room,
    pub permanent: bool,
    pub allowed: Vec<String>,
}

impl PluginRequest for CreateRequest {
    fn plugin_name(&self) -> &str {
        self.base.plugin_name()
    }

    fn action(&self) -> &str {
        self.base.action()
    }

    fn payload(&self) -> Result<FieldMap, CodecError> {
        let mut body = self.base.payload()?;
        body.insert("permanent".to_string(), json!(self.permanent));
        if !self.allowed.is_empty() {
            body.insert("allowed".to_string(), json!(self.allowed));
        }
        body.append(&mut to_field_map(&self.room)?);
        Ok(body)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditRequest {
    base: BasePluginRequest,
    pub room: RoomEdit,
    pub permanent: bool,
    pub secret: Option<String>,
}

impl PluginRequest for EditRequest {
    fn plugin_name(&self) -> &str {
        self.base.plugin_name()
    }

    fn action(&self) -> &str {
        self.base.action()
    }

    fn payload(&self) -> Result<FieldMap, CodecError> {
        let mut body = self.base.payload()?;
        body.insert("permanent".to_string(), json!(self.permanent));
        if let Some(secret) = &self.secret {
            body.insert("secret".to_string(), json!(secret));
        }
        body.append(&mut to_field_map(&self.room)?);
        Ok(body)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DestroyRequest {
    base: BasePluginRequest,
    pub room: u64,
    pub permanent: bool,
    pub secret: Option<String>,
}

impl PluginRequest for DestroyRequest {
    fn plugin_name(&self) -> &str {
        self.base.plugin_name()
    }

    fn action(&self) -> &str {
        self.base.action()
    }

    fn payload(&self) -> Result<FieldMap, CodecError> {
        let mut body = self.base.payload()?;
        body.insert("room".to_string(), json!(self.room));
        body.insert("permanent".to_string(), json!(self.permanent));
        if let Some(secret) = &self.secret {
            body.insert("secret".to_string(), json!(secret));
        }
        Ok(body)
    }
}

// ── Responses ─────────────────────────────────────────────────────────────────

/// One room as reported by `list`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct RoomSummary {
    pub room: u64,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub pin_required: bool,
    #[serde(default)]
    pub history: u32,
    #[serde(default)]
    pub num_participants: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ListResponse {
    #[serde(default, rename = "list")]
    pub rooms: Vec<RoomSummary>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct CreateResponse {
    pub room: u64,
    #[serde(default)]
    pub permanent: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct EditResponse {
    pub room: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct DestroyResponse {
    pub room: u64,
}

// ── Tests ─────────────────────────────────────────────────────────────────────
