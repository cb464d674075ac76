//! Request builders and typed responses for the videoroom plugin (SFU).

use serde::{Deserialize, Serialize};
use serde_json::json;

use super::{BasePluginRequest, PluginRequest, PluginRequestFactory, VIDEOROOM_PLUGIN};
use crate::codec::{to_field_map, CodecError, FieldMap};

// ── Room descriptors ──────────────────────────────────────────────────────────

/// Settings for a new videoroom.
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
    pub require_pvtid: bool,
    pub require_e2ee: bool,
    pub publishers: u32,
    pub bitrate: u64,
    pub fir_freq: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audiocodec: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub videocodec: Option<String>,
    pub opus_fec: bool,
    pub audiolevel_ext: bool,
    pub audiolevel_event: bool,
    pub playoutdelay_ext: bool,
    pub transport_wide_cc_ext: bool,
    pub record: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rec_dir: Option<String>,
    pub lock_record: bool,
    pub notify_joining: bool,
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
    #[serde(rename = "new_require_pvtid")]
    pub require_pvtid: bool,
    #[serde(rename = "new_publishers")]
    pub publishers: u32,
    #[serde(rename = "new_bitrate")]
    pub bitrate: u64,
    #[serde(rename = "new_fir_freq")]
    pub fir_freq: u32,
    #[serde(rename = "new_lock_record")]
    pub lock_record: bool,
}

// ── Requests ──────────────────────────────────────────────────────────────────

/// Builds videoroom requests, carrying the configured admin key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestFactory {
    inner: PluginRequestFactory,
}

impl RequestFactory {
    pub fn new(admin_key: Option<String>) -> Self {
        Self {
            inner: PluginRequestFactory::new(VIDEOROOM_PLUGIN, admin_key),
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
    pub max_publishers: u32,
    #[serde(default)]
    pub bitrate: u64,
    #[serde(default)]
    pub bitrate_cap: bool,
    #[serde(default)]
    pub record: bool,
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
