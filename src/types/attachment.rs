//! Message attachments: agent references and media assets.

use base64::Engine;
use bon::Builder;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::error::ConfabError;

/// Something attached to a message besides its text.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Attachment {
    /// Produced by a named agent.
    Agent { agent_id: String },
    /// A media asset (image, audio, ...).
    Asset(Asset),
    Noop,
}

impl Attachment {
    pub fn as_asset(&self) -> Option<&Asset> {
        match self {
            Self::Asset(asset) => Some(asset),
            _ => None,
        }
    }
}

/// A media asset referenced by a message.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Builder)]
pub struct Asset {
    #[builder(into)]
    pub name: String,
    pub kind: AssetKind,
    pub location: AssetLocation,
    #[builder(into)]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[builder(into)]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
    /// Base64 payload for [`AssetLocation::Inline`] assets.
    #[builder(into)]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<String>,
    /// Kept for display only; never forwarded to a model.
    #[builder(default)]
    #[serde(default)]
    pub noop: bool,
}

impl Asset {
    /// An image carried inside the message itself.
    pub fn inline_image(name: impl Into<String>, bytes: &[u8], mime_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: AssetKind::Image,
            location: AssetLocation::Inline,
            description: None,
            mime_type: Some(mime_type.into()),
            data: Some(base64::engine::general_purpose::STANDARD.encode(bytes)),
            noop: false,
        }
    }

    /// An image the model can fetch by URL; `name` holds the URL.
    pub fn image_url(url: impl Into<String>) -> Self {
        Self {
            name: url.into(),
            kind: AssetKind::Image,
            location: AssetLocation::Url,
            description: None,
            mime_type: None,
            data: None,
            noop: false,
        }
    }

    /// Decode the inline payload, if this asset has one.
    pub fn decode_data(&self) -> Result<Option<Vec<u8>>, ConfabError> {
        let Some(data) = &self.data else {
            return Ok(None);
        };
        base64::engine::general_purpose::STANDARD
            .decode(data)
            .map(Some)
            .map_err(|e| ConfabError::InvalidArgument(format!("invalid asset payload: {e}")))
    }
}

/// Media type of an asset.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Display, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum AssetKind {
    Image,
    Video,
    Audio,
}

/// Where the asset's bytes live.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Display, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum AssetLocation {
    /// Written by a [`FileBlobStore`](crate::store::FileBlobStore); `name` is relative to its root.
    Filesystem,
    /// Held by an in-memory or remote blob store under `name`.
    Blob,
    Url,
    Inline,
}
