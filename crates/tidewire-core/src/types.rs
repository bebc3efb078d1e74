// SPDX-FileCopyrightText: 2026 Tidewire Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Domain enums and value types shared across the Tidewire workspace.
//!
//! Status enums round-trip through their lowercase string form (strum
//! `Display`/`EnumString`) because SQLite stores them as TEXT columns.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// The kind of connected channel: a Facebook page, an Instagram business
/// account, or a WhatsApp Business number.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ChannelKind {
    Facebook,
    Instagram,
    Whatsapp,
}

impl ChannelKind {
    /// The identifiers-map key the webhook processors use to resolve a
    /// channel of this kind from a provider payload.
    pub fn external_id_key(&self) -> &'static str {
        match self {
            ChannelKind::Facebook => "page_id",
            ChannelKind::Instagram => "instagram_account_id",
            ChannelKind::Whatsapp => "phone_number_id",
        }
    }
}

/// The webhook provider originating a callback. Meta delivers both Facebook
/// and Instagram traffic on one endpoint; WhatsApp has its own.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    Facebook,
    Whatsapp,
}

/// Channel lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, Serialize, Deserialize)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ChannelStatus {
    Active,
    Expired,
    Revoked,
    Error,
}

/// Webhook event processing status. `Failed` is terminal for the row; the
/// job retry policy, not the event store, governs reattempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, Serialize, Deserialize)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum WebhookEventStatus {
    Pending,
    Processing,
    Processed,
    Failed,
}

/// Conversation status as shown to agents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, Serialize, Deserialize)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ConversationStatus {
    Open,
    Closed,
    Pending,
}

/// Message direction relative to the tenant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, Serialize, Deserialize)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum MessageDirection {
    In,
    Out,
}

/// Message content kind, inferred from provider attachments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, Serialize, Deserialize)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum MessageKind {
    Text,
    Image,
    Video,
    Audio,
    Document,
    File,
}

/// Post lifecycle. Only `Draft` and `Failed` posts are mutable; `Published`
/// posts are immutable and undeletable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, Serialize, Deserialize)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum PostStatus {
    Draft,
    Scheduled,
    Published,
    Failed,
}

/// Scheduled job status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, Serialize, Deserialize)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Pending,
    Running,
    Completed,
    Failed,
}

/// A media asset attached to a post or message.
///
/// `url` is either an absolute URL or a storage-relative path; the publisher
/// resolves relative paths against the configured public media base URL
/// before handing them to a platform adapter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaRef {
    pub id: String,
    pub url: String,
    #[serde(default)]
    pub mime_type: Option<String>,
}

impl MediaRef {
    /// Extension-based heuristic used by the Facebook publisher to choose
    /// between the photos, videos, and feed endpoints.
    pub fn looks_like_video(&self) -> bool {
        if let Some(mime) = &self.mime_type {
            return mime.starts_with("video/");
        }
        let lower = self.url.to_ascii_lowercase();
        [".mp4", ".mov", ".m4v", ".avi", ".webm"]
            .iter()
            .any(|ext| lower.ends_with(ext))
    }

    /// Counterpart heuristic for image assets.
    pub fn looks_like_image(&self) -> bool {
        if let Some(mime) = &self.mime_type {
            return mime.starts_with("image/");
        }
        let lower = self.url.to_ascii_lowercase();
        [".jpg", ".jpeg", ".png", ".gif", ".webp"]
            .iter()
            .any(|ext| lower.ends_with(ext))
    }
}

/// Result of a platform send-message call.
#[derive(Debug, Clone)]
pub struct SendReceipt {
    /// Provider-assigned message id, replacing the `pending_<uuid>` placeholder.
    pub provider_message_id: String,
    /// Raw response body, merged into the message's meta column.
    pub raw_response: serde_json::Value,
}

/// Result of a platform publish-post call.
#[derive(Debug, Clone)]
pub struct PublishReceipt {
    pub provider_post_id: String,
    pub raw_response: serde_json::Value,
}

/// Engagement metrics returned by a platform insights fetch.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostInsights {
    pub likes: i64,
    pub comments: i64,
    pub shares: i64,
    pub impressions: i64,
    pub reach: i64,
}
