// SPDX-FileCopyrightText: 2026 Tidewire Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Row structs for the pipeline tables.
//!
//! Timestamps are RFC3339 UTC strings in the same millisecond format SQLite's
//! `strftime('%Y-%m-%dT%H:%M:%fZ','now')` produces, so string comparison is
//! time comparison on both sides of the boundary.

use std::str::FromStr;

use tidewire_core::traits::ChannelRef;
use tidewire_core::types::{
    ChannelKind, ChannelStatus, ConversationStatus, JobStatus, MessageDirection, MessageKind,
    PostStatus, Provider, WebhookEventStatus,
};
use tidewire_vault::SealedSecret;

/// Current UTC time in the storage timestamp format.
pub fn now_utc() -> String {
    chrono::Utc::now().format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string()
}

/// UTC time offset into the future, in the storage timestamp format.
pub fn utc_after(duration: chrono::Duration) -> String {
    (chrono::Utc::now() + duration)
        .format("%Y-%m-%dT%H:%M:%S%.3fZ")
        .to_string()
}

/// Converts a provider epoch-milliseconds watermark into the storage
/// timestamp format. Out-of-range values clamp to the epoch.
pub fn utc_from_millis(millis: i64) -> String {
    chrono::DateTime::from_timestamp_millis(millis)
        .unwrap_or_default()
        .format("%Y-%m-%dT%H:%M:%S%.3fZ")
        .to_string()
}

/// Converts a provider epoch-seconds timestamp into the storage format.
pub fn utc_from_secs(secs: i64) -> String {
    utc_from_millis(secs.saturating_mul(1000))
}

/// Parses a TEXT column into one of the strum-backed domain enums, mapping
/// failures to a rusqlite conversion error so they surface as storage errors.
pub(crate) fn column_enum<T>(idx: usize, value: String) -> Result<T, rusqlite::Error>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    value.parse::<T>().map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
    })
}

/// Parses a JSON TEXT column, mapping failures to a rusqlite conversion error.
pub(crate) fn column_json(
    idx: usize,
    value: Option<String>,
) -> Result<Option<serde_json::Value>, rusqlite::Error> {
    match value {
        None => Ok(None),
        Some(raw) => serde_json::from_str(&raw).map(Some).map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(
                idx,
                rusqlite::types::Type::Text,
                Box::new(e),
            )
        }),
    }
}

/// A tenant's connected platform account with its sealed credentials.
#[derive(Debug, Clone)]
pub struct Channel {
    pub id: String,
    pub tenant_id: String,
    pub kind: ChannelKind,
    /// JSON object of platform external ids (page_id, phone_number_id, ...).
    pub identifiers: serde_json::Value,
    pub access_token: SealedSecret,
    pub refresh_token: Option<SealedSecret>,
    pub expires_at: Option<String>,
    pub status: ChannelStatus,
    pub created_at: String,
    pub updated_at: String,
}

impl Channel {
    /// The adapter-facing view of this channel (no credentials).
    pub fn to_ref(&self) -> ChannelRef {
        ChannelRef {
            id: self.id.clone(),
            tenant_id: self.tenant_id.clone(),
            kind: self.kind,
            identifiers: self.identifiers.clone(),
        }
    }
}

/// A persisted inbound webhook payload with its processing state.
#[derive(Debug, Clone)]
pub struct WebhookEvent {
    pub id: i64,
    pub tenant_id: Option<String>,
    pub channel_id: Option<String>,
    pub provider: Provider,
    pub signature: String,
    pub payload: String,
    pub status: WebhookEventStatus,
    pub processed_at: Option<String>,
    pub error: Option<String>,
    pub created_at: String,
}

/// The thread between one channel and one external peer.
#[derive(Debug, Clone)]
pub struct Conversation {
    pub id: String,
    pub tenant_id: String,
    pub channel_id: String,
    pub peer_id: String,
    pub status: ConversationStatus,
    pub assigned_to: Option<String>,
    pub last_message_at: Option<String>,
    pub created_at: String,
}

/// One message in a conversation. `provider_message_id` is UNIQUE and is
/// the sole dedup guard against webhook redelivery.
#[derive(Debug, Clone)]
pub struct Message {
    pub id: String,
    pub conversation_id: String,
    pub provider_message_id: String,
    pub direction: MessageDirection,
    pub kind: MessageKind,
    pub body: Option<String>,
    pub media: Option<serde_json::Value>,
    pub delivered_at: Option<String>,
    pub read_at: Option<String>,
    pub meta: Option<serde_json::Value>,
    pub created_at: String,
}

/// A scheduled or published post with engagement counters.
#[derive(Debug, Clone)]
pub struct Post {
    pub id: String,
    pub tenant_id: String,
    pub channel_id: String,
    pub caption: String,
    /// JSON array of media asset refs.
    pub media: serde_json::Value,
    pub status: PostStatus,
    pub scheduled_for: Option<String>,
    pub published_at: Option<String>,
    pub provider_post_id: Option<String>,
    pub error: Option<String>,
    pub likes: i64,
    pub comments: i64,
    pub shares: i64,
    pub impressions: i64,
    pub reach: i64,
    pub created_at: String,
}

/// A moderated comment mirrored from a provider webhook.
#[derive(Debug, Clone)]
pub struct Comment {
    pub id: String,
    pub tenant_id: String,
    pub channel_id: String,
    pub provider_comment_id: String,
    pub provider_post_id: Option<String>,
    pub author_id: Option<String>,
    pub author_name: Option<String>,
    pub body: Option<String>,
    pub hidden: bool,
    pub created_at: String,
}

/// A durable delayed-task row; the job queue backbone.
#[derive(Debug, Clone)]
pub struct ScheduledJob {
    pub id: i64,
    pub tenant_id: Option<String>,
    pub job_type: String,
    pub payload: serde_json::Value,
    pub run_at: String,
    pub status: JobStatus,
    pub attempts: i64,
    pub max_attempts: i64,
    pub started_at: Option<String>,
    pub completed_at: Option<String>,
    pub error: Option<String>,
    pub created_at: String,
}

/// One audited platform API interaction.
#[derive(Debug, Clone)]
pub struct AuditEntry {
    pub id: i64,
    pub channel_id: Option<String>,
    pub platform: String,
    pub operation: String,
    pub request: Option<serde_json::Value>,
    pub response: Option<String>,
    pub success: bool,
    pub latency_ms: i64,
    pub created_at: String,
}
