// SPDX-FileCopyrightText: 2026 Tidewire Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The platform adapter seam.
//!
//! Each platform (Facebook, Instagram, WhatsApp) implements
//! [`PlatformAdapter`] once; callers pick the implementation from an
//! [`AdapterRegistry`] keyed on [`ChannelKind`]. Adding a platform is
//! additive: implement the trait, insert it into the registry.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use secrecy::SecretString;

use crate::error::TidewireError;
use crate::types::{ChannelKind, MediaRef, PostInsights, PublishReceipt, SendReceipt};

/// The subset of a channel row that platform adapters need: identity and
/// the platform-specific external id map. The decrypted access token is
/// passed separately so plaintext never rides inside a model struct.
#[derive(Debug, Clone)]
pub struct ChannelRef {
    pub id: String,
    pub tenant_id: String,
    pub kind: ChannelKind,
    /// JSON object of platform external ids (page_id, instagram_account_id,
    /// phone_number_id, ...).
    pub identifiers: serde_json::Value,
}

impl ChannelRef {
    /// Looks up a platform external id by key.
    pub fn external_id(&self, key: &str) -> Option<&str> {
        self.identifiers.get(key).and_then(|v| v.as_str())
    }

    /// The external id a provider payload would use to address this channel.
    pub fn primary_external_id(&self) -> Option<&str> {
        self.external_id(self.kind.external_id_key())
    }
}

/// A platform REST client wrapping one provider's send/publish/moderation
/// surface. Implementations throw [`TidewireError::Platform`] on non-2xx
/// responses with the response body embedded, and write an audit log row
/// for every mutating call, success or failure.
#[async_trait]
pub trait PlatformAdapter: Send + Sync {
    /// The channel kind this adapter serves.
    fn kind(&self) -> ChannelKind;

    /// Sends an outbound message to a peer. At most one media attachment
    /// is supported per message.
    async fn send_message(
        &self,
        channel: &ChannelRef,
        token: &SecretString,
        peer_id: &str,
        body: &str,
        media: Option<&MediaRef>,
    ) -> Result<SendReceipt, TidewireError>;

    /// Publishes a post. Media URLs must already be absolute.
    async fn publish_post(
        &self,
        channel: &ChannelRef,
        token: &SecretString,
        caption: &str,
        media: &[MediaRef],
    ) -> Result<PublishReceipt, TidewireError>;

    /// Replies to a comment; returns the provider id of the reply.
    async fn reply_comment(
        &self,
        channel: &ChannelRef,
        token: &SecretString,
        provider_comment_id: &str,
        body: &str,
    ) -> Result<String, TidewireError>;

    /// Hides or unhides a comment.
    async fn hide_comment(
        &self,
        channel: &ChannelRef,
        token: &SecretString,
        provider_comment_id: &str,
        hidden: bool,
    ) -> Result<(), TidewireError>;

    /// Deletes a comment.
    async fn delete_comment(
        &self,
        channel: &ChannelRef,
        token: &SecretString,
        provider_comment_id: &str,
    ) -> Result<(), TidewireError>;

    /// Fetches engagement metrics for a published post.
    async fn fetch_insights(
        &self,
        channel: &ChannelRef,
        token: &SecretString,
        provider_post_id: &str,
    ) -> Result<PostInsights, TidewireError>;
}

/// Lookup table from channel kind to adapter implementation.
#[derive(Clone, Default)]
pub struct AdapterRegistry {
    adapters: HashMap<ChannelKind, Arc<dyn PlatformAdapter>>,
}

impl AdapterRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an adapter under its own kind, replacing any previous one.
    pub fn register(&mut self, adapter: Arc<dyn PlatformAdapter>) {
        self.adapters.insert(adapter.kind(), adapter);
    }

    /// Resolves the adapter for a channel kind.
    pub fn get(&self, kind: ChannelKind) -> Result<Arc<dyn PlatformAdapter>, TidewireError> {
        self.adapters.get(&kind).cloned().ok_or_else(|| {
            TidewireError::Internal(format!("no platform adapter registered for {kind}"))
        })
    }

    pub fn len(&self) -> usize {
        self.adapters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.adapters.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn channel_ref_external_id_lookup() {
        let channel = ChannelRef {
            id: "ch-1".into(),
            tenant_id: "t-1".into(),
            kind: ChannelKind::Whatsapp,
            identifiers: serde_json::json!({"phone_number_id": "555"}),
        };
        assert_eq!(channel.external_id("phone_number_id"), Some("555"));
        assert_eq!(channel.primary_external_id(), Some("555"));
        assert_eq!(channel.external_id("page_id"), None);
    }

    #[test]
    fn registry_miss_is_an_error() {
        let registry = AdapterRegistry::new();
        assert!(registry.is_empty());
        assert!(registry.get(ChannelKind::Facebook).is_err());
    }
}
