// SPDX-FileCopyrightText: 2026 Tidewire Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Instagram business-account adapter.
//!
//! Publishing is the two-phase container flow: create a media container,
//! then `media_publish` it. Instagram has no text-only posts, so an empty
//! media list fails before any HTTP happens.

use async_trait::async_trait;
use secrecy::SecretString;
use tidewire_core::traits::{ChannelRef, PlatformAdapter};
use tidewire_core::types::{ChannelKind, MediaRef, PostInsights, PublishReceipt, SendReceipt};
use tidewire_core::TidewireError;

use crate::client::{response_str, CallScope, GraphClient};

pub struct InstagramAdapter {
    client: GraphClient,
}

impl InstagramAdapter {
    pub fn new(client: GraphClient) -> Self {
        Self { client }
    }

    fn scope<'a>(&self, channel: &'a ChannelRef, operation: &'a str) -> CallScope<'a> {
        CallScope {
            channel_id: Some(&channel.id),
            platform: "instagram",
            operation,
        }
    }

    fn account_id(channel: &ChannelRef) -> Result<&str, TidewireError> {
        channel.external_id("instagram_account_id").ok_or_else(|| {
            TidewireError::Precondition(format!(
                "channel {} has no instagram_account_id",
                channel.id
            ))
        })
    }
}

#[async_trait]
impl PlatformAdapter for InstagramAdapter {
    fn kind(&self) -> ChannelKind {
        ChannelKind::Instagram
    }

    /// Instagram DMs ride the same page-scoped Send API as Facebook.
    async fn send_message(
        &self,
        channel: &ChannelRef,
        token: &SecretString,
        peer_id: &str,
        body: &str,
        media: Option<&MediaRef>,
    ) -> Result<SendReceipt, TidewireError> {
        let message = match media {
            Some(media) => serde_json::json!({
                "attachment": {
                    "type": if media.looks_like_video() { "video" } else { "image" },
                    "payload": { "url": media.url }
                }
            }),
            None => serde_json::json!({ "text": body }),
        };
        let request = serde_json::json!({
            "recipient": { "id": peer_id },
            "message": message
        });
        let response = self
            .client
            .post(self.scope(channel, "send_message"), "me/messages", token, &request)
            .await?;
        Ok(SendReceipt {
            provider_message_id: response_str(&response, "/message_id", "send_message")?,
            raw_response: response,
        })
    }

    async fn publish_post(
        &self,
        channel: &ChannelRef,
        token: &SecretString,
        caption: &str,
        media: &[MediaRef],
    ) -> Result<PublishReceipt, TidewireError> {
        let account_id = Self::account_id(channel)?;
        let first = media.first().ok_or_else(|| {
            TidewireError::Precondition("instagram posts require media".to_string())
        })?;

        let container = if first.looks_like_video() {
            serde_json::json!({
                "video_url": first.url,
                "media_type": "REELS",
                "caption": caption
            })
        } else {
            serde_json::json!({ "image_url": first.url, "caption": caption })
        };
        let created = self
            .client
            .post(
                self.scope(channel, "publish_post"),
                &format!("{account_id}/media"),
                token,
                &container,
            )
            .await?;
        let creation_id = response_str(&created, "/id", "publish_post")?;

        let published = self
            .client
            .post(
                self.scope(channel, "publish_post"),
                &format!("{account_id}/media_publish"),
                token,
                &serde_json::json!({ "creation_id": creation_id }),
            )
            .await?;
        Ok(PublishReceipt {
            provider_post_id: response_str(&published, "/id", "publish_post")?,
            raw_response: published,
        })
    }

    async fn reply_comment(
        &self,
        channel: &ChannelRef,
        token: &SecretString,
        provider_comment_id: &str,
        body: &str,
    ) -> Result<String, TidewireError> {
        let response = self
            .client
            .post(
                self.scope(channel, "reply_comment"),
                &format!("{provider_comment_id}/replies"),
                token,
                &serde_json::json!({ "message": body }),
            )
            .await?;
        response_str(&response, "/id", "reply_comment")
    }

    async fn hide_comment(
        &self,
        channel: &ChannelRef,
        token: &SecretString,
        provider_comment_id: &str,
        hidden: bool,
    ) -> Result<(), TidewireError> {
        self.client
            .post(
                self.scope(channel, "hide_comment"),
                provider_comment_id,
                token,
                &serde_json::json!({ "hide": hidden }),
            )
            .await?;
        Ok(())
    }

    async fn delete_comment(
        &self,
        channel: &ChannelRef,
        token: &SecretString,
        provider_comment_id: &str,
    ) -> Result<(), TidewireError> {
        self.client
            .delete(self.scope(channel, "delete_comment"), provider_comment_id, token)
            .await?;
        Ok(())
    }

    async fn fetch_insights(
        &self,
        channel: &ChannelRef,
        token: &SecretString,
        provider_post_id: &str,
    ) -> Result<PostInsights, TidewireError> {
        let counts = self
            .client
            .get(
                self.scope(channel, "fetch_insights"),
                provider_post_id,
                token,
                &[("fields", "like_count,comments_count")],
            )
            .await?;
        let metrics = self
            .client
            .get(
                self.scope(channel, "fetch_insights"),
                &format!("{provider_post_id}/insights"),
                token,
                &[("metric", "impressions,reach")],
            )
            .await?;

        let mut insights = PostInsights {
            likes: counts.get("like_count").and_then(|v| v.as_i64()).unwrap_or(0),
            comments: counts
                .get("comments_count")
                .and_then(|v| v.as_i64())
                .unwrap_or(0),
            ..Default::default()
        };
        if let Some(data) = metrics.pointer("/data").and_then(|v| v.as_array()) {
            for metric in data {
                let value = metric
                    .pointer("/values/0/value")
                    .and_then(|v| v.as_i64())
                    .unwrap_or(0);
                match metric.get("name").and_then(|n| n.as_str()) {
                    Some("impressions") => insights.impressions = value,
                    Some("reach") => insights.reach = value,
                    _ => {}
                }
            }
        }
        Ok(insights)
    }
}
