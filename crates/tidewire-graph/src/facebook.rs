// SPDX-FileCopyrightText: 2026 Tidewire Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Facebook page adapter: Send API messaging, feed/photo/video publishing,
//! and comment moderation.

use async_trait::async_trait;
use secrecy::SecretString;
use tidewire_core::traits::{ChannelRef, PlatformAdapter};
use tidewire_core::types::{ChannelKind, MediaRef, PostInsights, PublishReceipt, SendReceipt};
use tidewire_core::TidewireError;

use crate::client::{response_str, CallScope, GraphClient};

pub struct FacebookAdapter {
    client: GraphClient,
}

impl FacebookAdapter {
    pub fn new(client: GraphClient) -> Self {
        Self { client }
    }

    fn scope<'a>(&self, channel: &'a ChannelRef, operation: &'a str) -> CallScope<'a> {
        CallScope {
            channel_id: Some(&channel.id),
            platform: "facebook",
            operation,
        }
    }

    fn page_id(channel: &ChannelRef) -> Result<&str, TidewireError> {
        channel.external_id("page_id").ok_or_else(|| {
            TidewireError::Precondition(format!("channel {} has no page_id", channel.id))
        })
    }
}

#[async_trait]
impl PlatformAdapter for FacebookAdapter {
    fn kind(&self) -> ChannelKind {
        ChannelKind::Facebook
    }

    async fn send_message(
        &self,
        channel: &ChannelRef,
        token: &SecretString,
        peer_id: &str,
        body: &str,
        media: Option<&MediaRef>,
    ) -> Result<SendReceipt, TidewireError> {
        let message = match media {
            Some(media) => {
                let attachment_type = if media.looks_like_video() {
                    "video"
                } else if media.looks_like_image() {
                    "image"
                } else {
                    "file"
                };
                serde_json::json!({
                    "attachment": {
                        "type": attachment_type,
                        "payload": { "url": media.url, "is_reusable": false }
                    }
                })
            }
            None => serde_json::json!({ "text": body }),
        };
        let request = serde_json::json!({
            "recipient": { "id": peer_id },
            "message": message,
            "messaging_type": "RESPONSE"
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
        let page_id = Self::page_id(channel)?;
        let scope = self.scope(channel, "publish_post");

        // One Graph call per post: endpoint picked by the first asset.
        let (path, request) = match media.first() {
            None => (
                format!("{page_id}/feed"),
                serde_json::json!({ "message": caption }),
            ),
            Some(first) if first.looks_like_video() => (
                format!("{page_id}/videos"),
                serde_json::json!({ "file_url": first.url, "description": caption }),
            ),
            Some(first) => (
                format!("{page_id}/photos"),
                serde_json::json!({ "url": first.url, "caption": caption }),
            ),
        };
        let response = self.client.post(scope, &path, token, &request).await?;
        let provider_post_id = response
            .pointer("/post_id")
            .and_then(|v| v.as_str())
            .map(str::to_string)
            .map(Ok)
            .unwrap_or_else(|| response_str(&response, "/id", "publish_post"))?;
        Ok(PublishReceipt {
            provider_post_id,
            raw_response: response,
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
                &format!("{provider_comment_id}/comments"),
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
                &serde_json::json!({ "is_hidden": hidden }),
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
        let engagement = self
            .client
            .get(
                self.scope(channel, "fetch_insights"),
                provider_post_id,
                token,
                &[(
                    "fields",
                    "likes.summary(true),comments.summary(true),shares",
                )],
            )
            .await?;
        let reach = self
            .client
            .get(
                self.scope(channel, "fetch_insights"),
                &format!("{provider_post_id}/insights"),
                token,
                &[("metric", "post_impressions,post_impressions_unique")],
            )
            .await?;

        let summary_count = |pointer: &str| {
            engagement
                .pointer(pointer)
                .and_then(|v| v.as_i64())
                .unwrap_or(0)
        };
        let mut insights = PostInsights {
            likes: summary_count("/likes/summary/total_count"),
            comments: summary_count("/comments/summary/total_count"),
            shares: summary_count("/shares/count"),
            ..Default::default()
        };
        if let Some(metrics) = reach.pointer("/data").and_then(|v| v.as_array()) {
            for metric in metrics {
                let value = metric
                    .pointer("/values/0/value")
                    .and_then(|v| v.as_i64())
                    .unwrap_or(0);
                match metric.get("name").and_then(|n| n.as_str()) {
                    Some("post_impressions") => insights.impressions = value,
                    Some("post_impressions_unique") => insights.reach = value,
                    _ => {}
                }
            }
        }
        Ok(insights)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testsupport::{channel, test_db, token};
    use std::time::Duration;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn adapter(server: &MockServer) -> (FacebookAdapter, tidewire_storage::Database, tempfile::TempDir) {
        let (db, dir) = test_db().await;
        let client =
            GraphClient::new(db.clone(), server.uri(), Duration::from_secs(5)).unwrap();
        (FacebookAdapter::new(client), db, dir)
    }

    #[tokio::test]
    async fn text_send_uses_send_api_envelope() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/me/messages"))
            .and(body_partial_json(serde_json::json!({
                "recipient": {"id": "u-9"},
                "message": {"text": "hello"}
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "recipient_id": "u-9",
                "message_id": "m_77"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let (adapter, db, _dir) = adapter(&server).await;
        let receipt = adapter
            .send_message(
                &channel(ChannelKind::Facebook, serde_json::json!({"page_id": "p-1"})),
                &token("tok"),
                "u-9",
                "hello",
                None,
            )
            .await
            .unwrap();
        assert_eq!(receipt.provider_message_id, "m_77");
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn publish_routes_on_first_media() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/p-1/photos"))
            .and(body_partial_json(serde_json::json!({
                "url": "https://cdn.example.com/a.jpg",
                "caption": "new arrivals"
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "id": "ph_1",
                "post_id": "p-1_88"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let (adapter, db, _dir) = adapter(&server).await;
        let receipt = adapter
            .publish_post(
                &channel(ChannelKind::Facebook, serde_json::json!({"page_id": "p-1"})),
                &token("tok"),
                "new arrivals",
                &[MediaRef {
                    id: "a1".into(),
                    url: "https://cdn.example.com/a.jpg".into(),
                    mime_type: None,
                }],
            )
            .await
            .unwrap();
        // The page-scoped post id wins over the photo object id.
        assert_eq!(receipt.provider_post_id, "p-1_88");
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn insights_merge_engagement_and_reach() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/p-1_88"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "likes": {"summary": {"total_count": 12}},
                "comments": {"summary": {"total_count": 4}},
                "shares": {"count": 2}
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/p-1_88/insights"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "data": [
                    {"name": "post_impressions", "values": [{"value": 900}]},
                    {"name": "post_impressions_unique", "values": [{"value": 640}]}
                ]
            })))
            .mount(&server)
            .await;

        let (adapter, db, _dir) = adapter(&server).await;
        let insights = adapter
            .fetch_insights(
                &channel(ChannelKind::Facebook, serde_json::json!({"page_id": "p-1"})),
                &token("tok"),
                "p-1_88",
            )
            .await
            .unwrap();
        assert_eq!(
            insights,
            PostInsights {
                likes: 12,
                comments: 4,
                shares: 2,
                impressions: 900,
                reach: 640
            }
        );
        db.close().await.unwrap();
    }
}
