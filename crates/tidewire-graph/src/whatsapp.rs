// SPDX-FileCopyrightText: 2026 Tidewire Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! WhatsApp Business adapter.
//!
//! Cloud API sends ride the Graph host with the `messaging_product`
//! envelope. WhatsApp has no feed, so the post and comment surface fails
//! with permanent precondition errors.

use async_trait::async_trait;
use secrecy::SecretString;
use tidewire_core::traits::{ChannelRef, PlatformAdapter};
use tidewire_core::types::{ChannelKind, MediaRef, PostInsights, PublishReceipt, SendReceipt};
use tidewire_core::TidewireError;

use crate::client::{response_str, CallScope, GraphClient};

pub struct WhatsAppAdapter {
    client: GraphClient,
}

impl WhatsAppAdapter {
    pub fn new(client: GraphClient) -> Self {
        Self { client }
    }

    fn unsupported(operation: &str) -> TidewireError {
        TidewireError::Precondition(format!("whatsapp does not support {operation}"))
    }
}

#[async_trait]
impl PlatformAdapter for WhatsAppAdapter {
    fn kind(&self) -> ChannelKind {
        ChannelKind::Whatsapp
    }

    async fn send_message(
        &self,
        channel: &ChannelRef,
        token: &SecretString,
        peer_id: &str,
        body: &str,
        media: Option<&MediaRef>,
    ) -> Result<SendReceipt, TidewireError> {
        let phone_number_id = channel.external_id("phone_number_id").ok_or_else(|| {
            TidewireError::Precondition(format!("channel {} has no phone_number_id", channel.id))
        })?;

        let mut request = serde_json::json!({
            "messaging_product": "whatsapp",
            "recipient_type": "individual",
            "to": peer_id,
        });
        match media {
            Some(media) => {
                let (kind, mut payload) = if media.looks_like_video() {
                    ("video", serde_json::json!({ "link": media.url }))
                } else if media.looks_like_image() {
                    ("image", serde_json::json!({ "link": media.url }))
                } else {
                    ("document", serde_json::json!({ "link": media.url }))
                };
                if !body.is_empty() {
                    payload["caption"] = serde_json::Value::String(body.to_string());
                }
                request["type"] = kind.into();
                request[kind] = payload;
            }
            None => {
                request["type"] = "text".into();
                request["text"] = serde_json::json!({ "body": body });
            }
        }

        let scope = CallScope {
            channel_id: Some(&channel.id),
            platform: "whatsapp",
            operation: "send_message",
        };
        let response = self
            .client
            .post(scope, &format!("{phone_number_id}/messages"), token, &request)
            .await?;
        Ok(SendReceipt {
            provider_message_id: response_str(&response, "/messages/0/id", "send_message")?,
            raw_response: response,
        })
    }

    async fn publish_post(
        &self,
        _channel: &ChannelRef,
        _token: &SecretString,
        _caption: &str,
        _media: &[MediaRef],
    ) -> Result<PublishReceipt, TidewireError> {
        Err(Self::unsupported("posts"))
    }

    async fn reply_comment(
        &self,
        _channel: &ChannelRef,
        _token: &SecretString,
        _provider_comment_id: &str,
        _body: &str,
    ) -> Result<String, TidewireError> {
        Err(Self::unsupported("comments"))
    }

    async fn hide_comment(
        &self,
        _channel: &ChannelRef,
        _token: &SecretString,
        _provider_comment_id: &str,
        _hidden: bool,
    ) -> Result<(), TidewireError> {
        Err(Self::unsupported("comments"))
    }

    async fn delete_comment(
        &self,
        _channel: &ChannelRef,
        _token: &SecretString,
        _provider_comment_id: &str,
    ) -> Result<(), TidewireError> {
        Err(Self::unsupported("comments"))
    }

    async fn fetch_insights(
        &self,
        _channel: &ChannelRef,
        _token: &SecretString,
        _provider_post_id: &str,
    ) -> Result<PostInsights, TidewireError> {
        Err(Self::unsupported("post insights"))
    }
}
