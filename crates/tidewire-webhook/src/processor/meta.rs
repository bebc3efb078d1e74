// SPDX-FileCopyrightText: 2026 Tidewire Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Processor for the Meta endpoint (Facebook pages and Instagram accounts).
//!
//! Each entry carries `messaging` items (DMs and receipts) and `changes`
//! items (feed and comment activity). A delivery addressed to a page no
//! tenant has connected is skipped, not failed; the first real error aborts
//! the whole event so a retry replays it from the top.

use std::str::FromStr;

use tidewire_core::types::{ChannelKind, MessageDirection, MessageKind};
use tidewire_core::TidewireError;
use tidewire_storage::models::{now_utc, utc_from_millis, Comment, Message, WebhookEvent};
use tidewire_storage::queries::{
    comments, conversations, messages, usage, webhook_events,
};
use tidewire_storage::Database;
use tracing::debug;
use uuid::Uuid;

pub async fn process(db: &Database, event: &WebhookEvent) -> Result<(), TidewireError> {
    let root = super::parse_payload(&event.payload)?;
    for entry in super::entries(&root)? {
        if let Some(messaging) = entry.get("messaging").and_then(|m| m.as_array()) {
            for item in messaging {
                handle_messaging(db, event, item).await?;
            }
        }
        if let Some(changes) = entry.get("changes").and_then(|c| c.as_array()) {
            for change in changes {
                handle_change(db, event, entry, change).await?;
            }
        }
    }
    Ok(())
}

fn required_str<'a>(
    value: &'a serde_json::Value,
    pointer: &str,
) -> Result<&'a str, TidewireError> {
    value
        .pointer(pointer)
        .and_then(|v| v.as_str())
        .ok_or_else(|| TidewireError::Payload(format!("messaging item missing {pointer}")))
}

async fn handle_messaging(
    db: &Database,
    event: &WebhookEvent,
    item: &serde_json::Value,
) -> Result<(), TidewireError> {
    let page_id = required_str(item, "/recipient/id")?;
    let Some(channel) =
        tidewire_storage::queries::channels::find_by_external_id(
            db,
            ChannelKind::Facebook,
            ChannelKind::Facebook.external_id_key(),
            page_id,
        )
        .await?
    else {
        debug!(page_id, "messaging for unconnected page, skipping");
        return Ok(());
    };
    webhook_events::resolve(db, event.id, &channel.tenant_id, &channel.id).await?;

    let peer_id = required_str(item, "/sender/id")?;
    let conversation =
        conversations::get_or_create(db, &channel.tenant_id, &channel.id, peer_id).await?;

    if let Some(message) = item.get("message") {
        let mid = required_str(item, "/message/mid")?;
        let attachments = message.get("attachments").and_then(|a| a.as_array());
        let kind = attachments
            .and_then(|a| a.first())
            .and_then(|first| first.get("type"))
            .and_then(|t| t.as_str())
            .map(|t| MessageKind::from_str(t).unwrap_or(MessageKind::File))
            .unwrap_or(MessageKind::Text);
        let row = Message {
            id: Uuid::new_v4().to_string(),
            conversation_id: conversation.id.clone(),
            provider_message_id: mid.to_string(),
            direction: MessageDirection::In,
            kind,
            body: message.get("text").and_then(|t| t.as_str()).map(str::to_string),
            media: attachments.map(|a| serde_json::Value::Array(a.clone())),
            delivered_at: None,
            read_at: None,
            meta: None,
            created_at: String::new(),
        };
        if messages::insert(db, &row).await? {
            let now = now_utc();
            conversations::touch_last_message(db, &conversation.id, &now).await?;
            usage::increment(
                db,
                &channel.tenant_id,
                "messages",
                &usage::current_period(),
                1,
            )
            .await?;
        } else {
            debug!(mid, "duplicate message delivery, skipping");
        }
    }

    if let Some(delivery) = item.get("delivery") {
        let now = now_utc();
        if let Some(mids) = delivery.get("mids").and_then(|m| m.as_array()) {
            for mid in mids.iter().filter_map(|m| m.as_str()) {
                messages::mark_delivered(db, mid, &now).await?;
            }
        }
        if let Some(watermark) = delivery.get("watermark").and_then(|w| w.as_i64()) {
            messages::mark_delivered_up_to_watermark(
                db,
                &conversation.id,
                &utc_from_millis(watermark),
                &now,
            )
            .await?;
        }
    }

    if let Some(read) = item.get("read") {
        if let Some(watermark) = read.get("watermark").and_then(|w| w.as_i64()) {
            messages::mark_read_up_to_watermark(
                db,
                &conversation.id,
                &utc_from_millis(watermark),
                &now_utc(),
            )
            .await?;
        }
    }

    Ok(())
}

/// Feed and comment `changes`. Instagram entries resolve by the account id,
/// Facebook feed entries by the page id; both arrive as `entry.id`.
async fn handle_change(
    db: &Database,
    event: &WebhookEvent,
    entry: &serde_json::Value,
    change: &serde_json::Value,
) -> Result<(), TidewireError> {
    let value = match change.get("value") {
        Some(value) => value,
        None => return Ok(()),
    };
    let is_comment = value.get("item").and_then(|i| i.as_str()) == Some("comment")
        || change.get("field").and_then(|f| f.as_str()) == Some("comments");
    if !is_comment {
        return Ok(());
    }

    let external_id = entry
        .get("id")
        .and_then(|i| i.as_str())
        .ok_or_else(|| TidewireError::Payload("change entry missing id".to_string()))?;
    let mut channel = tidewire_storage::queries::channels::find_by_external_id(
        db,
        ChannelKind::Instagram,
        ChannelKind::Instagram.external_id_key(),
        external_id,
    )
    .await?;
    if channel.is_none() {
        channel = tidewire_storage::queries::channels::find_by_external_id(
            db,
            ChannelKind::Facebook,
            ChannelKind::Facebook.external_id_key(),
            external_id,
        )
        .await?;
    }
    let Some(channel) = channel else {
        debug!(external_id, "comment change for unconnected account, skipping");
        return Ok(());
    };
    webhook_events::resolve(db, event.id, &channel.tenant_id, &channel.id).await?;

    let provider_comment_id = value
        .get("comment_id")
        .or_else(|| value.get("id"))
        .and_then(|i| i.as_str())
        .ok_or_else(|| TidewireError::Payload("comment change missing comment id".to_string()))?;

    if value.get("verb").and_then(|v| v.as_str()) == Some("remove") {
        comments::delete_by_provider_id(db, provider_comment_id).await?;
        return Ok(());
    }

    let row = Comment {
        id: Uuid::new_v4().to_string(),
        tenant_id: channel.tenant_id.clone(),
        channel_id: channel.id.clone(),
        provider_comment_id: provider_comment_id.to_string(),
        provider_post_id: value
            .get("post_id")
            .or_else(|| value.pointer("/media/id"))
            .and_then(|i| i.as_str())
            .map(str::to_string),
        author_id: value.pointer("/from/id").and_then(|i| i.as_str()).map(str::to_string),
        author_name: value
            .pointer("/from/name")
            .or_else(|| value.pointer("/from/username"))
            .and_then(|n| n.as_str())
            .map(str::to_string),
        body: value
            .get("message")
            .or_else(|| value.get("text"))
            .and_then(|m| m.as_str())
            .map(str::to_string),
        hidden: false,
        created_at: String::new(),
    };
    comments::upsert(db, &row).await?;
    Ok(())
}
