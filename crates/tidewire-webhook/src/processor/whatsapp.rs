// SPDX-FileCopyrightText: 2026 Tidewire Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Processor for WhatsApp Cloud API callbacks.
//!
//! Payloads nest as `entry[].changes[]` with `field == "messages"`; the
//! value block carries inbound messages and outbound status updates for
//! one business phone number.

use std::str::FromStr;

use tidewire_core::types::{ChannelKind, MessageDirection, MessageKind};
use tidewire_core::TidewireError;
use tidewire_storage::models::{now_utc, utc_from_secs, Message, WebhookEvent};
use tidewire_storage::queries::{channels, conversations, messages, usage, webhook_events};
use tidewire_storage::Database;
use tracing::debug;
use uuid::Uuid;

pub async fn process(db: &Database, event: &WebhookEvent) -> Result<(), TidewireError> {
    let root = super::parse_payload(&event.payload)?;
    for entry in super::entries(&root)? {
        let Some(changes) = entry.get("changes").and_then(|c| c.as_array()) else {
            continue;
        };
        for change in changes {
            if change.get("field").and_then(|f| f.as_str()) != Some("messages") {
                continue;
            }
            let Some(value) = change.get("value") else {
                continue;
            };
            handle_value(db, event, value).await?;
        }
    }
    Ok(())
}

async fn handle_value(
    db: &Database,
    event: &WebhookEvent,
    value: &serde_json::Value,
) -> Result<(), TidewireError> {
    let phone_number_id = value
        .pointer("/metadata/phone_number_id")
        .and_then(|p| p.as_str())
        .ok_or_else(|| {
            TidewireError::Payload("messages value missing metadata.phone_number_id".to_string())
        })?;
    let Some(channel) = channels::find_by_external_id(
        db,
        ChannelKind::Whatsapp,
        ChannelKind::Whatsapp.external_id_key(),
        phone_number_id,
    )
    .await?
    else {
        debug!(phone_number_id, "callback for unconnected number, skipping");
        return Ok(());
    };
    webhook_events::resolve(db, event.id, &channel.tenant_id, &channel.id).await?;

    if let Some(inbound) = value.get("messages").and_then(|m| m.as_array()) {
        for message in inbound {
            handle_inbound(db, &channel.tenant_id, &channel.id, message).await?;
        }
    }
    if let Some(statuses) = value.get("statuses").and_then(|s| s.as_array()) {
        for status in statuses {
            handle_status(db, status).await?;
        }
    }
    Ok(())
}

async fn handle_inbound(
    db: &Database,
    tenant_id: &str,
    channel_id: &str,
    message: &serde_json::Value,
) -> Result<(), TidewireError> {
    let peer_id = message
        .get("from")
        .and_then(|f| f.as_str())
        .ok_or_else(|| TidewireError::Payload("inbound message missing from".to_string()))?;
    let provider_message_id = message
        .get("id")
        .and_then(|i| i.as_str())
        .ok_or_else(|| TidewireError::Payload("inbound message missing id".to_string()))?;
    let type_name = message
        .get("type")
        .and_then(|t| t.as_str())
        .unwrap_or("text");
    let kind = MessageKind::from_str(type_name).unwrap_or(MessageKind::File);

    // Body by type: text body, media caption, nothing for audio.
    let body = match kind {
        MessageKind::Text => message.pointer("/text/body"),
        MessageKind::Audio => None,
        _ => message.pointer(&format!("/{type_name}/caption")),
    }
    .and_then(|b| b.as_str())
    .map(str::to_string);
    let media = match kind {
        MessageKind::Text => None,
        _ => message.get(type_name).cloned(),
    };

    let conversation = conversations::get_or_create(db, tenant_id, channel_id, peer_id).await?;
    let row = Message {
        id: Uuid::new_v4().to_string(),
        conversation_id: conversation.id.clone(),
        provider_message_id: provider_message_id.to_string(),
        direction: MessageDirection::In,
        kind,
        body,
        media,
        delivered_at: None,
        read_at: None,
        meta: message
            .get("timestamp")
            .map(|t| serde_json::json!({ "provider_timestamp": t })),
        created_at: String::new(),
    };
    if messages::insert(db, &row).await? {
        conversations::touch_last_message(db, &conversation.id, &now_utc()).await?;
        usage::increment(db, tenant_id, "messages", &usage::current_period(), 1).await?;
    } else {
        debug!(provider_message_id, "duplicate inbound message, skipping");
    }
    Ok(())
}

async fn handle_status(db: &Database, status: &serde_json::Value) -> Result<(), TidewireError> {
    let provider_message_id = status
        .get("id")
        .and_then(|i| i.as_str())
        .ok_or_else(|| TidewireError::Payload("status update missing id".to_string()))?;
    let at = status
        .get("timestamp")
        .and_then(|t| t.as_str())
        .and_then(|t| t.parse::<i64>().ok())
        .map(utc_from_secs)
        .unwrap_or_else(now_utc);

    match status.get("status").and_then(|s| s.as_str()) {
        Some("sent") | None => {}
        Some("delivered") => messages::mark_delivered(db, provider_message_id, &at).await?,
        Some("read") => messages::mark_read(db, provider_message_id, &at).await?,
        Some("failed") => {
            let error = status
                .get("errors")
                .map(|e| e.to_string())
                .unwrap_or_else(|| "delivery failed".to_string());
            messages::record_status_error(db, provider_message_id, &error, &at).await?;
        }
        Some(other) => debug!(status = other, "unrecognized status update, skipping"),
    }
    Ok(())
}
