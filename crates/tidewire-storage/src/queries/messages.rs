// SPDX-FileCopyrightText: 2026 Tidewire Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Message persistence and receipt bookkeeping.
//!
//! `provider_message_id` carries a UNIQUE constraint; `insert` is an
//! `INSERT OR IGNORE` so webhook redelivery is a silent no-op.

use rusqlite::params;
use tidewire_core::types::MessageDirection;
use tidewire_core::TidewireError;

use crate::database::{map_tr_err, Database};
use crate::models::{column_enum, column_json, Message};

const MESSAGE_COLUMNS: &str = "id, conversation_id, provider_message_id, direction, kind, \
     body, media, delivered_at, read_at, meta, created_at";

fn row_to_message(row: &rusqlite::Row<'_>) -> Result<Message, rusqlite::Error> {
    Ok(Message {
        id: row.get(0)?,
        conversation_id: row.get(1)?,
        provider_message_id: row.get(2)?,
        direction: column_enum(3, row.get(3)?)?,
        kind: column_enum(4, row.get(4)?)?,
        body: row.get(5)?,
        media: column_json(6, row.get(6)?)?,
        delivered_at: row.get(7)?,
        read_at: row.get(8)?,
        meta: column_json(9, row.get(9)?)?,
        created_at: row.get(10)?,
    })
}

/// Insert a message unless its provider_message_id already exists.
///
/// Returns `true` if the row was inserted, `false` on an idempotency hit.
pub async fn insert(db: &Database, message: &Message) -> Result<bool, TidewireError> {
    let message = message.clone();
    db.connection()
        .call(move |conn| {
            let inserted = conn.execute(
                "INSERT OR IGNORE INTO messages \
                 (id, conversation_id, provider_message_id, direction, kind, body, media, meta) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                params![
                    message.id,
                    message.conversation_id,
                    message.provider_message_id,
                    message.direction.to_string(),
                    message.kind.to_string(),
                    message.body,
                    message.media.as_ref().map(|m| m.to_string()),
                    message.meta.as_ref().map(|m| m.to_string()),
                ],
            )?;
            Ok(inserted == 1)
        })
        .await
        .map_err(map_tr_err)
}

/// Fetch a message by row id.
pub async fn get(db: &Database, id: &str) -> Result<Option<Message>, TidewireError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {MESSAGE_COLUMNS} FROM messages WHERE id = ?1"
            ))?;
            match stmt.query_row(params![id], row_to_message) {
                Ok(message) => Ok(Some(message)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e.into()),
            }
        })
        .await
        .map_err(map_tr_err)
}

/// Fetch a message by its provider-assigned id.
pub async fn get_by_provider_id(
    db: &Database,
    provider_message_id: &str,
) -> Result<Option<Message>, TidewireError> {
    let provider_message_id = provider_message_id.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {MESSAGE_COLUMNS} FROM messages WHERE provider_message_id = ?1"
            ))?;
            match stmt.query_row(params![provider_message_id], row_to_message) {
                Ok(message) => Ok(Some(message)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e.into()),
            }
        })
        .await
        .map_err(map_tr_err)
}

/// Replace the `pending_<uuid>` placeholder with the platform-assigned id
/// and merge the raw send response into meta. Runs after dispatch success.
pub async fn record_dispatch_success(
    db: &Database,
    id: &str,
    provider_message_id: &str,
    raw_response: &serde_json::Value,
) -> Result<(), TidewireError> {
    let id = id.to_string();
    let provider_message_id = provider_message_id.to_string();
    let patch = serde_json::json!({ "send_response": raw_response }).to_string();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "UPDATE messages SET provider_message_id = ?2, \
                 meta = json_patch(coalesce(meta, '{}'), ?3) WHERE id = ?1",
                params![id, provider_message_id, patch],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Record a dispatch failure into meta (error + timestamp). The row keeps
/// its placeholder provider id so a retry can still find it.
pub async fn record_dispatch_error(
    db: &Database,
    id: &str,
    error: &str,
    at: &str,
) -> Result<(), TidewireError> {
    let id = id.to_string();
    let patch = serde_json::json!({ "last_error": error, "failed_at": at }).to_string();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "UPDATE messages SET meta = json_patch(coalesce(meta, '{}'), ?2) WHERE id = ?1",
                params![id, patch],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Set delivered_at for one provider message id (if not already set).
pub async fn mark_delivered(
    db: &Database,
    provider_message_id: &str,
    at: &str,
) -> Result<(), TidewireError> {
    let provider_message_id = provider_message_id.to_string();
    let at = at.to_string();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "UPDATE messages SET delivered_at = ?2 \
                 WHERE provider_message_id = ?1 AND delivered_at IS NULL",
                params![provider_message_id, at],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Set read_at (and delivered_at, since read implies delivered) for one
/// provider message id.
pub async fn mark_read(
    db: &Database,
    provider_message_id: &str,
    at: &str,
) -> Result<(), TidewireError> {
    let provider_message_id = provider_message_id.to_string();
    let at = at.to_string();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "UPDATE messages SET read_at = coalesce(read_at, ?2), \
                 delivered_at = coalesce(delivered_at, ?2) \
                 WHERE provider_message_id = ?1",
                params![provider_message_id, at],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Record a provider-reported delivery failure against a sent message.
pub async fn record_status_error(
    db: &Database,
    provider_message_id: &str,
    error: &str,
    at: &str,
) -> Result<(), TidewireError> {
    let provider_message_id = provider_message_id.to_string();
    let patch = serde_json::json!({ "status_error": error, "failed_at": at }).to_string();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "UPDATE messages SET meta = json_patch(coalesce(meta, '{}'), ?2) \
                 WHERE provider_message_id = ?1",
                params![provider_message_id, patch],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Mark undelivered outbound messages in a conversation as delivered,
/// bounded by the receipt watermark.
pub async fn mark_delivered_up_to_watermark(
    db: &Database,
    conversation_id: &str,
    watermark: &str,
    at: &str,
) -> Result<usize, TidewireError> {
    let conversation_id = conversation_id.to_string();
    let watermark = watermark.to_string();
    let at = at.to_string();
    db.connection()
        .call(move |conn| {
            let updated = conn.execute(
                "UPDATE messages SET delivered_at = ?3 \
                 WHERE conversation_id = ?1 AND direction = 'out' \
                 AND delivered_at IS NULL AND created_at <= ?2",
                params![conversation_id, watermark, at],
            )?;
            Ok(updated)
        })
        .await
        .map_err(map_tr_err)
}

/// Mark unread outbound messages in a conversation as read, bounded by the
/// receipt watermark: only rows created at or before it are touched.
///
/// Returns the number of messages updated.
pub async fn mark_read_up_to_watermark(
    db: &Database,
    conversation_id: &str,
    watermark: &str,
    at: &str,
) -> Result<usize, TidewireError> {
    let conversation_id = conversation_id.to_string();
    let watermark = watermark.to_string();
    let at = at.to_string();
    db.connection()
        .call(move |conn| {
            let updated = conn.execute(
                "UPDATE messages SET read_at = ?3, delivered_at = coalesce(delivered_at, ?3) \
                 WHERE conversation_id = ?1 AND direction = 'out' \
                 AND read_at IS NULL AND created_at <= ?2",
                params![conversation_id, watermark, at],
            )?;
            Ok(updated)
        })
        .await
        .map_err(map_tr_err)
}

/// Messages in a conversation, oldest first (test and tooling support).
pub async fn list_for_conversation(
    db: &Database,
    conversation_id: &str,
) -> Result<Vec<Message>, TidewireError> {
    let conversation_id = conversation_id.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {MESSAGE_COLUMNS} FROM messages \
                 WHERE conversation_id = ?1 ORDER BY created_at ASC, id ASC"
            ))?;
            let rows = stmt
                .query_map(params![conversation_id], row_to_message)?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(rows)
        })
        .await
        .map_err(map_tr_err)
}

/// Count messages with the given direction in a conversation.
pub async fn count_for_conversation(
    db: &Database,
    conversation_id: &str,
    direction: MessageDirection,
) -> Result<i64, TidewireError> {
    let conversation_id = conversation_id.to_string();
    let direction = direction.to_string();
    db.connection()
        .call(move |conn| {
            let count = conn.query_row(
                "SELECT COUNT(*) FROM messages WHERE conversation_id = ?1 AND direction = ?2",
                params![conversation_id, direction],
                |row| row.get(0),
            )?;
            Ok(count)
        })
        .await
        .map_err(map_tr_err)
}
