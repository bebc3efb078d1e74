// SPDX-FileCopyrightText: 2026 Tidewire Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Conversation get-or-create and bookkeeping.
//!
//! The UNIQUE (channel_id, peer_id) constraint is what makes concurrent
//! webhook jobs safe: two racing inserts converge on one row.

use rusqlite::params;
use tidewire_core::types::ConversationStatus;
use tidewire_core::TidewireError;
use uuid::Uuid;

use crate::database::{map_tr_err, Database};
use crate::models::{column_enum, Conversation};

const CONVERSATION_COLUMNS: &str =
    "id, tenant_id, channel_id, peer_id, status, assigned_to, last_message_at, created_at";

fn row_to_conversation(row: &rusqlite::Row<'_>) -> Result<Conversation, rusqlite::Error> {
    Ok(Conversation {
        id: row.get(0)?,
        tenant_id: row.get(1)?,
        channel_id: row.get(2)?,
        peer_id: row.get(3)?,
        status: column_enum(4, row.get(4)?)?,
        assigned_to: row.get(5)?,
        last_message_at: row.get(6)?,
        created_at: row.get(7)?,
    })
}

/// Returns the conversation for (channel_id, peer_id), creating it on first
/// inbound contact. Never duplicates: `INSERT OR IGNORE` then select.
pub async fn get_or_create(
    db: &Database,
    tenant_id: &str,
    channel_id: &str,
    peer_id: &str,
) -> Result<Conversation, TidewireError> {
    let tenant_id = tenant_id.to_string();
    let channel_id = channel_id.to_string();
    let peer_id = peer_id.to_string();
    let new_id = Uuid::new_v4().to_string();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT OR IGNORE INTO conversations (id, tenant_id, channel_id, peer_id) \
                 VALUES (?1, ?2, ?3, ?4)",
                params![new_id, tenant_id, channel_id, peer_id],
            )?;
            let mut stmt = conn.prepare(&format!(
                "SELECT {CONVERSATION_COLUMNS} FROM conversations \
                 WHERE channel_id = ?1 AND peer_id = ?2"
            ))?;
            let conversation = stmt.query_row(params![channel_id, peer_id], row_to_conversation)?;
            Ok(conversation)
        })
        .await
        .map_err(map_tr_err)
}

/// Fetch a conversation by id.
pub async fn get(db: &Database, id: &str) -> Result<Option<Conversation>, TidewireError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {CONVERSATION_COLUMNS} FROM conversations WHERE id = ?1"
            ))?;
            match stmt.query_row(params![id], row_to_conversation) {
                Ok(conversation) => Ok(Some(conversation)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e.into()),
            }
        })
        .await
        .map_err(map_tr_err)
}

/// Bump last_message_at after persisting a message.
pub async fn touch_last_message(
    db: &Database,
    id: &str,
    at: &str,
) -> Result<(), TidewireError> {
    let id = id.to_string();
    let at = at.to_string();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "UPDATE conversations SET last_message_at = ?2 WHERE id = ?1",
                params![id, at],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Agent status transition (open/closed/pending).
pub async fn set_status(
    db: &Database,
    id: &str,
    status: ConversationStatus,
) -> Result<(), TidewireError> {
    let id = id.to_string();
    let status = status.to_string();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "UPDATE conversations SET status = ?2 WHERE id = ?1",
                params![id, status],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Assign (or unassign with `None`) a conversation to an agent user.
pub async fn assign(
    db: &Database,
    id: &str,
    assigned_to: Option<&str>,
) -> Result<(), TidewireError> {
    let id = id.to_string();
    let assigned_to = assigned_to.map(str::to_string);
    db.connection()
        .call(move |conn| {
            conn.execute(
                "UPDATE conversations SET assigned_to = ?2 WHERE id = ?1",
                params![id, assigned_to],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}
