// SPDX-FileCopyrightText: 2026 Tidewire Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Webhook event store: every verified payload is persisted before any
//! processing happens, so a crash mid-processing never loses an event.

use rusqlite::params;
use tidewire_core::types::Provider;
use tidewire_core::TidewireError;

use crate::database::{map_tr_err, Database};
use crate::models::{column_enum, WebhookEvent};

const EVENT_COLUMNS: &str =
    "id, tenant_id, channel_id, provider, signature, payload, status, processed_at, error, \
     created_at";

fn row_to_event(row: &rusqlite::Row<'_>) -> Result<WebhookEvent, rusqlite::Error> {
    Ok(WebhookEvent {
        id: row.get(0)?,
        tenant_id: row.get(1)?,
        channel_id: row.get(2)?,
        provider: column_enum(3, row.get(3)?)?,
        signature: row.get(4)?,
        payload: row.get(5)?,
        status: column_enum(6, row.get(6)?)?,
        processed_at: row.get(7)?,
        error: row.get(8)?,
        created_at: row.get(9)?,
    })
}

/// Persist a freshly verified payload in `pending` state. Returns the row id,
/// which becomes the processing job's payload.
pub async fn insert(
    db: &Database,
    provider: Provider,
    signature: &str,
    payload: &str,
) -> Result<i64, TidewireError> {
    let provider = provider.to_string();
    let signature = signature.to_string();
    let payload = payload.to_string();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO webhook_events (provider, signature, payload, status) \
                 VALUES (?1, ?2, ?3, 'pending')",
                params![provider, signature, payload],
            )?;
            Ok(conn.last_insert_rowid())
        })
        .await
        .map_err(map_tr_err)
}

/// Fetch an event by id.
pub async fn get(db: &Database, id: i64) -> Result<Option<WebhookEvent>, TidewireError> {
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {EVENT_COLUMNS} FROM webhook_events WHERE id = ?1"
            ))?;
            match stmt.query_row(params![id], row_to_event) {
                Ok(event) => Ok(Some(event)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e.into()),
            }
        })
        .await
        .map_err(map_tr_err)
}

/// Move an event to `processing` and clear any error from a prior attempt.
pub async fn mark_processing(db: &Database, id: i64) -> Result<(), TidewireError> {
    db.connection()
        .call(move |conn| {
            conn.execute(
                "UPDATE webhook_events SET status = 'processing', error = NULL WHERE id = ?1",
                params![id],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Record which tenant and channel an event resolved to, once the payload's
/// external ids have been mapped through the channel directory.
pub async fn resolve(
    db: &Database,
    id: i64,
    tenant_id: &str,
    channel_id: &str,
) -> Result<(), TidewireError> {
    let tenant_id = tenant_id.to_string();
    let channel_id = channel_id.to_string();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "UPDATE webhook_events SET tenant_id = ?2, channel_id = ?3 WHERE id = ?1",
                params![id, tenant_id, channel_id],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Terminal success: `processed` with a timestamp.
pub async fn mark_processed(db: &Database, id: i64, at: &str) -> Result<(), TidewireError> {
    let at = at.to_string();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "UPDATE webhook_events SET status = 'processed', processed_at = ?2 WHERE id = ?1",
                params![id, at],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Record a failed attempt. The job queue decides whether a retry follows;
/// a retry moves the row back through `mark_processing`.
pub async fn mark_failed(db: &Database, id: i64, error: &str) -> Result<(), TidewireError> {
    let error = error.to_string();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "UPDATE webhook_events SET status = 'failed', error = ?2 WHERE id = ?1",
                params![id, error],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Retention sweep: delete events processed before the cutoff. Failed
/// events are kept for inspection. Returns the number of rows deleted.
pub async fn delete_processed_before(
    db: &Database,
    cutoff: &str,
) -> Result<usize, TidewireError> {
    let cutoff = cutoff.to_string();
    db.connection()
        .call(move |conn| {
            let deleted = conn.execute(
                "DELETE FROM webhook_events WHERE status = 'processed' AND processed_at < ?1",
                params![cutoff],
            )?;
            Ok(deleted)
        })
        .await
        .map_err(map_tr_err)
}
