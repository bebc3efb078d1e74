// SPDX-FileCopyrightText: 2026 Tidewire Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Audit trail for outbound platform API calls.

use rusqlite::params;
use tidewire_core::TidewireError;

use crate::database::{map_tr_err, Database};
use crate::models::{column_json, AuditEntry};

/// Record one platform API interaction. Failures are recorded too; the
/// audit row is written whether or not the call succeeded.
pub async fn record(
    db: &Database,
    channel_id: Option<&str>,
    platform: &str,
    operation: &str,
    request: Option<&serde_json::Value>,
    response: Option<&str>,
    success: bool,
    latency_ms: i64,
) -> Result<(), TidewireError> {
    let channel_id = channel_id.map(str::to_string);
    let platform = platform.to_string();
    let operation = operation.to_string();
    let request = request.map(|r| r.to_string());
    let response = response.map(str::to_string);
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO api_audit_log \
                 (channel_id, platform, operation, request, response, success, latency_ms) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![channel_id, platform, operation, request, response, success, latency_ms],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Most recent audit rows, newest first.
pub async fn list_recent(db: &Database, limit: i64) -> Result<Vec<AuditEntry>, TidewireError> {
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT id, channel_id, platform, operation, request, response, success, \
                 latency_ms, created_at \
                 FROM api_audit_log ORDER BY id DESC LIMIT ?1",
            )?;
            let rows = stmt
                .query_map(params![limit], |row| {
                    Ok(AuditEntry {
                        id: row.get(0)?,
                        channel_id: row.get(1)?,
                        platform: row.get(2)?,
                        operation: row.get(3)?,
                        request: column_json(4, row.get(4)?)?,
                        response: row.get(5)?,
                        success: row.get(6)?,
                        latency_ms: row.get(7)?,
                        created_at: row.get(8)?,
                    })
                })?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(rows)
        })
        .await
        .map_err(map_tr_err)
}
