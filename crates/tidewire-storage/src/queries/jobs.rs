// SPDX-FileCopyrightText: 2026 Tidewire Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Durable job queue for crash-safe background processing.
//!
//! Every deferred unit of work (webhook processing, outbound dispatch, post
//! publication, token refresh, periodic sweeps) is a `scheduled_jobs` row.
//! The worker claims due rows transactionally so two ticks never run the
//! same job.

use rusqlite::params;
use tidewire_core::TidewireError;

use crate::database::{map_tr_err, Database};
use crate::models::{column_enum, column_json, ScheduledJob};

const JOB_COLUMNS: &str = "id, tenant_id, job_type, payload, run_at, status, attempts, \
     max_attempts, started_at, completed_at, error, created_at";

fn row_to_job(row: &rusqlite::Row<'_>) -> Result<ScheduledJob, rusqlite::Error> {
    let payload: String = row.get(3)?;
    let payload = column_json(3, Some(payload))?.unwrap_or(serde_json::Value::Null);
    Ok(ScheduledJob {
        id: row.get(0)?,
        tenant_id: row.get(1)?,
        job_type: row.get(2)?,
        payload,
        run_at: row.get(4)?,
        status: column_enum(5, row.get(5)?)?,
        attempts: row.get(6)?,
        max_attempts: row.get(7)?,
        started_at: row.get(8)?,
        completed_at: row.get(9)?,
        error: row.get(10)?,
        created_at: row.get(11)?,
    })
}

/// Enqueue a job to run at `run_at`. Returns the auto-generated job id.
pub async fn enqueue(
    db: &Database,
    tenant_id: Option<&str>,
    job_type: &str,
    payload: &serde_json::Value,
    run_at: &str,
    max_attempts: i64,
) -> Result<i64, TidewireError> {
    let tenant_id = tenant_id.map(str::to_string);
    let job_type = job_type.to_string();
    let payload = payload.to_string();
    let run_at = run_at.to_string();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO scheduled_jobs (tenant_id, job_type, payload, run_at, max_attempts) \
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![tenant_id, job_type, payload, run_at, max_attempts],
            )?;
            Ok(conn.last_insert_rowid())
        })
        .await
        .map_err(map_tr_err)
}

/// Claim up to `limit` due pending jobs, oldest run_at first.
///
/// Runs in one transaction: the selected rows flip to `running` with
/// attempts incremented before the claim is visible, so a concurrent tick
/// sees nothing to take.
pub async fn claim_due(
    db: &Database,
    now: &str,
    limit: i64,
) -> Result<Vec<ScheduledJob>, TidewireError> {
    let now = now.to_string();
    db.connection()
        .call(move |conn| {
            let tx = conn.transaction()?;

            let due = {
                let mut stmt = tx.prepare(&format!(
                    "SELECT {JOB_COLUMNS} FROM scheduled_jobs \
                     WHERE status = 'pending' AND run_at <= ?1 \
                     ORDER BY run_at ASC, id ASC LIMIT ?2"
                ))?;
                let rows = stmt
                    .query_map(params![now, limit], row_to_job)?
                    .collect::<Result<Vec<_>, _>>()?;
                rows
            };

            let mut claimed = Vec::with_capacity(due.len());
            for job in due {
                tx.execute(
                    "UPDATE scheduled_jobs SET status = 'running', \
                     attempts = attempts + 1, started_at = ?2 WHERE id = ?1",
                    params![job.id, now],
                )?;
                claimed.push(ScheduledJob {
                    status: tidewire_core::types::JobStatus::Running,
                    attempts: job.attempts + 1,
                    started_at: Some(now.clone()),
                    ..job
                });
            }
            tx.commit()?;
            Ok(claimed)
        })
        .await
        .map_err(map_tr_err)
}

/// Mark a job as completed.
pub async fn complete(db: &Database, id: i64, at: &str) -> Result<(), TidewireError> {
    let at = at.to_string();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "UPDATE scheduled_jobs SET status = 'completed', completed_at = ?2 \
                 WHERE id = ?1",
                params![id, at],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Record a failed attempt.
///
/// With `retry_at` set the job returns to `pending` at that time; without,
/// it lands in terminal `failed`. The caller decides which, based on its
/// retry policy and the attempt count.
pub async fn fail(
    db: &Database,
    id: i64,
    error: &str,
    retry_at: Option<&str>,
) -> Result<(), TidewireError> {
    let error = error.to_string();
    let retry_at = retry_at.map(str::to_string);
    db.connection()
        .call(move |conn| {
            match retry_at {
                Some(run_at) => conn.execute(
                    "UPDATE scheduled_jobs SET status = 'pending', run_at = ?2, error = ?3 \
                     WHERE id = ?1",
                    params![id, run_at, error],
                )?,
                None => conn.execute(
                    "UPDATE scheduled_jobs SET status = 'failed', error = ?2, \
                     completed_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now') WHERE id = ?1",
                    params![id, error],
                )?,
            };
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Fetch a job by id.
pub async fn get(db: &Database, id: i64) -> Result<Option<ScheduledJob>, TidewireError> {
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {JOB_COLUMNS} FROM scheduled_jobs WHERE id = ?1"
            ))?;
            match stmt.query_row(params![id], row_to_job) {
                Ok(job) => Ok(Some(job)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e.into()),
            }
        })
        .await
        .map_err(map_tr_err)
}

/// Count jobs of one type in one status (test and health support).
pub async fn count(
    db: &Database,
    job_type: &str,
    status: tidewire_core::types::JobStatus,
) -> Result<i64, TidewireError> {
    let job_type = job_type.to_string();
    let status = status.to_string();
    db.connection()
        .call(move |conn| {
            let count = conn.query_row(
                "SELECT COUNT(*) FROM scheduled_jobs WHERE job_type = ?1 AND status = ?2",
                params![job_type, status],
                |row| row.get(0),
            )?;
            Ok(count)
        })
        .await
        .map_err(map_tr_err)
}
