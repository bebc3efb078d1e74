// SPDX-FileCopyrightText: 2026 Tidewire Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-tenant usage counters, bucketed by period (YYYY-MM).

use rusqlite::params;
use tidewire_core::TidewireError;

use crate::database::{map_tr_err, Database};

/// Add `by` to a tenant's counter for the given metric and period.
pub async fn increment(
    db: &Database,
    tenant_id: &str,
    metric: &str,
    period: &str,
    by: i64,
) -> Result<(), TidewireError> {
    let tenant_id = tenant_id.to_string();
    let metric = metric.to_string();
    let period = period.to_string();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO usage_counters (tenant_id, metric, period, count) \
                 VALUES (?1, ?2, ?3, ?4) \
                 ON CONFLICT(tenant_id, metric, period) DO UPDATE SET \
                 count = count + excluded.count",
                params![tenant_id, metric, period, by],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Current counter value, zero when no row exists.
pub async fn get(
    db: &Database,
    tenant_id: &str,
    metric: &str,
    period: &str,
) -> Result<i64, TidewireError> {
    let tenant_id = tenant_id.to_string();
    let metric = metric.to_string();
    let period = period.to_string();
    db.connection()
        .call(move |conn| {
            let count = conn
                .query_row(
                    "SELECT count FROM usage_counters \
                     WHERE tenant_id = ?1 AND metric = ?2 AND period = ?3",
                    params![tenant_id, metric, period],
                    |row| row.get(0),
                )
                .or_else(|e| match e {
                    rusqlite::Error::QueryReturnedNoRows => Ok(0),
                    other => Err(other),
                })?;
            Ok(count)
        })
        .await
        .map_err(map_tr_err)
}

/// The current YYYY-MM bucket.
pub fn current_period() -> String {
    chrono::Utc::now().format("%Y-%m").to_string()
}
