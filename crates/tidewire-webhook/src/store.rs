// SPDX-FileCopyrightText: 2026 Tidewire Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Webhook acceptance: persist first, process later.
//!
//! A verified delivery becomes a `webhook_events` row plus a
//! `webhook.process` job in the same flow; the HTTP response never waits
//! on processing.

use tidewire_core::types::Provider;
use tidewire_core::TidewireError;
use tidewire_storage::models::now_utc;
use tidewire_storage::queries::{jobs, webhook_events};
use tidewire_storage::Database;
use tracing::info;

/// Job type consumed by the worker.
pub const JOB_WEBHOOK_PROCESS: &str = "webhook.process";

// Initial attempt plus the three pipeline retries.
const WEBHOOK_MAX_ATTEMPTS: i64 = 4;

/// Persist a verified webhook payload and enqueue its processing job.
/// Returns the webhook event id.
pub async fn accept(
    db: &Database,
    provider: Provider,
    signature: &str,
    payload: &str,
) -> Result<i64, TidewireError> {
    let event_id = webhook_events::insert(db, provider, signature, payload).await?;
    let job_id = jobs::enqueue(
        db,
        None,
        JOB_WEBHOOK_PROCESS,
        &serde_json::json!({ "event_id": event_id }),
        &now_utc(),
        WEBHOOK_MAX_ATTEMPTS,
    )
    .await?;
    info!(event_id, job_id, provider = %provider, "webhook event accepted");
    Ok(event_id)
}
