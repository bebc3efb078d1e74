// SPDX-FileCopyrightText: 2026 Tidewire Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `webhook.retention` handler: prune processed webhook events past the
//! retention window, daily.

use async_trait::async_trait;
use tidewire_core::types::JobStatus;
use tidewire_core::TidewireError;
use tidewire_storage::models::{utc_after, ScheduledJob};
use tidewire_storage::queries::{jobs, webhook_events};
use tidewire_storage::Database;

use crate::retry::{self, RetryPolicy};
use crate::worker::JobHandler;
use crate::JOB_WEBHOOK_RETENTION;

/// Processed events older than this are deleted. Pending and failed rows
/// are kept for inspection regardless of age.
const RETENTION_DAYS: i64 = 30;

pub struct RetentionHandler;

#[async_trait]
impl JobHandler for RetentionHandler {
    fn job_type(&self) -> &'static str {
        JOB_WEBHOOK_RETENTION
    }

    fn retry_policy(&self) -> RetryPolicy {
        retry::SWEEP
    }

    async fn run(&self, db: &Database, _job: &ScheduledJob) -> Result<(), TidewireError> {
        let cutoff = utc_after(chrono::Duration::days(-RETENTION_DAYS));
        let deleted = webhook_events::delete_processed_before(db, &cutoff).await?;
        if deleted > 0 {
            tracing::info!(deleted, %cutoff, "pruned processed webhook events");
        }
        if jobs::count(db, JOB_WEBHOOK_RETENTION, JobStatus::Pending).await? == 0 {
            jobs::enqueue(
                db,
                None,
                JOB_WEBHOOK_RETENTION,
                &serde_json::json!({}),
                &utc_after(chrono::Duration::hours(24)),
                retry::SWEEP.total_attempts(),
            )
            .await?;
        }
        Ok(())
    }
}
