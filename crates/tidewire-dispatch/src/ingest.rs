// SPDX-FileCopyrightText: 2026 Tidewire Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `webhook.process` handler: run the payload processor for one stored
//! webhook event.

use async_trait::async_trait;
use tidewire_core::TidewireError;
use tidewire_storage::models::ScheduledJob;
use tidewire_storage::Database;
use tidewire_webhook::processor;
use tidewire_webhook::store::JOB_WEBHOOK_PROCESS;

use crate::retry::{self, RetryPolicy};
use crate::worker::JobHandler;

pub struct WebhookProcessHandler;

#[async_trait]
impl JobHandler for WebhookProcessHandler {
    fn job_type(&self) -> &'static str {
        JOB_WEBHOOK_PROCESS
    }

    fn retry_policy(&self) -> RetryPolicy {
        retry::PIPELINE
    }

    /// The processor owns the event state machine; this handler only maps
    /// the job payload to an event id. Failed events keep the error the
    /// processor recorded, so no extra bookkeeping on permanent failure.
    async fn run(&self, db: &Database, job: &ScheduledJob) -> Result<(), TidewireError> {
        let event_id = job
            .payload
            .get("event_id")
            .and_then(|e| e.as_i64())
            .ok_or_else(|| TidewireError::Payload("process job missing event_id".to_string()))?;
        processor::process_event(db, event_id).await
    }
}
