// SPDX-FileCopyrightText: 2026 Tidewire Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Webhook payload processors.
//!
//! [`process_event`] drives one stored event through the state machine:
//! pending → processing → processed, or → failed with the error recorded.
//! Failures propagate to the job queue, whose retry policy re-runs the
//! whole event; processors are idempotent so a partial first attempt is
//! safe to replay.

pub mod meta;
pub mod whatsapp;

use tidewire_core::types::Provider;
use tidewire_core::TidewireError;
use tidewire_storage::models::now_utc;
use tidewire_storage::queries::webhook_events;
use tidewire_storage::Database;
use tracing::warn;

/// Process one stored webhook event by id.
pub async fn process_event(db: &Database, event_id: i64) -> Result<(), TidewireError> {
    let event = webhook_events::get(db, event_id)
        .await?
        .ok_or_else(|| TidewireError::NotFound {
            entity: "webhook event",
            id: event_id.to_string(),
        })?;

    webhook_events::mark_processing(db, event.id).await?;

    let outcome = match event.provider {
        Provider::Facebook => meta::process(db, &event).await,
        Provider::Whatsapp => whatsapp::process(db, &event).await,
    };

    match outcome {
        Ok(()) => webhook_events::mark_processed(db, event.id, &now_utc()).await,
        Err(e) => {
            warn!(event_id = event.id, error = %e, "webhook event processing failed");
            webhook_events::mark_failed(db, event.id, &e.to_string()).await?;
            Err(e)
        }
    }
}

pub(crate) fn parse_payload(payload: &str) -> Result<serde_json::Value, TidewireError> {
    serde_json::from_str(payload)
        .map_err(|e| TidewireError::Payload(format!("invalid webhook JSON: {e}")))
}

/// The `entry` array every Meta-family payload carries.
pub(crate) fn entries(root: &serde_json::Value) -> Result<&Vec<serde_json::Value>, TidewireError> {
    root.get("entry")
        .and_then(|e| e.as_array())
        .ok_or_else(|| TidewireError::Payload("payload has no entry array".to_string()))
}
