// SPDX-FileCopyrightText: 2026 Tidewire Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Long-lived token maintenance: per-channel refresh jobs plus the daily
//! sweep that finds channels nearing expiry.

use std::sync::Arc;

use async_trait::async_trait;
use secrecy::ExposeSecret;
use tidewire_core::types::{ChannelStatus, JobStatus};
use tidewire_core::TidewireError;
use tidewire_graph::oauth;
use tidewire_graph::GraphClient;
use tidewire_storage::models::{utc_after, ScheduledJob};
use tidewire_storage::queries::{channels, jobs};
use tidewire_storage::Database;
use tidewire_vault::SecretStore;

use crate::retry::{self, RetryPolicy};
use crate::worker::JobHandler;
use crate::{JOB_TOKEN_REFRESH, JOB_TOKEN_SWEEP};

/// Channels expiring within this window get queued for refresh.
const SWEEP_HORIZON_DAYS: i64 = 5;

pub struct TokenRefreshHandler {
    client: GraphClient,
    secrets: Arc<SecretStore>,
    app_id: Option<String>,
    app_secret: Option<String>,
}

impl TokenRefreshHandler {
    pub fn new(
        client: GraphClient,
        secrets: Arc<SecretStore>,
        app_id: Option<String>,
        app_secret: Option<String>,
    ) -> Self {
        Self {
            client,
            secrets,
            app_id,
            app_secret,
        }
    }
}

#[async_trait]
impl JobHandler for TokenRefreshHandler {
    fn job_type(&self) -> &'static str {
        JOB_TOKEN_REFRESH
    }

    fn retry_policy(&self) -> RetryPolicy {
        retry::PIPELINE
    }

    async fn run(&self, db: &Database, job: &ScheduledJob) -> Result<(), TidewireError> {
        let channel_id = job
            .payload
            .get("channel_id")
            .and_then(|c| c.as_str())
            .ok_or_else(|| TidewireError::Payload("refresh job missing channel_id".to_string()))?;
        let app_id = self
            .app_id
            .as_deref()
            .ok_or_else(|| TidewireError::Config("meta.app_id is not set".to_string()))?;
        let app_secret = self
            .app_secret
            .as_deref()
            .ok_or_else(|| TidewireError::Config("meta.app_secret is not set".to_string()))?;

        let channel = channels::get(db, channel_id)
            .await?
            .ok_or_else(|| TidewireError::NotFound {
                entity: "channel",
                id: channel_id.to_string(),
            })?;
        if channel.status == ChannelStatus::Revoked {
            tracing::debug!(channel_id = %channel.id, "skipping refresh for revoked channel");
            return Ok(());
        }

        let current = self.secrets.open(&channel.access_token)?;
        let outcome =
            oauth::exchange_token(&self.client, &channel.id, app_id, app_secret, &current).await;
        match outcome {
            Ok(refreshed) => {
                let sealed = self.secrets.seal(refreshed.access_token.expose_secret())?;
                let expires_at = utc_after(chrono::Duration::seconds(refreshed.expires_in_secs));
                channels::update_token(db, &channel.id, &sealed, &expires_at).await?;
                tracing::info!(channel_id = %channel.id, %expires_at, "token refreshed");
                Ok(())
            }
            Err(e) => {
                channels::set_status(db, &channel.id, ChannelStatus::Error).await?;
                Err(e)
            }
        }
    }
}

/// Daily sweep: enqueue a refresh for every channel expiring soon, then
/// re-arm itself for tomorrow.
pub struct TokenSweepHandler;

#[async_trait]
impl JobHandler for TokenSweepHandler {
    fn job_type(&self) -> &'static str {
        JOB_TOKEN_SWEEP
    }

    fn retry_policy(&self) -> RetryPolicy {
        retry::SWEEP
    }

    async fn run(&self, db: &Database, _job: &ScheduledJob) -> Result<(), TidewireError> {
        let cutoff = utc_after(chrono::Duration::days(SWEEP_HORIZON_DAYS));
        let expiring = channels::expiring_before(db, &cutoff).await?;
        for channel in &expiring {
            jobs::enqueue(
                db,
                Some(&channel.tenant_id),
                JOB_TOKEN_REFRESH,
                &serde_json::json!({ "channel_id": channel.id }),
                &tidewire_storage::models::now_utc(),
                retry::PIPELINE.total_attempts(),
            )
            .await?;
        }
        if !expiring.is_empty() {
            tracing::info!(count = expiring.len(), "queued token refreshes");
        }
        // One sweep row is always pending so the cycle never stops.
        if jobs::count(db, JOB_TOKEN_SWEEP, JobStatus::Pending).await? == 0 {
            jobs::enqueue(
                db,
                None,
                JOB_TOKEN_SWEEP,
                &serde_json::json!({}),
                &utc_after(chrono::Duration::hours(24)),
                retry::SWEEP.total_attempts(),
            )
            .await?;
        }
        Ok(())
    }
}
