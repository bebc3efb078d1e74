// SPDX-FileCopyrightText: 2026 Tidewire Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `post.insights` handler: pull engagement counters for a published post.

use std::sync::Arc;

use async_trait::async_trait;
use tidewire_core::traits::AdapterRegistry;
use tidewire_core::types::PostStatus;
use tidewire_core::TidewireError;
use tidewire_storage::models::ScheduledJob;
use tidewire_storage::queries::{channels, posts};
use tidewire_storage::Database;
use tidewire_vault::SecretStore;

use crate::retry::{self, RetryPolicy};
use crate::worker::JobHandler;
use crate::JOB_POST_INSIGHTS;

pub struct InsightsHandler {
    registry: AdapterRegistry,
    secrets: Arc<SecretStore>,
}

impl InsightsHandler {
    pub fn new(registry: AdapterRegistry, secrets: Arc<SecretStore>) -> Self {
        Self { registry, secrets }
    }
}

#[async_trait]
impl JobHandler for InsightsHandler {
    fn job_type(&self) -> &'static str {
        JOB_POST_INSIGHTS
    }

    fn retry_policy(&self) -> RetryPolicy {
        retry::PIPELINE
    }

    async fn run(&self, db: &Database, job: &ScheduledJob) -> Result<(), TidewireError> {
        let post_id = job
            .payload
            .get("post_id")
            .and_then(|p| p.as_str())
            .ok_or_else(|| TidewireError::Payload("insights job missing post_id".to_string()))?;
        let post = posts::get(db, post_id)
            .await?
            .ok_or_else(|| TidewireError::NotFound {
                entity: "post",
                id: post_id.to_string(),
            })?;
        // A post unpublished since scheduling is nothing to measure.
        let provider_post_id = match (&post.status, &post.provider_post_id) {
            (PostStatus::Published, Some(id)) => id.clone(),
            _ => {
                tracing::debug!(post_id = %post.id, status = %post.status, "skipping insights");
                return Ok(());
            }
        };

        let channel = channels::get(db, &post.channel_id)
            .await?
            .ok_or_else(|| TidewireError::NotFound {
                entity: "channel",
                id: post.channel_id.clone(),
            })?;
        let adapter = self.registry.get(channel.kind)?;
        let token = self.secrets.open(&channel.access_token)?;
        let insights = adapter
            .fetch_insights(&channel.to_ref(), &token, &provider_post_id)
            .await?;
        posts::update_insights(db, &post.id, &insights).await
    }
}
