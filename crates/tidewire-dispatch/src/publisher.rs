// SPDX-FileCopyrightText: 2026 Tidewire Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `post.publish` handler: push a scheduled post to its platform.

use std::sync::Arc;

use async_trait::async_trait;
use tidewire_core::traits::AdapterRegistry;
use tidewire_core::types::{ChannelStatus, MediaRef, PostStatus};
use tidewire_core::TidewireError;
use tidewire_storage::models::{now_utc, utc_after, Post, ScheduledJob};
use tidewire_storage::queries::{channels, jobs, posts};
use tidewire_storage::Database;
use tidewire_vault::SecretStore;

use crate::retry::{self, RetryPolicy};
use crate::worker::JobHandler;
use crate::{JOB_POST_INSIGHTS, JOB_POST_PUBLISH};

/// Insights are pulled a little after publication so early engagement has
/// landed.
const INSIGHTS_DELAY_MINUTES: i64 = 10;

pub struct PublishHandler {
    registry: AdapterRegistry,
    secrets: Arc<SecretStore>,
    media_base_url: Option<String>,
}

impl PublishHandler {
    pub fn new(
        registry: AdapterRegistry,
        secrets: Arc<SecretStore>,
        media_base_url: Option<String>,
    ) -> Self {
        Self {
            registry,
            secrets,
            media_base_url,
        }
    }

    fn post_id(job: &ScheduledJob) -> Result<String, TidewireError> {
        job.payload
            .get("post_id")
            .and_then(|p| p.as_str())
            .map(str::to_string)
            .ok_or_else(|| TidewireError::Payload("publish job missing post_id".to_string()))
    }

    async fn load_post(db: &Database, id: &str) -> Result<Post, TidewireError> {
        posts::get(db, id).await?.ok_or_else(|| TidewireError::NotFound {
            entity: "post",
            id: id.to_string(),
        })
    }

    /// Media refs with storage-relative URLs resolved against the public
    /// base URL.
    fn resolve_media(&self, post: &Post) -> Result<Vec<MediaRef>, TidewireError> {
        let refs: Vec<MediaRef> = serde_json::from_value(post.media.clone())
            .map_err(|e| TidewireError::Payload(format!("post media malformed: {e}")))?;
        refs.into_iter()
            .map(|mut media| {
                if media.url.starts_with("http://") || media.url.starts_with("https://") {
                    return Ok(media);
                }
                let base = self.media_base_url.as_deref().ok_or_else(|| {
                    TidewireError::Precondition(
                        "relative media url with no media.public_base_url configured".to_string(),
                    )
                })?;
                media.url = format!(
                    "{}/{}",
                    base.trim_end_matches('/'),
                    media.url.trim_start_matches('/')
                );
                Ok(media)
            })
            .collect()
    }
}

#[async_trait]
impl JobHandler for PublishHandler {
    fn job_type(&self) -> &'static str {
        JOB_POST_PUBLISH
    }

    fn retry_policy(&self) -> RetryPolicy {
        retry::PIPELINE
    }

    async fn run(&self, db: &Database, job: &ScheduledJob) -> Result<(), TidewireError> {
        let post_id = Self::post_id(job)?;
        let post = Self::load_post(db, &post_id).await?;
        match post.status {
            // An earlier attempt already went out.
            PostStatus::Published => return Ok(()),
            // Scheduled first attempt, or failed earlier attempt retrying.
            PostStatus::Scheduled | PostStatus::Failed => {}
            PostStatus::Draft => {
                return Err(TidewireError::Precondition(format!(
                    "post {} is a draft, not scheduled",
                    post.id
                )))
            }
        }

        let channel = channels::get(db, &post.channel_id)
            .await?
            .ok_or_else(|| TidewireError::NotFound {
                entity: "channel",
                id: post.channel_id.clone(),
            })?;
        if channel.status != ChannelStatus::Active {
            return Err(TidewireError::Precondition(format!(
                "channel {} is not active",
                channel.id
            )));
        }

        let outcome = async {
            let media = self.resolve_media(&post)?;
            let adapter = self.registry.get(channel.kind)?;
            let token = self.secrets.open(&channel.access_token)?;
            adapter
                .publish_post(&channel.to_ref(), &token, &post.caption, &media)
                .await
        }
        .await;

        match outcome {
            Ok(receipt) => {
                posts::mark_published(db, &post.id, &receipt.provider_post_id, &now_utc())
                    .await?;
                jobs::enqueue(
                    db,
                    Some(&post.tenant_id),
                    JOB_POST_INSIGHTS,
                    &serde_json::json!({ "post_id": post.id }),
                    &utc_after(chrono::Duration::minutes(INSIGHTS_DELAY_MINUTES)),
                    retry::PIPELINE.total_attempts(),
                )
                .await?;
                Ok(())
            }
            Err(e) => {
                posts::mark_failed(db, &post.id, &e.to_string()).await?;
                Err(e)
            }
        }
    }

    /// The row already carries the last error from `run`; re-marking keeps
    /// this idempotent when the budget runs out between attempts.
    async fn on_permanent_failure(
        &self,
        db: &Database,
        job: &ScheduledJob,
        error: &TidewireError,
    ) -> Result<(), TidewireError> {
        let post_id = Self::post_id(job)?;
        posts::mark_failed(db, &post_id, &error.to_string()).await
    }
}
