// SPDX-FileCopyrightText: 2026 Tidewire Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Collaborator-facing entry points: create and queue outbound messages,
//! schedule posts, attach channels. Each writes its row and enqueues the
//! job that carries the work forward.

use std::sync::Arc;

use tidewire_core::types::{ChannelKind, ChannelStatus, MessageDirection, MessageKind};
use tidewire_core::TidewireError;
use tidewire_storage::models::{now_utc, Channel, Message};
use tidewire_storage::queries::{channels, conversations, jobs, messages, posts};
use tidewire_storage::Database;
use tidewire_vault::SecretStore;
use uuid::Uuid;

use crate::retry;
use crate::{JOB_MESSAGE_DISPATCH, JOB_POST_PUBLISH, JOB_TOKEN_REFRESH};

/// Create an outbound message and queue it for dispatch. The row carries a
/// `pending_` placeholder until the platform assigns a real message id.
pub async fn create_outbound(
    db: &Database,
    conversation_id: &str,
    body: &str,
    media: Option<serde_json::Value>,
) -> Result<Message, TidewireError> {
    let conversation = conversations::get(db, conversation_id)
        .await?
        .ok_or_else(|| TidewireError::NotFound {
            entity: "conversation",
            id: conversation_id.to_string(),
        })?;
    let kind = media
        .as_ref()
        .and_then(|m| m.get(0))
        .and_then(|first| first.get("mime_type"))
        .and_then(|m| m.as_str())
        .map(kind_for_mime)
        .unwrap_or(MessageKind::Text);
    let message = Message {
        id: Uuid::new_v4().to_string(),
        conversation_id: conversation.id.clone(),
        provider_message_id: format!("pending_{}", Uuid::new_v4()),
        direction: MessageDirection::Out,
        kind,
        body: Some(body.to_string()),
        media,
        delivered_at: None,
        read_at: None,
        meta: None,
        created_at: String::new(),
    };
    messages::insert(db, &message).await?;
    jobs::enqueue(
        db,
        Some(&conversation.tenant_id),
        JOB_MESSAGE_DISPATCH,
        &serde_json::json!({ "message_id": message.id }),
        &now_utc(),
        retry::PIPELINE.total_attempts(),
    )
    .await?;
    Ok(message)
}

fn kind_for_mime(mime: &str) -> MessageKind {
    match mime.split('/').next() {
        Some("image") => MessageKind::Image,
        Some("video") => MessageKind::Video,
        Some("audio") => MessageKind::Audio,
        _ => MessageKind::Document,
    }
}

/// Schedule a draft (or previously failed) post and queue its publish job
/// for the scheduled time.
pub async fn schedule_post(
    db: &Database,
    post_id: &str,
    scheduled_for: &str,
) -> Result<(), TidewireError> {
    let post = posts::get(db, post_id)
        .await?
        .ok_or_else(|| TidewireError::NotFound {
            entity: "post",
            id: post_id.to_string(),
        })?;
    if !posts::set_scheduled(db, &post.id, scheduled_for).await? {
        return Err(TidewireError::Precondition(format!(
            "post {} is {} and cannot be scheduled",
            post.id, post.status
        )));
    }
    jobs::enqueue(
        db,
        Some(&post.tenant_id),
        JOB_POST_PUBLISH,
        &serde_json::json!({ "post_id": post.id }),
        scheduled_for,
        retry::PIPELINE.total_attempts(),
    )
    .await?;
    Ok(())
}

/// Attach a platform channel for a tenant, sealing its access token at
/// rest.
#[allow(clippy::too_many_arguments)]
pub async fn attach_channel(
    db: &Database,
    secrets: &Arc<SecretStore>,
    tenant_id: &str,
    kind: ChannelKind,
    identifiers: serde_json::Value,
    access_token: &str,
    expires_at: Option<String>,
) -> Result<Channel, TidewireError> {
    let channel = Channel {
        id: Uuid::new_v4().to_string(),
        tenant_id: tenant_id.to_string(),
        kind,
        identifiers,
        access_token: secrets.seal(access_token)?,
        refresh_token: None,
        expires_at,
        status: ChannelStatus::Active,
        created_at: String::new(),
        updated_at: String::new(),
    };
    channels::insert(db, &channel).await?;
    tracing::info!(channel_id = %channel.id, kind = %kind, "channel attached");
    Ok(channel)
}

/// Queue an immediate token refresh for one channel.
pub async fn request_token_refresh(
    db: &Database,
    channel_id: &str,
) -> Result<i64, TidewireError> {
    let channel = channels::get(db, channel_id)
        .await?
        .ok_or_else(|| TidewireError::NotFound {
            entity: "channel",
            id: channel_id.to_string(),
        })?;
    jobs::enqueue(
        db,
        Some(&channel.tenant_id),
        JOB_TOKEN_REFRESH,
        &serde_json::json!({ "channel_id": channel.id }),
        &now_utc(),
        retry::PIPELINE.total_attempts(),
    )
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testsupport::{seed_channel, setup_db};
    use tidewire_core::types::JobStatus;

    #[tokio::test]
    async fn create_outbound_queues_a_dispatch_job() {
        let (db, secrets, _dir) = setup_db().await;
        let channel = seed_channel(&db, &secrets, ChannelKind::Whatsapp).await;
        let conversation = conversations::get_or_create(&db, "t-1", &channel.id, "+1555")
            .await
            .unwrap();

        let message = create_outbound(&db, &conversation.id, "hello there", None)
            .await
            .unwrap();
        assert!(message.provider_message_id.starts_with("pending_"));
        assert_eq!(message.direction, MessageDirection::Out);
        assert_eq!(message.kind, MessageKind::Text);
        assert_eq!(
            jobs::count(&db, JOB_MESSAGE_DISPATCH, JobStatus::Pending)
                .await
                .unwrap(),
            1
        );

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn media_sets_the_message_kind() {
        let (db, secrets, _dir) = setup_db().await;
        let channel = seed_channel(&db, &secrets, ChannelKind::Whatsapp).await;
        let conversation = conversations::get_or_create(&db, "t-1", &channel.id, "+1555")
            .await
            .unwrap();

        let media = serde_json::json!([
            {"id": "a1", "url": "https://cdn.example.com/a.jpg", "mime_type": "image/jpeg"}
        ]);
        let message = create_outbound(&db, &conversation.id, "look", Some(media))
            .await
            .unwrap();
        assert_eq!(message.kind, MessageKind::Image);

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn scheduling_a_published_post_is_rejected() {
        let (db, secrets, _dir) = setup_db().await;
        let channel = seed_channel(&db, &secrets, ChannelKind::Facebook).await;
        let post = tidewire_storage::models::Post {
            id: Uuid::new_v4().to_string(),
            tenant_id: "t-1".to_string(),
            channel_id: channel.id.clone(),
            caption: "done already".to_string(),
            media: serde_json::json!([]),
            status: tidewire_core::types::PostStatus::Draft,
            scheduled_for: None,
            published_at: None,
            provider_post_id: None,
            error: None,
            likes: 0,
            comments: 0,
            shares: 0,
            impressions: 0,
            reach: 0,
            created_at: String::new(),
        };
        posts::insert(&db, &post).await.unwrap();
        posts::mark_published(&db, &post.id, "fb_1", &now_utc())
            .await
            .unwrap();

        let err = schedule_post(&db, &post.id, &now_utc()).await.unwrap_err();
        assert!(err.is_permanent());
        assert_eq!(
            jobs::count(&db, JOB_POST_PUBLISH, JobStatus::Pending)
                .await
                .unwrap(),
            0
        );

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn attach_channel_seals_the_token() {
        let (db, secrets, _dir) = setup_db().await;
        let channel = attach_channel(
            &db,
            &secrets,
            "t-1",
            ChannelKind::Facebook,
            serde_json::json!({"page_id": "p-9"}),
            "plain-token",
            None,
        )
        .await
        .unwrap();

        let stored = channels::get(&db, &channel.id).await.unwrap().unwrap();
        use secrecy::ExposeSecret;
        assert_eq!(
            secrets.open(&stored.access_token).unwrap().expose_secret(),
            "plain-token"
        );
        assert_eq!(stored.status, ChannelStatus::Active);

        let job_id = request_token_refresh(&db, &channel.id).await.unwrap();
        let job = jobs::get(&db, job_id).await.unwrap().unwrap();
        assert_eq!(job.job_type, JOB_TOKEN_REFRESH);

        db.close().await.unwrap();
    }
}
