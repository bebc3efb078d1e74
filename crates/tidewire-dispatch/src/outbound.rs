// SPDX-FileCopyrightText: 2026 Tidewire Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `message.dispatch` handler: deliver one queued outbound message.

use std::sync::Arc;

use async_trait::async_trait;
use tidewire_core::traits::AdapterRegistry;
use tidewire_core::types::{ChannelStatus, MediaRef};
use tidewire_core::TidewireError;
use tidewire_storage::models::{now_utc, Message, ScheduledJob};
use tidewire_storage::queries::{channels, conversations, messages, usage};
use tidewire_storage::Database;
use tidewire_vault::SecretStore;

use crate::retry::{self, RetryPolicy};
use crate::worker::JobHandler;
use crate::JOB_MESSAGE_DISPATCH;

pub struct DispatchHandler {
    registry: AdapterRegistry,
    secrets: Arc<SecretStore>,
}

impl DispatchHandler {
    pub fn new(registry: AdapterRegistry, secrets: Arc<SecretStore>) -> Self {
        Self { registry, secrets }
    }

    fn message_id(job: &ScheduledJob) -> Result<String, TidewireError> {
        job.payload
            .get("message_id")
            .and_then(|m| m.as_str())
            .map(str::to_string)
            .ok_or_else(|| TidewireError::Payload("dispatch job missing message_id".to_string()))
    }

    async fn load_message(db: &Database, id: &str) -> Result<Message, TidewireError> {
        messages::get(db, id)
            .await?
            .ok_or_else(|| TidewireError::NotFound {
                entity: "message",
                id: id.to_string(),
            })
    }

    fn media_refs(message: &Message) -> Vec<MediaRef> {
        message
            .media
            .as_ref()
            .and_then(|m| serde_json::from_value(m.clone()).ok())
            .unwrap_or_default()
    }
}

#[async_trait]
impl JobHandler for DispatchHandler {
    fn job_type(&self) -> &'static str {
        JOB_MESSAGE_DISPATCH
    }

    fn retry_policy(&self) -> RetryPolicy {
        retry::PIPELINE
    }

    async fn run(&self, db: &Database, job: &ScheduledJob) -> Result<(), TidewireError> {
        let message_id = Self::message_id(job)?;
        let message = Self::load_message(db, &message_id).await?;
        if !message.provider_message_id.starts_with("pending_") {
            // An earlier attempt already went through.
            return Ok(());
        }
        let conversation = conversations::get(db, &message.conversation_id)
            .await?
            .ok_or_else(|| TidewireError::NotFound {
                entity: "conversation",
                id: message.conversation_id.clone(),
            })?;
        let channel = channels::get(db, &conversation.channel_id)
            .await?
            .ok_or_else(|| TidewireError::NotFound {
                entity: "channel",
                id: conversation.channel_id.clone(),
            })?;
        if channel.status != ChannelStatus::Active {
            return Err(TidewireError::Precondition(format!(
                "channel {} is not active",
                channel.id
            )));
        }

        let adapter = self.registry.get(channel.kind)?;
        let token = self.secrets.open(&channel.access_token)?;
        let media = Self::media_refs(&message);
        let body = message.body.as_deref().unwrap_or_default();

        // One media attachment per message; extras stay in the stored row.
        let result = adapter
            .send_message(
                &channel.to_ref(),
                &token,
                &conversation.peer_id,
                body,
                media.first(),
            )
            .await;
        match result {
            Ok(receipt) => {
                messages::record_dispatch_success(
                    db,
                    &message.id,
                    &receipt.provider_message_id,
                    &receipt.raw_response,
                )
                .await?;
                conversations::touch_last_message(db, &conversation.id, &now_utc()).await?;
                usage::increment(
                    db,
                    &channel.tenant_id,
                    "messages",
                    &usage::current_period(),
                    1,
                )
                .await?;
                Ok(())
            }
            Err(e) => {
                messages::record_dispatch_error(db, &message.id, &e.to_string(), &now_utc())
                    .await?;
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testsupport::{registry_with, seed_channel, setup_db, MockAdapter};
    use tidewire_core::types::{ChannelKind, JobStatus, MessageDirection, MessageKind};
    use tidewire_storage::queries::jobs;

    async fn queued_message(
        db: &Database,
        conversation_id: &str,
        body: &str,
    ) -> (Message, ScheduledJob) {
        let message = Message {
            id: "msg-1".to_string(),
            conversation_id: conversation_id.to_string(),
            provider_message_id: "pending_0001".to_string(),
            direction: MessageDirection::Out,
            kind: MessageKind::Text,
            body: Some(body.to_string()),
            media: None,
            delivered_at: None,
            read_at: None,
            meta: None,
            created_at: String::new(),
        };
        messages::insert(db, &message).await.unwrap();
        let job_id = jobs::enqueue(
            db,
            Some("t-1"),
            JOB_MESSAGE_DISPATCH,
            &serde_json::json!({"message_id": "msg-1"}),
            &now_utc(),
            4,
        )
        .await
        .unwrap();
        let job = jobs::get(db, job_id).await.unwrap().unwrap();
        (message, job)
    }

    #[tokio::test]
    async fn successful_dispatch_replaces_placeholder() {
        let (db, secrets, _dir) = setup_db().await;
        let channel = seed_channel(&db, &secrets, ChannelKind::Whatsapp).await;
        let conversation = conversations::get_or_create(&db, "t-1", &channel.id, "15550001")
            .await
            .unwrap();
        let (message, job) = queued_message(&db, &conversation.id, "on its way").await;

        let adapter = Arc::new(MockAdapter::succeeding(ChannelKind::Whatsapp, "wamid.new"));
        let handler = DispatchHandler::new(registry_with(adapter.clone()), secrets.clone());
        handler.run(&db, &job).await.unwrap();

        let sent = messages::get(&db, &message.id).await.unwrap().unwrap();
        assert_eq!(sent.provider_message_id, "wamid.new");
        assert!(sent.meta.is_some());
        assert_eq!(adapter.sent_bodies(), vec!["on its way".to_string()]);
        assert_eq!(
            usage::get(&db, "t-1", "messages", &usage::current_period())
                .await
                .unwrap(),
            1
        );

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn platform_failure_records_error_and_propagates() {
        let (db, secrets, _dir) = setup_db().await;
        let channel = seed_channel(&db, &secrets, ChannelKind::Facebook).await;
        let conversation = conversations::get_or_create(&db, "t-1", &channel.id, "u-1")
            .await
            .unwrap();
        let (message, job) = queued_message(&db, &conversation.id, "hello").await;

        let adapter = Arc::new(MockAdapter::failing(ChannelKind::Facebook, 503));
        let handler = DispatchHandler::new(registry_with(adapter), secrets.clone());
        let err = handler.run(&db, &job).await.unwrap_err();
        assert!(matches!(err, TidewireError::Platform { status: 503, .. }));

        let row = messages::get(&db, &message.id).await.unwrap().unwrap();
        assert_eq!(row.provider_message_id, "pending_0001");
        assert!(row.meta.unwrap()["last_error"]
            .as_str()
            .unwrap()
            .contains("503"));

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn inactive_channel_is_a_permanent_error() {
        let (db, secrets, _dir) = setup_db().await;
        let channel = seed_channel(&db, &secrets, ChannelKind::Facebook).await;
        channels::set_status(&db, &channel.id, ChannelStatus::Expired)
            .await
            .unwrap();
        let conversation = conversations::get_or_create(&db, "t-1", &channel.id, "u-1")
            .await
            .unwrap();
        let (_message, job) = queued_message(&db, &conversation.id, "hello").await;

        let adapter = Arc::new(MockAdapter::succeeding(ChannelKind::Facebook, "m_1"));
        let handler = DispatchHandler::new(registry_with(adapter), secrets.clone());
        let err = handler.run(&db, &job).await.unwrap_err();
        assert!(err.is_permanent());

        // Sanity: the job row itself is untouched by the handler.
        let job = jobs::get(&db, job.id).await.unwrap().unwrap();
        assert_eq!(job.status, JobStatus::Pending);

        db.close().await.unwrap();
    }
}
