// SPDX-FileCopyrightText: 2026 Tidewire Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Shared helpers for dispatch tests: in-memory platform adapter and
//! channel seeding.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use secrecy::SecretString;
use tidewire_core::traits::{AdapterRegistry, ChannelRef, PlatformAdapter};
use tidewire_core::types::{
    ChannelKind, ChannelStatus, MediaRef, PostInsights, PublishReceipt, SendReceipt,
};
use tidewire_core::TidewireError;
use tidewire_storage::models::Channel;
use tidewire_storage::queries::channels;
use tidewire_storage::Database;
use tidewire_vault::SecretStore;
use uuid::Uuid;

pub(crate) async fn setup_db() -> (Database, Arc<SecretStore>, tempfile::TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let db = Database::open(dir.path().join("test.db").to_str().unwrap())
        .await
        .unwrap();
    (db, Arc::new(SecretStore::generate().unwrap()), dir)
}

pub(crate) async fn seed_channel(
    db: &Database,
    secrets: &SecretStore,
    kind: ChannelKind,
) -> Channel {
    let identifiers = match kind {
        ChannelKind::Facebook => serde_json::json!({"page_id": "p-1"}),
        ChannelKind::Instagram => serde_json::json!({"instagram_account_id": "ig-1"}),
        ChannelKind::Whatsapp => serde_json::json!({"phone_number_id": "555"}),
    };
    let channel = Channel {
        id: Uuid::new_v4().to_string(),
        tenant_id: "t-1".to_string(),
        kind,
        identifiers,
        access_token: secrets.seal("test-token").unwrap(),
        refresh_token: None,
        expires_at: None,
        status: ChannelStatus::Active,
        created_at: String::new(),
        updated_at: String::new(),
    };
    channels::insert(db, &channel).await.unwrap();
    channel
}

pub(crate) fn registry_with(adapter: Arc<MockAdapter>) -> AdapterRegistry {
    let mut registry = AdapterRegistry::new();
    registry.register(adapter);
    registry
}

enum Behavior {
    Succeed,
    Fail { status: u16 },
    FailFirst { failures: usize },
}

/// Scripted in-memory adapter recording what it was asked to send.
pub(crate) struct MockAdapter {
    kind: ChannelKind,
    behavior: Behavior,
    provider_id: String,
    calls: AtomicUsize,
    bodies: Mutex<Vec<String>>,
    captions: Mutex<Vec<String>>,
}

impl MockAdapter {
    pub(crate) fn succeeding(kind: ChannelKind, provider_id: &str) -> Self {
        Self::build(kind, Behavior::Succeed, provider_id)
    }

    pub(crate) fn failing(kind: ChannelKind, status: u16) -> Self {
        Self::build(kind, Behavior::Fail { status }, "")
    }

    pub(crate) fn failing_first(kind: ChannelKind, failures: usize, provider_id: &str) -> Self {
        Self::build(kind, Behavior::FailFirst { failures }, provider_id)
    }

    fn build(kind: ChannelKind, behavior: Behavior, provider_id: &str) -> Self {
        Self {
            kind,
            behavior,
            provider_id: provider_id.to_string(),
            calls: AtomicUsize::new(0),
            bodies: Mutex::new(Vec::new()),
            captions: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub(crate) fn sent_bodies(&self) -> Vec<String> {
        self.bodies.lock().unwrap().clone()
    }

    pub(crate) fn published_captions(&self) -> Vec<String> {
        self.captions.lock().unwrap().clone()
    }

    fn outcome(&self) -> Result<(), TidewireError> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst);
        let failed = match self.behavior {
            Behavior::Succeed => None,
            Behavior::Fail { status } => Some(status),
            Behavior::FailFirst { failures } => (n < failures).then_some(503),
        };
        match failed {
            Some(status) => Err(TidewireError::Platform {
                operation: "mock".to_string(),
                status,
                body: format!("{{\"error\":{status}}}"),
            }),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl PlatformAdapter for MockAdapter {
    fn kind(&self) -> ChannelKind {
        self.kind
    }

    async fn send_message(
        &self,
        _channel: &ChannelRef,
        _token: &SecretString,
        _peer_id: &str,
        body: &str,
        _media: Option<&MediaRef>,
    ) -> Result<SendReceipt, TidewireError> {
        self.outcome()?;
        self.bodies.lock().unwrap().push(body.to_string());
        Ok(SendReceipt {
            provider_message_id: self.provider_id.clone(),
            raw_response: serde_json::json!({"message_id": self.provider_id}),
        })
    }

    async fn publish_post(
        &self,
        _channel: &ChannelRef,
        _token: &SecretString,
        caption: &str,
        media: &[MediaRef],
    ) -> Result<PublishReceipt, TidewireError> {
        if self.kind == ChannelKind::Instagram && media.is_empty() {
            return Err(TidewireError::Precondition(
                "instagram posts require media".to_string(),
            ));
        }
        self.outcome()?;
        self.captions.lock().unwrap().push(caption.to_string());
        Ok(PublishReceipt {
            provider_post_id: self.provider_id.clone(),
            raw_response: serde_json::json!({"id": self.provider_id}),
        })
    }

    async fn reply_comment(
        &self,
        _channel: &ChannelRef,
        _token: &SecretString,
        _provider_comment_id: &str,
        _body: &str,
    ) -> Result<String, TidewireError> {
        self.outcome()?;
        Ok(format!("{}_reply", self.provider_id))
    }

    async fn hide_comment(
        &self,
        _channel: &ChannelRef,
        _token: &SecretString,
        _provider_comment_id: &str,
        _hidden: bool,
    ) -> Result<(), TidewireError> {
        self.outcome()
    }

    async fn delete_comment(
        &self,
        _channel: &ChannelRef,
        _token: &SecretString,
        _provider_comment_id: &str,
    ) -> Result<(), TidewireError> {
        self.outcome()
    }

    async fn fetch_insights(
        &self,
        _channel: &ChannelRef,
        _token: &SecretString,
        _provider_post_id: &str,
    ) -> Result<PostInsights, TidewireError> {
        self.outcome()?;
        Ok(PostInsights {
            likes: 10,
            comments: 2,
            shares: 1,
            impressions: 500,
            reach: 300,
        })
    }
}
