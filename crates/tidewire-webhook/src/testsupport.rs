// SPDX-FileCopyrightText: 2026 Tidewire Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Shared helpers for webhook tests.

use tidewire_core::types::{ChannelKind, ChannelStatus, Provider};
use tidewire_storage::models::{Channel, WebhookEvent};
use tidewire_storage::queries::{channels, webhook_events};
use tidewire_storage::Database;
use tidewire_vault::SecretStore;
use uuid::Uuid;

pub(crate) async fn setup_db() -> (Database, tempfile::TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let db = Database::open(dir.path().join("test.db").to_str().unwrap())
        .await
        .unwrap();
    (db, dir)
}

pub(crate) async fn seed_channel(
    db: &Database,
    kind: ChannelKind,
    identifiers: serde_json::Value,
) -> Channel {
    let store = SecretStore::generate().unwrap();
    let channel = Channel {
        id: Uuid::new_v4().to_string(),
        tenant_id: "t-1".to_string(),
        kind,
        identifiers,
        access_token: store.seal("test-token").unwrap(),
        refresh_token: None,
        expires_at: None,
        status: ChannelStatus::Active,
        created_at: String::new(),
        updated_at: String::new(),
    };
    channels::insert(db, &channel).await.unwrap();
    channel
}

pub(crate) async fn stored_event(
    db: &Database,
    provider: Provider,
    payload: serde_json::Value,
) -> WebhookEvent {
    let id = webhook_events::insert(db, provider, "sha256=test", &payload.to_string())
        .await
        .unwrap();
    webhook_events::get(db, id).await.unwrap().unwrap()
}
