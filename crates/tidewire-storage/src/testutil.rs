// SPDX-FileCopyrightText: 2026 Tidewire Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Shared helpers for storage query tests.

use tempfile::tempdir;
use tidewire_core::types::{ChannelKind, ChannelStatus};
use tidewire_vault::SecretStore;
use uuid::Uuid;

use crate::database::Database;
use crate::models::Channel;
use crate::queries::channels;

pub(crate) async fn setup_db() -> (Database, tempfile::TempDir) {
    let dir = tempdir().unwrap();
    let db_path = dir.path().join("test.db");
    let db = Database::open(db_path.to_str().unwrap()).await.unwrap();
    (db, dir)
}

/// Inserts a channel row so conversation/message/post foreign keys hold.
pub(crate) async fn seed_channel(
    db: &Database,
    id: &str,
    tenant_id: &str,
    kind: ChannelKind,
    identifiers: serde_json::Value,
) -> Channel {
    let store = SecretStore::generate().unwrap();
    let channel = Channel {
        id: id.to_string(),
        tenant_id: tenant_id.to_string(),
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

/// A channel with a random id and no particular identifiers.
pub(crate) async fn seed_any_channel(db: &Database, kind: ChannelKind) -> Channel {
    let id = Uuid::new_v4().to_string();
    seed_channel(db, &id, "tenant-1", kind, serde_json::json!({})).await
}
