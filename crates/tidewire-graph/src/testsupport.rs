// SPDX-FileCopyrightText: 2026 Tidewire Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Shared helpers for adapter tests.

use secrecy::SecretString;
use tidewire_core::traits::ChannelRef;
use tidewire_core::types::ChannelKind;
use tidewire_storage::Database;

use crate::client::CallScope;

pub(crate) async fn test_db() -> (Database, tempfile::TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("test.db");
    let db = Database::open(db_path.to_str().unwrap()).await.unwrap();
    (db, dir)
}

pub(crate) fn token(value: &str) -> SecretString {
    SecretString::from(value.to_string())
}

pub(crate) fn scoped(operation: &'static str) -> CallScope<'static> {
    CallScope {
        channel_id: Some("ch-1"),
        platform: "facebook",
        operation,
    }
}

pub(crate) fn channel(kind: ChannelKind, identifiers: serde_json::Value) -> ChannelRef {
    ChannelRef {
        id: "ch-1".to_string(),
        tenant_id: "t-1".to_string(),
        kind,
        identifiers,
    }
}
