// SPDX-FileCopyrightText: 2026 Tidewire Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Channel directory: maps platform external ids to tenant channels and
//! holds the sealed credentials mutated by the token refresher.

use rusqlite::params;
use tidewire_core::types::{ChannelKind, ChannelStatus};
use tidewire_core::TidewireError;
use tidewire_vault::SealedSecret;

use crate::database::{map_tr_err, Database};
use crate::models::{column_enum, Channel};

const CHANNEL_COLUMNS: &str = "id, tenant_id, kind, identifiers, access_token_ct, \
     access_token_nonce, refresh_token_ct, refresh_token_nonce, expires_at, status, \
     created_at, updated_at";

fn row_to_channel(row: &rusqlite::Row<'_>) -> Result<Channel, rusqlite::Error> {
    let identifiers_raw: String = row.get(3)?;
    let identifiers = serde_json::from_str(&identifiers_raw).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(3, rusqlite::types::Type::Text, Box::new(e))
    })?;

    let nonce = |idx: usize, bytes: Vec<u8>| -> Result<[u8; 12], rusqlite::Error> {
        bytes.try_into().map_err(|_| {
            rusqlite::Error::FromSqlConversionFailure(
                idx,
                rusqlite::types::Type::Blob,
                "nonce column is not 12 bytes".into(),
            )
        })
    };

    let access_token = SealedSecret {
        ciphertext: row.get(4)?,
        nonce: nonce(5, row.get(5)?)?,
    };

    let refresh_token = match (
        row.get::<_, Option<Vec<u8>>>(6)?,
        row.get::<_, Option<Vec<u8>>>(7)?,
    ) {
        (Some(ct), Some(n)) => Some(SealedSecret {
            ciphertext: ct,
            nonce: nonce(7, n)?,
        }),
        _ => None,
    };

    Ok(Channel {
        id: row.get(0)?,
        tenant_id: row.get(1)?,
        kind: column_enum(2, row.get(2)?)?,
        identifiers,
        access_token,
        refresh_token,
        expires_at: row.get(8)?,
        status: column_enum(9, row.get(9)?)?,
        created_at: row.get(10)?,
        updated_at: row.get(11)?,
    })
}

/// Insert a channel row (used on OAuth attach).
pub async fn insert(db: &Database, channel: &Channel) -> Result<(), TidewireError> {
    let channel = channel.clone();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO channels (id, tenant_id, kind, identifiers, access_token_ct, \
                 access_token_nonce, refresh_token_ct, refresh_token_nonce, expires_at, status) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
                params![
                    channel.id,
                    channel.tenant_id,
                    channel.kind.to_string(),
                    channel.identifiers.to_string(),
                    channel.access_token.ciphertext,
                    channel.access_token.nonce.to_vec(),
                    channel.refresh_token.as_ref().map(|s| s.ciphertext.clone()),
                    channel.refresh_token.as_ref().map(|s| s.nonce.to_vec()),
                    channel.expires_at,
                    channel.status.to_string(),
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Fetch a channel by id.
pub async fn get(db: &Database, id: &str) -> Result<Option<Channel>, TidewireError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {CHANNEL_COLUMNS} FROM channels WHERE id = ?1"
            ))?;
            match stmt.query_row(params![id], row_to_channel) {
                Ok(channel) => Ok(Some(channel)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e.into()),
            }
        })
        .await
        .map_err(map_tr_err)
}

/// Directory lookup: resolve a channel by (kind, platform external id).
///
/// The schema does not enforce uniqueness across JSON identifier values;
/// the directory invariant is at most one active channel per external id
/// per kind, so the first match wins.
pub async fn find_by_external_id(
    db: &Database,
    kind: ChannelKind,
    key: &str,
    value: &str,
) -> Result<Option<Channel>, TidewireError> {
    let kind = kind.to_string();
    // json_extract path is built from the trusted key constants on
    // ChannelKind, never from payload data.
    let path = format!("$.{key}");
    let value = value.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {CHANNEL_COLUMNS} FROM channels \
                 WHERE kind = ?1 AND json_extract(identifiers, ?2) = ?3 \
                 ORDER BY created_at ASC LIMIT 1"
            ))?;
            match stmt.query_row(params![kind, path, value], row_to_channel) {
                Ok(channel) => Ok(Some(channel)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e.into()),
            }
        })
        .await
        .map_err(map_tr_err)
}

/// Rewrite the sealed access token and expiry after a successful refresh.
pub async fn update_token(
    db: &Database,
    id: &str,
    sealed: &SealedSecret,
    expires_at: &str,
) -> Result<(), TidewireError> {
    let id = id.to_string();
    let ciphertext = sealed.ciphertext.clone();
    let nonce = sealed.nonce.to_vec();
    let expires_at = expires_at.to_string();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "UPDATE channels SET access_token_ct = ?2, access_token_nonce = ?3, \
                 expires_at = ?4, status = 'active', \
                 updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now') \
                 WHERE id = ?1",
                params![id, ciphertext, nonce, expires_at],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Transition a channel's status (error on webhook/API failures, expired,
/// revoked on tenant detach).
pub async fn set_status(
    db: &Database,
    id: &str,
    status: ChannelStatus,
) -> Result<(), TidewireError> {
    let id = id.to_string();
    let status = status.to_string();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "UPDATE channels SET status = ?2, \
                 updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now') WHERE id = ?1",
                params![id, status],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Channels whose token expires at or before `cutoff`, excluding revoked
/// ones. Consumed by the daily token sweep.
pub async fn expiring_before(
    db: &Database,
    cutoff: &str,
) -> Result<Vec<Channel>, TidewireError> {
    let cutoff = cutoff.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {CHANNEL_COLUMNS} FROM channels \
                 WHERE expires_at IS NOT NULL AND expires_at <= ?1 \
                 AND status != 'revoked' ORDER BY expires_at ASC"
            ))?;
            let rows = stmt
                .query_map(params![cutoff], row_to_channel)?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(rows)
        })
        .await
        .map_err(map_tr_err)
}

/// Delete a channel. Conversations (and their messages) cascade.
pub async fn delete(db: &Database, id: &str) -> Result<(), TidewireError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| {
            conn.execute("DELETE FROM channels WHERE id = ?1", params![id])?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}
