// SPDX-FileCopyrightText: 2026 Tidewire Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Comment mirror. Rows arrive from webhook `changes` entries and are
//! upserted on `provider_comment_id` since edits replay the same id.

use rusqlite::params;
use tidewire_core::TidewireError;

use crate::database::{map_tr_err, Database};
use crate::models::Comment;

const COMMENT_COLUMNS: &str = "id, tenant_id, channel_id, provider_comment_id, provider_post_id, \
     author_id, author_name, body, hidden, created_at";

fn row_to_comment(row: &rusqlite::Row<'_>) -> Result<Comment, rusqlite::Error> {
    Ok(Comment {
        id: row.get(0)?,
        tenant_id: row.get(1)?,
        channel_id: row.get(2)?,
        provider_comment_id: row.get(3)?,
        provider_post_id: row.get(4)?,
        author_id: row.get(5)?,
        author_name: row.get(6)?,
        body: row.get(7)?,
        hidden: row.get(8)?,
        created_at: row.get(9)?,
    })
}

/// Insert or refresh a mirrored comment. A replayed or edited comment updates
/// the existing row in place.
pub async fn upsert(db: &Database, comment: &Comment) -> Result<(), TidewireError> {
    let comment = comment.clone();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO comments \
                 (id, tenant_id, channel_id, provider_comment_id, provider_post_id, \
                  author_id, author_name, body, hidden) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9) \
                 ON CONFLICT(provider_comment_id) DO UPDATE SET \
                 body = excluded.body, author_name = excluded.author_name",
                params![
                    comment.id,
                    comment.tenant_id,
                    comment.channel_id,
                    comment.provider_comment_id,
                    comment.provider_post_id,
                    comment.author_id,
                    comment.author_name,
                    comment.body,
                    comment.hidden,
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Fetch a comment by its provider id.
pub async fn get_by_provider_id(
    db: &Database,
    provider_comment_id: &str,
) -> Result<Option<Comment>, TidewireError> {
    let provider_comment_id = provider_comment_id.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {COMMENT_COLUMNS} FROM comments WHERE provider_comment_id = ?1"
            ))?;
            match stmt.query_row(params![provider_comment_id], row_to_comment) {
                Ok(comment) => Ok(Some(comment)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e.into()),
            }
        })
        .await
        .map_err(map_tr_err)
}

/// Mirror a hide/unhide moderation outcome.
pub async fn set_hidden(
    db: &Database,
    provider_comment_id: &str,
    hidden: bool,
) -> Result<(), TidewireError> {
    let provider_comment_id = provider_comment_id.to_string();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "UPDATE comments SET hidden = ?2 WHERE provider_comment_id = ?1",
                params![provider_comment_id, hidden],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Remove the mirror row after a provider-side delete.
pub async fn delete_by_provider_id(
    db: &Database,
    provider_comment_id: &str,
) -> Result<(), TidewireError> {
    let provider_comment_id = provider_comment_id.to_string();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "DELETE FROM comments WHERE provider_comment_id = ?1",
                params![provider_comment_id],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{seed_any_channel, setup_db};
    use tidewire_core::types::ChannelKind;
    use uuid::Uuid;

    fn sample(channel_id: &str, provider_comment_id: &str, body: &str) -> Comment {
        Comment {
            id: Uuid::new_v4().to_string(),
            tenant_id: "t-1".to_string(),
            channel_id: channel_id.to_string(),
            provider_comment_id: provider_comment_id.to_string(),
            provider_post_id: Some("fb_post_1".to_string()),
            author_id: Some("u-55".to_string()),
            author_name: Some("Sam".to_string()),
            body: Some(body.to_string()),
            hidden: false,
            created_at: String::new(),
        }
    }

    #[tokio::test]
    async fn upsert_updates_body_on_replay() {
        let (db, _dir) = setup_db().await;
        let channel = seed_any_channel(&db, ChannelKind::Facebook).await;

        let original = sample(&channel.id, "c-100", "first version");
        upsert(&db, &original).await.unwrap();

        let edited = sample(&channel.id, "c-100", "edited version");
        upsert(&db, &edited).await.unwrap();

        let stored = get_by_provider_id(&db, "c-100").await.unwrap().unwrap();
        assert_eq!(stored.id, original.id);
        assert_eq!(stored.body.as_deref(), Some("edited version"));

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn hide_and_delete_roundtrip() {
        let (db, _dir) = setup_db().await;
        let channel = seed_any_channel(&db, ChannelKind::Instagram).await;

        upsert(&db, &sample(&channel.id, "c-200", "rude remark"))
            .await
            .unwrap();
        set_hidden(&db, "c-200", true).await.unwrap();
        let stored = get_by_provider_id(&db, "c-200").await.unwrap().unwrap();
        assert!(stored.hidden);

        delete_by_provider_id(&db, "c-200").await.unwrap();
        assert!(get_by_provider_id(&db, "c-200").await.unwrap().is_none());

        db.close().await.unwrap();
    }
}
