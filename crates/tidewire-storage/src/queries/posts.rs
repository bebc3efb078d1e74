// SPDX-FileCopyrightText: 2026 Tidewire Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post rows: drafting, scheduling, publish outcomes and insight counters.

use rusqlite::params;
use tidewire_core::types::{PostInsights, PostStatus};
use tidewire_core::TidewireError;

use crate::database::{map_tr_err, Database};
use crate::models::{column_enum, Post};

const POST_COLUMNS: &str = "id, tenant_id, channel_id, caption, media, status, scheduled_for, \
     published_at, provider_post_id, error, likes, comments, shares, impressions, reach, \
     created_at";

fn row_to_post(row: &rusqlite::Row<'_>) -> Result<Post, rusqlite::Error> {
    let media: String = row.get(4)?;
    let media = serde_json::from_str(&media).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(4, rusqlite::types::Type::Text, Box::new(e))
    })?;
    Ok(Post {
        id: row.get(0)?,
        tenant_id: row.get(1)?,
        channel_id: row.get(2)?,
        caption: row.get(3)?,
        media,
        status: column_enum(5, row.get(5)?)?,
        scheduled_for: row.get(6)?,
        published_at: row.get(7)?,
        provider_post_id: row.get(8)?,
        error: row.get(9)?,
        likes: row.get(10)?,
        comments: row.get(11)?,
        shares: row.get(12)?,
        impressions: row.get(13)?,
        reach: row.get(14)?,
        created_at: row.get(15)?,
    })
}

/// Insert a draft post.
pub async fn insert(db: &Database, post: &Post) -> Result<(), TidewireError> {
    let post = post.clone();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO posts (id, tenant_id, channel_id, caption, media, status) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    post.id,
                    post.tenant_id,
                    post.channel_id,
                    post.caption,
                    post.media.to_string(),
                    post.status.to_string(),
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Fetch a post by id.
pub async fn get(db: &Database, id: &str) -> Result<Option<Post>, TidewireError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt =
                conn.prepare(&format!("SELECT {POST_COLUMNS} FROM posts WHERE id = ?1"))?;
            match stmt.query_row(params![id], row_to_post) {
                Ok(post) => Ok(Some(post)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e.into()),
            }
        })
        .await
        .map_err(map_tr_err)
}

/// Schedule a post for publication. Only drafts and previously failed posts
/// accept a new schedule; returns false when the transition was refused.
pub async fn set_scheduled(
    db: &Database,
    id: &str,
    scheduled_for: &str,
) -> Result<bool, TidewireError> {
    let id = id.to_string();
    let scheduled_for = scheduled_for.to_string();
    db.connection()
        .call(move |conn| {
            let updated = conn.execute(
                "UPDATE posts SET status = 'scheduled', scheduled_for = ?2, error = NULL \
                 WHERE id = ?1 AND status IN ('draft', 'failed')",
                params![id, scheduled_for],
            )?;
            Ok(updated == 1)
        })
        .await
        .map_err(map_tr_err)
}

/// Terminal success: record the provider post id and publish time.
pub async fn mark_published(
    db: &Database,
    id: &str,
    provider_post_id: &str,
    at: &str,
) -> Result<(), TidewireError> {
    let id = id.to_string();
    let provider_post_id = provider_post_id.to_string();
    let at = at.to_string();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "UPDATE posts SET status = 'published', provider_post_id = ?2, \
                 published_at = ?3, error = NULL WHERE id = ?1",
                params![id, provider_post_id, at],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Record a publish failure. The post can be rescheduled afterwards.
pub async fn mark_failed(db: &Database, id: &str, error: &str) -> Result<(), TidewireError> {
    let id = id.to_string();
    let error = error.to_string();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "UPDATE posts SET status = 'failed', error = ?2 WHERE id = ?1",
                params![id, error],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Overwrite the engagement counters from a fresh insights fetch.
pub async fn update_insights(
    db: &Database,
    id: &str,
    insights: &PostInsights,
) -> Result<(), TidewireError> {
    let id = id.to_string();
    let insights = insights.clone();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "UPDATE posts SET likes = ?2, comments = ?3, shares = ?4, \
                 impressions = ?5, reach = ?6 WHERE id = ?1",
                params![
                    id,
                    insights.likes,
                    insights.comments,
                    insights.shares,
                    insights.impressions,
                    insights.reach,
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Published posts for a channel, newest first (insight refresh support).
pub async fn published_for_channel(
    db: &Database,
    channel_id: &str,
    limit: i64,
) -> Result<Vec<Post>, TidewireError> {
    let channel_id = channel_id.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {POST_COLUMNS} FROM posts \
                 WHERE channel_id = ?1 AND status = 'published' \
                 ORDER BY published_at DESC LIMIT ?2"
            ))?;
            let rows = stmt
                .query_map(params![channel_id, limit], row_to_post)?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(rows)
        })
        .await
        .map_err(map_tr_err)
}
