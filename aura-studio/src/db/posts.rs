//! Post database operations

use aura_common::time::{now, parse_db_timestamp, parse_optional_db_timestamp, to_db_timestamp};
use aura_common::{uuid_utils, Result};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteConnection, SqlitePool};

use super::media;
use crate::models::{Media, Post, PostChanges, PostDraft};

const POST_COLUMNS: &str = "id, campaign_id, title, caption, platform, status, \
     scheduled_at, published_at, created_at, updated_at";

/// Insert a post and its media in one transaction
pub async fn insert_post(pool: &SqlitePool, campaign_id: &str, draft: &PostDraft) -> Result<Post> {
    let id = uuid_utils::generate_id();
    let timestamp = to_db_timestamp(&now());

    let mut tx = pool.begin().await?;

    sqlx::query(
        r#"
        INSERT INTO posts (id, campaign_id, title, caption, platform, status,
                           scheduled_at, published_at, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, NULL, ?, ?)
        "#,
    )
    .bind(&id)
    .bind(campaign_id)
    .bind(&draft.title)
    .bind(&draft.caption)
    .bind(&draft.platform)
    .bind(&draft.status)
    .bind(draft.scheduled_at.as_ref().map(to_db_timestamp))
    .bind(&timestamp)
    .bind(&timestamp)
    .execute(&mut *tx)
    .await?;

    media::insert_media(&mut tx, &id, &draft.media).await?;

    let post = load_post(&mut tx, &id)
        .await?
        .ok_or_else(|| aura_common::Error::Internal(format!("Post {} vanished after insert", id)))?;
    tx.commit().await?;

    tracing::debug!(post_id = %id, campaign_id = %campaign_id, media = post.media.len(), "Post created");
    Ok(post)
}

pub async fn get_post(pool: &SqlitePool, id: &str) -> Result<Option<Post>> {
    let mut conn = pool.acquire().await?;
    load_post(&mut conn, id).await
}

/// Posts of a campaign, newest first
pub async fn list_posts_for_campaign(pool: &SqlitePool, campaign_id: &str) -> Result<Vec<Post>> {
    let mut conn = pool.acquire().await?;

    let rows = sqlx::query(&format!(
        "SELECT {} FROM posts WHERE campaign_id = ? ORDER BY created_at DESC, rowid DESC",
        POST_COLUMNS
    ))
    .bind(campaign_id)
    .fetch_all(&mut *conn)
    .await?;

    let mut posts = Vec::with_capacity(rows.len());
    for row in &rows {
        let id: String = row.get("id");
        let media = media::list_media(&mut conn, &id).await?;
        posts.push(post_from_row(row, media)?);
    }
    Ok(posts)
}

/// Apply a partial update and bump `updated_at`
///
/// Returns the updated post plus the URLs of any media rows that were
/// replaced, or `None` when the post does not exist.
pub async fn update_post(
    pool: &SqlitePool,
    id: &str,
    changes: &PostChanges,
) -> Result<Option<(Post, Vec<String>)>> {
    let mut tx = pool.begin().await?;

    let Some(current) = load_post(&mut tx, id).await? else {
        return Ok(None);
    };

    let title = changes.title.as_ref().unwrap_or(&current.title);
    let caption = changes.caption.as_ref().unwrap_or(&current.caption);
    let platform = changes.platform.as_ref().unwrap_or(&current.platform);
    let status = changes.status.as_ref().unwrap_or(&current.status);
    let scheduled_at = changes.scheduled_at.or(current.scheduled_at);
    let published_at = changes.published_at.or(current.published_at);

    sqlx::query(
        r#"
        UPDATE posts
        SET title = ?, caption = ?, platform = ?, status = ?,
            scheduled_at = ?, published_at = ?, updated_at = ?
        WHERE id = ?
        "#,
    )
    .bind(title)
    .bind(caption)
    .bind(platform)
    .bind(status)
    .bind(scheduled_at.as_ref().map(to_db_timestamp))
    .bind(published_at.as_ref().map(to_db_timestamp))
    .bind(to_db_timestamp(&now()))
    .bind(id)
    .execute(&mut *tx)
    .await?;

    let mut replaced = Vec::new();
    if let Some(new_media) = &changes.media {
        replaced = media::delete_media_for_post(&mut tx, id).await?;
        media::insert_media(&mut tx, id, new_media).await?;
    }

    let post = load_post(&mut tx, id)
        .await?
        .ok_or_else(|| aura_common::Error::Internal(format!("Post {} vanished during update", id)))?;
    tx.commit().await?;

    Ok(Some((post, replaced)))
}

/// Delete a post with its media rows and analyses
///
/// Returns the media URLs to remove from disk, or `None` if the post did not
/// exist.
pub async fn delete_post(pool: &SqlitePool, id: &str) -> Result<Option<Vec<String>>> {
    let mut tx = pool.begin().await?;

    let urls = media::delete_media_for_post(&mut tx, id).await?;
    let result = sqlx::query("DELETE FROM posts WHERE id = ?")
        .bind(id)
        .execute(&mut *tx)
        .await?;

    if result.rows_affected() == 0 {
        tx.rollback().await?;
        return Ok(None);
    }

    tx.commit().await?;
    Ok(Some(urls))
}

pub(crate) async fn load_post(conn: &mut SqliteConnection, id: &str) -> Result<Option<Post>> {
    let row = sqlx::query(&format!("SELECT {} FROM posts WHERE id = ?", POST_COLUMNS))
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;

    match row {
        Some(row) => {
            let media = media::list_media(conn, id).await?;
            Ok(Some(post_from_row(&row, media)?))
        }
        None => Ok(None),
    }
}

fn post_from_row(row: &SqliteRow, media: Vec<Media>) -> Result<Post> {
    let created_at: String = row.get("created_at");
    let updated_at: String = row.get("updated_at");

    Ok(Post {
        id: row.get("id"),
        campaign_id: row.get("campaign_id"),
        title: row.get("title"),
        caption: row.get("caption"),
        media,
        platform: row.get("platform"),
        status: row.get("status"),
        scheduled_at: parse_optional_db_timestamp(row.get("scheduled_at"))?,
        published_at: parse_optional_db_timestamp(row.get("published_at"))?,
        created_at: parse_db_timestamp(&created_at)?,
        updated_at: parse_db_timestamp(&updated_at)?,
    })
}
