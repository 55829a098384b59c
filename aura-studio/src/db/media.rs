//! Post media rows
//!
//! Functions take a plain connection so they run inside the caller's
//! transaction or on a pooled connection alike.

use aura_common::{uuid_utils, Result};
use sqlx::{Row, SqliteConnection};

use crate::models::{Media, NewMedia};

/// Media for a post, in upload order
pub async fn list_media(conn: &mut SqliteConnection, post_id: &str) -> Result<Vec<Media>> {
    let rows = sqlx::query(
        r#"
        SELECT id, url, media_type, width, height, size_bytes
        FROM post_media
        WHERE post_id = ?
        ORDER BY position ASC
        "#,
    )
    .bind(post_id)
    .fetch_all(&mut *conn)
    .await?;

    Ok(rows
        .iter()
        .map(|row| Media {
            id: row.get("id"),
            url: row.get("url"),
            media_type: row.get("media_type"),
            width: row.get("width"),
            height: row.get("height"),
            size_bytes: row.get("size_bytes"),
        })
        .collect())
}

/// Append media rows after any existing ones
pub async fn insert_media(
    conn: &mut SqliteConnection,
    post_id: &str,
    media: &[NewMedia],
) -> Result<()> {
    let start: i64 = sqlx::query_scalar(
        "SELECT COALESCE(MAX(position) + 1, 0) FROM post_media WHERE post_id = ?",
    )
    .bind(post_id)
    .fetch_one(&mut *conn)
    .await?;

    for (offset, item) in media.iter().enumerate() {
        sqlx::query(
            r#"
            INSERT INTO post_media (id, post_id, position, url, media_type, width, height, size_bytes)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(uuid_utils::generate_id())
        .bind(post_id)
        .bind(start + offset as i64)
        .bind(&item.url)
        .bind(&item.media_type)
        .bind(item.width)
        .bind(item.height)
        .bind(item.size_bytes)
        .execute(&mut *conn)
        .await?;
    }

    Ok(())
}

/// Remove all media rows of a post, returning their URLs
pub async fn delete_media_for_post(
    conn: &mut SqliteConnection,
    post_id: &str,
) -> Result<Vec<String>> {
    let urls: Vec<String> =
        sqlx::query_scalar("SELECT url FROM post_media WHERE post_id = ? ORDER BY position")
            .bind(post_id)
            .fetch_all(&mut *conn)
            .await?;

    sqlx::query("DELETE FROM post_media WHERE post_id = ?")
        .bind(post_id)
        .execute(&mut *conn)
        .await?;

    Ok(urls)
}

/// URLs of every media file belonging to a campaign's posts
pub async fn media_urls_for_campaign(
    conn: &mut SqliteConnection,
    campaign_id: &str,
) -> Result<Vec<String>> {
    let urls = sqlx::query_scalar(
        r#"
        SELECT m.url
        FROM post_media m
        JOIN posts p ON p.id = m.post_id
        WHERE p.campaign_id = ?
        "#,
    )
    .bind(campaign_id)
    .fetch_all(&mut *conn)
    .await?;

    Ok(urls)
}
