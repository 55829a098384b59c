//! Campaign database operations

use aura_common::time::{now, parse_db_timestamp, to_db_timestamp};
use aura_common::{uuid_utils, Result};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteConnection, SqlitePool};

use super::media;
use crate::models::{Brief, Campaign};

/// Insert a campaign with already-normalized fields
pub async fn insert_campaign(pool: &SqlitePool, name: &str, brief: &Brief) -> Result<Campaign> {
    let id = uuid_utils::generate_id();
    let timestamp = to_db_timestamp(&now());

    let mut tx = pool.begin().await?;

    sqlx::query(
        r#"
        INSERT INTO campaigns (id, name, overview, target_audience, guardrails, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&id)
    .bind(name)
    .bind(&brief.overview)
    .bind(&brief.target_audience)
    .bind(&brief.guardrails)
    .bind(&timestamp)
    .bind(&timestamp)
    .execute(&mut *tx)
    .await?;

    replace_brand_voice(&mut tx, &id, &brief.brand_voice).await?;

    tx.commit().await?;

    tracing::debug!(campaign_id = %id, "Campaign created");

    let mut conn = pool.acquire().await?;
    load_campaign(&mut conn, &id)
        .await?
        .ok_or_else(|| aura_common::Error::Internal(format!("Campaign {} vanished after insert", id)))
}

/// Load one campaign by ID
pub async fn get_campaign(pool: &SqlitePool, id: &str) -> Result<Option<Campaign>> {
    let mut conn = pool.acquire().await?;
    load_campaign(&mut conn, id).await
}

/// List campaigns, newest first, optionally filtered by a case-insensitive
/// substring of the name
pub async fn list_campaigns(pool: &SqlitePool, search: Option<&str>) -> Result<Vec<Campaign>> {
    let mut conn = pool.acquire().await?;

    let rows = match search.map(str::trim).filter(|s| !s.is_empty()) {
        Some(term) => {
            sqlx::query(
                r#"
                SELECT id, name, overview, target_audience, guardrails, created_at, updated_at
                FROM campaigns
                WHERE LOWER(name) LIKE ? ESCAPE '\'
                ORDER BY created_at DESC, rowid DESC
                "#,
            )
            .bind(like_pattern(term))
            .fetch_all(&mut *conn)
            .await?
        }
        None => {
            sqlx::query(
                r#"
                SELECT id, name, overview, target_audience, guardrails, created_at, updated_at
                FROM campaigns
                ORDER BY created_at DESC, rowid DESC
                "#,
            )
            .fetch_all(&mut *conn)
            .await?
        }
    };

    let mut campaigns = Vec::with_capacity(rows.len());
    for row in &rows {
        let id: String = row.get("id");
        let tags = load_brand_voice(&mut conn, &id).await?;
        campaigns.push(campaign_from_row(row, tags)?);
    }
    Ok(campaigns)
}

/// Apply a partial update; `None` when the campaign does not exist
pub async fn update_campaign(
    pool: &SqlitePool,
    id: &str,
    name: Option<&str>,
    brief: Option<&Brief>,
) -> Result<Option<Campaign>> {
    let mut tx = pool.begin().await?;

    let exists: Option<String> = sqlx::query_scalar("SELECT id FROM campaigns WHERE id = ?")
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?;
    if exists.is_none() {
        return Ok(None);
    }

    if let Some(name) = name {
        sqlx::query("UPDATE campaigns SET name = ? WHERE id = ?")
            .bind(name)
            .bind(id)
            .execute(&mut *tx)
            .await?;
    }

    if let Some(brief) = brief {
        sqlx::query(
            "UPDATE campaigns SET overview = ?, target_audience = ?, guardrails = ? WHERE id = ?",
        )
        .bind(&brief.overview)
        .bind(&brief.target_audience)
        .bind(&brief.guardrails)
        .bind(id)
        .execute(&mut *tx)
        .await?;

        replace_brand_voice(&mut tx, id, &brief.brand_voice).await?;
    }

    sqlx::query("UPDATE campaigns SET updated_at = ? WHERE id = ?")
        .bind(to_db_timestamp(&now()))
        .bind(id)
        .execute(&mut *tx)
        .await?;

    let campaign = load_campaign(&mut tx, id).await?;
    tx.commit().await?;

    Ok(campaign)
}

/// Delete a campaign and everything beneath it
///
/// Returns the media URLs that belonged to its posts so the caller can
/// remove the files, or `None` if the campaign did not exist.
pub async fn delete_campaign(pool: &SqlitePool, id: &str) -> Result<Option<Vec<String>>> {
    let mut tx = pool.begin().await?;

    let urls = media::media_urls_for_campaign(&mut tx, id).await?;

    let result = sqlx::query("DELETE FROM campaigns WHERE id = ?")
        .bind(id)
        .execute(&mut *tx)
        .await?;

    if result.rows_affected() == 0 {
        tx.rollback().await?;
        return Ok(None);
    }

    tx.commit().await?;
    tracing::debug!(campaign_id = %id, media_files = urls.len(), "Campaign deleted");

    Ok(Some(urls))
}

/// Brand-voice tags of a campaign, in stored order
pub async fn load_brand_voice(conn: &mut SqliteConnection, campaign_id: &str) -> Result<Vec<String>> {
    let tags = sqlx::query_scalar(
        "SELECT tag FROM campaign_brand_voice WHERE campaign_id = ? ORDER BY position",
    )
    .bind(campaign_id)
    .fetch_all(&mut *conn)
    .await?;
    Ok(tags)
}

async fn replace_brand_voice(
    conn: &mut SqliteConnection,
    campaign_id: &str,
    tags: &[String],
) -> Result<()> {
    sqlx::query("DELETE FROM campaign_brand_voice WHERE campaign_id = ?")
        .bind(campaign_id)
        .execute(&mut *conn)
        .await?;

    for (position, tag) in tags.iter().enumerate() {
        sqlx::query("INSERT INTO campaign_brand_voice (campaign_id, position, tag) VALUES (?, ?, ?)")
            .bind(campaign_id)
            .bind(position as i64)
            .bind(tag)
            .execute(&mut *conn)
            .await?;
    }
    Ok(())
}

pub(crate) async fn load_campaign(conn: &mut SqliteConnection, id: &str) -> Result<Option<Campaign>> {
    let row = sqlx::query(
        r#"
        SELECT id, name, overview, target_audience, guardrails, created_at, updated_at
        FROM campaigns
        WHERE id = ?
        "#,
    )
    .bind(id)
    .fetch_optional(&mut *conn)
    .await?;

    match row {
        Some(row) => {
            let tags = load_brand_voice(conn, id).await?;
            Ok(Some(campaign_from_row(&row, tags)?))
        }
        None => Ok(None),
    }
}

fn campaign_from_row(row: &SqliteRow, brand_voice: Vec<String>) -> Result<Campaign> {
    let created_at: String = row.get("created_at");
    let updated_at: String = row.get("updated_at");

    Ok(Campaign {
        id: row.get("id"),
        name: row.get("name"),
        brief: Brief {
            overview: row.get("overview"),
            target_audience: row.get("target_audience"),
            brand_voice,
            guardrails: row.get("guardrails"),
        },
        created_at: parse_db_timestamp(&created_at)?,
        updated_at: parse_db_timestamp(&updated_at)?,
    })
}

/// `%term%` with LIKE wildcards in the term escaped
fn like_pattern(term: &str) -> String {
    let mut pattern = String::with_capacity(term.len() + 2);
    pattern.push('%');
    for c in term.to_lowercase().chars() {
        if matches!(c, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::init_database_pool;

    async fn test_pool() -> (tempfile::TempDir, SqlitePool) {
        let temp_dir = tempfile::tempdir().unwrap();
        let pool = init_database_pool(&temp_dir.path().join("aura.db")).await.unwrap();
        (temp_dir, pool)
    }

    fn brief(tags: &[&str]) -> Brief {
        Brief {
            overview: "Spring launch".to_string(),
            target_audience: "Runners".to_string(),
            brand_voice: tags.iter().map(|t| t.to_string()).collect(),
            guardrails: "No medical claims".to_string(),
        }
    }

    #[test]
    fn test_like_pattern_escapes_wildcards() {
        assert_eq!(like_pattern("50%_Off"), "%50\\%\\_off%");
    }

    #[tokio::test]
    async fn test_insert_and_get_preserves_tag_order() {
        let (_dir, pool) = test_pool().await;
        let created = insert_campaign(&pool, "Spring", &brief(&["warm", "bold", "clear"])).await.unwrap();

        let loaded = get_campaign(&pool, &created.id).await.unwrap().unwrap();
        assert_eq!(loaded.name, "Spring");
        assert_eq!(loaded.brief.brand_voice, vec!["warm", "bold", "clear"]);
        assert_eq!(loaded.brief.guardrails, "No medical claims");
    }

    #[tokio::test]
    async fn test_list_search_is_case_insensitive() {
        let (_dir, pool) = test_pool().await;
        insert_campaign(&pool, "Spring Launch", &Brief::default()).await.unwrap();
        insert_campaign(&pool, "Autumn Sale", &Brief::default()).await.unwrap();

        let found = list_campaigns(&pool, Some("SPRING")).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].name, "Spring Launch");

        let all = list_campaigns(&pool, None).await.unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].name, "Autumn Sale");
    }

    #[tokio::test]
    async fn test_update_replaces_brief() {
        let (_dir, pool) = test_pool().await;
        let created = insert_campaign(&pool, "Spring", &brief(&["warm"])).await.unwrap();

        let updated = update_campaign(&pool, &created.id, None, Some(&brief(&["bold"])))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated.name, "Spring");
        assert_eq!(updated.brief.brand_voice, vec!["bold"]);
        assert!(updated.updated_at >= created.updated_at);

        assert!(update_campaign(&pool, "missing", Some("x"), None).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_delete_campaign_removes_tags() {
        let (_dir, pool) = test_pool().await;
        let created = insert_campaign(&pool, "Spring", &brief(&["warm"])).await.unwrap();

        assert!(delete_campaign(&pool, &created.id).await.unwrap().is_some());
        assert!(get_campaign(&pool, &created.id).await.unwrap().is_none());

        let remaining: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM campaign_brand_voice")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(remaining, 0);
        assert!(delete_campaign(&pool, &created.id).await.unwrap().is_none());
    }
}
