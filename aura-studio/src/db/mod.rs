//! Database access for aura-studio
//!
//! Runtime-checked `sqlx` queries against a single SQLite file. Child rows
//! (brand-voice tags, media, analyses, spans, suggestions) hang off their
//! parents with `ON DELETE CASCADE`, so deleting a campaign or post removes
//! the whole subtree in one statement.

pub mod analyses;
pub mod campaigns;
pub mod media;
pub mod posts;

use aura_common::Result;
use sqlx::SqlitePool;
use std::path::Path;

/// Open the studio database and create tables if missing
pub async fn init_database_pool(db_path: &Path) -> Result<SqlitePool> {
    tracing::debug!("Connecting to database: {}", db_path.display());

    let pool = aura_common::db::connect_sqlite(db_path).await?;
    init_tables(&pool).await?;

    Ok(pool)
}

const SCHEMA: [&str; 10] = [
    r#"
    CREATE TABLE IF NOT EXISTS campaigns (
        id TEXT PRIMARY KEY,
        name TEXT NOT NULL,
        overview TEXT NOT NULL DEFAULT '',
        target_audience TEXT NOT NULL DEFAULT '',
        guardrails TEXT NOT NULL DEFAULT '',
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS campaign_brand_voice (
        campaign_id TEXT NOT NULL REFERENCES campaigns(id) ON DELETE CASCADE,
        position INTEGER NOT NULL,
        tag TEXT NOT NULL,
        PRIMARY KEY (campaign_id, position)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS posts (
        id TEXT PRIMARY KEY,
        campaign_id TEXT NOT NULL REFERENCES campaigns(id) ON DELETE CASCADE,
        title TEXT NOT NULL DEFAULT '',
        caption TEXT NOT NULL DEFAULT '',
        platform TEXT NOT NULL,
        status TEXT NOT NULL,
        scheduled_at TEXT,
        published_at TEXT,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_posts_campaign ON posts(campaign_id, created_at)",
    r#"
    CREATE TABLE IF NOT EXISTS post_media (
        id TEXT PRIMARY KEY,
        post_id TEXT NOT NULL REFERENCES posts(id) ON DELETE CASCADE,
        position INTEGER NOT NULL,
        url TEXT NOT NULL,
        media_type TEXT NOT NULL,
        width INTEGER,
        height INTEGER,
        size_bytes INTEGER
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS post_analyses (
        id TEXT PRIMARY KEY,
        post_id TEXT NOT NULL REFERENCES posts(id) ON DELETE CASCADE,
        status TEXT NOT NULL,
        source TEXT NOT NULL DEFAULT 'ai',
        input_snapshot TEXT NOT NULL,
        model TEXT,
        prompt_version TEXT,
        error TEXT,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_analyses_post ON post_analyses(post_id, created_at)",
    r#"
    CREATE TABLE IF NOT EXISTS analysis_spans (
        id TEXT PRIMARY KEY,
        analysis_id TEXT NOT NULL REFERENCES post_analyses(id) ON DELETE CASCADE,
        position INTEGER NOT NULL,
        text TEXT NOT NULL,
        severity TEXT NOT NULL,
        comment TEXT NOT NULL DEFAULT '',
        start_offset INTEGER,
        end_offset INTEGER
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS analysis_suggestions (
        id TEXT PRIMARY KEY,
        span_id TEXT NOT NULL REFERENCES analysis_spans(id) ON DELETE CASCADE,
        position INTEGER NOT NULL,
        text TEXT NOT NULL,
        rationale TEXT
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_spans_analysis ON analysis_spans(analysis_id, position)",
];

/// Create aura-studio tables
async fn init_tables(pool: &SqlitePool) -> Result<()> {
    for statement in SCHEMA {
        sqlx::query(statement).execute(pool).await?;
    }

    tracing::info!("Database tables initialized (campaigns, posts, media, analyses)");

    Ok(())
}
