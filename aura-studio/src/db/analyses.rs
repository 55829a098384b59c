//! Post analysis database operations
//!
//! Status transitions happen here; the worker only decides which one to make.
//! Completion writes spans, suggestions and the `complete` status in a single
//! transaction so a reader never sees a complete analysis without its spans.

use aura_common::time::{now, parse_db_timestamp, to_db_timestamp};
use aura_common::{uuid_utils, Error, Result};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};

use crate::models::{
    Analysis, AnalysisSpan, AnalysisStatus, AnalysisSuggestion, FeedbackSpan, Severity, Snapshot,
};
use crate::services::span_mapper::CharRange;

/// Error recorded on analyses interrupted by a restart
pub const INTERRUPTED_MESSAGE: &str = "Analysis interrupted by service restart";

const ANALYSIS_COLUMNS: &str = "id, post_id, status, source, input_snapshot, model, \
     prompt_version, error, created_at, updated_at";

/// Create a `pending` analysis holding the snapshot
pub async fn insert_analysis(pool: &SqlitePool, post_id: &str, snapshot: &Snapshot) -> Result<Analysis> {
    let id = uuid_utils::generate_id();
    let created_at = now();
    let timestamp = to_db_timestamp(&created_at);
    let snapshot_json = serde_json::to_string(snapshot)
        .map_err(|e| Error::Internal(format!("Failed to serialize snapshot: {}", e)))?;

    sqlx::query(
        r#"
        INSERT INTO post_analyses (id, post_id, status, source, input_snapshot, created_at, updated_at)
        VALUES (?, ?, ?, 'ai', ?, ?, ?)
        "#,
    )
    .bind(&id)
    .bind(post_id)
    .bind(AnalysisStatus::Pending.as_str())
    .bind(&snapshot_json)
    .bind(&timestamp)
    .bind(&timestamp)
    .execute(pool)
    .await?;

    get_analysis(pool, &id)
        .await?
        .ok_or_else(|| Error::Internal(format!("Analysis {} vanished after insert", id)))
}

pub async fn get_analysis(pool: &SqlitePool, id: &str) -> Result<Option<Analysis>> {
    let row = sqlx::query(&format!("SELECT {} FROM post_analyses WHERE id = ?", ANALYSIS_COLUMNS))
        .bind(id)
        .fetch_optional(pool)
        .await?;

    row.as_ref().map(analysis_from_row).transpose()
}

/// Most recently triggered analysis of a post
pub async fn latest_analysis_for_post(pool: &SqlitePool, post_id: &str) -> Result<Option<Analysis>> {
    let row = sqlx::query(&format!(
        "SELECT {} FROM post_analyses WHERE post_id = ? ORDER BY created_at DESC, rowid DESC LIMIT 1",
        ANALYSIS_COLUMNS
    ))
    .bind(post_id)
    .fetch_optional(pool)
    .await?;

    row.as_ref().map(analysis_from_row).transpose()
}

/// `pending → running`; false if the analysis is no longer pending
pub async fn mark_running(pool: &SqlitePool, id: &str) -> Result<bool> {
    let result = sqlx::query(
        "UPDATE post_analyses SET status = ?, updated_at = ? WHERE id = ? AND status = ?",
    )
    .bind(AnalysisStatus::Running.as_str())
    .bind(to_db_timestamp(&now()))
    .bind(id)
    .bind(AnalysisStatus::Pending.as_str())
    .execute(pool)
    .await?;

    Ok(result.rows_affected() == 1)
}

/// Move a non-terminal analysis to `failed` with a message
pub async fn mark_failed(pool: &SqlitePool, id: &str, message: &str) -> Result<()> {
    sqlx::query(
        r#"
        UPDATE post_analyses
        SET status = ?, error = ?, updated_at = ?
        WHERE id = ? AND status IN ('pending', 'running')
        "#,
    )
    .bind(AnalysisStatus::Failed.as_str())
    .bind(message)
    .bind(to_db_timestamp(&now()))
    .bind(id)
    .execute(pool)
    .await?;

    Ok(())
}

/// Persist mapped spans and mark the analysis `complete`
///
/// `ranges[i]` holds the resolved offsets for `spans[i]`. Any spans from a
/// previous attempt are cleared first. Nothing is written if any statement
/// fails.
pub async fn persist_result(
    pool: &SqlitePool,
    id: &str,
    model: &str,
    prompt_version: &str,
    spans: &[FeedbackSpan],
    ranges: &[Option<CharRange>],
) -> Result<()> {
    if spans.len() != ranges.len() {
        return Err(Error::Internal(format!(
            "Span/offset count mismatch: {} spans, {} ranges",
            spans.len(),
            ranges.len()
        )));
    }

    let mut tx = pool.begin().await?;

    sqlx::query("DELETE FROM analysis_spans WHERE analysis_id = ?")
        .bind(id)
        .execute(&mut *tx)
        .await?;

    for (position, (span, range)) in spans.iter().zip(ranges).enumerate() {
        let span_id = uuid_utils::generate_id();

        sqlx::query(
            r#"
            INSERT INTO analysis_spans (id, analysis_id, position, text, severity, comment, start_offset, end_offset)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&span_id)
        .bind(id)
        .bind(position as i64)
        .bind(&span.text)
        .bind(span.severity.as_str())
        .bind(&span.comment)
        .bind(range.map(|r| r.start as i64))
        .bind(range.map(|r| r.end as i64))
        .execute(&mut *tx)
        .await?;

        for (suggestion_position, suggestion) in span.suggestions.iter().enumerate() {
            sqlx::query(
                r#"
                INSERT INTO analysis_suggestions (id, span_id, position, text, rationale)
                VALUES (?, ?, ?, ?, ?)
                "#,
            )
            .bind(uuid_utils::generate_id())
            .bind(&span_id)
            .bind(suggestion_position as i64)
            .bind(&suggestion.text)
            .bind(&suggestion.rationale)
            .execute(&mut *tx)
            .await?;
        }
    }

    let result = sqlx::query(
        r#"
        UPDATE post_analyses
        SET status = ?, model = ?, prompt_version = ?, error = NULL, updated_at = ?
        WHERE id = ?
        "#,
    )
    .bind(AnalysisStatus::Complete.as_str())
    .bind(model)
    .bind(prompt_version)
    .bind(to_db_timestamp(&now()))
    .bind(id)
    .execute(&mut *tx)
    .await?;

    if result.rows_affected() == 0 {
        return Err(Error::NotFound(format!("Analysis {}", id)));
    }

    tx.commit().await?;
    Ok(())
}

/// Spans with their suggestions, in provider order
pub async fn load_spans(pool: &SqlitePool, analysis_id: &str) -> Result<Vec<AnalysisSpan>> {
    let span_rows = sqlx::query(
        r#"
        SELECT id, text, severity, comment, start_offset, end_offset
        FROM analysis_spans
        WHERE analysis_id = ?
        ORDER BY position
        "#,
    )
    .bind(analysis_id)
    .fetch_all(pool)
    .await?;

    let suggestion_rows = sqlx::query(
        r#"
        SELECT s.id, s.span_id, s.text, s.rationale
        FROM analysis_suggestions s
        JOIN analysis_spans sp ON sp.id = s.span_id
        WHERE sp.analysis_id = ?
        ORDER BY sp.position, s.position
        "#,
    )
    .bind(analysis_id)
    .fetch_all(pool)
    .await?;

    let mut spans: Vec<AnalysisSpan> = span_rows
        .iter()
        .map(|row| {
            let severity: String = row.get("severity");
            AnalysisSpan {
                id: row.get("id"),
                text: row.get("text"),
                severity: Severity::from_loose(&severity),
                comment: row.get("comment"),
                start_offset: row.get("start_offset"),
                end_offset: row.get("end_offset"),
                suggestions: Vec::new(),
            }
        })
        .collect();

    for row in &suggestion_rows {
        let span_id: String = row.get("span_id");
        if let Some(span) = spans.iter_mut().find(|s| s.id == span_id) {
            span.suggestions.push(AnalysisSuggestion {
                id: row.get("id"),
                text: row.get("text"),
                rationale: row.get("rationale"),
            });
        }
    }

    Ok(spans)
}

/// Fail analyses left `pending`/`running` by a previous process
///
/// The job queue lives in memory, so these will never be picked up again.
pub async fn cleanup_stale_analyses(pool: &SqlitePool) -> Result<usize> {
    let result = sqlx::query(
        r#"
        UPDATE post_analyses
        SET status = 'failed', error = ?, updated_at = ?
        WHERE status IN ('pending', 'running')
        "#,
    )
    .bind(INTERRUPTED_MESSAGE)
    .bind(to_db_timestamp(&now()))
    .execute(pool)
    .await?;

    Ok(result.rows_affected() as usize)
}

fn analysis_from_row(row: &SqliteRow) -> Result<Analysis> {
    let status: String = row.get("status");
    let status = status.parse::<AnalysisStatus>().map_err(Error::Internal)?;

    let snapshot: String = row.get("input_snapshot");
    let input_snapshot = serde_json::from_str(&snapshot)
        .map_err(|e| Error::Internal(format!("Failed to deserialize snapshot: {}", e)))?;

    let created_at: String = row.get("created_at");
    let updated_at: String = row.get("updated_at");

    Ok(Analysis {
        id: row.get("id"),
        post_id: row.get("post_id"),
        status,
        source: row.get("source"),
        input_snapshot,
        model: row.get("model"),
        prompt_version: row.get("prompt_version"),
        error: row.get("error"),
        created_at: parse_db_timestamp(&created_at)?,
        updated_at: parse_db_timestamp(&updated_at)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{campaigns, init_database_pool, posts};
    use crate::models::{Brief, FeedbackSuggestion, PostDraft};

    async fn setup() -> (tempfile::TempDir, SqlitePool, String) {
        let temp_dir = tempfile::tempdir().unwrap();
        let pool = init_database_pool(&temp_dir.path().join("aura.db")).await.unwrap();
        let campaign = campaigns::insert_campaign(&pool, "Spring", &Brief::default()).await.unwrap();
        let post = posts::insert_post(
            &pool,
            &campaign.id,
            &PostDraft {
                title: "Launch".to_string(),
                caption: "Fresh shoes. Run further today.".to_string(),
                platform: "instagram".to_string(),
                status: "draft".to_string(),
                scheduled_at: None,
                media: Vec::new(),
            },
        )
        .await
        .unwrap();
        (temp_dir, pool, post.id)
    }

    fn span(text: &str, suggestions: &[&str]) -> FeedbackSpan {
        FeedbackSpan {
            text: text.to_string(),
            severity: Severity::Major,
            comment: "Tighten this".to_string(),
            start_offset: None,
            end_offset: None,
            suggestions: suggestions
                .iter()
                .map(|s| FeedbackSuggestion {
                    text: s.to_string(),
                    rationale: None,
                })
                .collect(),
        }
    }

    #[tokio::test]
    async fn test_lifecycle_to_complete() {
        let (_dir, pool, post_id) = setup().await;
        let analysis = insert_analysis(&pool, &post_id, &Snapshot::default()).await.unwrap();
        assert_eq!(analysis.status, AnalysisStatus::Pending);
        assert_eq!(analysis.source, "ai");

        assert!(mark_running(&pool, &analysis.id).await.unwrap());
        assert!(!mark_running(&pool, &analysis.id).await.unwrap());

        let spans = vec![span("Fresh shoes.", &["New kicks.", "Fresh pairs."]), span("missing", &[])];
        let ranges = vec![Some(CharRange { start: 0, end: 12 }), None];
        persist_result(&pool, &analysis.id, "mock-v1", "1", &spans, &ranges)
            .await
            .unwrap();

        let stored = get_analysis(&pool, &analysis.id).await.unwrap().unwrap();
        assert_eq!(stored.status, AnalysisStatus::Complete);
        assert_eq!(stored.model.as_deref(), Some("mock-v1"));

        let loaded = load_spans(&pool, &analysis.id).await.unwrap();
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded[0].start_offset, Some(0));
        assert_eq!(loaded[0].end_offset, Some(12));
        assert_eq!(loaded[0].suggestions.len(), 2);
        assert_eq!(loaded[0].suggestions[1].text, "Fresh pairs.");
        assert_eq!(loaded[1].start_offset, None);
    }

    #[tokio::test]
    async fn test_persist_rejects_mismatched_ranges() {
        let (_dir, pool, post_id) = setup().await;
        let analysis = insert_analysis(&pool, &post_id, &Snapshot::default()).await.unwrap();

        let result = persist_result(&pool, &analysis.id, "m", "1", &[span("a", &[])], &[]).await;
        assert!(result.is_err());
        assert!(load_spans(&pool, &analysis.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_mark_failed_keeps_terminal_states() {
        let (_dir, pool, post_id) = setup().await;
        let analysis = insert_analysis(&pool, &post_id, &Snapshot::default()).await.unwrap();
        persist_result(&pool, &analysis.id, "m", "1", &[], &[]).await.unwrap();

        mark_failed(&pool, &analysis.id, "late failure").await.unwrap();
        let stored = get_analysis(&pool, &analysis.id).await.unwrap().unwrap();
        assert_eq!(stored.status, AnalysisStatus::Complete);
        assert!(stored.error.is_none());
    }

    #[tokio::test]
    async fn test_latest_prefers_newest() {
        let (_dir, pool, post_id) = setup().await;
        insert_analysis(&pool, &post_id, &Snapshot::default()).await.unwrap();
        let second = insert_analysis(&pool, &post_id, &Snapshot::default()).await.unwrap();

        let latest = latest_analysis_for_post(&pool, &post_id).await.unwrap().unwrap();
        assert_eq!(latest.id, second.id);
        assert!(latest_analysis_for_post(&pool, "nope").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_cleanup_stale_analyses() {
        let (_dir, pool, post_id) = setup().await;
        let pending = insert_analysis(&pool, &post_id, &Snapshot::default()).await.unwrap();
        let running = insert_analysis(&pool, &post_id, &Snapshot::default()).await.unwrap();
        mark_running(&pool, &running.id).await.unwrap();
        let done = insert_analysis(&pool, &post_id, &Snapshot::default()).await.unwrap();
        persist_result(&pool, &done.id, "m", "1", &[], &[]).await.unwrap();

        assert_eq!(cleanup_stale_analyses(&pool).await.unwrap(), 2);

        let stored = get_analysis(&pool, &pending.id).await.unwrap().unwrap();
        assert_eq!(stored.status, AnalysisStatus::Failed);
        assert_eq!(stored.error.as_deref(), Some(INTERRUPTED_MESSAGE));
        let stored = get_analysis(&pool, &done.id).await.unwrap().unwrap();
        assert_eq!(stored.status, AnalysisStatus::Complete);
    }

    #[tokio::test]
    async fn test_post_delete_cascades_to_spans() {
        let (_dir, pool, post_id) = setup().await;
        let analysis = insert_analysis(&pool, &post_id, &Snapshot::default()).await.unwrap();
        persist_result(
            &pool,
            &analysis.id,
            "m",
            "1",
            &[span("Fresh", &["New"])],
            &[Some(CharRange { start: 0, end: 5 })],
        )
        .await
        .unwrap();

        posts::delete_post(&pool, &post_id).await.unwrap();

        for table in ["post_analyses", "analysis_spans", "analysis_suggestions"] {
            let count: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {}", table))
                .fetch_one(&pool)
                .await
                .unwrap();
            assert_eq!(count, 0, "{} not empty", table);
        }
    }
}
