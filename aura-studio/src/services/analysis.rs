//! Analysis pipeline
//!
//! Trigger: snapshot the post, store a `pending` record, enqueue a job.
//! Worker: `running`, call the provider, anchor spans, persist as `complete`
//! in one transaction. Any failure along the way ends in `failed` with the
//! error message stored on the record.

use aura_common::uuid_utils;
use sqlx::SqlitePool;
use thiserror::Error;

use super::analysis_queue::{AnalysisJob, AnalysisQueue};
use super::feedback::{FeedbackError, FeedbackProvider};
use super::span_mapper::{map_spans, CharRange};
use crate::db;
use crate::error::{ApiError, ApiResult};
use crate::models::{
    Analysis, AnalysisOut, AnalysisSpan, AnalysisStatus, AnalysisSuggestion, CampaignContext,
    DraftAnalysisRequest, FeedbackResult, Post, Snapshot, SnapshotMedia,
};
use crate::validation;

/// Why a job ended in `failed`
#[derive(Debug, Error)]
enum JobError {
    #[error(transparent)]
    Feedback(#[from] FeedbackError),

    #[error("Failed to persist analysis: {0}")]
    Persist(#[from] aura_common::Error),
}

/// Capture the post and its campaign context as the provider will see them
pub async fn snapshot_post(pool: &SqlitePool, post: &Post) -> ApiResult<Snapshot> {
    let campaign = db::campaigns::get_campaign(pool, &post.campaign_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Campaign {}", post.campaign_id)))?;

    Ok(Snapshot {
        post_id: Some(post.id.clone()),
        campaign_id: Some(post.campaign_id.clone()),
        title: post.title.clone(),
        caption: post.caption.clone(),
        platform: post.platform.clone(),
        status: post.status.clone(),
        scheduled_at: post.scheduled_at,
        published_at: post.published_at,
        media: post
            .media
            .iter()
            .map(|m| SnapshotMedia {
                id: m.id.clone(),
                url: m.url.clone(),
                media_type: m.media_type.clone(),
            })
            .collect(),
        campaign: CampaignContext {
            overview: campaign.brief.overview,
            target_audience: campaign.brief.target_audience,
            guardrails: campaign.brief.guardrails,
            brand_voice: campaign.brief.brand_voice,
        },
    })
}

/// Create a `pending` analysis for a post and queue it
pub async fn enqueue_analysis(pool: &SqlitePool, queue: &AnalysisQueue, post_id: &str) -> ApiResult<Analysis> {
    let post = load_post(pool, post_id).await?;
    let snapshot = snapshot_post(pool, &post).await?;
    let analysis = db::analyses::insert_analysis(pool, &post.id, &snapshot).await?;

    let job = AnalysisJob {
        analysis_id: analysis.id.clone(),
        post_id: post.id.clone(),
    };

    if let Err(e) = queue.enqueue(job) {
        tracing::error!(analysis_id = %analysis.id, "Could not enqueue analysis: {}", e);
        db::analyses::mark_failed(pool, &analysis.id, &e.to_string()).await?;
        return Err(ApiError::Internal(e.to_string()));
    }

    tracing::info!(analysis_id = %analysis.id, post_id = %post.id, "Analysis queued");
    Ok(analysis)
}

/// Execute one queued job to a terminal state
///
/// Errors are recorded on the analysis rather than returned.
pub async fn run_job(pool: &SqlitePool, provider: &dyn FeedbackProvider, job: &AnalysisJob) {
    let analysis = match db::analyses::get_analysis(pool, &job.analysis_id).await {
        Ok(Some(analysis)) => analysis,
        Ok(None) => {
            tracing::warn!(analysis_id = %job.analysis_id, "Analysis vanished before it ran; skipping");
            return;
        }
        Err(e) => {
            tracing::error!(analysis_id = %job.analysis_id, error = %e, "Failed to load analysis");
            return;
        }
    };

    if analysis.status.is_terminal() {
        tracing::warn!(analysis_id = %analysis.id, status = %analysis.status, "Analysis already finished; skipping");
        return;
    }

    match db::posts::get_post(pool, &job.post_id).await {
        Ok(Some(_)) => {}
        Ok(None) => {
            tracing::warn!(analysis_id = %analysis.id, post_id = %job.post_id, "Post vanished before analysis ran; skipping");
            return;
        }
        Err(e) => {
            tracing::error!(analysis_id = %analysis.id, error = %e, "Failed to load post");
            record_failure(pool, &analysis.id, &e.to_string()).await;
            return;
        }
    }

    match db::analyses::mark_running(pool, &analysis.id).await {
        Ok(true) => {}
        Ok(false) => {
            tracing::warn!(analysis_id = %analysis.id, status = %analysis.status, "Analysis not pending; skipping");
            return;
        }
        Err(e) => {
            record_failure(pool, &analysis.id, &e.to_string()).await;
            return;
        }
    }

    let started = std::time::Instant::now();
    match execute(pool, provider, &analysis).await {
        Ok(span_count) => {
            tracing::info!(
                analysis_id = %analysis.id,
                spans = span_count,
                elapsed_ms = started.elapsed().as_millis() as u64,
                "Analysis complete"
            );
        }
        Err(e) => {
            tracing::warn!(analysis_id = %analysis.id, error = %e, "Analysis failed");
            record_failure(pool, &analysis.id, &e.to_string()).await;
        }
    }
}

async fn execute(pool: &SqlitePool, provider: &dyn FeedbackProvider, analysis: &Analysis) -> Result<usize, JobError> {
    let snapshot = &analysis.input_snapshot;
    let result = provider.generate(snapshot).await?;
    let ranges = map_spans(&snapshot.caption, &result.spans);

    db::analyses::persist_result(
        pool,
        &analysis.id,
        &result.model,
        &result.prompt_version,
        &result.spans,
        &ranges,
    )
    .await?;

    Ok(result.spans.len())
}

async fn record_failure(pool: &SqlitePool, analysis_id: &str, message: &str) {
    if let Err(e) = db::analyses::mark_failed(pool, analysis_id, message).await {
        tracing::error!(analysis_id = %analysis_id, error = %e, "Failed to record analysis failure");
    }
}

/// Response view of a stored analysis
///
/// `post` is the current post; the analysis is stale when the post changed
/// after the snapshot was taken.
pub async fn analysis_view(pool: &SqlitePool, analysis: Analysis, post: &Post) -> ApiResult<AnalysisOut> {
    let spans = db::analyses::load_spans(pool, &analysis.id).await?;

    Ok(AnalysisOut {
        post_updated_after_snapshot: post.updated_at > analysis.created_at,
        analysis_id: analysis.id,
        status: analysis.status,
        spans,
        model: analysis.model,
        prompt_version: analysis.prompt_version,
        error: analysis.error,
    })
}

/// Fetch one analysis, which must belong to the post
pub async fn get_analysis(pool: &SqlitePool, post_id: &str, analysis_id: &str) -> ApiResult<AnalysisOut> {
    let post = load_post(pool, post_id).await?;

    let analysis = db::analyses::get_analysis(pool, analysis_id)
        .await?
        .filter(|a| a.post_id == post.id)
        .ok_or_else(|| ApiError::NotFound(format!("Analysis {}", analysis_id)))?;

    analysis_view(pool, analysis, &post).await
}

/// Most recent analysis of a post, if any
pub async fn latest_analysis(pool: &SqlitePool, post_id: &str) -> ApiResult<Option<AnalysisOut>> {
    let post = load_post(pool, post_id).await?;

    match db::analyses::latest_analysis_for_post(pool, &post.id).await? {
        Some(analysis) => Ok(Some(analysis_view(pool, analysis, &post).await?)),
        None => Ok(None),
    }
}

/// Analyze unsaved content synchronously; nothing is stored
pub async fn run_draft(provider: &dyn FeedbackProvider, request: DraftAnalysisRequest) -> ApiResult<AnalysisOut> {
    let caption = validation::normalize_caption(&request.caption)?;
    let title = request
        .title
        .as_deref()
        .map(validation::normalize_title)
        .transpose()?
        .unwrap_or_default();

    let snapshot = Snapshot {
        title,
        caption,
        platform: request.platform.unwrap_or_default(),
        campaign: request.campaign_context.unwrap_or_default(),
        ..Default::default()
    };

    let result = provider.generate(&snapshot).await?;
    let ranges = map_spans(&snapshot.caption, &result.spans);

    tracing::debug!(spans = result.spans.len(), "Draft analysis complete");
    Ok(draft_view(result, &ranges))
}

fn draft_view(result: FeedbackResult, ranges: &[Option<CharRange>]) -> AnalysisOut {
    let spans = result
        .spans
        .into_iter()
        .zip(ranges)
        .map(|(span, range)| AnalysisSpan {
            id: uuid_utils::generate_id(),
            text: span.text,
            severity: span.severity,
            comment: span.comment,
            start_offset: range.map(|r| r.start as i64),
            end_offset: range.map(|r| r.end as i64),
            suggestions: span
                .suggestions
                .into_iter()
                .map(|s| AnalysisSuggestion {
                    id: uuid_utils::generate_id(),
                    text: s.text,
                    rationale: s.rationale,
                })
                .collect(),
        })
        .collect();

    AnalysisOut {
        analysis_id: uuid_utils::generate_id(),
        status: AnalysisStatus::Complete,
        spans,
        post_updated_after_snapshot: false,
        model: Some(result.model),
        prompt_version: Some(result.prompt_version),
        error: None,
    }
}

async fn load_post(pool: &SqlitePool, post_id: &str) -> ApiResult<Post> {
    db::posts::get_post(pool, post_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Post {}", post_id)))
}
