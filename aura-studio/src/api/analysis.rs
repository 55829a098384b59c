//! Analysis endpoints

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;

use crate::error::{ApiJson, ApiResult};
use crate::models::{AnalysisOut, AnalysisStatus, DraftAnalysisRequest};
use crate::services::analysis;
use crate::AppState;

/// Path segment selecting the newest analysis instead of an ID
const LATEST: &str = "latest";

/// POST /api/posts/:id/analysis response
#[derive(Debug, Serialize)]
pub struct TriggerResponse {
    pub analysis_id: String,
    pub status: AnalysisStatus,
}

/// POST /api/posts/:id/analysis
///
/// Returns immediately; poll the analysis until its status is terminal.
pub async fn trigger_analysis(
    State(state): State<AppState>,
    Path(post_id): Path<String>,
) -> ApiResult<(StatusCode, Json<TriggerResponse>)> {
    let analysis = analysis::enqueue_analysis(&state.db, &state.queue, &post_id).await?;

    Ok((
        StatusCode::CREATED,
        Json(TriggerResponse {
            analysis_id: analysis.id,
            status: analysis.status,
        }),
    ))
}

/// GET /api/posts/:id/analysis/:analysis_id
///
/// `latest` as the ID returns the newest analysis, or `null` if the post has
/// never been analyzed.
pub async fn get_analysis(
    State(state): State<AppState>,
    Path((post_id, analysis_id)): Path<(String, String)>,
) -> ApiResult<Json<Option<AnalysisOut>>> {
    if analysis_id == LATEST {
        return Ok(Json(analysis::latest_analysis(&state.db, &post_id).await?));
    }

    let out = analysis::get_analysis(&state.db, &post_id, &analysis_id).await?;
    Ok(Json(Some(out)))
}

/// POST /api/analysis/draft
pub async fn analyze_draft(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<DraftAnalysisRequest>,
) -> ApiResult<Json<AnalysisOut>> {
    let out = analysis::run_draft(state.feedback.as_ref(), request).await?;
    Ok(Json(out))
}

/// Build analysis routes
pub fn analysis_routes() -> Router<AppState> {
    Router::new()
        .route("/api/posts/:id/analysis", post(trigger_analysis))
        .route("/api/posts/:id/analysis/:analysis_id", get(get_analysis))
        .route("/api/analysis/draft", post(analyze_draft))
}
