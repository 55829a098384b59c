//! Campaign endpoints

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::db;
use crate::error::{ApiError, ApiJson, ApiResult};
use crate::models::{Campaign, CampaignCreate, CampaignUpdate, CampaignWithPosts, Post};
use crate::validation;
use crate::AppState;

/// Query string for campaign reads
#[derive(Debug, Default, Deserialize)]
pub struct CampaignQuery {
    /// Case-insensitive name filter (list only)
    pub search: Option<String>,
    /// `posts` embeds each campaign's posts
    pub include: Option<String>,
}

impl CampaignQuery {
    fn include_posts(&self) -> bool {
        self.include
            .as_deref()
            .map(|value| value.split(',').any(|part| part.trim() == "posts"))
            .unwrap_or(false)
    }
}

#[derive(Debug, Serialize)]
pub struct CampaignListResponse {
    pub campaigns: Vec<CampaignWithPosts>,
}

#[derive(Debug, Serialize)]
pub struct PostListResponse {
    pub posts: Vec<Post>,
}

async fn with_posts(state: &AppState, campaign: Campaign, include_posts: bool) -> ApiResult<CampaignWithPosts> {
    let posts = if include_posts {
        Some(db::posts::list_posts_for_campaign(&state.db, &campaign.id).await?)
    } else {
        None
    };
    Ok(CampaignWithPosts { campaign, posts })
}

async fn require_campaign(state: &AppState, id: &str) -> ApiResult<Campaign> {
    db::campaigns::get_campaign(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Campaign {}", id)))
}

/// GET /api/campaigns
pub async fn list_campaigns(
    State(state): State<AppState>,
    Query(query): Query<CampaignQuery>,
) -> ApiResult<Json<CampaignListResponse>> {
    let include_posts = query.include_posts();
    let campaigns = db::campaigns::list_campaigns(&state.db, query.search.as_deref()).await?;

    let mut out = Vec::with_capacity(campaigns.len());
    for campaign in campaigns {
        out.push(with_posts(&state, campaign, include_posts).await?);
    }

    Ok(Json(CampaignListResponse { campaigns: out }))
}

/// POST /api/campaigns
pub async fn create_campaign(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<CampaignCreate>,
) -> ApiResult<(StatusCode, Json<Campaign>)> {
    let name = validation::normalize_campaign_name(&request.name)?;
    let brief = validation::normalize_brief(&request.brief)?;

    let campaign = db::campaigns::insert_campaign(&state.db, &name, &brief).await?;
    tracing::info!(campaign_id = %campaign.id, name = %campaign.name, "Campaign created");

    Ok((StatusCode::CREATED, Json(campaign)))
}

/// GET /api/campaigns/:id
pub async fn get_campaign(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<CampaignQuery>,
) -> ApiResult<Json<CampaignWithPosts>> {
    let campaign = require_campaign(&state, &id).await?;
    Ok(Json(with_posts(&state, campaign, query.include_posts()).await?))
}

/// PUT /api/campaigns/:id
pub async fn update_campaign(
    State(state): State<AppState>,
    Path(id): Path<String>,
    ApiJson(request): ApiJson<CampaignUpdate>,
) -> ApiResult<Json<Campaign>> {
    let name = request
        .name
        .as_deref()
        .map(validation::normalize_campaign_name)
        .transpose()?;
    let brief = request
        .brief
        .as_ref()
        .map(validation::normalize_brief)
        .transpose()?;

    let campaign = db::campaigns::update_campaign(&state.db, &id, name.as_deref(), brief.as_ref())
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Campaign {}", id)))?;

    tracing::info!(campaign_id = %campaign.id, "Campaign updated");
    Ok(Json(campaign))
}

/// DELETE /api/campaigns/:id
pub async fn delete_campaign(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Value>> {
    let urls = db::campaigns::delete_campaign(&state.db, &id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Campaign {}", id)))?;

    state.media.delete_files(&urls).await;
    tracing::info!(campaign_id = %id, media_files = urls.len(), "Campaign deleted");

    Ok(Json(json!({ "deleted": true })))
}

/// GET /api/campaigns/:id/posts
pub async fn list_campaign_posts(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<PostListResponse>> {
    require_campaign(&state, &id).await?;
    let posts = db::posts::list_posts_for_campaign(&state.db, &id).await?;
    Ok(Json(PostListResponse { posts }))
}

/// Build campaign routes
pub fn campaign_routes() -> Router<AppState> {
    Router::new()
        .route("/api/campaigns", get(list_campaigns).post(create_campaign))
        .route(
            "/api/campaigns/:id",
            get(get_campaign).put(update_campaign).delete(delete_campaign),
        )
        .route(
            "/api/campaigns/:id/posts",
            get(list_campaign_posts).post(super::posts::create_post),
        )
}
