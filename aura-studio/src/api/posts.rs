//! Post endpoints
//!
//! Create and update take `multipart/form-data`: text fields plus up to
//! five `media` file parts. Files are streamed to disk while the form is
//! read; if anything later rejects the request, the saved files are removed
//! again so no orphans are left behind.

use axum::{
    extract::{multipart::MultipartError, Multipart, Path, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde_json::{json, Value};

use crate::db;
use crate::error::{ApiError, ApiResult};
use crate::models::post::{DEFAULT_PLATFORM, DEFAULT_STATUS};
use crate::models::{NewMedia, Post, PostChanges, PostDraft};
use crate::services::MediaStorage;
use crate::validation::{self, ValidationError, MEDIA_MAX_PER_POST};
use crate::AppState;

/// Multipart field carrying uploaded files
const MEDIA_FIELD: &str = "media";

/// Raw form contents; `None` means the field was not sent
#[derive(Debug, Default)]
pub struct PostForm {
    pub title: Option<String>,
    pub caption: Option<String>,
    pub platform: Option<String>,
    pub status: Option<String>,
    pub scheduled_at: Option<String>,
    pub published_at: Option<String>,
    pub media: Vec<NewMedia>,
}

impl PostForm {
    fn media_urls(&self) -> Vec<String> {
        self.media.iter().map(|m| m.url.clone()).collect()
    }
}

fn multipart_error(err: MultipartError) -> ApiError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ApiError::PayloadTooLarge(err.body_text())
    } else {
        ApiError::BadRequest(err.body_text())
    }
}

/// Read all fields, saving file parts under the campaign's media directory
///
/// Files beyond the per-post limit are skipped with a warning. On error, any
/// files already saved are deleted.
pub async fn read_post_form(
    multipart: &mut Multipart,
    storage: &MediaStorage,
    campaign_id: &str,
) -> ApiResult<PostForm> {
    let mut form = PostForm::default();

    match read_fields(multipart, storage, campaign_id, &mut form).await {
        Ok(()) => Ok(form),
        Err(e) => {
            storage.delete_files(form.media_urls()).await;
            Err(e)
        }
    }
}

async fn read_fields(
    multipart: &mut Multipart,
    storage: &MediaStorage,
    campaign_id: &str,
    form: &mut PostForm,
) -> ApiResult<()> {
    let mut skipped_files = 0usize;

    while let Some(mut field) = multipart.next_field().await.map_err(multipart_error)? {
        let name = field.name().unwrap_or_default().to_string();

        if name == MEDIA_FIELD {
            let file_name = field.file_name().map(str::to_string);
            if file_name.as_deref().map(str::is_empty).unwrap_or(true) {
                // Browsers send an empty part for an untouched file input
                continue;
            }
            if form.media.len() >= MEDIA_MAX_PER_POST {
                skipped_files += 1;
                continue;
            }

            let content_type = field.content_type().map(str::to_string);
            let mut upload = storage.begin_upload(campaign_id, file_name.as_deref()).await?;

            loop {
                match field.chunk().await {
                    Ok(Some(chunk)) => {
                        if let Err(e) = upload.write_chunk(&chunk).await {
                            upload.abort().await;
                            return Err(e.into());
                        }
                    }
                    Ok(None) => break,
                    Err(e) => {
                        upload.abort().await;
                        return Err(multipart_error(e));
                    }
                }
            }

            form.media.push(upload.finish(content_type.as_deref()).await?);
            continue;
        }

        let value = field.text().await.map_err(multipart_error)?;
        match name.as_str() {
            "title" => form.title = Some(value),
            "caption" => form.caption = Some(value),
            "platform" => form.platform = Some(value),
            "status" => form.status = Some(value),
            "scheduled_at" => form.scheduled_at = Some(value),
            "published_at" => form.published_at = Some(value),
            other => tracing::debug!(field = %other, "Ignoring unknown form field"),
        }
    }

    if skipped_files > 0 {
        tracing::warn!(
            skipped = skipped_files,
            limit = MEDIA_MAX_PER_POST,
            "Too many media files; extra uploads dropped"
        );
    }

    Ok(())
}

/// Empty or whitespace-only date fields count as absent
fn parse_optional_datetime(field: &str, value: Option<&str>) -> Result<Option<DateTime<Utc>>, ValidationError> {
    match value.map(str::trim).filter(|v| !v.is_empty()) {
        Some(raw) => aura_common::time::parse_user_datetime(raw)
            .map(Some)
            .map_err(|_| ValidationError(format!("{} is not a valid ISO 8601 date/time", field))),
        None => Ok(None),
    }
}

/// Text field with fallback for missing or blank values
fn choice_or(value: Option<&str>, default: &str) -> String {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .unwrap_or(default)
        .to_string()
}

fn draft_from_form(form: &PostForm) -> Result<PostDraft, ValidationError> {
    Ok(PostDraft {
        title: validation::normalize_title(form.title.as_deref().unwrap_or_default())?,
        caption: validation::normalize_caption(form.caption.as_deref().unwrap_or_default())?,
        platform: choice_or(form.platform.as_deref(), DEFAULT_PLATFORM),
        status: choice_or(form.status.as_deref(), DEFAULT_STATUS),
        scheduled_at: parse_optional_datetime("scheduled_at", form.scheduled_at.as_deref())?,
        media: form.media.clone(),
    })
}

fn changes_from_form(form: &PostForm) -> Result<PostChanges, ValidationError> {
    Ok(PostChanges {
        title: form.title.as_deref().map(validation::normalize_title).transpose()?,
        caption: form.caption.as_deref().map(validation::normalize_caption).transpose()?,
        platform: form
            .platform
            .as_deref()
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(str::to_string),
        status: form
            .status
            .as_deref()
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(str::to_string),
        scheduled_at: parse_optional_datetime("scheduled_at", form.scheduled_at.as_deref())?,
        published_at: parse_optional_datetime("published_at", form.published_at.as_deref())?,
        media: (!form.media.is_empty()).then(|| form.media.clone()),
    })
}

/// POST /api/campaigns/:id/posts
pub async fn create_post(
    State(state): State<AppState>,
    Path(campaign_id): Path<String>,
    mut multipart: Multipart,
) -> ApiResult<(StatusCode, Json<Post>)> {
    if db::campaigns::get_campaign(&state.db, &campaign_id).await?.is_none() {
        return Err(ApiError::NotFound(format!("Campaign {}", campaign_id)));
    }

    let form = read_post_form(&mut multipart, &state.media, &campaign_id).await?;

    let result: ApiResult<Post> = async {
        let draft = draft_from_form(&form)?;
        let post = db::posts::insert_post(&state.db, &campaign_id, &draft).await?;
        Ok::<_, ApiError>(post)
    }
    .await;

    match result {
        Ok(post) => {
            tracing::info!(post_id = %post.id, campaign_id = %campaign_id, media = post.media.len(), "Post created");
            Ok((StatusCode::CREATED, Json(post)))
        }
        Err(e) => {
            state.media.delete_files(form.media_urls()).await;
            Err(e)
        }
    }
}

/// GET /api/posts/:id
pub async fn get_post(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Json<Post>> {
    let post = db::posts::get_post(&state.db, &id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Post {}", id)))?;
    Ok(Json(post))
}

/// PUT /api/posts/:id
///
/// Sent fields replace stored values; uploaded files replace the whole media
/// set, and omitting files keeps the existing media.
pub async fn update_post(
    State(state): State<AppState>,
    Path(id): Path<String>,
    mut multipart: Multipart,
) -> ApiResult<Json<Post>> {
    let existing = db::posts::get_post(&state.db, &id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Post {}", id)))?;

    let form = read_post_form(&mut multipart, &state.media, &existing.campaign_id).await?;

    let result: ApiResult<(Post, Vec<String>)> = async {
        let changes = changes_from_form(&form)?;
        db::posts::update_post(&state.db, &id, &changes)
            .await?
            .ok_or_else(|| ApiError::NotFound(format!("Post {}", id)))
    }
    .await;

    match result {
        Ok((post, replaced)) => {
            state.media.delete_files(&replaced).await;
            tracing::info!(post_id = %post.id, replaced_media = replaced.len(), "Post updated");
            Ok(Json(post))
        }
        Err(e) => {
            state.media.delete_files(form.media_urls()).await;
            Err(e)
        }
    }
}

/// DELETE /api/posts/:id
pub async fn delete_post(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Json<Value>> {
    let urls = db::posts::delete_post(&state.db, &id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Post {}", id)))?;

    state.media.delete_files(&urls).await;
    tracing::info!(post_id = %id, media_files = urls.len(), "Post deleted");

    Ok(Json(json!({ "deleted": true })))
}

/// Build post routes
///
/// Creation lives under the campaign path, see [`super::campaigns::campaign_routes`].
pub fn post_routes() -> Router<AppState> {
    Router::new().route(
        "/api/posts/:id",
        get(get_post).put(update_post).delete(delete_post),
    )
}
