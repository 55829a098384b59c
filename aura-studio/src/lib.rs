//! aura-studio library interface
//!
//! Exposes the router and application state for the binary and for
//! integration tests.

pub mod api;
pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod services;
pub mod validation;

pub use crate::error::{ApiError, ApiResult};

use axum::extract::DefaultBodyLimit;
use axum::Router;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::services::media_storage::MEDIA_URL_PREFIX;
use crate::services::{AnalysisQueue, FeedbackProvider, MediaStorage};

/// Request body cap: five 10 MiB files plus multipart overhead
pub const MAX_REQUEST_BODY_BYTES: usize = 55 * 1024 * 1024;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool
    pub db: SqlitePool,
    /// Handle to the background analysis worker
    pub queue: AnalysisQueue,
    /// Provider used by the worker and by draft analyses
    pub feedback: Arc<dyn FeedbackProvider>,
    /// Uploaded media on disk
    pub media: MediaStorage,
    /// Service startup timestamp for uptime tracking
    pub startup_time: DateTime<Utc>,
}

impl AppState {
    pub fn new(
        db: SqlitePool,
        queue: AnalysisQueue,
        feedback: Arc<dyn FeedbackProvider>,
        media: MediaStorage,
    ) -> Self {
        Self {
            db,
            queue,
            feedback,
            media,
            startup_time: Utc::now(),
        }
    }

    /// Start the analysis worker and build state around it
    pub fn start(
        db: SqlitePool,
        feedback: Arc<dyn FeedbackProvider>,
        media_root: PathBuf,
    ) -> (Self, JoinHandle<()>) {
        let (queue, worker) = AnalysisQueue::start(db.clone(), feedback.clone());
        let state = Self::new(db, queue, feedback, MediaStorage::new(media_root));
        (state, worker)
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    let media_dir = ServeDir::new(state.media.root());

    Router::new()
        .merge(api::health_routes())
        .merge(api::campaign_routes())
        .merge(api::post_routes())
        .merge(api::analysis_routes())
        .nest_service(MEDIA_URL_PREFIX, media_dir)
        .layer(DefaultBodyLimit::max(MAX_REQUEST_BODY_BYTES))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
