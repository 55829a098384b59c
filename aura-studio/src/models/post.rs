//! Post and media models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Default platform for new posts
pub const DEFAULT_PLATFORM: &str = "instagram";

/// Default status for new posts
pub const DEFAULT_STATUS: &str = "draft";

/// Media attachment as returned to clients
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Media {
    pub id: String,
    pub url: String,
    /// "image" or "video"
    #[serde(rename = "type")]
    pub media_type: String,
    pub width: Option<i64>,
    pub height: Option<i64>,
    pub size_bytes: Option<i64>,
}

/// Media attachment about to be stored
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewMedia {
    pub url: String,
    pub media_type: String,
    pub width: Option<i64>,
    pub height: Option<i64>,
    pub size_bytes: Option<i64>,
}

/// Stored post with its media
#[derive(Debug, Clone, Serialize)]
pub struct Post {
    pub id: String,
    pub campaign_id: String,
    pub title: String,
    pub caption: String,
    pub media: Vec<Media>,
    pub platform: String,
    pub status: String,
    pub scheduled_at: Option<DateTime<Utc>>,
    pub published_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Validated input for a new post
#[derive(Debug, Clone)]
pub struct PostDraft {
    pub title: String,
    pub caption: String,
    pub platform: String,
    pub status: String,
    pub scheduled_at: Option<DateTime<Utc>>,
    pub media: Vec<NewMedia>,
}

/// Validated partial update; `None` leaves a field untouched
#[derive(Debug, Clone, Default)]
pub struct PostChanges {
    pub title: Option<String>,
    pub caption: Option<String>,
    pub platform: Option<String>,
    pub status: Option<String>,
    pub scheduled_at: Option<DateTime<Utc>>,
    pub published_at: Option<DateTime<Utc>>,
    /// Replacement media set (only when files were uploaded)
    pub media: Option<Vec<NewMedia>>,
}
