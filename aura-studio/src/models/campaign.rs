//! Campaign models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::Post;

/// Campaign brief: free-text context plus brand-voice tags
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Brief {
    #[serde(default)]
    pub overview: String,
    #[serde(default)]
    pub target_audience: String,
    #[serde(default)]
    pub brand_voice: Vec<String>,
    #[serde(default)]
    pub guardrails: String,
}

/// Stored campaign
#[derive(Debug, Clone, Serialize)]
pub struct Campaign {
    pub id: String,
    pub name: String,
    pub brief: Brief,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Campaign response, optionally embedding its posts (`include=posts`)
#[derive(Debug, Clone, Serialize)]
pub struct CampaignWithPosts {
    #[serde(flatten)]
    pub campaign: Campaign,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub posts: Option<Vec<Post>>,
}

/// POST /api/campaigns request
#[derive(Debug, Clone, Deserialize)]
pub struct CampaignCreate {
    pub name: String,
    #[serde(default)]
    pub brief: Brief,
}

/// PUT /api/campaigns/:id request (partial)
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CampaignUpdate {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub brief: Option<Brief>,
}
