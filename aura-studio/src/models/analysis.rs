//! Analysis models
//!
//! An analysis moves through `pending → running → complete | failed`.
//! The snapshot captured at trigger time is what the feedback provider sees,
//! so later edits to the post never change a finished analysis.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Analysis lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnalysisStatus {
    /// Record created, job queued
    Pending,
    /// Worker picked the job up
    Running,
    /// Spans persisted
    Complete,
    /// Provider or persistence failed
    Failed,
}

impl AnalysisStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AnalysisStatus::Pending => "pending",
            AnalysisStatus::Running => "running",
            AnalysisStatus::Complete => "complete",
            AnalysisStatus::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, AnalysisStatus::Complete | AnalysisStatus::Failed)
    }
}

impl fmt::Display for AnalysisStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AnalysisStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(AnalysisStatus::Pending),
            "running" => Ok(AnalysisStatus::Running),
            "complete" => Ok(AnalysisStatus::Complete),
            "failed" => Ok(AnalysisStatus::Failed),
            other => Err(format!("Unknown analysis status: {}", other)),
        }
    }
}

/// Span severity
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    #[default]
    Minor,
    Major,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Minor => "minor",
            Severity::Major => "major",
        }
    }

    /// Lenient parse: anything other than "major" is minor
    pub fn from_loose(value: &str) -> Self {
        if value.trim().eq_ignore_ascii_case("major") {
            Severity::Major
        } else {
            Severity::Minor
        }
    }
}

/// Campaign context captured with a snapshot
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CampaignContext {
    #[serde(default)]
    pub overview: String,
    #[serde(default)]
    pub target_audience: String,
    #[serde(default)]
    pub guardrails: String,
    #[serde(default)]
    pub brand_voice: Vec<String>,
}

/// Media reference captured with a snapshot
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotMedia {
    pub id: String,
    pub url: String,
    #[serde(rename = "type")]
    pub media_type: String,
}

/// Immutable copy of a post (and its campaign context) at trigger time
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Absent for draft analyses
    #[serde(default)]
    pub post_id: Option<String>,
    #[serde(default)]
    pub campaign_id: Option<String>,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub caption: String,
    #[serde(default)]
    pub platform: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub scheduled_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub published_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub media: Vec<SnapshotMedia>,
    #[serde(default)]
    pub campaign: CampaignContext,
}

/// Normalized provider output
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedbackResult {
    pub model: String,
    pub prompt_version: String,
    pub spans: Vec<FeedbackSpan>,
}

/// Provider span before offsets are assigned
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedbackSpan {
    pub text: String,
    pub severity: Severity,
    pub comment: String,
    /// Offsets proposed by the provider, verified before use
    pub start_offset: Option<usize>,
    pub end_offset: Option<usize>,
    pub suggestions: Vec<FeedbackSuggestion>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedbackSuggestion {
    pub text: String,
    pub rationale: Option<String>,
}

/// Stored analysis record
#[derive(Debug, Clone)]
pub struct Analysis {
    pub id: String,
    pub post_id: String,
    pub status: AnalysisStatus,
    pub source: String,
    pub input_snapshot: Snapshot,
    pub model: Option<String>,
    pub prompt_version: Option<String>,
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Suggestion as returned to clients
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisSuggestion {
    pub id: String,
    pub text: String,
    pub rationale: Option<String>,
}

/// Span as returned to clients
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisSpan {
    pub id: String,
    pub text: String,
    pub severity: Severity,
    pub comment: String,
    pub start_offset: Option<i64>,
    pub end_offset: Option<i64>,
    pub suggestions: Vec<AnalysisSuggestion>,
}

/// Analysis response body
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisOut {
    pub analysis_id: String,
    pub status: AnalysisStatus,
    pub spans: Vec<AnalysisSpan>,
    /// True when the post changed after the snapshot was taken
    pub post_updated_after_snapshot: bool,
    pub model: Option<String>,
    pub prompt_version: Option<String>,
    pub error: Option<String>,
}

/// POST /api/analysis/draft request
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DraftAnalysisRequest {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub caption: String,
    #[serde(default)]
    pub platform: Option<String>,
    #[serde(default)]
    pub campaign_context: Option<CampaignContext>,
}
