//! Data models for aura-studio
//!
//! - Campaigns with brief and brand-voice tags
//! - Posts and their media attachments
//! - Analyses, spans and suggestions produced by the feedback pipeline

pub mod analysis;
pub mod campaign;
pub mod post;

pub use analysis::{
    Analysis, AnalysisOut, AnalysisSpan, AnalysisStatus, AnalysisSuggestion, CampaignContext,
    DraftAnalysisRequest, FeedbackResult, FeedbackSpan, FeedbackSuggestion, Severity, Snapshot,
    SnapshotMedia,
};
pub use campaign::{Brief, Campaign, CampaignCreate, CampaignUpdate, CampaignWithPosts};
pub use post::{Media, NewMedia, Post, PostChanges, PostDraft};
