//! Service layer for aura-studio
//!
//! Handlers stay thin; the analysis pipeline, feedback providers and media
//! storage live here.

pub mod analysis;
pub mod analysis_queue;
pub mod feedback;
pub mod media_storage;
pub mod span_mapper;

pub use analysis_queue::{AnalysisJob, AnalysisQueue};
pub use feedback::{
    build_provider, FeedbackError, FeedbackProvider, MockFeedbackProvider, OpenAiFeedbackProvider,
};
pub use media_storage::{MediaStorage, StorageError};
pub use span_mapper::{map_spans, CharRange};
