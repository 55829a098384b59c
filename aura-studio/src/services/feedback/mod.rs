//! Feedback providers
//!
//! A provider turns a [`Snapshot`] into a list of flagged caption spans.
//! Two implementations exist: a live OpenAI Chat Completions client and a
//! deterministic mock for offline use and tests. Which one runs is an explicit
//! configuration choice; a misconfigured OpenAI provider fails jobs rather
//! than quietly switching to the mock.

pub mod mock;
pub mod normalize;
pub mod openai;
pub mod prompt;

pub use mock::MockFeedbackProvider;
pub use openai::OpenAiFeedbackProvider;

use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

use crate::config::{FeedbackSettings, ProviderKind};
use crate::models::{FeedbackResult, Snapshot};

/// Provider failures; the message ends up in the analysis `error` column
#[derive(Debug, Error)]
pub enum FeedbackError {
    #[error("OPENAI_API_KEY is not set; cannot run analysis")]
    MissingApiKey,

    #[error("OpenAI call failed: {0}")]
    Network(String),

    #[error("OpenAI call failed: API error {0}: {1}")]
    Api(u16, String),

    #[error("OpenAI call failed: empty response")]
    EmptyResponse,

    #[error("Failed to parse OpenAI response: {0}")]
    Parse(String),
}

/// Source of editorial feedback
#[async_trait]
pub trait FeedbackProvider: Send + Sync {
    /// Short identifier reported by the health endpoint
    fn name(&self) -> &str;

    async fn generate(&self, snapshot: &Snapshot) -> Result<FeedbackResult, FeedbackError>;
}

/// Build the configured provider
pub fn build_provider(settings: &FeedbackSettings) -> Result<Arc<dyn FeedbackProvider>, FeedbackError> {
    let provider: Arc<dyn FeedbackProvider> = match settings.provider {
        ProviderKind::Mock => Arc::new(MockFeedbackProvider::new()),
        ProviderKind::OpenAi => Arc::new(OpenAiFeedbackProvider::new(settings)?),
    };

    tracing::info!(provider = provider.name(), "Feedback provider ready");
    Ok(provider)
}
