//! OpenAI Chat Completions provider
//!
//! Sends the prompt from [`super::prompt`] with a strict JSON schema response
//! format and normalizes whatever comes back.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;

use super::normalize::{normalize, RawFeedback};
use super::prompt::{analysis_schema, build_messages, ChatMessage, PROMPT_VERSION};
use super::{FeedbackError, FeedbackProvider};
use crate::config::FeedbackSettings;
use crate::models::{FeedbackResult, Snapshot};

const USER_AGENT: &str = concat!("aura-studio/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
    response_format: Value,
    max_completion_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    reasoning_effort: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    content: Option<String>,
}

/// Live provider backed by the Chat Completions API
pub struct OpenAiFeedbackProvider {
    http_client: reqwest::Client,
    api_key: Option<String>,
    model: String,
    base_url: String,
    max_output_tokens: u32,
    reasoning_effort: Option<String>,
}

impl OpenAiFeedbackProvider {
    /// Build the HTTP client; a missing key is reported per job, not here
    pub fn new(settings: &FeedbackSettings) -> Result<Self, FeedbackError> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(settings.timeout)
            .connect_timeout(Duration::from_secs(5).min(settings.timeout))
            .build()
            .map_err(|e| FeedbackError::Network(e.to_string()))?;

        Ok(Self {
            http_client,
            api_key: settings.openai_api_key.clone(),
            model: settings.openai_model.clone(),
            base_url: settings.openai_base_url.trim_end_matches('/').to_string(),
            max_output_tokens: settings.max_output_tokens,
            reasoning_effort: settings.reasoning_effort.clone(),
        })
    }

    async fn chat_json(&self, api_key: &str, messages: Vec<ChatMessage>) -> Result<Value, FeedbackError> {
        let url = format!("{}/chat/completions", self.base_url);
        let request = ChatRequest {
            model: &self.model,
            messages,
            response_format: serde_json::json!({
                "type": "json_schema",
                "json_schema": analysis_schema(),
            }),
            max_completion_tokens: self.max_output_tokens,
            reasoning_effort: self.reasoning_effort.as_deref(),
        };

        tracing::debug!(url = %url, model = %self.model, "Calling chat completions");

        let response = self
            .http_client
            .post(&url)
            .bearer_auth(api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| FeedbackError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(FeedbackError::Api(status.as_u16(), error_text));
        }

        let body: ChatResponse = response
            .json()
            .await
            .map_err(|e| FeedbackError::Parse(e.to_string()))?;

        let content = body
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .filter(|content| !content.trim().is_empty())
            .ok_or(FeedbackError::EmptyResponse)?;

        serde_json::from_str(&content).map_err(|e| FeedbackError::Parse(e.to_string()))
    }
}

#[async_trait]
impl FeedbackProvider for OpenAiFeedbackProvider {
    fn name(&self) -> &str {
        "openai"
    }

    async fn generate(&self, snapshot: &Snapshot) -> Result<FeedbackResult, FeedbackError> {
        if snapshot.caption.trim().is_empty() {
            return Ok(FeedbackResult {
                model: self.model.clone(),
                prompt_version: PROMPT_VERSION.to_string(),
                spans: Vec::new(),
            });
        }

        let api_key = self.api_key.as_deref().ok_or(FeedbackError::MissingApiKey)?;

        let value = self.chat_json(api_key, build_messages(snapshot)).await?;
        let raw: RawFeedback =
            serde_json::from_value(value).map_err(|e| FeedbackError::Parse(e.to_string()))?;
        let result = normalize(raw, &self.model);

        tracing::info!(
            model = %result.model,
            spans = result.spans.len(),
            "Feedback generated"
        );

        Ok(result)
    }
}
