//! Deterministic offline provider

use async_trait::async_trait;

use super::{FeedbackError, FeedbackProvider};
use crate::models::{FeedbackResult, FeedbackSpan, FeedbackSuggestion, Severity, Snapshot};

pub const MOCK_MODEL: &str = "mock-v1";
pub const MOCK_PROMPT_VERSION: &str = "1";

const MIN_SENTENCE_CHARS: usize = 10;
const MAX_SPANS: usize = 2;
const SUGGESTION_PREFIX_CHARS: usize = 50;

/// Flags up to two sentences of the caption with canned feedback
#[derive(Debug, Default, Clone)]
pub struct MockFeedbackProvider;

impl MockFeedbackProvider {
    pub fn new() -> Self {
        Self
    }

    pub fn feedback_for(&self, caption: &str) -> FeedbackResult {
        let mut spans = Vec::new();

        if !caption.trim().is_empty() {
            for (index, sentence) in split_sentences(caption).into_iter().enumerate() {
                if sentence.chars().count() < MIN_SENTENCE_CHARS {
                    continue;
                }
                if spans.len() >= MAX_SPANS {
                    break;
                }

                let severity = if index % 2 == 0 {
                    Severity::Minor
                } else {
                    Severity::Major
                };
                let comment = match severity {
                    Severity::Minor => "Consider making this more engaging.",
                    Severity::Major => "This could be more impactful.",
                };
                let prefix: String = sentence.chars().take(SUGGESTION_PREFIX_CHARS).collect();

                spans.push(FeedbackSpan {
                    text: sentence.to_string(),
                    severity,
                    comment: comment.to_string(),
                    start_offset: None,
                    end_offset: None,
                    suggestions: vec![FeedbackSuggestion {
                        text: format!("Consider a sharper phrasing: {}...", prefix),
                        rationale: Some("A more concrete phrase increases engagement.".to_string()),
                    }],
                });
            }
        }

        FeedbackResult {
            model: MOCK_MODEL.to_string(),
            prompt_version: MOCK_PROMPT_VERSION.to_string(),
            spans,
        }
    }
}

#[async_trait]
impl FeedbackProvider for MockFeedbackProvider {
    fn name(&self) -> &str {
        "mock"
    }

    async fn generate(&self, snapshot: &Snapshot) -> Result<FeedbackResult, FeedbackError> {
        Ok(self.feedback_for(&snapshot.caption))
    }
}

/// Split on `.`, `!` or `?` followed by whitespace or end of text
///
/// Pieces are trimmed and empty ones dropped.
pub fn split_sentences(text: &str) -> Vec<&str> {
    let mut sentences = Vec::new();
    let mut start = 0;
    let mut chars = text.char_indices().peekable();

    while let Some((index, c)) = chars.next() {
        if !matches!(c, '.' | '!' | '?') {
            continue;
        }
        let at_boundary = match chars.peek() {
            Some((_, next)) => next.is_whitespace(),
            None => true,
        };
        if at_boundary {
            let end = index + c.len_utf8();
            sentences.push(&text[start..end]);
            start = end;
        }
    }
    sentences.push(&text[start..]);

    sentences
        .into_iter()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect()
}
