//! Lenient parsing of model output into [`FeedbackResult`]

use serde::Deserialize;

use super::prompt::PROMPT_VERSION;
use crate::models::{FeedbackResult, FeedbackSpan, FeedbackSuggestion, Severity};

/// Model output as loosely as it may arrive
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct RawFeedback {
    pub model: Option<String>,
    pub prompt_version: Option<String>,
    pub spans: Option<Vec<RawSpan>>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct RawSpan {
    pub text: Option<String>,
    pub severity: Option<String>,
    pub comment: Option<String>,
    pub message: Option<String>,
    #[serde(alias = "start")]
    pub start_offset: Option<i64>,
    #[serde(alias = "end")]
    pub end_offset: Option<i64>,
    pub suggestions: Option<Vec<RawSuggestion>>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct RawSuggestion {
    pub text: Option<String>,
    pub rationale: Option<String>,
}

/// Drop unusable spans/suggestions and fill defaults
///
/// `default_model` is used when the payload names no model.
pub fn normalize(raw: RawFeedback, default_model: &str) -> FeedbackResult {
    let spans = raw
        .spans
        .unwrap_or_default()
        .into_iter()
        .filter_map(normalize_span)
        .collect();

    FeedbackResult {
        model: non_empty(raw.model).unwrap_or_else(|| default_model.to_string()),
        prompt_version: non_empty(raw.prompt_version).unwrap_or_else(|| PROMPT_VERSION.to_string()),
        spans,
    }
}

fn normalize_span(span: RawSpan) -> Option<FeedbackSpan> {
    let text = span.text.as_deref().unwrap_or_default().trim().to_string();
    if text.is_empty() {
        return None;
    }

    let suggestions = span
        .suggestions
        .unwrap_or_default()
        .into_iter()
        .filter_map(|suggestion| {
            let suggestion_text = suggestion.text.as_deref().unwrap_or_default().trim().to_string();
            if suggestion_text.is_empty() || suggestion_text == text {
                return None;
            }
            Some(FeedbackSuggestion {
                text: suggestion_text,
                rationale: suggestion.rationale,
            })
        })
        .collect();

    let to_offset = |value: Option<i64>| value.and_then(|v| usize::try_from(v).ok());

    Some(FeedbackSpan {
        severity: Severity::from_loose(span.severity.as_deref().unwrap_or_default()),
        comment: non_empty(span.comment)
            .or_else(|| non_empty(span.message))
            .unwrap_or_default(),
        start_offset: to_offset(span.start_offset),
        end_offset: to_offset(span.end_offset),
        text,
        suggestions,
    })
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}
