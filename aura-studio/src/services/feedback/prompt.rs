//! Chat prompt and response schema for the OpenAI provider

use serde::Serialize;
use serde_json::{json, Value};

use crate::models::Snapshot;

/// Version tag reported when the model does not supply one
pub const PROMPT_VERSION: &str = "gpt-5-mini-v1";

const FEW_SHOT_EXAMPLES: &str = concat!(
    "FEW-SHOT EXAMPLES (for guidance only; do not repeat these in your answer)\n",
    r#"Input: {"title":"Winter Drop","caption":"Check out our new coats. They are nice and cozy."}"#,
    "\n",
    r#"Output: {"spans":[{"text":"They are nice and cozy.","severity":"minor","comment":"Be specific about benefits.","suggestions":[{"text":"They're lined with recycled fleece for sub-zero commutes.","rationale":"Names the benefit"}]}]}"#,
    "\n",
    r#"Input: {"title":"Flash Sale","caption":"Don't miss it!!! Limited time."}"#,
    "\n",
    r#"Output: {"spans":[{"text":"Don't miss it!!!","severity":"major","comment":"Hype without offer detail.","suggestions":[{"text":"Save 30% today only, automatically applied at checkout.","rationale":"Adds concrete offer"}]}]}"#,
);

/// One chat message
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChatMessage {
    pub role: &'static str,
    pub content: String,
}

/// Post fields sent as the user turn, in this key order
#[derive(Serialize)]
struct PostInput<'a> {
    title: &'a str,
    caption: &'a str,
}

/// Strict `json_schema` response format named `analysis_spans`
pub fn analysis_schema() -> Value {
    let suggestion = json!({
        "type": "object",
        "properties": {
            "id": {"type": "string"},
            "text": {"type": "string"},
            "rationale": {"type": "string"}
        },
        "required": ["id", "text", "rationale"],
        "additionalProperties": false
    });

    let span = json!({
        "type": "object",
        "properties": {
            "id": {"type": "string"},
            "text": {"type": "string"},
            "severity": {"type": "string", "enum": ["minor", "major"]},
            "comment": {"type": "string"},
            "suggestions": {"type": "array", "items": suggestion, "default": []}
        },
        "required": ["id", "text", "severity", "comment", "suggestions"],
        "additionalProperties": false
    });

    json!({
        "name": "analysis_spans",
        "schema": {
            "type": "object",
            "properties": {
                "spans": {"type": "array", "items": span, "default": []}
            },
            "required": ["spans"],
            "additionalProperties": false
        },
        "strict": true
    })
}

fn or_default<'a>(value: &'a str, fallback: &'a str) -> &'a str {
    if value.trim().is_empty() {
        fallback
    } else {
        value
    }
}

/// System prompt with campaign context, plus the post as compact JSON
pub fn build_messages(snapshot: &Snapshot) -> Vec<ChatMessage> {
    let campaign = &snapshot.campaign;
    let brand_voice = campaign.brand_voice.join(", ");

    let system = format!(
        "You are a concise social media copy editor.\n\
         \n\
         CONTEXT\n\
         - Campaign overview: {overview}\n\
         - Target audience: {audience}\n\
         - Brand voice tags: {voice}\n\
         - Guardrails: {guardrails}\n\
         - Platform: {platform}\n\
         \n\
         TASK\n\
         Analyze the post title and caption and highlight up to 5 short spans that most need improvement.\n\
         Focus on clarity, tone, compliance with guardrails, and specificity to the audience/offer.\n\
         \n\
         OUTPUT FORMAT\n\
         - Respond with a single JSON object that conforms to the provided response schema. No prose or code fences.\n\
         - Every suggestion.text MUST differ from span.text.\n\
         \n\
         {examples}",
        overview = or_default(&campaign.overview, "N/A"),
        audience = or_default(&campaign.target_audience, "N/A"),
        voice = or_default(&brand_voice, "unspecified"),
        guardrails = or_default(&campaign.guardrails, "N/A"),
        platform = or_default(&snapshot.platform, "unspecified"),
        examples = FEW_SHOT_EXAMPLES,
    );

    let user_payload = serde_json::to_string(&PostInput {
        title: &snapshot.title,
        caption: &snapshot.caption,
    })
    .unwrap_or_default();

    vec![
        ChatMessage {
            role: "system",
            content: system,
        },
        ChatMessage {
            role: "user",
            content: format!("Input: {}", user_payload),
        },
    ]
}
