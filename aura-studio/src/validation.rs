//! Input normalization and length limits
//!
//! All lengths are counted in characters, not bytes.

use thiserror::Error;

use crate::models::Brief;

pub const TITLE_MAX: usize = 120;
pub const CAPTION_MAX: usize = 4000;
pub const BRIEF_MAX: usize = 2000;
pub const CAMPAIGN_NAME_MAX: usize = 80;
pub const BRAND_VOICE_MAX: usize = 8;
pub const TAG_MAX_LEN: usize = 32;
pub const MEDIA_MAX_PER_POST: usize = 5;
/// 10 MiB per uploaded file
pub const MAX_FILE_SIZE: u64 = 10 * 1024 * 1024;

/// Rejected user input (HTTP 422)
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct ValidationError(pub String);

pub type ValidationResult<T> = Result<T, ValidationError>;

pub fn trim(value: &str) -> String {
    value.trim().to_string()
}

fn check_max(field: &str, value: &str, max: usize) -> ValidationResult<()> {
    if value.chars().count() > max {
        return Err(ValidationError(format!(
            "{} must be at most {} characters",
            field, max
        )));
    }
    Ok(())
}

pub fn normalize_campaign_name(name: &str) -> ValidationResult<String> {
    let name = trim(name);
    if name.is_empty() {
        return Err(ValidationError("name must not be empty".to_string()));
    }
    check_max("name", &name, CAMPAIGN_NAME_MAX)?;
    Ok(name)
}

pub fn normalize_title(title: &str) -> ValidationResult<String> {
    let title = trim(title);
    check_max("title", &title, TITLE_MAX)?;
    Ok(title)
}

pub fn normalize_caption(caption: &str) -> ValidationResult<String> {
    let caption = trim(caption);
    check_max("caption", &caption, CAPTION_MAX)?;
    Ok(caption)
}

/// Brand-voice tags: trimmed, empties skipped, case-insensitive dedup
/// keeping first occurrence, stored lower-cased.
pub fn normalize_brand_voice(tags: &[String]) -> ValidationResult<Vec<String>> {
    if tags.len() > BRAND_VOICE_MAX {
        return Err(ValidationError(format!(
            "brand_voice accepts at most {} tags",
            BRAND_VOICE_MAX
        )));
    }

    let mut normalized: Vec<String> = Vec::with_capacity(tags.len());
    for tag in tags {
        let tag = tag.trim();
        if tag.is_empty() {
            continue;
        }
        if tag.chars().count() > TAG_MAX_LEN {
            return Err(ValidationError(format!(
                "brand_voice tag '{}' exceeds {} characters",
                tag, TAG_MAX_LEN
            )));
        }
        let lowered = tag.to_lowercase();
        if !normalized.contains(&lowered) {
            normalized.push(lowered);
        }
    }

    Ok(normalized)
}

pub fn normalize_brief(brief: &Brief) -> ValidationResult<Brief> {
    let overview = trim(&brief.overview);
    check_max("overview", &overview, BRIEF_MAX)?;
    let target_audience = trim(&brief.target_audience);
    check_max("target_audience", &target_audience, BRIEF_MAX)?;
    let guardrails = trim(&brief.guardrails);
    check_max("guardrails", &guardrails, BRIEF_MAX)?;

    Ok(Brief {
        overview,
        target_audience,
        brand_voice: normalize_brand_voice(&brief.brand_voice)?,
        guardrails,
    })
}
