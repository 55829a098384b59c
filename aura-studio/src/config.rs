//! Configuration resolution for aura-studio
//!
//! Feedback settings resolve with Environment → TOML → default priority.
//! The root folder goes through [`aura_common::config::RootFolderResolver`].

use aura_common::{Error, Result};
use serde::Deserialize;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use tracing::{info, warn};

/// Default HTTP port
pub const DEFAULT_PORT: u16 = 4000;
pub const DEFAULT_OPENAI_MODEL: &str = "gpt-5-mini";
pub const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_TIMEOUT_SECONDS: u64 = 15;
pub const DEFAULT_MAX_OUTPUT_TOKENS: u32 = 800;

pub const ENV_PROVIDER: &str = "AURA_FEEDBACK_PROVIDER";
pub const ENV_OPENAI_API_KEY: &str = "OPENAI_API_KEY";
pub const ENV_OPENAI_MODEL: &str = "OPENAI_MODEL";
pub const ENV_OPENAI_BASE_URL: &str = "OPENAI_BASE_URL";
pub const ENV_TIMEOUT_SECONDS: &str = "AI_TIMEOUT_SECONDS";
pub const ENV_MAX_OUTPUT_TOKENS: &str = "AI_MAX_OUTPUT_TOKENS";
pub const ENV_REASONING_EFFORT: &str = "AI_REASONING_EFFORT";

/// Contents of `aura-studio.toml`
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct StudioTomlConfig {
    pub root_folder: Option<PathBuf>,
    pub port: Option<u16>,
    pub logging: LoggingConfig,
    pub feedback: FeedbackTomlConfig,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// tracing EnvFilter directive, e.g. "debug" or "aura_studio=trace"
    pub level: Option<String>,
}

/// `[feedback]` table
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct FeedbackTomlConfig {
    pub provider: Option<String>,
    pub openai_api_key: Option<String>,
    pub openai_model: Option<String>,
    pub openai_base_url: Option<String>,
    pub timeout_seconds: Option<u64>,
    pub max_output_tokens: Option<u32>,
    pub reasoning_effort: Option<String>,
}

/// Which feedback provider runs analyses
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderKind {
    OpenAi,
    Mock,
}

impl ProviderKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderKind::OpenAi => "openai",
            ProviderKind::Mock => "mock",
        }
    }
}

impl FromStr for ProviderKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "openai" => Ok(ProviderKind::OpenAi),
            "mock" => Ok(ProviderKind::Mock),
            other => Err(Error::Config(format!(
                "Unknown feedback provider '{}' (expected 'openai' or 'mock')",
                other
            ))),
        }
    }
}

/// Resolved feedback provider settings
#[derive(Debug, Clone)]
pub struct FeedbackSettings {
    pub provider: ProviderKind,
    /// `None` is allowed at startup; OpenAI jobs then fail with a clear error
    pub openai_api_key: Option<String>,
    pub openai_model: String,
    pub openai_base_url: String,
    pub timeout: Duration,
    pub max_output_tokens: u32,
    pub reasoning_effort: Option<String>,
}

impl Default for FeedbackSettings {
    fn default() -> Self {
        Self {
            provider: ProviderKind::OpenAi,
            openai_api_key: None,
            openai_model: DEFAULT_OPENAI_MODEL.to_string(),
            openai_base_url: DEFAULT_OPENAI_BASE_URL.to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECONDS),
            max_output_tokens: DEFAULT_MAX_OUTPUT_TOKENS,
            reasoning_effort: None,
        }
    }
}

impl FeedbackSettings {
    /// Settings for the deterministic mock provider
    pub fn mock() -> Self {
        Self {
            provider: ProviderKind::Mock,
            ..Self::default()
        }
    }

    /// Resolve settings from environment, then TOML, then defaults
    pub fn resolve(toml: &FeedbackTomlConfig) -> Result<Self> {
        let provider = match non_empty_env(ENV_PROVIDER).or_else(|| toml.provider.clone()) {
            Some(value) => value.parse()?,
            None => ProviderKind::OpenAi,
        };

        let settings = Self {
            provider,
            openai_api_key: resolve_openai_api_key(toml),
            openai_model: non_empty_env(ENV_OPENAI_MODEL)
                .or_else(|| toml.openai_model.clone())
                .unwrap_or_else(|| DEFAULT_OPENAI_MODEL.to_string()),
            openai_base_url: non_empty_env(ENV_OPENAI_BASE_URL)
                .or_else(|| toml.openai_base_url.clone())
                .unwrap_or_else(|| DEFAULT_OPENAI_BASE_URL.to_string()),
            timeout: Duration::from_secs(numeric_setting(
                ENV_TIMEOUT_SECONDS,
                toml.timeout_seconds,
                DEFAULT_TIMEOUT_SECONDS,
            )),
            max_output_tokens: numeric_setting(
                ENV_MAX_OUTPUT_TOKENS,
                toml.max_output_tokens,
                DEFAULT_MAX_OUTPUT_TOKENS,
            ),
            reasoning_effort: non_empty_env(ENV_REASONING_EFFORT)
                .or_else(|| toml.reasoning_effort.clone())
                .filter(|v| !v.trim().is_empty()),
        };

        info!(
            provider = settings.provider.as_str(),
            model = %settings.openai_model,
            timeout_secs = settings.timeout.as_secs(),
            "Feedback settings resolved"
        );

        if settings.provider == ProviderKind::OpenAi && settings.openai_api_key.is_none() {
            warn!(
                "{} is not set; analyses will fail until a key is configured",
                ENV_OPENAI_API_KEY
            );
        }

        Ok(settings)
    }
}

/// Resolve the OpenAI API key (Environment → TOML)
pub fn resolve_openai_api_key(toml: &FeedbackTomlConfig) -> Option<String> {
    let env_key = std::env::var(ENV_OPENAI_API_KEY).ok().filter(|k| is_valid_key(k));
    let toml_key = toml.openai_api_key.clone().filter(|k| is_valid_key(k));

    if env_key.is_some() && toml_key.is_some() {
        warn!("OpenAI API key found in environment and TOML. Using environment (highest priority).");
    }

    if let Some(key) = env_key {
        info!("OpenAI API key loaded from environment variable");
        return Some(key);
    }
    if let Some(key) = toml_key {
        info!("OpenAI API key loaded from TOML config");
        return Some(key);
    }
    None
}

/// Validate API key (non-empty, non-whitespace)
pub fn is_valid_key(key: &str) -> bool {
    !key.trim().is_empty()
}

fn non_empty_env(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn numeric_setting<T>(env_name: &str, toml_value: Option<T>, default: T) -> T
where
    T: FromStr + Copy,
{
    if let Some(raw) = non_empty_env(env_name) {
        match raw.trim().parse() {
            Ok(value) => return value,
            Err(_) => warn!("Ignoring invalid {}={}", env_name, raw),
        }
    }
    toml_value.unwrap_or(default)
}
