// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Configuration type definitions.
//!
//! [`AIConfig`] is an immutable value: updates go through
//! [`AIConfig::merge`], which returns a new validated config and leaves the
//! receiver untouched.

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

use super::merger::AIConfigPatch;

/// Default request timeout in milliseconds.
pub const DEFAULT_TIMEOUT_MS: u64 = 60_000;

/// Supported AI backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AIProvider {
    /// Ollama local server
    Ollama,
    /// OpenAI chat completions
    OpenAI,
    /// xAI Grok (OpenAI-compatible)
    Grok,
    /// Together AI (OpenAI-compatible)
    Together,
    /// Hugging Face (recognized, no client yet)
    HuggingFace,
    /// Any OpenAI-compatible endpoint; requires an explicit URL
    Custom,
}

impl AIProvider {
    /// All recognized providers.
    pub const ALL: [AIProvider; 6] = [
        Self::Ollama,
        Self::OpenAI,
        Self::Grok,
        Self::Together,
        Self::HuggingFace,
        Self::Custom,
    ];

    /// Lowercase wire name, as used in config files.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ollama => "ollama",
            Self::OpenAI => "openai",
            Self::Grok => "grok",
            Self::Together => "together",
            Self::HuggingFace => "huggingface",
            Self::Custom => "custom",
        }
    }

    /// Get the default base URL for this provider, if it has one.
    pub fn default_base_url(&self) -> Option<&'static str> {
        match self {
            Self::Ollama => Some("http://localhost:11434"),
            Self::OpenAI => Some("https://api.openai.com/v1"),
            Self::Grok => Some("https://api.x.ai/v1"),
            Self::Together => Some("https://api.together.xyz/v1"),
            Self::HuggingFace | Self::Custom => None,
        }
    }

    /// Get a sensible default model for this provider.
    pub fn default_model(&self) -> &'static str {
        match self {
            Self::Ollama => "llama3.2",
            Self::OpenAI => "gpt-4o",
            Self::Grok => "grok-2-latest",
            Self::Together => "meta-llama/Llama-3.3-70B-Instruct-Turbo",
            Self::HuggingFace => "bigcode/starcoder2-15b",
            Self::Custom => "gpt-4o",
        }
    }
}

impl std::str::FromStr for AIProvider {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "ollama" => Ok(Self::Ollama),
            "openai" | "gpt" => Ok(Self::OpenAI),
            "grok" | "xai" => Ok(Self::Grok),
            "together" => Ok(Self::Together),
            "huggingface" | "hf" => Ok(Self::HuggingFace),
            "custom" | "openai-compatible" | "openai_compatible" => Ok(Self::Custom),
            _ => Err(ConfigError::UnsupportedProvider(s.to_string())),
        }
    }
}

impl std::fmt::Display for AIProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

fn default_temperature() -> f32 {
    0.7
}

fn default_max_tokens() -> u32 {
    2048
}

fn default_top_p() -> f32 {
    0.9
}

fn default_timeout_ms() -> u64 {
    DEFAULT_TIMEOUT_MS
}

/// Configuration for the AI engine.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AIConfig {
    pub provider: AIProvider,
    pub model: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    /// Base URL; defaults per provider when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_url: Option<String>,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default = "default_top_p")]
    pub top_p: f32,
    #[serde(default)]
    pub frequency_penalty: f32,
    #[serde(default)]
    pub presence_penalty: f32,
    #[serde(default)]
    pub offline: bool,
    /// Per-request HTTP timeout.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

impl Default for AIConfig {
    fn default() -> Self {
        Self::new(AIProvider::Ollama, AIProvider::Ollama.default_model())
    }
}

impl std::fmt::Debug for AIConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AIConfig")
            .field("provider", &self.provider)
            .field("model", &self.model)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("api_url", &self.api_url)
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("top_p", &self.top_p)
            .field("frequency_penalty", &self.frequency_penalty)
            .field("presence_penalty", &self.presence_penalty)
            .field("offline", &self.offline)
            .field("timeout_ms", &self.timeout_ms)
            .finish()
    }
}

impl AIConfig {
    /// Create a config with default sampling parameters.
    pub fn new(provider: AIProvider, model: impl Into<String>) -> Self {
        Self {
            provider,
            model: model.into(),
            api_key: None,
            api_url: None,
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            top_p: default_top_p(),
            frequency_penalty: 0.0,
            presence_penalty: 0.0,
            offline: false,
            timeout_ms: DEFAULT_TIMEOUT_MS,
        }
    }

    /// Set the API key.
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    /// Set the base URL.
    pub fn with_api_url(mut self, api_url: impl Into<String>) -> Self {
        self.api_url = Some(api_url.into());
        self
    }

    /// Set the temperature.
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    /// Set the max tokens.
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    /// Set the request timeout.
    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    /// Base URL to use: explicit `api_url`, else the provider default.
    pub fn resolved_base_url(&self) -> Option<&str> {
        self.api_url
            .as_deref()
            .or_else(|| self.provider.default_base_url())
    }

    /// Validate field ranges.
    ///
    /// Out-of-range values are rejected rather than clamped.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.model.trim().is_empty() {
            return Err(ConfigError::invalid("model", "must not be empty"));
        }
        check_range("temperature", self.temperature, 0.0, 2.0)?;
        check_range("topP", self.top_p, 0.0, 1.0)?;
        check_range("frequencyPenalty", self.frequency_penalty, -2.0, 2.0)?;
        check_range("presencePenalty", self.presence_penalty, -2.0, 2.0)?;
        if self.max_tokens == 0 {
            return Err(ConfigError::invalid("maxTokens", "must be positive"));
        }
        if self.timeout_ms == 0 {
            return Err(ConfigError::invalid("timeoutMs", "must be positive"));
        }
        if let Some(url) = &self.api_url {
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                return Err(ConfigError::invalid(
                    "apiUrl",
                    format!("'{}' is not an http(s) URL", url),
                ));
            }
        }
        Ok(())
    }

    /// Apply a partial update, returning a new validated config.
    ///
    /// The receiver is never modified. An unrecognized provider name fails
    /// with [`ConfigError::UnsupportedProvider`].
    pub fn merge(&self, patch: &AIConfigPatch) -> Result<AIConfig, ConfigError> {
        let mut next = self.clone();

        if let Some(ref provider) = patch.provider {
            next.provider = provider.parse()?;
        }
        if let Some(ref model) = patch.model {
            next.model = model.clone();
        }
        if let Some(ref api_key) = patch.api_key {
            next.api_key = api_key.clone();
        }
        if let Some(ref api_url) = patch.api_url {
            next.api_url = api_url.clone();
        }
        if let Some(temperature) = patch.temperature {
            next.temperature = temperature;
        }
        if let Some(max_tokens) = patch.max_tokens {
            next.max_tokens = max_tokens;
        }
        if let Some(top_p) = patch.top_p {
            next.top_p = top_p;
        }
        if let Some(penalty) = patch.frequency_penalty {
            next.frequency_penalty = penalty;
        }
        if let Some(penalty) = patch.presence_penalty {
            next.presence_penalty = penalty;
        }
        if let Some(offline) = patch.offline {
            next.offline = offline;
        }
        if let Some(timeout_ms) = patch.timeout_ms {
            next.timeout_ms = timeout_ms;
        }

        next.validate()?;
        Ok(next)
    }
}

fn check_range(field: &str, value: f32, min: f32, max: f32) -> Result<(), ConfigError> {
    // NaN fails both comparisons
    if value >= min && value <= max {
        Ok(())
    } else {
        Err(ConfigError::invalid(
            field,
            format!("{} is outside {}..={}", value, min, max),
        ))
    }
}
