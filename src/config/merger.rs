// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Partial configuration updates and layer merging.
//!
//! Every configuration source (config files, environment, CLI flags, and
//! runtime `update_config` calls) is expressed as an [`AIConfigPatch`].
//! Patches are layered with [`AIConfigPatch::overlay`] and finally applied to
//! an [`AIConfig`](super::AIConfig) with [`AIConfig::merge`](super::AIConfig::merge).

use serde::{Deserialize, Serialize};

/// Environment variable overriding the provider.
pub const ENV_PROVIDER: &str = "OPENPILOT_PROVIDER";
/// Environment variable overriding the model.
pub const ENV_MODEL: &str = "OPENPILOT_MODEL";
/// Environment variable supplying the API key.
pub const ENV_API_KEY: &str = "OPENPILOT_API_KEY";
/// Environment variable overriding the base URL.
pub const ENV_API_URL: &str = "OPENPILOT_API_URL";

/// A partial [`AIConfig`](super::AIConfig); unset fields leave the target untouched.
///
/// `provider` stays a raw string until merge time so that an unsupported
/// name surfaces as a configuration error when the update is applied.
/// `api_key` and `api_url` use `Some(None)` to clear the current value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AIConfigPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<Option<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_url: Option<Option<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frequency_penalty: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub presence_penalty: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub offline: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_ms: Option<u64>,
}

impl AIConfigPatch {
    /// Set the provider by name.
    pub fn with_provider(mut self, provider: impl Into<String>) -> Self {
        self.provider = Some(provider.into());
        self
    }

    /// Set the model.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Set the API key.
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(Some(api_key.into()));
        self
    }

    /// Set the base URL.
    pub fn with_api_url(mut self, api_url: impl Into<String>) -> Self {
        self.api_url = Some(Some(api_url.into()));
        self
    }

    /// Set the temperature.
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// Whether this patch changes nothing.
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Layer `other` on top of `self`; fields set in `other` win.
    pub fn overlay(mut self, other: AIConfigPatch) -> Self {
        if other.provider.is_some() {
            self.provider = other.provider;
        }
        if other.model.is_some() {
            self.model = other.model;
        }
        if other.api_key.is_some() {
            self.api_key = other.api_key;
        }
        if other.api_url.is_some() {
            self.api_url = other.api_url;
        }
        if other.temperature.is_some() {
            self.temperature = other.temperature;
        }
        if other.max_tokens.is_some() {
            self.max_tokens = other.max_tokens;
        }
        if other.top_p.is_some() {
            self.top_p = other.top_p;
        }
        if other.frequency_penalty.is_some() {
            self.frequency_penalty = other.frequency_penalty;
        }
        if other.presence_penalty.is_some() {
            self.presence_penalty = other.presence_penalty;
        }
        if other.offline.is_some() {
            self.offline = other.offline;
        }
        if other.timeout_ms.is_some() {
            self.timeout_ms = other.timeout_ms;
        }
        self
    }

    /// Build a patch from `OPENPILOT_*` environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a patch from an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        Self {
            provider: non_empty(ENV_PROVIDER),
            model: non_empty(ENV_MODEL),
            api_key: non_empty(ENV_API_KEY).map(Some),
            api_url: non_empty(ENV_API_URL).map(Some),
            ..Default::default()
        }
    }
}

/// CLI options that can override configuration.
#[derive(Debug, Clone, Default)]
pub struct CliOptions {
    pub provider: Option<String>,
    pub model: Option<String>,
    pub api_url: Option<String>,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
    pub offline: Option<bool>,
}

impl From<CliOptions> for AIConfigPatch {
    fn from(cli: CliOptions) -> Self {
        Self {
            provider: cli.provider,
            model: cli.model,
            api_url: cli.api_url.map(Some),
            temperature: cli.temperature,
            max_tokens: cli.max_tokens,
            offline: cli.offline,
            ..Default::default()
        }
    }
}
