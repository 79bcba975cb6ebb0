// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Error types for the OpenPilot core.
//!
//! Each layer has its own strongly-typed error, defined with `thiserror`:
//!
//! - [`ConfigError`] - invalid or unsupported configuration (never retried)
//! - [`ProviderError`] - HTTP/network failures while talking to a backend
//! - [`ContextError`] - file read and scan failures in the repository indexer
//!
//! [`OpenPilotError`] unifies them. Every error exposes a stable
//! machine-readable [`code`](OpenPilotError::code) and a
//! [`details`](OpenPilotError::details) map so callers can branch on the kind
//! of failure without matching on message strings.

use std::path::PathBuf;

use serde_json::{Map, Value};
use thiserror::Error;

/// Machine-readable code for configuration errors.
pub const CONFIGURATION_ERROR: &str = "CONFIGURATION_ERROR";

/// Machine-readable code for provider errors.
pub const AI_PROVIDER_ERROR: &str = "AI_PROVIDER_ERROR";

/// Machine-readable code for context errors.
pub const CONTEXT_ERROR: &str = "CONTEXT_ERROR";

/// Structured details attached to an error.
pub type ErrorDetails = Map<String, Value>;

/// Errors that can occur while talking to an AI backend.
#[derive(Error, Debug)]
pub enum ProviderError {
    /// The backend answered with a non-2xx status.
    #[error("API request failed with status {status}: {message}")]
    Api {
        status: u16,
        message: String,
        body: String,
    },

    #[error("Network error: {message}")]
    Network {
        message: String,
        status: Option<u16>,
    },

    #[error("Timeout after {0}ms")]
    Timeout(u64),

    #[error("Response parsing error: {0}")]
    Parse(String),

    #[error("Streaming error: {0}")]
    Stream(String),
}

impl ProviderError {
    /// Create an API error from a status code and raw response body.
    pub fn api(status: u16, body: impl Into<String>) -> Self {
        let body = body.into();
        let message = extract_error_message(&body).unwrap_or_else(|| {
            if body.is_empty() {
                format!("HTTP {}", status)
            } else {
                body.clone()
            }
        });
        Self::Api {
            status,
            message,
            body,
        }
    }

    /// HTTP status associated with this error, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Api { status, .. } => Some(*status),
            Self::Network { status, .. } => *status,
            _ => None,
        }
    }

    /// Raw response body associated with this error, if any.
    pub fn body(&self) -> Option<&str> {
        match self {
            Self::Api { body, .. } => Some(body),
            _ => None,
        }
    }

    /// Stable machine-readable code.
    pub fn code(&self) -> &'static str {
        AI_PROVIDER_ERROR
    }

    /// Structured details: HTTP status and response body when available.
    pub fn details(&self) -> ErrorDetails {
        let mut details = Map::new();
        if let Some(status) = self.status() {
            details.insert("status".to_string(), Value::from(status));
        }
        if let Some(body) = self.body() {
            details.insert("body".to_string(), Value::from(body));
        }
        if let Self::Timeout(ms) = self {
            details.insert("timeoutMs".to_string(), Value::from(*ms));
        }
        details
    }
}

/// Pull a human-readable message out of a JSON error body.
///
/// Understands `{"error": {"message": ...}}` (cloud family) and
/// `{"error": "..."}` (local-server family).
fn extract_error_message(body: &str) -> Option<String> {
    let value: Value = serde_json::from_str(body).ok()?;
    match value.get("error")? {
        Value::String(s) => Some(s.clone()),
        Value::Object(obj) => obj.get("message")?.as_str().map(str::to_string),
        _ => None,
    }
}

/// Errors that can occur while scanning or reading repository files.
#[derive(Error, Debug)]
pub enum ContextError {
    #[error("Failed to read {path}: {source}")]
    ReadFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to analyze repository {root}: {message}")]
    ScanFailed { root: PathBuf, message: String },

    #[error("Invalid pattern '{pattern}': {message}")]
    InvalidPattern { pattern: String, message: String },

    #[error("Invalid line range {start}-{end} for {path}")]
    InvalidRange { path: PathBuf, start: usize, end: usize },
}

impl ContextError {
    /// Create a read error for a path.
    pub fn read(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::ReadFailed {
            path: path.into(),
            source,
        }
    }

    /// Stable machine-readable code.
    pub fn code(&self) -> &'static str {
        CONTEXT_ERROR
    }

    /// Structured details: the file or root path involved.
    pub fn details(&self) -> ErrorDetails {
        let mut details = Map::new();
        match self {
            Self::ReadFailed { path, source } => {
                details.insert("path".to_string(), Value::from(path.display().to_string()));
                details.insert("kind".to_string(), Value::from(format!("{:?}", source.kind())));
            }
            Self::ScanFailed { root, .. } => {
                details.insert("rootPath".to_string(), Value::from(root.display().to_string()));
            }
            Self::InvalidPattern { pattern, .. } => {
                details.insert("pattern".to_string(), Value::from(pattern.as_str()));
            }
            Self::InvalidRange { path, start, end } => {
                details.insert("path".to_string(), Value::from(path.display().to_string()));
                details.insert("lineStart".to_string(), Value::from(*start));
                details.insert("lineEnd".to_string(), Value::from(*end));
            }
        }
        details
    }
}

/// Errors that can occur while loading, validating, or applying configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Unsupported AI provider: {0}")]
    UnsupportedProvider(String),

    #[error("Invalid value for {field}: {message}")]
    InvalidValue { field: String, message: String },

    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("Config file not found: {0}")]
    NotFound(String),

    #[error("IO error reading config: {0}")]
    IoError(String),

    #[error("YAML parsing error: {0}")]
    YamlError(String),

    #[error("JSON parsing error: {0}")]
    JsonError(String),

    #[error("Failed to build HTTP client: {0}")]
    HttpClient(String),
}

impl ConfigError {
    /// Create an invalid-value error for a field.
    pub fn invalid(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidValue {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Stable machine-readable code.
    pub fn code(&self) -> &'static str {
        CONFIGURATION_ERROR
    }

    /// Structured details: the offending field or provider name.
    pub fn details(&self) -> ErrorDetails {
        let mut details = Map::new();
        match self {
            Self::UnsupportedProvider(provider) => {
                details.insert("provider".to_string(), Value::from(provider.as_str()));
            }
            Self::InvalidValue { field, .. } | Self::MissingField(field) => {
                details.insert("field".to_string(), Value::from(field.as_str()));
            }
            Self::NotFound(path) => {
                details.insert("path".to_string(), Value::from(path.as_str()));
            }
            _ => {}
        }
        details
    }
}

impl From<std::io::Error> for ConfigError {
    fn from(err: std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::NotFound => Self::NotFound(err.to_string()),
            _ => Self::IoError(err.to_string()),
        }
    }
}

impl From<serde_json::Error> for ConfigError {
    fn from(err: serde_json::Error) -> Self {
        Self::JsonError(err.to_string())
    }
}

impl From<serde_yaml::Error> for ConfigError {
    fn from(err: serde_yaml::Error) -> Self {
        Self::YamlError(err.to_string())
    }
}

/// Top-level error for the OpenPilot core.
#[derive(Error, Debug)]
pub enum OpenPilotError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error(transparent)]
    Context(#[from] ContextError),
}

impl OpenPilotError {
    /// Stable machine-readable code.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Config(e) => e.code(),
            Self::Provider(e) => e.code(),
            Self::Context(e) => e.code(),
        }
    }

    /// Structured details for this error.
    pub fn details(&self) -> ErrorDetails {
        match self {
            Self::Config(e) => e.details(),
            Self::Provider(e) => e.details(),
            Self::Context(e) => e.details(),
        }
    }
}

/// Result type alias using anyhow for flexible error handling.
pub type Result<T> = anyhow::Result<T>;
