// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! AI provider clients for OpenPilot.
//!
//! This module provides implementations of the [`ChatClient`] trait for the
//! two backend families:
//!
//! - [`ollama::OllamaClient`] - local Ollama servers (`/api/chat`, NDJSON streaming)
//! - [`openai::OpenAIClient`] - OpenAI, Grok, Together and any OpenAI-compatible
//!   endpoint (`/chat/completions`, SSE streaming)
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use openpilot::config::{AIConfig, AIProvider};
//! use openpilot::providers::create_client;
//!
//! let config = AIConfig::new(AIProvider::Ollama, "llama3.2");
//! let client = create_client(&config)?;
//! let response = client.chat(&context).await?;
//! ```

pub mod ollama;
pub mod openai;
pub mod stream;

pub use ollama::{OllamaClient, OLLAMA_COMPLETION_CONFIDENCE};
pub use openai::{OpenAIClient, CLOUD_COMPLETION_CONFIDENCE};

use std::fmt::Write as _;
use std::sync::Arc;
use std::time::{Duration, Instant};

use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::config::{AIConfig, AIProvider};
use crate::error::{ConfigError, ProviderError};
use crate::types::{
    ChatContext, CodeContext, CompletionRequest, RepositoryContext, SharedClient, TokenUsage,
};

#[cfg(feature = "telemetry")]
use crate::telemetry::metrics::GLOBAL_METRICS;

use stream::LineAssembler;

/// Wire protocol family of a provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderFamily {
    /// Ollama-style local server
    LocalServer,
    /// OpenAI-style chat completions
    CloudChat,
}

impl ProviderFamily {
    /// Family for a provider, or `None` if it has no client.
    pub fn of(provider: AIProvider) -> Option<Self> {
        match provider {
            AIProvider::Ollama => Some(Self::LocalServer),
            AIProvider::OpenAI | AIProvider::Grok | AIProvider::Together | AIProvider::Custom => {
                Some(Self::CloudChat)
            }
            AIProvider::HuggingFace => None,
        }
    }
}

/// Create a client for a configuration.
///
/// The config is validated first. `huggingface` has no client and `custom`
/// requires an explicit `apiUrl`; both fail with a [`ConfigError`].
pub fn create_client(config: &AIConfig) -> Result<SharedClient, ConfigError> {
    config.validate()?;

    match ProviderFamily::of(config.provider) {
        Some(ProviderFamily::LocalServer) => Ok(Arc::new(OllamaClient::new(config)?)),
        Some(ProviderFamily::CloudChat) => Ok(Arc::new(OpenAIClient::new(config)?)),
        None => Err(ConfigError::UnsupportedProvider(config.provider.to_string())),
    }
}

/// Record one provider call: latency and outcome under the backend and
/// operation name, plus token usage when reported.
#[cfg(feature = "telemetry")]
pub(crate) fn record_call(
    provider: &str,
    operation: &str,
    start: Instant,
    success: bool,
    usage: Option<&TokenUsage>,
) {
    GLOBAL_METRICS.record_provider_call(
        provider,
        operation,
        start.elapsed(),
        success,
        usage.map(|u| (u64::from(u.prompt_tokens), u64::from(u.completion_tokens))),
    );
}

#[cfg(not(feature = "telemetry"))]
pub(crate) fn record_call(
    _provider: &str,
    _operation: &str,
    _start: Instant,
    _success: bool,
    _usage: Option<&TokenUsage>,
) {
}

// ============================================================================
// HTTP Transport
// ============================================================================

/// HTTP client bound to one base URL with auth and timeout applied.
///
/// The client-level timeouts bound connecting and each individual read, so a
/// stream that keeps delivering data is never cut off. Buffered requests also
/// carry a whole-request deadline.
pub(crate) struct HttpBackend {
    client: Client,
    base_url: String,
    timeout_ms: u64,
}

impl HttpBackend {
    pub fn new(config: &AIConfig) -> Result<Self, ConfigError> {
        let base_url = config
            .resolved_base_url()
            .ok_or_else(|| ConfigError::MissingField("apiUrl".to_string()))?
            .trim_end_matches('/')
            .to_string();

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        if let Some(key) = config.api_key.as_deref().filter(|k| !k.is_empty()) {
            let mut value = HeaderValue::from_str(&format!("Bearer {}", key)).map_err(|_| {
                ConfigError::invalid("apiKey", "contains characters not allowed in a header")
            })?;
            value.set_sensitive(true);
            headers.insert(AUTHORIZATION, value);
        }

        let timeout = Duration::from_millis(config.timeout_ms);
        let client = Client::builder()
            .default_headers(headers)
            .connect_timeout(timeout)
            .read_timeout(timeout)
            .build()
            .map_err(|e| ConfigError::HttpClient(e.to_string()))?;

        Ok(Self {
            client,
            base_url,
            timeout_ms: config.timeout_ms,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// POST a JSON body whose response is read in full, turning non-2xx
    /// statuses into [`ProviderError::Api`].
    pub async fn post_json<T: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &T,
    ) -> Result<Response, ProviderError> {
        let request = self
            .request(path, body)
            .timeout(Duration::from_millis(self.timeout_ms));
        self.send(request).await
    }

    /// POST a JSON body whose response is streamed. Only the idle timeout
    /// between reads applies.
    pub async fn post_streaming<T: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &T,
    ) -> Result<Response, ProviderError> {
        self.send(self.request(path, body)).await
    }

    fn request<T: Serialize + ?Sized>(&self, path: &str, body: &T) -> RequestBuilder {
        self.client.post(format!("{}{}", self.base_url, path)).json(body)
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response, ProviderError> {
        let response = request.send().await.map_err(|e| self.transport_error(e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::api(status.as_u16(), body));
        }
        Ok(response)
    }

    /// Read and deserialize a full JSON body.
    pub async fn read_json<R: DeserializeOwned>(&self, response: Response) -> Result<R, ProviderError> {
        let text = response.text().await.map_err(|e| self.transport_error(e))?;
        serde_json::from_str(&text).map_err(|e| ProviderError::Parse(e.to_string()))
    }

    /// Feed every line of a chunked body to `on_line` as it arrives.
    pub async fn for_each_line(
        &self,
        mut response: Response,
        mut on_line: impl FnMut(&str),
    ) -> Result<(), ProviderError> {
        let mut assembler = LineAssembler::new();
        while let Some(bytes) = response.chunk().await.map_err(|e| self.transport_error(e))? {
            for line in assembler.push(&bytes) {
                on_line(&line);
            }
        }
        if let Some(line) = assembler.finish() {
            on_line(&line);
        }
        Ok(())
    }

    /// Map a transport failure onto the provider error taxonomy.
    pub fn transport_error(&self, err: reqwest::Error) -> ProviderError {
        if err.is_timeout() {
            ProviderError::Timeout(self.timeout_ms)
        } else if err.is_decode() {
            ProviderError::Parse(err.to_string())
        } else {
            ProviderError::Network {
                message: err.to_string(),
                status: err.status().map(|s| s.as_u16()),
            }
        }
    }
}

// ============================================================================
// Prompt Rendering
// ============================================================================

/// Number of dependencies listed in a repository summary.
const SUMMARY_DEPENDENCIES: usize = 10;

/// Number of languages listed in a repository summary.
const SUMMARY_LANGUAGES: usize = 5;

/// Render an attached code excerpt as a prompt block.
pub fn render_code_context(context: &CodeContext) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Code Context:");
    let _ = writeln!(out, "File: {}", context.file_name);
    let _ = writeln!(out, "Language: {}", context.language);
    let _ = writeln!(out, "Lines {}-{}:", context.line_start, context.line_end);
    let _ = writeln!(out, "```{}", context.language);
    let _ = writeln!(out, "{}", context.selected_code);
    out.push_str("```");

    if let Some(surrounding) = context.surrounding_code.as_deref().filter(|s| !s.is_empty()) {
        let _ = write!(
            out,
            "\n\nSurrounding code:\n```{}\n{}\n```",
            context.language, surrounding
        );
    }
    if let Some(imports) = context.imports.as_ref().filter(|i| !i.is_empty()) {
        let _ = write!(out, "\n\nImports: {}", imports.join(", "));
    }
    out
}

/// Render a short repository summary: root, branch, file count, top
/// languages and the first few dependencies.
pub fn render_repository_summary(repo: &RepositoryContext) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Repository Context:");
    let _ = write!(out, "Root: {}", repo.root_path);
    if let Some(git) = &repo.git_info {
        let _ = write!(out, "\nBranch: {}", git.branch);
    }
    let _ = write!(out, "\nFiles: {}", repo.files.len());

    let mut counts: Vec<(&str, usize)> = Vec::new();
    for file in &repo.files {
        match counts.iter_mut().find(|(lang, _)| *lang == file.language) {
            Some((_, n)) => *n += 1,
            None => counts.push((file.language.as_str(), 1)),
        }
    }
    counts.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(b.0)));
    if !counts.is_empty() {
        let langs: Vec<String> = counts
            .iter()
            .take(SUMMARY_LANGUAGES)
            .map(|(lang, n)| format!("{} ({})", lang, n))
            .collect();
        let _ = write!(out, "\nLanguages: {}", langs.join(", "));
    }

    if !repo.dependencies.is_empty() {
        let deps: Vec<String> = repo
            .dependencies
            .iter()
            .take(SUMMARY_DEPENDENCIES)
            .map(|d| format!("{}@{}", d.name, d.version))
            .collect();
        let _ = write!(out, "\nDependencies: {}", deps.join(", "));
        let rest = repo.dependencies.len().saturating_sub(SUMMARY_DEPENDENCIES);
        if rest > 0 {
            let _ = write!(out, " (+{} more)", rest);
        }
    }
    out
}

/// Combined enrichment block for a chat context, if it carries any.
pub fn render_enrichment(context: &ChatContext) -> Option<String> {
    let blocks: Vec<String> = context
        .code_context
        .iter()
        .map(render_code_context)
        .chain(context.repository_context.iter().map(render_repository_summary))
        .collect();

    if blocks.is_empty() {
        None
    } else {
        Some(blocks.join("\n\n"))
    }
}

/// Local-server completion prompt: the excerpt plus the free-text instruction.
pub fn build_completion_prompt(request: &CompletionRequest) -> String {
    let context = &request.context;
    format!(
        "You are an expert code completion assistant. Complete the following code:\n\n\
         Language: {lang}\nFile: {file}\n\nCode:\n```{lang}\n{code}\n```\n\n{prompt}\n\n\
         Provide only the code completion, no explanations.",
        lang = context.language,
        file = context.file_name,
        code = context.selected_code,
        prompt = request.prompt,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Dependency, Ecosystem, FileInfo, GitInfo};

    fn code_context() -> CodeContext {
        let mut ctx = CodeContext::new("/repo/src/lib.rs", "rust", 3, 4, "fn a() {}\nfn b() {}");
        ctx.surrounding_code = Some("// header\nfn a() {}\nfn b() {}".to_string());
        ctx
    }

    fn file(relative: &str, language: &str) -> FileInfo {
        FileInfo {
            path: format!("/repo/{}", relative),
            relative_path: relative.to_string(),
            language: language.to_string(),
            size: 1,
            last_modified: 0,
        }
    }

    #[test]
    fn test_family_mapping() {
        assert_eq!(ProviderFamily::of(AIProvider::Ollama), Some(ProviderFamily::LocalServer));
        assert_eq!(ProviderFamily::of(AIProvider::Grok), Some(ProviderFamily::CloudChat));
        assert_eq!(ProviderFamily::of(AIProvider::Custom), Some(ProviderFamily::CloudChat));
        assert_eq!(ProviderFamily::of(AIProvider::HuggingFace), None);
    }

    #[test]
    fn test_create_client_per_provider() {
        let client = create_client(&AIConfig::default()).unwrap();
        assert_eq!(client.name(), "ollama");
        assert_eq!(client.base_url(), "http://localhost:11434");

        let config = AIConfig::new(AIProvider::Together, "mixtral").with_api_key("k");
        let client = create_client(&config).unwrap();
        assert_eq!(client.name(), "together");
        assert_eq!(client.model(), "mixtral");
        assert_eq!(client.base_url(), "https://api.together.xyz/v1");
    }

    #[test]
    fn test_create_client_rejects_unusable_configs() {
        let config = AIConfig::new(AIProvider::HuggingFace, "starcoder");
        assert!(matches!(
            create_client(&config),
            Err(ConfigError::UnsupportedProvider(_))
        ));

        let config = AIConfig::new(AIProvider::Custom, "local-model");
        assert!(matches!(
            create_client(&config),
            Err(ConfigError::MissingField(ref f)) if f == "apiUrl"
        ));

        let config = AIConfig::new(AIProvider::Custom, "local-model")
            .with_api_url("http://127.0.0.1:8080/v1/");
        let client = create_client(&config).unwrap();
        assert_eq!(client.base_url(), "http://127.0.0.1:8080/v1");

        let config = AIConfig::default().with_temperature(9.0);
        assert!(matches!(
            create_client(&config),
            Err(ConfigError::InvalidValue { .. })
        ));
    }

    #[test]
    fn test_render_code_context() {
        let rendered = render_code_context(&code_context());
        assert!(rendered.starts_with("Code Context:\nFile: lib.rs\nLanguage: rust\nLines 3-4:\n```rust\nfn a() {}"));
        assert!(rendered.contains("Surrounding code:\n```rust\n// header"));
        assert!(!rendered.contains("Imports"));
    }

    #[test]
    fn test_render_repository_summary() {
        let repo = RepositoryContext {
            root_path: "/repo".to_string(),
            files: vec![
                file("src/a.rs", "rust"),
                file("src/b.rs", "rust"),
                file("README.md", "markdown"),
            ],
            dependencies: (0..12)
                .map(|i| Dependency {
                    name: format!("dep{}", i),
                    version: "1".to_string(),
                    ecosystem: Ecosystem::Cargo,
                })
                .collect(),
            git_info: Some(GitInfo {
                branch: "main".to_string(),
                ..Default::default()
            }),
            indexed_content: Vec::new(),
        };

        let summary = render_repository_summary(&repo);
        assert!(summary.contains("Root: /repo"));
        assert!(summary.contains("Branch: main"));
        assert!(summary.contains("Files: 3"));
        assert!(summary.contains("Languages: rust (2), markdown (1)"));
        assert!(summary.contains("dep0@1"));
        assert!(!summary.contains("dep10@1"));
        assert!(summary.contains("(+2 more)"));
    }

    #[test]
    fn test_render_enrichment() {
        assert!(render_enrichment(&ChatContext::default()).is_none());

        let ctx = ChatContext::default().with_code_context(code_context());
        let block = render_enrichment(&ctx).unwrap();
        assert!(block.starts_with("Code Context:"));
    }

    #[test]
    fn test_completion_prompt() {
        let request = CompletionRequest::new("Add error handling", code_context());
        let prompt = build_completion_prompt(&request);
        assert!(prompt.contains("Language: rust\nFile: lib.rs"));
        assert!(prompt.contains("```rust\nfn a() {}\nfn b() {}\n```"));
        assert!(prompt.contains("Add error handling"));
    }
}
