// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! OpenAI-compatible chat client.
//!
//! This module provides a [`ChatClient`] implementation for OpenAI and any
//! OpenAI-compatible API (Grok, Together, self-hosted gateways).
//!
//! # Supported Endpoints
//!
//! - **OpenAI** - `https://api.openai.com/v1` (default)
//! - **Grok** - `https://api.x.ai/v1`
//! - **Together** - `https://api.together.xyz/v1`
//! - **Custom** - any base URL serving `/chat/completions`
//!
//! # API Reference
//!
//! See [OpenAI Chat Completions API](https://platform.openai.com/docs/api-reference/chat)

use std::time::Instant;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::stream::{sse_data, StreamState, SSE_DONE};
use super::{record_call, render_enrichment, HttpBackend};
use crate::config::AIConfig;
use crate::error::{ConfigError, ProviderError};
use crate::types::{
    generate_id, AIResponse, ChatClient, ChatContext, Completion, CompletionRequest,
    CompletionResponse, OnChunk, Role, TokenUsage,
};

/// Fixed confidence reported for cloud completions.
pub const CLOUD_COMPLETION_CONFIDENCE: f32 = 0.9;

const CHAT_PATH: &str = "/chat/completions";

/// OpenAI-compatible client.
///
/// One type serves every cloud-chat provider; only the base URL, key and
/// display name differ.
pub struct OpenAIClient {
    http: HttpBackend,
    model: String,
    provider_name: &'static str,
    sampling: Sampling,
}

impl OpenAIClient {
    /// Create a client from a config.
    ///
    /// Fails with [`ConfigError::MissingField`] when no base URL can be
    /// resolved (a `custom` provider without `apiUrl`).
    pub fn new(config: &AIConfig) -> Result<Self, ConfigError> {
        Ok(Self {
            http: HttpBackend::new(config)?,
            model: config.model.clone(),
            provider_name: config.provider.as_str(),
            sampling: Sampling {
                temperature: config.temperature,
                max_tokens: config.max_tokens,
                top_p: config.top_p,
                frequency_penalty: config.frequency_penalty,
                presence_penalty: config.presence_penalty,
            },
        })
    }

    /// Build a chat request. Enrichment goes in as a leading system message.
    fn build_request(&self, context: &ChatContext, stream: bool) -> ChatRequest<'_> {
        let mut messages = Vec::with_capacity(context.messages.len() + 1);
        if let Some(enrichment) = render_enrichment(context) {
            messages.push(WireMessage {
                role: Role::System.as_str(),
                content: enrichment,
            });
        }
        messages.extend(context.messages.iter().map(|m| WireMessage {
            role: m.role.as_str(),
            content: m.content.clone(),
        }));

        ChatRequest {
            model: &self.model,
            messages,
            sampling: self.sampling,
            stream,
        }
    }

    async fn send_chat(&self, request: &ChatRequest<'_>) -> Result<AIResponse, ProviderError> {
        let response = self.http.post_json(CHAT_PATH, request).await?;
        let body: ChatResponse = self.http.read_json(response).await?;
        body.into_response(&self.model)
    }
}

/// Prompt used by `complete` for the cloud family.
fn completion_prompt(request: &CompletionRequest) -> String {
    let context = &request.context;
    format!(
        "Complete this {lang} code:\n```{lang}\n{code}\n```\n\n{prompt}",
        lang = context.language,
        code = context.selected_code,
        prompt = request.prompt,
    )
}

#[async_trait]
impl ChatClient for OpenAIClient {
    async fn chat(&self, context: &ChatContext) -> Result<AIResponse, ProviderError> {
        let start = Instant::now();
        let request = self.build_request(context, false);
        debug!(
            provider = self.provider_name,
            model = %self.model,
            messages = request.messages.len(),
            "Sending chat request"
        );

        let result = self.send_chat(&request).await;
        record_call(
            self.provider_name,
            "chat",
            start,
            result.is_ok(),
            result.as_ref().ok().and_then(|r| r.usage.as_ref()),
        );
        result
    }

    async fn complete(&self, request: &CompletionRequest) -> Result<CompletionResponse, ProviderError> {
        let start = Instant::now();
        let chat = ChatRequest {
            model: &self.model,
            messages: vec![WireMessage {
                role: Role::User.as_str(),
                content: completion_prompt(request),
            }],
            sampling: self.sampling,
            stream: false,
        };
        debug!(provider = self.provider_name, file = %request.context.file_name, "Sending completion request");

        let result = self.send_chat(&chat).await;
        record_call(
            self.provider_name,
            "complete",
            start,
            result.is_ok(),
            result.as_ref().ok().and_then(|r| r.usage.as_ref()),
        );

        Ok(CompletionResponse {
            completions: vec![Completion {
                text: result?.content,
                confidence: CLOUD_COMPLETION_CONFIDENCE,
                offset: 0,
            }],
        })
    }

    async fn stream_chat(
        &self,
        context: &ChatContext,
        on_chunk: OnChunk,
    ) -> Result<AIResponse, ProviderError> {
        let start = Instant::now();
        let request = self.build_request(context, true);
        debug!(
            provider = self.provider_name,
            model = %self.model,
            messages = request.messages.len(),
            "Sending streaming chat request"
        );

        let response = match self.http.post_streaming(CHAT_PATH, &request).await {
            Ok(response) => response,
            Err(e) => {
                record_call(self.provider_name, "stream_chat", start, false, None);
                return Err(e);
            }
        };

        let mut state = StreamState::new(on_chunk);
        let read = self
            .http
            .for_each_line(response, |line| {
                let Some(data) = sse_data(line) else {
                    return;
                };
                if data.is_empty() || data == SSE_DONE {
                    return;
                }
                match serde_json::from_str::<StreamChunk>(data) {
                    Ok(chunk) => {
                        state.set_id(chunk.id);
                        state.set_model(chunk.model);
                        state.set_usage(chunk.usage.map(TokenUsage::from));
                        for choice in chunk.choices {
                            if let Some(content) = choice.delta.content {
                                state.push_delta(&content);
                            }
                        }
                    }
                    Err(e) => warn!(error = %e, "Dropping unparsable stream line"),
                }
            })
            .await;

        let response = state.into_response(None, &self.model);
        record_call(
            self.provider_name,
            "stream_chat",
            start,
            read.is_ok(),
            response.usage.as_ref(),
        );

        read?;
        Ok(response)
    }

    fn name(&self) -> &str {
        self.provider_name
    }

    fn model(&self) -> &str {
        &self.model
    }

    fn base_url(&self) -> &str {
        self.http.base_url()
    }
}

// ============================================================================
// API Types
// ============================================================================

#[derive(Debug, Clone, Copy, Serialize)]
struct Sampling {
    temperature: f32,
    max_tokens: u32,
    top_p: f32,
    frequency_penalty: f32,
    presence_penalty: f32,
}

#[derive(Debug, Serialize)]
struct WireMessage {
    role: &'static str,
    content: String,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<WireMessage>,
    #[serde(flatten)]
    sampling: Sampling,
    stream: bool,
}

#[derive(Debug, Deserialize)]
struct ApiUsage {
    #[serde(default)]
    prompt_tokens: u32,
    #[serde(default)]
    completion_tokens: u32,
    #[serde(default)]
    total_tokens: Option<u32>,
}

impl From<ApiUsage> for TokenUsage {
    fn from(usage: ApiUsage) -> Self {
        let mut mapped = TokenUsage::new(usage.prompt_tokens, usage.completion_tokens);
        if let Some(total) = usage.total_tokens {
            mapped.total_tokens = total;
        }
        mapped
    }
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    model: Option<String>,
    #[serde(default)]
    choices: Vec<Choice>,
    #[serde(default)]
    usage: Option<ApiUsage>,
}

impl ChatResponse {
    fn into_response(self, configured_model: &str) -> Result<AIResponse, ProviderError> {
        let choice = self
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| ProviderError::Parse("response contained no choices".to_string()))?;

        let id = self.id.unwrap_or_else(generate_id);
        let model = self.model.unwrap_or_else(|| configured_model.to_string());
        Ok(AIResponse::new(id, choice.message.content.unwrap_or_default(), model)
            .with_usage(self.usage.map(TokenUsage::from)))
    }
}

#[derive(Debug, Deserialize)]
struct Delta {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct StreamChoice {
    delta: Delta,
}

#[derive(Debug, Deserialize)]
struct StreamChunk {
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    model: Option<String>,
    #[serde(default)]
    choices: Vec<StreamChoice>,
    #[serde(default)]
    usage: Option<ApiUsage>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AIProvider;
    use crate::types::{CodeContext, Message};
    use mockito::{Matcher, Server};
    use serde_json::json;
    use std::sync::{Arc, Mutex};

    fn client_for(url: &str) -> OpenAIClient {
        let config = AIConfig::new(AIProvider::OpenAI, "gpt-4o")
            .with_api_key("sk-test")
            .with_api_url(url);
        OpenAIClient::new(&config).unwrap()
    }

    fn hello() -> ChatContext {
        ChatContext::new(vec![Message::user("hello")])
    }

    #[test]
    fn test_request_shape() {
        let client = client_for("https://api.openai.com/v1");
        let value = serde_json::to_value(client.build_request(&hello(), false)).unwrap();
        assert_eq!(value["model"], "gpt-4o");
        assert_eq!(value["max_tokens"], 2048);
        assert_eq!(value["frequency_penalty"], 0.0);
        assert_eq!(value["presence_penalty"], 0.0);
        assert!(value["top_p"].is_number());
        assert_eq!(value["stream"], false);
        assert_eq!(value["messages"].as_array().unwrap().len(), 1);
    }

    #[test]
    fn test_enrichment_is_leading_system_message() {
        let client = client_for("https://api.openai.com/v1");
        let context = hello().with_code_context(CodeContext::new("/r/a.py", "python", 2, 3, "x = 1"));
        let request = client.build_request(&context, false);

        assert_eq!(request.messages.len(), 2);
        assert_eq!(request.messages[0].role, "system");
        assert!(request.messages[0].content.contains("File: a.py"));
        assert_eq!(request.messages[1].content, "hello");
    }

    #[test]
    fn test_usage_mapping() {
        let usage: ApiUsage =
            serde_json::from_value(json!({"prompt_tokens": 10, "completion_tokens": 5})).unwrap();
        assert_eq!(TokenUsage::from(usage).total_tokens, 15);

        let usage: ApiUsage = serde_json::from_value(
            json!({"prompt_tokens": 10, "completion_tokens": 5, "total_tokens": 42}),
        )
        .unwrap();
        assert_eq!(TokenUsage::from(usage).total_tokens, 42);
    }

    #[tokio::test]
    async fn test_chat_success() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/chat/completions")
            .match_header("authorization", "Bearer sk-test")
            .match_header("content-type", "application/json")
            .match_body(Matcher::PartialJson(json!({"model": "gpt-4o", "stream": false})))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                json!({
                    "id": "chatcmpl-123",
                    "model": "gpt-4o-2024-08-06",
                    "choices": [{"index": 0, "message": {"role": "assistant", "content": "X"}}],
                    "usage": {"prompt_tokens": 30, "completion_tokens": 12, "total_tokens": 42}
                })
                .to_string(),
            )
            .create_async()
            .await;

        let client = client_for(&server.url());
        let response = client.chat(&hello()).await.unwrap();

        mock.assert_async().await;
        assert_eq!(response.content, "X");
        assert_eq!(response.id, "chatcmpl-123");
        assert_eq!(response.model, "gpt-4o-2024-08-06");
        let usage = response.usage.unwrap();
        assert_eq!(usage.total_tokens, 42);
        assert_eq!(usage.prompt_tokens, 30);
    }

    #[tokio::test]
    async fn test_chat_falls_back_to_generated_id() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("POST", "/chat/completions")
            .with_status(200)
            .with_body(json!({"choices": [{"message": {"content": "ok"}}]}).to_string())
            .create_async()
            .await;

        let response = client_for(&server.url()).chat(&hello()).await.unwrap();
        assert!(!response.id.is_empty());
        assert_eq!(response.model, "gpt-4o");
        assert!(response.usage.is_none());
    }

    #[tokio::test]
    async fn test_chat_without_choices_is_parse_error() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("POST", "/chat/completions")
            .with_status(200)
            .with_body(json!({"id": "x", "choices": []}).to_string())
            .create_async()
            .await;

        let err = client_for(&server.url()).chat(&hello()).await.unwrap_err();
        assert!(matches!(err, ProviderError::Parse(_)));
    }

    #[tokio::test]
    async fn test_chat_unauthorized() {
        let mut server = Server::new_async().await;
        let body = r#"{"error":{"message":"Incorrect API key provided","type":"invalid_request_error"}}"#;
        let _mock = server
            .mock("POST", "/chat/completions")
            .with_status(401)
            .with_body(body)
            .create_async()
            .await;

        let err = client_for(&server.url()).chat(&hello()).await.unwrap_err();
        assert_eq!(err.status(), Some(401));
        assert_eq!(err.body(), Some(body));
        assert!(err.to_string().contains("Incorrect API key provided"));
        assert_eq!(err.details()["status"], 401);
    }

    #[tokio::test]
    async fn test_complete_returns_single_candidate() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/chat/completions")
            .match_body(Matcher::Regex("Complete this rust code".to_string()))
            .with_status(200)
            .with_body(json!({"choices": [{"message": {"content": "Ok(())"}}]}).to_string())
            .create_async()
            .await;

        let request = CompletionRequest::new(
            "finish the function",
            CodeContext::new("/r/src/lib.rs", "rust", 1, 1, "fn run() -> Result<()> {"),
        );
        let response = client_for(&server.url()).complete(&request).await.unwrap();

        mock.assert_async().await;
        assert_eq!(response.completions.len(), 1);
        assert_eq!(response.completions[0].text, "Ok(())");
        assert_eq!(response.completions[0].confidence, CLOUD_COMPLETION_CONFIDENCE);
    }

    #[tokio::test]
    async fn test_stream_chat_sse() {
        let mut server = Server::new_async().await;
        let body = concat!(
            "data: {\"id\":\"chatcmpl-9\",\"model\":\"gpt-4o\",\"choices\":[{\"delta\":{\"role\":\"assistant\"}}]}\n\n",
            "data: {\"id\":\"chatcmpl-9\",\"choices\":[{\"delta\":{\"content\":\"Hel\"}}]}\n\n",
            "data: {garbage\n\n",
            "data: {\"id\":\"chatcmpl-9\",\"choices\":[{\"delta\":{\"content\":\"lo\"}}]}\n\n",
            "data: {\"id\":\"chatcmpl-9\",\"choices\":[],\"usage\":{\"prompt_tokens\":3,\"completion_tokens\":2,\"total_tokens\":5}}\n\n",
            "data: [DONE]\n\n",
        );
        let _mock = server
            .mock("POST", "/chat/completions")
            .match_body(Matcher::PartialJson(json!({"stream": true})))
            .with_status(200)
            .with_header("content-type", "text/event-stream")
            .with_body(body)
            .create_async()
            .await;

        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let response = client_for(&server.url())
            .stream_chat(
                &hello(),
                Box::new(move |chunk: &str| sink.lock().unwrap().push(chunk.to_string())),
            )
            .await
            .unwrap();

        assert_eq!(*seen.lock().unwrap(), vec!["Hel", "lo"]);
        assert_eq!(response.content, "Hello");
        assert_eq!(response.id, "chatcmpl-9");
        assert_eq!(response.usage.unwrap().total_tokens, 5);
    }

    #[tokio::test]
    async fn test_stream_chat_error_status() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("POST", "/chat/completions")
            .with_status(429)
            .with_body(r#"{"error":{"message":"Rate limit reached"}}"#)
            .create_async()
            .await;

        let err = client_for(&server.url())
            .stream_chat(&hello(), Box::new(|_: &str| {}))
            .await
            .unwrap_err();
        assert_eq!(err.status(), Some(429));
    }
}
