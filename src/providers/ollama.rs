// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Ollama local-server client.
//!
//! Talks to the native Ollama API rather than its OpenAI shim:
//!
//! - `POST /api/chat` for chat, streamed as newline-delimited JSON
//! - `POST /api/generate` for single-shot completions
//!
//! Code and repository enrichment is appended to the last user message.

use std::time::Instant;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::stream::StreamState;
use super::{build_completion_prompt, record_call, render_enrichment, HttpBackend};
use crate::config::AIConfig;
use crate::error::{ConfigError, ProviderError};
use crate::types::{
    generate_id, AIResponse, ChatClient, ChatContext, Completion, CompletionRequest,
    CompletionResponse, OnChunk, Role, TokenUsage,
};

/// Fixed confidence reported for Ollama completions.
pub const OLLAMA_COMPLETION_CONFIDENCE: f32 = 0.8;

const PROVIDER: &str = "ollama";

/// Prefix of generated response ids.
const ID_PREFIX: &str = "ollama";

/// Client for a local Ollama server.
pub struct OllamaClient {
    http: HttpBackend,
    model: String,
    options: ModelOptions,
}

impl OllamaClient {
    /// Create a client from a config. Fails only if the HTTP client can't be built.
    pub fn new(config: &AIConfig) -> Result<Self, ConfigError> {
        Ok(Self {
            http: HttpBackend::new(config)?,
            model: config.model.clone(),
            options: ModelOptions {
                temperature: config.temperature,
                top_p: config.top_p,
                num_predict: config.max_tokens,
            },
        })
    }

    fn build_chat_request(&self, context: &ChatContext, stream: bool) -> ChatRequest<'_> {
        let mut messages: Vec<WireMessage> = context
            .messages
            .iter()
            .map(|m| WireMessage {
                role: m.role.as_str(),
                content: m.content.clone(),
            })
            .collect();

        if let Some(enrichment) = render_enrichment(context) {
            match messages.iter_mut().rev().find(|m| m.role == Role::User.as_str()) {
                Some(last_user) => {
                    last_user.content.push_str("\n\n");
                    last_user.content.push_str(&enrichment);
                }
                None => messages.push(WireMessage {
                    role: Role::User.as_str(),
                    content: enrichment,
                }),
            }
        }

        ChatRequest {
            model: &self.model,
            messages,
            stream,
            options: self.options,
        }
    }

    fn new_id() -> String {
        format!("{}-{}", ID_PREFIX, generate_id())
    }
}

#[async_trait]
impl ChatClient for OllamaClient {
    async fn chat(&self, context: &ChatContext) -> Result<AIResponse, ProviderError> {
        let start = Instant::now();
        let request = self.build_chat_request(context, false);
        debug!(model = %self.model, messages = request.messages.len(), "Sending chat request");

        let result = async {
            let response = self.http.post_json("/api/chat", &request).await?;
            let body: ChatChunk = self.http.read_json(response).await?;
            Ok::<_, ProviderError>(body)
        }
        .await;

        let body = match result {
            Ok(body) => body,
            Err(e) => {
                record_call(PROVIDER, "chat", start, false, None);
                return Err(e);
            }
        };

        let usage = body.usage();
        record_call(PROVIDER, "chat", start, true, usage.as_ref());

        let content = body.message.map(|m| m.content).unwrap_or_default();
        let model = body.model.unwrap_or_else(|| self.model.clone());
        Ok(AIResponse::new(Self::new_id(), content, model).with_usage(usage))
    }

    async fn complete(&self, request: &CompletionRequest) -> Result<CompletionResponse, ProviderError> {
        let start = Instant::now();
        let body = GenerateRequest {
            model: &self.model,
            prompt: build_completion_prompt(request),
            stream: false,
            options: self.options,
        };
        debug!(model = %self.model, file = %request.context.file_name, "Sending completion request");

        let result = async {
            let response = self.http.post_json("/api/generate", &body).await?;
            let body: GenerateResponse = self.http.read_json(response).await?;
            Ok::<_, ProviderError>(body)
        }
        .await;
        record_call(PROVIDER, "complete", start, result.is_ok(), None);

        let generated = result?;
        Ok(CompletionResponse {
            completions: vec![Completion {
                text: generated.response,
                confidence: OLLAMA_COMPLETION_CONFIDENCE,
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
        let request = self.build_chat_request(context, true);
        debug!(model = %self.model, messages = request.messages.len(), "Sending streaming chat request");

        let response = match self.http.post_streaming("/api/chat", &request).await {
            Ok(response) => response,
            Err(e) => {
                record_call(PROVIDER, "stream_chat", start, false, None);
                return Err(e);
            }
        };

        let mut state = StreamState::new(on_chunk);
        let mut server_error: Option<String> = None;

        let read = self
            .http
            .for_each_line(response, |line| {
                let line = line.trim();
                if line.is_empty() || server_error.is_some() {
                    return;
                }
                match serde_json::from_str::<ChatChunk>(line) {
                    Ok(chunk) => {
                        if let Some(error) = &chunk.error {
                            server_error = Some(error.clone());
                            return;
                        }
                        state.set_model(chunk.model.clone());
                        if chunk.done {
                            state.set_usage(chunk.usage());
                        }
                        if let Some(message) = chunk.message {
                            state.push_delta(&message.content);
                        }
                    }
                    Err(e) => warn!(error = %e, "Dropping unparsable stream line"),
                }
            })
            .await;

        let response = state.into_response(Some(ID_PREFIX), &self.model);
        let success = read.is_ok() && server_error.is_none();
        record_call(PROVIDER, "stream_chat", start, success, response.usage.as_ref());

        read?;
        if let Some(error) = server_error {
            return Err(ProviderError::Stream(error));
        }
        Ok(response)
    }

    fn name(&self) -> &str {
        PROVIDER
    }

    fn model(&self) -> &str {
        &self.model
    }

    fn base_url(&self) -> &str {
        self.http.base_url()
    }
}

// ============================================================================
// Wire Types
// ============================================================================

#[derive(Debug, Clone, Copy, Serialize)]
struct ModelOptions {
    temperature: f32,
    top_p: f32,
    num_predict: u32,
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
    stream: bool,
    options: ModelOptions,
}

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: String,
    stream: bool,
    options: ModelOptions,
}

#[derive(Debug, Deserialize)]
struct ChunkMessage {
    #[serde(default)]
    content: String,
}

/// One `/api/chat` body, or one line of its stream.
#[derive(Debug, Deserialize)]
struct ChatChunk {
    #[serde(default)]
    model: Option<String>,
    #[serde(default)]
    message: Option<ChunkMessage>,
    #[serde(default)]
    done: bool,
    #[serde(default)]
    prompt_eval_count: Option<u32>,
    #[serde(default)]
    eval_count: Option<u32>,
    #[serde(default)]
    error: Option<String>,
}

impl ChatChunk {
    fn usage(&self) -> Option<TokenUsage> {
        match (self.prompt_eval_count, self.eval_count) {
            (None, None) => None,
            (prompt, completion) => Some(TokenUsage::new(
                prompt.unwrap_or(0),
                completion.unwrap_or(0),
            )),
        }
    }
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    response: String,
}
