// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Engine façade over the active provider client.
//!
//! The engine owns an immutable snapshot of `(config, client)`. Calls clone
//! the snapshot and release the lock before awaiting, so a reconfiguration
//! never disturbs requests already in flight: they finish on the client they
//! started with.

use std::sync::{Arc, RwLock};

use tracing::{info, info_span, Instrument};

use crate::config::{AIConfig, AIConfigPatch};
use crate::error::{ConfigError, ProviderError};
use crate::providers::create_client;
use crate::types::{
    AIResponse, ChatContext, CompletionRequest, CompletionResponse, OnChunk, SharedClient,
};

struct EngineState {
    config: Arc<AIConfig>,
    client: SharedClient,
}

impl EngineState {
    fn build(config: AIConfig) -> Result<Self, ConfigError> {
        let client = create_client(&config)?;
        Ok(Self {
            config: Arc::new(config),
            client,
        })
    }
}

/// Routes chat and completion calls to the client for the current config.
pub struct AIEngine {
    state: RwLock<Arc<EngineState>>,
}

impl AIEngine {
    /// Build an engine for a config.
    ///
    /// Fails if the config is invalid or names a provider with no client.
    pub fn new(config: AIConfig) -> Result<Self, ConfigError> {
        Ok(Self {
            state: RwLock::new(Arc::new(EngineState::build(config)?)),
        })
    }

    fn snapshot(&self) -> Arc<EngineState> {
        Arc::clone(&self.state.read().unwrap_or_else(|e| e.into_inner()))
    }

    /// Current configuration.
    pub fn get_config(&self) -> Arc<AIConfig> {
        Arc::clone(&self.snapshot().config)
    }

    /// Client currently serving requests.
    pub fn client(&self) -> SharedClient {
        Arc::clone(&self.snapshot().client)
    }

    /// Build a new engine from the current config plus `patch`.
    ///
    /// The receiver is left untouched.
    pub fn reconfigured(&self, patch: &AIConfigPatch) -> Result<AIEngine, ConfigError> {
        let config = self.snapshot().config.merge(patch)?;
        AIEngine::new(config)
    }

    /// Apply `patch` and swap in a rebuilt client.
    ///
    /// On error the previous config and client stay active.
    pub fn update_config(&self, patch: &AIConfigPatch) -> Result<Arc<AIConfig>, ConfigError> {
        let current = self.snapshot();
        let next = Arc::new(EngineState::build(current.config.merge(patch)?)?);
        let config = Arc::clone(&next.config);

        *self.state.write().unwrap_or_else(|e| e.into_inner()) = next;
        info!(
            provider = %config.provider,
            model = %config.model,
            "Engine reconfigured"
        );
        Ok(config)
    }

    /// Send a chat request to the active client.
    pub async fn chat(&self, context: &ChatContext) -> Result<AIResponse, ProviderError> {
        let state = self.snapshot();
        let span = request_span("chat", &state);
        state.client.chat(context).instrument(span).await
    }

    /// Request a completion from the active client.
    pub async fn complete(
        &self,
        request: &CompletionRequest,
    ) -> Result<CompletionResponse, ProviderError> {
        let state = self.snapshot();
        let span = request_span("complete", &state);
        state.client.complete(request).instrument(span).await
    }

    /// Stream a chat response from the active client.
    pub async fn stream_chat(
        &self,
        context: &ChatContext,
        on_chunk: OnChunk,
    ) -> Result<AIResponse, ProviderError> {
        let state = self.snapshot();
        let span = request_span("stream_chat", &state);
        state
            .client
            .stream_chat(context, on_chunk)
            .instrument(span)
            .await
    }
}

fn request_span(operation: &'static str, state: &EngineState) -> tracing::Span {
    info_span!(
        "engine",
        operation,
        provider = state.client.name(),
        model = state.client.model()
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AIProvider;
    use crate::types::Message;
    use mockito::Server;
    use serde_json::json;

    fn ollama_at(url: &str) -> AIConfig {
        AIConfig::default().with_api_url(url)
    }

    fn ollama_reply(content: &str) -> String {
        json!({"message": {"role": "assistant", "content": content}, "done": true}).to_string()
    }

    #[test]
    fn test_new_rejects_unsupported_provider() {
        let config = AIConfig::new(AIProvider::HuggingFace, "starcoder");
        assert!(matches!(
            AIEngine::new(config),
            Err(ConfigError::UnsupportedProvider(_))
        ));
    }

    #[test]
    fn test_update_config_swaps_client() {
        let engine = AIEngine::new(AIConfig::default()).unwrap();
        assert_eq!(engine.client().name(), "ollama");

        let patch = AIConfigPatch::default()
            .with_provider("openai")
            .with_model("gpt-4o")
            .with_api_key("sk-test");
        let config = engine.update_config(&patch).unwrap();

        assert_eq!(config.provider, AIProvider::OpenAI);
        assert_eq!(engine.get_config().provider, AIProvider::OpenAI);
        assert_eq!(engine.client().name(), "openai");
        assert_eq!(engine.client().base_url(), "https://api.openai.com/v1");
    }

    #[test]
    fn test_failed_update_keeps_previous_state() {
        let engine = AIEngine::new(AIConfig::default()).unwrap();
        let config_before = engine.get_config();
        let client_before = engine.client();

        let err = engine
            .update_config(&AIConfigPatch::default().with_provider("unsupported-xyz"))
            .unwrap_err();
        assert!(matches!(err, ConfigError::UnsupportedProvider(ref p) if p == "unsupported-xyz"));

        let err = engine
            .update_config(&AIConfigPatch::default().with_temperature(7.5))
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { .. }));

        assert!(Arc::ptr_eq(&config_before, &engine.get_config()));
        assert!(Arc::ptr_eq(&client_before, &engine.client()));
    }

    #[test]
    fn test_reconfigured_leaves_receiver() {
        let engine = AIEngine::new(AIConfig::default()).unwrap();
        let other = engine
            .reconfigured(&AIConfigPatch::default().with_model("codellama"))
            .unwrap();

        assert_eq!(other.get_config().model, "codellama");
        assert_eq!(engine.get_config().model, "llama3.2");
    }

    #[tokio::test]
    async fn test_previous_client_serves_after_failed_update() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/api/chat")
            .with_status(200)
            .with_body(ollama_reply("still here"))
            .expect(1)
            .create_async()
            .await;

        let engine = AIEngine::new(ollama_at(&server.url())).unwrap();
        assert!(engine
            .update_config(&AIConfigPatch::default().with_provider("unsupported-xyz"))
            .is_err());

        let response = engine
            .chat(&ChatContext::new(vec![Message::user("ping")]))
            .await
            .unwrap();
        mock.assert_async().await;
        assert_eq!(response.content, "still here");
    }

    #[tokio::test]
    async fn test_in_flight_client_survives_swap() {
        let mut old_server = Server::new_async().await;
        let mut new_server = Server::new_async().await;
        let old_mock = old_server
            .mock("POST", "/api/chat")
            .with_body(ollama_reply("old"))
            .create_async()
            .await;
        let new_mock = new_server
            .mock("POST", "/api/chat")
            .with_body(ollama_reply("new"))
            .create_async()
            .await;

        let engine = AIEngine::new(ollama_at(&old_server.url())).unwrap();
        let in_flight = engine.client();

        engine
            .update_config(&AIConfigPatch::default().with_api_url(new_server.url()))
            .unwrap();

        let context = ChatContext::new(vec![Message::user("ping")]);
        assert_eq!(in_flight.chat(&context).await.unwrap().content, "old");
        assert_eq!(engine.chat(&context).await.unwrap().content, "new");

        old_mock.assert_async().await;
        new_mock.assert_async().await;
    }
}
