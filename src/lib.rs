// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! OpenPilot - provider abstraction and repository context for a coding assistant.
//!
//! The core sits between an editor-like caller and AI backends. It turns
//! editor selections and a scanned repository into enriched chat and
//! completion requests, and normalizes what comes back.
//!
//! # Architecture
//!
//! The crate is organized into the following modules:
//!
//! - [`types`] - Messages, code/repository context, responses, the [`ChatClient`] trait
//! - [`error`] - Error taxonomy with stable codes
//! - [`config`] - [`AIConfig`], partial updates and layered loading
//! - [`providers`] - Ollama and OpenAI-compatible clients
//! - [`engine`] - [`AIEngine`] façade with atomic reconfiguration
//! - [`context`] - Repository indexer: scanning, manifests, git, excerpts, chunks
//! - [`telemetry`] - Tracing setup and in-process metrics
//!
//! # Example
//!
//! ```rust,ignore
//! use openpilot::{AIConfig, AIEngine, ChatContext, ContextManager, IndexerOptions, Message};
//!
//! let engine = AIEngine::new(AIConfig::default())?;
//! let indexer = ContextManager::new(IndexerOptions::new("."))?;
//!
//! let excerpt = indexer.get_code_context("src/lib.rs", 1, 20).await?;
//! let context = ChatContext::new(vec![Message::user("Explain this")])
//!     .with_code_context(excerpt);
//! let response = engine.chat(&context).await?;
//! ```

pub mod config;
pub mod context;
pub mod engine;
pub mod error;
pub mod providers;
pub mod telemetry;
pub mod types;

// Re-export commonly used types at crate root
pub use config::{load_config, AIConfig, AIConfigPatch, AIProvider, CliOptions};
pub use context::{ContextManager, IndexerOptions};
pub use engine::AIEngine;
pub use error::{ConfigError, ContextError, OpenPilotError, ProviderError, Result};
pub use providers::create_client;
pub use types::{
    // Message types
    ChatContext, Message, Role,
    // Context types
    CodeContext, RepositoryContext,
    // Response types
    AIResponse, Completion, CompletionRequest, CompletionResponse, TokenUsage,
    // Client trait
    ChatClient, OnChunk, SharedClient,
};

/// OpenPilot version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
