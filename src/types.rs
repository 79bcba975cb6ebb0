// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Core types for the OpenPilot core.
//!
//! This module defines the data structures exchanged between callers, the
//! provider layer, and the repository indexer: messages and chat contexts,
//! code and repository context, and normalized AI responses.
//!
//! All types serialize with camelCase field names so they can be handed
//! directly to JSON-speaking view layers.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::ProviderError;

/// Current Unix time in milliseconds.
pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// Generate a new unique identifier.
pub fn generate_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

// ============================================================================
// Message Types
// ============================================================================

/// Role of a message sender in a conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

impl Role {
    /// Wire name of the role.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::System => "system",
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }
}

/// A message in a conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: String,
    pub role: Role,
    pub content: String,
    /// Unix epoch milliseconds.
    pub timestamp: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Map<String, Value>>,
}

impl Message {
    /// Create a message with a fresh id and the current timestamp.
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            id: generate_id(),
            role,
            content: content.into(),
            timestamp: now_millis(),
            metadata: None,
        }
    }

    /// Create a user message.
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    /// Create an assistant message.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }

    /// Create a system message.
    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }

    /// Attach metadata to this message.
    pub fn with_metadata(mut self, metadata: Map<String, Value>) -> Self {
        self.metadata = Some(metadata);
        self
    }
}

/// Conversation history plus optional code and repository enrichment.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatContext {
    pub messages: Vec<Message>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code_context: Option<CodeContext>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repository_context: Option<RepositoryContext>,
}

impl ChatContext {
    /// Create a chat context from a message history.
    pub fn new(messages: Vec<Message>) -> Self {
        Self {
            messages,
            code_context: None,
            repository_context: None,
        }
    }

    /// Attach a code excerpt.
    pub fn with_code_context(mut self, context: CodeContext) -> Self {
        self.code_context = Some(context);
        self
    }

    /// Attach a repository model.
    pub fn with_repository_context(mut self, context: RepositoryContext) -> Self {
        self.repository_context = Some(context);
        self
    }
}

// ============================================================================
// Code Context
// ============================================================================

/// Kind of a detected symbol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SymbolKind {
    Module,
    Class,
    Struct,
    Interface,
    Enum,
    Function,
    Method,
    Constant,
}

/// A zero-indexed position within a file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
    pub line: usize,
    pub character: usize,
}

/// A symbol detected in a code excerpt's file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SymbolInfo {
    pub name: String,
    pub kind: SymbolKind,
    pub location: Position,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub container_name: Option<String>,
}

/// A selected code excerpt with its surroundings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CodeContext {
    pub language: String,
    pub file_name: String,
    pub file_path: String,
    /// 1-indexed, inclusive.
    pub line_start: usize,
    /// 1-indexed, inclusive.
    pub line_end: usize,
    pub selected_code: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub surrounding_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub imports: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub symbols: Option<Vec<SymbolInfo>>,
}

impl CodeContext {
    /// Create a code context for an excerpt without surroundings.
    pub fn new(
        file_path: impl Into<String>,
        language: impl Into<String>,
        line_start: usize,
        line_end: usize,
        selected_code: impl Into<String>,
    ) -> Self {
        let file_path = file_path.into();
        let file_name = std::path::Path::new(&file_path)
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| file_path.clone());
        Self {
            language: language.into(),
            file_name,
            file_path,
            line_start,
            line_end,
            selected_code: selected_code.into(),
            surrounding_code: None,
            imports: None,
            symbols: None,
        }
    }
}

// ============================================================================
// Repository Context
// ============================================================================

/// Package ecosystem a dependency belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Ecosystem {
    Npm,
    Pip,
    Cargo,
    Maven,
    Other,
}

impl std::fmt::Display for Ecosystem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Npm => "npm",
            Self::Pip => "pip",
            Self::Cargo => "cargo",
            Self::Maven => "maven",
            Self::Other => "other",
        };
        write!(f, "{}", name)
    }
}

/// A dependency declared in a root manifest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dependency {
    pub name: String,
    pub version: String,
    pub ecosystem: Ecosystem,
}

/// Minimal version-control metadata.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GitInfo {
    pub branch: String,
    /// Empty when the ref could not be resolved locally.
    pub commit: String,
    /// True when HEAD points at a commit rather than a branch.
    #[serde(default)]
    pub detached: bool,
}

/// A file discovered during repository analysis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileInfo {
    pub path: String,
    /// Relative to the root, always `/`-separated.
    pub relative_path: String,
    pub language: String,
    pub size: u64,
    /// Unix epoch milliseconds.
    pub last_modified: i64,
}

/// A contiguous range of a file's lines.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentChunk {
    pub content: String,
    /// 0-indexed, inclusive.
    pub start_line: usize,
    /// 0-indexed, inclusive.
    pub end_line: usize,
}

impl ContentChunk {
    /// Number of lines covered by this chunk.
    pub fn line_count(&self) -> usize {
        self.end_line - self.start_line + 1
    }
}

/// A file's text partitioned into chunks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexedContent {
    pub file_path: String,
    pub content: String,
    pub chunks: Vec<ContentChunk>,
}

/// Structured model of a repository, built by one analysis pass.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RepositoryContext {
    pub root_path: String,
    pub files: Vec<FileInfo>,
    pub dependencies: Vec<Dependency>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub git_info: Option<GitInfo>,
    #[serde(default)]
    pub indexed_content: Vec<IndexedContent>,
}

// ============================================================================
// Responses
// ============================================================================

/// Token usage reported by a backend.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenUsage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

impl TokenUsage {
    /// Build usage from prompt and completion counts.
    pub fn new(prompt_tokens: u32, completion_tokens: u32) -> Self {
        Self {
            prompt_tokens,
            completion_tokens,
            total_tokens: prompt_tokens + completion_tokens,
        }
    }
}

/// A normalized chat response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AIResponse {
    pub id: String,
    pub content: String,
    /// Always [`Role::Assistant`].
    pub role: Role,
    /// Unix epoch milliseconds.
    pub timestamp: i64,
    pub model: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage: Option<TokenUsage>,
}

impl AIResponse {
    /// Create an assistant response stamped with the current time.
    pub fn new(id: impl Into<String>, content: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            content: content.into(),
            role: Role::Assistant,
            timestamp: now_millis(),
            model: model.into(),
            usage: None,
        }
    }

    /// Attach token usage.
    pub fn with_usage(mut self, usage: Option<TokenUsage>) -> Self {
        self.usage = usage;
        self
    }
}

/// A code completion request.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletionRequest {
    /// Free-text instruction.
    pub prompt: String,
    pub context: CodeContext,
}

impl CompletionRequest {
    pub fn new(prompt: impl Into<String>, context: CodeContext) -> Self {
        Self {
            prompt: prompt.into(),
            context,
        }
    }
}

/// A single completion candidate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Completion {
    pub text: String,
    /// Fixed per-backend heuristic in `[0, 1]`, not model-reported.
    pub confidence: f32,
    pub offset: usize,
}

/// Completion candidates returned by a backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletionResponse {
    pub completions: Vec<Completion>,
}

// ============================================================================
// Chat Client Trait
// ============================================================================

/// Callback invoked once per non-empty streamed text delta, in arrival order.
pub type OnChunk = Box<dyn Fn(&str) + Send + Sync>;

/// A client for one AI backend family.
///
/// Implementations translate canonical requests into the backend's wire
/// format and normalize responses back. Every failure surfaces as a
/// [`ProviderError`](crate::error::ProviderError).
///
/// # Example
///
/// ```rust,ignore
/// use openpilot::types::{ChatClient, ChatContext, Message};
///
/// let context = ChatContext::new(vec![Message::user("Explain this function")]);
/// let response = client.chat(&context).await?;
/// println!("{}", response.content);
/// ```
#[async_trait]
pub trait ChatClient: Send + Sync {
    /// Send a chat request.
    ///
    /// # Arguments
    /// * `context` - Conversation history plus optional code/repository enrichment
    ///
    /// # Returns
    /// The normalized assistant response
    async fn chat(&self, context: &ChatContext) -> Result<AIResponse, ProviderError>;

    /// Request a completion for a code excerpt.
    ///
    /// Returns exactly one candidate.
    async fn complete(&self, request: &CompletionRequest) -> Result<CompletionResponse, ProviderError>;

    /// Send a streaming chat request.
    ///
    /// # Arguments
    /// * `context` - Conversation history plus optional enrichment
    /// * `on_chunk` - Called once per text delta
    ///
    /// # Returns
    /// The accumulated response after the body ends
    async fn stream_chat(
        &self,
        context: &ChatContext,
        on_chunk: OnChunk,
    ) -> Result<AIResponse, ProviderError>;

    /// Display name of the backend.
    fn name(&self) -> &str;

    /// Model requests are sent to.
    fn model(&self) -> &str;

    /// Base URL requests are sent to.
    fn base_url(&self) -> &str;
}

/// A shared, thread-safe chat client.
pub type SharedClient = Arc<dyn ChatClient>;
