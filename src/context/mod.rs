// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Repository context indexer.
//!
//! Builds a lightweight project model used to enrich prompts:
//!
//! - **Scanning**: walk the root with include/exclude [`patterns`]
//! - **Classification**: language tags by file extension
//! - **Manifests**: dependencies from package.json, requirements.txt and Cargo.toml
//! - **Git**: current branch and commit from local metadata
//! - **Excerpts**: line-range [`CodeContext`](crate::types::CodeContext) with surroundings
//! - **Chunking**: fixed line-count chunks for indexed files
//!
//! # Usage
//!
//! ```rust,ignore
//! use openpilot::context::{ContextManager, IndexerOptions};
//!
//! let manager = ContextManager::new(IndexerOptions::new("."))?;
//! let repo = manager.analyze_repository().await?;
//! let excerpt = manager.get_code_context("src/main.rs", 10, 20).await?;
//! ```

mod chunker;
mod dependencies;
mod git;
mod language;
mod manager;
pub mod patterns;
mod symbols;

pub use chunker::{chunk_content, DEFAULT_CHUNK_SIZE};
pub use dependencies::{extract_dependencies, parse_cargo_toml, parse_package_json, parse_requirements};
pub use git::read_git_info;
pub use language::{detect_language, PLAINTEXT};
pub use manager::{ContextManager, IndexerOptions, DEFAULT_MAX_FILE_SIZE, SURROUNDING_LINES};
pub use patterns::{PathFilter, Pattern, DEFAULT_EXCLUDE_PATTERNS, DEFAULT_INCLUDE_PATTERNS};
pub use symbols::{extract_imports, extract_symbols};
