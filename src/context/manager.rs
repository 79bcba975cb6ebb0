// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Repository indexer.
//!
//! Walks a root directory into a [`RepositoryContext`], serves line-range
//! excerpts as [`CodeContext`], and keeps a cache of chunked file contents.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};
use std::time::Instant;

use chrono::{DateTime, Utc};
use walkdir::WalkDir;

use crate::error::ContextError;
use crate::types::{CodeContext, FileInfo, IndexedContent, RepositoryContext};

#[cfg(feature = "telemetry")]
use crate::telemetry::metrics::GLOBAL_METRICS;

use super::chunker::{chunk_content, DEFAULT_CHUNK_SIZE};
use super::dependencies::extract_dependencies;
use super::git::read_git_info;
use super::language::detect_language;
use super::patterns::{PathFilter, DEFAULT_EXCLUDE_PATTERNS, DEFAULT_INCLUDE_PATTERNS};
use super::symbols;

/// Files larger than this are skipped during analysis (1 MiB).
pub const DEFAULT_MAX_FILE_SIZE: u64 = 1024 * 1024;

/// Lines of context kept on each side of a selection.
pub const SURROUNDING_LINES: usize = 10;

/// Options for a [`ContextManager`].
#[derive(Debug, Clone)]
pub struct IndexerOptions {
    pub root_path: PathBuf,
    pub max_file_size: u64,
    pub exclude_patterns: Vec<String>,
    pub include_patterns: Vec<String>,
    pub chunk_size: usize,
}

impl IndexerOptions {
    /// Default options rooted at `root_path`.
    pub fn new(root_path: impl Into<PathBuf>) -> Self {
        Self {
            root_path: root_path.into(),
            max_file_size: DEFAULT_MAX_FILE_SIZE,
            exclude_patterns: DEFAULT_EXCLUDE_PATTERNS.iter().map(|s| s.to_string()).collect(),
            include_patterns: DEFAULT_INCLUDE_PATTERNS.iter().map(|s| s.to_string()).collect(),
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }

    pub fn with_max_file_size(mut self, bytes: u64) -> Self {
        self.max_file_size = bytes;
        self
    }

    /// Replace the exclude list.
    pub fn with_exclude_patterns(mut self, patterns: Vec<String>) -> Self {
        self.exclude_patterns = patterns;
        self
    }

    /// Replace the include list.
    pub fn with_include_patterns(mut self, patterns: Vec<String>) -> Self {
        self.include_patterns = patterns;
        self
    }

    pub fn with_chunk_size(mut self, lines: usize) -> Self {
        self.chunk_size = lines;
        self
    }
}

/// Scans a repository and serves code excerpts and chunked file contents.
///
/// The chunk cache is keyed by file path. Concurrent `index_file` calls for
/// the same path are not ordered; the last write wins.
pub struct ContextManager {
    options: IndexerOptions,
    filter: Arc<PathFilter>,
    indexed: RwLock<HashMap<String, IndexedContent>>,
    last_analysis: RwLock<Option<Arc<RepositoryContext>>>,
}

impl ContextManager {
    /// Create a manager, compiling its include/exclude patterns.
    pub fn new(options: IndexerOptions) -> Result<Self, ContextError> {
        let filter = PathFilter::new(&options.include_patterns, &options.exclude_patterns)?;
        Ok(Self {
            options,
            filter: Arc::new(filter),
            indexed: RwLock::new(HashMap::new()),
            last_analysis: RwLock::new(None),
        })
    }

    /// Create a manager with default options.
    pub fn with_root(root_path: impl Into<PathBuf>) -> Result<Self, ContextError> {
        Self::new(IndexerOptions::new(root_path))
    }

    pub fn options(&self) -> &IndexerOptions {
        &self.options
    }

    pub fn root_path(&self) -> &Path {
        &self.options.root_path
    }

    /// Walk the root and build a fresh [`RepositoryContext`].
    ///
    /// Unreadable entries are logged and skipped. Only a missing or
    /// non-directory root fails the call.
    pub async fn analyze_repository(&self) -> Result<RepositoryContext, ContextError> {
        let start = Instant::now();
        let root = self.options.root_path.clone();
        let filter = Arc::clone(&self.filter);
        let max_file_size = self.options.max_file_size;

        let scan_root = root.clone();
        let (root, files, dependencies, git_info) = tokio::task::spawn_blocking(move || {
            let root = canonical_root(&scan_root)?;
            let files = scan_files(&root, &filter, max_file_size);
            let dependencies = extract_dependencies(&root);
            let git_info = read_git_info(&root);
            Ok::<_, ContextError>((root, files, dependencies, git_info))
        })
        .await
        .map_err(|e| ContextError::ScanFailed {
            root: root.clone(),
            message: e.to_string(),
        })??;

        let context = RepositoryContext {
            root_path: root.display().to_string(),
            files,
            dependencies,
            git_info,
            indexed_content: self.indexed_snapshot(),
        };

        tracing::info!(
            root = %context.root_path,
            files = context.files.len(),
            dependencies = context.dependencies.len(),
            branch = context.git_info.as_ref().map(|g| g.branch.as_str()).unwrap_or("-"),
            "Repository analyzed"
        );

        *self
            .last_analysis
            .write()
            .unwrap_or_else(|e| e.into_inner()) = Some(Arc::new(context.clone()));

        #[cfg(feature = "telemetry")]
        GLOBAL_METRICS.record_indexer("analyze", start.elapsed(), context.files.len() as u64);

        Ok(context)
    }

    /// The result of the most recent [`analyze_repository`](Self::analyze_repository).
    pub fn repository_context(&self) -> Option<Arc<RepositoryContext>> {
        self.last_analysis
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Read a 1-indexed inclusive line range with up to ten lines of
    /// surrounding context on each side.
    ///
    /// A `line_start` of 0 is treated as 1. A range past the end of the file
    /// yields an empty selection.
    pub async fn get_code_context(
        &self,
        file_path: impl AsRef<Path>,
        line_start: usize,
        line_end: usize,
    ) -> Result<CodeContext, ContextError> {
        let start = Instant::now();
        let path = file_path.as_ref();
        let line_start = line_start.max(1);
        if line_end < line_start {
            return Err(ContextError::InvalidRange {
                path: path.to_path_buf(),
                start: line_start,
                end: line_end,
            });
        }

        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| ContextError::read(path, e))?;
        let lines: Vec<&str> = content.split('\n').collect();

        let selected = slice_lines(&lines, line_start - 1, line_end);
        let surrounding = slice_lines(
            &lines,
            line_start.saturating_sub(SURROUNDING_LINES + 1),
            line_end.saturating_add(SURROUNDING_LINES),
        );

        let language = detect_language(path);
        let mut context = CodeContext::new(
            path.display().to_string(),
            language,
            line_start,
            line_end,
            selected,
        );
        context.surrounding_code = Some(surrounding);
        if symbols::is_supported(language) {
            context.imports = Some(symbols::extract_imports(&content, language));
            context.symbols = Some(symbols::extract_symbols(&content, language));
        }

        #[cfg(feature = "telemetry")]
        GLOBAL_METRICS.record_indexer(
            "code_context",
            start.elapsed(),
            (context.line_end - context.line_start + 1) as u64,
        );

        Ok(context)
    }

    /// Read and chunk a file, caching the result by path.
    pub async fn index_file(&self, file_path: impl AsRef<Path>) -> Result<IndexedContent, ContextError> {
        let start = Instant::now();
        let path = file_path.as_ref();
        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| ContextError::read(path, e))?;

        let chunks = chunk_content(&content, self.options.chunk_size);
        let key = path.display().to_string();
        let indexed = IndexedContent {
            file_path: key.clone(),
            content,
            chunks,
        };

        tracing::debug!(path = %key, chunks = indexed.chunks.len(), "Indexed file");
        self.indexed
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(key, indexed.clone());

        #[cfg(feature = "telemetry")]
        GLOBAL_METRICS.record_indexer("index_file", start.elapsed(), indexed.chunks.len() as u64);

        Ok(indexed)
    }

    /// Cached content for a previously indexed path.
    pub fn get_indexed_content(&self, file_path: impl AsRef<Path>) -> Option<IndexedContent> {
        let key = file_path.as_ref().display().to_string();
        self.indexed
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(&key)
            .cloned()
    }

    /// Drop every cached entry.
    pub fn clear_index(&self) {
        self.indexed
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .clear();
    }

    pub fn indexed_count(&self) -> usize {
        self.indexed.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    fn indexed_snapshot(&self) -> Vec<IndexedContent> {
        let mut entries: Vec<IndexedContent> = self
            .indexed
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .values()
            .cloned()
            .collect();
        entries.sort_by(|a, b| a.file_path.cmp(&b.file_path));
        entries
    }
}

/// Join `lines[from..to]`, clamped to the available lines.
fn slice_lines(lines: &[&str], from: usize, to: usize) -> String {
    let to = to.min(lines.len());
    if from >= to {
        return String::new();
    }
    lines[from..to].join("\n")
}

fn canonical_root(root: &Path) -> Result<PathBuf, ContextError> {
    let canonical = root.canonicalize().map_err(|e| ContextError::ScanFailed {
        root: root.to_path_buf(),
        message: e.to_string(),
    })?;
    if !canonical.is_dir() {
        return Err(ContextError::ScanFailed {
            root: root.to_path_buf(),
            message: "not a directory".to_string(),
        });
    }
    Ok(canonical)
}

/// `/`-separated path of `path` relative to `root`.
fn relative_path(root: &Path, path: &Path) -> String {
    path.strip_prefix(root)
        .unwrap_or(path)
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

fn scan_files(root: &Path, filter: &PathFilter, max_file_size: u64) -> Vec<FileInfo> {
    let mut files = Vec::new();

    let walker = WalkDir::new(root)
        .follow_links(false)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| e.depth() == 0 || !filter.is_excluded(&relative_path(root, e.path())));

    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                tracing::warn!(
                    path = ?e.path(),
                    error = %e,
                    "Skipping unreadable entry"
                );
                continue;
            }
        };

        if !entry.file_type().is_file() {
            continue;
        }

        let relative = relative_path(root, entry.path());
        if !filter.is_included(&relative) {
            continue;
        }

        let metadata = match entry.metadata() {
            Ok(m) => m,
            Err(e) => {
                tracing::warn!(path = %relative, error = %e, "Failed to stat file");
                continue;
            }
        };

        if metadata.len() > max_file_size {
            tracing::debug!(path = %relative, size = metadata.len(), "Skipping large file");
            continue;
        }

        let last_modified = metadata
            .modified()
            .map(|t| DateTime::<Utc>::from(t).timestamp_millis())
            .unwrap_or(0);

        files.push(FileInfo {
            path: entry.path().display().to_string(),
            language: detect_language(entry.path()).to_string(),
            relative_path: relative,
            size: metadata.len(),
            last_modified,
        });
    }

    files
}
