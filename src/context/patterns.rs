// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Include/exclude pattern matching for repository scans.
//!
//! A pattern is either a raw regular expression (leading `^` or any `\`) or a
//! glob-like string where `*` matches any run of characters and `?` matches
//! exactly one. Globs have no path-separator awareness: `*` crosses `/`.
//! Matching is an unanchored search over the `/`-separated relative path.

use regex::Regex;

use crate::error::ContextError;

/// Directories and files skipped by default.
///
/// Directory names are anchored to whole path components so that `out` does
/// not exclude `src/layout.rs`.
pub const DEFAULT_EXCLUDE_PATTERNS: &[&str] = &[
    r"^(?:.*/)?node_modules(?:/|$)",
    r"^(?:.*/)?\.git(?:/|$)",
    r"^(?:.*/)?dist(?:/|$)",
    r"^(?:.*/)?build(?:/|$)",
    r"^(?:.*/)?out(?:/|$)",
    r"^(?:.*/)?coverage(?:/|$)",
    r"^(?:.*/)?__pycache__(?:/|$)",
    r"^(?:.*/)?\.pytest_cache(?:/|$)",
    r"^(?:.*/)?\.venv(?:/|$)",
    r"^(?:.*/)?venv(?:/|$)",
    r"^(?:.*/)?target(?:/|$)",
    r"^(?:.*/)?\.DS_Store$",
    r"^(?:.*/)?\.env$",
    r"\.(?:pyc|pyo|pyd|so|dll|exe|bin|log|lock)$",
];

/// Include everything by default.
pub const DEFAULT_INCLUDE_PATTERNS: &[&str] = &["*"];

/// Whether a pattern string is treated as a raw regular expression.
pub fn is_raw_regex(pattern: &str) -> bool {
    pattern.starts_with('^') || pattern.contains('\\')
}

/// Translate a glob-like pattern into regex source.
pub fn glob_to_regex(glob: &str) -> String {
    let mut out = String::with_capacity(glob.len() * 2);
    let mut buf = [0u8; 4];
    for ch in glob.chars() {
        match ch {
            '*' => out.push_str(".*"),
            '?' => out.push('.'),
            other => out.push_str(&regex::escape(other.encode_utf8(&mut buf))),
        }
    }
    out
}

/// A compiled include or exclude pattern.
#[derive(Debug, Clone)]
pub struct Pattern {
    source: String,
    regex: Regex,
}

impl Pattern {
    /// Compile a pattern, failing on an invalid raw regex.
    pub fn compile(pattern: &str) -> Result<Self, ContextError> {
        let source = if is_raw_regex(pattern) {
            pattern.to_string()
        } else {
            glob_to_regex(pattern)
        };

        let regex = Regex::new(&source).map_err(|e| ContextError::InvalidPattern {
            pattern: pattern.to_string(),
            message: e.to_string(),
        })?;

        Ok(Self {
            source: pattern.to_string(),
            regex,
        })
    }

    /// The pattern as written.
    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Test a `/`-separated relative path.
    pub fn is_match(&self, path: &str) -> bool {
        self.regex.is_match(path)
    }
}

/// Compiled include and exclude predicates.
#[derive(Debug, Clone)]
pub struct PathFilter {
    include: Vec<Pattern>,
    exclude: Vec<Pattern>,
}

impl PathFilter {
    /// Compile include and exclude lists.
    ///
    /// An empty include list matches everything.
    pub fn new<S: AsRef<str>>(include: &[S], exclude: &[S]) -> Result<Self, ContextError> {
        let include = include
            .iter()
            .map(|p| Pattern::compile(p.as_ref()))
            .collect::<Result<Vec<_>, _>>()?;
        let exclude = exclude
            .iter()
            .map(|p| Pattern::compile(p.as_ref()))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { include, exclude })
    }

    /// Filter with the default include and exclude lists.
    pub fn with_defaults() -> Result<Self, ContextError> {
        Self::new(DEFAULT_INCLUDE_PATTERNS, DEFAULT_EXCLUDE_PATTERNS)
    }

    pub fn is_included(&self, path: &str) -> bool {
        self.include.is_empty() || self.include.iter().any(|p| p.is_match(path))
    }

    pub fn is_excluded(&self, path: &str) -> bool {
        self.exclude.iter().any(|p| p.is_match(path))
    }

    /// A path is kept iff it is included and not excluded.
    pub fn retains(&self, path: &str) -> bool {
        self.is_included(path) && !self.is_excluded(path)
    }
}
