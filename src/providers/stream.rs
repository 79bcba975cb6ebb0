// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Incremental stream decoding shared by the provider clients.
//!
//! Chunked HTTP bodies split lines (and JSON objects, and UTF-8 sequences)
//! at arbitrary byte offsets. [`LineAssembler`] buffers raw bytes and only
//! yields complete lines. Lines that then fail to parse are dropped by the
//! callers rather than failing the stream.

use crate::types::{generate_id, AIResponse, OnChunk, TokenUsage};

/// Terminal payload of a Server-Sent-Events chat stream.
pub const SSE_DONE: &str = "[DONE]";

/// Longest unterminated line held back before it is dropped.
pub const MAX_LINE_BYTES: usize = 4 * 1024 * 1024;

/// Buffers raw bytes and yields complete `\n`-terminated lines.
///
/// A pending line that grows past the limit is dropped, together with the
/// rest of it up to the next newline.
#[derive(Debug)]
pub struct LineAssembler {
    buffer: Vec<u8>,
    /// Leading bytes of `buffer` already known to hold no newline.
    scanned: usize,
    /// Skipping the remainder of an oversized line.
    discarding: bool,
    limit: usize,
}

impl Default for LineAssembler {
    fn default() -> Self {
        Self::with_limit(MAX_LINE_BYTES)
    }
}

impl LineAssembler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Assembler that drops pending lines longer than `limit` bytes.
    pub fn with_limit(limit: usize) -> Self {
        Self {
            buffer: Vec::new(),
            scanned: 0,
            discarding: false,
            limit,
        }
    }

    /// Feed bytes, returning every line completed by them.
    ///
    /// Returned lines have the trailing `\r` stripped. Empty lines are
    /// returned too.
    pub fn push(&mut self, bytes: &[u8]) -> Vec<String> {
        let mut lines = Vec::new();

        let mut bytes = bytes;
        if self.discarding {
            match bytes.iter().position(|&b| b == b'\n') {
                Some(pos) => {
                    self.discarding = false;
                    bytes = &bytes[pos + 1..];
                }
                None => return lines,
            }
        }
        self.buffer.extend_from_slice(bytes);

        let mut consumed = 0;
        let mut from = self.scanned;
        while let Some(pos) = self.buffer[from..].iter().position(|&b| b == b'\n') {
            let end = from + pos;
            lines.push(decode_line(&self.buffer[consumed..end]));
            consumed = end + 1;
            from = consumed;
        }
        self.buffer.drain(..consumed);
        self.scanned = self.buffer.len();

        if self.buffer.len() > self.limit {
            tracing::warn!(
                bytes = self.buffer.len(),
                limit = self.limit,
                "Dropping oversized stream line"
            );
            self.buffer.clear();
            self.scanned = 0;
            self.discarding = true;
        }
        lines
    }

    /// Flush a final unterminated line, if any.
    pub fn finish(&mut self) -> Option<String> {
        self.discarding = false;
        self.scanned = 0;
        if self.buffer.is_empty() {
            return None;
        }
        let line = decode_line(&self.buffer);
        self.buffer.clear();
        Some(line)
    }

    /// Bytes held back waiting for a newline.
    pub fn pending(&self) -> usize {
        self.buffer.len()
    }
}

fn decode_line(bytes: &[u8]) -> String {
    let bytes = bytes.strip_suffix(b"\r").unwrap_or(bytes);
    String::from_utf8_lossy(bytes).into_owned()
}

/// Extract the payload of an SSE `data:` line.
pub fn sse_data(line: &str) -> Option<&str> {
    let data = line.trim_start().strip_prefix("data:")?;
    Some(data.strip_prefix(' ').unwrap_or(data).trim_end())
}

// ============================================================================
// Stream State
// ============================================================================

/// State accumulated while a response streams in.
pub(crate) struct StreamState {
    on_chunk: OnChunk,
    content: String,
    id: Option<String>,
    model: Option<String>,
    usage: Option<TokenUsage>,
    deltas: usize,
}

impl StreamState {
    pub fn new(on_chunk: OnChunk) -> Self {
        Self {
            on_chunk,
            content: String::new(),
            id: None,
            model: None,
            usage: None,
            deltas: 0,
        }
    }

    /// Append a text delta and forward it to the callback. Empty deltas are skipped.
    pub fn push_delta(&mut self, delta: &str) {
        if delta.is_empty() {
            return;
        }
        self.content.push_str(delta);
        self.deltas += 1;
        (self.on_chunk)(delta);
    }

    pub fn set_id(&mut self, id: Option<String>) {
        if id.is_some() {
            self.id = id;
        }
    }

    pub fn set_model(&mut self, model: Option<String>) {
        if model.is_some() {
            self.model = model;
        }
    }

    pub fn set_usage(&mut self, usage: Option<TokenUsage>) {
        if usage.is_some() {
            self.usage = usage;
        }
    }

    pub fn deltas(&self) -> usize {
        self.deltas
    }

    /// Build the final response, falling back to `id_prefix`-uuid and `model`.
    pub fn into_response(self, id_prefix: Option<&str>, model: &str) -> AIResponse {
        let id = self.id.unwrap_or_else(|| match id_prefix {
            Some(prefix) => format!("{}-{}", prefix, generate_id()),
            None => generate_id(),
        });
        let model = self.model.unwrap_or_else(|| model.to_string());
        AIResponse::new(id, self.content, model).with_usage(self.usage)
    }
}
