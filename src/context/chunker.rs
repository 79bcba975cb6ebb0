// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Fixed line-count chunking.

use crate::types::ContentChunk;

/// Default number of lines per chunk.
pub const DEFAULT_CHUNK_SIZE: usize = 500;

/// Split content into contiguous, non-overlapping chunks of `chunk_size` lines.
///
/// Lines are split on `\n` and re-joined with `\n`, so joining the chunk
/// texts with `\n` reproduces `content` exactly. Line numbers are 0-indexed
/// and inclusive; the last chunk holds the remainder. A `chunk_size` of zero
/// is treated as one.
pub fn chunk_content(content: &str, chunk_size: usize) -> Vec<ContentChunk> {
    let chunk_size = chunk_size.max(1);
    let lines: Vec<&str> = content.split('\n').collect();

    lines
        .chunks(chunk_size)
        .enumerate()
        .map(|(i, window)| {
            let start_line = i * chunk_size;
            ContentChunk {
                content: window.join("\n"),
                start_line,
                end_line: start_line + window.len() - 1,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn numbered(n: usize) -> String {
        (1..=n)
            .map(|i| format!("line {}", i))
            .collect::<Vec<_>>()
            .join("\n")
    }

    #[test]
    fn test_single_chunk() {
        let chunks = chunk_content("a\nb\nc", 500);
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].start_line, 0);
        assert_eq!(chunks[0].end_line, 2);
        assert_eq!(chunks[0].content, "a\nb\nc");
    }

    #[test]
    fn test_remainder_goes_to_last_chunk() {
        let content = numbered(1201);
        let chunks = chunk_content(&content, 500);
        assert_eq!(chunks.len(), 3);
        assert_eq!((chunks[0].start_line, chunks[0].end_line), (0, 499));
        assert_eq!((chunks[1].start_line, chunks[1].end_line), (500, 999));
        assert_eq!((chunks[2].start_line, chunks[2].end_line), (1000, 1200));
        assert_eq!(chunks[2].line_count(), 201);
    }

    #[test]
    fn test_empty_content() {
        let chunks = chunk_content("", 500);
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].content, "");
    }

    #[test]
    fn test_trailing_newline_preserved() {
        let content = "fn main() {}\n";
        let chunks = chunk_content(content, 1);
        assert_eq!(chunks.len(), 2);
        let joined: Vec<&str> = chunks.iter().map(|c| c.content.as_str()).collect();
        assert_eq!(joined.join("\n"), content);
    }

    #[test]
    fn test_zero_chunk_size() {
        let chunks = chunk_content("a\nb", 0);
        assert_eq!(chunks.len(), 2);
    }

    proptest! {
        #[test]
        fn prop_chunks_partition_lines(n in 1usize..2000, size in 1usize..700) {
            let content = numbered(n);
            let chunks = chunk_content(&content, size);

            prop_assert_eq!(chunks.len(), n.div_ceil(size));
            prop_assert_eq!(chunks[0].start_line, 0);
            prop_assert_eq!(chunks[chunks.len() - 1].end_line, n - 1);
            for pair in chunks.windows(2) {
                prop_assert_eq!(pair[1].start_line, pair[0].end_line + 1);
                prop_assert_eq!(pair[0].line_count(), size);
            }

            let texts: Vec<&str> = chunks.iter().map(|c| c.content.as_str()).collect();
            prop_assert_eq!(texts.join("\n"), content);
        }
    }
}
