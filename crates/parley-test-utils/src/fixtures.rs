// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! NDJSON fixtures shaped like an Ollama `/api/chat` stream.

use bytes::Bytes;
use serde_json::json;

/// One content delta record, newline terminated.
pub fn content_line(content: &str) -> String {
    format!(
        "{}\n",
        json!({"model": "llama2", "message": {"role": "assistant", "content": content}, "done": false})
    )
}

/// One thinking delta record, newline terminated.
pub fn thinking_line(thinking: &str) -> String {
    format!(
        "{}\n",
        json!({"model": "llama2", "message": {"role": "assistant", "content": "", "thinking": thinking}, "done": false})
    )
}

/// The terminal record, newline terminated.
pub fn done_line() -> String {
    format!(
        "{}\n",
        json!({"model": "llama2", "message": {"role": "assistant", "content": ""}, "done": true, "done_reason": "stop"})
    )
}

/// An upstream error record, newline terminated.
pub fn error_line(message: &str) -> String {
    format!("{}\n", json!({"error": message}))
}

/// A complete stream body: one record per content piece, then `done`.
pub fn ndjson_body(pieces: &[&str]) -> String {
    let mut body: String = pieces.iter().map(|p| content_line(p)).collect();
    body.push_str(&done_line());
    body
}

/// Splits `body` at the given byte offsets. Offsets are clamped and sorted;
/// empty pieces are dropped.
pub fn split_at(body: &[u8], cuts: &[usize]) -> Vec<Bytes> {
    let mut cuts: Vec<usize> = cuts.iter().map(|c| (*c).min(body.len())).collect();
    cuts.sort_unstable();
    cuts.dedup();

    let mut chunks = Vec::with_capacity(cuts.len() + 1);
    let mut start = 0;
    for cut in cuts.into_iter().chain(std::iter::once(body.len())) {
        if cut > start {
            chunks.push(Bytes::copy_from_slice(&body[start..cut]));
        }
        start = cut;
    }
    chunks
}

/// Splits `body` into fixed-size chunks.
pub fn chunked(body: &[u8], size: usize) -> Vec<Bytes> {
    body.chunks(size.max(1)).map(Bytes::copy_from_slice).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn body_has_one_line_per_piece_plus_done() {
        let body = ndjson_body(&["He", "llo"]);
        assert_eq!(body.lines().count(), 3);
        assert!(body.ends_with('\n'));
    }

    #[test]
    fn split_preserves_bytes() {
        let body = ndjson_body(&["a"]);
        let chunks = split_at(body.as_bytes(), &[0, 5, 5, 1000]);
        let joined: Vec<u8> = chunks.iter().flat_map(|c| c.to_vec()).collect();
        assert_eq!(joined, body.as_bytes());
        assert_eq!(chunks.len(), 2);
    }
}
