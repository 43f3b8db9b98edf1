// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Newline-delimited JSON framing.
//!
//! Streamed chat responses arrive as one JSON object per line, but transport
//! chunks can split anywhere, including inside a multi-byte UTF-8 sequence.
//! [`LineBuffer`] holds raw bytes until a full line is available so that no
//! partial record is ever decoded.

use bytes::{Bytes, BytesMut};

use crate::types::StreamRecord;

/// Accumulates transport chunks and yields complete lines.
#[derive(Debug, Default)]
pub struct LineBuffer {
    buf: BytesMut,
    /// Bytes at the front of `buf` already scanned without finding a newline.
    scanned: usize,
}

impl LineBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a transport chunk.
    pub fn push(&mut self, chunk: &[u8]) {
        self.buf.extend_from_slice(chunk);
    }

    /// Pops the next complete line without its terminator (`\n` or `\r\n`).
    ///
    /// Returns `None` when only a partial line (or nothing) is buffered.
    pub fn next_line(&mut self) -> Option<Bytes> {
        let offset = self.buf[self.scanned..].iter().position(|b| *b == b'\n');
        let Some(offset) = offset else {
            self.scanned = self.buf.len();
            return None;
        };

        let newline = self.scanned + offset;
        self.scanned = 0;

        let mut line = self.buf.split_to(newline + 1);
        line.truncate(newline);
        if line.last() == Some(&b'\r') {
            line.truncate(line.len() - 1);
        }
        Some(line.freeze())
    }

    /// Takes whatever is left once the byte stream has ended.
    ///
    /// A trailing line without a terminator is complete at end of stream.
    /// Whitespace-only leftovers are discarded.
    pub fn take_remainder(&mut self) -> Option<Bytes> {
        self.scanned = 0;
        let rest = self.buf.split().freeze();
        if rest.iter().all(u8::is_ascii_whitespace) {
            None
        } else {
            Some(rest)
        }
    }

    /// Number of buffered bytes that do not yet form a complete line.
    pub fn pending(&self) -> usize {
        self.buf.len()
    }

    /// Drops any buffered partial line.
    pub fn clear(&mut self) {
        self.buf.clear();
        self.scanned = 0;
    }
}

/// Decodes one line into a [`StreamRecord`].
///
/// Blank lines yield `None`; anything else is parsed as JSON.
pub fn decode_record(line: &[u8]) -> Option<Result<StreamRecord, serde_json::Error>> {
    if line.iter().all(u8::is_ascii_whitespace) {
        return None;
    }
    Some(serde_json::from_slice(line))
}
