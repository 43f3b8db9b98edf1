// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Client-side reassembly of a streamed chat response.
//!
//! [`StreamReassembler`] is the synchronous state machine
//! (`Idle -> Streaming -> Completed | Failed`, plus `Cancelled`): it buffers
//! transport chunks into whole lines, decodes each line, and folds content
//! and thinking deltas into two accumulators in arrival order.
//! [`reassemble`] drives it from a [`ByteStream`] and honours cancellation.

use std::fmt;

use futures::StreamExt;
use parley_core::{ByteStream, LineBuffer, Message, ParleyError, decode_record};
use strum::Display;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Lifecycle of one streamed response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "snake_case")]
pub enum StreamState {
    Idle,
    Streaming,
    Completed,
    Failed,
    Cancelled,
}

impl StreamState {
    /// Returns true once no further input will be accepted.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            StreamState::Completed | StreamState::Failed | StreamState::Cancelled
        )
    }
}

/// A delta surfaced to the caller as soon as it is decoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamEvent<'a> {
    Content(&'a str),
    Thinking(&'a str),
}

/// Result of feeding one chunk.
#[derive(Debug, Clone, PartialEq)]
pub enum Feed {
    /// More input is expected.
    Pending,
    /// A `done` record arrived; the finalized message.
    Completed(Message),
}

/// How a driven stream ended.
#[derive(Debug)]
pub enum StreamOutcome {
    Completed(Message),
    Failed(ParleyError),
    Cancelled,
}

/// Per-stream accumulator state machine.
pub struct StreamReassembler {
    state: StreamState,
    lines: LineBuffer,
    content: String,
    thinking: String,
    records: usize,
    skipped: usize,
}

impl Default for StreamReassembler {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for StreamReassembler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StreamReassembler")
            .field("state", &self.state)
            .field("content_len", &self.content.len())
            .field("thinking_len", &self.thinking.len())
            .field("records", &self.records)
            .field("skipped", &self.skipped)
            .finish()
    }
}

impl StreamReassembler {
    pub fn new() -> Self {
        Self {
            state: StreamState::Idle,
            lines: LineBuffer::new(),
            content: String::new(),
            thinking: String::new(),
            records: 0,
            skipped: 0,
        }
    }

    pub fn state(&self) -> StreamState {
        self.state
    }

    /// Content accumulated so far.
    pub fn content(&self) -> &str {
        &self.content
    }

    /// Thinking accumulated so far, if any arrived.
    pub fn thinking(&self) -> Option<&str> {
        (!self.thinking.is_empty()).then_some(self.thinking.as_str())
    }

    /// Number of malformed lines dropped.
    pub fn skipped(&self) -> usize {
        self.skipped
    }

    /// Enters `Streaming`, clearing both accumulators and any buffered bytes.
    pub fn begin(&mut self) {
        self.lines.clear();
        self.content.clear();
        self.thinking.clear();
        self.records = 0;
        self.skipped = 0;
        self.transition(StreamState::Streaming);
    }

    /// Folds one transport chunk.
    ///
    /// Only complete lines are decoded. Bytes after a `done` record are
    /// ignored. An upstream `error` record fails the stream.
    pub fn feed(
        &mut self,
        chunk: &[u8],
        on_event: &mut dyn FnMut(StreamEvent<'_>),
    ) -> Result<Feed, ParleyError> {
        self.expect_streaming()?;
        self.lines.push(chunk);
        while let Some(line) = self.lines.next_line() {
            if let Some(message) = self.apply_line(&line, on_event)? {
                return Ok(Feed::Completed(message));
            }
        }
        Ok(Feed::Pending)
    }

    /// Handles a clean end of the byte stream.
    ///
    /// A trailing unterminated line is decoded first; the accumulators are
    /// then frozen into the final message even without a `done` record.
    pub fn finish(
        &mut self,
        on_event: &mut dyn FnMut(StreamEvent<'_>),
    ) -> Result<Message, ParleyError> {
        self.expect_streaming()?;
        if let Some(rest) = self.lines.take_remainder()
            && let Some(message) = self.apply_line(&rest, on_event)?
        {
            return Ok(message);
        }
        debug!(records = self.records, "stream ended without done record");
        Ok(self.complete())
    }

    /// Enters `Failed`, discarding both accumulators. Returns `err` for
    /// convenient propagation.
    pub fn fail(&mut self, err: ParleyError) -> ParleyError {
        if !self.state.is_terminal() {
            warn!(error = %err, records = self.records, "stream failed");
            self.discard();
            self.transition(StreamState::Failed);
        }
        err
    }

    /// Abandons the stream. Returns false when it had already ended, which
    /// makes repeated calls no-ops.
    pub fn cancel(&mut self) -> bool {
        if self.state.is_terminal() {
            return false;
        }
        self.discard();
        self.transition(StreamState::Cancelled);
        true
    }

    fn apply_line(
        &mut self,
        line: &[u8],
        on_event: &mut dyn FnMut(StreamEvent<'_>),
    ) -> Result<Option<Message>, ParleyError> {
        let record = match decode_record(line) {
            None => return Ok(None),
            Some(Err(e)) => {
                self.skipped += 1;
                warn!(error = %e, "skipping malformed stream line");
                return Ok(None);
            }
            Some(Ok(record)) => record,
        };
        self.records += 1;

        if let Some(thinking) = record.thinking().filter(|t| !t.is_empty()) {
            self.thinking.push_str(thinking);
            on_event(StreamEvent::Thinking(thinking));
        }
        if let Some(content) = record.content().filter(|c| !c.is_empty()) {
            self.content.push_str(content);
            on_event(StreamEvent::Content(content));
        }

        if let Some(error) = record.error {
            return Err(self.fail(ParleyError::upstream(error)));
        }
        if record.done {
            return Ok(Some(self.complete()));
        }
        Ok(None)
    }

    fn complete(&mut self) -> Message {
        self.lines.clear();
        self.transition(StreamState::Completed);
        let content = std::mem::take(&mut self.content);
        let thinking = std::mem::take(&mut self.thinking);
        Message::assistant(content).with_thinking(Some(thinking))
    }

    fn discard(&mut self) {
        self.lines.clear();
        self.content.clear();
        self.thinking.clear();
    }

    fn expect_streaming(&self) -> Result<(), ParleyError> {
        if self.state == StreamState::Streaming {
            Ok(())
        } else {
            Err(ParleyError::Internal(format!(
                "stream input received in state {}",
                self.state
            )))
        }
    }

    fn transition(&mut self, next: StreamState) {
        debug!(from = %self.state, to = %next, "stream state transition");
        self.state = next;
    }
}

/// Consumes `stream` until completion, failure, or cancellation.
///
/// `on_event` sees every delta in arrival order. When `cancel` fires the
/// stream is dropped at once, which releases the underlying connection.
pub async fn reassemble(
    mut stream: ByteStream,
    cancel: &CancellationToken,
    mut on_event: impl FnMut(StreamEvent<'_>),
) -> StreamOutcome {
    let mut reassembler = StreamReassembler::new();
    reassembler.begin();

    loop {
        let next = tokio::select! {
            biased;
            _ = cancel.cancelled() => None,
            next = stream.next() => Some(next),
        };

        let Some(next) = next else {
            reassembler.cancel();
            drop(stream);
            return StreamOutcome::Cancelled;
        };

        match next {
            Some(Ok(chunk)) => match reassembler.feed(&chunk, &mut on_event) {
                Ok(Feed::Pending) => {}
                Ok(Feed::Completed(message)) => return StreamOutcome::Completed(message),
                Err(e) => return StreamOutcome::Failed(e),
            },
            Some(Err(e)) => return StreamOutcome::Failed(reassembler.fail(e)),
            None => {
                return match reassembler.finish(&mut on_event) {
                    Ok(message) => StreamOutcome::Completed(message),
                    Err(e) => StreamOutcome::Failed(e),
                };
            }
        }
    }
}
