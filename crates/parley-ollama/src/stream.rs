// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Streaming chat responses from the inference server.
//!
//! A background task reads the upstream body, frames it into lines, decodes
//! each line, and pushes [`StreamLine`]s into a bounded channel. The consumer
//! holds a [`RecordStream`]; dropping or closing it closes the channel, which
//! the task observes and answers by dropping the upstream response.

use std::ops::ControlFlow;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Duration;

use bytes::{BufMut, Bytes, BytesMut};
use futures::{Stream, StreamExt};
use parley_core::{LineBuffer, ParleyError, StreamRecord, decode_record};
use tokio::sync::mpsc;
use tracing::{debug, warn};

/// Capacity of the channel between the upstream reader and the consumer.
const RECORD_CHANNEL_CAPACITY: usize = 64;

/// One decoded record together with the exact line it was decoded from.
#[derive(Debug, Clone)]
pub struct StreamLine {
    /// The raw line including its trailing `\n`, ready to be re-emitted.
    pub raw: Bytes,
    pub record: StreamRecord,
}

/// Lazy sequence of stream records fed by a background reader task.
///
/// Ends after the first record with `done = true`, after an upstream error
/// record, or when the upstream connection closes.
pub struct RecordStream {
    rx: mpsc::Receiver<Result<StreamLine, ParleyError>>,
}

impl RecordStream {
    /// Starts reading `response` on a background task.
    pub(crate) fn spawn(response: reqwest::Response, idle_timeout: Duration) -> Self {
        let (tx, rx) = mpsc::channel(RECORD_CHANNEL_CAPACITY);
        tokio::spawn(pump(response, tx, idle_timeout));
        Self { rx }
    }

    /// Stops the stream and releases the upstream connection.
    ///
    /// Safe to call more than once.
    pub fn close(&mut self) {
        self.rx.close();
    }
}

impl Stream for RecordStream {
    type Item = Result<StreamLine, ParleyError>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.rx.poll_recv(cx)
    }
}

/// Reads the upstream body until a terminal record, end of body, an error,
/// or the consumer going away.
async fn pump(
    response: reqwest::Response,
    tx: mpsc::Sender<Result<StreamLine, ParleyError>>,
    idle_timeout: Duration,
) {
    let mut body = response.bytes_stream();
    let mut lines = LineBuffer::new();

    loop {
        let next = tokio::select! {
            _ = tx.closed() => {
                debug!("record stream dropped by consumer, releasing upstream connection");
                return;
            }
            next = tokio::time::timeout(idle_timeout, body.next()) => next,
        };

        match next {
            Err(_) => {
                warn!(timeout = ?idle_timeout, "upstream stream went idle");
                let _ = tx
                    .send(Err(ParleyError::UpstreamTimeout {
                        duration: idle_timeout,
                    }))
                    .await;
                return;
            }
            Ok(None) => {
                if let Some(rest) = lines.take_remainder() {
                    let _ = forward(&tx, rest).await;
                }
                debug!("upstream stream closed");
                return;
            }
            Ok(Some(Err(e))) => {
                warn!(error = %e, "upstream stream failed");
                let _ = tx
                    .send(Err(ParleyError::Upstream {
                        message: format!("stream interrupted: {e}"),
                        source: Some(Box::new(e)),
                    }))
                    .await;
                return;
            }
            Ok(Some(Ok(chunk))) => {
                lines.push(&chunk);
                while let Some(line) = lines.next_line() {
                    if forward(&tx, line).await.is_break() {
                        return;
                    }
                }
            }
        }
    }
}

/// Decodes one line and sends it on. Breaks on a terminal record or when
/// the consumer is gone; malformed lines are dropped.
async fn forward(
    tx: &mpsc::Sender<Result<StreamLine, ParleyError>>,
    line: Bytes,
) -> ControlFlow<()> {
    let record = match decode_record(&line) {
        None => return ControlFlow::Continue(()),
        Some(Err(e)) => {
            warn!(
                error = %e,
                line = %String::from_utf8_lossy(&line),
                "skipping malformed stream line"
            );
            return ControlFlow::Continue(());
        }
        Some(Ok(record)) => record,
    };

    let terminal = record.done || record.error.is_some();
    if terminal {
        debug!(
            done_reason = ?record.done_reason,
            eval_count = ?record.eval_count,
            error = ?record.error,
            "terminal stream record"
        );
    }

    let mut raw = BytesMut::with_capacity(line.len() + 1);
    raw.extend_from_slice(&line);
    raw.put_u8(b'\n');

    if tx
        .send(Ok(StreamLine {
            raw: raw.freeze(),
            record,
        }))
        .await
        .is_err()
        || terminal
    {
        ControlFlow::Break(())
    } else {
        ControlFlow::Continue(())
    }
}
