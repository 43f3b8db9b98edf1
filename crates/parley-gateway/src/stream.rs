// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Verbatim NDJSON forwarding for `POST /api/chat/stream`.
//!
//! Each upstream line is written to the response body as soon as it is
//! decoded. Once the first byte is out no structured error is possible: an
//! upstream failure aborts the body, which the client observes as a broken
//! stream without a terminal record.

use std::time::Instant;

use axum::{
    body::Body,
    http::header,
    response::{IntoResponse, Response},
};
use bytes::Bytes;
use futures::{StreamExt, stream};
use parley_ollama::RecordStream;
use tracing::{debug, info, warn};

/// Content type of the streamed body.
pub const NDJSON_CONTENT_TYPE: &str = "application/x-ndjson; charset=utf-8";

struct Forwarding {
    records: RecordStream,
    lines: usize,
    started: Instant,
    finished: bool,
}

/// Wraps an upstream record stream into an unbuffered chunked response.
pub fn ndjson_response(records: RecordStream) -> Response {
    let state = Forwarding {
        records,
        lines: 0,
        started: Instant::now(),
        finished: false,
    };

    let body = stream::unfold(state, |mut state| async move {
        if state.finished {
            return None;
        }
        match state.records.next().await {
            Some(Ok(line)) => {
                state.lines += 1;
                Some((Ok::<Bytes, std::io::Error>(line.raw), state))
            }
            Some(Err(e)) => {
                warn!(
                    error = %e,
                    lines = state.lines,
                    "upstream failed mid-stream, aborting relay response"
                );
                state.finished = true;
                Some((Err(std::io::Error::other(e.to_string())), state))
            }
            None => {
                info!(
                    lines = state.lines,
                    elapsed_ms = state.started.elapsed().as_millis() as u64,
                    "relay stream completed"
                );
                None
            }
        }
    });

    debug!("relay stream started");
    (
        [
            (header::CONTENT_TYPE, NDJSON_CONTENT_TYPE),
            (header::CACHE_CONTROL, "no-cache"),
            (header::CONNECTION, "keep-alive"),
            (header::HeaderName::from_static("x-accel-buffering"), "no"),
        ],
        Body::from_stream(body),
    )
        .into_response()
}
