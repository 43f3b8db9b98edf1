// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Transport seam between the interactive client and the relay endpoint.

use std::pin::Pin;

use async_trait::async_trait;
use bytes::Bytes;
use futures_core::Stream;

use crate::error::ParleyError;
use crate::wire::ChatRequest;

/// Raw response body of a streaming chat call, chunked as it arrived.
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes, ParleyError>> + Send>>;

/// Sends chat requests to a relay endpoint.
///
/// The production implementation speaks HTTP; tests substitute a scripted
/// transport.
#[async_trait]
pub trait ChatTransport: Send + Sync {
    /// Sends a request and waits for the whole response text.
    async fn complete(&self, request: &ChatRequest) -> Result<String, ParleyError>;

    /// Sends a request and returns the raw NDJSON body as it streams in.
    ///
    /// Errors before the body starts are returned directly; failures after
    /// that surface as an `Err` item in the stream.
    async fn stream(&self, request: &ChatRequest) -> Result<ByteStream, ParleyError>;
}
