// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the Parley chat client and relay.

use std::time::Duration;

use strum::{Display, EnumString};
use thiserror::Error;

/// The primary error type used across every Parley crate.
///
/// The first seven variants form the upstream taxonomy surfaced by the
/// inference client; the relay maps each of them to an HTTP status.
#[derive(Debug, Error)]
pub enum ParleyError {
    /// The inference server could not be reached (connection refused, DNS failure).
    #[error("inference server unavailable at {url}")]
    UpstreamUnavailable { url: String },

    /// The upstream answered 404 for the requested model.
    #[error("model '{model}' not found, make sure it has been pulled")]
    ModelNotFound { model: String },

    /// The upstream rejected the generation parameters with a 400.
    #[error("bad request: {message}")]
    BadRequest { message: String },

    /// The upstream answered successfully but without the expected fields.
    #[error("invalid upstream response: {message}")]
    InvalidUpstreamResponse { message: String },

    /// The upstream call exceeded its deadline.
    #[error("upstream timed out after {duration:?}")]
    UpstreamTimeout { duration: Duration },

    /// The upstream returned a payload with an unexpected schema.
    #[error("protocol error: {message}")]
    Protocol { message: String },

    /// Catch-all for any other upstream failure, wrapping the original message.
    #[error("upstream error: {message}")]
    Upstream {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// A conversation id did not match any conversation in the store.
    #[error("conversation not found: {id}")]
    NotFound { id: String },

    /// A send was attempted while another one is still in flight for the
    /// same conversation.
    #[error("a response is already streaming into conversation {id}")]
    StreamInFlight { id: String },

    /// The relay endpoint answered with a non-success status.
    #[error("relay returned {status}: {message}")]
    Relay { status: u16, message: String },

    /// Configuration errors (invalid URL, missing field).
    #[error("configuration error: {0}")]
    Config(String),

    /// Local persistence errors (file I/O, serialization).
    #[error("storage error: {source}")]
    Storage {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

/// Discriminant of [`ParleyError`] without its payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString)]
#[strum(serialize_all = "snake_case")]
pub enum ErrorKind {
    UpstreamUnavailable,
    ModelNotFound,
    BadRequest,
    InvalidUpstreamResponse,
    UpstreamTimeout,
    Protocol,
    Upstream,
    NotFound,
    StreamInFlight,
    Relay,
    Config,
    Storage,
    Internal,
}

impl ParleyError {
    /// Returns the payload-free kind of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            ParleyError::UpstreamUnavailable { .. } => ErrorKind::UpstreamUnavailable,
            ParleyError::ModelNotFound { .. } => ErrorKind::ModelNotFound,
            ParleyError::BadRequest { .. } => ErrorKind::BadRequest,
            ParleyError::InvalidUpstreamResponse { .. } => ErrorKind::InvalidUpstreamResponse,
            ParleyError::UpstreamTimeout { .. } => ErrorKind::UpstreamTimeout,
            ParleyError::Protocol { .. } => ErrorKind::Protocol,
            ParleyError::Upstream { .. } => ErrorKind::Upstream,
            ParleyError::NotFound { .. } => ErrorKind::NotFound,
            ParleyError::StreamInFlight { .. } => ErrorKind::StreamInFlight,
            ParleyError::Relay { .. } => ErrorKind::Relay,
            ParleyError::Config(_) => ErrorKind::Config,
            ParleyError::Storage { .. } => ErrorKind::Storage,
            ParleyError::Internal(_) => ErrorKind::Internal,
        }
    }

    /// Shorthand for an [`ParleyError::Upstream`] without a source.
    pub fn upstream(message: impl Into<String>) -> Self {
        ParleyError::Upstream {
            message: message.into(),
            source: None,
        }
    }

    /// Wraps any error as a storage failure.
    pub fn storage(source: impl std::error::Error + Send + Sync + 'static) -> Self {
        ParleyError::Storage {
            source: Box::new(source),
        }
    }
}
