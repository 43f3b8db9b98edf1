// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP relay between the Parley chat client and an Ollama-compatible
//! inference server.
//!
//! Provides health, config, model listing, whole-response chat, and
//! streaming chat endpoints. Streaming responses forward each upstream
//! NDJSON line verbatim.

pub mod error;
pub mod handlers;
pub mod server;
pub mod stream;

pub use error::ApiError;
pub use server::{RelayState, ServerConfig, build_router, serve, start_server};
