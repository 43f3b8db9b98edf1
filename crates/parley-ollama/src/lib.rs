// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Client for Ollama-compatible inference servers.
//!
//! Talks to `/api/version`, `/api/tags`, and `/api/chat`, maps failures onto
//! [`parley_core::ParleyError`], and exposes streamed chat responses as a
//! [`RecordStream`] of decoded records.

pub mod client;
pub mod stream;
pub mod types;

pub use client::{OllamaClient, Timeouts};
pub use stream::{RecordStream, StreamLine};
