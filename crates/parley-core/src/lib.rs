// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for Parley, a chat client for locally hosted LLM servers.
//!
//! Holds the conversation data model, the error taxonomy shared by every
//! crate, NDJSON framing for streamed responses, the relay wire types, and
//! the [`ChatTransport`] seam used by the interactive client.

pub mod error;
pub mod framing;
pub mod traits;
pub mod types;
pub mod wire;

// Re-export key items at crate root for ergonomic imports.
pub use error::{ErrorKind, ParleyError};
pub use framing::{LineBuffer, decode_record};
pub use traits::{ByteStream, ChatTransport};
pub use types::{
    GenerationSettings, Message, ModelInfo, RecordDelta, Role, SettingsOverrides, StreamRecord,
};
