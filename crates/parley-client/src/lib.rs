// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Chat client for the Parley relay.
//!
//! - [`reassembler`]: turns a streamed NDJSON body into a finished message
//! - [`store`]: conversations and the current-conversation pointer
//! - [`persistence`]: JSON file storage for the store and UI preferences
//! - [`relay`]: HTTP transport to the relay endpoint
//! - [`session`]: send orchestration over any [`parley_core::ChatTransport`]

pub mod persistence;
pub mod reassembler;
pub mod relay;
pub mod session;
pub mod store;

pub use persistence::{JsonFileStore, Preferences};
pub use reassembler::{StreamEvent, StreamOutcome, StreamReassembler, StreamState, reassemble};
pub use relay::RelayClient;
pub use session::{ChatSession, SendOutcome};
pub use store::{Conversation, ConversationStore};
