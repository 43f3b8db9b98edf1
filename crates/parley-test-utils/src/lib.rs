// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for Parley tests.
//!
//! - [`MockTransport`] - [`parley_core::ChatTransport`] with queued replies
//! - [`fixtures`] - NDJSON stream bodies and chunk splitting
//! - [`raw_upstream`] - upstreams that cut off or stall a chunked stream

pub mod fixtures;
pub mod mock_transport;
pub mod raw_upstream;

pub use mock_transport::MockTransport;
