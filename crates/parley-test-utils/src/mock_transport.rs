// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock relay transport for deterministic chat session tests.

use std::collections::VecDeque;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use futures::{StreamExt, stream};
use tokio::sync::Mutex;

use parley_core::wire::ChatRequest;
use parley_core::{ByteStream, ChatTransport, ParleyError};

/// A queued streaming reply.
enum MockStream {
    /// Fail before any byte is produced.
    Rejected(ParleyError),
    /// Yield the chunks, then optionally a transport error, then optionally
    /// never end.
    Chunks {
        chunks: Vec<Bytes>,
        failure: Option<ParleyError>,
        hang: bool,
    },
}

/// A [`ChatTransport`] answering from FIFO queues.
///
/// Every request is recorded. When a queue is empty the call fails with
/// [`ParleyError::Internal`].
#[derive(Clone, Default)]
pub struct MockTransport {
    completions: Arc<Mutex<VecDeque<Result<String, ParleyError>>>>,
    streams: Arc<Mutex<VecDeque<MockStream>>>,
    requests: Arc<Mutex<Vec<ChatRequest>>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a transport pre-loaded with whole-response replies.
    pub fn with_completions(replies: Vec<String>) -> Self {
        Self {
            completions: Arc::new(Mutex::new(replies.into_iter().map(Ok).collect())),
            ..Self::default()
        }
    }

    pub async fn push_completion(&self, text: impl Into<String>) {
        self.completions.lock().await.push_back(Ok(text.into()));
    }

    pub async fn push_completion_error(&self, err: ParleyError) {
        self.completions.lock().await.push_back(Err(err));
    }

    /// Queues a stream that yields `chunks` and ends cleanly.
    pub async fn push_stream(&self, chunks: Vec<Bytes>) {
        self.streams.lock().await.push_back(MockStream::Chunks {
            chunks,
            failure: None,
            hang: false,
        });
    }

    /// Queues a stream that yields `chunks` and then breaks with `err`.
    pub async fn push_stream_failure(&self, chunks: Vec<Bytes>, err: ParleyError) {
        self.streams.lock().await.push_back(MockStream::Chunks {
            chunks,
            failure: Some(err),
            hang: false,
        });
    }

    /// Queues a stream that yields `chunks` and then stays open forever.
    pub async fn push_stream_hanging(&self, chunks: Vec<Bytes>) {
        self.streams.lock().await.push_back(MockStream::Chunks {
            chunks,
            failure: None,
            hang: true,
        });
    }

    /// Queues a stream request that fails before streaming starts.
    pub async fn push_stream_rejection(&self, err: ParleyError) {
        self.streams.lock().await.push_back(MockStream::Rejected(err));
    }

    /// Requests received so far, oldest first.
    pub async fn requests(&self) -> Vec<ChatRequest> {
        self.requests.lock().await.clone()
    }
}

#[async_trait]
impl ChatTransport for MockTransport {
    async fn complete(&self, request: &ChatRequest) -> Result<String, ParleyError> {
        self.requests.lock().await.push(request.clone());
        self.completions
            .lock()
            .await
            .pop_front()
            .unwrap_or_else(|| Err(ParleyError::Internal("no mock completion queued".into())))
    }

    async fn stream(&self, request: &ChatRequest) -> Result<ByteStream, ParleyError> {
        self.requests.lock().await.push(request.clone());
        let next = self.streams.lock().await.pop_front();
        match next {
            None => Err(ParleyError::Internal("no mock stream queued".into())),
            Some(MockStream::Rejected(err)) => Err(err),
            Some(MockStream::Chunks {
                chunks,
                failure,
                hang,
            }) => {
                let head = stream::iter(chunks.into_iter().map(Ok));
                let tail = stream::iter(failure.map(Err));
                if hang {
                    Ok(Box::pin(head.chain(tail).chain(stream::pending())))
                } else {
                    Ok(Box::pin(head.chain(tail)))
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn completions_returned_in_order_then_error() {
        let transport = MockTransport::with_completions(vec!["first".into(), "second".into()]);
        let request = ChatRequest {
            message: "Hi".into(),
            ..Default::default()
        };
        assert_eq!(transport.complete(&request).await.unwrap(), "first");
        assert_eq!(transport.complete(&request).await.unwrap(), "second");
        assert!(transport.complete(&request).await.is_err());
        assert_eq!(transport.requests().await.len(), 3);
    }

    #[tokio::test]
    async fn stream_failure_comes_after_chunks() {
        let transport = MockTransport::new();
        transport
            .push_stream_failure(vec![Bytes::from_static(b"a")], ParleyError::upstream("reset"))
            .await;

        let items: Vec<_> = transport
            .stream(&ChatRequest::default())
            .await
            .unwrap()
            .collect()
            .await;
        assert_eq!(items.len(), 2);
        assert!(items[0].is_ok());
        assert!(items[1].is_err());
    }
}
