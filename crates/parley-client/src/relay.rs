// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP transport from the chat client to the relay endpoint.

use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use parley_core::wire::{
    ChatRequest, ChatResponse, ConfigResponse, ErrorBody, HealthResponse, ModelListResponse,
};
use parley_core::{ByteStream, ChatTransport, ModelInfo, ParleyError};
use serde::de::DeserializeOwned;
use tracing::debug;

/// Default deadline for non-streaming relay calls.
pub const DEFAULT_RELAY_TIMEOUT: Duration = Duration::from_secs(120);

/// Client for the relay's HTTP API.
#[derive(Debug, Clone)]
pub struct RelayClient {
    client: reqwest::Client,
    base_url: String,
    timeout: Duration,
}

impl RelayClient {
    pub fn new(base_url: &str) -> Result<Self, ParleyError> {
        Self::with_timeout(base_url, DEFAULT_RELAY_TIMEOUT)
    }

    /// Creates a client whose non-streaming calls give up after `timeout`.
    /// Streaming calls are bounded only while connecting.
    pub fn with_timeout(base_url: &str, timeout: Duration) -> Result<Self, ParleyError> {
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| ParleyError::Internal(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            base_url: base_url.trim().trim_end_matches('/').to_string(),
            timeout,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// GET /api/health
    pub async fn health(&self) -> Result<HealthResponse, ParleyError> {
        self.get_json("/api/health", &[]).await
    }

    /// GET /api/config
    pub async fn config(&self) -> Result<ConfigResponse, ParleyError> {
        self.get_json("/api/config", &[]).await
    }

    /// GET /api/models, optionally against another inference server.
    pub async fn list_models(
        &self,
        api_url: Option<&str>,
        api_key: Option<&str>,
    ) -> Result<Vec<ModelInfo>, ParleyError> {
        let mut query = Vec::new();
        if let Some(url) = api_url.filter(|u| !u.is_empty()) {
            query.push(("apiUrl", url));
        }
        if let Some(key) = api_key.filter(|k| !k.is_empty()) {
            query.push(("apiKey", key));
        }
        let body: ModelListResponse = self.get_json("/api/models", &query).await?;
        Ok(body.models)
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<T, ParleyError> {
        let mut url = reqwest::Url::parse(&format!("{}{path}", self.base_url))
            .map_err(|e| ParleyError::Config(format!("invalid relay URL {}: {e}", self.base_url)))?;
        if !query.is_empty() {
            url.query_pairs_mut().extend_pairs(query);
        }

        let response = self
            .client
            .get(url)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;
        let response = check_status(response).await?;
        response.json().await.map_err(|e| ParleyError::Protocol {
            message: format!("unexpected relay response from {path}: {e}"),
        })
    }

    fn transport_error(&self, e: reqwest::Error) -> ParleyError {
        if e.is_timeout() {
            ParleyError::UpstreamTimeout {
                duration: self.timeout,
            }
        } else if e.is_connect() {
            ParleyError::UpstreamUnavailable {
                url: self.base_url.clone(),
            }
        } else {
            ParleyError::Upstream {
                message: format!("relay request failed: {e}"),
                source: Some(Box::new(e)),
            }
        }
    }
}

/// Maps non-success relay responses to [`ParleyError::Relay`].
async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, ParleyError> {
    let status = response.status();
    debug!(status = %status, url = %response.url(), "relay response received");
    if status.is_success() {
        return Ok(response);
    }
    let text = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ErrorBody>(&text)
        .map(|b| b.error)
        .unwrap_or(text);
    Err(ParleyError::Relay {
        status: status.as_u16(),
        message,
    })
}

#[async_trait]
impl ChatTransport for RelayClient {
    async fn complete(&self, request: &ChatRequest) -> Result<String, ParleyError> {
        let response = self
            .client
            .post(format!("{}/api/chat", self.base_url))
            .timeout(self.timeout)
            .json(request)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;
        let response = check_status(response).await?;
        let body: ChatResponse = response.json().await.map_err(|e| ParleyError::Protocol {
            message: format!("unexpected chat response: {e}"),
        })?;
        Ok(body.response)
    }

    async fn stream(&self, request: &ChatRequest) -> Result<ByteStream, ParleyError> {
        let response = self
            .client
            .post(format!("{}/api/chat/stream", self.base_url))
            .json(request)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;
        let response = check_status(response).await?;

        let stream = response.bytes_stream().map(|chunk| {
            chunk.map_err(|e| ParleyError::Upstream {
                message: format!("relay stream interrupted: {e}"),
                source: Some(Box::new(e)),
            })
        });
        Ok(Box::pin(stream))
    }
}
