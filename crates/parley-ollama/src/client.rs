// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP client for the Ollama chat API.
//!
//! Provides [`OllamaClient`] which handles request construction, optional
//! bearer authentication, timeouts, and the mapping of upstream failures onto
//! the [`ParleyError`] taxonomy.

use std::time::Duration;

use parley_core::wire::HistoryEntry;
use parley_core::{GenerationSettings, ModelInfo, ParleyError};
use reqwest::StatusCode;
use reqwest::header::{HeaderMap, HeaderValue};
use tracing::{debug, warn};

use crate::stream::RecordStream;
use crate::types::{
    ChatRequestBody, ChatResponseBody, TagsResponse, UpstreamErrorBody, VersionResponse,
};

/// Deadlines applied to upstream calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timeouts {
    /// Whole-request deadline for health, listing, and non-streaming chat.
    pub request: Duration,
    /// Deadline for the first response byte of a streaming chat, and the
    /// longest silence tolerated between chunks afterwards.
    pub stream: Duration,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            request: Duration::from_secs(30),
            stream: Duration::from_secs(60),
        }
    }
}

/// Client for one inference server.
///
/// Cheap to construct; the relay builds one per request from the
/// caller-supplied URL and key so that no state is shared between callers.
#[derive(Debug, Clone)]
pub struct OllamaClient {
    client: reqwest::Client,
    base_url: String,
    timeouts: Timeouts,
}

impl OllamaClient {
    /// Creates a client for `api_url`, authenticating with `api_key` when it
    /// is non-empty.
    pub fn new(api_url: &str, api_key: Option<&str>, timeouts: Timeouts) -> Result<Self, ParleyError> {
        let mut headers = HeaderMap::new();
        headers.insert("content-type", HeaderValue::from_static("application/json"));
        if let Some(key) = api_key.map(str::trim).filter(|k| !k.is_empty()) {
            let mut value = HeaderValue::from_str(&format!("Bearer {key}")).map_err(|e| {
                ParleyError::Config(format!("invalid API key header value: {e}"))
            })?;
            value.set_sensitive(true);
            headers.insert("authorization", value);
        }

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .connect_timeout(timeouts.request)
            .build()
            .map_err(|e| ParleyError::Internal(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: api_url.trim().trim_end_matches('/').to_string(),
            timeouts,
        })
    }

    /// Creates a client from resolved generation settings.
    pub fn from_settings(settings: &GenerationSettings, timeouts: Timeouts) -> Result<Self, ParleyError> {
        Self::new(&settings.api_url, settings.api_key.as_deref(), timeouts)
    }

    /// Returns the inference server base URL.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    /// Returns true when the inference server answers its version endpoint.
    ///
    /// Never fails: any network or HTTP error yields `false`.
    pub async fn check_health(&self) -> bool {
        match self.version().await {
            Ok(version) => {
                debug!(url = %self.base_url, %version, "inference server reachable");
                true
            }
            Err(e) => {
                warn!(url = %self.base_url, error = %e, "inference server health check failed");
                false
            }
        }
    }

    /// Fetches the inference server version string.
    pub async fn version(&self) -> Result<String, ParleyError> {
        let response = self
            .client
            .get(self.url("/api/version"))
            .timeout(self.timeouts.request)
            .send()
            .await
            .map_err(|e| self.transport_error(e, self.timeouts.request))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ParleyError::upstream(format!(
                "version endpoint returned {status}"
            )));
        }

        let body: VersionResponse = response.json().await.map_err(|e| ParleyError::Protocol {
            message: format!("failed to parse version response: {e}"),
        })?;
        Ok(body.version)
    }

    /// Lists installed models.
    ///
    /// Fails with [`ParleyError::UpstreamUnavailable`] when the server cannot
    /// be reached and [`ParleyError::Protocol`] for any other failure. Never
    /// substitutes a fallback list.
    pub async fn list_models(&self) -> Result<Vec<ModelInfo>, ParleyError> {
        let response = self
            .client
            .get(self.url("/api/tags"))
            .timeout(self.timeouts.request)
            .send()
            .await
            .map_err(|e| match self.transport_error(e, self.timeouts.request) {
                ParleyError::Upstream { message, .. } => ParleyError::Protocol { message },
                other => other,
            })?;

        let status = response.status();
        debug!(status = %status, url = %self.base_url, "model listing response received");
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ParleyError::Protocol {
                message: format!("model listing returned {status}: {}", upstream_message(&body)),
            });
        }

        let body = response.text().await.map_err(|e| ParleyError::Protocol {
            message: format!("failed to read model listing: {e}"),
        })?;
        let tags: TagsResponse = serde_json::from_str(&body).map_err(|e| ParleyError::Protocol {
            message: format!("unexpected model listing schema: {e}"),
        })?;

        Ok(tags.models.into_iter().map(ModelInfo::from).collect())
    }

    /// Sends a non-streaming chat request and returns the assistant text.
    pub async fn complete_chat(
        &self,
        history: &[HistoryEntry],
        message: &str,
        settings: &GenerationSettings,
    ) -> Result<String, ParleyError> {
        let body = ChatRequestBody::build(settings, history, message, false);
        debug!(
            model = %body.model,
            messages = body.messages.len(),
            "sending chat completion request"
        );

        let response = self
            .client
            .post(self.url("/api/chat"))
            .timeout(self.timeouts.request)
            .json(&body)
            .send()
            .await
            .map_err(|e| self.transport_error(e, self.timeouts.request))?;

        let response = check_chat_status(response, &settings.model).await?;

        let text = response
            .text()
            .await
            .map_err(|e| self.transport_error(e, self.timeouts.request))?;
        let parsed: ChatResponseBody =
            serde_json::from_str(&text).map_err(|e| ParleyError::InvalidUpstreamResponse {
                message: format!("failed to parse chat response: {e}"),
            })?;

        match parsed.message {
            Some(message) => Ok(message.content),
            None => Err(ParleyError::InvalidUpstreamResponse {
                message: format!("response has no message field: {text}"),
            }),
        }
    }

    /// Sends a streaming chat request.
    ///
    /// Status errors are reported before any record is produced. Afterwards
    /// records arrive lazily through the returned [`RecordStream`].
    pub async fn stream_chat(
        &self,
        history: &[HistoryEntry],
        message: &str,
        settings: &GenerationSettings,
    ) -> Result<RecordStream, ParleyError> {
        let body = ChatRequestBody::build(settings, history, message, true);
        debug!(
            model = %body.model,
            messages = body.messages.len(),
            "sending streaming chat request"
        );

        let send = self.client.post(self.url("/api/chat")).json(&body).send();
        let response = match tokio::time::timeout(self.timeouts.stream, send).await {
            Err(_) => {
                return Err(ParleyError::UpstreamTimeout {
                    duration: self.timeouts.stream,
                });
            }
            Ok(result) => result.map_err(|e| self.transport_error(e, self.timeouts.stream))?,
        };

        let response = check_chat_status(response, &settings.model).await?;
        Ok(RecordStream::spawn(response, self.timeouts.stream))
    }

    /// Maps a reqwest transport failure onto the error taxonomy.
    fn transport_error(&self, e: reqwest::Error, deadline: Duration) -> ParleyError {
        if e.is_timeout() {
            ParleyError::UpstreamTimeout { duration: deadline }
        } else if e.is_connect() {
            ParleyError::UpstreamUnavailable {
                url: self.base_url.clone(),
            }
        } else {
            ParleyError::Upstream {
                message: format!("HTTP request failed: {e}"),
                source: Some(Box::new(e)),
            }
        }
    }
}

/// Passes successful responses through and maps chat status errors.
async fn check_chat_status(
    response: reqwest::Response,
    model: &str,
) -> Result<reqwest::Response, ParleyError> {
    let status = response.status();
    debug!(status = %status, "chat response received");
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let err = match status {
        StatusCode::NOT_FOUND => ParleyError::ModelNotFound {
            model: model.to_string(),
        },
        StatusCode::BAD_REQUEST => ParleyError::BadRequest {
            message: upstream_message(&body),
        },
        _ => ParleyError::upstream(format!(
            "inference server returned {status}: {}",
            upstream_message(&body)
        )),
    };
    warn!(status = %status, error = %err, "chat request rejected by upstream");
    Err(err)
}

/// Extracts `error` from an upstream JSON error body, falling back to the raw text.
fn upstream_message(body: &str) -> String {
    serde_json::from_str::<UpstreamErrorBody>(body)
        .map(|b| b.error)
        .unwrap_or_else(|_| body.trim().to_string())
}

#[cfg(test)]
mod tests {
    use futures::StreamExt;
    use parley_core::Role;
    use parley_test_utils::fixtures::content_line;
    use parley_test_utils::raw_upstream::{stalling_ndjson_server, truncating_ndjson_server};
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    fn test_client(base_url: &str) -> OllamaClient {
        OllamaClient::new(base_url, None, Timeouts::default()).unwrap()
    }

    fn settings() -> GenerationSettings {
        GenerationSettings {
            model: "llama2".into(),
            ..Default::default()
        }
    }

    /// Address that refuses connections: bind an ephemeral port, then free it.
    fn refused_url() -> String {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);
        format!("http://127.0.0.1:{port}")
    }

    #[tokio::test]
    async fn check_health_true_when_version_answers() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/version"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({"version": "0.5.7"})),
            )
            .mount(&server)
            .await;

        assert!(test_client(&server.uri()).check_health().await);
    }

    #[tokio::test]
    async fn check_health_false_on_http_error_and_refused_connection() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/version"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        assert!(!test_client(&server.uri()).check_health().await);
        assert!(!test_client(&refused_url()).check_health().await);
    }

    #[tokio::test]
    async fn list_models_normalizes_tags() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/tags"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "models": [
                    {"name": "llama2:latest", "size": 3825819519u64, "modified_at": "2024-05-01T10:00:00Z"},
                    {"name": "qwen3:8b", "size": 5200000000u64, "modified_at": "2025-04-29T08:00:00Z"}
                ]
            })))
            .mount(&server)
            .await;

        let models = test_client(&server.uri()).list_models().await.unwrap();
        assert_eq!(models.len(), 2);
        assert_eq!(models[0].name, "llama2:latest");
        assert_eq!(models[1].modified_at, "2025-04-29T08:00:00Z");
    }

    #[tokio::test]
    async fn list_models_unavailable_when_refused() {
        let err = test_client(&refused_url()).list_models().await.unwrap_err();
        assert!(
            matches!(err, ParleyError::UpstreamUnavailable { .. }),
            "got: {err:?}"
        );
    }

    #[tokio::test]
    async fn list_models_protocol_error_on_bad_schema_or_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/tags"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"tags": []})))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/tags"))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .mount(&server)
            .await;

        let client = test_client(&server.uri());
        let schema_err = client.list_models().await.unwrap_err();
        assert!(matches!(schema_err, ParleyError::Protocol { .. }), "got: {schema_err:?}");
        let status_err = client.list_models().await.unwrap_err();
        assert!(matches!(status_err, ParleyError::Protocol { .. }), "got: {status_err:?}");
    }

    #[tokio::test]
    async fn complete_chat_returns_message_content() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/chat"))
            .and(body_partial_json(serde_json::json!({
                "model": "llama2",
                "stream": false,
                "options": {"top_k": 40, "repeat_penalty": 1.1}
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "model": "llama2",
                "message": {"role": "assistant", "content": "Hello there"},
                "done": true
            })))
            .mount(&server)
            .await;

        let history = vec![HistoryEntry {
            role: Role::User,
            content: "earlier".into(),
        }];
        let reply = test_client(&server.uri())
            .complete_chat(&history, "Hi", &settings())
            .await
            .unwrap();
        assert_eq!(reply, "Hello there");
    }

    #[tokio::test]
    async fn complete_chat_maps_404_to_model_not_found() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/chat"))
            .respond_with(
                ResponseTemplate::new(404)
                    .set_body_json(serde_json::json!({"error": "model 'llama2' not found"})),
            )
            .mount(&server)
            .await;

        let err = test_client(&server.uri())
            .complete_chat(&[], "Hi", &settings())
            .await
            .unwrap_err();
        match err {
            ParleyError::ModelNotFound { model } => assert_eq!(model, "llama2"),
            other => panic!("expected ModelNotFound, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn complete_chat_maps_400_to_bad_request() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/chat"))
            .respond_with(
                ResponseTemplate::new(400)
                    .set_body_json(serde_json::json!({"error": "invalid options"})),
            )
            .mount(&server)
            .await;

        let err = test_client(&server.uri())
            .complete_chat(&[], "Hi", &settings())
            .await
            .unwrap_err();
        match err {
            ParleyError::BadRequest { message } => assert_eq!(message, "invalid options"),
            other => panic!("expected BadRequest, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn complete_chat_unavailable_when_refused() {
        let err = test_client(&refused_url())
            .complete_chat(&[], "Hi", &settings())
            .await
            .unwrap_err();
        assert!(
            matches!(err, ParleyError::UpstreamUnavailable { .. }),
            "got: {err:?}"
        );
    }

    #[tokio::test]
    async fn complete_chat_without_message_is_invalid_response() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/chat"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"done": true})))
            .mount(&server)
            .await;

        let err = test_client(&server.uri())
            .complete_chat(&[], "Hi", &settings())
            .await
            .unwrap_err();
        assert!(
            matches!(err, ParleyError::InvalidUpstreamResponse { .. }),
            "got: {err:?}"
        );
    }

    #[tokio::test]
    async fn complete_chat_wraps_other_statuses() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/chat"))
            .respond_with(ResponseTemplate::new(500).set_body_string("out of memory"))
            .mount(&server)
            .await;

        let err = test_client(&server.uri())
            .complete_chat(&[], "Hi", &settings())
            .await
            .unwrap_err();
        assert!(matches!(err, ParleyError::Upstream { .. }), "got: {err:?}");
        assert!(err.to_string().contains("out of memory"));
    }

    #[tokio::test]
    async fn complete_chat_times_out() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/chat"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_delay(Duration::from_millis(500))
                    .set_body_json(serde_json::json!({"message": {"content": "late"}})),
            )
            .mount(&server)
            .await;

        let timeouts = Timeouts {
            request: Duration::from_millis(100),
            stream: Duration::from_millis(100),
        };
        let client = OllamaClient::new(&server.uri(), None, timeouts).unwrap();
        let err = client.complete_chat(&[], "Hi", &settings()).await.unwrap_err();
        assert!(matches!(err, ParleyError::UpstreamTimeout { .. }), "got: {err:?}");
    }

    #[tokio::test]
    async fn sends_bearer_token_when_key_configured() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/tags"))
            .and(header("authorization", "Bearer sk-local"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"models": []})))
            .mount(&server)
            .await;

        let client = OllamaClient::new(&server.uri(), Some("sk-local"), Timeouts::default()).unwrap();
        let models = client.list_models().await.unwrap();
        assert!(models.is_empty());
    }

    #[tokio::test]
    async fn stream_chat_yields_records_until_done() {
        let server = MockServer::start().await;
        let body = concat!(
            "{\"message\":{\"role\":\"assistant\",\"thinking\":\"hmm\"},\"done\":false}\n",
            "{\"message\":{\"content\":\"He\"},\"done\":false}\n",
            "not json at all\n",
            "{\"message\":{\"content\":\"llo\"},\"done\":false}\n",
            "{\"message\":{\"content\":\"\"},\"done\":true,\"done_reason\":\"stop\"}\n",
            "{\"message\":{\"content\":\"after done\"},\"done\":false}\n",
        );
        Mock::given(method("POST"))
            .and(path("/api/chat"))
            .and(body_partial_json(serde_json::json!({"stream": true})))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "application/x-ndjson")
                    .set_body_string(body),
            )
            .mount(&server)
            .await;

        let stream = test_client(&server.uri())
            .stream_chat(&[], "Hi", &settings())
            .await
            .unwrap();
        let lines: Vec<_> = stream.collect().await;
        assert_eq!(lines.len(), 4, "malformed line skipped, stop after done");

        let lines: Vec<_> = lines.into_iter().map(Result::unwrap).collect();
        assert_eq!(lines[0].record.thinking(), Some("hmm"));
        let content: String = lines.iter().filter_map(|l| l.record.content()).collect();
        assert_eq!(content, "Hello");
        assert!(lines[3].record.done);
        assert_eq!(lines[3].record.done_reason.as_deref(), Some("stop"));
        assert_eq!(
            &lines[1].raw[..],
            b"{\"message\":{\"content\":\"He\"},\"done\":false}\n"
        );
    }

    #[tokio::test]
    async fn stream_chat_ends_when_connection_closes_without_done() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/chat"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string("{\"message\":{\"content\":\"partial\"},\"done\":false}"),
            )
            .mount(&server)
            .await;

        let stream = test_client(&server.uri())
            .stream_chat(&[], "Hi", &settings())
            .await
            .unwrap();
        let lines: Vec<_> = stream.collect().await;
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].as_ref().unwrap().record.content(), Some("partial"));
    }

    #[tokio::test]
    async fn stream_chat_times_out_when_upstream_goes_silent() {
        let url = stalling_ndjson_server(vec![content_line("He")]).await;
        let timeouts = Timeouts {
            request: Duration::from_secs(5),
            stream: Duration::from_millis(200),
        };

        let mut stream = OllamaClient::new(&url, None, timeouts)
            .unwrap()
            .stream_chat(&[], "Hi", &settings())
            .await
            .unwrap();

        let first = stream.next().await.unwrap().unwrap();
        assert_eq!(first.record.content(), Some("He"));
        match stream.next().await {
            Some(Err(ParleyError::UpstreamTimeout { duration })) => {
                assert_eq!(duration, Duration::from_millis(200));
            }
            other => panic!("expected idle timeout, got {other:?}"),
        }
        assert!(stream.next().await.is_none());
    }

    #[tokio::test]
    async fn stream_chat_reports_connection_cut_mid_body() {
        let url = truncating_ndjson_server(vec![content_line("He")]).await;

        let mut stream = test_client(&url)
            .stream_chat(&[], "Hi", &settings())
            .await
            .unwrap();

        let first = stream.next().await.unwrap().unwrap();
        assert_eq!(first.record.content(), Some("He"));
        assert!(matches!(
            stream.next().await,
            Some(Err(ParleyError::Upstream { .. }))
        ));
        assert!(stream.next().await.is_none());
    }

    #[tokio::test]
    async fn stream_chat_maps_status_before_streaming() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/chat"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let result = test_client(&server.uri())
            .stream_chat(&[], "Hi", &settings())
            .await;
        assert!(matches!(result, Err(ParleyError::ModelNotFound { .. })));
    }

    #[tokio::test]
    async fn stream_chat_close_is_idempotent() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/chat"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string("{\"message\":{\"content\":\"a\"},\"done\":false}\n"),
            )
            .mount(&server)
            .await;

        let mut stream = test_client(&server.uri())
            .stream_chat(&[], "Hi", &settings())
            .await
            .unwrap();
        stream.close();
        stream.close();
        // Records already queued may still drain; the stream then ends.
        while let Some(item) = stream.next().await {
            assert!(item.is_ok());
        }
    }
}
