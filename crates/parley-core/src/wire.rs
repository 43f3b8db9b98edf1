// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! JSON bodies exchanged between the chat client and the relay endpoint.

use serde::{Deserialize, Serialize};

use crate::types::{Message, ModelInfo, Role, SettingsOverrides};

/// Request body for `POST /api/chat` and `POST /api/chat/stream`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChatRequest {
    /// The new user message.
    pub message: String,
    /// Caller overrides, merged onto the relay's defaults.
    #[serde(default)]
    pub settings: SettingsOverrides,
    /// Prior conversation turns, oldest first.
    #[serde(default)]
    pub history: Vec<HistoryEntry>,
}

/// One prior turn in [`ChatRequest::history`].
///
/// Extra fields sent by richer clients (ids, timestamps) are ignored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub role: Role,
    pub content: String,
}

impl From<&Message> for HistoryEntry {
    fn from(msg: &Message) -> Self {
        Self {
            role: msg.role,
            content: msg.content.clone(),
        }
    }
}

/// Response body for `POST /api/chat`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatResponse {
    pub response: String,
}

/// Structured error body returned by the relay before any stream bytes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

/// Response body for `GET /api/health`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    /// ISO 8601 timestamp.
    pub timestamp: String,
}

/// Response body for `GET /api/config`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigResponse {
    pub api_url: String,
    /// `"configured"` when the relay holds a default key, empty otherwise.
    pub api_key: String,
}

/// Response body for `GET /api/models`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelListResponse {
    pub models: Vec<ModelInfo>,
}

/// Response body for `GET /v1/models` (OpenAI-compatible).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenAiModelList {
    pub object: String,
    pub data: Vec<OpenAiModel>,
}

/// One entry of [`OpenAiModelList`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenAiModel {
    pub id: String,
    pub object: String,
    pub created: i64,
    pub owned_by: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chat_request_defaults_settings_and_history() {
        let req: ChatRequest = serde_json::from_str(r#"{"message":"Hi"}"#).unwrap();
        assert_eq!(req.message, "Hi");
        assert!(req.history.is_empty());
        assert!(req.settings.model.is_none());
    }

    #[test]
    fn history_ignores_extra_message_fields() {
        let json = r#"{
            "message": "next",
            "history": [
                {"id": "1", "role": "user", "content": "Hi", "timestamp": "2026-01-01T00:00:00Z"},
                {"id": "2", "role": "assistant", "content": "Hello"}
            ]
        }"#;
        let req: ChatRequest = serde_json::from_str(json).unwrap();
        assert_eq!(req.history.len(), 2);
        assert_eq!(req.history[1].role, Role::Assistant);
    }

    #[test]
    fn error_body_omits_missing_details() {
        let body = ErrorBody {
            error: "model not found".into(),
            details: None,
        };
        assert_eq!(
            serde_json::to_string(&body).unwrap(),
            r#"{"error":"model not found"}"#
        );
    }

    #[test]
    fn config_response_is_camel_case() {
        let body = ConfigResponse {
            api_url: "http://localhost:11434".into(),
            api_key: String::new(),
        };
        let json = serde_json::to_value(&body).unwrap();
        assert!(json.get("apiUrl").is_some());
        assert!(json.get("apiKey").is_some());
    }
}
