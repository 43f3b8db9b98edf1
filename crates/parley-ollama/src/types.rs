// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Request and response types for the Ollama HTTP API.

use parley_core::{GenerationSettings, ModelInfo};
use parley_core::wire::HistoryEntry;
use serde::{Deserialize, Serialize};

/// Repeat penalty sent with every generation request.
pub const REPEAT_PENALTY: f64 = 1.1;

/// Body of `POST /api/chat`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatRequestBody {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub stream: bool,
    pub options: GenerationOptions,
}

impl ChatRequestBody {
    /// Builds the upstream request: system prompt (if any), prior history,
    /// then the new user message.
    pub fn build(
        settings: &GenerationSettings,
        history: &[HistoryEntry],
        message: &str,
        stream: bool,
    ) -> Self {
        let mut messages = Vec::with_capacity(history.len() + 2);
        if !settings.system_prompt.is_empty() {
            messages.push(ChatMessage {
                role: "system".to_string(),
                content: settings.system_prompt.clone(),
            });
        }
        messages.extend(history.iter().map(|entry| ChatMessage {
            role: entry.role.to_string(),
            content: entry.content.clone(),
        }));
        messages.push(ChatMessage {
            role: "user".to_string(),
            content: message.to_string(),
        });

        Self {
            model: settings.model.clone(),
            messages,
            stream,
            options: GenerationOptions {
                temperature: settings.temperature,
                num_predict: settings.max_tokens,
                num_ctx: settings.max_tokens,
                top_p: settings.top_p,
                top_k: settings.top_k,
                repeat_penalty: REPEAT_PENALTY,
            },
        }
    }
}

/// A message in the upstream chat format.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

/// Sampling options understood by the inference server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationOptions {
    pub temperature: f64,
    pub num_predict: u32,
    pub num_ctx: u32,
    pub top_p: f64,
    pub top_k: u32,
    pub repeat_penalty: f64,
}

/// Non-streaming chat response. Only the fields we read are modelled.
#[derive(Debug, Clone, Deserialize)]
pub struct ChatResponseBody {
    #[serde(default)]
    pub message: Option<ResponseMessage>,
}

/// The assistant message inside [`ChatResponseBody`].
#[derive(Debug, Clone, Deserialize)]
pub struct ResponseMessage {
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub thinking: Option<String>,
}

/// Response of `GET /api/tags`.
#[derive(Debug, Clone, Deserialize)]
pub struct TagsResponse {
    pub models: Vec<TagModel>,
}

/// One installed model as reported by `GET /api/tags`.
#[derive(Debug, Clone, Deserialize)]
pub struct TagModel {
    pub name: String,
    #[serde(default)]
    pub size: u64,
    #[serde(default)]
    pub modified_at: String,
}

impl From<TagModel> for ModelInfo {
    fn from(model: TagModel) -> Self {
        ModelInfo {
            name: model.name,
            size: model.size,
            modified_at: model.modified_at,
        }
    }
}

/// Response of `GET /api/version`.
#[derive(Debug, Clone, Deserialize)]
pub struct VersionResponse {
    pub version: String,
}

/// Error body the inference server returns on failure.
#[derive(Debug, Clone, Deserialize)]
pub struct UpstreamErrorBody {
    pub error: String,
}
