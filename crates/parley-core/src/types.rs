// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Common types shared by the inference client, relay, and chat client.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Default inference server address.
pub const DEFAULT_API_URL: &str = "http://localhost:11434";

/// Default model when none is configured.
pub const DEFAULT_MODEL: &str = "llama2";

/// Default system prompt sent ahead of the conversation history.
pub const DEFAULT_SYSTEM_PROMPT: &str =
    "You are a helpful AI assistant. Answer the user's questions clearly and concisely.";

/// Author of a message in a conversation.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// A single finalized chat message.
///
/// `content` only ever holds fully decoded text. `thinking` is the optional
/// reasoning trace some models emit next to the answer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: String,
    pub role: Role,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thinking: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl Message {
    /// Creates a message stamped with a fresh id and the current time.
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            role,
            content: content.into(),
            thinking: None,
            timestamp: Utc::now(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }

    /// Attaches a thinking trace, dropping it when empty.
    pub fn with_thinking(mut self, thinking: Option<String>) -> Self {
        self.thinking = thinking.filter(|t| !t.is_empty());
        self
    }
}

/// Request-scoped generation parameters.
///
/// Numeric values are forwarded to the inference server as-is; range
/// validation is left to the upstream.
#[derive(Clone, PartialEq)]
pub struct GenerationSettings {
    pub model: String,
    pub temperature: f64,
    pub top_p: f64,
    pub top_k: u32,
    /// Used for both the generation limit and the context window.
    pub max_tokens: u32,
    pub system_prompt: String,
    pub api_url: String,
    pub api_key: Option<String>,
}

impl Default for GenerationSettings {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            temperature: 0.7,
            top_p: 0.9,
            top_k: 40,
            max_tokens: 2048,
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
            api_url: DEFAULT_API_URL.to_string(),
            api_key: None,
        }
    }
}

impl std::fmt::Debug for GenerationSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GenerationSettings")
            .field("model", &self.model)
            .field("temperature", &self.temperature)
            .field("top_p", &self.top_p)
            .field("top_k", &self.top_k)
            .field("max_tokens", &self.max_tokens)
            .field("system_prompt", &self.system_prompt)
            .field("api_url", &self.api_url)
            .field("api_key", &self.api_key.as_ref().map(|_| "[redacted]"))
            .finish()
    }
}

impl GenerationSettings {
    /// Merges caller-supplied overrides on top of these defaults.
    ///
    /// This is the only place defaults are applied: a field that is absent,
    /// or an empty string, keeps the default value. The default API key only
    /// follows the default API URL; any other server gets the caller's key
    /// or none.
    pub fn resolve(&self, overrides: &SettingsOverrides) -> GenerationSettings {
        fn text(value: &Option<String>, fallback: &str) -> String {
            match value.as_deref().map(str::trim) {
                Some(v) if !v.is_empty() => v.to_string(),
                _ => fallback.to_string(),
            }
        }

        let api_url = text(&overrides.api_url, &self.api_url);
        let api_key = match overrides.api_key.as_deref().map(str::trim) {
            Some(k) if !k.is_empty() => Some(k.to_string()),
            _ if same_server(&api_url, &self.api_url) => self.api_key.clone(),
            _ => None,
        };

        GenerationSettings {
            model: text(&overrides.model, &self.model),
            temperature: overrides.temperature.unwrap_or(self.temperature),
            top_p: overrides.top_p.unwrap_or(self.top_p),
            top_k: overrides.top_k.unwrap_or(self.top_k),
            max_tokens: overrides.max_tokens.unwrap_or(self.max_tokens),
            system_prompt: text(&overrides.system_prompt, &self.system_prompt),
            api_url,
            api_key,
        }
    }

    /// Returns the settings as an override set with every field populated.
    pub fn to_overrides(&self) -> SettingsOverrides {
        SettingsOverrides {
            model: Some(self.model.clone()),
            temperature: Some(self.temperature),
            top_p: Some(self.top_p),
            top_k: Some(self.top_k),
            max_tokens: Some(self.max_tokens),
            system_prompt: Some(self.system_prompt.clone()),
            api_url: Some(self.api_url.clone()),
            api_key: self.api_key.clone(),
        }
    }
}

/// Compares two base URLs, ignoring surrounding whitespace and trailing `/`.
fn same_server(a: &str, b: &str) -> bool {
    a.trim().trim_end_matches('/') == b.trim().trim_end_matches('/')
}

/// Partial generation settings as sent by a caller over the wire.
#[derive(Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingsOverrides {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top_k: Option<u32>,
    #[serde(default, alias = "contextWindow", skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_prompt: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
}

impl std::fmt::Debug for SettingsOverrides {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SettingsOverrides")
            .field("model", &self.model)
            .field("temperature", &self.temperature)
            .field("top_p", &self.top_p)
            .field("top_k", &self.top_k)
            .field("max_tokens", &self.max_tokens)
            .field("api_url", &self.api_url)
            .field("api_key", &self.api_key.as_ref().map(|_| "[redacted]"))
            .finish_non_exhaustive()
    }
}

/// A model installed on the inference server, in normalized shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelInfo {
    pub name: String,
    pub size: u64,
    pub modified_at: String,
}

/// One decoded line of a streamed chat response.
///
/// Unknown upstream fields (timings, token counts we do not track) are ignored.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StreamRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<RecordDelta>,
    #[serde(default)]
    pub done: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub done_reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub eval_count: Option<u64>,
    /// Set when the inference server aborts generation mid-stream.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl StreamRecord {
    /// Content delta carried by this record, if any.
    pub fn content(&self) -> Option<&str> {
        self.message.as_ref().and_then(|m| m.content.as_deref())
    }

    /// Thinking delta carried by this record, if any.
    pub fn thinking(&self) -> Option<&str> {
        self.message.as_ref().and_then(|m| m.thinking.as_deref())
    }
}

/// The `message` object inside a [`StreamRecord`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RecordDelta {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thinking: Option<String>,
}
