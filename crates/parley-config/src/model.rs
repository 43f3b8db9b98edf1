// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs.
//!
//! All structs use `#[serde(deny_unknown_fields)]` so a mistyped key is
//! reported at startup instead of being silently ignored.

use std::path::PathBuf;
use std::time::Duration;

use parley_core::GenerationSettings;
use parley_core::types::{DEFAULT_API_URL, DEFAULT_MODEL, DEFAULT_SYSTEM_PROMPT};
use serde::{Deserialize, Serialize};

/// Top-level Parley configuration.
///
/// Every section is optional and falls back to its defaults.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ParleyConfig {
    /// Relay listener settings.
    #[serde(default)]
    pub server: ServerConfig,

    /// Default inference server.
    #[serde(default)]
    pub ollama: OllamaConfig,

    /// Default generation parameters.
    #[serde(default)]
    pub generation: GenerationConfig,

    /// Chat client settings.
    #[serde(default)]
    pub client: ClientConfig,
}

impl ParleyConfig {
    /// Builds the default generation settings, including upstream URL and key.
    pub fn generation_settings(&self) -> GenerationSettings {
        GenerationSettings {
            model: self.generation.model.clone(),
            temperature: self.generation.temperature,
            top_p: self.generation.top_p,
            top_k: self.generation.top_k,
            max_tokens: self.generation.max_tokens,
            system_prompt: self.generation.system_prompt.clone(),
            api_url: self.ollama.api_url.clone(),
            api_key: self.ollama.api_key.clone().filter(|k| !k.trim().is_empty()),
        }
    }

    /// Renders the effective configuration as TOML with the API key masked.
    pub fn to_redacted_toml(&self) -> Result<String, toml::ser::Error> {
        let mut shown = self.clone();
        if shown.ollama.api_key.is_some() {
            shown.ollama.api_key = Some("[redacted]".to_string());
        }
        toml::to_string_pretty(&shown)
    }
}

/// Relay listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    /// Address to bind.
    #[serde(default = "default_host")]
    pub host: String,

    /// TCP port to bind.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            log_level: default_log_level(),
        }
    }
}

impl ServerConfig {
    /// `host:port` string suitable for binding.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3001
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Inference server configuration.
#[derive(Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct OllamaConfig {
    /// Base URL of the inference server.
    #[serde(default = "default_api_url")]
    pub api_url: String,

    /// Bearer token sent to the inference server, if any.
    #[serde(default)]
    pub api_key: Option<String>,

    /// Deadline for health checks, model listing, and non-streaming chat.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Deadline for the first streamed byte and between streamed chunks.
    #[serde(default = "default_stream_timeout_secs")]
    pub stream_timeout_secs: u64,
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            api_key: None,
            request_timeout_secs: default_request_timeout_secs(),
            stream_timeout_secs: default_stream_timeout_secs(),
        }
    }
}

impl std::fmt::Debug for OllamaConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OllamaConfig")
            .field("api_url", &self.api_url)
            .field("api_key", &self.api_key.as_ref().map(|_| "[redacted]"))
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("stream_timeout_secs", &self.stream_timeout_secs)
            .finish()
    }
}

impl OllamaConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn stream_timeout(&self) -> Duration {
        Duration::from_secs(self.stream_timeout_secs)
    }
}

fn default_api_url() -> String {
    DEFAULT_API_URL.to_string()
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_stream_timeout_secs() -> u64 {
    60
}

/// Default generation parameters.
///
/// Values are not range-checked; the inference server is the authority.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct GenerationConfig {
    #[serde(default = "default_model")]
    pub model: String,

    #[serde(default = "default_temperature")]
    pub temperature: f64,

    #[serde(default = "default_top_p")]
    pub top_p: f64,

    #[serde(default = "default_top_k")]
    pub top_k: u32,

    /// Generation limit, also used as the context window.
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    #[serde(default = "default_system_prompt")]
    pub system_prompt: String,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            model: default_model(),
            temperature: default_temperature(),
            top_p: default_top_p(),
            top_k: default_top_k(),
            max_tokens: default_max_tokens(),
            system_prompt: default_system_prompt(),
        }
    }
}

fn default_model() -> String {
    DEFAULT_MODEL.to_string()
}

fn default_temperature() -> f64 {
    0.7
}

fn default_top_p() -> f64 {
    0.9
}

fn default_top_k() -> u32 {
    40
}

fn default_max_tokens() -> u32 {
    2048
}

fn default_system_prompt() -> String {
    DEFAULT_SYSTEM_PROMPT.to_string()
}

/// Chat client configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ClientConfig {
    /// Base URL of the relay endpoint.
    #[serde(default = "default_relay_url")]
    pub relay_url: String,

    /// Where conversations are persisted.
    #[serde(default = "default_store_path")]
    pub store_path: PathBuf,

    /// Maximum user/assistant pairs kept per conversation. `0` keeps everything.
    #[serde(default = "default_history_pairs")]
    pub history_pairs: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            relay_url: default_relay_url(),
            store_path: default_store_path(),
            history_pairs: default_history_pairs(),
        }
    }
}

fn default_relay_url() -> String {
    "http://127.0.0.1:3001".to_string()
}

fn default_store_path() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("parley")
        .join("conversations.json")
}

fn default_history_pairs() -> usize {
    20
}
