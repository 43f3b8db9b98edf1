// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Integration tests for the Parley configuration system.

use parley_config::diagnostic::ConfigError;
use parley_config::{load_and_validate_path, load_and_validate_str, load_config_from_str};

#[test]
fn valid_toml_deserializes_into_parley_config() {
    let toml = r#"
[server]
host = "0.0.0.0"
port = 8080
log_level = "debug"

[ollama]
api_url = "http://gpu-box:11434"
api_key = "sk-local"
request_timeout_secs = 10
stream_timeout_secs = 120

[generation]
model = "qwen3:8b"
temperature = 0.2
top_p = 0.5
top_k = 20
max_tokens = 4096
system_prompt = "Be terse."

[client]
relay_url = "http://chat.local:3001"
store_path = "/tmp/parley/conversations.json"
history_pairs = 0
"#;

    let config = load_config_from_str(toml).expect("valid TOML should deserialize");
    assert_eq!(config.server.bind_addr(), "0.0.0.0:8080");
    assert_eq!(config.server.log_level, "debug");
    assert_eq!(config.ollama.api_key.as_deref(), Some("sk-local"));
    assert_eq!(config.ollama.stream_timeout_secs, 120);
    assert_eq!(config.client.history_pairs, 0);

    let settings = config.generation_settings();
    assert_eq!(settings.model, "qwen3:8b");
    assert_eq!(settings.max_tokens, 4096);
    assert_eq!(settings.system_prompt, "Be terse.");
    assert_eq!(settings.api_url, "http://gpu-box:11434");
}

#[test]
fn missing_sections_use_defaults() {
    let config = load_config_from_str("").expect("empty TOML should use defaults");

    assert_eq!(config.server.host, "127.0.0.1");
    assert_eq!(config.server.port, 3001);
    assert_eq!(config.server.log_level, "info");
    assert_eq!(config.ollama.api_url, "http://localhost:11434");
    assert!(config.ollama.api_key.is_none());
    assert_eq!(config.ollama.request_timeout_secs, 30);
    assert_eq!(config.ollama.stream_timeout_secs, 60);
    assert_eq!(config.generation.model, "llama2");
    assert_eq!(config.generation.temperature, 0.7);
    assert_eq!(config.generation.top_p, 0.9);
    assert_eq!(config.generation.top_k, 40);
    assert_eq!(config.generation.max_tokens, 2048);
    assert_eq!(config.client.relay_url, "http://127.0.0.1:3001");
    assert_eq!(config.client.history_pairs, 20);
}

#[test]
fn unknown_key_gets_suggestion_and_span() {
    let toml = "[ollama]\napi_ulr = \"http://x:11434\"\n";
    let errors = load_and_validate_str(toml).expect_err("should reject unknown key");
    assert_eq!(errors.len(), 1);
    match &errors[0] {
        ConfigError::UnknownKey {
            key,
            suggestion,
            span,
            ..
        } => {
            assert_eq!(key, "api_ulr");
            assert_eq!(suggestion.as_deref(), Some("api_url"));
            let span = span.as_ref().expect("inline source should resolve a span");
            assert_eq!(span.offset(), toml.find("api_ulr").unwrap());
        }
        other => panic!("expected UnknownKey, got {other:?}"),
    }
}

#[test]
fn unknown_section_is_rejected() {
    let errors = load_and_validate_str("[telemetry]\nenabled = true\n").unwrap_err();
    assert!(matches!(&errors[0], ConfigError::UnknownKey { key, .. } if key == "telemetry"));
}

#[test]
fn wrong_type_is_reported() {
    let errors = load_and_validate_str("[server]\nport = \"three thousand\"\n").unwrap_err();
    assert!(
        matches!(&errors[0], ConfigError::InvalidType { key, .. } if key.contains("port")),
        "got {errors:?}"
    );
}

#[test]
fn wrong_type_points_at_the_key() {
    let toml = "[client]\nrelay_url = \"http://127.0.0.1:3001\"\nhistory_pairs = \"lots\"\n";
    let errors = load_and_validate_str(toml).unwrap_err();
    match &errors[0] {
        ConfigError::InvalidType { key, span, src, .. } => {
            assert_eq!(key, "client.history_pairs");
            let span = span.as_ref().expect("inline source should resolve a span");
            assert_eq!(span.offset(), toml.find("history_pairs").unwrap());
            assert!(src.is_some());
        }
        other => panic!("expected InvalidType, got {other:?}"),
    }
}

#[test]
fn validation_runs_after_successful_parse() {
    let errors = load_and_validate_str("[ollama]\napi_url = \"ftp://nope\"\n").unwrap_err();
    assert!(matches!(&errors[0], ConfigError::Validation { message } if message.contains("ollama.api_url")));
}

#[test]
fn explicit_path_is_loaded() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("custom.toml");
    std::fs::write(&path, "[generation]\nmodel = \"mistral\"\n").unwrap();

    let config = load_and_validate_path(&path).expect("file should load");
    assert_eq!(config.generation.model, "mistral");
}
