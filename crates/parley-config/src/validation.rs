// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.
//!
//! Generation parameters are intentionally absent here: they are forwarded
//! to the inference server unchanged.

use crate::diagnostic::ConfigError;
use crate::model::ParleyConfig;

/// Validates a deserialized configuration, collecting every failure.
pub fn validate_config(config: &ParleyConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();

    let host = config.server.host.trim();
    if host.is_empty() {
        errors.push(ConfigError::Validation {
            message: "server.host must not be empty".to_string(),
        });
    } else if host.parse::<std::net::IpAddr>().is_err()
        && !host
            .chars()
            .all(|c| c.is_alphanumeric() || c == '.' || c == '-')
    {
        errors.push(ConfigError::Validation {
            message: format!("server.host `{host}` is not a valid IP address or hostname"),
        });
    }

    check_url(&mut errors, "ollama.api_url", &config.ollama.api_url);
    check_url(&mut errors, "client.relay_url", &config.client.relay_url);

    if config.ollama.request_timeout_secs == 0 {
        errors.push(ConfigError::Validation {
            message: "ollama.request_timeout_secs must be greater than zero".to_string(),
        });
    }
    if config.ollama.stream_timeout_secs == 0 {
        errors.push(ConfigError::Validation {
            message: "ollama.stream_timeout_secs must be greater than zero".to_string(),
        });
    }

    if config.client.store_path.as_os_str().is_empty() {
        errors.push(ConfigError::Validation {
            message: "client.store_path must not be empty".to_string(),
        });
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Accepts `http://` or `https://` URLs with a non-empty host part.
fn check_url(errors: &mut Vec<ConfigError>, key: &str, value: &str) {
    let value = value.trim();
    let rest = value
        .strip_prefix("http://")
        .or_else(|| value.strip_prefix("https://"));
    match rest {
        Some(rest) if !rest.is_empty() && !rest.starts_with('/') => {}
        _ => errors.push(ConfigError::Validation {
            message: format!("{key} `{value}` must be an http:// or https:// URL"),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn messages(errors: &[ConfigError]) -> Vec<String> {
        errors.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn default_config_validates() {
        assert!(validate_config(&ParleyConfig::default()).is_ok());
    }

    #[test]
    fn collects_all_errors() {
        let mut config = ParleyConfig::default();
        config.server.host = " ".into();
        config.ollama.api_url = "localhost:11434".into();
        config.client.relay_url = "http://".into();
        config.ollama.stream_timeout_secs = 0;

        let errors = validate_config(&config).unwrap_err();
        let msgs = messages(&errors);
        assert_eq!(msgs.len(), 4, "{msgs:?}");
        assert!(msgs.iter().any(|m| m.contains("server.host")));
        assert!(msgs.iter().any(|m| m.contains("ollama.api_url")));
        assert!(msgs.iter().any(|m| m.contains("client.relay_url")));
        assert!(msgs.iter().any(|m| m.contains("stream_timeout_secs")));
    }

    #[test]
    fn generation_values_are_not_range_checked() {
        let mut config = ParleyConfig::default();
        config.generation.temperature = 7.5;
        config.generation.top_k = 0;
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn accepts_https_and_hostnames() {
        let mut config = ParleyConfig::default();
        config.server.host = "0.0.0.0".into();
        config.ollama.api_url = "https://ollama.internal:443".into();
        assert!(validate_config(&config).is_ok());

        config.server.host = "chat-box.local".into();
        assert!(validate_config(&config).is_ok());
    }
}
