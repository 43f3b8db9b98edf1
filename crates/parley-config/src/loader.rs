// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration loader using Figment for layered config merging.
//!
//! Supports XDG hierarchy: `./parley.toml` > `~/.config/parley/parley.toml` >
//! `/etc/parley/parley.toml`, with `PARLEY_*` environment overrides and the
//! conventional `OLLAMA_API_URL`, `OLLAMA_API_KEY`, and `PORT` variables on top.

#![allow(clippy::result_large_err)] // figment::Error is external

use std::path::{Path, PathBuf};

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};

use crate::model::ParleyConfig;

/// System-wide config file.
pub const SYSTEM_CONFIG_PATH: &str = "/etc/parley/parley.toml";

/// Config file looked up in the working directory.
pub const LOCAL_CONFIG_FILE: &str = "parley.toml";

/// Section prefixes recognised in `PARLEY_*` variable names.
const ENV_SECTIONS: &[&str] = &["server", "ollama", "generation", "client"];

/// Returns `~/.config/parley/parley.toml`, if a config dir exists.
pub fn user_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("parley/parley.toml"))
}

/// Load configuration from the standard hierarchy with env var overrides.
///
/// Merge order (later overrides earlier):
/// 1. Compiled defaults
/// 2. `/etc/parley/parley.toml`
/// 3. `~/.config/parley/parley.toml`
/// 4. `./parley.toml`
/// 5. `PARLEY_*` environment variables
/// 6. `OLLAMA_API_URL`, `OLLAMA_API_KEY`, `PORT`
pub fn load_config() -> Result<ParleyConfig, figment::Error> {
    build_figment().extract()
}

/// Load configuration from a TOML string only (no files, no environment).
pub fn load_config_from_str(toml_content: &str) -> Result<ParleyConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(ParleyConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from an explicit file with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<ParleyConfig, figment::Error> {
    with_env(
        Figment::new()
            .merge(Serialized::defaults(ParleyConfig::default()))
            .merge(Toml::file(path)),
    )
    .extract()
}

/// Build the Figment used for config loading, before extraction.
pub fn build_figment() -> Figment {
    let mut figment = Figment::new()
        .merge(Serialized::defaults(ParleyConfig::default()))
        .merge(Toml::file(SYSTEM_CONFIG_PATH));
    if let Some(user) = user_config_path() {
        figment = figment.merge(Toml::file(user));
    }
    with_env(figment.merge(Toml::file(LOCAL_CONFIG_FILE)))
}

fn with_env(figment: Figment) -> Figment {
    figment
        .merge(env_provider())
        .merge(Env::raw().only(&["OLLAMA_API_URL"]).map(|_| "ollama.api_url".into()))
        .merge(Env::raw().only(&["OLLAMA_API_KEY"]).map(|_| "ollama.api_key".into()))
        .merge(Env::raw().only(&["PORT"]).map(|_| "server.port".into()))
}

/// `PARLEY_*` provider with explicit section mapping.
///
/// Uses `Env::map()` rather than `Env::split("_")` because key names contain
/// underscores: `PARLEY_OLLAMA_API_URL` must become `ollama.api_url`, not
/// `ollama.api.url`.
fn env_provider() -> Env {
    Env::prefixed("PARLEY_").map(|key| {
        let key_str = key.as_str();
        for section in ENV_SECTIONS {
            if let Some(rest) = key_str
                .strip_prefix(section)
                .and_then(|r| r.strip_prefix('_'))
            {
                return format!("{section}.{rest}").into();
            }
        }
        key_str.to_string().into()
    })
}
