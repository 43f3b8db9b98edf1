// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `parley status` and `parley models` command implementations.
//!
//! Both talk to the relay the chat client is configured for. `status` falls
//! back gracefully when the relay is not running.

use std::io::IsTerminal;
use std::time::Duration;

use colored::Colorize;
use parley_client::RelayClient;
use parley_config::ParleyConfig;
use parley_core::{ModelInfo, ParleyError};

/// Deadline for the status probe.
const STATUS_TIMEOUT: Duration = Duration::from_secs(3);

/// Run the `parley status` command.
pub async fn run_status(config: &ParleyConfig, json: bool) -> Result<(), ParleyError> {
    let relay = RelayClient::with_timeout(&config.client.relay_url, STATUS_TIMEOUT)?;
    let color = std::io::stdout().is_terminal() && !json;

    let (health, upstream) = match relay.health().await {
        Ok(health) => (Some(health), relay.config().await.ok()),
        Err(_) => (None, None),
    };

    if json {
        let value = serde_json::json!({
            "running": health.is_some(),
            "relayUrl": relay.base_url(),
            "status": health.as_ref().map(|h| h.status.as_str()),
            "timestamp": health.as_ref().map(|h| h.timestamp.as_str()),
            "apiUrl": upstream.as_ref().map(|c| c.api_url.as_str()),
            "apiKey": upstream.as_ref().map(|c| c.api_key.as_str()),
        });
        println!("{}", serde_json::to_string_pretty(&value).unwrap_or_default());
        return Ok(());
    }

    match health {
        Some(health) => {
            let state = format!("running ({})", health.status);
            println!(
                "relay:     {}",
                if color { state.green().to_string() } else { state }
            );
            println!("address:   {}", relay.base_url());
            if let Some(upstream) = upstream {
                println!("upstream:  {}", upstream.api_url);
                let key = if upstream.api_key.is_empty() {
                    "none"
                } else {
                    "configured"
                };
                println!("api key:   {key}");
            }
        }
        None => {
            let state = "not running".to_string();
            println!(
                "relay:     {}",
                if color { state.red().to_string() } else { state }
            );
            println!("address:   {}", relay.base_url());
        }
    }
    Ok(())
}

/// Run the `parley models` command.
pub async fn run_models(
    config: &ParleyConfig,
    api_url: Option<&str>,
    json: bool,
) -> Result<(), ParleyError> {
    let relay = RelayClient::new(&config.client.relay_url)?;
    let models = relay.list_models(api_url, None).await?;

    if json {
        let rendered = serde_json::to_string_pretty(&models)
            .map_err(|e| ParleyError::Internal(format!("failed to render models: {e}")))?;
        println!("{rendered}");
        return Ok(());
    }

    if models.is_empty() {
        println!("no models installed");
        return Ok(());
    }
    for line in model_lines(&models) {
        println!("{line}");
    }
    Ok(())
}

fn model_lines(models: &[ModelInfo]) -> Vec<String> {
    let width = models.iter().map(|m| m.name.len()).max().unwrap_or(0);
    models
        .iter()
        .map(|m| format!("{:<width$}  {:>9}  {}", m.name, format_size(m.size), m.modified_at))
        .collect()
}

/// Formats a byte count with a binary unit suffix.
fn format_size(bytes: u64) -> String {
    const UNITS: [&str; 5] = ["B", "KiB", "MiB", "GiB", "TiB"];
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{bytes} B")
    } else {
        format!("{value:.1} {}", UNITS[unit])
    }
}
