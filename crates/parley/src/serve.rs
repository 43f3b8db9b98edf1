// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `parley serve` command implementation.
//!
//! Probes the configured inference server once, then runs the relay until
//! Ctrl-C. An unreachable inference server is logged but does not stop the
//! relay from starting.

use parley_config::ParleyConfig;
use parley_core::ParleyError;
use parley_gateway::{RelayState, ServerConfig, start_server};
use parley_ollama::{OllamaClient, Timeouts};
use tracing::{info, warn};

/// Runs the `parley serve` command.
pub async fn run_serve(config: ParleyConfig) -> Result<(), ParleyError> {
    init_tracing(&config.server.log_level);

    let defaults = config.generation_settings();
    let timeouts = Timeouts {
        request: config.ollama.request_timeout(),
        stream: config.ollama.stream_timeout(),
    };

    let probe = OllamaClient::from_settings(&defaults, timeouts)?;
    if probe.check_health().await {
        info!(url = %probe.base_url(), "inference server reachable");
    } else {
        warn!(
            url = %probe.base_url(),
            "inference server not reachable, chat requests will fail until it is up"
        );
    }

    let server = ServerConfig {
        host: config.server.host.clone(),
        port: config.server.port,
    };
    start_server(&server, RelayState::new(defaults, timeouts), shutdown_signal()).await?;

    info!("parley serve shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "failed to listen for ctrl-c");
        std::future::pending::<()>().await;
    }
    info!("shutdown signal received");
}

/// Initialize the tracing subscriber. `RUST_LOG` takes precedence over the
/// configured level.
fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("parley={log_level},tower_http={log_level},warn")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_names(false)
        .init();
}
