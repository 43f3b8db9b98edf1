// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Parley - chat with a local Ollama-compatible model.
//!
//! This is the binary entry point. `serve` runs the relay endpoint, `shell`
//! runs the interactive chat client against it.

mod serve;
mod shell;
mod status;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use colored::Colorize;
use parley_config::ParleyConfig;

/// Parley - chat with a local Ollama-compatible model.
#[derive(Parser, Debug)]
#[command(name = "parley", version, about, long_about = None)]
struct Cli {
    /// Load configuration from this file instead of the default locations.
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Start the relay endpoint.
    Serve,
    /// Launch an interactive chat session.
    Shell {
        /// Wait for whole replies instead of streaming them.
        #[arg(long)]
        no_stream: bool,
    },
    /// List the models installed on the inference server.
    Models {
        /// Query this inference server instead of the relay's default.
        #[arg(long)]
        api_url: Option<String>,
        /// Output as JSON.
        #[arg(long)]
        json: bool,
    },
    /// Show whether the relay is running.
    Status {
        /// Output as JSON.
        #[arg(long)]
        json: bool,
    },
    /// Print the effective configuration.
    Config,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let loaded = match &cli.config {
        Some(path) => parley_config::load_and_validate_path(path),
        None => parley_config::load_and_validate(),
    };
    let config = match loaded {
        Ok(config) => config,
        Err(errors) => {
            parley_config::render_errors(&errors);
            std::process::exit(1);
        }
    };

    let result = match cli.command {
        Some(Commands::Serve) => serve::run_serve(config).await,
        Some(Commands::Shell { no_stream }) => shell::run_shell(config, !no_stream).await,
        Some(Commands::Models { api_url, json }) => {
            status::run_models(&config, api_url.as_deref(), json).await
        }
        Some(Commands::Status { json }) => status::run_status(&config, json).await,
        Some(Commands::Config) => print_config(&config),
        None => {
            println!("parley: use --help for available commands");
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("{}: {e}", "error".red());
        std::process::exit(1);
    }
}

fn print_config(config: &ParleyConfig) -> Result<(), parley_core::ParleyError> {
    let rendered = config
        .to_redacted_toml()
        .map_err(|e| parley_core::ParleyError::Internal(format!("failed to render config: {e}")))?;
    print!("{rendered}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_parses_shell_flags() {
        let cli = Cli::try_parse_from(["parley", "--config", "/tmp/p.toml", "shell", "--no-stream"])
            .unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("/tmp/p.toml")));
        assert!(matches!(cli.command, Some(Commands::Shell { no_stream: true })));
    }

    #[test]
    fn cli_parses_models_override() {
        let cli =
            Cli::try_parse_from(["parley", "models", "--api-url", "http://gpu:11434"]).unwrap();
        match cli.command {
            Some(Commands::Models { api_url, json }) => {
                assert_eq!(api_url.as_deref(), Some("http://gpu:11434"));
                assert!(!json);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn redacted_config_hides_key() {
        let mut config = ParleyConfig::default();
        config.ollama.api_key = Some("sk-secret".into());
        let rendered = config.to_redacted_toml().unwrap();
        assert!(!rendered.contains("sk-secret"));
        assert!(rendered.contains("[redacted]"));
    }
}
