//! `combiner`: command-line client for the Combiner Service.
//!
//! Usage:
//!   combiner --module-id notes listen --send hello
//!   combiner --module-id notes db list drafts --filter '{"open":true}'
//!   combiner search --query docker --test-mode
//!
//! Env vars:
//!   COMBINER_CONFIG     path to the TOML config (default: combiner.toml)
//!   COMBINER_BASE_URL   service address
//!   COMBINER_MODULE_ID  module id
//!   RUST_LOG            log filter (default: warn, info for `listen`)

mod cli;

use clap::Parser;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use cli::{Cli, Command, ConfigCommand};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let default_level = match cli.command {
        Command::Listen { .. } => "info",
        _ => "warn",
    };
    init_tracing(default_level, cli.global.json_logs);

    let config = cli::load_config(&cli.global)?;

    match cli.command {
        Command::Listen {
            send,
            max_reconnect_attempts,
        } => {
            config.ensure_valid()?;
            cli::listen::listen(&config, send, max_reconnect_attempts).await
        }
        Command::Fs(cmd) => cli::rest::fs(&config, cmd).await,
        Command::Db(cmd) => cli::rest::db(&config, cmd).await,
        Command::Token => cli::rest::token(&config).await,
        Command::Search(args) => cli::search::search(&config, args).await,
        Command::Config(ConfigCommand::Validate) => {
            if !cli::config::validate(&config) {
                std::process::exit(1);
            }
            Ok(())
        }
        Command::Config(ConfigCommand::Show) => cli::config::show(&config),
    }
}

/// Logs go to stderr so command output on stdout stays clean.
fn init_tracing(default_level: &str, json: bool) {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    if json {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(std::io::stderr),
            )
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .compact()
                    .with_writer(std::io::stderr),
            )
            .init();
    }
}
