//! tokenwire CLI
//!
//! Mint tokens, hand them to other holders through offline envelopes, and
//! check stored inclusion proofs against a trust base:
//! - `keygen`: create a signing key
//! - `mint` / `send` / `receive`: drive transitions through the aggregator
//! - `verify`: run the proof validator on its own
//!
//! Exit status: 0 confirmed, 1 configuration or usage error, 2 rejected,
//! 3 not confirmed yet (retry later).

use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tokio_util::sync::CancellationToken;
use tracing::{error, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;
mod config;
mod error;
mod files;

use commands::{keygen, mint, receive, send, verify, Report};
use config::{CliConfig, LoggingConfig};
use error::{CliResult, EXIT_CONFIGURATION};

#[derive(Parser)]
#[command(name = "tokenwire")]
#[command(about = "tokenwire - mint, send and receive tokens", long_about = None)]
#[command(version)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, env = "TOKENWIRE_CONFIG")]
    config: Option<String>,

    /// Log level (overrides the configured one)
    #[arg(long)]
    log_level: Option<String>,

    /// Emit logs as JSON
    #[arg(long)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate an Ed25519 signing key
    Keygen(keygen::KeygenArgs),

    /// Mint a new token owned by the given key
    Mint(mint::MintArgs),

    /// Start a transfer and write an envelope for the recipient
    Send(send::SendArgs),

    /// Complete a transfer from an envelope
    Receive(receive::ReceiveArgs),

    /// Validate a stored inclusion proof
    Verify(verify::VerifyArgs),
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => {
            let _ = err.print();
            return if err.use_stderr() {
                ExitCode::from(EXIT_CONFIGURATION)
            } else {
                ExitCode::SUCCESS
            };
        }
    };

    let mut config = match CliConfig::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("error: {err}");
            return err.exit_code();
        }
    };
    if let Some(level) = cli.log_level {
        config.logging.level = level;
    }
    config.logging.json |= cli.json_logs;
    init_tracing(&config.logging);

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, cancelling");
            on_interrupt.cancel();
        }
    });

    match run(cli.command, &config, &cancel).await {
        Ok(report) => ExitCode::from(report.exit_code()),
        Err(err) => {
            error!(error = %err, class = ?err.class(), "Command failed");
            eprintln!("error: {err}");
            err.exit_code()
        }
    }
}

async fn run(command: Commands, config: &CliConfig, cancel: &CancellationToken) -> CliResult<Report> {
    match command {
        Commands::Keygen(args) => keygen::execute(args),
        Commands::Mint(args) => mint::execute(args, config, cancel).await,
        Commands::Send(args) => send::execute(args, config).await,
        Commands::Receive(args) => receive::execute(args, config, cancel).await,
        Commands::Verify(args) => verify::execute(args, config),
    }
}

/// Logs go to stderr; stdout carries command results.
fn init_tracing(logging: &LoggingConfig) {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| logging.level.clone().into());

    if logging.json {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn send_parses_recipient_key() {
        let key = "11".repeat(32);
        let cli = Cli::try_parse_from([
            "tokenwire",
            "--json-logs",
            "send",
            "--key",
            "alice.json",
            "--token",
            "token.json",
            "--recipient",
            key.as_str(),
            "--out",
            "envelope.json",
            "--submit",
        ])
        .unwrap();
        assert!(cli.json_logs);
        match cli.command {
            Commands::Send(args) => {
                assert_eq!(args.recipient.to_hex(), key);
                assert!(args.submit);
                assert!(!args.masked);
            }
            _ => panic!("expected send"),
        }
    }

    #[test]
    fn malformed_recipient_is_usage_error() {
        let parsed = Cli::try_parse_from([
            "tokenwire",
            "send",
            "--key",
            "k",
            "--token",
            "t",
            "--recipient",
            "zz",
            "--out",
            "o",
        ]);
        assert!(parsed.is_err());
    }
}
