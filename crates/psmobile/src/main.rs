//! Line-oriented front end: reads chat commands from stdin and prints replies.

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use psmobile::catalog::{CatalogConfig, CatalogService};
use psmobile::commands;
use std::path::PathBuf;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone, ValueEnum)]
enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    fn to_filter_directive(&self) -> &'static str {
        match self {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }
}

#[derive(Parser, Debug)]
#[clap(
    name = "psmobile",
    about = "Answer class catalog commands from stdin",
    version
)]
struct Cli {
    /// JSON config file; defaults plus PSMOBILE_* variables when omitted
    #[clap(long)]
    config: Option<PathBuf>,

    /// Command prefix, overriding the config
    #[clap(long)]
    prefix: Option<String>,

    /// Log level; RUST_LOG takes precedence when set
    #[clap(long, default_value = "info")]
    log_level: LogLevel,
}

fn initialize_tracing(log_level: &LogLevel) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(log_level.to_filter_directive()));

    // stdout carries replies only
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    initialize_tracing(&cli.log_level);

    let mut config =
        CatalogConfig::load(cli.config.as_deref()).context("Failed to load configuration")?;
    if let Some(prefix) = cli.prefix {
        anyhow::ensure!(!prefix.trim().is_empty(), "--prefix must not be empty");
        config.command_prefix = prefix;
    }
    let service = CatalogService::new(&config).context("Failed to start catalog service")?;
    let prefix = config.command_prefix.as_str();

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();

    info!(prefix, "Reading commands from stdin");
    while let Some(line) = lines.next_line().await? {
        let reply = tokio::select! {
            reply = commands::respond(&service, prefix, &line) => reply,
            _ = tokio::signal::ctrl_c() => {
                warn!(line = %line, "Command cancelled");
                Some("Cancelled.".to_string())
            }
        };
        if let Some(reply) = reply {
            stdout.write_all(reply.as_bytes()).await?;
            stdout.write_all(b"\n").await?;
            stdout.flush().await?;
        }
    }

    info!("stdin closed, shutting down");
    Ok(())
}
