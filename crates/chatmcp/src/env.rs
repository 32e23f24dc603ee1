//! Runtime configuration: environment variables (optionally loaded from a
//! `.env` file) layered under command-line flags.

use clap::{Parser, ValueEnum};
use serde::Deserialize;

#[derive(Debug, Clone, Copy, ValueEnum, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TransportMode {
    Stdio,
    Http,
}

#[derive(Debug, Clone, Copy, ValueEnum, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Pretty,
    Json,
}

#[derive(Debug, Clone, Copy, ValueEnum, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum EventStoreKind {
    Memory,
    Sqlite,
}

/// Values loaded from the environment (and `.env`, via `dotenvy`), with
/// defaults matching local development.
#[derive(Debug, Deserialize)]
pub struct EnvConfig {
    pub chat_platform_token: String,
    #[serde(default = "default_transport")]
    pub transport: TransportMode,
    #[serde(default = "default_http_addr")]
    pub http_addr: String,
    #[serde(default = "default_log_format")]
    pub log_format: LogFormat,
    #[serde(default = "default_event_store")]
    pub event_store: EventStoreKind,
    #[serde(default = "default_sqlite_path")]
    pub event_store_sqlite_path: String,
}

fn default_transport() -> TransportMode {
    TransportMode::Stdio
}

fn default_http_addr() -> String {
    "127.0.0.1:8080".to_string()
}

fn default_log_format() -> LogFormat {
    LogFormat::Pretty
}

fn default_event_store() -> EventStoreKind {
    EventStoreKind::Memory
}

fn default_sqlite_path() -> String {
    "sqlite://chatmcp-events.db".to_string()
}

impl EnvConfig {
    /// Load from `.env` (if present) plus the process environment. Variable
    /// names match the struct's fields upper-cased, e.g. `CHAT_PLATFORM_TOKEN`.
    pub fn load() -> anyhow::Result<Self> {
        let _ = dotenvy::dotenv();
        let settings = config::Config::builder()
            .add_source(config::Environment::default().try_parsing(true))
            .build()?;
        settings
            .try_deserialize()
            .map_err(|e| anyhow::anyhow!("failed to load configuration: {e}"))
    }
}

/// Command-line overrides for anything in [`EnvConfig`]. Flags win over
/// environment variables when both are present.
#[derive(Parser, Debug)]
#[command(name = "chatmcp", version, about = "MCP server exposing a chat platform's guilds, channels, users and messages")]
pub struct Cli {
    /// Which transport to serve over.
    #[arg(long, value_enum)]
    pub transport: Option<TransportMode>,

    /// Address to bind the HTTP transport to (ignored for stdio).
    #[arg(long)]
    pub http_addr: Option<String>,

    /// Log output format.
    #[arg(long, value_enum)]
    pub log_format: Option<LogFormat>,

    /// Increase log verbosity (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

impl Cli {
    /// Merge CLI overrides onto a loaded [`EnvConfig`].
    pub fn apply(self, mut env: EnvConfig) -> EnvConfig {
        if let Some(transport) = self.transport {
            env.transport = transport;
        }
        if let Some(http_addr) = self.http_addr {
            env.http_addr = http_addr;
        }
        if let Some(log_format) = self.log_format {
            env.log_format = log_format;
        }
        env
    }

    pub fn tracing_level(&self) -> tracing::Level {
        match self.verbose {
            0 => tracing::Level::INFO,
            1 => tracing::Level::DEBUG,
            _ => tracing::Level::TRACE,
        }
    }
}
