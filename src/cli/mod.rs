//! CLI definitions.

pub mod commands;

use clap::{Parser, Subcommand, ValueEnum};
use rust_decimal::Decimal;
use std::path::PathBuf;

/// Config file picked up when `--config` is not given.
const DEFAULT_CONFIG: &str = "config/default.toml";

#[derive(Parser)]
#[command(name = "telemetry")]
#[command(author, version, about = "Real-time trading telemetry server, viewer and analytics")]
pub struct Cli {
    /// Configuration file path [default: config/default.toml, if present]
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Log level [default: logging.level from config]
    #[arg(short, long)]
    pub log_level: Option<LogLevel>,

    /// Enable JSON log format
    #[arg(long)]
    pub json_logs: bool,

    /// Write logs to this file instead of stdout
    #[arg(long)]
    pub log_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Config file to load, if any.
    pub fn config_path(&self) -> Option<PathBuf> {
        self.config.clone().or_else(|| {
            let default = PathBuf::from(DEFAULT_CONFIG);
            default.exists().then_some(default)
        })
    }
}

#[derive(Clone, Copy, ValueEnum)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the telemetry broadcast server
    Serve(ServeArgs),
    /// Connect to a server and mirror its telemetry
    Watch(WatchArgs),
    /// Print a one-shot risk and performance report from a store
    Report(ReportArgs),
    /// Validate configuration
    ValidateConfig,
}

impl Commands {
    /// The full-screen dashboard owns the terminal, so logs go to a file.
    pub fn owns_terminal(&self) -> bool {
        matches!(self, Commands::Watch(args) if !args.headless)
    }
}

#[derive(clap::Args)]
pub struct ServeArgs {
    /// Address to listen on (overrides server.bind)
    #[arg(short, long)]
    pub bind: Option<String>,

    /// Store URL (overrides store.url)
    #[arg(short, long, env = "TELEMETRY_STORE_URL")]
    pub store: Option<String>,
}

#[derive(clap::Args)]
pub struct WatchArgs {
    /// Server WebSocket URL (overrides client.url)
    #[arg(short, long)]
    pub url: Option<String>,

    /// Log mirror summaries instead of opening the dashboard
    #[arg(long)]
    pub headless: bool,

    /// Seconds between summaries in headless mode
    #[arg(long, default_value = "5")]
    pub interval: u64,

    /// Dashboard redraw interval in milliseconds
    #[arg(long, default_value = "250")]
    pub refresh_ms: u64,
}

#[derive(clap::Args)]
pub struct ReportArgs {
    /// Store URL (overrides store.url)
    #[arg(short, long, env = "TELEMETRY_STORE_URL")]
    pub store: Option<String>,

    /// Most recent trades to include
    #[arg(long, default_value = "10000")]
    pub limit: usize,

    /// Starting capital (overrides metrics.starting_capital)
    #[arg(long)]
    pub capital: Option<Decimal>,

    /// Output format
    #[arg(short, long, default_value = "text")]
    pub output: OutputFormat,

    /// Save the JSON report to a file
    #[arg(long)]
    pub save: Option<PathBuf>,

    /// Write the equity curve as CSV
    #[arg(long)]
    pub equity_csv: Option<PathBuf>,
}

#[derive(Clone, Copy, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}
