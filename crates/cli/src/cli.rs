//! CLI argument definitions using clap.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Chat Fanout - change-event dispatch and multi-channel notification fan-out
#[derive(Parser, Debug)]
#[command(
    name = "chat-fanout",
    author,
    version,
    about = "Change-event dispatch and notification fan-out pipeline",
    long_about = "Normalizes raw change-stream, pub/sub and storage events, derives domain \n\
                  events through configured processors, and fans them out to registered \n\
                  push and socket endpoints."
)]
pub struct Cli {
    /// Increase logging verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true, env = "CHAT_FANOUT_VERBOSE")]
    pub verbose: u8,

    /// Suppress all output except warnings and errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Log output format
    #[arg(
        long,
        value_enum,
        default_value = "pretty",
        global = true,
        env = "CHAT_FANOUT_LOG_FORMAT"
    )]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run both dispatch stages over a file of raw events
    Run(RunArgs),

    /// Validate configuration file without running
    Validate(ValidateArgs),

    /// Display configuration information
    Info(InfoArgs),
}

/// Arguments for the `run` command
#[derive(Parser, Debug, Clone)]
pub struct RunArgs {
    /// Path to configuration file (TOML or JSON)
    #[arg(short, long, default_value = "config.toml", env = "CHAT_FANOUT_CONFIG")]
    pub config: PathBuf,

    /// JSON array of raw source events
    #[arg(short, long, env = "CHAT_FANOUT_EVENTS")]
    pub events: PathBuf,

    /// JSON fixtures: mediator aggregates/members and listener registrations
    #[arg(short, long, env = "CHAT_FANOUT_FIXTURES")]
    pub fixtures: Option<PathBuf>,

    /// Raw events per dispatched batch
    #[arg(long, default_value = "25", env = "CHAT_FANOUT_BATCH_SIZE")]
    pub batch_size: usize,

    /// Override `service.relay_capacity` from configuration
    #[arg(long, env = "CHAT_FANOUT_RELAY_CAPACITY")]
    pub relay_capacity: Option<usize>,

    /// Override `fanout.max_concurrency` from configuration
    #[arg(long, env = "CHAT_FANOUT_MAX_CONCURRENCY")]
    pub max_concurrency: Option<usize>,

    /// Pipeline timeout in seconds (0 = no timeout)
    #[arg(long, default_value = "0", env = "CHAT_FANOUT_TIMEOUT")]
    pub timeout: u64,

    /// Validate configuration and inputs, then exit without dispatching
    #[arg(long)]
    pub dry_run: bool,

    /// Metrics server port (0 = disabled)
    #[arg(long, default_value = "0", env = "CHAT_FANOUT_METRICS_PORT")]
    pub metrics_port: u16,
}

/// Arguments for the `validate` command
#[derive(Parser, Debug)]
pub struct ValidateArgs {
    /// Path to configuration file to validate
    #[arg(short, long, default_value = "config.toml")]
    pub config: PathBuf,

    /// Output validation result as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the `info` command
#[derive(Parser, Debug)]
pub struct InfoArgs {
    /// Path to configuration file
    #[arg(short, long, default_value = "config.toml")]
    pub config: PathBuf,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,

    /// Show per-processor parameters
    #[arg(long)]
    pub processors: bool,

    /// Show gateway parameters
    #[arg(long)]
    pub gateways: bool,
}

/// Log output format
#[derive(ValueEnum, Clone, Copy, Debug, Default)]
pub enum LogFormat {
    /// JSON structured logging
    Json,
    /// Human-readable pretty format
    #[default]
    Pretty,
    /// Compact single-line format
    Compact,
}

impl From<LogFormat> for observability::LogFormat {
    fn from(format: LogFormat) -> Self {
        match format {
            LogFormat::Json => Self::Json,
            LogFormat::Pretty => Self::Pretty,
            LogFormat::Compact => Self::Compact,
        }
    }
}
