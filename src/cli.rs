//! Command-line interface definitions using clap derive macros.
//!
//! Contains the top-level [`Cli`] parser, the [`Commands`] enum for
//! subcommands (run, init, validate, health, echo), and their argument
//! structs. Every `run` flag has an environment variable equivalent for
//! container deployments.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

#[derive(Parser)]
#[command(
    name = "forwarder",
    version,
    about = "HTTP replay proxy: relay to a primary upstream, mirror to secondaries",
    propagate_version = true,
    after_help = "\x1b[1mQuick start:\x1b[0m\n  \
        forwarder init                       Create a starter config\n  \
        forwarder run                        Start with ./forwarder.yaml\n  \
        forwarder run -c routes.json         Start with a specific config\n  \
        forwarder echo --print               Debug upstream that logs what it receives"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the proxy server
    Run(Box<RunArgs>),

    /// Generate a starter config file
    Init(InitArgs),

    /// Validate a config file without starting
    Validate(ValidateArgs),

    /// Check a running instance with `?test=1`
    Health(HealthArgs),

    /// Start a catch-all debug server that logs every request
    Echo(EchoArgs),
}

#[derive(Args)]
#[command(after_help = "\x1b[1mExamples:\x1b[0m\n  \
        forwarder run                                     Auto-detect config\n  \
        forwarder run -c routes.yaml                      Specific config file\n  \
        forwarder run -c routes.yaml -p 8080 --pretty     Local dev mode\n  \
        forwarder run --log-file /var/log/fwd/%Y%m%d.jsonl")]
pub struct RunArgs {
    /// Config file path (.yaml, .json, .toml)
    #[arg(short, long, env = "CONFIG_FILE")]
    pub config: Option<PathBuf>,

    /// Listen port
    #[arg(short, long, env = "PORT", default_value_t = 8000)]
    pub port: u16,

    /// Listen address
    #[arg(long, env = "HOST", default_value = "0.0.0.0")]
    pub host: String,

    /// Request log file template (strftime, overrides the config)
    #[arg(long, env = "FORWARDER_LOG_FILE")]
    pub log_file: Option<String>,

    // -- Logging --
    /// Log level
    #[arg(short, long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: LogLevel,

    /// Force pretty (human-readable) log output
    #[arg(long)]
    pub pretty: bool,

    /// Force JSON log output (overrides TTY detection)
    #[arg(long, conflicts_with = "pretty")]
    pub json: bool,

    // -- Tuning --
    /// Outbound timeout in milliseconds (overrides the config)
    #[arg(long, env = "REQUEST_TIMEOUT_MS", help_heading = "Tuning")]
    pub timeout: Option<u64>,

    /// Max request body size in bytes
    #[arg(
        long,
        env = "MAX_BODY_SIZE",
        default_value_t = 1_048_576,
        help_heading = "Tuning"
    )]
    pub max_body: usize,
}

#[derive(Args)]
#[command(after_help = "\x1b[1mExamples:\x1b[0m\n  \
        forwarder init                          Minimal config (yaml)\n  \
        forwarder init --full                   Fully commented config\n  \
        forwarder init -f json -o routes.json   JSON format")]
pub struct InitArgs {
    /// Output format
    #[arg(short, long, default_value = "yaml")]
    pub format: ConfigFormat,

    /// Output file path
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Include documentation for every option
    #[arg(long)]
    pub full: bool,
}

#[derive(Args)]
pub struct ValidateArgs {
    /// Config file to validate
    #[arg(default_value = "forwarder.yaml")]
    pub config: PathBuf,

    /// Output format
    #[arg(long, default_value = "text")]
    pub format: ValidateFormat,
}

#[derive(Args)]
pub struct HealthArgs {
    /// URL of the running instance
    #[arg(default_value = "http://localhost:8000")]
    pub url: String,
}

#[derive(Args)]
#[command(after_help = "\x1b[1mExamples:\x1b[0m\n  \
        forwarder echo --print                          Dump requests to stdout\n  \
        forwarder echo --log-file echo_%Y%m%d.jsonl     Record to a daily file\n  \
        forwarder echo --delay 0.2 1.5 --keep-body 512  Random latency, 512-byte bodies")]
pub struct EchoArgs {
    /// Listen port
    #[arg(short, long, default_value_t = 8000)]
    pub port: u16,

    /// Listen address
    #[arg(long, default_value = "0.0.0.0")]
    pub host: String,

    /// Record requests to a JSON Lines file (strftime template)
    #[arg(long)]
    pub log_file: Option<String>,

    /// Print each request in human-readable form to stdout
    #[arg(long)]
    pub print: bool,

    /// Delay each response by SECS, or by a random time between SECS and MAX
    #[arg(long, num_args = 1..=2, value_names = ["SECS", "MAX"])]
    pub delay: Vec<f64>,

    /// Log the body: the whole body, or only the first N bytes (0 logs none)
    #[arg(long, num_args = 0..=1, value_name = "N")]
    pub keep_body: Option<Option<usize>>,

    /// Log level
    #[arg(short, long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: LogLevel,
}

#[derive(Clone, Debug, ValueEnum)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    #[must_use]
    pub const fn to_tracing_level(&self) -> tracing::Level {
        match self {
            Self::Trace => tracing::Level::TRACE,
            Self::Debug => tracing::Level::DEBUG,
            Self::Info => tracing::Level::INFO,
            Self::Warn => tracing::Level::WARN,
            Self::Error => tracing::Level::ERROR,
        }
    }
}

#[derive(Clone, Debug, ValueEnum)]
pub enum ConfigFormat {
    Yaml,
    Json,
    Toml,
}

impl ConfigFormat {
    #[must_use]
    pub const fn extension(&self) -> &'static str {
        match self {
            Self::Yaml => "yaml",
            Self::Json => "json",
            Self::Toml => "toml",
        }
    }
}

#[derive(Clone, Debug, ValueEnum)]
pub enum ValidateFormat {
    Text,
    Json,
}
