//! CLI argument definitions using clap.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Target Selector - sensor-driven spatial target selection for a radio telescope
#[derive(Parser, Debug)]
#[command(
    name = "target-selector",
    author,
    version,
    about = "Sensor-driven spatial target selection",
    long_about = "Listens to telescope control and sensor alerts on a message bus, \n\
                  selects catalog sources inside the primary beam for every pointing, \n\
                  and publishes prioritized target lists for the beamformer."
)]
pub struct Cli {
    /// Increase logging verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true, env = "TARGET_SELECTOR_VERBOSE")]
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
        env = "TARGET_SELECTOR_LOG_FORMAT"
    )]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Listen on the bus and publish target lists until interrupted
    Run(RunArgs),

    /// Validate a configuration file without running
    Validate(ValidateArgs),

    /// Select targets for a single pointing and print them
    Query(QueryArgs),
}

/// Bus and catalog overrides shared by commands that connect
#[derive(Parser, Debug, Clone, Default)]
pub struct ConnectionArgs {
    /// Override the message bus URL from configuration
    #[arg(long, env = "TARGET_SELECTOR_BUS_URL")]
    pub bus_url: Option<String>,

    /// Override the catalog database URL from configuration
    #[arg(long, env = "TARGET_SELECTOR_CATALOG_URL")]
    pub catalog_url: Option<String>,
}

/// Arguments for the `run` command
#[derive(Parser, Debug, Clone)]
pub struct RunArgs {
    /// Path to configuration file (TOML or JSON); defaults are used when absent
    #[arg(short, long, env = "TARGET_SELECTOR_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(flatten)]
    pub connection: ConnectionArgs,

    /// Metrics server port (0 = disabled)
    #[arg(long, default_value = "0", env = "TARGET_SELECTOR_METRICS_PORT")]
    pub metrics_port: u16,

    /// Wire everything against in-memory backends, then exit
    #[arg(long)]
    pub dry_run: bool,
}

/// Arguments for the `validate` command
#[derive(Parser, Debug)]
pub struct ValidateArgs {
    /// Path to configuration file to validate
    #[arg(short, long, default_value = "selector.toml", env = "TARGET_SELECTOR_CONFIG")]
    pub config: PathBuf,

    /// Output validation result as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the `query` command
#[derive(Parser, Debug)]
pub struct QueryArgs {
    /// Path to configuration file (TOML or JSON)
    #[arg(short, long, env = "TARGET_SELECTOR_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(flatten)]
    pub connection: ConnectionArgs,

    /// Right ascension, hours (e.g. 05:34:31.94 or 05h34m31.94s)
    #[arg(long, allow_hyphen_values = true)]
    pub ra: String,

    /// Declination, degrees (e.g. +22:00:52.2 or -05d23m28s)
    #[arg(long, allow_hyphen_values = true)]
    pub dec: String,

    /// Beam radius in degrees (defaults to the configured value)
    #[arg(long)]
    pub radius_deg: Option<f64>,

    /// Output the target set as JSON
    #[arg(long)]
    pub json: bool,
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
