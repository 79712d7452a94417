//! CLI argument definitions using clap.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Kirb Relay - reposts one Twitter account into Discord channels
#[derive(Parser, Debug)]
#[command(
    name = "kirb-relay",
    author,
    version,
    about = "Relay one Twitter account's posts into Discord guild channels",
    long_about = "Follows a single Twitter account and reposts every original post \n\
                  to the channel each Discord guild has configured.\n\n\
                  Guild administrators pick the channel with `!kb set-kirb-post`."
)]
pub struct Cli {
    /// Increase logging verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true, env = "KIRB_RELAY_VERBOSE")]
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
        env = "KIRB_RELAY_LOG_FORMAT"
    )]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the relay until interrupted
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
    #[arg(short, long, default_value = "kirb.toml", env = "KIRB_RELAY_CONFIG")]
    pub config: PathBuf,

    /// Keep destinations in memory only (lost on exit)
    #[arg(long, conflicts_with = "db_dir")]
    pub mem: bool,

    /// Directory holding the embedded database file `kirb.db`
    #[arg(long, env = "KIRB_RELAY_DB_DIR")]
    pub db_dir: Option<PathBuf>,

    /// Override the reconnect backoff from configuration (seconds)
    #[arg(long, env = "KIRB_RELAY_BACKOFF_SECS")]
    pub backoff_secs: Option<u64>,

    /// Metrics server port (0 = disabled)
    #[arg(long, default_value = "9100", env = "KIRB_RELAY_METRICS_PORT")]
    pub metrics_port: u16,

    /// Buffer size of the gateway to command-handler queue
    #[arg(long, default_value = "64", env = "KIRB_RELAY_COMMAND_BUFFER")]
    pub command_buffer: usize,

    /// Discord bot token
    #[arg(long, env = "DISCORD_TOKEN", hide_env_values = true)]
    pub discord_token: Option<String>,

    /// Twitter API v2 bearer token
    #[arg(long, env = "TWITTER_BEARER_TOKEN", hide_env_values = true)]
    pub twitter_bearer_token: Option<String>,

    /// Validate configuration and exit without connecting
    #[arg(long)]
    pub dry_run: bool,
}

/// Arguments for the `validate` command
#[derive(Parser, Debug)]
pub struct ValidateArgs {
    /// Path to configuration file to validate
    #[arg(short, long, default_value = "kirb.toml")]
    pub config: PathBuf,

    /// Output validation result as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the `info` command
#[derive(Parser, Debug)]
pub struct InfoArgs {
    /// Path to configuration file
    #[arg(short, long, default_value = "kirb.toml")]
    pub config: PathBuf,

    /// Output as JSON
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_defaults() {
        let cli = Cli::try_parse_from(["kirb-relay", "run"]).unwrap();
        let Commands::Run(args) = cli.command else {
            panic!("expected run");
        };
        assert_eq!(args.config, PathBuf::from("kirb.toml"));
        assert_eq!(args.metrics_port, 9100);
        assert!(!args.mem);
        assert!(args.backoff_secs.is_none());
    }

    #[test]
    fn test_mem_conflicts_with_db_dir() {
        let result = Cli::try_parse_from(["kirb-relay", "run", "--mem", "--db-dir", "/data"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli =
            Cli::try_parse_from(["kirb-relay", "validate", "-vv", "--log-format", "json"]).unwrap();
        assert_eq!(cli.verbose, 2);
        assert!(matches!(cli.log_format, LogFormat::Json));
    }
}
