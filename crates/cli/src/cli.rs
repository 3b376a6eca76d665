//! CLI argument definitions using clap.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use std::time::Duration;

/// Hirer Lookup - finds hire and lease vehicles and publishes the matches
#[derive(Parser, Debug)]
#[command(
    name = "hirer-lookup",
    author,
    version,
    about = "Concurrent hirer vehicle lookup pipeline",
    long_about = "Fetches the vehicle listing, searches every configured lookup endpoint \n\
                  concurrently for each vehicle, and publishes the first hirer match \n\
                  to a Pub/Sub topic."
)]
pub struct Cli {
    /// Increase logging verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true, env = "HIRER_LOOKUP_VERBOSE")]
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
        env = "HIRER_LOOKUP_LOG_FORMAT"
    )]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Default log level from the verbosity flags (RUST_LOG still wins)
    pub fn default_log_level(&self) -> &'static str {
        if self.quiet {
            return "warn";
        }
        match self.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    }

    /// Prometheus port, only meaningful for `run`
    pub fn metrics_port(&self) -> Option<u16> {
        match &self.command {
            Commands::Run(args) if args.metrics_port != 0 => Some(args.metrics_port),
            _ => None,
        }
    }
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the lookup pipeline
    Run(RunArgs),

    /// Validate configuration without running
    Validate(ValidateArgs),

    /// Display the resolved configuration
    Info(InfoArgs),
}

/// Arguments for the `run` command
#[derive(Parser, Debug, Clone)]
pub struct RunArgs {
    /// Optional configuration file (TOML or JSON), layered under the environment
    #[arg(short, long, env = "HIRER_LOOKUP_CONFIG")]
    pub config: Option<PathBuf>,

    /// Override the worker count
    #[arg(short, long)]
    pub workers: Option<usize>,

    /// Override the per-search deadline (e.g. "5s", "750ms")
    #[arg(long, value_parser = humantime::parse_duration)]
    pub search_timeout: Option<Duration>,

    /// Metrics server port (0 = disabled)
    #[arg(long, default_value = "0", env = "HIRER_LOOKUP_METRICS_PORT")]
    pub metrics_port: u16,

    /// Search as usual but log matches instead of publishing them
    #[arg(long)]
    pub dry_run: bool,
}

/// Arguments for the `validate` command
#[derive(Parser, Debug)]
pub struct ValidateArgs {
    /// Optional configuration file to validate together with the environment
    #[arg(short, long, env = "HIRER_LOOKUP_CONFIG")]
    pub config: Option<PathBuf>,

    /// Output validation result as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the `info` command
#[derive(Parser, Debug)]
pub struct InfoArgs {
    /// Optional configuration file
    #[arg(short, long, env = "HIRER_LOOKUP_CONFIG")]
    pub config: Option<PathBuf>,

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
    fn test_run_overrides_parse() {
        let cli = Cli::parse_from([
            "hirer-lookup",
            "-v",
            "run",
            "--workers",
            "3",
            "--search-timeout",
            "750ms",
            "--metrics-port",
            "9100",
        ]);

        assert_eq!(cli.default_log_level(), "debug");
        assert_eq!(cli.metrics_port(), Some(9100));
        match cli.command {
            Commands::Run(args) => {
                assert_eq!(args.workers, Some(3));
                assert_eq!(args.search_timeout, Some(Duration::from_millis(750)));
                assert!(!args.dry_run);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_quiet_and_metrics_disabled() {
        let cli = Cli::parse_from(["hirer-lookup", "-q", "validate", "--json"]);
        assert_eq!(cli.default_log_level(), "warn");
        assert_eq!(cli.metrics_port(), None);
    }

    #[test]
    fn test_bad_duration_rejected() {
        let result = Cli::try_parse_from(["hirer-lookup", "run", "--search-timeout", "soon"]);
        assert!(result.is_err());
    }
}
