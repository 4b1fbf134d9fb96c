//! Command-line interface

use crate::tracing_support::{TracingConfig, TracingFormat};
use clap::{Parser, Subcommand};
use mode_ctrl::{ControllerConfig, DEFAULT_CONFIG_PATH};
use std::path::PathBuf;
use std::time::Duration;

/// Keep a configured set of executables locked out.
///
/// Send SIGUSR2 to re-read the config, SIGTERM or SIGINT to restore every
/// file and exit.
#[derive(Debug, Parser)]
#[command(name = "mode_agent", version, about)]
pub struct Cli {
    /// Path list to control, one path per line
    #[arg(long, env = "MODE_CTRL_CONFIG", default_value = DEFAULT_CONFIG_PATH, global = true)]
    pub config: PathBuf,

    /// Milliseconds between enforcement ticks
    #[arg(long, default_value_t = 10, value_parser = clap::value_parser!(u64).range(1..))]
    pub interval_ms: u64,

    /// Start even if no listed path can be controlled
    #[arg(long)]
    pub allow_empty: bool,

    /// Also reload when the config file changes on disk
    #[arg(long)]
    pub watch_config: bool,

    /// Log output format
    #[arg(long, value_enum, default_value_t = TracingFormat::Compact, global = true)]
    pub log_format: TracingFormat,

    /// Log level (overrides RUST_LOG)
    #[arg(long, global = true)]
    pub log_level: Option<tracing::Level>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Subcommand)]
pub enum Command {
    /// Run the daemon (default)
    Run,
    /// Report what the config would control, without changing any mode
    Check,
}

impl Cli {
    pub fn command(&self) -> Command {
        self.command.unwrap_or(Command::Run)
    }

    pub fn controller_config(&self) -> ControllerConfig {
        ControllerConfig {
            interval: Duration::from_millis(self.interval_ms),
            allow_empty_start: self.allow_empty,
        }
    }

    pub fn tracing_config(&self) -> TracingConfig {
        TracingConfig {
            level: self.log_level,
            format: self.log_format,
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cli = Cli::try_parse_from(["mode_agent"]).unwrap();
        assert_eq!(cli.command(), Command::Run);
        assert_eq!(cli.interval_ms, 10);
        assert!(!cli.allow_empty);

        let config = cli.controller_config();
        assert_eq!(config.interval, Duration::from_millis(10));
        assert!(!config.allow_empty_start);
    }

    #[test]
    fn test_flags() {
        let cli = Cli::try_parse_from([
            "mode_agent",
            "--config",
            "/tmp/list",
            "--interval-ms",
            "250",
            "--allow-empty",
            "--log-format",
            "json",
            "--log-level",
            "debug",
            "check",
        ])
        .unwrap();

        assert_eq!(cli.config, PathBuf::from("/tmp/list"));
        assert_eq!(cli.command(), Command::Check);
        assert!(cli.controller_config().allow_empty_start);
        assert_eq!(cli.controller_config().interval, Duration::from_millis(250));
        assert_eq!(cli.tracing_config().format, TracingFormat::Json);
        assert_eq!(cli.tracing_config().level, Some(tracing::Level::DEBUG));
    }

    #[test]
    fn test_zero_interval_rejected() {
        assert!(Cli::try_parse_from(["mode_agent", "--interval-ms", "0"]).is_err());
    }
}
