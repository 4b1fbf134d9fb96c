//! mode-agent: daemon front end for `mode-ctrl`
//!
//! Parses the command line, sets up logging, turns signals and config-file
//! changes into triggers, and drives a [`mode_ctrl::Controller`] from a
//! single event loop.

pub mod check;
pub mod cli;
pub mod daemon;
pub mod tracing_support;
pub mod triggers;

pub use cli::{Cli, Command};
pub use tracing_support::{init_subscriber, init_subscriber_with_config, TracingConfig, TracingFormat};
pub use triggers::{ConfigWatcher, Trigger, WatcherConfig, WatcherError};
