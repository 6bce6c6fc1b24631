//! Tracing subscriber setup. Logs go to stderr so stdout carries only the report.

use clap::ValueEnum;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt;
use tracing_subscriber::layer::SubscriberExt as _;
use tracing_subscriber::util::SubscriberInitExt as _;

use crate::error::Error;

/// Environment variable that overrides the verbosity flags.
const FILTER_ENV: &str = "DOCDRIFT_LOG";

/// Log line format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    /// One JSON object per event.
    Json,
    /// Human-readable lines.
    #[default]
    Pretty,
}

/// Filter directive for a `-v` count.
const fn default_level(verbosity: u8) -> &'static str {
    return match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
}

/// Install the global subscriber. `DOCDRIFT_LOG` wins over `verbosity`.
///
/// # Errors
///
/// Returns `Error::Logging` if a subscriber is already installed or the
/// filter directive is malformed.
pub fn init(verbosity: u8, format: LogFormat) -> Result<(), Error> {
    let filter = match std::env::var(FILTER_ENV) {
        Ok(directive) if !directive.trim().is_empty() => {
            EnvFilter::try_new(&directive).map_err(|e| return Error::Logging { reason: format!("{FILTER_ENV}: {e}") })?
        },
        _ => EnvFilter::new(default_level(verbosity)),
    };

    let registry = tracing_subscriber::registry().with(filter);
    let installed = match format {
        LogFormat::Json => registry
            .with(fmt::layer().json().with_writer(std::io::stderr).with_target(false))
            .try_init(),
        LogFormat::Pretty => registry
            .with(fmt::layer().with_writer(std::io::stderr).with_target(false).without_time())
            .try_init(),
    };
    return installed.map_err(|e| return Error::Logging { reason: e.to_string() });
}
