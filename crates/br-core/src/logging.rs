//! Logging setup shared by the binary entry points.
//!
//! Two output styles, both on stderr so stdout stays reserved for command
//! payloads: a human format for interactive use and a JSON format for
//! supervised deployments. `BATREC_LOG` (or the standard `RUST_LOG`)
//! overrides the level derived from CLI flags.

use std::io::{stderr, IsTerminal};

use clap::ValueEnum;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// Environment variable consulted before the standard `RUST_LOG`.
pub const LOG_ENV_VAR: &str = "BATREC_LOG";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum LogFormat {
    /// Compact human-readable lines.
    #[default]
    Human,
    /// One JSON object per event.
    Json,
}

/// Map `-v`/`-q` flags to a default level directive.
pub fn level_from_flags(verbose: u8, quiet: bool) -> &'static str {
    if quiet {
        "error"
    } else {
        match verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    }
}

/// Install the global subscriber. Later calls are ignored, which keeps
/// tests that drive entry points in-process from panicking.
pub fn init_logging(level: &str, format: LogFormat) {
    let filter = EnvFilter::try_from_env(LOG_ENV_VAR)
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new(level));

    match format {
        LogFormat::Human => {
            let layer = tracing_subscriber::fmt::layer()
                .with_writer(stderr)
                .with_target(false)
                .with_ansi(stderr().is_terminal());
            let _ = tracing_subscriber::registry()
                .with(filter)
                .with(layer)
                .try_init();
        }
        LogFormat::Json => {
            let layer = tracing_subscriber::fmt::layer()
                .json()
                .with_writer(stderr)
                .with_current_span(false);
            let _ = tracing_subscriber::registry()
                .with(filter)
                .with(layer)
                .try_init();
        }
    }
}

/// Short identifier stamped into startup logs so overlapping runs can be
/// told apart in aggregated output.
pub fn generate_run_id() -> String {
    let id = uuid::Uuid::new_v4();
    format!("run-{}", &id.to_string()[..12])
}
