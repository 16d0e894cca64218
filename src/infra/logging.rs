//! Logging utilities
//!
//! Diagnostics go through `tracing` to stderr so they never interleave with
//! the report on stdout.

use tracing::Level;
use tracing_subscriber::EnvFilter;

/// Level used when neither `RUST_LOG` nor `--log-level` says otherwise.
pub const DEFAULT_LOG_LEVEL: LogLevel = LogLevel::Warn;

/// Log level configuration
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn to_tracing_level(self) -> Level {
        match self {
            LogLevel::Trace => Level::TRACE,
            LogLevel::Debug => Level::DEBUG,
            LogLevel::Info => Level::INFO,
            LogLevel::Warn => Level::WARN,
            LogLevel::Error => Level::ERROR,
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "trace" => Some(LogLevel::Trace),
            "debug" => Some(LogLevel::Debug),
            "info" => Some(LogLevel::Info),
            "warn" | "warning" => Some(LogLevel::Warn),
            "error" => Some(LogLevel::Error),
            _ => None,
        }
    }
}

/// Builds the filter: an explicit level wins, then `RUST_LOG`, then the
/// default level for this crate.
pub fn build_filter(level: Option<LogLevel>) -> EnvFilter {
    match level {
        Some(level) => EnvFilter::new(directive(level)),
        None => EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(directive(DEFAULT_LOG_LEVEL))),
    }
}

fn directive(level: LogLevel) -> String {
    format!("poly_runner={}", level.to_tracing_level())
}

/// Initialize the logger. Calling it again is a no-op.
pub fn init_logger(level: Option<LogLevel>) {
    let result = tracing_subscriber::fmt()
        .with_env_filter(build_filter(level))
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .try_init();
    if result.is_err() {
        tracing::debug!("logger already initialized");
    }
}
