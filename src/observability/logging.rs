//! Structured logging.
//!
//! # Responsibilities
//! - Initialize logging subsystem
//! - Configure log level at runtime
//!
//! # Design Decisions
//! - Uses tracing crate for structured logging
//! - The level filter sits behind a reload layer so it can change without restarting
//! - `RUST_LOG` wins at startup when set
//! - Invalid level names are rejected and the previous level stays in force

use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

use tracing_subscriber::{
    layer::SubscriberExt, reload, util::SubscriberInitExt, EnvFilter, Registry,
};

/// Recognized log levels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogLevel {
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }

    /// Filter directive: the chosen level for this crate, hyper internals kept quiet.
    fn directive(&self) -> String {
        format!("{},hyper=warn,hyper_util=warn", self.as_str())
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid log level {0:?} (expected debug, info, warn or error)")]
pub struct InvalidLogLevel(pub String);

impl FromStr for LogLevel {
    type Err = InvalidLogLevel;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "debug" => Ok(LogLevel::Debug),
            "info" => Ok(LogLevel::Info),
            "warn" | "warning" => Ok(LogLevel::Warn),
            "error" => Ok(LogLevel::Error),
            _ => Err(InvalidLogLevel(s.to_string())),
        }
    }
}

static FILTER_HANDLE: OnceLock<reload::Handle<EnvFilter, Registry>> = OnceLock::new();

/// Install the global subscriber. Returns false if one was already installed.
pub fn init(level: LogLevel) -> bool {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level.directive()));
    let (filter, handle) = reload::Layer::new(filter);

    let installed = tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .try_init()
        .is_ok();

    if installed {
        let _ = FILTER_HANDLE.set(handle);
    }
    installed
}

/// Swap the active filter. Does nothing until [`init`] has installed the subscriber.
pub fn apply_level(level: LogLevel) {
    let Some(handle) = FILTER_HANDLE.get() else {
        return;
    };
    if let Err(e) = handle.reload(EnvFilter::new(level.directive())) {
        tracing::warn!(error = %e, "Failed to reload log filter");
    }
}

/// The filter currently in force, or `None` before [`init`].
pub fn active_filter() -> Option<String> {
    FILTER_HANDLE.get()?.with_current(|filter| filter.to_string()).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_levels() {
        assert_eq!("debug".parse(), Ok(LogLevel::Debug));
        assert_eq!("INFO".parse(), Ok(LogLevel::Info));
        assert_eq!(" warn ".parse(), Ok(LogLevel::Warn));
        assert_eq!("error".parse(), Ok(LogLevel::Error));
        assert!("verbose".parse::<LogLevel>().is_err());
        assert!("".parse::<LogLevel>().is_err());
    }

    #[test]
    fn test_apply_before_init_is_noop() {
        apply_level(LogLevel::Error);
    }
}
