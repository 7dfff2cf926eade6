//! Tracing setup for hosts and tests.
//!
//! Filters default to quiet lighting (it runs every tick for every light) and
//! verbose player/collision output, where state transitions are logged at
//! `debug`. `RUST_LOG` always overrides the configured filter.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Once;
use std::time::Instant;

use bevy::prelude::*;
use serde::{Deserialize, Serialize};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TracingConfig {
    pub default_level: LogLevel,
    /// Module path to level, e.g. `cave_core::map` -> `Info`
    pub module_filters: BTreeMap<String, LogLevel>,
    pub show_timestamps: bool,
    pub show_thread_ids: bool,
    pub show_targets: bool,
    pub show_file_line: bool,
}

impl Default for TracingConfig {
    fn default() -> Self {
        Self {
            default_level: LogLevel::Info,
            module_filters: BTreeMap::new(),
            show_timestamps: true,
            show_thread_ids: false,
            show_targets: true,
            show_file_line: false,
        }
        .with_module("cave_core::map", LogLevel::Info)
        .with_module("cave_core::lighting", LogLevel::Warn)
        .with_module("cave_core::player", LogLevel::Debug)
        .with_module("cave_core::collision", LogLevel::Debug)
    }
}

impl TracingConfig {
    pub fn with_module(mut self, module: &str, level: LogLevel) -> Self {
        self.module_filters.insert(module.to_string(), level);
        self
    }

    /// `EnvFilter` directive string: the default level, then one
    /// `module=level` entry per filter
    pub fn to_env_filter_string(&self) -> String {
        std::iter::once(self.default_level.to_string())
            .chain(
                self.module_filters
                    .iter()
                    .map(|(module, level)| format!("{module}={level}")),
            )
            .collect::<Vec<_>>()
            .join(",")
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    pub fn from_json(json: &str) -> Option<Self> {
        serde_json::from_str(json).ok()
    }
}

static TRACING_INIT: Once = Once::new();

pub fn init_tracing_default() {
    init_tracing(&TracingConfig::default());
}

/// Install the global subscriber. Only the first call has any effect, and a
/// subscriber already installed by the host is left alone.
pub fn init_tracing(config: &TracingConfig) {
    let directives = config.to_env_filter_string();
    let config = config.clone();

    TRACING_INIT.call_once(move || {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&directives));
        let subscriber = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(config.show_targets)
            .with_thread_ids(config.show_thread_ids)
            .with_file(config.show_file_line)
            .with_line_number(config.show_file_line)
            .compact();

        let installed = if config.show_timestamps {
            subscriber.try_init().is_ok()
        } else {
            subscriber.without_time().try_init().is_ok()
        };
        if installed {
            tracing::debug!(filter = %directives, "tracing initialized");
        }
    });
}

/// Bevy entry point for [`init_tracing`]. Add it instead of Bevy's own
/// `LogPlugin`.
#[derive(Default)]
pub struct LoggingPlugin {
    pub config: TracingConfig,
}

impl Plugin for LoggingPlugin {
    fn build(&self, _app: &mut App) {
        init_tracing(&self.config);
    }
}

/// Keeps a span entered while alive and logs the elapsed time on drop
pub struct TimingSpan {
    name: String,
    started: Instant,
    _span: tracing::span::EnteredSpan,
}

impl TimingSpan {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            started: Instant::now(),
            _span: tracing::info_span!("timed", op = name).entered(),
        }
    }

    pub fn elapsed_ms(&self) -> f64 {
        self.started.elapsed().as_secs_f64() * 1000.0
    }
}

impl Drop for TimingSpan {
    fn drop(&mut self) {
        tracing::debug!(op = %self.name, elapsed_ms = self.elapsed_ms(), "done");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_display() {
        assert_eq!(LogLevel::Trace.to_string(), "trace");
        assert_eq!(LogLevel::Warn.to_string(), "warn");
        assert!(LogLevel::Debug < LogLevel::Error);
    }

    #[test]
    fn test_default_filter_directives() {
        let filter = TracingConfig::default().to_env_filter_string();
        assert!(filter.starts_with("info,"));
        assert!(filter.contains("cave_core::lighting=warn"));
        assert!(filter.contains("cave_core::player=debug"));
        assert!(filter.contains("cave_core::map=info"));
    }

    #[test]
    fn test_with_module_overrides_existing_entry() {
        let config = TracingConfig::default().with_module("cave_core::lighting", LogLevel::Trace);
        assert_eq!(config.module_filters.len(), 4);
        assert!(config.to_env_filter_string().contains("cave_core::lighting=trace"));
    }

    #[test]
    fn test_json_round_trip() {
        let config = TracingConfig::default().with_module("cave_core::engine", LogLevel::Error);
        let restored = TracingConfig::from_json(&config.to_json().unwrap()).unwrap();
        assert_eq!(restored, config);
        assert!(TracingConfig::from_json("not json").is_none());
    }

    #[test]
    fn test_repeated_init_is_harmless() {
        init_tracing_default();
        init_tracing(&TracingConfig {
            show_timestamps: false,
            ..TracingConfig::default()
        });
    }

    #[test]
    fn test_timing_span_measures() {
        init_tracing_default();
        let span = TimingSpan::new("level_build");
        assert!(span.elapsed_ms() >= 0.0);
    }
}
