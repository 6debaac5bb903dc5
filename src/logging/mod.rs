//! Structured logging & tracing.
//!
//! Provides structured logging via the `tracing` crate with:
//! - Level-based filtering (TRACE/DEBUG/INFO/WARN/ERROR)
//! - Per-module filters for the generation stages
//! - Timing spans around whole generation runs
//! - Idempotent initialization (first call wins)

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Once;
use std::time::Instant;
use tracing_subscriber::EnvFilter;

use crate::error::GenerationError;

/// Log level for the dungeon core
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }

    pub fn all_levels() -> Vec<LogLevel> {
        vec![
            LogLevel::Trace,
            LogLevel::Debug,
            LogLevel::Info,
            LogLevel::Warn,
            LogLevel::Error,
        ]
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LogLevel {
    type Err = GenerationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        LogLevel::all_levels()
            .into_iter()
            .find(|level| level.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| GenerationError::InvalidConfig(format!("unknown log level '{s}'")))
    }
}

/// Configuration for tracing initialization
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TracingConfig {
    pub default_level: LogLevel,
    pub module_filters: Vec<(String, LogLevel)>,
    pub show_thread_ids: bool,
    pub show_targets: bool,
    pub show_file_line: bool,
}

impl Default for TracingConfig {
    fn default() -> Self {
        Self {
            default_level: LogLevel::Info,
            module_filters: vec![
                ("dungeon_core::generation".to_string(), LogLevel::Info),
                ("dungeon_core::generation::bsp".to_string(), LogLevel::Warn),
                ("dungeon_core::generation::hallways".to_string(), LogLevel::Warn),
            ],
            show_thread_ids: false,
            show_targets: true,
            show_file_line: false,
        }
    }
}

impl TracingConfig {
    /// Everything at `level`, module filters dropped
    pub fn with_level(level: LogLevel) -> Self {
        Self {
            default_level: level,
            module_filters: Vec::new(),
            ..Self::default()
        }
    }

    pub fn to_env_filter_string(&self) -> String {
        let mut parts = vec![self.default_level.as_str().to_string()];
        for (module, level) in &self.module_filters {
            parts.push(format!("{}={}", module, level.as_str()));
        }
        parts.join(",")
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }

    pub fn from_json(json: &str) -> Option<Self> {
        serde_json::from_str(json).ok()
    }
}

static TRACING_INIT: Once = Once::new();

/// Initialize tracing with custom config (idempotent, first call wins).
/// `RUST_LOG` takes precedence over the config's filters when set.
pub fn init_tracing(config: &TracingConfig) {
    let config = config.clone();
    TRACING_INIT.call_once(move || {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(config.to_env_filter_string()));

        let subscriber = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .with_target(config.show_targets)
            .with_thread_ids(config.show_thread_ids)
            .with_file(config.show_file_line)
            .with_line_number(config.show_file_line)
            .compact();

        // Ignore error if a global subscriber is already set (e.g. by a test harness)
        let _ = subscriber.try_init();
    });
}

/// Named span for timing an operation.
/// Logs the elapsed time at DEBUG when dropped.
pub struct TimingSpan {
    name: String,
    started: Instant,
    _span: tracing::span::EnteredSpan,
}

impl TimingSpan {
    pub fn new(name: &str) -> Self {
        let span = tracing::info_span!("operation", name = name);
        Self {
            name: name.to_string(),
            started: Instant::now(),
            _span: span.entered(),
        }
    }

    pub fn elapsed_ms(&self) -> f64 {
        self.started.elapsed().as_secs_f64() * 1000.0
    }
}

impl Drop for TimingSpan {
    fn drop(&mut self) {
        tracing::debug!(operation = %self.name, elapsed_ms = self.elapsed_ms(), "Operation finished");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_level_as_str() {
        assert_eq!(LogLevel::Trace.as_str(), "trace");
        assert_eq!(LogLevel::Debug.as_str(), "debug");
        assert_eq!(LogLevel::Info.as_str(), "info");
        assert_eq!(LogLevel::Warn.as_str(), "warn");
        assert_eq!(LogLevel::Error.as_str(), "error");
    }

    #[test]
    fn test_log_level_from_str() {
        assert_eq!("debug".parse::<LogLevel>().unwrap(), LogLevel::Debug);
        assert_eq!("WARN".parse::<LogLevel>().unwrap(), LogLevel::Warn);
        assert!(matches!(
            "loud".parse::<LogLevel>(),
            Err(GenerationError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_all_levels() {
        let levels = LogLevel::all_levels();
        assert_eq!(levels.len(), 5);
    }

    #[test]
    fn test_env_filter_string() {
        let filter = TracingConfig::default().to_env_filter_string();
        assert!(filter.starts_with("info"));
        assert!(filter.contains("dungeon_core::generation=info"));
        assert!(filter.contains("dungeon_core::generation::bsp=warn"));
    }

    #[test]
    fn test_with_level_drops_module_filters() {
        let config = TracingConfig::with_level(LogLevel::Trace);
        assert_eq!(config.to_env_filter_string(), "trace");
        assert!(config.show_targets);
    }

    #[test]
    fn test_tracing_config_json_roundtrip() {
        let config = TracingConfig::default();
        let json = config.to_json();
        assert!(!json.is_empty());
        let restored = TracingConfig::from_json(&json).unwrap();
        assert_eq!(restored, config);
        assert!(TracingConfig::from_json("{not json").is_none());
    }

    #[test]
    fn test_init_tracing_idempotent() {
        // Should not panic when called multiple times
        init_tracing(&TracingConfig::default());
        init_tracing(&TracingConfig::default());
        init_tracing(&TracingConfig::with_level(LogLevel::Debug));
    }

    #[test]
    fn test_timing_span() {
        init_tracing(&TracingConfig::default());
        let span = TimingSpan::new("test_operation");
        let sum: u64 = (0..100).sum();
        assert_eq!(sum, 4950);
        assert!(span.elapsed_ms() >= 0.0);
    }
}
