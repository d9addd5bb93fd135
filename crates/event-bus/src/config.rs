//! Bus configuration from environment variables.

use std::env;
use tracing::warn;

use crate::middleware::{LogOutput, LoggingConfig};
use crate::ports::LogLevel;
use crate::strategies::{StrategyKind, UnicastMode};

pub const DEFAULT_BATCH_SIZE: usize = 1;

/// Coordinator configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BusConfig {
    /// Strategy installed at construction
    pub strategy: StrategyKind,

    /// Target selection used when the unicast strategy is created
    pub unicast_mode: UnicastMode,

    /// Drain the priority queue instead of the FIFO queue
    pub priority_mode: bool,

    /// Events delivered per drained batch (at least 1)
    pub batch_size: usize,

    /// Maximum queued events; `None` is unbounded
    pub queue_capacity: Option<usize>,

    /// Settings for the reference logger
    pub logging: LoggingConfig,
}

impl Default for BusConfig {
    fn default() -> Self {
        Self {
            strategy: StrategyKind::Stateless,
            unicast_mode: UnicastMode::First,
            priority_mode: false,
            batch_size: DEFAULT_BATCH_SIZE,
            queue_capacity: None,
            logging: LoggingConfig::default(),
        }
    }
}

impl BusConfig {
    /// Create configuration from environment variables.
    ///
    /// # Environment Variables
    ///
    /// - `EVENT_BUS_STRATEGY`: strategy identifier (default: stateless)
    /// - `EVENT_BUS_UNICAST_MODE`: first, round-robin or random (default: first)
    /// - `EVENT_BUS_PRIORITY_MODE`: drain by priority (default: false)
    /// - `EVENT_BUS_BATCH_SIZE`: events per batch (default: 1)
    /// - `EVENT_BUS_QUEUE_CAPACITY`: queue bound (default: unbounded)
    /// - `EVENT_BUS_LOG_ENABLED`: enable the logger (default: true)
    /// - `EVENT_BUS_LOG_LEVELS`: comma-separated levels (default: INFO,DEBUG,ERROR)
    /// - `EVENT_BUS_LOG_OUTPUT`: console, server or both (default: console)
    /// - `EVENT_BUS_LOG_SERVER_URL`: endpoint for server output
    ///
    /// Values that do not parse are logged and replaced by the default.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Same as [`from_env`](Self::from_env) with a custom variable source.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        Self {
            strategy: parse_or(&lookup, "EVENT_BUS_STRATEGY", defaults.strategy),

            unicast_mode: parse_or(&lookup, "EVENT_BUS_UNICAST_MODE", defaults.unicast_mode),

            priority_mode: lookup("EVENT_BUS_PRIORITY_MODE")
                .map(|v| is_truthy(&v))
                .unwrap_or(defaults.priority_mode),

            batch_size: parse_or(&lookup, "EVENT_BUS_BATCH_SIZE", defaults.batch_size).max(1),

            queue_capacity: lookup("EVENT_BUS_QUEUE_CAPACITY")
                .and_then(|v| v.trim().parse().ok())
                .filter(|capacity| *capacity > 0),

            logging: LoggingConfig {
                enable_logging: lookup("EVENT_BUS_LOG_ENABLED")
                    .map(|v| v.to_lowercase() != "false" && v != "0")
                    .unwrap_or(defaults.logging.enable_logging),

                log_levels: lookup("EVENT_BUS_LOG_LEVELS")
                    .map(|v| parse_levels(&v))
                    .unwrap_or(defaults.logging.log_levels),

                output: parse_or(&lookup, "EVENT_BUS_LOG_OUTPUT", LogOutput::default()),

                server_url: lookup("EVENT_BUS_LOG_SERVER_URL").filter(|url| !url.is_empty()),
            },
        }
    }
}

fn is_truthy(value: &str) -> bool {
    value.to_lowercase() == "true" || value == "1"
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> T
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    let Some(raw) = lookup(key) else {
        return default;
    };
    match raw.trim().parse() {
        Ok(value) => value,
        Err(e) => {
            warn!(key, value = %raw, error = %e, "Ignoring invalid configuration value");
            default
        }
    }
}

fn parse_levels(raw: &str) -> Vec<LogLevel> {
    raw.split(',')
        .filter(|part| !part.trim().is_empty())
        .filter_map(|part| match part.parse() {
            Ok(level) => Some(level),
            Err(e) => {
                warn!(value = part, error = %e, "Ignoring unknown log level");
                None
            }
        })
        .collect()
}
