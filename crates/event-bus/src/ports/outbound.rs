//! Outbound Ports (Driven Ports)
//!
//! Collaborators the bus depends on but does not own: the logging sink, the
//! payload validator, the error notifier and the durable key-value store.
//! Reference implementations live in `middleware/` and `adapters/`.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

use crate::error::{ConfigError, StoreError};

/// What the bus was doing when it logged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Emit,
    Receive,
    Subscribe,
    Unsubscribe,
    Schedule,
    Throttled,
}

impl Direction {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Emit => "emit",
            Self::Receive => "receive",
            Self::Subscribe => "subscribe",
            Self::Unsubscribe => "unsubscribe",
            Self::Schedule => "schedule",
            Self::Throttled => "throttled",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Severity of a log entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LogLevel {
    Info,
    Debug,
    Error,
}

impl LogLevel {
    pub const ALL: [LogLevel; 3] = [LogLevel::Info, LogLevel::Debug, LogLevel::Error];

    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Info => "INFO",
            Self::Debug => "DEBUG",
            Self::Error => "ERROR",
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LogLevel {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "INFO" => Ok(Self::Info),
            "DEBUG" => Ok(Self::Debug),
            "ERROR" => Ok(Self::Error),
            other => Err(ConfigError::UnknownLogLevel(other.to_string())),
        }
    }
}

/// Side of the bus an error was raised on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ErrorDirection {
    Emit,
    Receive,
}

/// Structured logging sink.
pub trait EventLogger: Send + Sync {
    /// Record one step of an event's life.
    fn handle(&self, event_name: &str, payload: &Value, direction: Direction, level: LogLevel);
}

/// A compiled payload schema.
pub trait PayloadSchema: Send + Sync {
    /// `Ok` when the payload conforms, otherwise the list of violations.
    fn check(&self, payload: &Value) -> Result<(), Vec<String>>;
}

impl<F> PayloadSchema for F
where
    F: Fn(&Value) -> Result<(), Vec<String>> + Send + Sync,
{
    fn check(&self, payload: &Value) -> Result<(), Vec<String>> {
        self(payload)
    }
}

/// Payload validation by event name.
pub trait PayloadValidator: Send + Sync {
    /// Register (or replace) the schema for an event name.
    fn add_schema(&self, event_name: &str, schema: Box<dyn PayloadSchema>);

    /// Whether the payload is acceptable for `event_name`.
    fn validate(&self, event_name: &str, payload: &Value) -> bool;
}

/// Error reporting sink.
pub trait ErrorNotifier: Send + Sync {
    fn handle_error(
        &self,
        event_name: &str,
        error: &(dyn std::error::Error + 'static),
        direction: ErrorDirection,
    );
}

/// Durable key-value store holding serialized logs.
pub trait DurableStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;

    fn clear(&self, key: &str) -> Result<(), StoreError>;
}
