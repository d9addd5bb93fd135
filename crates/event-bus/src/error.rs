//! Error types for the event bus.
//!
//! Internal delivery problems never surface to producers; these types are
//! what gets reported to the [`ErrorNotifier`](crate::ports::ErrorNotifier)
//! and returned from constructors and configuration parsing.

use thiserror::Error;

/// Errors raised by the coordinator while accepting or delivering events.
#[derive(Debug, Error)]
pub enum BusError {
    #[error("Enqueue failed for event {event}: {source}")]
    Enqueue {
        event: String,
        #[source]
        source: QueueError,
    },

    #[error("Subscriber channel for event {event} is closed")]
    SubscriberGone { event: String },

    #[error("Strategy error: {0}")]
    Strategy(#[from] StrategyError),

    #[error("Event bus requires a {0}")]
    MissingCollaborator(&'static str),
}

/// Queue operation failures.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum QueueError {
    #[error("Queue is full: {len} >= {capacity}")]
    Full { len: usize, capacity: usize },
}

/// Strategy construction and lookup failures.
#[derive(Debug, Error)]
pub enum StrategyError {
    #[error("Unknown strategy type: {0}")]
    Unknown(String),

    #[error("Unknown unicast selection mode: {0}")]
    UnknownUnicastMode(String),

    #[error("Strategy {0} requires a running tokio runtime")]
    NoRuntime(&'static str),

    #[error("Durable store error: {0}")]
    Store(#[from] StoreError),

    #[error("Invalid subscription pattern {pattern}: {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },
}

/// Durable key-value store failures.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid storage key: {0}")]
    InvalidKey(String),
}

/// Failure raised by a listener while handling an event.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct ListenerError {
    message: String,
}

impl ListenerError {
    /// Create a listener error with a message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// The failure message.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Schema construction failures.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SchemaError {
    #[error("Unsupported schema type: {0}")]
    UnsupportedType(String),

    #[error("Schema must be a JSON object")]
    NotAnObject,

    #[error("Unsupported schema keyword: {0}")]
    UnsupportedKeyword(String),

    #[error("Invalid value for schema keyword '{keyword}': {reason}")]
    InvalidKeyword { keyword: String, reason: String },
}

/// Configuration parsing failures.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Unknown log level: {0}")]
    UnknownLogLevel(String),

    #[error("Unknown log output: {0}")]
    UnknownLogOutput(String),
}
