//! # Events
//!
//! The immutable record that flows through the bus. Only `name` is interpreted
//! for dispatch; `metadata` carries strategy hints (`priority`, `delay`,
//! `debounceDelay`, `throttleDelay`), everything else is informational.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::time::Duration;

/// Metadata key holding a queue priority.
pub const META_PRIORITY: &str = "priority";
/// Metadata key overriding the delayed strategy's delay (ms).
pub const META_DELAY: &str = "delay";
/// Metadata key overriding the debounce window (ms).
pub const META_DEBOUNCE_DELAY: &str = "debounceDelay";
/// Metadata key overriding the throttle window (ms).
pub const META_THROTTLE_DELAY: &str = "throttleDelay";

/// Broad classification of an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum EventCategory {
    /// Business facts (`OrderCreated`, `ProductPriceChanged`).
    #[default]
    Domain,
    /// Application plumbing (`CacheInvalidated`, `ServiceStarted`).
    System,
    /// Direct user interaction (`ButtonClicked`, `FormSubmitted`).
    User,
}

/// An event published to the bus.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    /// Dispatch key.
    pub name: String,
    /// Milliseconds since the Unix epoch; filled in at emit time when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<i64>,
    /// Opaque payload.
    #[serde(default)]
    pub payload: Value,
    #[serde(default)]
    pub category: EventCategory,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub metadata: Map<String, Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub correlation_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aggregate_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<u32>,
}

impl Event {
    /// Create a domain event with the given name and payload.
    pub fn new(name: impl Into<String>, payload: impl Into<Value>) -> Self {
        Self {
            name: name.into(),
            timestamp: None,
            payload: payload.into(),
            category: EventCategory::Domain,
            metadata: Map::new(),
            priority: None,
            correlation_id: None,
            aggregate_id: None,
            version: None,
        }
    }

    /// Create an event whose payload is serialized from `payload`.
    pub fn with_payload<T: Serialize>(
        name: impl Into<String>,
        payload: &T,
    ) -> Result<Self, serde_json::Error> {
        Ok(Self::new(name, serde_json::to_value(payload)?))
    }

    #[must_use]
    pub fn category(mut self, category: EventCategory) -> Self {
        self.category = category;
        self
    }

    #[must_use]
    pub fn timestamp(mut self, timestamp: i64) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    /// Attach a metadata entry.
    #[must_use]
    pub fn meta(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    #[must_use]
    pub fn priority(mut self, priority: f64) -> Self {
        self.priority = Some(priority);
        self
    }

    #[must_use]
    pub fn correlation_id(mut self, id: impl Into<String>) -> Self {
        self.correlation_id = Some(id.into());
        self
    }

    #[must_use]
    pub fn aggregate_id(mut self, id: impl Into<String>) -> Self {
        self.aggregate_id = Some(id.into());
        self
    }

    #[must_use]
    pub fn version(mut self, version: u32) -> Self {
        self.version = Some(version);
        self
    }

    /// Fill in the timestamp with the current time if it is missing.
    #[must_use]
    pub fn stamped(mut self) -> Self {
        if self.timestamp.is_none() {
            self.timestamp = Some(chrono::Utc::now().timestamp_millis());
        }
        self
    }

    /// Queue priority: explicit `priority`, else numeric `metadata.priority`, else 0.
    /// NaN and infinite priorities resolve to 0.
    #[must_use]
    pub fn resolved_priority(&self) -> f64 {
        self.priority
            .or_else(|| self.metadata.get(META_PRIORITY).and_then(Value::as_f64))
            .filter(|priority| priority.is_finite())
            .unwrap_or(0.0)
    }

    /// A positive millisecond duration stored under `key`.
    ///
    /// Zero, negative and non-numeric values count as absent, so the caller's
    /// default applies.
    #[must_use]
    pub fn metadata_duration(&self, key: &str) -> Option<Duration> {
        let millis = self.metadata.get(key)?.as_f64()?;
        (millis > 0.0).then(|| Duration::from_millis(millis as u64))
    }

    /// Deserialize the payload into a concrete type.
    pub fn payload_as<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        T::deserialize(&self.payload)
    }
}

/// Trait for items ordered by a numeric priority.
pub trait Prioritized {
    fn priority(&self) -> f64;
}

/// An event paired with its resolved queue priority.
#[derive(Debug, Clone, PartialEq)]
pub struct PriorityEvent {
    pub event: Event,
    pub priority: f64,
}

impl PriorityEvent {
    /// Resolve the event's priority and wrap it.
    pub fn from_event(event: Event) -> Self {
        let priority = event.resolved_priority();
        Self { event, priority }
    }
}

impl Prioritized for PriorityEvent {
    fn priority(&self) -> f64 {
        self.priority
    }
}

impl From<PriorityEvent> for Event {
    fn from(value: PriorityEvent) -> Self {
        value.event
    }
}
