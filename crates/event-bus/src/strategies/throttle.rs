//! Throttle dispatch.
//!
//! Leading edge: the first emit on a key is delivered immediately and opens
//! a window (`metadata.throttleDelay` ms, or the default). Emits inside the
//! window are dropped and logged as throttled.

use parking_lot::Mutex;
use serde_json::json;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use super::timed::TimedCore;
use super::{DispatchStrategy, StrategyKind};
use crate::domain::{Event, Listener, META_THROTTLE_DELAY};
use crate::error::StrategyError;
use crate::metrics::{DropReason, MetricsRecorder, NoOpMetrics};
use crate::ports::{Direction, EventLogger};

pub const DEFAULT_THROTTLE_WINDOW: Duration = Duration::from_millis(1000);

pub struct ThrottleStrategy {
    core: Arc<TimedCore>,
    throttled: Arc<Mutex<HashSet<String>>>,
    metrics: Arc<dyn MetricsRecorder>,
    default_window: Duration,
}

impl ThrottleStrategy {
    /// Must be called from within a tokio runtime.
    pub fn new(logger: Arc<dyn EventLogger>) -> Result<Self, StrategyError> {
        Self::with_window(logger, DEFAULT_THROTTLE_WINDOW)
    }

    pub fn with_window(
        logger: Arc<dyn EventLogger>,
        default_window: Duration,
    ) -> Result<Self, StrategyError> {
        Ok(Self {
            core: TimedCore::new(StrategyKind::Throttle, logger)?,
            throttled: Arc::new(Mutex::new(HashSet::new())),
            metrics: Arc::new(NoOpMetrics),
            default_window,
        })
    }

    /// Report throttled drops to `metrics`.
    #[must_use]
    pub fn with_metrics(mut self, metrics: Arc<dyn MetricsRecorder>) -> Self {
        self.metrics = metrics;
        self
    }

    /// Whether `key` is inside an open window.
    #[must_use]
    pub fn is_throttled(&self, key: &str) -> bool {
        self.throttled.lock().contains(key)
    }
}

impl DispatchStrategy for ThrottleStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Throttle
    }

    fn subscribe(&self, key: &str, listener: Listener) {
        self.core.subscribe(key, listener);
    }

    fn unsubscribe(&self, key: &str, listener: &Listener) {
        self.core.unsubscribe(key, listener);
    }

    fn emit(&self, key: &str, event: &Event) -> usize {
        if !self.throttled.lock().insert(key.to_string()) {
            self.core
                .log(key, &json!({ "payload": event.payload }), Direction::Throttled);
            self.metrics.record_drop(key, DropReason::Throttled);
            return 0;
        }

        let delivered = self.core.deliver(key, event);

        let window = event
            .metadata_duration(META_THROTTLE_DELAY)
            .unwrap_or(self.default_window);
        let throttled = self.throttled.clone();
        let owned_key = key.to_string();
        self.core.runtime().spawn(async move {
            tokio::time::sleep(window).await;
            throttled.lock().remove(&owned_key);
        });

        delivered
    }
}
