//! Delayed dispatch: every emit is delivered on its own after
//! `metadata.delay` ms (or the default) to the listeners present at that
//! moment.

use std::sync::Arc;
use std::time::Duration;

use super::timed::TimedCore;
use super::{DispatchStrategy, StrategyKind};
use crate::domain::{Event, Listener, META_DELAY};
use crate::error::StrategyError;
use crate::ports::EventLogger;

pub const DEFAULT_DELAY: Duration = Duration::from_millis(1000);

pub struct DelayedStrategy {
    core: Arc<TimedCore>,
    default_delay: Duration,
}

impl DelayedStrategy {
    /// Must be called from within a tokio runtime.
    pub fn new(logger: Arc<dyn EventLogger>) -> Result<Self, StrategyError> {
        Self::with_delay(logger, DEFAULT_DELAY)
    }

    pub fn with_delay(
        logger: Arc<dyn EventLogger>,
        default_delay: Duration,
    ) -> Result<Self, StrategyError> {
        Ok(Self {
            core: TimedCore::new(StrategyKind::Delayed, logger)?,
            default_delay,
        })
    }
}

impl DispatchStrategy for DelayedStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Delayed
    }

    fn subscribe(&self, key: &str, listener: Listener) {
        self.core.subscribe(key, listener);
    }

    fn unsubscribe(&self, key: &str, listener: &Listener) {
        self.core.unsubscribe(key, listener);
    }

    fn emit(&self, key: &str, event: &Event) -> usize {
        let delay = event
            .metadata_duration(META_DELAY)
            .unwrap_or(self.default_delay);
        self.core.log_scheduled(key, event, delay);

        let core = self.core.clone();
        let owned_key = key.to_string();
        let event = event.clone();
        self.core.runtime().spawn(async move {
            tokio::time::sleep(delay).await;
            core.deliver(&owned_key, &event);
        });
        0
    }
}
