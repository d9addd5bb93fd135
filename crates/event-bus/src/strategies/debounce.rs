//! Debounce dispatch.
//!
//! Each emit on a key replaces the pending event and restarts that key's
//! timer. When the timer fires, the last event is delivered once to every
//! listener on the key. Delay comes from `metadata.debounceDelay` (ms) or
//! the strategy default.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

use super::timed::TimedCore;
use super::{DispatchStrategy, StrategyKind};
use crate::domain::{Event, Listener, META_DEBOUNCE_DELAY};
use crate::error::StrategyError;
use crate::ports::EventLogger;

pub const DEFAULT_DEBOUNCE_DELAY: Duration = Duration::from_millis(300);

struct PendingTimer {
    generation: u64,
    timer: JoinHandle<()>,
}

pub struct DebounceStrategy {
    core: Arc<TimedCore>,
    pending: Arc<Mutex<HashMap<String, PendingTimer>>>,
    generation: AtomicU64,
    default_delay: Duration,
}

impl DebounceStrategy {
    /// Must be called from within a tokio runtime.
    pub fn new(logger: Arc<dyn EventLogger>) -> Result<Self, StrategyError> {
        Self::with_delay(logger, DEFAULT_DEBOUNCE_DELAY)
    }

    pub fn with_delay(
        logger: Arc<dyn EventLogger>,
        default_delay: Duration,
    ) -> Result<Self, StrategyError> {
        Ok(Self {
            core: TimedCore::new(StrategyKind::Debounce, logger)?,
            pending: Arc::new(Mutex::new(HashMap::new())),
            generation: AtomicU64::new(0),
            default_delay,
        })
    }

    /// Keys with a timer that has not fired yet.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.pending.lock().len()
    }
}

impl DispatchStrategy for DebounceStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Debounce
    }

    fn subscribe(&self, key: &str, listener: Listener) {
        self.core.subscribe(key, listener);
    }

    fn unsubscribe(&self, key: &str, listener: &Listener) {
        self.core.unsubscribe(key, listener);
    }

    fn emit(&self, key: &str, event: &Event) -> usize {
        let delay = event
            .metadata_duration(META_DEBOUNCE_DELAY)
            .unwrap_or(self.default_delay);
        self.core.log_scheduled(key, event, delay);

        let generation = self.generation.fetch_add(1, Ordering::Relaxed);
        let core = self.core.clone();
        let pending = self.pending.clone();
        let owned_key = key.to_string();
        let latest = event.clone();

        // Held across the spawn so the timer cannot fire before it is recorded.
        let mut timers = self.pending.lock();
        let timer = self.core.runtime().spawn(async move {
            tokio::time::sleep(delay).await;

            let current = {
                let mut timers = pending.lock();
                match timers.get(&owned_key) {
                    Some(entry) if entry.generation == generation => {
                        timers.remove(&owned_key);
                        true
                    }
                    _ => false,
                }
            };
            if current {
                core.deliver(&owned_key, &latest);
            }
        });

        if let Some(previous) = timers.insert(key.to_string(), PendingTimer { generation, timer }) {
            previous.timer.abort();
        }
        0
    }
}
