//! Persisted dispatch.
//!
//! Every emit is appended to a durable log (a JSON array under one fixed
//! store key) and delivered to live listeners. [`drain`](PersistedStrategy::drain)
//! takes the whole log and leaves an empty one behind, so events emitted
//! while nobody was consuming can be recovered later.

use parking_lot::Mutex;
use std::sync::Arc;
use tracing::{debug, error};

use super::{deliver_all, DispatchStrategy, ListenerTable, StrategyKind};
use crate::domain::{Event, Listener};
use crate::error::StoreError;
use crate::ports::DurableStore;

/// Store key holding the durable log.
pub const PERSISTED_EVENTS_KEY: &str = "persisted_events";

const EMPTY_LOG: &str = "[]";

pub struct PersistedStrategy {
    store: Arc<dyn DurableStore>,
    listeners: Mutex<ListenerTable>,
    /// Serializes read-modify-write cycles on the log.
    log_lock: Mutex<()>,
}

impl PersistedStrategy {
    /// Wrap `store`, creating an empty log if none exists.
    pub fn new(store: Arc<dyn DurableStore>) -> Result<Self, StoreError> {
        if store.get(PERSISTED_EVENTS_KEY)?.is_none() {
            store.set(PERSISTED_EVENTS_KEY, EMPTY_LOG)?;
        }

        Ok(Self {
            store,
            listeners: Mutex::new(ListenerTable::default()),
            log_lock: Mutex::new(()),
        })
    }

    fn read_log(&self) -> Result<Vec<Event>, StoreError> {
        match self.store.get(PERSISTED_EVENTS_KEY)? {
            Some(raw) => Ok(serde_json::from_str(&raw)?),
            None => Ok(Vec::new()),
        }
    }

    fn append(&self, event: &Event) -> Result<usize, StoreError> {
        let _guard = self.log_lock.lock();
        let mut log = self.read_log()?;
        log.push(event.clone());
        self.store
            .set(PERSISTED_EVENTS_KEY, &serde_json::to_string(&log)?)?;
        Ok(log.len())
    }

    fn take_log(&self) -> Result<Vec<Event>, StoreError> {
        let _guard = self.log_lock.lock();
        let log = self.read_log()?;
        self.store.set(PERSISTED_EVENTS_KEY, EMPTY_LOG)?;
        Ok(log)
    }

    /// Take every buffered event, leaving an empty log.
    ///
    /// Store failures are logged and yield an empty batch.
    pub fn drain(&self) -> Vec<Event> {
        match self.take_log() {
            Ok(events) => {
                debug!(count = events.len(), "Drained persisted events");
                events
            }
            Err(e) => {
                error!(error = %e, "Failed to drain persisted events");
                Vec::new()
            }
        }
    }

    /// Number of events waiting in the log.
    pub fn pending(&self) -> Result<usize, StoreError> {
        let _guard = self.log_lock.lock();
        Ok(self.read_log()?.len())
    }
}

impl DispatchStrategy for PersistedStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Persisted
    }

    fn subscribe(&self, key: &str, listener: Listener) {
        self.listeners.lock().add(key, listener);
    }

    fn unsubscribe(&self, key: &str, listener: &Listener) {
        self.listeners.lock().remove(key, listener);
    }

    fn emit(&self, key: &str, event: &Event) -> usize {
        match self.append(event) {
            Ok(len) => debug!(event = %event.name, log_len = len, "Persisted event"),
            Err(e) => error!(event = %event.name, error = %e, "Failed to persist event"),
        }

        let listeners = self.listeners.lock().snapshot(key);
        deliver_all(self.kind(), &listeners, event)
    }

    fn as_persisted(&self) -> Option<&PersistedStrategy> {
        Some(self)
    }
}
