//! Multicast dispatch: every listener registered under the emitted key.

use parking_lot::Mutex;

use super::{deliver_all, DispatchStrategy, ListenerTable, StrategyKind};
use crate::domain::{Event, Listener};

#[derive(Debug, Default)]
pub struct MulticastStrategy {
    listeners: Mutex<ListenerTable>,
}

impl MulticastStrategy {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of listeners currently registered under `key`.
    #[must_use]
    pub fn listener_count(&self, key: &str) -> usize {
        self.listeners.lock().get(key).len()
    }
}

impl DispatchStrategy for MulticastStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Multicast
    }

    fn subscribe(&self, key: &str, listener: Listener) {
        self.listeners.lock().add(key, listener);
    }

    fn unsubscribe(&self, key: &str, listener: &Listener) {
        self.listeners.lock().remove(key, listener);
    }

    fn emit(&self, key: &str, event: &Event) -> usize {
        let listeners = self.listeners.lock().snapshot(key);
        deliver_all(self.kind(), &listeners, event)
    }
}
