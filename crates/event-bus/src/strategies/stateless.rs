//! Stateless dispatch: listeners under the exact key, nothing remembered.

use parking_lot::Mutex;

use super::{deliver_all, DispatchStrategy, ListenerTable, StrategyKind};
use crate::domain::{Event, Listener};

#[derive(Debug, Default)]
pub struct StatelessStrategy {
    listeners: Mutex<ListenerTable>,
}

impl StatelessStrategy {
    pub fn new() -> Self {
        Self::default()
    }
}

impl DispatchStrategy for StatelessStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Stateless
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
