//! Broadcast dispatch: every emit reaches every listener, whatever key it
//! was registered under.

use parking_lot::Mutex;

use super::{deliver_all, DispatchStrategy, ListenerTable, StrategyKind};
use crate::domain::{Event, Listener};

#[derive(Debug, Default)]
pub struct BroadcastStrategy {
    listeners: Mutex<ListenerTable>,
}

impl BroadcastStrategy {
    pub fn new() -> Self {
        Self::default()
    }
}

impl DispatchStrategy for BroadcastStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Broadcast
    }

    fn subscribe(&self, key: &str, listener: Listener) {
        self.listeners.lock().add(key, listener);
    }

    fn unsubscribe(&self, key: &str, listener: &Listener) {
        self.listeners.lock().remove(key, listener);
    }

    fn emit(&self, _key: &str, event: &Event) -> usize {
        let listeners = self.listeners.lock().all();
        deliver_all(self.kind(), &listeners, event)
    }
}
