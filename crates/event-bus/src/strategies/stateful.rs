//! Stateful dispatch: stateless delivery plus a per-key history that is
//! replayed in full to each new listener.
//!
//! Replay and live delivery run under one reentrant delivery lock, so a new
//! listener sees its whole history before any event emitted after it
//! subscribed, even when that emit comes from another thread. Listeners may
//! call back into the strategy from the delivering thread.

use parking_lot::{Mutex, ReentrantMutex};
use std::collections::HashMap;

use super::{deliver_all, DispatchStrategy, ListenerTable, StrategyKind};
use crate::domain::{Event, Listener};

#[derive(Debug, Default)]
struct State {
    listeners: ListenerTable,
    history: HashMap<String, Vec<Event>>,
}

#[derive(Debug)]
pub struct StatefulStrategy {
    state: Mutex<State>,
    /// Held across replay and delivery. `state` is only taken inside it.
    delivery: ReentrantMutex<()>,
}

impl Default for StatefulStrategy {
    fn default() -> Self {
        Self {
            state: Mutex::default(),
            delivery: ReentrantMutex::new(()),
        }
    }
}

impl StatefulStrategy {
    pub fn new() -> Self {
        Self::default()
    }

    /// Events emitted under `key`, oldest first.
    #[must_use]
    pub fn history(&self, key: &str) -> Vec<Event> {
        self.state
            .lock()
            .history
            .get(key)
            .cloned()
            .unwrap_or_default()
    }

    pub fn clear_history(&self, key: &str) {
        self.state.lock().history.remove(key);
    }

    /// Forget listeners and history for `key`.
    pub fn clean_up(&self, key: &str) {
        let mut state = self.state.lock();
        state.listeners.remove_key(key);
        state.history.remove(key);
    }
}

impl DispatchStrategy for StatefulStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Stateful
    }

    /// Registers the listener, then replays the whole history for `key` to
    /// it before returning.
    fn subscribe(&self, key: &str, listener: Listener) {
        let _delivery = self.delivery.lock();
        let replay = {
            let mut state = self.state.lock();
            state.listeners.add(key, listener.clone());
            state.history.get(key).cloned().unwrap_or_default()
        };

        for event in &replay {
            super::invoke(self.kind(), &listener, event);
        }
    }

    fn unsubscribe(&self, key: &str, listener: &Listener) {
        self.state.lock().listeners.remove(key, listener);
    }

    fn emit(&self, key: &str, event: &Event) -> usize {
        let _delivery = self.delivery.lock();
        let listeners = {
            let mut state = self.state.lock();
            state
                .history
                .entry(key.to_string())
                .or_default()
                .push(event.clone());
            state.listeners.snapshot(key)
        };
        deliver_all(self.kind(), &listeners, event)
    }
}
