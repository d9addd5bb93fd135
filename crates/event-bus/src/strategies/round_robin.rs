//! Round-robin dispatch: one listener per emit, rotating per key.

use parking_lot::Mutex;
use std::collections::HashMap;

use super::{invoke, next_round_robin, DispatchStrategy, ListenerTable, StrategyKind};
use crate::domain::{Event, Listener};

#[derive(Debug, Default)]
struct State {
    listeners: ListenerTable,
    cursors: HashMap<String, usize>,
}

#[derive(Debug, Default)]
pub struct RoundRobinStrategy {
    state: Mutex<State>,
}

impl RoundRobinStrategy {
    pub fn new() -> Self {
        Self::default()
    }
}

impl DispatchStrategy for RoundRobinStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::RoundRobin
    }

    fn subscribe(&self, key: &str, listener: Listener) {
        self.state.lock().listeners.add(key, listener);
    }

    fn unsubscribe(&self, key: &str, listener: &Listener) {
        let mut state = self.state.lock();
        state.listeners.remove(key, listener);
        if state.listeners.get(key).is_empty() {
            state.cursors.remove(key);
        }
    }

    fn emit(&self, key: &str, event: &Event) -> usize {
        let target = {
            let mut state = self.state.lock();
            let len = state.listeners.get(key).len();
            if len == 0 {
                return 0;
            }
            let cursor = state.cursors.entry(key.to_string()).or_insert(0);
            let index = next_round_robin(cursor, len);
            state.listeners.get(key)[index].clone()
        };

        usize::from(invoke(self.kind(), &target, event))
    }
}
