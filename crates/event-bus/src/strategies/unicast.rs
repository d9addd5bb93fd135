//! Unicast dispatch: exactly one listener per emit, picked by [`UnicastMode`].

use parking_lot::Mutex;
use rand::Rng;
use std::collections::HashMap;

use super::{invoke, next_round_robin, DispatchStrategy, ListenerTable, StrategyKind, UnicastMode};
use crate::domain::{Event, Listener};

#[derive(Debug, Default)]
struct State {
    listeners: ListenerTable,
    cursors: HashMap<String, usize>,
}

#[derive(Debug)]
pub struct UnicastStrategy {
    mode: UnicastMode,
    state: Mutex<State>,
}

impl UnicastStrategy {
    pub fn new(mode: UnicastMode) -> Self {
        Self {
            mode,
            state: Mutex::new(State::default()),
        }
    }

    #[must_use]
    pub fn mode(&self) -> UnicastMode {
        self.mode
    }

    fn select(&self, state: &mut State, key: &str) -> Option<Listener> {
        let len = state.listeners.get(key).len();
        if len == 0 {
            return None;
        }

        let index = match self.mode {
            UnicastMode::First => 0,
            UnicastMode::RoundRobin => {
                let cursor = state.cursors.entry(key.to_string()).or_insert(0);
                next_round_robin(cursor, len)
            }
            UnicastMode::Random => rand::thread_rng().gen_range(0..len),
        };
        state.listeners.get(key).get(index).cloned()
    }
}

impl Default for UnicastStrategy {
    fn default() -> Self {
        Self::new(UnicastMode::default())
    }
}

impl DispatchStrategy for UnicastStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Unicast
    }

    fn subscribe(&self, key: &str, listener: Listener) {
        self.state.lock().listeners.add(key, listener);
    }

    fn unsubscribe(&self, key: &str, listener: &Listener) {
        let mut state = self.state.lock();
        state.listeners.remove(key, listener);

        let len = state.listeners.get(key).len();
        if len == 0 {
            state.cursors.remove(key);
        } else if let Some(cursor) = state.cursors.get_mut(key) {
            if *cursor >= len {
                *cursor = 0;
            }
        }
    }

    fn emit(&self, key: &str, event: &Event) -> usize {
        let target = {
            let mut state = self.state.lock();
            self.select(&mut state, key)
        };

        match target {
            Some(listener) => usize::from(invoke(self.kind(), &listener, event)),
            None => 0,
        }
    }
}
