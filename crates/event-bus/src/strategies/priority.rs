//! Priority dispatch.
//!
//! Listeners carry an integer priority and are kept sorted highest first,
//! equal priorities in registration order. Emits go through one relay queue
//! that is worked off by whichever caller holds it, so deliveries never
//! interleave: an emit issued from inside a listener is delivered after the
//! current one completes.

use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};

use super::{invoke, DispatchStrategy, StrategyKind};
use crate::domain::{Event, Listener};

pub const DEFAULT_LISTENER_PRIORITY: i32 = 0;

#[derive(Debug, Clone)]
struct Ranked {
    priority: i32,
    listener: Listener,
}

#[derive(Debug, Default)]
pub struct PriorityStrategy {
    listeners: Mutex<HashMap<String, Vec<Ranked>>>,
    relay: Mutex<VecDeque<(String, Event)>>,
    relaying: AtomicBool,
}

impl PriorityStrategy {
    pub fn new() -> Self {
        Self::default()
    }

    fn deliver(&self, key: &str, event: &Event) -> usize {
        let ordered: Vec<Listener> = self
            .listeners
            .lock()
            .get(key)
            .map(|ranked| ranked.iter().map(|r| r.listener.clone()).collect())
            .unwrap_or_default();

        ordered
            .iter()
            .filter(|listener| invoke(self.kind(), listener, event))
            .count()
    }
}

impl DispatchStrategy for PriorityStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Priority
    }

    fn subscribe(&self, key: &str, listener: Listener) {
        self.subscribe_with_priority(key, listener, DEFAULT_LISTENER_PRIORITY);
    }

    fn subscribe_with_priority(&self, key: &str, listener: Listener, priority: i32) {
        let mut listeners = self.listeners.lock();
        let ranked = listeners.entry(key.to_string()).or_default();
        let pos = ranked.partition_point(|r| r.priority >= priority);
        ranked.insert(pos, Ranked { priority, listener });
    }

    fn unsubscribe(&self, key: &str, listener: &Listener) {
        let mut listeners = self.listeners.lock();
        if let Some(ranked) = listeners.get_mut(key) {
            ranked.retain(|r| &r.listener != listener);
            if ranked.is_empty() {
                listeners.remove(key);
            }
        }
    }

    /// Counts the deliveries made by this call's relay pass, which may
    /// include events queued by other callers. Returns 0 when a pass is
    /// already running; the event is then delivered by that pass.
    fn emit(&self, key: &str, event: &Event) -> usize {
        self.relay
            .lock()
            .push_back((key.to_string(), event.clone()));

        let mut delivered = 0;
        loop {
            if self.relaying.swap(true, Ordering::AcqRel) {
                return delivered;
            }

            loop {
                let next = self.relay.lock().pop_front();
                let Some((key, event)) = next else {
                    break;
                };
                delivered += self.deliver(&key, &event);
            }

            self.relaying.store(false, Ordering::Release);
            if self.relay.lock().is_empty() {
                return delivered;
            }
        }
    }
}
