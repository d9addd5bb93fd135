//! # Dispatch Strategies
//!
//! Interchangeable delivery algorithms behind one contract,
//! [`DispatchStrategy`]. Each can be used directly as a standalone bus, or
//! installed in the [`EventBus`](crate::service::EventBus) coordinator, which
//! delegates to the time-shaped ones (debounce, throttle, delayed) and uses
//! its own channel registry for the rest.
//!
//! Strategies are `Send + Sync` and use interior mutability. Listener
//! callbacks always run outside the strategy's locks, so a listener may call
//! back into the strategy it is registered with.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use tracing::warn;

use crate::domain::{Event, Listener};
use crate::error::StrategyError;

pub mod broadcast;
pub mod debounce;
pub mod delayed;
pub mod factory;
pub mod multicast;
pub mod pattern;
pub mod persisted;
pub mod priority;
pub mod round_robin;
pub mod stateful;
pub mod stateless;
pub mod throttle;
mod timed;
pub mod unicast;

pub use broadcast::BroadcastStrategy;
pub use debounce::DebounceStrategy;
pub use delayed::DelayedStrategy;
pub use factory::StrategyFactory;
pub use multicast::MulticastStrategy;
pub use pattern::PatternMatchingStrategy;
pub use persisted::PersistedStrategy;
pub use priority::PriorityStrategy;
pub use round_robin::RoundRobinStrategy;
pub use stateful::StatefulStrategy;
pub use stateless::StatelessStrategy;
pub use throttle::ThrottleStrategy;
pub use unicast::UnicastStrategy;

/// Shared contract of every dispatch strategy.
pub trait DispatchStrategy: Send + Sync {
    fn kind(&self) -> StrategyKind;

    /// Register `listener` under `key`.
    fn subscribe(&self, key: &str, listener: Listener);

    /// Register with an explicit priority. Only the priority strategy
    /// orders by it; everywhere else this is [`subscribe`](Self::subscribe).
    fn subscribe_with_priority(&self, key: &str, listener: Listener, priority: i32) {
        let _ = priority;
        self.subscribe(key, listener);
    }

    /// Remove the registration of `listener` under `key`.
    fn unsubscribe(&self, key: &str, listener: &Listener);

    /// Dispatch `event` under `key`.
    ///
    /// Returns the number of listeners that handled the event successfully
    /// before this call returned. Deferred deliveries are not counted.
    fn emit(&self, key: &str, event: &Event) -> usize;

    /// Access to the durable log when this is the persisted strategy.
    fn as_persisted(&self) -> Option<&PersistedStrategy> {
        None
    }
}

impl fmt::Debug for dyn DispatchStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DispatchStrategy")
            .field("kind", &self.kind())
            .finish()
    }
}

/// Strategy identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum StrategyKind {
    #[default]
    Stateless,
    Stateful,
    Broadcast,
    Multicast,
    Unicast,
    Priority,
    PatternMatching,
    RoundRobin,
    Persisted,
    Debounce,
    Throttle,
    Delayed,
}

impl StrategyKind {
    pub const ALL: [StrategyKind; 12] = [
        StrategyKind::Stateless,
        StrategyKind::Stateful,
        StrategyKind::Broadcast,
        StrategyKind::Multicast,
        StrategyKind::Unicast,
        StrategyKind::Priority,
        StrategyKind::PatternMatching,
        StrategyKind::RoundRobin,
        StrategyKind::Persisted,
        StrategyKind::Debounce,
        StrategyKind::Throttle,
        StrategyKind::Delayed,
    ];

    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Stateless => "stateless",
            Self::Stateful => "stateful",
            Self::Broadcast => "broadcast",
            Self::Multicast => "multicast",
            Self::Unicast => "unicast",
            Self::Priority => "priority",
            Self::PatternMatching => "pattern-matching",
            Self::RoundRobin => "round-robin",
            Self::Persisted => "persisted",
            Self::Debounce => "debounce",
            Self::Throttle => "throttle",
            Self::Delayed => "delayed",
        }
    }

    /// Strategies the coordinator hands emits to directly.
    #[must_use]
    pub fn is_time_shaped(&self) -> bool {
        matches!(self, Self::Debounce | Self::Throttle | Self::Delayed)
    }
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StrategyKind {
    type Err = StrategyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == wanted)
            .ok_or_else(|| StrategyError::Unknown(s.to_string()))
    }
}

/// How the unicast strategy picks its single target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum UnicastMode {
    #[default]
    First,
    RoundRobin,
    Random,
}

impl UnicastMode {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::First => "first",
            Self::RoundRobin => "round-robin",
            Self::Random => "random",
        }
    }
}

impl fmt::Display for UnicastMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for UnicastMode {
    type Err = StrategyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "first" => Ok(Self::First),
            "round-robin" => Ok(Self::RoundRobin),
            "random" => Ok(Self::Random),
            _ => Err(StrategyError::UnknownUnicastMode(s.to_string())),
        }
    }
}

/// Listeners grouped by key, remembering the order keys first appeared.
#[derive(Debug, Default)]
pub(crate) struct ListenerTable {
    order: Vec<String>,
    entries: HashMap<String, Vec<Listener>>,
}

impl ListenerTable {
    pub(crate) fn add(&mut self, key: &str, listener: Listener) {
        match self.entries.get_mut(key) {
            Some(listeners) => listeners.push(listener),
            None => {
                self.order.push(key.to_string());
                self.entries.insert(key.to_string(), vec![listener]);
            }
        }
    }

    /// Remove one registration. Keys left without listeners are forgotten.
    pub(crate) fn remove(&mut self, key: &str, listener: &Listener) -> bool {
        let Some(listeners) = self.entries.get_mut(key) else {
            return false;
        };
        let Some(pos) = listeners.iter().position(|l| l == listener) else {
            return false;
        };
        listeners.remove(pos);
        if listeners.is_empty() {
            self.remove_key(key);
        }
        true
    }

    pub(crate) fn remove_key(&mut self, key: &str) {
        if self.entries.remove(key).is_some() {
            self.order.retain(|k| k != key);
        }
    }

    pub(crate) fn get(&self, key: &str) -> &[Listener] {
        self.entries.get(key).map(Vec::as_slice).unwrap_or(&[])
    }

    pub(crate) fn snapshot(&self, key: &str) -> Vec<Listener> {
        self.get(key).to_vec()
    }

    /// Every listener under every key, in key order.
    pub(crate) fn all(&self) -> Vec<Listener> {
        self.order
            .iter()
            .flat_map(|key| self.get(key).iter().cloned())
            .collect()
    }
}

/// Run one listener, logging a failure instead of propagating it.
pub(crate) fn invoke(kind: StrategyKind, listener: &Listener, event: &Event) -> bool {
    match listener.call(event) {
        Ok(()) => true,
        Err(e) => {
            warn!(
                strategy = %kind,
                event = %event.name,
                listener = ?listener.id(),
                error = %e,
                "Listener failed"
            );
            false
        }
    }
}

/// Run every listener in order; returns how many succeeded.
pub(crate) fn deliver_all(kind: StrategyKind, listeners: &[Listener], event: &Event) -> usize {
    listeners
        .iter()
        .filter(|listener| invoke(kind, listener, event))
        .count()
}

/// Advance a round-robin cursor, returning the index to use now.
pub(crate) fn next_round_robin(cursor: &mut usize, len: usize) -> usize {
    if *cursor >= len {
        *cursor = 0;
    }
    let index = *cursor;
    *cursor = (index + 1) % len;
    index
}
