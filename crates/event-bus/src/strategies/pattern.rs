//! Pattern-matching dispatch.
//!
//! Listeners register a regular expression instead of a literal key. Every
//! registration whose pattern matches anywhere in the emitted key is invoked,
//! so a listener registered under several matching patterns runs once per
//! pattern.

use parking_lot::Mutex;
use regex::Regex;
use tracing::error;

use super::{invoke, DispatchStrategy, StrategyKind};
use crate::domain::{Event, Listener};
use crate::error::StrategyError;

#[derive(Debug, Default)]
pub struct PatternMatchingStrategy {
    registrations: Mutex<Vec<(Regex, Listener)>>,
}

impl PatternMatchingStrategy {
    pub fn new() -> Self {
        Self::default()
    }

    /// Compile `pattern` and register `listener` under it.
    pub fn subscribe_pattern(&self, pattern: &str, listener: Listener) -> Result<(), StrategyError> {
        let regex = Regex::new(pattern).map_err(|source| StrategyError::InvalidPattern {
            pattern: pattern.to_string(),
            source,
        })?;
        self.registrations.lock().push((regex, listener));
        Ok(())
    }

    /// Number of registered patterns.
    #[must_use]
    pub fn len(&self) -> usize {
        self.registrations.lock().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl DispatchStrategy for PatternMatchingStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::PatternMatching
    }

    /// `key` is treated as a pattern. An invalid pattern is logged and the
    /// registration skipped; use [`subscribe_pattern`](Self::subscribe_pattern)
    /// to get the error back.
    fn subscribe(&self, key: &str, listener: Listener) {
        if let Err(e) = self.subscribe_pattern(key, listener) {
            error!(pattern = key, error = %e, "Rejected pattern subscription");
        }
    }

    fn unsubscribe(&self, key: &str, listener: &Listener) {
        self.registrations
            .lock()
            .retain(|(regex, l)| !(regex.as_str() == key && l == listener));
    }

    fn emit(&self, key: &str, event: &Event) -> usize {
        let matched: Vec<Listener> = self
            .registrations
            .lock()
            .iter()
            .filter(|(regex, _)| regex.is_match(key))
            .map(|(_, listener)| listener.clone())
            .collect();

        matched
            .iter()
            .filter(|listener| invoke(self.kind(), listener, event))
            .count()
    }
}
