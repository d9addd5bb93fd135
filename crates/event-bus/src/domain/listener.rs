//! Listener handles used by the dispatch strategies.
//!
//! A [`Listener`] wraps a callback with a process-unique id. Clones share the
//! id, so the handle passed to `subscribe` can later be passed to
//! `unsubscribe` to remove exactly that registration.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use super::event::Event;
use crate::error::ListenerError;

/// Outcome of a single listener invocation.
pub type ListenerResult = Result<(), ListenerError>;

type Handler = dyn Fn(&Event) -> ListenerResult + Send + Sync;

static NEXT_LISTENER_ID: AtomicU64 = AtomicU64::new(1);

/// Identity of a listener registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(u64);

impl fmt::Display for ListenerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "listener-{}", self.0)
    }
}

/// A callback registered with a strategy.
#[derive(Clone)]
pub struct Listener {
    id: ListenerId,
    handler: Arc<Handler>,
}

impl Listener {
    /// Wrap an infallible callback.
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&Event) + Send + Sync + 'static,
    {
        Self::fallible(move |event| {
            f(event);
            Ok(())
        })
    }

    /// Wrap a callback that may fail.
    pub fn fallible<F>(f: F) -> Self
    where
        F: Fn(&Event) -> ListenerResult + Send + Sync + 'static,
    {
        Self {
            id: ListenerId(NEXT_LISTENER_ID.fetch_add(1, Ordering::Relaxed)),
            handler: Arc::new(f),
        }
    }

    #[must_use]
    pub fn id(&self) -> ListenerId {
        self.id
    }

    /// Invoke the callback.
    pub fn call(&self, event: &Event) -> ListenerResult {
        (self.handler)(event)
    }
}

impl PartialEq for Listener {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Listener {}

impl fmt::Debug for Listener {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Listener").field("id", &self.id.0).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clone_shares_identity() {
        let a = Listener::new(|_| {});
        let b = a.clone();
        let c = Listener::new(|_| {});
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_fallible_listener_reports_error() {
        let listener = Listener::fallible(|_| Err(ListenerError::new("nope")));
        let err = listener.call(&Event::new("e", 1)).unwrap_err();
        assert_eq!(err.message(), "nope");
    }
}
