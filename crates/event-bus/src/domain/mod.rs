//! Domain layer: events, listeners and queue primitives. No I/O.

pub mod event;
pub mod listener;
pub mod queue;

pub use event::{
    Event, EventCategory, Prioritized, PriorityEvent, META_DEBOUNCE_DELAY, META_DELAY,
    META_PRIORITY, META_THROTTLE_DELAY,
};
pub use listener::{Listener, ListenerId, ListenerResult};
pub use queue::{FifoQueue, PriorityQueue};
