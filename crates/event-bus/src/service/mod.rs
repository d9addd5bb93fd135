//! Service Layer
//!
//! - [`EventBus`]: queueing, draining and channel delivery
//! - `channel`: per-name channel registry used by subscriptions

pub mod bus;
pub(crate) mod channel;

pub use bus::{EventBus, EventBusBuilder};
