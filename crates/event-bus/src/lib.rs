//! # Event Bus
//!
//! In-process publish/subscribe with interchangeable dispatch strategies,
//! FIFO and priority queueing, payload validation and a durable buffer.
//!
//! ## Architecture
//!
//! This crate follows Hexagonal Architecture (Ports & Adapters):
//!
//! - **Domain Layer** (`domain/`): Pure data, no I/O
//!   - `Event`: the record that flows through the bus
//!   - `Listener`: callback handle with identity
//!   - `FifoQueue`, `PriorityQueue`: queue primitives
//!
//! - **Ports Layer** (`ports/`): Trait definitions
//!   - `EventLogger`, `PayloadValidator`, `ErrorNotifier`, `DurableStore`
//!
//! - **Middleware Layer** (`middleware/`): Reference port implementations
//!   - `LoggingMiddleware`: console and HTTP log output
//!   - `SchemaValidator`: JSON payload schemas
//!   - `ErrorHandler`: structured error reports
//!
//! - **Strategies** (`strategies/`): twelve dispatch algorithms behind
//!   `DispatchStrategy`, built by `StrategyFactory`
//!
//! - **Adapters Layer** (`adapters/`): `InMemoryStore`, `FileStore`
//!
//! - **Service Layer** (`service/`): the `EventBus` coordinator
//!
//! ## Invariants
//!
//! - FIFO delivery preserves emission order
//! - Priority delivery is highest first; equal priorities come out newest first
//! - A channel exists exactly while it has at least one subscription
//! - `drain_queue` never runs twice at the same time
//!
//! ## Usage Example
//!
//! ```ignore
//! use event_bus::{BusConfig, Event, EventBus};
//!
//! let bus = EventBus::with_defaults(BusConfig::from_env())?;
//! let mut orders = bus.on("OrderCreated");
//!
//! bus.emit(Event::new("OrderCreated", serde_json::json!({ "id": 42 })));
//! bus.drain_queue();
//!
//! let event = orders.recv().await;
//! ```
//!
//! ## Time-shaped Strategies
//!
//! ```ignore
//! use event_bus::{Event, EventBus, Listener, StrategyKind};
//!
//! bus.set_strategy(StrategyKind::Debounce);
//! bus.strategy().subscribe("SearchTyped", Listener::new(|event| {
//!     tracing::info!(query = %event.payload, "search");
//! }));
//!
//! // Only the last of a burst is delivered, 300 ms after it was emitted.
//! bus.emit(Event::new("SearchTyped", "ru"));
//! bus.emit(Event::new("SearchTyped", "rust"));
//! ```

pub mod adapters;
pub mod config;
pub mod domain;
pub mod error;
pub mod metrics;
pub mod middleware;
pub mod ports;
pub mod service;
pub mod strategies;
pub mod subscription;

#[cfg(test)]
mod testing;

// Re-exports for convenience
pub use adapters::{FileStore, InMemoryStore};
pub use config::BusConfig;
pub use domain::{
    Event, EventCategory, FifoQueue, Listener, ListenerId, ListenerResult, PriorityEvent,
    PriorityQueue,
};
pub use error::{
    BusError, ConfigError, ListenerError, QueueError, SchemaError, StoreError, StrategyError,
};
pub use metrics::{BusMetrics, DropReason, MetricsRecorder, MetricsSnapshot, NoOpMetrics};
pub use middleware::{
    ErrorHandler, ErrorReport, LogOutput, LoggingConfig, LoggingMiddleware, SchemaValidator,
};
pub use ports::{
    Direction, DurableStore, ErrorDirection, ErrorNotifier, EventLogger, LogLevel, PayloadSchema,
    PayloadValidator,
};
pub use service::{EventBus, EventBusBuilder};
pub use strategies::{DispatchStrategy, StrategyFactory, StrategyKind, UnicastMode};
pub use subscription::{EventFilter, Subscription, SubscriptionError};
