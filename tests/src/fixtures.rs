//! Shared test fixtures.

use event_bus::{
    BusConfig, DurableStore, ErrorHandler, Event, EventBus, InMemoryStore, Listener,
    LoggingConfig, LoggingMiddleware, SchemaValidator,
};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderCreated {
    pub order_id: u64,
    pub amount_cents: u64,
}

pub fn order(order_id: u64) -> Event {
    Event::with_payload(
        "OrderCreated",
        &OrderCreated {
            order_id,
            amount_cents: order_id * 100,
        },
    )
    .expect("order payload serializes")
}

/// Bus with silent logging and the given store.
pub fn quiet_bus_with_store(config: BusConfig, store: Arc<dyn DurableStore>) -> EventBus {
    let config = BusConfig {
        logging: LoggingConfig::disabled(),
        ..config
    };
    EventBus::builder()
        .logger(Arc::new(LoggingMiddleware::new(config.logging.clone())))
        .config(config)
        .validator(Arc::new(SchemaValidator::new()))
        .notifier(Arc::new(ErrorHandler::default()))
        .store(store)
        .build()
        .expect("bus construction failed")
}

/// Bus with silent logging and an in-memory store.
pub fn quiet_bus(config: BusConfig) -> EventBus {
    quiet_bus_with_store(config, Arc::new(InMemoryStore::new()))
}

/// Listener recording every payload it receives.
pub fn recording_listener() -> (Listener, Arc<Mutex<Vec<Value>>>) {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = seen.clone();
    let listener = Listener::new(move |event| sink.lock().push(event.payload.clone()));
    (listener, seen)
}
