//! Listener bookkeeping shared by the time-shaped strategies.

use parking_lot::Mutex;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;

use super::{deliver_all, ListenerTable, StrategyKind};
use crate::domain::{Event, Listener};
use crate::error::StrategyError;
use crate::ports::{Direction, EventLogger, LogLevel};

pub(crate) struct TimedCore {
    kind: StrategyKind,
    runtime: Handle,
    logger: Arc<dyn EventLogger>,
    listeners: Mutex<ListenerTable>,
}

impl TimedCore {
    /// Bind to the tokio runtime of the calling context.
    pub(crate) fn new(
        kind: StrategyKind,
        logger: Arc<dyn EventLogger>,
    ) -> Result<Arc<Self>, StrategyError> {
        let runtime = Handle::try_current().map_err(|_| StrategyError::NoRuntime(kind.as_str()))?;
        Ok(Arc::new(Self {
            kind,
            runtime,
            logger,
            listeners: Mutex::new(ListenerTable::default()),
        }))
    }

    pub(crate) fn runtime(&self) -> &Handle {
        &self.runtime
    }

    pub(crate) fn log(&self, key: &str, payload: &Value, direction: Direction) {
        self.logger.handle(key, payload, direction, LogLevel::Info);
    }

    pub(crate) fn log_scheduled(&self, key: &str, event: &Event, delay: Duration) {
        let payload = json!({
            "payload": event.payload,
            "delayMs": delay.as_millis() as u64,
        });
        self.log(key, &payload, Direction::Schedule);
    }

    pub(crate) fn subscribe(&self, key: &str, listener: Listener) {
        let id = listener.id();
        self.listeners.lock().add(key, listener);
        self.log(key, &json!({ "listener": id.to_string() }), Direction::Subscribe);
    }

    pub(crate) fn unsubscribe(&self, key: &str, listener: &Listener) {
        if self.listeners.lock().remove(key, listener) {
            self.log(
                key,
                &json!({ "listener": listener.id().to_string() }),
                Direction::Unsubscribe,
            );
        }
    }

    /// Deliver to every listener currently under `key`.
    pub(crate) fn deliver(&self, key: &str, event: &Event) -> usize {
        let listeners = self.listeners.lock().snapshot(key);
        let delivered = deliver_all(self.kind, &listeners, event);
        self.log(key, &event.payload, Direction::Emit);
        delivered
    }
}
