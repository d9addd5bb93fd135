//! Recording fakes for unit tests.

use parking_lot::Mutex;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use tracing::field::{Field, Visit};
use tracing::subscriber::DefaultGuard;
use tracing_subscriber::layer::{Context, SubscriberExt};
use tracing_subscriber::Layer;

use crate::domain::Listener;
use crate::error::ListenerError;
use crate::ports::{Direction, ErrorDirection, ErrorNotifier, EventLogger, LogLevel};

/// Listener that records the payloads it sees.
pub(crate) fn recorder() -> (Listener, Arc<Mutex<Vec<Value>>>) {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = seen.clone();
    let listener = Listener::new(move |event| sink.lock().push(event.payload.clone()));
    (listener, seen)
}

/// Listener that pushes `tag` into a shared log.
pub(crate) fn tagged(tag: &'static str, log: &Arc<Mutex<Vec<&'static str>>>) -> Listener {
    let log = log.clone();
    Listener::new(move |_| log.lock().push(tag))
}

pub(crate) fn failing() -> Listener {
    Listener::fallible(|_| Err(ListenerError::new("listener exploded")))
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct LogEntry {
    pub event_name: String,
    pub payload: Value,
    pub direction: Direction,
    pub level: LogLevel,
}

#[derive(Debug, Default)]
pub(crate) struct RecordingLogger {
    entries: Mutex<Vec<LogEntry>>,
}

impl RecordingLogger {
    pub(crate) fn entries(&self) -> Vec<LogEntry> {
        self.entries.lock().clone()
    }

    pub(crate) fn directions(&self, event_name: &str) -> Vec<Direction> {
        self.entries
            .lock()
            .iter()
            .filter(|e| e.event_name == event_name)
            .map(|e| e.direction)
            .collect()
    }

    /// Entries logged under a coordinator step name.
    pub(crate) fn steps(&self, step: &str) -> usize {
        self.entries
            .lock()
            .iter()
            .filter(|e| e.event_name == step)
            .count()
    }
}

impl EventLogger for RecordingLogger {
    fn handle(&self, event_name: &str, payload: &Value, direction: Direction, level: LogLevel) {
        self.entries.lock().push(LogEntry {
            event_name: event_name.to_string(),
            payload: payload.clone(),
            direction,
            level,
        });
    }
}

#[derive(Debug, Default)]
pub(crate) struct RecordingNotifier {
    errors: Mutex<Vec<(String, String, ErrorDirection)>>,
}

impl RecordingNotifier {
    pub(crate) fn errors(&self) -> Vec<(String, String, ErrorDirection)> {
        self.errors.lock().clone()
    }
}

impl ErrorNotifier for RecordingNotifier {
    fn handle_error(
        &self,
        event_name: &str,
        error: &(dyn std::error::Error + 'static),
        direction: ErrorDirection,
    ) {
        self.errors
            .lock()
            .push((event_name.to_string(), error.to_string(), direction));
    }
}

/// `tracing` layer that keeps the message of every ERROR event.
#[derive(Debug, Clone, Default)]
pub(crate) struct ErrorCapture {
    messages: Arc<Mutex<Vec<String>>>,
}

impl ErrorCapture {
    /// Route this thread's events through the capture until the guard drops.
    pub(crate) fn install(&self) -> DefaultGuard {
        tracing::subscriber::set_default(tracing_subscriber::registry().with(self.clone()))
    }

    pub(crate) fn messages(&self) -> Vec<String> {
        self.messages.lock().clone()
    }
}

#[derive(Default)]
struct MessageVisitor(String);

impl Visit for MessageVisitor {
    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        if field.name() == "message" {
            self.0 = format!("{value:?}");
        }
    }
}

impl<S: tracing::Subscriber> Layer<S> for ErrorCapture {
    fn on_event(&self, event: &tracing::Event<'_>, _ctx: Context<'_, S>) {
        if *event.metadata().level() == tracing::Level::ERROR {
            let mut visitor = MessageVisitor::default();
            event.record(&mut visitor);
            self.messages.lock().push(visitor.0);
        }
    }
}
