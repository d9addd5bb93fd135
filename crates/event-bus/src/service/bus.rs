//! Event Bus Coordinator
//!
//! Owns the event queues and the channel registry, and decides how an emitted
//! event travels:
//!
//! - With a time-shaped strategy (debounce, throttle, delayed) active, `emit`
//!   hands the event straight to the strategy.
//! - Otherwise the event is queued (FIFO, or by priority in priority mode)
//!   and reaches subscriptions when [`EventBus::drain_queue`] runs.
//! - With the persisted strategy active, `drain_queue` drains the durable log
//!   instead of the in-memory queues.
//!
//! Internal failures never propagate to producers. They are logged through
//! the [`EventLogger`] and reported to the [`ErrorNotifier`].

use parking_lot::{Mutex, RwLock};
use serde_json::json;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info};

use super::channel::ChannelRegistry;
use crate::adapters::InMemoryStore;
use crate::config::BusConfig;
use crate::domain::{Event, FifoQueue, PriorityEvent, PriorityQueue};
use crate::error::{BusError, QueueError};
use crate::metrics::{DropReason, MetricsRecorder, NoOpMetrics};
use crate::middleware::{ErrorHandler, LoggingMiddleware, SchemaValidator};
use crate::ports::{
    Direction, DurableStore, ErrorDirection, ErrorNotifier, EventLogger, LogLevel, PayloadSchema,
    PayloadValidator,
};
use crate::strategies::{DispatchStrategy, StrategyFactory, StrategyKind};
use crate::subscription::{EventFilter, Subscription};

#[derive(Default)]
struct Queues {
    fifo: FifoQueue<Event>,
    priority: PriorityQueue<PriorityEvent>,
}

impl Queues {
    fn len(&self) -> usize {
        self.fifo.len() + self.priority.len()
    }
}

/// Clears the drain flag however the drain ends.
struct DrainGuard<'a>(&'a AtomicBool);

impl Drop for DrainGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// In-process event bus.
pub struct EventBus {
    strategy: RwLock<Arc<dyn DispatchStrategy>>,
    factory: StrategyFactory,
    channels: Arc<ChannelRegistry>,
    queues: Mutex<Queues>,
    priority_mode: AtomicBool,
    batch_size: AtomicUsize,
    queue_capacity: Option<usize>,
    draining: AtomicBool,
    logger: Arc<dyn EventLogger>,
    validator: Arc<dyn PayloadValidator>,
    notifier: Arc<dyn ErrorNotifier>,
    metrics: Arc<dyn MetricsRecorder>,
}

impl EventBus {
    #[must_use]
    pub fn builder() -> EventBusBuilder {
        EventBusBuilder::default()
    }

    /// Build a bus from `config` with the reference collaborators: the
    /// logging middleware, an empty schema validator, the logging error
    /// handler and an in-memory durable store.
    pub fn with_defaults(config: BusConfig) -> Result<Self, BusError> {
        let logger = Arc::new(LoggingMiddleware::new(config.logging.clone()));
        Self::builder()
            .config(config)
            .logger(logger)
            .validator(Arc::new(SchemaValidator::new()))
            .notifier(Arc::new(ErrorHandler::default()))
            .store(Arc::new(InMemoryStore::new()))
            .build()
    }

    /// Publish an event.
    ///
    /// Fills in a missing timestamp, validates the payload and then either
    /// hands the event to a time-shaped strategy or queues it. Rejected and
    /// refused events are logged and reported, never returned as errors.
    pub fn emit(&self, event: Event) {
        let event = event.stamped();
        self.metrics.record_emit(&event.name);
        let logged = serde_json::to_value(&event).unwrap_or_default();
        self.logger
            .handle(&event.name, &logged, Direction::Emit, LogLevel::Info);

        if !self.validator.validate(&event.name, &event.payload) {
            self.logger.handle(
                &event.name,
                &json!({ "error": "Invalid event payload", "payload": event.payload }),
                Direction::Emit,
                LogLevel::Error,
            );
            self.metrics.record_drop(&event.name, DropReason::Invalid);
            return;
        }

        let strategy = self.strategy();
        if strategy.kind().is_time_shaped() {
            debug!(event = %event.name, strategy = %strategy.kind(), "Delegating emit");
            strategy.emit(&event.name, &event);
            return;
        }

        let name = event.name.clone();
        match self.enqueue(event) {
            Ok(depth) => self.metrics.record_enqueue(depth),
            Err(source) => {
                self.metrics.record_drop(&name, DropReason::EnqueueFailed);
                let err = BusError::Enqueue {
                    event: name.clone(),
                    source,
                };
                self.report("EmitError", &name, &err, ErrorDirection::Emit);
            }
        }
    }

    fn enqueue(&self, event: Event) -> Result<usize, QueueError> {
        let mut queues = self.queues.lock();
        let len = queues.len();
        if let Some(capacity) = self.queue_capacity {
            if len >= capacity {
                return Err(QueueError::Full { len, capacity });
            }
        }

        if self.priority_mode() {
            queues.priority.enqueue(PriorityEvent::from_event(event));
        } else {
            queues.fifo.enqueue(event);
        }
        Ok(len + 1)
    }

    /// Subscribe to every event named `event_name`.
    ///
    /// The channel is created on first use. A new subscription first sees
    /// the most recently delivered event of the channel, if there is one.
    pub fn on(&self, event_name: &str) -> Subscription {
        self.subscribe(event_name, None, None)
    }

    /// Like [`on`](Self::on), yielding only events accepted by `filter`.
    pub fn on_filtered<F>(&self, event_name: &str, filter: F) -> Subscription
    where
        F: Fn(&Event) -> bool + Send + Sync + 'static,
    {
        self.subscribe(event_name, Some(Arc::new(filter)), None)
    }

    /// Subscription that ends after its first event.
    pub fn once(&self, event_name: &str) -> Subscription {
        self.subscribe(event_name, None, Some(1))
    }

    fn subscribe(
        &self,
        event_name: &str,
        filter: Option<EventFilter>,
        limit: Option<usize>,
    ) -> Subscription {
        self.logger
            .handle(event_name, &json!({}), Direction::Receive, LogLevel::Info);
        let membership = self.channels.join(event_name);
        Subscription::new(event_name, membership, filter, limit, self.channels.clone())
    }

    /// Cancel one subscription.
    pub fn off(&self, event_name: &str, subscription: Subscription) {
        self.logger
            .handle(event_name, &json!({}), Direction::Receive, LogLevel::Info);
        if subscription.event_name() != event_name {
            debug!(
                event = event_name,
                subscribed = subscription.event_name(),
                "Unsubscribing a subscription registered under another name"
            );
        }
        subscription.unsubscribe();
    }

    /// Close the channel for `event_name`. Every subscription on it ends
    /// once it has consumed what was already delivered. Calling this for a
    /// name without a channel does nothing.
    pub fn off_all(&self, event_name: &str) -> bool {
        self.logger
            .handle(event_name, &json!({}), Direction::Receive, LogLevel::Info);
        self.channels.close(event_name)
    }

    /// Replace the active strategy.
    ///
    /// On failure the previous strategy stays installed and `false` is
    /// returned.
    pub fn set_strategy(&self, kind: StrategyKind) -> bool {
        match self.factory.create(kind) {
            Ok(strategy) => {
                *self.strategy.write() = strategy;
                info!(strategy = %kind, "Strategy changed");
                true
            }
            Err(e) => {
                self.strategy_failed(kind.as_str(), &BusError::Strategy(e));
                false
            }
        }
    }

    /// [`set_strategy`](Self::set_strategy) by identifier.
    pub fn set_strategy_named(&self, name: &str) -> bool {
        match name.parse::<StrategyKind>() {
            Ok(kind) => self.set_strategy(kind),
            Err(e) => {
                self.strategy_failed(name, &BusError::Strategy(e));
                false
            }
        }
    }

    fn strategy_failed(&self, requested: &str, err: &BusError) {
        error!(strategy = requested, error = %err, "Error setting strategy");
        self.logger.handle(
            "SetStrategy",
            &json!({ "strategy": requested, "error": err.to_string() }),
            Direction::Emit,
            LogLevel::Error,
        );
    }

    /// The active strategy.
    #[must_use]
    pub fn strategy(&self) -> Arc<dyn DispatchStrategy> {
        self.strategy.read().clone()
    }

    #[must_use]
    pub fn strategy_kind(&self) -> StrategyKind {
        self.strategy.read().kind()
    }

    /// Switch between the FIFO queue and the priority queue. Events already
    /// queued stay where they are until the mode is switched back.
    pub fn set_priority_mode(&self, enabled: bool) {
        self.priority_mode.store(enabled, Ordering::Release);
        self.logger.handle(
            "PriorityModeChange",
            &json!({ "enabled": enabled }),
            Direction::Emit,
            LogLevel::Info,
        );
    }

    #[must_use]
    pub fn priority_mode(&self) -> bool {
        self.priority_mode.load(Ordering::Acquire)
    }

    /// Events delivered per batch while draining. Values below 1 become 1.
    pub fn set_batch_size(&self, size: usize) {
        let size = size.max(1);
        self.batch_size.store(size, Ordering::Release);
        self.logger.handle(
            "BatchSizeChange",
            &json!({ "batchSize": size }),
            Direction::Emit,
            LogLevel::Info,
        );
    }

    #[must_use]
    pub fn batch_size(&self) -> usize {
        self.batch_size.load(Ordering::Acquire)
    }

    /// Register a payload schema with the validator.
    pub fn add_schema(&self, event_name: &str, schema: Box<dyn PayloadSchema>) {
        self.validator.add_schema(event_name, schema);
    }

    /// Deliver everything waiting, batch by batch.
    ///
    /// With the persisted strategy active the durable log is drained;
    /// otherwise the queue selected by the priority mode. A call made while
    /// another drain is running returns 0 immediately.
    ///
    /// Returns the number of events taken off the queue or log.
    pub fn drain_queue(&self) -> usize {
        if self.draining.swap(true, Ordering::AcqRel) {
            self.logger.handle(
                "DrainQueue",
                &json!({ "status": "already draining" }),
                Direction::Emit,
                LogLevel::Info,
            );
            return 0;
        }
        let _guard = DrainGuard(&self.draining);

        let batch_size = self.batch_size();
        let priority_mode = self.priority_mode();
        self.logger.handle(
            "DrainQueue",
            &json!({ "batchSize": batch_size, "priorityMode": priority_mode }),
            Direction::Emit,
            LogLevel::Info,
        );

        let strategy = self.strategy();
        let drained = match strategy.as_persisted() {
            Some(persisted) => {
                let events = persisted.drain();
                for batch in events.chunks(batch_size) {
                    self.deliver_batch(batch);
                }
                events.len()
            }
            None => {
                let mut drained = 0;
                loop {
                    let batch = self.next_batch(batch_size, priority_mode);
                    if batch.is_empty() {
                        self.logger.handle(
                            "QueueEmptyCheck",
                            &json!({ "priorityMode": priority_mode }),
                            Direction::Receive,
                            LogLevel::Debug,
                        );
                        break;
                    }
                    drained += batch.len();
                    self.deliver_batch(&batch);
                }
                drained
            }
        };

        self.logger.handle(
            "DrainQueueComplete",
            &json!({ "drained": drained }),
            Direction::Emit,
            LogLevel::Info,
        );
        drained
    }

    fn next_batch(&self, batch_size: usize, priority_mode: bool) -> Vec<Event> {
        let batch: Vec<Event> = {
            let mut queues = self.queues.lock();
            if priority_mode {
                std::iter::from_fn(|| queues.priority.dequeue())
                    .take(batch_size)
                    .map(Event::from)
                    .collect()
            } else {
                std::iter::from_fn(|| queues.fifo.dequeue())
                    .take(batch_size)
                    .collect()
            }
        };

        for event in &batch {
            self.logger.handle(
                "DequeueEvent",
                &json!({ "eventName": event.name }),
                Direction::Receive,
                LogLevel::Debug,
            );
        }
        batch
    }

    fn deliver_batch(&self, batch: &[Event]) {
        let started = Instant::now();
        self.logger.handle(
            "DeliverBatch",
            &json!({ "size": batch.len() }),
            Direction::Emit,
            LogLevel::Info,
        );
        for event in batch {
            self.deliver_event(event);
        }
        self.metrics.record_batch(batch.len(), started.elapsed());
    }

    /// Push one event to its channel. Returns whether any subscription
    /// received it.
    fn deliver_event(&self, event: &Event) -> bool {
        if !self.channels.has_channel(&event.name) {
            self.no_subscribers(event);
            return false;
        }

        if !self.validator.validate(&event.name, &event.payload) {
            self.logger.handle(
                "InvalidEventDuringDelivery",
                &json!({ "eventName": event.name, "payload": event.payload }),
                Direction::Emit,
                LogLevel::Error,
            );
            self.metrics.record_drop(&event.name, DropReason::Invalid);
            return false;
        }

        let Some(delivery) = self.channels.publish(event) else {
            self.no_subscribers(event);
            return false;
        };

        if delivery.closed > 0 {
            let err = BusError::SubscriberGone {
                event: event.name.clone(),
            };
            self.report("DeliverEventError", &event.name, &err, ErrorDirection::Receive);
        }

        self.logger.handle(
            "DeliverEvent",
            &json!({ "eventName": event.name, "subscribers": delivery.delivered }),
            Direction::Emit,
            LogLevel::Info,
        );
        self.metrics.record_delivery(&event.name, delivery.delivered);
        delivery.delivered > 0
    }

    fn no_subscribers(&self, event: &Event) {
        self.logger.handle(
            "NoSubscribers",
            &json!({ "eventName": event.name }),
            Direction::Emit,
            LogLevel::Error,
        );
        self.metrics
            .record_drop(&event.name, DropReason::NoSubscribers);
    }

    fn report(&self, step: &str, event_name: &str, err: &BusError, direction: ErrorDirection) {
        self.notifier.handle_error(event_name, err, direction);
        let log_direction = match direction {
            ErrorDirection::Emit => Direction::Emit,
            ErrorDirection::Receive => Direction::Receive,
        };
        self.logger.handle(
            step,
            &json!({ "eventName": event_name, "error": err.to_string() }),
            log_direction,
            LogLevel::Error,
        );
    }

    /// Events waiting in both queues.
    #[must_use]
    pub fn queue_len(&self) -> usize {
        self.queues.lock().len()
    }

    #[must_use]
    pub fn subscriber_count(&self, event_name: &str) -> usize {
        self.channels.subscriber_count(event_name)
    }

    #[must_use]
    pub fn has_channel(&self, event_name: &str) -> bool {
        self.channels.has_channel(event_name)
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("strategy", &self.strategy_kind())
            .field("priority_mode", &self.priority_mode())
            .field("batch_size", &self.batch_size())
            .field("queue_len", &self.queue_len())
            .field("channels", &self.channels.channel_count())
            .finish()
    }
}

/// Assembles an [`EventBus`] from its collaborators.
///
/// Logger, validator, notifier and durable store are required; metrics
/// default to [`NoOpMetrics`].
#[derive(Default)]
pub struct EventBusBuilder {
    config: BusConfig,
    logger: Option<Arc<dyn EventLogger>>,
    validator: Option<Arc<dyn PayloadValidator>>,
    notifier: Option<Arc<dyn ErrorNotifier>>,
    store: Option<Arc<dyn DurableStore>>,
    metrics: Option<Arc<dyn MetricsRecorder>>,
}

impl EventBusBuilder {
    #[must_use]
    pub fn config(mut self, config: BusConfig) -> Self {
        self.config = config;
        self
    }

    #[must_use]
    pub fn logger(mut self, logger: Arc<dyn EventLogger>) -> Self {
        self.logger = Some(logger);
        self
    }

    #[must_use]
    pub fn validator(mut self, validator: Arc<dyn PayloadValidator>) -> Self {
        self.validator = Some(validator);
        self
    }

    #[must_use]
    pub fn notifier(mut self, notifier: Arc<dyn ErrorNotifier>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    #[must_use]
    pub fn store(mut self, store: Arc<dyn DurableStore>) -> Self {
        self.store = Some(store);
        self
    }

    #[must_use]
    pub fn metrics(mut self, metrics: Arc<dyn MetricsRecorder>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Construct the bus and its initial strategy.
    ///
    /// Fails when a required collaborator is missing or the configured
    /// strategy cannot be built.
    pub fn build(self) -> Result<EventBus, BusError> {
        let logger = self.logger.ok_or(BusError::MissingCollaborator("logger"))?;
        let validator = self
            .validator
            .ok_or(BusError::MissingCollaborator("validator"))?;
        let notifier = self
            .notifier
            .ok_or(BusError::MissingCollaborator("error notifier"))?;
        let store = self
            .store
            .ok_or(BusError::MissingCollaborator("durable store"))?;
        let metrics = self.metrics.unwrap_or_else(|| Arc::new(NoOpMetrics));

        let config = self.config;
        let factory = StrategyFactory::new(logger.clone(), store)
            .with_metrics(metrics.clone())
            .with_unicast_mode(config.unicast_mode);
        let strategy = factory.create(config.strategy)?;

        info!(
            strategy = %config.strategy,
            priority_mode = config.priority_mode,
            batch_size = config.batch_size,
            "Event bus created"
        );

        Ok(EventBus {
            strategy: RwLock::new(strategy),
            factory,
            channels: Arc::new(ChannelRegistry::new(logger.clone())),
            queues: Mutex::new(Queues::default()),
            priority_mode: AtomicBool::new(config.priority_mode),
            batch_size: AtomicUsize::new(config.batch_size.max(1)),
            queue_capacity: config.queue_capacity,
            draining: AtomicBool::new(false),
            logger,
            validator,
            notifier,
            metrics,
        })
    }
}

impl std::fmt::Debug for EventBusBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBusBuilder")
            .field("config", &self.config)
            .field("logger", &self.logger.is_some())
            .field("validator", &self.validator.is_some())
            .field("notifier", &self.notifier.is_some())
            .field("store", &self.store.is_some())
            .finish()
    }
}
