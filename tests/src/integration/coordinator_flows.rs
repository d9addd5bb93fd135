//! # Coordinator Flows
//!
//! Emit, drain and subscribe through the public `EventBus` API.
//!
//! ## Flows Tested:
//!
//! 1. **Emit → drain → subscription**: typed payloads arrive once, in order
//! 2. **Priority mode**: highest priority first, batches of `batch_size`
//! 3. **Validation**: schema violations never reach subscribers
//! 4. **Channel lifecycle**: `off_all` ends streams, late subscribers get a replay

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::time::timeout;
    use tokio_stream::StreamExt;

    use event_bus::middleware::JsonSchema;
    use event_bus::{BusConfig, BusMetrics, Event, EventBus, InMemoryStore, StrategyKind};
    use serde_json::json;

    use crate::fixtures::{order, quiet_bus, OrderCreated};

    // =============================================================================
    // EMIT → DRAIN → SUBSCRIPTION
    // =============================================================================

    #[tokio::test]
    async fn test_orders_reach_async_subscriber_in_order() {
        let bus = quiet_bus(BusConfig::default());
        let mut orders = bus.on("OrderCreated");

        for id in 1..=3 {
            bus.emit(order(id));
        }
        assert_eq!(bus.drain_queue(), 3);

        for id in 1..=3 {
            let event = timeout(Duration::from_millis(100), orders.recv())
                .await
                .expect("timeout waiting for event")
                .expect("should receive event");
            let payload: OrderCreated = event.payload_as().expect("typed payload");
            assert_eq!(payload.order_id, id);
        }
    }

    #[tokio::test]
    async fn test_subscription_is_a_stream() {
        let bus = quiet_bus(BusConfig::default());
        let sub = bus.on("Tick");

        for i in 0..5 {
            bus.emit(Event::new("Tick", i));
        }
        bus.drain_queue();

        let ticks: Vec<_> = sub.take(3).map(|event| event.payload).collect().await;
        assert_eq!(ticks, vec![json!(0), json!(1), json!(2)]);
    }

    #[tokio::test]
    async fn test_unrelated_names_do_not_cross() {
        let bus = quiet_bus(BusConfig::default());
        let mut orders = bus.on("OrderCreated");
        let mut refunds = bus.on("RefundIssued");

        bus.emit(order(7));
        bus.drain_queue();

        assert!(orders.try_recv().expect("open").is_some());
        assert_eq!(refunds.try_recv(), Ok(None));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_producers_are_all_delivered() {
        let bus = Arc::new(quiet_bus(BusConfig::default()));
        let mut sub = bus.on("Load");

        let producers: Vec<_> = (0..4)
            .map(|p| {
                let bus = bus.clone();
                tokio::spawn(async move {
                    for i in 0..25 {
                        bus.emit(Event::new("Load", p * 100 + i));
                    }
                })
            })
            .collect();
        for producer in producers {
            producer.await.expect("producer task");
        }

        assert_eq!(bus.queue_len(), 100);
        assert_eq!(bus.drain_queue(), 100);

        let mut received = 0;
        while let Ok(Some(_)) = sub.try_recv() {
            received += 1;
        }
        assert_eq!(received, 100);
    }

    // =============================================================================
    // PRIORITY MODE
    // =============================================================================

    #[test]
    fn test_priority_config_orders_by_priority() {
        let bus = quiet_bus(BusConfig {
            priority_mode: true,
            batch_size: 2,
            ..BusConfig::default()
        });
        let mut alerts = bus.on("Alert");

        bus.emit(Event::new("Alert", "low").priority(1.0));
        bus.emit(Event::new("Alert", "critical").meta("priority", 100));
        bus.emit(Event::new("Alert", "medium").priority(50.0));

        bus.drain_queue();
        let delivered: Vec<_> = std::iter::from_fn(|| alerts.try_recv().ok().flatten())
            .map(|event| event.payload)
            .collect();
        assert_eq!(delivered, vec![json!("critical"), json!("medium"), json!("low")]);
    }

    // =============================================================================
    // VALIDATION
    // =============================================================================

    #[test]
    fn test_schema_rejects_malformed_orders() {
        let bus = quiet_bus(BusConfig::default());
        let schema = JsonSchema::from_value(&json!({
            "type": "object",
            "properties": { "order_id": { "type": "integer" } },
            "required": ["order_id"]
        }))
        .expect("valid schema");
        bus.add_schema("OrderCreated", Box::new(schema));
        let mut orders = bus.on("OrderCreated");

        bus.emit(Event::new("OrderCreated", json!({ "amount_cents": 5 })));
        bus.emit(order(9));
        assert_eq!(bus.queue_len(), 1);

        bus.drain_queue();
        let event = orders.try_recv().expect("open").expect("valid order");
        assert_eq!(event.payload["order_id"], 9);
        assert_eq!(orders.try_recv(), Ok(None));
    }

    // =============================================================================
    // CHANNEL LIFECYCLE
    // =============================================================================

    #[tokio::test]
    async fn test_off_all_ends_every_stream() {
        let bus = quiet_bus(BusConfig::default());
        let first = bus.on("Shutdown");
        let second = bus.on("Shutdown");

        bus.emit(Event::new("Shutdown", "now"));
        bus.drain_queue();
        assert!(bus.off_all("Shutdown"));
        assert!(!bus.off_all("Shutdown"));

        let a: Vec<_> = first.collect().await;
        let b: Vec<_> = second.collect().await;
        assert_eq!(a.len(), 1);
        assert_eq!(b.len(), 1);
        assert!(!bus.has_channel("Shutdown"));
    }

    #[test]
    fn test_channel_lives_as_long_as_subscriptions() {
        let bus = quiet_bus(BusConfig::default());
        let a = bus.on("Status");
        let b = bus.once("Status");
        assert_eq!(bus.subscriber_count("Status"), 2);

        drop(a);
        assert!(bus.has_channel("Status"));
        bus.off("Status", b);
        assert!(!bus.has_channel("Status"));
    }

    #[test]
    fn test_replay_reaches_late_subscriber_once() {
        let bus = quiet_bus(BusConfig::default());
        let _early = bus.on("Config");
        bus.emit(Event::new("Config", json!({ "version": 1 })));
        bus.emit(Event::new("Config", json!({ "version": 2 })));
        bus.drain_queue();

        let mut late = bus.once("Config");
        let replayed = late.try_recv().expect("open").expect("replayed event");
        assert_eq!(replayed.payload["version"], 2);
        assert!(late.is_finished());
    }

    // =============================================================================
    // STRATEGY SWITCHING & METRICS
    // =============================================================================

    #[test]
    fn test_every_queued_strategy_round_trips() {
        for kind in StrategyKind::ALL.into_iter().filter(|k| !k.is_time_shaped()) {
            let bus = quiet_bus(BusConfig::default());
            assert!(bus.set_strategy(kind), "strategy {kind} should install");
            let mut sub = bus.on("X");

            if kind == StrategyKind::Persisted {
                bus.strategy().emit("X", &Event::new("X", "A"));
            } else {
                bus.emit(Event::new("X", "A"));
            }
            assert_eq!(bus.drain_queue(), 1, "strategy {kind}");
            assert_eq!(
                sub.try_recv().expect("open").map(|e| e.payload),
                Some(json!("A")),
                "strategy {kind}"
            );
        }
    }

    #[test]
    fn test_bus_metrics_snapshot() {
        let metrics = Arc::new(BusMetrics::new());
        let bus = EventBus::builder()
            .logger(Arc::new(event_bus::LoggingMiddleware::new(
                event_bus::LoggingConfig::disabled(),
            )))
            .validator(Arc::new(event_bus::SchemaValidator::new()))
            .notifier(Arc::new(event_bus::ErrorHandler::default()))
            .store(Arc::new(InMemoryStore::new()))
            .metrics(metrics.clone())
            .build()
            .expect("bus");

        let _a = bus.on("X");
        let _b = bus.on("X");
        bus.emit(Event::new("X", 1));
        bus.emit(Event::new("Y", 2));
        bus.drain_queue();

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.events_emitted, 2);
        assert_eq!(snapshot.deliveries, 2);
        assert_eq!(snapshot.dropped_no_subscribers, 1);
        assert_eq!(snapshot.max_queue_depth, 2);
    }
}
