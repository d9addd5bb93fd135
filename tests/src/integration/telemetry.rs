//! # Telemetry Wiring
//!
//! `bus-telemetry` configuration and the Prometheus recorder attached to a
//! running bus.

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use bus_telemetry::{PrometheusRecorder, TelemetryConfig};
    use event_bus::{
        BusConfig, ErrorHandler, Event, EventBus, InMemoryStore, LoggingConfig, LoggingMiddleware,
        SchemaValidator,
    };
    use prometheus::Registry;

    fn bus_with(recorder: PrometheusRecorder, config: BusConfig) -> EventBus {
        EventBus::builder()
            .config(config)
            .logger(Arc::new(LoggingMiddleware::new(LoggingConfig::disabled())))
            .validator(Arc::new(SchemaValidator::new()))
            .notifier(Arc::new(ErrorHandler::default()))
            .store(Arc::new(InMemoryStore::new()))
            .metrics(Arc::new(recorder))
            .build()
            .expect("bus")
    }

    #[test]
    fn test_prometheus_recorder_sees_bus_activity() {
        let recorder = PrometheusRecorder::with_registry(&Registry::new()).expect("recorder");
        let bus = bus_with(recorder.clone(), BusConfig::default());

        let _sub = bus.on("OrderCreated");
        bus.emit(Event::new("OrderCreated", 1));
        bus.emit(Event::new("OrderCreated", 2));
        bus.emit(Event::new("Orphan", 3));
        bus.drain_queue();

        let text = recorder.gather_text().expect("encode");
        assert!(text.contains(r#"event_bus_events_emitted_total{event_type="OrderCreated"} 2"#));
        assert!(text.contains(r#"event_bus_deliveries_total{event_type="OrderCreated"} 2"#));
        assert!(text.contains(
            r#"event_bus_events_dropped_total{event_type="Orphan",reason="no_subscribers"} 1"#
        ));
        assert!(text.contains("event_bus_batches_drained_total 3"));
    }

    #[test]
    fn test_enqueue_refusal_counts_as_drop() {
        let recorder = PrometheusRecorder::with_registry(&Registry::new()).expect("recorder");
        let bus = bus_with(
            recorder.clone(),
            BusConfig {
                queue_capacity: Some(1),
                ..BusConfig::default()
            },
        );

        bus.emit(Event::new("X", 1));
        bus.emit(Event::new("X", 2));

        let text = recorder.gather_text().expect("encode");
        assert!(text.contains(r#"reason="enqueue_failed"} 1"#));
        assert!(text.contains("event_bus_queue_depth 1"));
    }

    #[test]
    fn test_telemetry_config_from_lookup() {
        let config = TelemetryConfig::from_lookup(|key: &str| match key {
            "EVENT_BUS_SERVICE_NAME" => Some("orders".to_string()),
            "EVENT_BUS_LOG_LEVEL" => Some("debug".to_string()),
            _ => None,
        });
        assert_eq!(config.service_name, "orders");
        assert_eq!(config.log_level, "debug");
        assert!(config.console_output);
    }
}
