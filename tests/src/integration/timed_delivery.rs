//! # Timed Delivery
//!
//! Debounce, throttle and delayed strategies installed in the coordinator.
//! `emit` hands events straight to them; listeners are attached through
//! `EventBus::strategy()`. All tests run on paused tokio time.

#[cfg(test)]
mod tests {
    use std::time::Duration;
    use tokio::time::sleep;

    use event_bus::{BusConfig, Event, StrategyKind};
    use serde_json::json;

    use crate::fixtures::{quiet_bus, recording_listener};

    #[tokio::test(start_paused = true)]
    async fn test_debounce_delivers_last_of_burst() {
        let bus = quiet_bus(BusConfig::default());
        assert!(bus.set_strategy(StrategyKind::Debounce));
        let (listener, seen) = recording_listener();
        bus.strategy().subscribe("SearchTyped", listener);

        for query in ["first", "second", "third"] {
            bus.emit(Event::new("SearchTyped", query));
            sleep(Duration::from_millis(50)).await;
        }
        assert!(seen.lock().is_empty());
        assert_eq!(bus.queue_len(), 0);

        sleep(Duration::from_millis(300)).await;
        assert_eq!(*seen.lock(), vec![json!("third")]);

        sleep(Duration::from_secs(2)).await;
        assert_eq!(seen.lock().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_debounce_keys_are_independent() {
        let bus = quiet_bus(BusConfig::default());
        assert!(bus.set_strategy(StrategyKind::Debounce));
        let (listener_a, seen_a) = recording_listener();
        let (listener_b, seen_b) = recording_listener();
        bus.strategy().subscribe("A", listener_a);
        bus.strategy().subscribe("B", listener_b);

        bus.emit(Event::new("A", 1));
        bus.emit(Event::new("B", 1).meta("debounceDelay", 50));
        bus.emit(Event::new("A", 2));

        sleep(Duration::from_millis(60)).await;
        assert_eq!(*seen_b.lock(), vec![json!(1)]);
        assert!(seen_a.lock().is_empty());

        sleep(Duration::from_millis(300)).await;
        assert_eq!(*seen_a.lock(), vec![json!(2)]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_throttle_window_from_config() {
        let bus = quiet_bus(BusConfig {
            strategy: StrategyKind::Throttle,
            ..BusConfig::default()
        });
        let (listener, seen) = recording_listener();
        bus.strategy().subscribe("Scroll", listener);

        bus.emit(Event::new("Scroll", "first"));
        bus.emit(Event::new("Scroll", "second"));
        bus.emit(Event::new("Scroll", "third"));
        assert_eq!(*seen.lock(), vec![json!("first")]);

        sleep(Duration::from_millis(1001)).await;
        bus.emit(Event::new("Scroll", "fourth"));
        assert_eq!(*seen.lock(), vec![json!("first"), json!("fourth")]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_delayed_events_are_not_collapsed() {
        let bus = quiet_bus(BusConfig::default());
        assert!(bus.set_strategy_named("delayed"));
        let (listener, seen) = recording_listener();
        bus.strategy().subscribe("Reminder", listener);

        bus.emit(Event::new("Reminder", "slow"));
        bus.emit(Event::new("Reminder", "fast").meta("delay", 100));

        sleep(Duration::from_millis(150)).await;
        assert_eq!(*seen.lock(), vec![json!("fast")]);

        sleep(Duration::from_millis(900)).await;
        assert_eq!(*seen.lock(), vec![json!("fast"), json!("slow")]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_invalid_payload_never_reaches_timed_strategy() {
        let bus = quiet_bus(BusConfig::default());
        assert!(bus.set_strategy(StrategyKind::Delayed));
        bus.add_schema(
            "Reminder",
            Box::new(|payload: &serde_json::Value| {
                if payload.is_string() {
                    Ok(())
                } else {
                    Err(vec!["reminder text must be a string".to_string()])
                }
            }),
        );
        let (listener, seen) = recording_listener();
        bus.strategy().subscribe("Reminder", listener);

        bus.emit(Event::new("Reminder", 42));
        sleep(Duration::from_secs(2)).await;
        assert!(seen.lock().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_switching_back_to_queued_strategy() {
        let bus = quiet_bus(BusConfig::default());
        assert!(bus.set_strategy(StrategyKind::Throttle));
        bus.emit(Event::new("X", 1));
        assert_eq!(bus.queue_len(), 0);

        assert!(bus.set_strategy(StrategyKind::Stateless));
        bus.emit(Event::new("X", 2));
        assert_eq!(bus.queue_len(), 1);
    }
}
