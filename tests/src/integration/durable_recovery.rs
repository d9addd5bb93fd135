//! # Durable Recovery
//!
//! The persisted strategy over a `FileStore`: events written while nobody
//! consumes them survive a restart and are delivered by the next drain.

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use event_bus::strategies::persisted::PERSISTED_EVENTS_KEY;
    use event_bus::strategies::PersistedStrategy;
    use event_bus::{BusConfig, DispatchStrategy, DurableStore, Event, FileStore, StrategyKind};
    use serde_json::json;
    use tempfile::TempDir;

    use crate::fixtures::{order, quiet_bus_with_store, recording_listener};

    fn persisted_config() -> BusConfig {
        BusConfig {
            strategy: StrategyKind::Persisted,
            batch_size: 2,
            ..BusConfig::default()
        }
    }

    #[test]
    fn test_log_survives_restart() {
        let dir = TempDir::new().unwrap();

        {
            let store = Arc::new(FileStore::open(dir.path()).unwrap());
            let bus = quiet_bus_with_store(persisted_config(), store);
            let strategy = bus.strategy();
            for id in 1..=3 {
                strategy.emit("OrderCreated", &order(id));
            }
        }

        let store = Arc::new(FileStore::open(dir.path()).unwrap());
        let bus = quiet_bus_with_store(persisted_config(), store.clone());
        let mut orders = bus.on("OrderCreated");

        assert_eq!(bus.drain_queue(), 3);
        let ids: Vec<_> = std::iter::from_fn(|| orders.try_recv().ok().flatten())
            .map(|event| event.payload["order_id"].clone())
            .collect();
        assert_eq!(ids, vec![json!(1), json!(2), json!(3)]);

        assert_eq!(store.get(PERSISTED_EVENTS_KEY).unwrap().as_deref(), Some("[]"));
        assert_eq!(bus.drain_queue(), 0);
    }

    #[test]
    fn test_standalone_persisted_strategy_on_disk() {
        let dir = TempDir::new().unwrap();
        let store = Arc::new(FileStore::open(dir.path()).unwrap());
        let strategy = PersistedStrategy::new(store.clone()).unwrap();

        let (listener, seen) = recording_listener();
        strategy.subscribe("Audit", listener);
        assert_eq!(strategy.emit("Audit", &Event::new("Audit", "login")), 1);
        assert_eq!(strategy.emit("Audit", &Event::new("Audit", "logout")), 1);

        assert_eq!(*seen.lock(), vec![json!("login"), json!("logout")]);
        assert_eq!(strategy.pending().unwrap(), 2);

        let reopened = PersistedStrategy::new(Arc::new(FileStore::open(dir.path()).unwrap()))
            .unwrap();
        let drained = reopened.drain();
        assert_eq!(drained.len(), 2);
        assert_eq!(drained[0].payload, "login");
        assert_eq!(strategy.pending().unwrap(), 0);
    }

    #[test]
    fn test_drain_order_matches_emit_order_across_batches() {
        let dir = TempDir::new().unwrap();
        let store = Arc::new(FileStore::open(dir.path()).unwrap());
        let bus = quiet_bus_with_store(
            BusConfig {
                batch_size: 3,
                ..persisted_config()
            },
            store,
        );
        let mut sub = bus.on("Tick");

        let strategy = bus.strategy();
        for i in 0..7 {
            strategy.emit("Tick", &Event::new("Tick", i));
        }

        assert_eq!(bus.drain_queue(), 7);
        let ticks: Vec<_> = std::iter::from_fn(|| sub.try_recv().ok().flatten())
            .map(|event| event.payload)
            .collect();
        assert_eq!(ticks, (0..7).map(|i| json!(i)).collect::<Vec<_>>());
    }
}
