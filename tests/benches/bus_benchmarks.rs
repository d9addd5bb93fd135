//! # Event Bus Benchmarks
//!
//! | Area | Operation |
//! |------|-----------|
//! | Queues | FIFO and priority enqueue/dequeue |
//! | Coordinator | emit + drain to one subscription, by batch size |
//! | Strategies | synchronous fan-out through broadcast and priority |

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use std::sync::Arc;

use event_bus::strategies::{BroadcastStrategy, PriorityStrategy};
use event_bus::{
    BusConfig, DispatchStrategy, ErrorHandler, Event, EventBus, FifoQueue, InMemoryStore,
    Listener, LoggingConfig, LoggingMiddleware, PriorityEvent, PriorityQueue, SchemaValidator,
};

fn quiet_bus(batch_size: usize) -> EventBus {
    EventBus::builder()
        .config(BusConfig {
            batch_size,
            ..BusConfig::default()
        })
        .logger(Arc::new(LoggingMiddleware::new(LoggingConfig::disabled())))
        .validator(Arc::new(SchemaValidator::new()))
        .notifier(Arc::new(ErrorHandler::default()))
        .store(Arc::new(InMemoryStore::new()))
        .build()
        .expect("bus")
}

// ============================================================================
// Queue primitives
// ============================================================================

fn bench_queues(c: &mut Criterion) {
    let mut group = c.benchmark_group("queues");

    for size in [100usize, 1_000, 10_000] {
        group.throughput(Throughput::Elements(size as u64));

        group.bench_with_input(BenchmarkId::new("fifo", size), &size, |b, &size| {
            b.iter(|| {
                let mut queue = FifoQueue::new();
                for i in 0..size {
                    queue.enqueue(i);
                }
                while let Some(item) = queue.dequeue() {
                    black_box(item);
                }
            })
        });

        let events: Vec<_> = (0..size)
            .map(|i| PriorityEvent::from_event(Event::new("p", i).priority((i % 17) as f64)))
            .collect();
        group.bench_with_input(BenchmarkId::new("priority", size), &events, |b, events| {
            b.iter(|| {
                let mut queue = PriorityQueue::new();
                for event in events {
                    queue.enqueue(event.clone());
                }
                while let Some(item) = queue.dequeue() {
                    black_box(item);
                }
            })
        });
    }

    group.finish();
}

// ============================================================================
// Coordinator emit + drain
// ============================================================================

fn bench_emit_and_drain(c: &mut Criterion) {
    let mut group = c.benchmark_group("coordinator");
    let events = 1_000u64;
    group.throughput(Throughput::Elements(events));

    for batch_size in [1usize, 10, 100] {
        group.bench_with_input(
            BenchmarkId::new("emit_drain", batch_size),
            &batch_size,
            |b, &batch_size| {
                let bus = quiet_bus(batch_size);
                let mut sub = bus.on("Bench");
                b.iter(|| {
                    for i in 0..events {
                        bus.emit(Event::new("Bench", i));
                    }
                    black_box(bus.drain_queue());
                    while let Ok(Some(event)) = sub.try_recv() {
                        black_box(event);
                    }
                })
            },
        );
    }

    group.finish();
}

// ============================================================================
// Synchronous strategies
// ============================================================================

fn bench_fan_out(c: &mut Criterion) {
    let mut group = c.benchmark_group("fan_out");
    let event = Event::new("Fan", "payload");

    for listeners in [1usize, 10, 100] {
        let broadcast = BroadcastStrategy::new();
        let priority = PriorityStrategy::new();
        for i in 0..listeners {
            broadcast.subscribe("Fan", Listener::new(|event| {
                black_box(event);
            }));
            priority.subscribe_with_priority(
                "Fan",
                Listener::new(|event| {
                    black_box(event);
                }),
                (i % 5) as i32,
            );
        }

        group.throughput(Throughput::Elements(listeners as u64));
        group.bench_with_input(BenchmarkId::new("broadcast", listeners), &event, |b, event| {
            b.iter(|| black_box(broadcast.emit("Fan", event)))
        });
        group.bench_with_input(BenchmarkId::new("priority", listeners), &event, |b, event| {
            b.iter(|| black_box(priority.emit("Fan", event)))
        });
    }

    group.finish();
}

criterion_group!(benches, bench_queues, bench_emit_and_drain, bench_fan_out);
criterion_main!(benches);
