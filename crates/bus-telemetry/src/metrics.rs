//! Prometheus metrics for the event bus.
//!
//! All metrics follow the naming convention: `event_bus_<metric>_<unit>`
//!
//! ## Metric Types
//!
//! - **Counter**: emitted, enqueued, delivered, dropped events and drained batches
//! - **Gauge**: queue length after the latest enqueue
//! - **Histogram**: batch delivery time and batch size

use event_bus::{DropReason, MetricsRecorder};
use lazy_static::lazy_static;
use prometheus::{
    exponential_buckets, Counter, CounterVec, Encoder, Gauge, Histogram, HistogramOpts, Opts,
    Registry, TextEncoder,
};
use std::time::Duration;

use crate::TelemetryError;

lazy_static! {
    /// Global metrics registry
    pub static ref REGISTRY: Registry = Registry::new();
}

/// [`MetricsRecorder`] that feeds Prometheus collectors.
#[derive(Clone)]
pub struct PrometheusRecorder {
    registry: Registry,
    events_emitted: CounterVec,
    events_enqueued: Counter,
    queue_depth: Gauge,
    deliveries: CounterVec,
    events_dropped: CounterVec,
    batches_drained: Counter,
    batch_duration: Histogram,
    batch_size: Histogram,
}

fn metrics_err(e: prometheus::Error) -> TelemetryError {
    TelemetryError::MetricsInit(e.to_string())
}

impl PrometheusRecorder {
    /// Create the collectors and register them with `registry`.
    pub fn with_registry(registry: &Registry) -> Result<Self, TelemetryError> {
        let events_emitted = CounterVec::new(
            Opts::new("event_bus_events_emitted_total", "Events accepted by emit"),
            &["event_type"],
        )
        .map_err(metrics_err)?;

        let events_enqueued = Counter::new(
            "event_bus_events_enqueued_total",
            "Events pushed onto a coordinator queue",
        )
        .map_err(metrics_err)?;

        let queue_depth = Gauge::new(
            "event_bus_queue_depth",
            "Queue length after the most recent enqueue",
        )
        .map_err(metrics_err)?;

        let deliveries = CounterVec::new(
            Opts::new(
                "event_bus_deliveries_total",
                "Events delivered to individual subscriptions",
            ),
            &["event_type"],
        )
        .map_err(metrics_err)?;

        let events_dropped = CounterVec::new(
            Opts::new("event_bus_events_dropped_total", "Events that reached no subscriber"),
            &["event_type", "reason"],
        )
        .map_err(metrics_err)?;

        let batches_drained = Counter::new(
            "event_bus_batches_drained_total",
            "Batches delivered by queue drains",
        )
        .map_err(metrics_err)?;

        let batch_duration = Histogram::with_opts(
            HistogramOpts::new(
                "event_bus_batch_duration_seconds",
                "Time spent delivering one drained batch",
            )
            .buckets(exponential_buckets(0.00001, 2.0, 15).map_err(metrics_err)?),
        )
        .map_err(metrics_err)?;

        let batch_size = Histogram::with_opts(
            HistogramOpts::new("event_bus_batch_size", "Events per drained batch")
                .buckets(exponential_buckets(1.0, 2.0, 10).map_err(metrics_err)?),
        )
        .map_err(metrics_err)?;

        let collectors: Vec<Box<dyn prometheus::core::Collector>> = vec![
            Box::new(events_emitted.clone()),
            Box::new(events_enqueued.clone()),
            Box::new(queue_depth.clone()),
            Box::new(deliveries.clone()),
            Box::new(events_dropped.clone()),
            Box::new(batches_drained.clone()),
            Box::new(batch_duration.clone()),
            Box::new(batch_size.clone()),
        ];
        for collector in collectors {
            registry.register(collector).map_err(metrics_err)?;
        }

        Ok(Self {
            registry: registry.clone(),
            events_emitted,
            events_enqueued,
            queue_depth,
            deliveries,
            events_dropped,
            batches_drained,
            batch_duration,
            batch_size,
        })
    }

    /// Encode this recorder's registry in Prometheus text format.
    pub fn gather_text(&self) -> Result<String, TelemetryError> {
        encode(&self.registry)
    }
}

impl std::fmt::Debug for PrometheusRecorder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PrometheusRecorder").finish_non_exhaustive()
    }
}

impl MetricsRecorder for PrometheusRecorder {
    fn record_emit(&self, event_name: &str) {
        self.events_emitted.with_label_values(&[event_name]).inc();
    }

    fn record_enqueue(&self, depth: usize) {
        self.events_enqueued.inc();
        self.queue_depth.set(depth as f64);
    }

    fn record_delivery(&self, event_name: &str, subscribers: usize) {
        self.deliveries
            .with_label_values(&[event_name])
            .inc_by(subscribers as f64);
    }

    fn record_drop(&self, event_name: &str, reason: DropReason) {
        self.events_dropped
            .with_label_values(&[event_name, reason.as_str()])
            .inc();
    }

    fn record_batch(&self, size: usize, duration: Duration) {
        self.batches_drained.inc();
        self.batch_duration.observe(duration.as_secs_f64());
        self.batch_size.observe(size as f64);
    }
}

/// Register the bus metrics with the global registry.
///
/// Fails if they are already registered.
pub fn register_metrics() -> Result<PrometheusRecorder, TelemetryError> {
    PrometheusRecorder::with_registry(&REGISTRY)
}

/// Encode all metrics in the global registry as Prometheus text format.
pub fn encode_metrics() -> Result<String, TelemetryError> {
    encode(&REGISTRY)
}

fn encode(registry: &Registry) -> Result<String, TelemetryError> {
    let encoder = TextEncoder::new();
    let metric_families = registry.gather();
    let mut buffer = Vec::new();
    encoder
        .encode(&metric_families, &mut buffer)
        .map_err(metrics_err)?;
    String::from_utf8(buffer).map_err(|e| TelemetryError::MetricsInit(e.to_string()))
}
