//! # Bus Telemetry
//!
//! Observability wiring for services embedding the event bus.
//!
//! - **Tracing**: `tracing-subscriber` registry with an `EnvFilter` and a
//!   pretty or JSON console layer
//! - **Metrics**: [`PrometheusRecorder`], an
//!   [`event_bus::MetricsRecorder`] backed by Prometheus collectors
//!
//! ## Usage
//!
//! ```rust,ignore
//! use bus_telemetry::{init_telemetry, TelemetryConfig};
//! use event_bus::EventBus;
//! use std::sync::Arc;
//!
//! let recorder = init_telemetry(&TelemetryConfig::from_env())?;
//! let bus = EventBus::builder()
//!     .metrics(Arc::new(recorder))
//!     // logger, validator, notifier, store ...
//!     .build()?;
//! ```
//!
//! ## Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `EVENT_BUS_SERVICE_NAME` | `event-bus` | Service name in logs |
//! | `EVENT_BUS_LOG_LEVEL` / `RUST_LOG` | `info` | Log level filter |
//! | `EVENT_BUS_JSON_LOGS` | `false` (`true` in containers) | JSON formatted logs |
//! | `EVENT_BUS_CONSOLE_OUTPUT` | `true` | Write logs to stdout |

mod config;
mod metrics;
mod tracing_setup;

pub use config::TelemetryConfig;
pub use metrics::{encode_metrics, register_metrics, PrometheusRecorder, REGISTRY};
pub use tracing_setup::init_tracing;

use thiserror::Error;

/// Telemetry initialization errors
#[derive(Error, Debug)]
pub enum TelemetryError {
    #[error("Failed to initialize tracing: {0}")]
    TracingInit(String),

    #[error("Failed to initialize Prometheus metrics: {0}")]
    MetricsInit(String),
}

/// Initialize tracing and register the bus metrics with the global registry.
///
/// Returns the recorder to hand to the event bus.
pub fn init_telemetry(config: &TelemetryConfig) -> Result<PrometheusRecorder, TelemetryError> {
    let recorder = register_metrics()?;
    init_tracing(config)?;
    Ok(recorder)
}
