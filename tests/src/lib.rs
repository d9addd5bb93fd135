//! # Event Bus Test Suite
//!
//! ## Structure
//!
//! ```text
//! tests/
//! ├── benches/
//! │   └── bus_benchmarks.rs    # Emit/drain throughput, queue primitives
//! └── src/integration/
//!     ├── coordinator_flows.rs # Emit, drain and subscribe end to end
//!     ├── timed_delivery.rs    # Debounce, throttle and delayed via the coordinator
//!     ├── durable_recovery.rs  # Persisted log surviving a restart
//!     └── telemetry.rs         # Prometheus recorder wired into the bus
//! ```
//!
//! ## Running Tests
//!
//! ```bash
//! cargo test -p event-bus-tests
//! cargo bench -p event-bus-tests
//! ```

pub mod fixtures;
pub mod integration;
