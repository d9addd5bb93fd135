//! Cross-module integration tests.

pub mod coordinator_flows;
pub mod durable_recovery;
pub mod telemetry;
pub mod timed_delivery;
