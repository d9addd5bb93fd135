//! # Error Handler Middleware
//!
//! Turns an error into a structured [`ErrorReport`], logs it, and forwards it
//! to a [`CentralErrorService`]. The `source()` chain stands in for a stack.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info};

use crate::ports::{ErrorDirection, ErrorNotifier};

/// Structured description of a failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorReport {
    /// RFC 3339 timestamp.
    pub timestamp: String,
    pub event_type: String,
    pub direction: ErrorDirection,
    pub message: String,
    /// Messages of the error's sources, outermost first.
    pub causes: Vec<String>,
}

impl ErrorReport {
    pub fn capture(
        event_name: &str,
        err: &(dyn std::error::Error + 'static),
        direction: ErrorDirection,
    ) -> Self {
        let mut causes = Vec::new();
        let mut source = err.source();
        while let Some(cause) = source {
            causes.push(cause.to_string());
            source = cause.source();
        }

        Self {
            timestamp: chrono::Utc::now().to_rfc3339(),
            event_type: event_name.to_string(),
            direction,
            message: err.to_string(),
            causes,
        }
    }
}

/// Destination for error reports (monitoring, alerting).
pub trait CentralErrorService: Send + Sync {
    fn notify(&self, report: &ErrorReport);
}

/// Central service that only logs the report.
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingErrorService;

impl CentralErrorService for LoggingErrorService {
    fn notify(&self, report: &ErrorReport) {
        info!(
            event = %report.event_type,
            direction = ?report.direction,
            "Notifying central error service"
        );
    }
}

/// Reference [`ErrorNotifier`].
#[derive(Clone)]
pub struct ErrorHandler {
    service: Arc<dyn CentralErrorService>,
}

impl ErrorHandler {
    pub fn new(service: Arc<dyn CentralErrorService>) -> Self {
        Self { service }
    }
}

impl Default for ErrorHandler {
    fn default() -> Self {
        Self::new(Arc::new(LoggingErrorService))
    }
}

impl ErrorNotifier for ErrorHandler {
    fn handle_error(
        &self,
        event_name: &str,
        err: &(dyn std::error::Error + 'static),
        direction: ErrorDirection,
    ) {
        let report = ErrorReport::capture(event_name, err, direction);
        match serde_json::to_string_pretty(&report) {
            Ok(json) => error!(event = event_name, "[ERROR]: {json}"),
            Err(_) => error!(event = event_name, message = %report.message, "[ERROR]"),
        }
        self.service.notify(&report);
    }
}
