//! Middleware: reference implementations of the collaborator ports.
//!
//! - [`LoggingMiddleware`]: console (`tracing`) and HTTP log sink
//! - [`SchemaValidator`]: per-event payload schemas
//! - [`ErrorHandler`]: structured error reports

pub mod error_handler;
pub mod logging;
pub mod validation;

pub use error_handler::{CentralErrorService, ErrorHandler, ErrorReport, LoggingErrorService};
pub use logging::{LogOutput, LoggingConfig, LoggingMiddleware};
pub use validation::{JsonKind, JsonSchema, SchemaValidator};
