//! Ports Layer
//!
//! Interfaces (traits) for the collaborators the bus consumes.

pub mod outbound;

pub use outbound::{
    Direction, DurableStore, ErrorDirection, ErrorNotifier, EventLogger, LogLevel, PayloadSchema,
    PayloadValidator,
};
