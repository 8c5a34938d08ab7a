//! Adapters Layer - Ports & Adapters Pattern
//!
//! Adapters connect the outside world to the domain model.
//!
//! # Hexagonal Architecture
//! - Inbound: recorded calls → hooks ([`Instrumenter`])
//! - Inbound: real driver threads → one linearized model ([`SharedModel`])

pub mod instrument;
pub mod shared;

// Re-exports
pub use instrument::{Dispatch, Instrumenter, SymbolTable, TraceOutcome};
pub use shared::{ReadGuard, SharedModel, WriteGuard};
