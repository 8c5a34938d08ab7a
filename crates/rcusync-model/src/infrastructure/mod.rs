//! Infrastructure Layer - Files In, Model Types Out
//!
//! Everything that touches the filesystem or a wire format lives here:
//!
//! - **config**: `ModelConfig` from JSON files
//! - **trace**: recorded call traces and scenario corpora
//!
//! The domain layer never reads files; it only sees parsed values.

pub mod config;
pub mod trace;

pub use config::load_config;
pub use trace::{
    load_scenarios, load_trace, parse_scenarios, CallEvent, StoreEvent, Trace, TraceEvent,
    TraceSlot,
};
