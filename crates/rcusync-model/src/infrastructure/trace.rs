//! Trace and Scenario Files
//!
//! # Trace Format
//!
//! A trace is one path through an instrumented program, as symbolic calls:
//!
//! ```json
//! {
//!   "expected": { "Violation": "UnprotectedPublish" },
//!   "slots": [{ "name": "gp", "initial": "gp_init" }],
//!   "events": [
//!     { "thread": "writer", "function": "ldv_wlock_rcu" },
//!     { "thread": "writer", "store": "gp", "value": "pWriter" },
//!     { "thread": "writer", "function": "ldv_wunlock_rcu" }
//!   ]
//! }
//! ```
//!
//! Names are interned by the instrumentation adapter; the file never carries
//! numeric ids. A `store` event is a plain assignment to a protected pointer.
//!
//! # Scenario Files
//!
//! One [`Scenario`] object or an array of them.

use super::config::read_file;
use crate::domain::config::ModelConfig;
use crate::domain::report::Verdict;
use crate::domain::scenario::Scenario;
use crate::error::ModelError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

/// A call to a (possibly instrumented) function
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallEvent {
    /// Calling thread, by name
    pub thread: String,
    /// Function name as written in the program
    pub function: String,
    /// Arguments as symbolic names (`"&mutex"`, `"gp"`, `"pWriter"`)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub args: Vec<String>,
}

impl CallEvent {
    /// Build a call event
    pub fn new(thread: impl Into<String>, function: impl Into<String>, args: &[&str]) -> Self {
        Self {
            thread: thread.into(),
            function: function.into(),
            args: args.iter().map(|a| a.to_string()).collect(),
        }
    }
}

impl fmt::Display for CallEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}({})", self.thread, self.function, self.args.join(", "))
    }
}

/// A plain store to a protected pointer (`gp = p;`)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreEvent {
    /// Storing thread, by name
    pub thread: String,
    /// Protected pointer written
    #[serde(rename = "store")]
    pub target: String,
    /// Value written
    pub value: String,
}

/// One event of a trace
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TraceEvent {
    /// Function call
    Call(CallEvent),
    /// Plain store
    Store(StoreEvent),
}

impl TraceEvent {
    /// Thread name of the event
    pub fn thread(&self) -> &str {
        match self {
            Self::Call(call) => &call.thread,
            Self::Store(store) => &store.thread,
        }
    }
}

impl fmt::Display for TraceEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Call(call) => write!(f, "{}", call),
            Self::Store(store) => write!(f, "{}: {} = {}", store.thread, store.target, store.value),
        }
    }
}

/// Protected pointer declared by a trace
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TraceSlot {
    /// Pointer name as written in the program
    pub name: String,
    /// Value name published before the trace starts
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub initial: Option<String>,
    /// Lock name serializing writers; the slot's own update lock when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub update_lock: Option<String>,
}

/// A recorded path
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Trace {
    /// Model configuration; defaults (or the CLI's `--config`) when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config: Option<ModelConfig>,
    /// Verdict the path should produce, if known
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected: Option<Verdict>,
    /// Lock names declared up front
    #[serde(default)]
    pub locks: Vec<String>,
    /// Protected pointers declared up front
    #[serde(default)]
    pub slots: Vec<TraceSlot>,
    /// Events in path order
    pub events: Vec<TraceEvent>,
}

impl Trace {
    /// Parse a JSON trace
    pub fn from_json_str(json: &str) -> Result<Self, ModelError> {
        serde_json::from_str(json).map_err(|e| ModelError::json("trace", e))
    }
}

/// Load a JSON trace file
pub fn load_trace(path: impl AsRef<Path>) -> Result<Trace, ModelError> {
    let path = path.as_ref();
    let trace = Trace::from_json_str(&read_file(path)?)?;
    tracing::debug!(path = %path.display(), events = trace.events.len(), "trace loaded");
    Ok(trace)
}

#[derive(Deserialize)]
#[serde(untagged)]
enum OneOrMany {
    Many(Vec<Scenario>),
    One(Box<Scenario>),
}

/// Parse one scenario or an array of scenarios
pub fn parse_scenarios(json: &str) -> Result<Vec<Scenario>, ModelError> {
    let parsed: OneOrMany = serde_json::from_str(json).map_err(|e| ModelError::json("scenario", e))?;
    Ok(match parsed {
        OneOrMany::Many(scenarios) => scenarios,
        OneOrMany::One(scenario) => vec![*scenario],
    })
}

/// Load a scenario file (one scenario or an array)
pub fn load_scenarios(path: impl AsRef<Path>) -> Result<Vec<Scenario>, ModelError> {
    let path = path.as_ref();
    let scenarios = parse_scenarios(&read_file(path)?)?;
    tracing::debug!(path = %path.display(), count = scenarios.len(), "scenarios loaded");
    Ok(scenarios)
}
