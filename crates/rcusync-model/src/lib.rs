//! RCU Synchronization-Discipline Model
//!
//! # Overview
//!
//! `rcusync-model` is the state model a program verifier consults while it
//! explores paths of a concurrent program. It answers one question per
//! instrumented call: did this step break lock discipline or the RCU
//! protocol?
//!
//! # Trinity Architecture
//!
//! - **Domain**: lock tracker, RCU protocol model, findings, scenarios
//! - **Infrastructure**: configuration and trace files
//! - **Adapters**: call-name instrumentation and a thread-safe handle
//!
//! # Rules Checked
//!
//! ## Lock Discipline
//! - **Alternation**: lock and unlock of one lock alternate
//! - **Single init**: a held lock is never re-initialized
//! - **Release at exit**: nothing is held when the program ends
//!
//! ## RCU Protocol
//! - **Read protection**: dereference only inside a read-side section
//! - **Writer exclusion**: publish only while holding the slot's update lock
//! - **Deferred reclamation**: free a superseded value only after a later
//!   grace period
//! - **No self-wait**: no grace period inside a read-side section
//!
//! # Usage
//!
//! ```rust
//! use rcusync_model::domain::{ProductionModel, PtrValue, SlotId, ThreadId, ViolationKind};
//!
//! let mut model = ProductionModel::new();
//! let (writer, gp) = (ThreadId::new(2), SlotId::new(0));
//! model.declare_slot(gp, None, Some(PtrValue::new(1))).unwrap();
//!
//! // Publishing without the update-side lock
//! let report = model.assign_pointer(writer, gp, PtrValue::new(2)).unwrap_err();
//! assert_eq!(report.kind, ViolationKind::UnprotectedPublish);
//!
//! // The slot moved on regardless
//! assert_eq!(model.slot(gp).unwrap().current(), Some(PtrValue::new(2)));
//! ```
//!
//! # Feature Flags
//!
//! - `cfg(kani)`: bounded proofs over the verification backend

#![warn(missing_docs)]
#![warn(clippy::all)]

// Trinity Architecture Layers
pub mod adapters;
pub mod domain;
pub mod error;
pub mod infrastructure;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Re-export Primary Types
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

// Identities
pub use domain::{LockId, PtrValue, SlotId, ThreadId};

// Findings
pub use domain::{FindingLog, Operand, Verdict, ViolationKind, ViolationReport};

// Models
pub use domain::{ModelConfig, ProductionModel, SyncModel, VerificationModel};

// Replay
pub use adapters::{Instrumenter, SharedModel, TraceOutcome};
pub use domain::{ReplayOutcome, Scenario};

pub use error::ModelError;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_defined() {
        assert!(!VERSION.is_empty());
    }

    #[test]
    fn test_both_models_exported() {
        let production = ProductionModel::new();
        let verification = VerificationModel::new();
        assert_eq!(production.verdict(), Verdict::Clean);
        assert_eq!(verification.verdict(), Verdict::Clean);
    }
}
