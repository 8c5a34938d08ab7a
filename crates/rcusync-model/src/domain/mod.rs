//! Domain Layer - The Synchronization-Discipline Model
//!
//! # Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      Domain Layer                           │
//! ├─────────────────────────────────────────────────────────────┤
//! │                                                             │
//! │  Lock Module                   RCU Module                   │
//! │  ├─ LockTracker<B>   <──────── ├─ RcuModel                  │
//! │  ├─ ProductionBackend          ├─ ProtectedSlot             │
//! │  └─ VerificationBackend        └─ ReadSections              │
//! │                                                             │
//! │                    SyncModel<B>                             │
//! │                    ├─ ModelConfig                           │
//! │                    ├─ FindingLog / Verdict                  │
//! │                    └─ HookTable                             │
//! │                                                             │
//! │                    Scenario Replay                          │
//! │                    └─ Scenario / Step / Schedule            │
//! │                                                             │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! The RCU module uses the lock tracker for writer-side exclusion; the lock
//! tracker knows nothing about RCU.
//!
//! # Type Aliases
//!
//! - `ProductionModel`: `DashMap` lock registry, unbounded
//! - `VerificationModel`: fixed array lock registry, Kani-friendly
//!
//! ```rust
//! use rcusync_model::domain::*;
//!
//! let mut model = ProductionModel::new();
//! let (reader, gp) = (ThreadId::new(1), SlotId::new(0));
//! model.declare_slot(gp, None, Some(PtrValue::new(1))).unwrap();
//!
//! model.enter_read(reader).unwrap();
//! assert_eq!(model.dereference(reader, gp).unwrap(), Some(PtrValue::new(1)));
//! model.exit_read(reader).unwrap();
//!
//! assert!(model.finish());
//! assert_eq!(model.verdict(), Verdict::Clean);
//! ```

pub mod config;
pub mod hook;
pub mod lock;
pub mod model;
pub mod rcu;
pub mod report;
pub mod scenario;
pub mod types;

// Identity types
pub use types::{LockId, PtrValue, SlotId, ThreadId};

// Findings
pub use report::{FindingLog, Operand, Verdict, ViolationKind, ViolationReport};

// Lock tracker
pub use lock::{LockBackend, LockEntry, LockState, LockTracker};

// RCU model
pub use rcu::{ProtectedSlot, RcuModel, SlotPhase};

// Facade and configuration
pub use config::ModelConfig;
pub use hook::{HookKind, HookOverrides, HookTable};
pub use model::{ProductionModel, SyncModel, VerificationModel};
pub use scenario::{ReplayOutcome, Scenario, Schedule, Step, ThreadBody};
