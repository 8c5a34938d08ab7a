//! Lock Module - Lock-State Tracker
//!
//! # Overview
//!
//! Per lock object a two-state automaton (`Unlocked`/`Locked`) plus the
//! program-wide "all locks released" checkpoint. Leaf component: the RCU
//! protocol model drives it for writer-side exclusion.
//!
//! # Module Structure
//!
//! ```text
//! domain/lock/
//! ├── types.rs                LockState, LockEntry
//! ├── backend.rs              LockBackend trait
//! ├── production_backend.rs   DashMap registry (unbounded)
//! ├── verification_backend.rs fixed array registry (Kani)
//! ├── tracker.rs              LockTracker<B>
//! └── proofs.rs               Kani harnesses
//! ```
//!
//! # Dual-Mode Operation
//!
//! `LockTracker<B>` is generic over the registry. The checker that replays
//! traces and the Kani harnesses run the same transition code; only the
//! storage differs.

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Module Declarations
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

pub mod backend;
pub mod production_backend;
pub mod tracker;
pub mod types;
pub mod verification_backend;

#[cfg(kani)]
mod proofs;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Public Re-exports
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

pub use backend::LockBackend;
pub use production_backend::ProductionBackend;
pub use tracker::LockTracker;
pub use types::{LockEntry, LockState};
pub use verification_backend::{VerificationBackend, MAX_LOCKS};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Type Aliases
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Tracker over the unbounded `DashMap` registry
pub type ProductionLockTracker = LockTracker<ProductionBackend>;

/// Tracker over the bounded array registry
pub type VerificationLockTracker = LockTracker<VerificationBackend>;
