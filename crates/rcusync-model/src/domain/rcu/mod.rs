//! RCU Module - Read-Copy-Update Protocol Model
//!
//! # Overview
//!
//! Per protected slot, the ordering constraints between read-side sections,
//! writer-side locking, publication and reclamation. Writer exclusion is
//! delegated to the lock tracker.
//!
//! # Module Structure
//!
//! ```text
//! domain/rcu/
//! ├── types.rs         SlotPhase, SupersededValue
//! ├── slot.rs          ProtectedSlot bookkeeping
//! ├── read_section.rs  per-thread nesting depth
//! ├── protocol.rs      RcuModel (hooks + findings)
//! └── proofs.rs        Kani harnesses
//! ```

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Module Declarations
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

pub mod protocol;
pub mod read_section;
pub mod slot;
pub mod types;

#[cfg(kani)]
mod proofs;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Public Re-exports
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

pub use protocol::RcuModel;
pub use read_section::ReadSections;
pub use slot::{ProtectedSlot, ReclaimOutcome};
pub use types::{SlotPhase, SupersededValue};
