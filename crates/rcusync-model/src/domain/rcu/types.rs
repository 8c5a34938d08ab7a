//! RCU Types
//!
//! # Slot Phases
//!
//! ```text
//!            write_lock                      assign_pointer
//!   Stable ─────────────> Publishing ─────────────────────> GracePending
//!     ↑                      │ write_unlock, nothing published    │
//!     │                      ↓                                    │
//!     │          (GracePending if values still pending)           │
//!     └──────────────────────────── synchronize ──────────────────┘
//!
//!   write_lock on a GracePending slot also enters Publishing.
//!   assign_pointer without the lock, raw_store ──> GracePending
//! ```
//!
//! A phase only describes where the slot stands in the current update; it
//! does not gate any operation. Legality of `reclaim` is decided per value
//! from grace epochs (see [`SupersededValue`]).

use crate::domain::types::PtrValue;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Where a slot is in its publish/reclaim cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SlotPhase {
    /// No update in flight; everything superseded is reclaimable
    Stable,
    /// A writer holds the update-side lock and has not published yet
    Publishing,
    /// A new value was published and no grace period has elapsed since
    GracePending,
}

impl fmt::Display for SlotPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Stable => write!(f, "STABLE"),
            Self::Publishing => write!(f, "PUBLISHING"),
            Self::GracePending => write!(f, "GRACE_PENDING"),
        }
    }
}

/// A value replaced by a later publish, awaiting reclamation
///
/// # Design Notes
///
/// Each slot counts grace periods in `grace_epoch`. When a value is
/// superseded we record the epoch current at that moment. A later grace
/// period bumps the slot's epoch, so the value is reclaimable exactly when
/// `epoch < slot.grace_epoch`: some grace period was issued strictly after
/// the supersession.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SupersededValue {
    /// The replaced value
    pub value: PtrValue,
    /// Generation of the publish that replaced it
    pub generation: u64,
    /// Slot grace epoch at the time it was replaced
    pub epoch: u64,
}

impl SupersededValue {
    /// Whether a grace period has elapsed since the supersession
    #[inline(always)]
    pub const fn is_reclaimable(&self, grace_epoch: u64) -> bool {
        self.epoch < grace_epoch
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reclaimable_needs_later_epoch() {
        let record = SupersededValue {
            value: PtrValue::new(1),
            generation: 1,
            epoch: 3,
        };
        assert!(!record.is_reclaimable(3));
        assert!(record.is_reclaimable(4));
    }

    #[test]
    fn test_phase_display() {
        assert_eq!(SlotPhase::GracePending.to_string(), "GRACE_PENDING");
    }
}
