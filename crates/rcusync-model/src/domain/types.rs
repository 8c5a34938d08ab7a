//! Identity Types - Operands of Every Hook
//!
//! # Overview
//!
//! Every instrumentation hook names *who* performs the operation (a thread)
//! and *what* it operates on (a lock, a protected slot, an opaque pointer
//! value). The model never looks inside these values; it only compares them.
//!
//! All identities are newtypes over plain integers so that they are `Copy`,
//! hash cheaply, and fit in the fixed-size arrays of the verification backend.
//!
//! ```text
//! ThreadId  ── acting thread of the analyzed program
//! LockId    ── Mutex(n) | UpdateSide(SlotId)
//! SlotId    ── one RCU-guarded pointer location
//! PtrValue  ── opaque value stored in a slot (never dereferenced)
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;

/// Thread identifier
///
/// # Design Notes
///
/// Thread ids are handed out by the external driver. Scenario replay numbers
/// threads by their position in the scenario (`main` is usually 0); the
/// instrumentation adapter interns thread names in order of first appearance.
///
/// # Example
///
/// ```rust
/// use rcusync_model::domain::ThreadId;
///
/// let main = ThreadId::new(0);
/// let reader = ThreadId::new(1);
/// assert_ne!(main, reader);
/// assert_eq!(format!("{}", reader), "t1");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ThreadId(pub usize);

impl ThreadId {
    /// Create a new thread identifier
    #[inline(always)]
    pub const fn new(id: usize) -> Self {
        Self(id)
    }

    /// Get the raw numeric id
    #[inline(always)]
    pub const fn as_usize(self) -> usize {
        self.0
    }
}

impl fmt::Display for ThreadId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "t{}", self.0)
    }
}

/// Protected slot identifier (one RCU-guarded pointer location)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SlotId(pub usize);

impl SlotId {
    /// Create a new slot identifier
    #[inline(always)]
    pub const fn new(id: usize) -> Self {
        Self(id)
    }

    /// Get the raw numeric id
    #[inline(always)]
    pub const fn as_usize(self) -> usize {
        self.0
    }
}

impl fmt::Display for SlotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "slot#{}", self.0)
    }
}

/// Lock identifier
///
/// # Design Notes
///
/// Generic exclusion locks and RCU update-side locks live in separate
/// namespaces. A program that wraps its RCU update in both a mutex and the
/// update-side wrapper calls holds two different `LockId`s, and neither one
/// stands in for the other.
///
/// A slot may also be declared with a `Mutex` as its update-side lock (kernel
/// code often serializes writers with an ordinary spinlock); in that case
/// `write_lock` on the slot and `lock` on the mutex drive the same automaton.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum LockId {
    /// A lock object declared by the analyzed program
    Mutex(usize),
    /// The implicit update-side lock of an RCU slot
    UpdateSide(SlotId),
}

impl LockId {
    /// Identity of a program-declared lock
    #[inline(always)]
    pub const fn mutex(id: usize) -> Self {
        Self::Mutex(id)
    }

    /// Identity of the implicit update-side lock of `slot`
    #[inline(always)]
    pub const fn update_side(slot: SlotId) -> Self {
        Self::UpdateSide(slot)
    }

    /// Whether this is the implicit update-side lock of some slot
    #[inline(always)]
    pub const fn is_update_side(self) -> bool {
        matches!(self, Self::UpdateSide(_))
    }
}

impl fmt::Display for LockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Mutex(id) => write!(f, "lock#{}", id),
            Self::UpdateSide(slot) => write!(f, "update({})", slot),
        }
    }
}

/// Opaque pointer value stored in a protected slot
///
/// The model tracks identity only; it never follows the pointer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PtrValue(pub u64);

impl PtrValue {
    /// Create a new pointer value
    #[inline(always)]
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// Get the raw value
    #[inline(always)]
    pub const fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for PtrValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ptr#{}", self.0)
    }
}
