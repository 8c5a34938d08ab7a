//! Lock Types - The Two-State Automaton
//!
//! # State Transitions
//!
//! ```text
//!                  lock
//!   UNLOCKED ─────────────────> LOCKED
//!      ↑                          │
//!      └───────── unlock ─────────┘
//!
//!   UNLOCKED ── unlock ──> UNLOCKED   (UnlockWithoutLock)
//!   LOCKED   ── lock   ──> LOCKED     (DoubleLock)
//!   LOCKED   ── init   ──> LOCKED     (DoubleInit)
//! ```
//!
//! The automaton is binary: a second acquisition is a finding,
//! never a nesting level.

use crate::domain::types::ThreadId;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Hold status of a lock
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LockState {
    /// Nobody holds the lock
    Unlocked,
    /// Some thread holds the lock
    Locked,
}

impl LockState {
    /// Whether the lock is held
    #[inline(always)]
    pub const fn is_locked(self) -> bool {
        matches!(self, LockState::Locked)
    }
}

impl fmt::Display for LockState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LockState::Unlocked => write!(f, "UNLOCKED"),
            LockState::Locked => write!(f, "LOCKED"),
        }
    }
}

/// Registry entry for one lock
///
/// `holder` is the thread whose `lock` succeeded. It never influences the
/// lock automaton itself (a failed second `lock` leaves it alone, and
/// `unlock` from a different thread is legal and clears it), but the RCU
/// side reads it to decide who may publish.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockEntry {
    /// Automaton state
    pub state: LockState,
    /// Successful acquirer while locked
    pub holder: Option<ThreadId>,
}

impl LockEntry {
    /// Entry of a freshly initialized lock
    #[inline(always)]
    pub const fn unlocked() -> Self {
        Self {
            state: LockState::Unlocked,
            holder: None,
        }
    }

    /// Entry of a lock held by `thread`
    #[inline(always)]
    pub const fn locked_by(thread: ThreadId) -> Self {
        Self {
            state: LockState::Locked,
            holder: Some(thread),
        }
    }

    /// Whether the lock is held
    #[inline(always)]
    pub const fn is_locked(&self) -> bool {
        self.state.is_locked()
    }
}

impl Default for LockEntry {
    fn default() -> Self {
        Self::unlocked()
    }
}
