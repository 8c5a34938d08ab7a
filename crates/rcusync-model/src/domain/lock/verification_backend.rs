//! Verification Backend - Bounded Lock Registry
//!
//! # Design Philosophy
//!
//! The verification backend is shaped for bounded model checking with Kani:
//! - Lock count is bounded at compile time
//! - All memory is stack-allocated (no heap)
//! - State space stays small enough for exhaustive exploration
//! - Single-threaded execution
//!
//! # Implementation Strategy
//!
//! A fixed array `[Option<(LockId, LockEntry)>; MAX_LOCKS]` wrapped in a
//! `RefCell`. Lock ids are arbitrary (`Mutex(n)` with large `n`, update-side
//! locks of any slot), so slots are assigned in order of first insertion and
//! found by linear scan. With `MAX_LOCKS = 4` the scan is four comparisons.
//!
//! ```text
//! VerificationBackend
//!   └─ entries: RefCell<[Option<(LockId, LockEntry)>; MAX_LOCKS]>
//!        └─ [Some((lock#0, UNLOCKED)), Some((update(slot#0), LOCKED t1)), None, None]
//! ```
//!
//! `tracked()` sorts a copy of the occupied ids, so reports come out in the
//! same order as from the production backend.

use super::backend::LockBackend;
use super::types::LockEntry;
use crate::domain::types::LockId;
use crate::error::ModelError;
use std::cell::RefCell;

/// Maximum number of locks in verification mode
///
/// Two generic mutexes plus the update-side locks of two slots covers every
/// benchmark shape (reader/writer with one global pointer, mutex-guarded set).
pub const MAX_LOCKS: usize = 4;

/// Bounded lock registry for Kani proofs
///
/// Not `Sync`. Use [`ProductionBackend`](super::ProductionBackend) when hooks
/// arrive from real threads.
///
/// # Example
///
/// ```rust
/// use rcusync_model::domain::lock::{LockBackend, LockEntry, VerificationBackend, MAX_LOCKS};
/// use rcusync_model::domain::LockId;
///
/// let backend = VerificationBackend::new();
/// for id in 0..MAX_LOCKS {
///     backend.insert(LockId::mutex(id), LockEntry::unlocked()).unwrap();
/// }
/// assert!(backend.insert(LockId::mutex(MAX_LOCKS), LockEntry::unlocked()).is_err());
/// ```
#[derive(Debug)]
pub struct VerificationBackend {
    entries: RefCell<[Option<(LockId, LockEntry)>; MAX_LOCKS]>,
}

impl VerificationBackend {
    fn position(&self, lock: LockId) -> Option<usize> {
        self.entries
            .borrow()
            .iter()
            .position(|slot| matches!(slot, Some((id, _)) if *id == lock))
    }
}

impl Default for VerificationBackend {
    fn default() -> Self {
        <Self as LockBackend>::new()
    }
}

impl LockBackend for VerificationBackend {
    fn new() -> Self {
        Self {
            entries: RefCell::new([None; MAX_LOCKS]),
        }
    }

    #[inline(always)]
    fn capacity(&self) -> Option<usize> {
        Some(MAX_LOCKS)
    }

    fn entry(&self, lock: LockId) -> Option<LockEntry> {
        self.entries
            .borrow()
            .iter()
            .flatten()
            .find(|(id, _)| *id == lock)
            .map(|(_, entry)| *entry)
    }

    fn insert(&self, lock: LockId, entry: LockEntry) -> Result<Option<LockEntry>, ModelError> {
        if let Some(index) = self.position(lock) {
            let mut entries = self.entries.borrow_mut();
            let previous = entries[index].map(|(_, e)| e);
            entries[index] = Some((lock, entry));
            return Ok(previous);
        }

        let mut entries = self.entries.borrow_mut();
        match entries.iter_mut().find(|slot| slot.is_none()) {
            Some(free) => {
                *free = Some((lock, entry));
                Ok(None)
            }
            None => Err(ModelError::CapacityExceeded {
                what: "lock registry",
                capacity: MAX_LOCKS,
            }),
        }
    }

    fn tracked(&self) -> Vec<LockId> {
        let mut ids: Vec<LockId> = self
            .entries
            .borrow()
            .iter()
            .flatten()
            .map(|(id, _)| *id)
            .collect();
        ids.sort_unstable();
        ids
    }

    fn clear(&self) {
        *self.entries.borrow_mut() = [None; MAX_LOCKS];
    }

    fn len(&self) -> usize {
        self.entries.borrow().iter().flatten().count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::lock::backend::contract::assert_backend_contract;
    use crate::domain::types::ThreadId;

    #[test]
    fn test_backend_contract() {
        assert_backend_contract(VerificationBackend::new());
    }

    #[test]
    fn test_capacity_exceeded() {
        let backend = VerificationBackend::new();
        for id in 0..MAX_LOCKS {
            backend.insert(LockId::mutex(id * 10), LockEntry::unlocked()).unwrap();
        }

        let err = backend
            .insert(LockId::mutex(1), LockEntry::unlocked())
            .unwrap_err();
        assert!(matches!(
            err,
            ModelError::CapacityExceeded { capacity: MAX_LOCKS, .. }
        ));

        // Overwriting a tracked lock still works when full
        let prev = backend
            .insert(LockId::mutex(0), LockEntry::locked_by(ThreadId::new(0)))
            .unwrap();
        assert_eq!(prev, Some(LockEntry::unlocked()));
    }

    #[test]
    fn test_clear_frees_capacity() {
        let backend = VerificationBackend::new();
        for id in 0..MAX_LOCKS {
            backend.insert(LockId::mutex(id), LockEntry::unlocked()).unwrap();
        }
        backend.clear();
        assert!(backend.insert(LockId::mutex(99), LockEntry::unlocked()).is_ok());
        assert_eq!(backend.len(), 1);
    }
}
