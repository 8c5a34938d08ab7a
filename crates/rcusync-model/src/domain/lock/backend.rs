//! Lock Registry Backend Abstraction
//!
//! # Design Philosophy
//!
//! The lock-state tracker is written once and stored twice. `LockBackend`
//! abstracts the registry that maps each [`LockId`] to its [`LockEntry`]:
//!
//! - **ProductionBackend**: `DashMap`, unbounded, shareable across threads.
//! - **VerificationBackend**: fixed array in a `RefCell`, bounded, stack-only,
//!   suitable for Kani.
//!
//! `LockTracker<B>` is monomorphized per backend, so the abstraction costs
//! nothing at runtime and the exact same transition logic is what Kani proves
//! and what the production checker runs.
//!
//! # Contract
//!
//! 1. **Storage only**: backends never validate transitions; that is the
//!    tracker's job.
//! 2. **Stable order**: `tracked()` returns ids in ascending order so that
//!    checkpoint findings are reported deterministically.
//! 3. **Bounded capacity is explicit**: a backend with a fixed capacity
//!    reports it through `capacity()` and refuses new ids with
//!    `ModelError::CapacityExceeded` instead of panicking.

use super::types::LockEntry;
use crate::domain::types::LockId;
use crate::error::ModelError;

/// Registry storage for lock entries
///
/// All methods take `&self`; implementations use interior mutability
/// (`DashMap` shards or a `RefCell`).
pub trait LockBackend {
    /// Create an empty registry
    fn new() -> Self
    where
        Self: Sized;

    /// Fixed number of locks the backend can hold, `None` if unbounded
    fn capacity(&self) -> Option<usize>;

    /// Current entry of `lock`, `None` if untracked
    fn entry(&self, lock: LockId) -> Option<LockEntry>;

    /// Insert or overwrite the entry of `lock`
    ///
    /// # Returns
    /// - `Ok(Some(previous))` when the lock was already tracked
    /// - `Ok(None)` when the lock is new
    /// - `Err(ModelError::CapacityExceeded)` when a bounded backend is full
    fn insert(&self, lock: LockId, entry: LockEntry) -> Result<Option<LockEntry>, ModelError>;

    /// All tracked ids in ascending order
    fn tracked(&self) -> Vec<LockId>;

    /// Forget every lock
    fn clear(&self);

    /// Whether `lock` is tracked
    #[inline(always)]
    fn is_tracked(&self, lock: LockId) -> bool {
        self.entry(lock).is_some()
    }

    /// Whether `lock` is tracked and held
    #[inline(always)]
    fn is_locked(&self, lock: LockId) -> bool {
        self.entry(lock).is_some_and(|entry| entry.is_locked())
    }

    /// Held locks with their entries, in ascending id order
    fn held(&self) -> Vec<(LockId, LockEntry)> {
        self.tracked()
            .into_iter()
            .filter_map(|lock| self.entry(lock).map(|entry| (lock, entry)))
            .filter(|(_, entry)| entry.is_locked())
            .collect()
    }

    /// Number of tracked locks
    fn len(&self) -> usize {
        self.tracked().len()
    }

    /// Whether no lock is tracked
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
pub(crate) mod contract {
    //! Shared contract checks run by each backend's tests

    use super::*;
    use crate::domain::types::{SlotId, ThreadId};

    pub(crate) fn assert_backend_contract<B: LockBackend>(backend: B) {
        assert!(backend.is_empty());
        assert!(backend.held().is_empty());

        let a = LockId::mutex(2);
        let b = LockId::mutex(0);
        let c = LockId::update_side(SlotId::new(0));

        assert_eq!(backend.insert(a, LockEntry::unlocked()).unwrap(), None);
        assert_eq!(backend.insert(b, LockEntry::unlocked()).unwrap(), None);
        assert_eq!(backend.insert(c, LockEntry::unlocked()).unwrap(), None);
        assert_eq!(backend.len(), 3);

        // Ascending order regardless of insertion order
        assert_eq!(backend.tracked(), vec![b, a, c]);

        let prev = backend
            .insert(a, LockEntry::locked_by(ThreadId::new(1)))
            .unwrap();
        assert_eq!(prev, Some(LockEntry::unlocked()));
        assert!(backend.is_locked(a));
        assert!(!backend.is_locked(b));
        assert!(!backend.is_locked(LockId::mutex(99)));
        assert!(!backend.is_tracked(LockId::mutex(99)));

        let held = backend.held();
        assert_eq!(held.len(), 1);
        assert_eq!(held[0].0, a);
        assert_eq!(held[0].1.holder, Some(ThreadId::new(1)));

        backend.clear();
        assert!(backend.is_empty());
        assert_eq!(backend.entry(a), None);
    }
}
