//! Production Backend - Concurrent Lock Registry
//!
//! # Implementation Strategy
//!
//! We use `DashMap<LockId, LockEntry>` as the registry.
//!
//! - Programs under analysis declare an unknown number of locks, so the
//!   registry must grow on demand.
//! - Writes lock a single shard, so instrumented threads touching different
//!   locks rarely contend on the registry itself.
//! - The map is held in an `Arc`, so a snapshot handle can be given to a
//!   monitoring thread without cloning entries.
//!
//! ```text
//! ProductionBackend
//!   └─ locks: Arc<DashMap<LockId, LockEntry>>
//!        ├─ Shard 0: RwLock<HashMap<...>>
//!        ├─ Shard 1: RwLock<HashMap<...>>
//!        └─ ...
//! ```
//!
//! Hook atomicity across *several* registries (an RCU publish reads the lock
//! registry and writes the slot registry) is not this type's concern; see
//! `adapters::shared::SharedModel`.

use super::backend::LockBackend;
use super::types::LockEntry;
use crate::domain::types::LockId;
use crate::error::ModelError;
use dashmap::DashMap;
use std::sync::Arc;

/// Unbounded lock registry backed by `DashMap`
///
/// # Example
///
/// ```rust
/// use rcusync_model::domain::lock::{LockBackend, LockEntry, ProductionBackend};
/// use rcusync_model::domain::{LockId, ThreadId};
///
/// let backend = ProductionBackend::new();
/// backend.insert(LockId::mutex(0), LockEntry::unlocked()).unwrap();
/// backend.insert(LockId::mutex(0), LockEntry::locked_by(ThreadId::new(1))).unwrap();
///
/// assert!(backend.is_locked(LockId::mutex(0)));
/// assert_eq!(backend.capacity(), None);
/// ```
#[derive(Debug, Default)]
pub struct ProductionBackend {
    locks: Arc<DashMap<LockId, LockEntry>>,
}

impl ProductionBackend {
    /// Shared handle to the underlying map
    pub fn inner(&self) -> &Arc<DashMap<LockId, LockEntry>> {
        &self.locks
    }
}

impl LockBackend for ProductionBackend {
    fn new() -> Self {
        Self {
            locks: Arc::new(DashMap::new()),
        }
    }

    #[inline(always)]
    fn capacity(&self) -> Option<usize> {
        None
    }

    fn entry(&self, lock: LockId) -> Option<LockEntry> {
        self.locks.get(&lock).map(|entry| *entry.value())
    }

    fn insert(&self, lock: LockId, entry: LockEntry) -> Result<Option<LockEntry>, ModelError> {
        Ok(self.locks.insert(lock, entry))
    }

    fn tracked(&self) -> Vec<LockId> {
        let mut ids: Vec<LockId> = self.locks.iter().map(|entry| *entry.key()).collect();
        ids.sort_unstable();
        ids
    }

    fn clear(&self) {
        self.locks.clear();
    }

    fn len(&self) -> usize {
        self.locks.len()
    }
}
