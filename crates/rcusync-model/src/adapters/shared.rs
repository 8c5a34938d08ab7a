//! Shared Model - One Model, Many Driver Threads
//!
//! # Overview
//!
//! A driver that runs the analyzed program's threads on real OS threads
//! shares one [`SyncModel`] between them. Every hook takes the mutex for the
//! duration of one call, so hooks from different threads are linearized in
//! the order they acquire it.
//!
//! RAII guards close sections on drop:
//!
//! ```text
//! let guard = shared.read_guard(reader)?;   // enter_read
//! shared.with(|m| m.dereference(reader, gp));
//! drop(guard);                              // exit_read
//! ```
//!
//! `leak()` disarms a guard, which is how a test models a missing unlock.

use crate::domain::config::ModelConfig;
use crate::domain::lock::{LockBackend, ProductionBackend};
use crate::domain::model::SyncModel;
use crate::domain::report::{Verdict, ViolationReport};
use crate::domain::types::{PtrValue, SlotId, ThreadId};
use parking_lot::Mutex;
use std::sync::Arc;

/// Thread-safe handle to a [`SyncModel`]
pub struct SharedModel<B: LockBackend = ProductionBackend> {
    inner: Arc<Mutex<SyncModel<B>>>,
}

impl<B: LockBackend> Clone for SharedModel<B> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<B: LockBackend> SharedModel<B> {
    /// Share an existing model
    pub fn new(model: SyncModel<B>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(model)),
        }
    }

    /// Share a fresh model built from `config`
    pub fn with_config(config: ModelConfig) -> Self {
        Self::new(SyncModel::with_config(config))
    }

    /// Run `f` with exclusive access to the model
    pub fn with<R>(&self, f: impl FnOnce(&mut SyncModel<B>) -> R) -> R {
        f(&mut *self.inner.lock())
    }

    /// Current verdict
    pub fn verdict(&self) -> Verdict {
        self.inner.lock().verdict()
    }

    /// Copy of every finding so far
    pub fn findings(&self) -> Vec<ViolationReport> {
        self.inner.lock().findings().to_vec()
    }

    /// Run the end-of-program checkpoints
    pub fn finish(&self) -> bool {
        self.inner.lock().finish()
    }

    /// Enter a read-side section that exits when the guard drops
    ///
    /// # Errors
    /// The nesting-overflow report; no section was entered and no guard is
    /// returned.
    pub fn read_guard(&self, thread: ThreadId) -> Result<ReadGuard<B>, ViolationReport> {
        self.inner.lock().enter_read(thread)?;
        Ok(ReadGuard {
            model: self.clone(),
            thread,
            armed: true,
        })
    }

    /// Take a slot's update-side lock, released when the guard drops
    ///
    /// # Errors
    /// `DoubleLock` or `UndeclaredOperand`. The model has already moved to
    /// its successor state, so no guard is returned to unlock it again.
    pub fn write_guard(&self, thread: ThreadId, slot: SlotId) -> Result<WriteGuard<B>, ViolationReport> {
        self.inner.lock().write_lock(thread, slot)?;
        Ok(WriteGuard {
            model: self.clone(),
            thread,
            slot,
            armed: true,
        })
    }
}

/// Open read-side section; `exit_read` on drop
pub struct ReadGuard<B: LockBackend = ProductionBackend> {
    model: SharedModel<B>,
    thread: ThreadId,
    armed: bool,
}

impl<B: LockBackend> ReadGuard<B> {
    /// Thread inside the section
    #[inline(always)]
    pub fn thread(&self) -> ThreadId {
        self.thread
    }

    /// Drop without exiting the section
    pub fn leak(mut self) {
        self.armed = false;
    }
}

impl<B: LockBackend> Drop for ReadGuard<B> {
    fn drop(&mut self) {
        if self.armed {
            // Findings land in the log; drop has nowhere to return them.
            let _ = self.model.inner.lock().exit_read(self.thread);
        }
    }
}

/// Held update-side lock; `write_unlock` on drop
pub struct WriteGuard<B: LockBackend = ProductionBackend> {
    model: SharedModel<B>,
    thread: ThreadId,
    slot: SlotId,
    armed: bool,
}

impl<B: LockBackend> WriteGuard<B> {
    /// Publish `value` into the guarded slot
    pub fn assign(&self, value: PtrValue) -> Result<(), ViolationReport> {
        self.model
            .inner
            .lock()
            .assign_pointer(self.thread, self.slot, value)
            .map(drop)
    }

    /// Drop without releasing the lock
    pub fn leak(mut self) {
        self.armed = false;
    }
}

impl<B: LockBackend> Drop for WriteGuard<B> {
    fn drop(&mut self) {
        if self.armed {
            let _ = self.model.inner.lock().write_unlock(self.thread, self.slot);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::report::ViolationKind;

    const GP: SlotId = SlotId::new(0);

    fn shared_gp() -> SharedModel {
        let shared = SharedModel::with_config(ModelConfig::default());
        shared
            .with(|m| m.declare_slot(GP, None, Some(PtrValue::new(1))))
            .unwrap();
        shared
    }

    #[test]
    fn test_guards_close_sections() {
        let shared = shared_gp();
        let (reader, writer) = (ThreadId::new(1), ThreadId::new(2));

        {
            let _read = shared.read_guard(reader).unwrap();
            assert_eq!(shared.with(|m| m.read_depth(reader)), 1);
            shared.with(|m| m.dereference(reader, GP)).unwrap();
        }
        {
            let write = shared.write_guard(writer, GP).unwrap();
            write.assign(PtrValue::new(2)).unwrap();
        }
        shared.with(|m| m.synchronize_grace_period(writer, GP)).unwrap();
        shared.with(|m| m.reclaim(writer, GP, PtrValue::new(1))).unwrap();

        assert!(shared.finish());
        assert_eq!(shared.verdict(), Verdict::Clean);
    }

    #[test]
    fn test_leaked_guard_is_a_finding() {
        let shared = shared_gp();
        shared.read_guard(ThreadId::new(1)).unwrap().leak();
        shared.write_guard(ThreadId::new(2), GP).unwrap().leak();

        assert!(!shared.finish());
        let kinds: Vec<_> = shared.findings().iter().map(|r| r.kind).collect();
        assert!(kinds.contains(&ViolationKind::LeakedLock));
        assert!(kinds.contains(&ViolationKind::ReadSectionLeak));
    }

    #[test]
    fn test_concurrent_readers() {
        let shared = shared_gp();

        std::thread::scope(|scope| {
            for id in 1..=8 {
                let shared = shared.clone();
                scope.spawn(move || {
                    let reader = ThreadId::new(id);
                    for _ in 0..50 {
                        let _guard = shared.read_guard(reader).unwrap();
                        shared.with(|m| m.dereference(reader, GP)).unwrap();
                    }
                });
            }
        });

        assert!(shared.finish());
        assert_eq!(shared.verdict(), Verdict::Clean);
    }
}
