//! Lock-State Tracker
//!
//! # Overview
//!
//! One two-state automaton per lock object plus the program-wide "all locks
//! released" checkpoint. The tracker owns its registry (a [`LockBackend`]),
//! records every violation in the [`FindingLog`] it is handed, and always
//! leaves each lock in the successor state the real program would reach:
//!
//! | Operation | From       | To         | Finding             |
//! |-----------|------------|------------|---------------------|
//! | `init`    | untracked  | Unlocked   |                     |
//! | `init`    | Unlocked   | Unlocked   |                     |
//! | `init`    | Locked     | Locked     | `DoubleInit`        |
//! | `lock`    | Unlocked   | Locked     |                     |
//! | `lock`    | Locked     | Locked     | `DoubleLock`        |
//! | `unlock`  | Locked     | Unlocked   |                     |
//! | `unlock`  | Unlocked   | Unlocked   | `UnlockWithoutLock` |
//!
//! # Registration
//!
//! `lock`/`unlock` on a lock that was never declared or initialized registers
//! it as Unlocked first. In strict mode that registration is itself reported
//! as `UndeclaredOperand`; otherwise it is only logged at `debug`.

use super::backend::LockBackend;
use super::types::LockEntry;
use crate::domain::report::{FindingLog, Operand, ViolationKind, ViolationReport};
use crate::domain::types::{LockId, ThreadId};
use crate::error::ModelError;

/// Per-lock automaton over a pluggable registry
///
/// # Type Parameters
/// - `B`: registry backend ([`ProductionBackend`](super::ProductionBackend)
///   or [`VerificationBackend`](super::VerificationBackend))
///
/// # Example
///
/// ```rust
/// use rcusync_model::domain::lock::{LockTracker, ProductionBackend};
/// use rcusync_model::domain::{FindingLog, LockId, ThreadId, ViolationKind};
///
/// let mut tracker: LockTracker<ProductionBackend> = LockTracker::new(true);
/// let mut log = FindingLog::new();
/// let (t0, m) = (ThreadId::new(0), LockId::mutex(0));
///
/// tracker.init(t0, m, &mut log).unwrap();
/// tracker.lock(t0, m, &mut log).unwrap();
///
/// let err = tracker.lock(t0, m, &mut log).unwrap_err();
/// assert_eq!(err.kind, ViolationKind::DoubleLock);
/// assert!(tracker.check_locked(m));
/// ```
#[derive(Debug)]
pub struct LockTracker<B: LockBackend> {
    backend: B,
    strict: bool,
}

impl<B: LockBackend> LockTracker<B> {
    /// Create a tracker with an empty registry
    pub fn new(strict: bool) -> Self {
        Self::with_backend(B::new(), strict)
    }

    /// Create a tracker over an existing registry
    pub fn with_backend(backend: B, strict: bool) -> Self {
        Self { backend, strict }
    }

    /// Underlying registry
    #[inline(always)]
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Whether undeclared locks are reported
    #[inline(always)]
    pub fn is_strict(&self) -> bool {
        self.strict
    }

    /// Change the registration policy
    pub fn set_strict(&mut self, strict: bool) {
        self.strict = strict;
    }

    /// Register `lock` as Unlocked if it is not tracked yet
    ///
    /// Declaring a tracked lock keeps its current state.
    pub fn declare(&mut self, lock: LockId) -> Result<(), ModelError> {
        if !self.backend.is_tracked(lock) {
            self.backend.insert(lock, LockEntry::unlocked())?;
            tracing::debug!(%lock, "lock declared");
        }
        Ok(())
    }

    /// `init(lock)`: establish the lock in Unlocked
    ///
    /// # Errors
    /// `DoubleInit` when the lock is currently held; it stays held.
    pub fn init(
        &mut self,
        thread: ThreadId,
        lock: LockId,
        log: &mut FindingLog,
    ) -> Result<(), ViolationReport> {
        let mark = log.mark();

        match self.backend.entry(lock) {
            Some(entry) if entry.is_locked() => {
                let holder = entry.holder.map_or_else(|| "?".to_string(), |t| t.to_string());
                log.report(
                    ViolationReport::new(ViolationKind::DoubleInit, Operand::Lock(lock))
                        .by(thread)
                        .with_detail(format!("held by {}", holder)),
                );
            }
            Some(_) => {
                tracing::trace!(%thread, %lock, "re-init of unlocked lock");
            }
            None => {
                if let Err(err) = self.backend.insert(lock, LockEntry::unlocked()) {
                    Self::report_unregistrable(thread, lock, &err, log);
                } else {
                    tracing::trace!(%thread, %lock, "lock initialized");
                }
            }
        }

        log.outcome(mark, ())
    }

    /// `lock(lock)`: Unlocked → Locked
    ///
    /// # Errors
    /// - `DoubleLock` when already held; the lock stays held by its
    ///   original holder
    /// - `UndeclaredOperand` in strict mode when the lock was never declared
    pub fn lock(
        &mut self,
        thread: ThreadId,
        lock: LockId,
        log: &mut FindingLog,
    ) -> Result<(), ViolationReport> {
        let mark = log.mark();

        if let Some(entry) = self.ensure_tracked(thread, lock, log) {
            if entry.is_locked() {
                let holder = entry.holder.map_or_else(|| "?".to_string(), |t| t.to_string());
                log.report(
                    ViolationReport::new(ViolationKind::DoubleLock, Operand::Lock(lock))
                        .by(thread)
                        .with_detail(format!("already held by {}", holder)),
                );
            } else {
                // The slot exists now, so this overwrite cannot hit the capacity bound
                if let Err(err) = self.backend.insert(lock, LockEntry::locked_by(thread)) {
                    Self::report_unregistrable(thread, lock, &err, log);
                }
                tracing::trace!(%thread, %lock, "acquired");
            }
        }

        log.outcome(mark, ())
    }

    /// `unlock(lock)`: Locked → Unlocked
    ///
    /// Any thread may release a held lock.
    ///
    /// # Errors
    /// - `UnlockWithoutLock` when not held; the lock stays Unlocked
    /// - `UndeclaredOperand` in strict mode when the lock was never declared
    pub fn unlock(
        &mut self,
        thread: ThreadId,
        lock: LockId,
        log: &mut FindingLog,
    ) -> Result<(), ViolationReport> {
        let mark = log.mark();

        if let Some(entry) = self.ensure_tracked(thread, lock, log) {
            if entry.is_locked() {
                if entry.holder != Some(thread) {
                    tracing::debug!(%thread, %lock, holder = ?entry.holder, "released by non-holder");
                }
                if let Err(err) = self.backend.insert(lock, LockEntry::unlocked()) {
                    Self::report_unregistrable(thread, lock, &err, log);
                }
                tracing::trace!(%thread, %lock, "released");
            } else {
                log.report(
                    ViolationReport::new(ViolationKind::UnlockWithoutLock, Operand::Lock(lock))
                        .by(thread),
                );
            }
        }

        log.outcome(mark, ())
    }

    /// `check_locked(lock)`: whether the lock is held (untracked → false)
    #[inline(always)]
    pub fn check_locked(&self, lock: LockId) -> bool {
        self.backend.is_locked(lock)
    }

    /// Most recent acquirer of a held lock
    pub fn holder(&self, lock: LockId) -> Option<ThreadId> {
        self.backend
            .entry(lock)
            .filter(LockEntry::is_locked)
            .and_then(|entry| entry.holder)
    }

    /// Whether `lock` is held and `thread` acquired it
    #[inline(always)]
    pub fn is_held_by(&self, lock: LockId, thread: ThreadId) -> bool {
        self.holder(lock) == Some(thread)
    }

    /// Held locks in ascending id order
    pub fn held_locks(&self) -> Vec<(LockId, LockEntry)> {
        self.backend.held()
    }

    /// `check_all_released()`: true iff every tracked lock is Unlocked
    ///
    /// Appends one `LeakedLock` per held lock, attributed to its holder.
    pub fn check_all_released(&self, log: &mut FindingLog) -> bool {
        let held = self.backend.held();
        for (lock, entry) in &held {
            let mut report = ViolationReport::new(ViolationKind::LeakedLock, Operand::Lock(*lock));
            if let Some(holder) = entry.holder {
                report = report.by(holder);
            }
            log.report(report);
        }
        held.is_empty()
    }

    /// Forget every lock
    pub fn reset(&mut self) {
        self.backend.clear();
    }

    /// Make sure `lock` is tracked, registering it if needed
    ///
    /// Returns the current entry, or `None` when the registry had no room.
    fn ensure_tracked(
        &mut self,
        thread: ThreadId,
        lock: LockId,
        log: &mut FindingLog,
    ) -> Option<LockEntry> {
        if let Some(entry) = self.backend.entry(lock) {
            return Some(entry);
        }

        if self.strict {
            log.report(
                ViolationReport::new(ViolationKind::UndeclaredOperand, Operand::Lock(lock))
                    .by(thread)
                    .with_detail("lock used before init or declaration"),
            );
        } else {
            tracing::debug!(%thread, %lock, "implicitly registered lock");
        }

        match self.backend.insert(lock, LockEntry::unlocked()) {
            Ok(_) => Some(LockEntry::unlocked()),
            Err(err) => {
                Self::report_unregistrable(thread, lock, &err, log);
                None
            }
        }
    }

    fn report_unregistrable(thread: ThreadId, lock: LockId, err: &ModelError, log: &mut FindingLog) {
        tracing::error!(%thread, %lock, error = %err, "lock registry full");
        log.report(
            ViolationReport::new(ViolationKind::UndeclaredOperand, Operand::Lock(lock))
                .by(thread)
                .with_detail(err.to_string()),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::lock::{ProductionBackend, VerificationBackend, MAX_LOCKS};

    const T0: ThreadId = ThreadId::new(0);
    const T1: ThreadId = ThreadId::new(1);
    const M: LockId = LockId::mutex(0);

    fn tracker() -> (LockTracker<ProductionBackend>, FindingLog) {
        (LockTracker::new(true), FindingLog::new())
    }

    #[test]
    fn test_lock_unlock_cycle() {
        let (mut tracker, mut log) = tracker();
        tracker.init(T0, M, &mut log).unwrap();
        assert!(!tracker.check_locked(M));

        tracker.lock(T0, M, &mut log).unwrap();
        assert!(tracker.check_locked(M));
        assert_eq!(tracker.holder(M), Some(T0));

        tracker.unlock(T0, M, &mut log).unwrap();
        assert!(!tracker.check_locked(M));
        assert_eq!(tracker.holder(M), None);

        assert!(tracker.check_all_released(&mut log));
        assert!(log.is_clean());
    }

    #[test]
    fn test_double_lock_stays_locked() {
        let (mut tracker, mut log) = tracker();
        tracker.init(T0, M, &mut log).unwrap();
        tracker.lock(T0, M, &mut log).unwrap();

        let err = tracker.lock(T1, M, &mut log).unwrap_err();
        assert_eq!(err.kind, ViolationKind::DoubleLock);
        assert_eq!(err.thread, Some(T1));
        assert!(tracker.check_locked(M));
        assert_eq!(tracker.holder(M), Some(T0));
        assert!(tracker.is_held_by(M, T0));
        assert!(!tracker.is_held_by(M, T1));
    }

    #[test]
    fn test_unlock_without_lock_stays_unlocked() {
        let (mut tracker, mut log) = tracker();
        tracker.init(T0, M, &mut log).unwrap();

        let err = tracker.unlock(T0, M, &mut log).unwrap_err();
        assert_eq!(err.kind, ViolationKind::UnlockWithoutLock);
        assert!(!tracker.check_locked(M));
    }

    #[test]
    fn test_double_init_on_held_lock() {
        let (mut tracker, mut log) = tracker();
        tracker.init(T0, M, &mut log).unwrap();
        tracker.lock(T0, M, &mut log).unwrap();

        let err = tracker.init(T1, M, &mut log).unwrap_err();
        assert_eq!(err.kind, ViolationKind::DoubleInit);
        assert!(tracker.check_locked(M));

        // Re-init while unlocked is fine
        tracker.unlock(T0, M, &mut log).unwrap();
        assert!(tracker.init(T1, M, &mut log).is_ok());
    }

    #[test]
    fn test_unlock_by_other_thread_is_legal() {
        let (mut tracker, mut log) = tracker();
        tracker.init(T0, M, &mut log).unwrap();
        tracker.lock(T0, M, &mut log).unwrap();
        assert!(tracker.unlock(T1, M, &mut log).is_ok());
        assert!(!tracker.check_locked(M));
    }

    #[test]
    fn test_leaked_locks_reported_per_lock() {
        let (mut tracker, mut log) = tracker();
        let other = LockId::mutex(1);
        tracker.init(T0, M, &mut log).unwrap();
        tracker.init(T0, other, &mut log).unwrap();
        tracker.lock(T0, M, &mut log).unwrap();
        tracker.lock(T1, other, &mut log).unwrap();

        assert!(!tracker.check_all_released(&mut log));
        assert_eq!(log.count(ViolationKind::LeakedLock), 2);

        let holders: Vec<_> = log.iter().map(|r| r.thread).collect();
        assert_eq!(holders, vec![Some(T0), Some(T1)]);
    }

    #[test]
    fn test_strict_mode_reports_undeclared_then_tracks() {
        let (mut tracker, mut log) = tracker();
        let err = tracker.lock(T0, M, &mut log).unwrap_err();
        assert_eq!(err.kind, ViolationKind::UndeclaredOperand);

        // Implicitly registered and acquired
        assert!(tracker.check_locked(M));
        assert!(tracker.unlock(T0, M, &mut log).is_ok());
        assert_eq!(log.len(), 1);
    }

    #[test]
    fn test_lenient_mode_registers_silently() {
        let mut tracker: LockTracker<ProductionBackend> = LockTracker::new(false);
        let mut log = FindingLog::new();

        tracker.lock(T0, M, &mut log).unwrap();
        tracker.unlock(T0, M, &mut log).unwrap();
        assert!(log.is_clean());

        // An unmatched unlock on a fresh lock is still a finding
        let err = tracker.unlock(T0, LockId::mutex(7), &mut log).unwrap_err();
        assert_eq!(err.kind, ViolationKind::UnlockWithoutLock);
    }

    #[test]
    fn test_declare_keeps_state() {
        let (mut tracker, mut log) = tracker();
        tracker.declare(M).unwrap();
        tracker.lock(T0, M, &mut log).unwrap();
        tracker.declare(M).unwrap();
        assert!(tracker.check_locked(M));
    }

    #[test]
    fn test_verification_backend_overflow_is_a_finding() {
        let mut tracker: LockTracker<VerificationBackend> = LockTracker::new(false);
        let mut log = FindingLog::new();
        for id in 0..MAX_LOCKS {
            tracker.init(T0, LockId::mutex(id), &mut log).unwrap();
        }

        let err = tracker.lock(T0, LockId::mutex(MAX_LOCKS), &mut log).unwrap_err();
        assert_eq!(err.kind, ViolationKind::UndeclaredOperand);
        assert!(err.detail.unwrap().contains("capacity"));
        assert!(!tracker.check_locked(LockId::mutex(MAX_LOCKS)));
    }

    #[test]
    fn test_reset_forgets_locks() {
        let (mut tracker, mut log) = tracker();
        tracker.init(T0, M, &mut log).unwrap();
        tracker.lock(T0, M, &mut log).unwrap();
        tracker.reset();
        assert!(tracker.backend().is_empty());
        assert!(tracker.check_all_released(&mut log));
    }
}
