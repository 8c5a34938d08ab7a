//! SyncModel - The Verification Model Facade
//!
//! # Overview
//!
//! One model instance owns everything a path needs:
//!
//! ```text
//! SyncModel<B>
//!   ├─ config: ModelConfig
//!   ├─ locks:  LockTracker<B>     lock registry
//!   ├─ rcu:    RcuModel           protected slots + read-side depths
//!   └─ log:    FindingLog         findings in path order
//! ```
//!
//! The external driver calls one hook per instrumented synchronization call.
//! Each hook returns `Ok` or the first [`ViolationReport`] it raised; every
//! report also lands in the log, and the state has moved on either way.
//!
//! # Dual-Mode Operation
//!
//! - [`ProductionModel`]: `DashMap` lock registry, any number of locks
//! - [`VerificationModel`]: bounded array registry for Kani

use super::config::ModelConfig;
use super::lock::{LockBackend, LockEntry, LockTracker, ProductionBackend, VerificationBackend};
use super::rcu::{ProtectedSlot, RcuModel};
use super::report::{FindingLog, Verdict, ViolationReport};
use super::types::{LockId, PtrValue, SlotId, ThreadId};
use crate::error::ModelError;

/// Lock tracker + RCU protocol model + findings log
#[derive(Debug)]
pub struct SyncModel<B: LockBackend> {
    config: ModelConfig,
    locks: LockTracker<B>,
    rcu: RcuModel,
    log: FindingLog,
}

/// Model over the unbounded `DashMap` lock registry
pub type ProductionModel = SyncModel<ProductionBackend>;

/// Model over the bounded array lock registry
pub type VerificationModel = SyncModel<VerificationBackend>;

impl<B: LockBackend> SyncModel<B> {
    /// Fresh model with default configuration
    pub fn new() -> Self {
        Self::with_config(ModelConfig::default())
    }

    /// Fresh model with `config`
    pub fn with_config(config: ModelConfig) -> Self {
        Self {
            locks: LockTracker::new(config.strict_registration),
            rcu: RcuModel::new(config.strict_registration, config.max_read_nesting),
            log: FindingLog::new(),
            config,
        }
    }

    /// Active configuration
    #[inline(always)]
    pub fn config(&self) -> &ModelConfig {
        &self.config
    }

    /// Findings so far
    #[inline(always)]
    pub fn log(&self) -> &FindingLog {
        &self.log
    }

    /// Findings so far, in path order
    pub fn findings(&self) -> &[ViolationReport] {
        self.log.reports()
    }

    /// Verdict of the path so far
    pub fn verdict(&self) -> Verdict {
        self.log.verdict()
    }

    /// Lock tracker
    pub fn locks(&self) -> &LockTracker<B> {
        &self.locks
    }

    /// RCU state
    pub fn rcu(&self) -> &RcuModel {
        &self.rcu
    }

    /// Back to the initial state: no locks, no slots, no findings
    pub fn reset(&mut self) {
        self.locks.reset();
        self.rcu.reset();
        self.log.clear();
        tracing::debug!("model reset");
    }

    // ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
    // Registration
    // ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

    /// Declare a lock (Unlocked)
    pub fn declare_lock(&mut self, lock: LockId) -> Result<(), ModelError> {
        self.locks.declare(lock)
    }

    /// Declare a protected slot
    ///
    /// `update_lock` defaults to the slot's own update-side lock.
    pub fn declare_slot(
        &mut self,
        slot: SlotId,
        update_lock: Option<LockId>,
        initial: Option<PtrValue>,
    ) -> Result<(), ModelError> {
        self.rcu.declare_slot(slot, update_lock, initial, &mut self.locks)
    }

    // ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
    // Lock Hooks
    // ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

    /// `init(lock)`
    pub fn init(&mut self, thread: ThreadId, lock: LockId) -> Result<(), ViolationReport> {
        self.locks.init(thread, lock, &mut self.log)
    }

    /// `lock(lock)`
    pub fn lock(&mut self, thread: ThreadId, lock: LockId) -> Result<(), ViolationReport> {
        self.locks.lock(thread, lock, &mut self.log)
    }

    /// `unlock(lock)`
    pub fn unlock(&mut self, thread: ThreadId, lock: LockId) -> Result<(), ViolationReport> {
        self.locks.unlock(thread, lock, &mut self.log)
    }

    /// `check_locked(lock)`
    #[inline(always)]
    pub fn check_locked(&self, lock: LockId) -> bool {
        self.locks.check_locked(lock)
    }

    /// Held locks with their holders
    pub fn held_locks(&self) -> Vec<(LockId, LockEntry)> {
        self.locks.held_locks()
    }

    /// `check_all_released()`: appends a `LeakedLock` per held lock
    pub fn check_all_released(&mut self) -> bool {
        self.locks.check_all_released(&mut self.log)
    }

    // ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
    // RCU Hooks
    // ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

    /// `enter_read()`: returns the new depth
    pub fn enter_read(&mut self, thread: ThreadId) -> Result<u32, ViolationReport> {
        self.rcu.enter_read(thread, &mut self.log)
    }

    /// `exit_read()`: returns the new depth
    pub fn exit_read(&mut self, thread: ThreadId) -> Result<u32, ViolationReport> {
        self.rcu.exit_read(thread, &mut self.log)
    }

    /// Current read-side depth of `thread`
    pub fn read_depth(&self, thread: ThreadId) -> u32 {
        self.rcu.read_depth(thread)
    }

    /// `dereference(slot)`: the current value
    pub fn dereference(&mut self, thread: ThreadId, slot: SlotId) -> Result<Option<PtrValue>, ViolationReport> {
        self.rcu.dereference(thread, slot, &mut self.locks, &mut self.log)
    }

    /// `write_lock(slot)`
    pub fn write_lock(&mut self, thread: ThreadId, slot: SlotId) -> Result<(), ViolationReport> {
        self.rcu.write_lock(thread, slot, &mut self.locks, &mut self.log)
    }

    /// `write_unlock(slot)`
    pub fn write_unlock(&mut self, thread: ThreadId, slot: SlotId) -> Result<(), ViolationReport> {
        self.rcu.write_unlock(thread, slot, &mut self.locks, &mut self.log)
    }

    /// `assign_pointer(slot, new)`: returns the superseded value
    pub fn assign_pointer(
        &mut self,
        thread: ThreadId,
        slot: SlotId,
        new: PtrValue,
    ) -> Result<Option<PtrValue>, ViolationReport> {
        self.rcu
            .assign_pointer(thread, slot, new, &mut self.locks, &mut self.log)
    }

    /// Plain store to a protected pointer (always `UnprotectedPublish`)
    pub fn raw_store(
        &mut self,
        thread: ThreadId,
        slot: SlotId,
        new: PtrValue,
    ) -> Result<Option<PtrValue>, ViolationReport> {
        self.rcu.raw_store(thread, slot, new, &mut self.locks, &mut self.log)
    }

    /// `synchronize_grace_period(slot)`
    pub fn synchronize_grace_period(&mut self, thread: ThreadId, slot: SlotId) -> Result<(), ViolationReport> {
        self.rcu
            .synchronize_grace_period(thread, slot, &mut self.locks, &mut self.log)
    }

    /// Grace period on every declared slot
    pub fn synchronize_all(&mut self, thread: ThreadId) -> Result<(), ViolationReport> {
        self.rcu.synchronize_all(thread, &mut self.log)
    }

    /// `reclaim(slot, old)`
    pub fn reclaim(&mut self, thread: ThreadId, slot: SlotId, old: PtrValue) -> Result<(), ViolationReport> {
        self.rcu.reclaim(thread, slot, old, &mut self.locks, &mut self.log)
    }

    /// State of a protected slot
    pub fn slot(&self, slot: SlotId) -> Option<&ProtectedSlot> {
        self.rcu.slot(slot)
    }

    /// `check_read_sections_closed()`: appends a `ReadSectionLeak` per open
    /// section
    pub fn check_read_sections_closed(&mut self) -> bool {
        self.rcu.check_read_sections_closed(&mut self.log)
    }

    // ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
    // End of Program
    // ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

    /// Run the checkpoints enabled in the configuration
    ///
    /// Returns `true` when every enabled checkpoint passed.
    pub fn finish(&mut self) -> bool {
        let locks_ok = !self.config.check_locks_at_end || self.check_all_released();
        let reads_ok = !self.config.check_read_sections_at_end || self.check_read_sections_closed();
        tracing::debug!(locks_ok, reads_ok, findings = self.log.len(), "end of program");
        locks_ok && reads_ok
    }
}

impl<B: LockBackend> Default for SyncModel<B> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::report::ViolationKind;

    const MAIN: ThreadId = ThreadId::new(0);
    const READER: ThreadId = ThreadId::new(1);
    const WRITER: ThreadId = ThreadId::new(2);
    const GP: SlotId = SlotId::new(0);

    #[test]
    fn test_double_lock_scenario() {
        let mut model = ProductionModel::new();
        let m = LockId::mutex(0);
        model.init(MAIN, m).unwrap();
        model.lock(MAIN, m).unwrap();

        let err = model.lock(MAIN, m).unwrap_err();
        assert_eq!(err.kind, ViolationKind::DoubleLock);
        assert_eq!(model.verdict(), Verdict::Violation(ViolationKind::DoubleLock));
    }

    #[test]
    fn test_lock_unlock_released() {
        let mut model = ProductionModel::new();
        let m = LockId::mutex(0);
        model.init(MAIN, m).unwrap();
        model.lock(MAIN, m).unwrap();
        model.unlock(MAIN, m).unwrap();
        assert!(model.check_all_released());
        assert_eq!(model.verdict(), Verdict::Clean);
    }

    #[test]
    fn test_finish_runs_enabled_checkpoints() {
        let mut model = ProductionModel::new();
        model.declare_slot(GP, None, Some(PtrValue::new(1))).unwrap();
        model.enter_read(READER).unwrap();
        model.write_lock(WRITER, GP).unwrap();

        assert!(!model.finish());
        assert_eq!(
            model.log().kinds(),
            vec![ViolationKind::LeakedLock, ViolationKind::ReadSectionLeak]
        );
    }

    #[test]
    fn test_finish_respects_config() {
        let config = ModelConfig {
            check_locks_at_end: false,
            ..ModelConfig::default()
        };
        let mut model = ProductionModel::with_config(config);
        model.declare_lock(LockId::mutex(0)).unwrap();
        model.lock(MAIN, LockId::mutex(0)).unwrap();
        assert!(model.finish());
        assert!(model.log().is_clean());
    }

    #[test]
    fn test_reset_restores_initial_state() {
        let mut model = VerificationModel::new();
        model.declare_slot(GP, None, None).unwrap();
        model.write_lock(WRITER, GP).unwrap();
        let _ = model.lock(MAIN, LockId::mutex(3));

        model.reset();
        assert!(model.log().is_clean());
        assert!(model.slot(GP).is_none());
        assert!(model.held_locks().is_empty());
    }

    #[test]
    fn test_lenient_config_silences_undeclared() {
        let mut model = ProductionModel::with_config(ModelConfig::lenient());
        model.write_lock(WRITER, GP).unwrap();
        model.assign_pointer(WRITER, GP, PtrValue::new(5)).unwrap();
        model.write_unlock(WRITER, GP).unwrap();
        assert!(model.finish());
        assert_eq!(model.verdict(), Verdict::Clean);
    }
}
