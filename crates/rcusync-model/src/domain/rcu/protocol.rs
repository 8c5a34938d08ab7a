//! RCU Protocol Model
//!
//! # Overview
//!
//! The legal ordering of read-side sections, publication and deferred
//! reclamation, per protected slot:
//!
//! ```text
//! reader:  enter_read ── dereference(slot) ── exit_read
//!
//! writer:  write_lock(slot)
//!            └─ assign_pointer(slot, new)      old value superseded
//!          write_unlock(slot)
//!          synchronize_grace_period(slot)      old value now reclaimable
//!          reclaim(slot, old)
//! ```
//!
//! Writer-side exclusion is not re-implemented here: `write_lock` and
//! `write_unlock` drive the [`LockTracker`] on the slot's update lock, and
//! `assign_pointer` asks the tracker whether the publishing thread is the
//! one holding it.
//!
//! # Findings
//!
//! | Operation                  | Finding                           |
//! |----------------------------|-----------------------------------|
//! | `dereference` at depth 0   | `DereferenceOutsideReadSection`   |
//! | `assign_pointer` unlocked  | `UnprotectedPublish`              |
//! | `raw_store`                | `UnprotectedPublish`              |
//! | `synchronize` while inside | `GracePeriodInReadSection`        |
//! | `reclaim` too early        | `PrematureReclaim`                |
//! | `reclaim` twice            | `DoubleReclaim`                   |
//!
//! Every operation still applies its effect after reporting.

use super::read_section::ReadSections;
use super::slot::{ProtectedSlot, ReclaimOutcome};
use crate::domain::lock::{LockBackend, LockTracker};
use crate::domain::report::{FindingLog, Operand, ViolationKind, ViolationReport};
use crate::domain::types::{LockId, PtrValue, SlotId, ThreadId};
use crate::error::ModelError;

/// RCU state of one model instance: protected slots and read-side depths
#[derive(Debug, Clone)]
pub struct RcuModel {
    slots: Vec<ProtectedSlot>,
    reads: ReadSections,
    strict: bool,
}

impl RcuModel {
    /// Empty model
    ///
    /// `strict` reports operations on undeclared slots; `max_read_nesting`
    /// bounds read-side depth.
    pub fn new(strict: bool, max_read_nesting: u32) -> Self {
        Self {
            slots: Vec::new(),
            reads: ReadSections::new(max_read_nesting),
            strict,
        }
    }

    // ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
    // Registration
    // ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

    /// Declare `slot`, guarded by `update_lock` (its own update-side lock when
    /// `None`), optionally holding `initial`
    ///
    /// Redeclaring a slot replaces it. The update lock is declared in the
    /// tracker as well.
    ///
    /// By default every slot gets its own `LockId::UpdateSide` lock, kept
    /// apart from program mutexes. Passing a `LockId::Mutex` aliases the two:
    /// that is an explicit choice of whoever declares the slot (a trace's
    /// `update_lock` field), never inferred. Acquiring such a mutex through
    /// `lock` does not move the slot into `Publishing`.
    pub fn declare_slot<B: LockBackend>(
        &mut self,
        slot: SlotId,
        update_lock: Option<LockId>,
        initial: Option<PtrValue>,
        locks: &mut LockTracker<B>,
    ) -> Result<(), ModelError> {
        let update_lock = update_lock.unwrap_or(LockId::update_side(slot));
        locks.declare(update_lock)?;

        let fresh = ProtectedSlot::new(slot, update_lock, initial);
        match self.slots.iter_mut().find(|s| s.id() == slot) {
            Some(existing) => *existing = fresh,
            None => self.slots.push(fresh),
        }
        tracing::debug!(%slot, %update_lock, initial = ?initial, "slot declared");
        Ok(())
    }

    /// State of `slot`, if declared
    pub fn slot(&self, slot: SlotId) -> Option<&ProtectedSlot> {
        self.slots.iter().find(|s| s.id() == slot)
    }

    /// All slots in declaration order
    pub fn slots(&self) -> &[ProtectedSlot] {
        &self.slots
    }

    /// Update-side lock of `slot`, if declared
    pub fn update_lock_of(&self, slot: SlotId) -> Option<LockId> {
        self.slot(slot).map(ProtectedSlot::update_lock)
    }

    /// Slot that has seen `value`, preferring one where it awaits reclamation
    pub fn slot_of_value(&self, value: PtrValue) -> Option<SlotId> {
        self.slots
            .iter()
            .find(|s| s.superseded().iter().any(|r| r.value == value))
            .or_else(|| self.slots.iter().find(|s| s.knows(value)))
            .map(ProtectedSlot::id)
    }

    /// Current read-side depth of `thread`
    #[inline(always)]
    pub fn read_depth(&self, thread: ThreadId) -> u32 {
        self.reads.depth(thread)
    }

    /// Read-side table
    pub fn read_sections(&self) -> &ReadSections {
        &self.reads
    }

    // ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
    // Reader Side
    // ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

    /// `enter_read(thread)`: returns the new depth
    pub fn enter_read(&mut self, thread: ThreadId, log: &mut FindingLog) -> Result<u32, ViolationReport> {
        self.reads.enter(thread, log)
    }

    /// `exit_read(thread)`: returns the new depth
    pub fn exit_read(&mut self, thread: ThreadId, log: &mut FindingLog) -> Result<u32, ViolationReport> {
        self.reads.exit(thread, log)
    }

    /// `dereference(thread, slot)`: the current value of the slot
    ///
    /// # Errors
    /// `DereferenceOutsideReadSection` at depth 0. The value is still read.
    pub fn dereference<B: LockBackend>(
        &mut self,
        thread: ThreadId,
        slot: SlotId,
        locks: &mut LockTracker<B>,
        log: &mut FindingLog,
    ) -> Result<Option<PtrValue>, ViolationReport> {
        let mark = log.mark();
        let index = self.ensure_slot(thread, slot, locks, log);

        if !self.reads.is_inside(thread) {
            log.report(
                ViolationReport::new(
                    ViolationKind::DereferenceOutsideReadSection,
                    Operand::Slot(slot),
                )
                .by(thread),
            );
        }

        let value = self.slots[index].current();
        tracing::trace!(%thread, %slot, value = ?value, "dereference");
        log.outcome(mark, value)
    }

    // ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
    // Writer Side
    // ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

    /// `write_lock(thread, slot)`: acquire the slot's update lock
    ///
    /// The slot enters `Publishing`.
    pub fn write_lock<B: LockBackend>(
        &mut self,
        thread: ThreadId,
        slot: SlotId,
        locks: &mut LockTracker<B>,
        log: &mut FindingLog,
    ) -> Result<(), ViolationReport> {
        let mark = log.mark();
        let index = self.ensure_slot(thread, slot, locks, log);
        let lock = self.slots[index].update_lock();
        let _ = locks.lock(thread, lock, log);
        self.slots[index].begin_write_section();
        log.outcome(mark, ())
    }

    /// `write_unlock(thread, slot)`: release the slot's update lock
    pub fn write_unlock<B: LockBackend>(
        &mut self,
        thread: ThreadId,
        slot: SlotId,
        locks: &mut LockTracker<B>,
        log: &mut FindingLog,
    ) -> Result<(), ViolationReport> {
        let mark = log.mark();
        let index = self.ensure_slot(thread, slot, locks, log);
        let lock = self.slots[index].update_lock();
        let _ = locks.unlock(thread, lock, log);
        self.slots[index].end_write_section();
        log.outcome(mark, ())
    }

    /// `assign_pointer(thread, slot, new)`: publish `new`
    ///
    /// Returns the superseded value.
    ///
    /// # Errors
    /// `UnprotectedPublish` unless `thread` holds the slot's update lock. The
    /// publish happens either way.
    pub fn assign_pointer<B: LockBackend>(
        &mut self,
        thread: ThreadId,
        slot: SlotId,
        new: PtrValue,
        locks: &mut LockTracker<B>,
        log: &mut FindingLog,
    ) -> Result<Option<PtrValue>, ViolationReport> {
        let mark = log.mark();
        let index = self.ensure_slot(thread, slot, locks, log);
        let lock = self.slots[index].update_lock();

        let protected = locks.is_held_by(lock, thread);
        if !protected {
            let detail = match locks.holder(lock) {
                Some(holder) => format!("{} is held by {}", lock, holder),
                None => format!("{} is not held", lock),
            };
            log.report(
                ViolationReport::new(ViolationKind::UnprotectedPublish, Operand::Slot(slot))
                    .by(thread)
                    .with_detail(detail),
            );
        }

        let previous = self.slots[index].publish(new);
        tracing::debug!(
            %thread,
            %slot,
            %new,
            previous = ?previous,
            generation = self.slots[index].generation(),
            "assign_pointer"
        );
        log.outcome(mark, previous)
    }

    /// `raw_store(thread, slot, new)`: plain store bypassing the publish
    /// primitive
    ///
    /// Always reports `UnprotectedPublish`; the value is installed and the
    /// old one superseded as with `assign_pointer`.
    pub fn raw_store<B: LockBackend>(
        &mut self,
        thread: ThreadId,
        slot: SlotId,
        new: PtrValue,
        locks: &mut LockTracker<B>,
        log: &mut FindingLog,
    ) -> Result<Option<PtrValue>, ViolationReport> {
        let mark = log.mark();
        let index = self.ensure_slot(thread, slot, locks, log);

        log.report(
            ViolationReport::new(ViolationKind::UnprotectedPublish, Operand::Slot(slot))
                .by(thread)
                .with_detail("plain store to a protected pointer"),
        );

        let previous = self.slots[index].publish(new);
        log.outcome(mark, previous)
    }

    /// `synchronize_grace_period(thread, slot)`: logical barrier on one slot
    ///
    /// # Errors
    /// `GracePeriodInReadSection` when `thread` is inside a read-side
    /// section. The grace period is still recorded.
    pub fn synchronize_grace_period<B: LockBackend>(
        &mut self,
        thread: ThreadId,
        slot: SlotId,
        locks: &mut LockTracker<B>,
        log: &mut FindingLog,
    ) -> Result<(), ViolationReport> {
        let mark = log.mark();
        let index = self.ensure_slot(thread, slot, locks, log);
        self.check_not_reading(thread, Operand::Slot(slot), log);
        self.slots[index].grace_period();
        tracing::debug!(%thread, %slot, epoch = self.slots[index].grace_epoch(), "grace period");
        log.outcome(mark, ())
    }

    /// Grace period on every declared slot (`synchronize_rcu()` takes no
    /// argument)
    pub fn synchronize_all(&mut self, thread: ThreadId, log: &mut FindingLog) -> Result<(), ViolationReport> {
        let mark = log.mark();
        self.check_not_reading(thread, Operand::Thread(thread), log);
        for slot in &mut self.slots {
            slot.grace_period();
        }
        tracing::debug!(%thread, slots = self.slots.len(), "grace period on all slots");
        log.outcome(mark, ())
    }

    /// `reclaim(thread, slot, old)`: free a superseded value
    ///
    /// # Errors
    /// - `PrematureReclaim` when `old` was never superseded in this slot or
    ///   no grace period followed its supersession
    /// - `DoubleReclaim` when `old` was already reclaimed
    pub fn reclaim<B: LockBackend>(
        &mut self,
        thread: ThreadId,
        slot: SlotId,
        old: PtrValue,
        locks: &mut LockTracker<B>,
        log: &mut FindingLog,
    ) -> Result<(), ViolationReport> {
        let mark = log.mark();
        let index = self.ensure_slot(thread, slot, locks, log);

        match self.slots[index].reclaim(old) {
            ReclaimOutcome::Reclaimed(record) => {
                tracing::debug!(%thread, %slot, %old, generation = record.generation, "reclaimed");
            }
            ReclaimOutcome::Premature { record } => {
                let detail = match record {
                    Some(r) => format!(
                        "{} superseded at generation {} with no grace period since",
                        old, r.generation
                    ),
                    None => format!("{} was never superseded", old),
                };
                log.report(
                    ViolationReport::new(ViolationKind::PrematureReclaim, Operand::Slot(slot))
                        .by(thread)
                        .with_detail(detail),
                );
            }
            ReclaimOutcome::Double => {
                log.report(
                    ViolationReport::new(ViolationKind::DoubleReclaim, Operand::Slot(slot))
                        .by(thread)
                        .with_detail(format!("{} already reclaimed", old)),
                );
            }
        }

        log.outcome(mark, ())
    }

    // ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
    // Checkpoints
    // ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

    /// `check_read_sections_closed()`: true iff no thread is inside a
    /// read-side section
    pub fn check_read_sections_closed(&self, log: &mut FindingLog) -> bool {
        self.reads.check_closed(log)
    }

    /// Forget all slots and read-side state
    pub fn reset(&mut self) {
        self.slots.clear();
        self.reads.clear();
    }

    // ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
    // Internals
    // ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

    fn check_not_reading(&self, thread: ThreadId, operand: Operand, log: &mut FindingLog) {
        let depth = self.reads.depth(thread);
        if depth > 0 {
            log.report(
                ViolationReport::new(ViolationKind::GracePeriodInReadSection, operand)
                    .by(thread)
                    .with_detail(format!("read-side depth {}", depth)),
            );
        }
    }

    /// Index of `slot`, registering it (no value, own update lock) if needed
    fn ensure_slot<B: LockBackend>(
        &mut self,
        thread: ThreadId,
        slot: SlotId,
        locks: &mut LockTracker<B>,
        log: &mut FindingLog,
    ) -> usize {
        if let Some(index) = self.slots.iter().position(|s| s.id() == slot) {
            return index;
        }

        if self.strict {
            log.report(
                ViolationReport::new(ViolationKind::UndeclaredOperand, Operand::Slot(slot))
                    .by(thread)
                    .with_detail("slot used before declaration"),
            );
        } else {
            tracing::debug!(%thread, %slot, "implicitly registered slot");
        }

        let lock = LockId::update_side(slot);
        if let Err(err) = locks.declare(lock) {
            tracing::error!(%slot, error = %err, "cannot register update-side lock");
            log.report(
                ViolationReport::new(ViolationKind::UndeclaredOperand, Operand::Lock(lock))
                    .by(thread)
                    .with_detail(err.to_string()),
            );
        }

        self.slots.push(ProtectedSlot::new(slot, lock, None));
        self.slots.len() - 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::lock::ProductionBackend;

    const READER: ThreadId = ThreadId::new(1);
    const WRITER: ThreadId = ThreadId::new(2);
    const GP: SlotId = SlotId::new(0);
    const A: PtrValue = PtrValue::new(100);
    const B: PtrValue = PtrValue::new(200);

    struct Fixture {
        rcu: RcuModel,
        locks: LockTracker<ProductionBackend>,
        log: FindingLog,
    }

    fn fixture() -> Fixture {
        let mut rcu = RcuModel::new(true, 64);
        let mut locks = LockTracker::new(true);
        rcu.declare_slot(GP, None, Some(A), &mut locks).unwrap();
        Fixture {
            rcu,
            locks,
            log: FindingLog::new(),
        }
    }

    #[test]
    fn test_clean_update_cycle() {
        let Fixture { mut rcu, mut locks, mut log } = fixture();

        rcu.enter_read(READER, &mut log).unwrap();
        assert_eq!(rcu.dereference(READER, GP, &mut locks, &mut log), Ok(Some(A)));

        rcu.write_lock(WRITER, GP, &mut locks, &mut log).unwrap();
        assert_eq!(
            rcu.assign_pointer(WRITER, GP, B, &mut locks, &mut log),
            Ok(Some(A))
        );
        rcu.write_unlock(WRITER, GP, &mut locks, &mut log).unwrap();

        // Reader still inside sees the new value on its next dereference
        assert_eq!(rcu.dereference(READER, GP, &mut locks, &mut log), Ok(Some(B)));
        rcu.exit_read(READER, &mut log).unwrap();

        rcu.synchronize_grace_period(WRITER, GP, &mut locks, &mut log).unwrap();
        rcu.reclaim(WRITER, GP, A, &mut locks, &mut log).unwrap();

        assert!(rcu.check_read_sections_closed(&mut log));
        assert!(locks.check_all_released(&mut log));
        assert!(log.is_clean());
    }

    #[test]
    fn test_dereference_outside_section_still_returns_value() {
        let Fixture { mut rcu, mut locks, mut log } = fixture();
        let err = rcu.dereference(READER, GP, &mut locks, &mut log).unwrap_err();
        assert_eq!(err.kind, ViolationKind::DereferenceOutsideReadSection);
        assert_eq!(err.operand, Operand::Slot(GP));
    }

    #[test]
    fn test_publish_by_non_holder_is_unprotected() {
        let Fixture { mut rcu, mut locks, mut log } = fixture();
        rcu.write_lock(READER, GP, &mut locks, &mut log).unwrap();

        let err = rcu.assign_pointer(WRITER, GP, B, &mut locks, &mut log).unwrap_err();
        assert_eq!(err.kind, ViolationKind::UnprotectedPublish);
        assert!(err.detail.unwrap().contains("held by t1"));
        assert_eq!(rcu.slot(GP).unwrap().current(), Some(B));
    }

    #[test]
    fn test_premature_then_double_reclaim() {
        let Fixture { mut rcu, mut locks, mut log } = fixture();
        rcu.write_lock(WRITER, GP, &mut locks, &mut log).unwrap();
        rcu.assign_pointer(WRITER, GP, B, &mut locks, &mut log).unwrap();
        rcu.write_unlock(WRITER, GP, &mut locks, &mut log).unwrap();

        let err = rcu.reclaim(WRITER, GP, A, &mut locks, &mut log).unwrap_err();
        assert_eq!(err.kind, ViolationKind::PrematureReclaim);

        rcu.synchronize_grace_period(WRITER, GP, &mut locks, &mut log).unwrap();
        let err = rcu.reclaim(WRITER, GP, A, &mut locks, &mut log).unwrap_err();
        assert_eq!(err.kind, ViolationKind::DoubleReclaim);
    }

    #[test]
    fn test_grace_period_inside_read_section() {
        let Fixture { mut rcu, mut locks, mut log } = fixture();
        rcu.write_lock(WRITER, GP, &mut locks, &mut log).unwrap();
        rcu.assign_pointer(WRITER, GP, B, &mut locks, &mut log).unwrap();
        rcu.write_unlock(WRITER, GP, &mut locks, &mut log).unwrap();

        rcu.enter_read(WRITER, &mut log).unwrap();
        let err = rcu.synchronize_all(WRITER, &mut log).unwrap_err();
        assert_eq!(err.kind, ViolationKind::GracePeriodInReadSection);

        // Recorded anyway
        assert!(rcu.reclaim(WRITER, GP, A, &mut locks, &mut log).is_ok());
    }

    #[test]
    fn test_raw_store_always_reports() {
        let Fixture { mut rcu, mut locks, mut log } = fixture();
        rcu.write_lock(WRITER, GP, &mut locks, &mut log).unwrap();
        let err = rcu.raw_store(WRITER, GP, B, &mut locks, &mut log).unwrap_err();
        assert_eq!(err.kind, ViolationKind::UnprotectedPublish);
        assert_eq!(rcu.slot(GP).unwrap().current(), Some(B));
    }

    #[test]
    fn test_undeclared_slot_is_registered() {
        let mut rcu = RcuModel::new(true, 64);
        let mut locks: LockTracker<ProductionBackend> = LockTracker::new(true);
        let mut log = FindingLog::new();
        let slot = SlotId::new(5);

        let err = rcu.write_lock(WRITER, slot, &mut locks, &mut log).unwrap_err();
        assert_eq!(err.kind, ViolationKind::UndeclaredOperand);
        assert!(locks.check_locked(LockId::update_side(slot)));
        assert_eq!(log.len(), 1);
    }

    #[test]
    fn test_shared_mutex_as_update_lock() {
        let mut rcu = RcuModel::new(true, 64);
        let mut locks: LockTracker<ProductionBackend> = LockTracker::new(true);
        let mut log = FindingLog::new();
        let mutex = LockId::mutex(0);
        rcu.declare_slot(GP, Some(mutex), Some(A), &mut locks).unwrap();

        locks.lock(WRITER, mutex, &mut log).unwrap();
        assert!(rcu.assign_pointer(WRITER, GP, B, &mut locks, &mut log).is_ok());

        let err = rcu.write_lock(WRITER, GP, &mut locks, &mut log).unwrap_err();
        assert_eq!(err.kind, ViolationKind::DoubleLock);
    }

    #[test]
    fn test_slot_of_value() {
        let Fixture { mut rcu, mut locks, mut log } = fixture();
        let other = SlotId::new(1);
        rcu.declare_slot(other, None, Some(B), &mut locks).unwrap();

        assert_eq!(rcu.slot_of_value(A), Some(GP));
        assert_eq!(rcu.slot_of_value(B), Some(other));

        rcu.write_lock(WRITER, GP, &mut locks, &mut log).unwrap();
        rcu.assign_pointer(WRITER, GP, B, &mut locks, &mut log).unwrap();
        assert_eq!(rcu.slot_of_value(A), Some(GP));
        assert_eq!(rcu.slot_of_value(PtrValue::new(9)), None);
    }
}
