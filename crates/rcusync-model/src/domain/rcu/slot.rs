//! Protected Slot - One RCU-Guarded Pointer Location
//!
//! Plain bookkeeping: the slot records what was published, what it replaced
//! and which grace periods followed. It never reports anything itself; the
//! protocol layer turns its answers into findings.
//!
//! Collections are small `Vec`s scanned linearly. A slot sees a handful of
//! publishes per path, and the same code runs under Kani.

use super::types::{SlotPhase, SupersededValue};
use crate::domain::types::{LockId, PtrValue, SlotId};
use serde::Serialize;

/// What `reclaim` found for a value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReclaimOutcome {
    /// Superseded and covered by a later grace period
    Reclaimed(SupersededValue),
    /// Freed too early; `record` is `None` when the value was never superseded
    Premature {
        /// The supersession the free raced with, if any
        record: Option<SupersededValue>,
    },
    /// Already reclaimed
    Double,
}

/// Model state of one protected pointer
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProtectedSlot {
    id: SlotId,
    update_lock: LockId,
    current: Option<PtrValue>,
    generation: u64,
    grace_epoch: u64,
    phase: SlotPhase,
    superseded: Vec<SupersededValue>,
    reclaimed: Vec<PtrValue>,
}

impl ProtectedSlot {
    /// A slot guarded by `update_lock`, optionally holding `initial`
    pub fn new(id: SlotId, update_lock: LockId, initial: Option<PtrValue>) -> Self {
        Self {
            id,
            update_lock,
            current: initial,
            generation: 0,
            grace_epoch: 0,
            phase: SlotPhase::Stable,
            superseded: Vec::new(),
            reclaimed: Vec::new(),
        }
    }

    /// Slot identity
    #[inline(always)]
    pub fn id(&self) -> SlotId {
        self.id
    }

    /// Lock that serializes writers of this slot
    #[inline(always)]
    pub fn update_lock(&self) -> LockId {
        self.update_lock
    }

    /// Currently published value
    #[inline(always)]
    pub fn current(&self) -> Option<PtrValue> {
        self.current
    }

    /// Number of publishes so far
    #[inline(always)]
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Number of grace periods so far
    #[inline(always)]
    pub fn grace_epoch(&self) -> u64 {
        self.grace_epoch
    }

    /// Current phase
    #[inline(always)]
    pub fn phase(&self) -> SlotPhase {
        self.phase
    }

    /// Superseded values not reclaimed yet, oldest first
    pub fn superseded(&self) -> &[SupersededValue] {
        &self.superseded
    }

    /// Values freed so far
    pub fn reclaimed(&self) -> &[PtrValue] {
        &self.reclaimed
    }

    /// Superseded values still waiting for a grace period
    pub fn pending(&self) -> impl Iterator<Item = &SupersededValue> + '_ {
        let epoch = self.grace_epoch;
        self.superseded.iter().filter(move |r| !r.is_reclaimable(epoch))
    }

    /// Whether `value` was ever seen in this slot (published, superseded or freed)
    pub fn knows(&self, value: PtrValue) -> bool {
        self.current == Some(value)
            || self.superseded.iter().any(|r| r.value == value)
            || self.reclaimed.contains(&value)
    }

    /// A writer took the update lock: Stable/GracePending → Publishing
    pub fn begin_write_section(&mut self) {
        self.phase = SlotPhase::Publishing;
    }

    /// Install `new`, superseding the current value
    ///
    /// Returns the previous value. The slot is `GracePending` afterwards,
    /// whether or not the writer held the update lock.
    pub fn publish(&mut self, new: PtrValue) -> Option<PtrValue> {
        let previous = self.current;
        self.generation += 1;

        if let Some(old) = previous.filter(|old| *old != new) {
            self.superseded.push(SupersededValue {
                value: old,
                generation: self.generation,
                epoch: self.grace_epoch,
            });
        }

        // Address reuse: a freed value may be published again
        self.reclaimed.retain(|v| *v != new);
        self.current = Some(new);
        self.phase = SlotPhase::GracePending;
        previous
    }

    /// The writer released the update lock
    ///
    /// A section that published nothing falls back to whatever the
    /// superseded values call for.
    pub fn end_write_section(&mut self) {
        if self.phase == SlotPhase::Publishing {
            self.phase = self.settled_phase();
        }
    }

    /// A grace period elapsed: everything superseded so far is reclaimable
    ///
    /// GracePending → Stable. A writer still inside its section stays
    /// `Publishing`.
    pub fn grace_period(&mut self) {
        self.grace_epoch += 1;
        if self.phase == SlotPhase::GracePending {
            self.phase = SlotPhase::Stable;
        }
    }

    fn settled_phase(&self) -> SlotPhase {
        if self.pending().next().is_some() {
            SlotPhase::GracePending
        } else {
            SlotPhase::Stable
        }
    }

    /// Free `value`
    ///
    /// The value is recorded as reclaimed in every outcome except `Double`,
    /// since the program frees it either way.
    pub fn reclaim(&mut self, value: PtrValue) -> ReclaimOutcome {
        if self.reclaimed.contains(&value) {
            return ReclaimOutcome::Double;
        }

        let epoch = self.grace_epoch;
        let ready = self
            .superseded
            .iter()
            .position(|r| r.value == value && r.is_reclaimable(epoch));
        let outcome = match ready {
            Some(index) => ReclaimOutcome::Reclaimed(self.superseded.remove(index)),
            None => {
                let record = self
                    .superseded
                    .iter()
                    .position(|r| r.value == value)
                    .map(|index| self.superseded.remove(index));
                ReclaimOutcome::Premature { record }
            }
        };

        self.reclaimed.push(value);
        outcome
    }
}
