//! Kani Proofs for the RCU Protocol Model
//!
//! The RCU state is a pair of short `Vec`s and the lock registry is the
//! bounded array backend, so small symbolic paths are explored exhaustively.

#![cfg(kani)]

use super::protocol::RcuModel;
use crate::domain::lock::{LockTracker, VerificationBackend};
use crate::domain::report::{FindingLog, ViolationKind};
use crate::domain::types::{PtrValue, SlotId, ThreadId};

fn setup() -> (RcuModel, LockTracker<VerificationBackend>, FindingLog) {
    let mut rcu = RcuModel::new(true, 4);
    let mut locks = LockTracker::new(true);
    let _ = rcu.declare_slot(SlotId::new(0), None, Some(PtrValue::new(1)), &mut locks);
    (rcu, locks, FindingLog::new())
}

/// dereference reports iff the reader is outside every read-side section.
#[kani::proof]
#[kani::unwind(6)]
fn proof_dereference_needs_read_section() {
    let (mut rcu, mut locks, mut log) = setup();
    let t = ThreadId::new(0);
    let gp = SlotId::new(0);

    let enters: u8 = kani::any();
    let exits: u8 = kani::any();
    kani::assume(enters <= 3 && exits <= enters);

    for _ in 0..enters {
        let _ = rcu.enter_read(t, &mut log);
    }
    for _ in 0..exits {
        let _ = rcu.exit_read(t, &mut log);
    }

    let result = rcu.dereference(t, gp, &mut locks, &mut log);
    kani::assert(result.is_ok() == (enters > exits), "finding iff depth is 0");
}

/// reclaim of the superseded value succeeds iff a grace period followed the
/// publish that superseded it.
#[kani::proof]
#[kani::unwind(6)]
fn proof_reclaim_needs_later_grace_period() {
    let (mut rcu, mut locks, mut log) = setup();
    let w = ThreadId::new(1);
    let gp = SlotId::new(0);

    let sync_before: bool = kani::any();
    let sync_after: bool = kani::any();

    if sync_before {
        let _ = rcu.synchronize_grace_period(w, gp, &mut locks, &mut log);
    }
    let _ = rcu.write_lock(w, gp, &mut locks, &mut log);
    let _ = rcu.assign_pointer(w, gp, PtrValue::new(2), &mut locks, &mut log);
    let _ = rcu.write_unlock(w, gp, &mut locks, &mut log);
    if sync_after {
        let _ = rcu.synchronize_grace_period(w, gp, &mut locks, &mut log);
    }

    let result = rcu.reclaim(w, gp, PtrValue::new(1), &mut locks, &mut log);
    kani::assert(result.is_ok() == sync_after, "reclaim legal iff grace period after publish");
    if let Err(report) = result {
        kani::assert(report.kind == ViolationKind::PrematureReclaim, "premature reclaim kind");
    }
}

/// assign_pointer is protected iff the publishing thread holds the update lock.
#[kani::proof]
#[kani::unwind(6)]
fn proof_publish_requires_own_update_lock() {
    let (mut rcu, mut locks, mut log) = setup();
    let gp = SlotId::new(0);
    let locker: usize = kani::any();
    let publisher: usize = kani::any();
    kani::assume(locker < 2 && publisher < 2);
    let take_lock: bool = kani::any();

    if take_lock {
        let _ = rcu.write_lock(ThreadId::new(locker), gp, &mut locks, &mut log);
    }
    let result = rcu.assign_pointer(ThreadId::new(publisher), gp, PtrValue::new(2), &mut locks, &mut log);

    kani::assert(
        result.is_ok() == (take_lock && locker == publisher),
        "protected iff publisher holds the lock",
    );
    kani::assert(
        rcu.slot(gp).map(|s| s.current()) == Some(Some(PtrValue::new(2))),
        "value published either way",
    );
}
