//! Kani Proofs for the Lock-State Tracker
//!
//! Each harness drives `LockTracker<VerificationBackend>` with symbolic
//! operation sequences. The registry is a four-entry array in a `RefCell`,
//! so the whole state space is small enough to explore exhaustively.
//!
//! Properties:
//! - **Mutual exclusion**: a lock is never acquired twice without a finding,
//!   and a failed acquisition leaves the holder alone
//! - **Successor states**: every finding leaves the automaton in the
//!   documented state
//! - **Checkpoint**: `check_all_released` is false iff some lock is held

#![cfg(kani)]

use super::tracker::LockTracker;
use super::verification_backend::VerificationBackend;
use crate::domain::report::{FindingLog, ViolationKind};
use crate::domain::types::{LockId, ThreadId};

const SEQ_LEN: usize = 4;

/// Any symbolic lock/unlock sequence on one lock reports DoubleLock or
/// UnlockWithoutLock exactly when it breaks strict alternation.
#[kani::proof]
#[kani::unwind(6)]
fn proof_alternation_matches_findings() {
    let mut tracker: LockTracker<VerificationBackend> = LockTracker::new(true);
    let mut log = FindingLog::new();
    let t = ThreadId::new(0);
    let m = LockId::mutex(0);

    let _ = tracker.init(t, m, &mut log);

    let mut held = false;
    for _ in 0..SEQ_LEN {
        let acquire: bool = kani::any();
        let result = if acquire {
            tracker.lock(t, m, &mut log)
        } else {
            tracker.unlock(t, m, &mut log)
        };

        let well_formed = acquire != held;
        kani::assert(result.is_ok() == well_formed, "finding iff alternation broken");
        if let Err(report) = result {
            let expected = if acquire {
                ViolationKind::DoubleLock
            } else {
                ViolationKind::UnlockWithoutLock
            };
            kani::assert(report.kind == expected, "finding kind matches operation");
        }

        held = acquire;
        kani::assert(tracker.check_locked(m) == held, "successor state");
    }
}

/// `init` on a held lock is DoubleInit and keeps it held.
#[kani::proof]
fn proof_double_init_keeps_lock() {
    let mut tracker: LockTracker<VerificationBackend> = LockTracker::new(true);
    let mut log = FindingLog::new();
    let t: usize = kani::any();
    kani::assume(t < 4);
    let thread = ThreadId::new(t);
    let m = LockId::mutex(1);

    let _ = tracker.init(thread, m, &mut log);
    let _ = tracker.lock(thread, m, &mut log);
    let result = tracker.init(thread, m, &mut log);

    kani::assert(
        matches!(result, Err(ref r) if r.kind == ViolationKind::DoubleInit),
        "init on held lock reports DoubleInit",
    );
    kani::assert(tracker.check_locked(m), "lock stays held");
}

/// A failed second `lock` never changes who holds the lock.
#[kani::proof]
fn proof_double_lock_keeps_holder() {
    let mut tracker: LockTracker<VerificationBackend> = LockTracker::new(true);
    let mut log = FindingLog::new();
    let (first, second): (usize, usize) = (kani::any(), kani::any());
    kani::assume(first < 4 && second < 4);
    let m = LockId::mutex(2);

    let _ = tracker.init(ThreadId::new(first), m, &mut log);
    let _ = tracker.lock(ThreadId::new(first), m, &mut log);
    let result = tracker.lock(ThreadId::new(second), m, &mut log);

    kani::assert(result.is_err(), "second lock reports DoubleLock");
    kani::assert(
        tracker.holder(m) == Some(ThreadId::new(first)),
        "original holder kept",
    );
}

/// The release checkpoint agrees with the final state of two locks.
#[kani::proof]
#[kani::unwind(6)]
fn proof_all_released_iff_nothing_held() {
    let mut tracker: LockTracker<VerificationBackend> = LockTracker::new(false);
    let mut log = FindingLog::new();
    let t = ThreadId::new(0);
    let a = LockId::mutex(0);
    let b = LockId::mutex(1);

    let _ = tracker.init(t, a, &mut log);
    let _ = tracker.init(t, b, &mut log);

    let lock_a: bool = kani::any();
    let lock_b: bool = kani::any();
    if lock_a {
        let _ = tracker.lock(t, a, &mut log);
    }
    if lock_b {
        let _ = tracker.lock(t, b, &mut log);
    }

    let before = log.len();
    let released = tracker.check_all_released(&mut log);
    kani::assert(released == (!lock_a && !lock_b), "checkpoint matches state");
    kani::assert(
        log.len() - before == lock_a as usize + lock_b as usize,
        "one LeakedLock per held lock",
    );
}
