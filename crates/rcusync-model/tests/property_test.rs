//! Property Tests - Random Hook Sequences Against Reference Automata
//!
//! Each property drives the model with an arbitrary operation sequence and
//! compares the findings with a few lines of straight-line bookkeeping.

use proptest::prelude::*;
use rcusync_model::domain::lock::{ProductionBackend, VerificationBackend, MAX_LOCKS};
use rcusync_model::domain::*;

#[derive(Debug, Clone, Copy)]
enum LockOp {
    Init(usize, usize),
    Lock(usize, usize),
    Unlock(usize, usize),
}

fn lock_op() -> impl Strategy<Value = LockOp> {
    let thread = 0..3usize;
    let lock = 0..MAX_LOCKS;
    prop_oneof![
        1 => (thread.clone(), lock.clone()).prop_map(|(t, l)| LockOp::Init(t, l)),
        3 => (thread.clone(), lock.clone()).prop_map(|(t, l)| LockOp::Lock(t, l)),
        3 => (thread, lock).prop_map(|(t, l)| LockOp::Unlock(t, l)),
    ]
}

fn run_lock_ops<B: LockBackend>(ops: &[LockOp]) -> (SyncModel<B>, Vec<bool>) {
    let mut model = SyncModel::<B>::new();
    for id in 0..MAX_LOCKS {
        model.declare_lock(LockId::mutex(id)).unwrap();
    }
    let results = ops
        .iter()
        .map(|op| {
            let before = model.log().len();
            let result = match *op {
                LockOp::Init(t, l) => model.init(ThreadId::new(t), LockId::mutex(l)),
                LockOp::Lock(t, l) => model.lock(ThreadId::new(t), LockId::mutex(l)),
                LockOp::Unlock(t, l) => model.unlock(ThreadId::new(t), LockId::mutex(l)),
            };
            // A hook fails exactly when it appended a finding
            assert_eq!(result.is_err(), model.log().len() > before);
            result.is_ok()
        })
        .collect();
    (model, results)
}

#[derive(Debug, Clone, Copy)]
enum ReadOp {
    Enter(usize),
    Exit(usize),
}

fn read_op() -> impl Strategy<Value = ReadOp> {
    prop_oneof![
        (0..3usize).prop_map(ReadOp::Enter),
        (0..3usize).prop_map(ReadOp::Exit),
    ]
}

#[derive(Debug, Clone, Copy)]
enum WriterOp {
    Publish(u64),
    Synchronize,
    Reclaim(u64),
}

fn writer_op() -> impl Strategy<Value = WriterOp> {
    prop_oneof![
        (1..6u64).prop_map(WriterOp::Publish),
        Just(WriterOp::Synchronize),
        (1..6u64).prop_map(WriterOp::Reclaim),
    ]
}

#[derive(Debug, Clone, Copy)]
enum UpdateOp {
    WriteLock(usize),
    WriteUnlock(usize),
    Assign(usize, u64),
}

fn update_op() -> impl Strategy<Value = UpdateOp> {
    prop_oneof![
        1 => (0..3usize).prop_map(UpdateOp::WriteLock),
        1 => (0..3usize).prop_map(UpdateOp::WriteUnlock),
        2 => (0..3usize, 1..6u64).prop_map(|(t, v)| UpdateOp::Assign(t, v)),
    ]
}

proptest! {
    #[test]
    fn prop_lock_findings_match_reference(ops in prop::collection::vec(lock_op(), 0..64)) {
        let (model, _) = run_lock_ops::<ProductionBackend>(&ops);

        let mut held = [false; MAX_LOCKS];
        let mut expected = Vec::new();
        for op in &ops {
            match *op {
                LockOp::Init(_, l) => {
                    if held[l] {
                        expected.push(ViolationKind::DoubleInit);
                    }
                }
                LockOp::Lock(_, l) => {
                    if held[l] {
                        expected.push(ViolationKind::DoubleLock);
                    }
                    held[l] = true;
                }
                LockOp::Unlock(_, l) => {
                    if !held[l] {
                        expected.push(ViolationKind::UnlockWithoutLock);
                    }
                    held[l] = false;
                }
            }
        }

        prop_assert_eq!(model.log().kinds(), expected);
        for (l, is_held) in held.iter().enumerate() {
            prop_assert_eq!(model.check_locked(LockId::mutex(l)), *is_held);
        }
    }

    #[test]
    fn prop_backends_agree(ops in prop::collection::vec(lock_op(), 0..64)) {
        let (mut production, prod_results) = run_lock_ops::<ProductionBackend>(&ops);
        let (mut verification, verif_results) = run_lock_ops::<VerificationBackend>(&ops);

        prop_assert_eq!(prod_results, verif_results);
        prop_assert_eq!(production.check_all_released(), verification.check_all_released());
        prop_assert_eq!(production.findings(), verification.findings());
    }

    #[test]
    fn prop_read_depth_is_bounded(ops in prop::collection::vec(read_op(), 0..128), max in 1..5u32) {
        let config = ModelConfig { max_read_nesting: max, ..ModelConfig::default() };
        let mut model = ProductionModel::with_config(config);

        let mut depth = [0u32; 3];
        let mut expected = Vec::new();
        for op in &ops {
            match *op {
                ReadOp::Enter(t) => {
                    let _ = model.enter_read(ThreadId::new(t));
                    if depth[t] == max {
                        expected.push(ViolationKind::ReadNestingOverflow);
                    } else {
                        depth[t] += 1;
                    }
                }
                ReadOp::Exit(t) => {
                    let _ = model.exit_read(ThreadId::new(t));
                    if depth[t] == 0 {
                        expected.push(ViolationKind::UnbalancedReadUnlock);
                    } else {
                        depth[t] -= 1;
                    }
                }
            }
            prop_assert!((0..3).all(|t| model.read_depth(ThreadId::new(t)) <= max));
        }

        prop_assert_eq!(model.log().kinds(), expected);
        let open = depth.iter().filter(|d| **d > 0).count();
        prop_assert_eq!(model.check_read_sections_closed(), open == 0);
    }

    #[test]
    fn prop_reclaim_needs_grace_period(ops in prop::collection::vec(writer_op(), 0..48)) {
        let (writer, gp) = (ThreadId::new(1), SlotId::new(0));
        let mut model = ProductionModel::new();
        model.declare_slot(gp, None, Some(PtrValue::new(0))).unwrap();

        // value → supersession epoch, for values awaiting reclamation
        let mut current = 0u64;
        let mut epoch = 0u64;
        let mut pending: Vec<(u64, u64)> = Vec::new();
        let mut freed: Vec<u64> = Vec::new();

        for op in &ops {
            match *op {
                WriterOp::Publish(v) => {
                    model.write_lock(writer, gp).unwrap();
                    model.assign_pointer(writer, gp, PtrValue::new(v)).unwrap();
                    model.write_unlock(writer, gp).unwrap();
                    if v != current {
                        pending.push((current, epoch));
                    }
                    freed.retain(|f| *f != v);
                    current = v;
                }
                WriterOp::Synchronize => {
                    model.synchronize_grace_period(writer, gp).unwrap();
                    epoch += 1;
                }
                WriterOp::Reclaim(v) => {
                    let result = model.reclaim(writer, gp, PtrValue::new(v));
                    let expected = if freed.contains(&v) {
                        Some(ViolationKind::DoubleReclaim)
                    } else {
                        let safe = pending.iter().position(|(p, e)| *p == v && *e < epoch);
                        match safe {
                            Some(index) => {
                                pending.remove(index);
                                None
                            }
                            None => {
                                if let Some(index) = pending.iter().position(|(p, _)| *p == v) {
                                    pending.remove(index);
                                }
                                Some(ViolationKind::PrematureReclaim)
                            }
                        }
                    };
                    if !freed.contains(&v) {
                        freed.push(v);
                    }
                    prop_assert_eq!(result.err().map(|r| r.kind), expected);
                }
            }
        }
        prop_assert_eq!(model.slot(gp).unwrap().current(), Some(PtrValue::new(current)));
    }

    #[test]
    fn prop_publish_needs_own_write_lock(ops in prop::collection::vec(update_op(), 0..64)) {
        let gp = SlotId::new(0);
        let mut model = ProductionModel::new();
        model.declare_slot(gp, None, Some(PtrValue::new(0))).unwrap();

        // Thread whose write_lock succeeded, until any write_unlock
        let mut owner: Option<usize> = None;
        let mut expected = Vec::new();
        for op in &ops {
            match *op {
                UpdateOp::WriteLock(t) => {
                    let result = model.write_lock(ThreadId::new(t), gp);
                    prop_assert_eq!(result.is_ok(), owner.is_none());
                    match owner {
                        Some(_) => expected.push(ViolationKind::DoubleLock),
                        None => owner = Some(t),
                    }
                }
                UpdateOp::WriteUnlock(t) => {
                    let _ = model.write_unlock(ThreadId::new(t), gp);
                    if owner.take().is_none() {
                        expected.push(ViolationKind::UnlockWithoutLock);
                    }
                }
                UpdateOp::Assign(t, v) => {
                    let result = model.assign_pointer(ThreadId::new(t), gp, PtrValue::new(v));
                    prop_assert_eq!(result.is_ok(), owner == Some(t));
                    if owner != Some(t) {
                        expected.push(ViolationKind::UnprotectedPublish);
                    }
                    prop_assert_eq!(model.slot(gp).unwrap().current(), Some(PtrValue::new(v)));
                }
            }
        }

        prop_assert_eq!(model.log().kinds(), expected);
    }

    #[test]
    fn prop_finding_sequence_is_monotonic(ops in prop::collection::vec(lock_op(), 0..64)) {
        let (model, _) = run_lock_ops::<ProductionBackend>(&ops);
        let seqs: Vec<u64> = model.findings().iter().map(|r| r.seq).collect();
        prop_assert!(seqs.windows(2).all(|w| w[0] < w[1]));
        prop_assert_eq!(
            model.verdict(),
            model.findings().first().map_or(Verdict::Clean, |r| Verdict::Violation(r.kind))
        );
    }
}
