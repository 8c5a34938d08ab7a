//! Hook Benchmark Suite - Per-Call Cost of the Model
//!
//! A verifier calls one hook per instrumented call on every explored path,
//! so the per-hook cost bounds how many paths it can afford.
//!
//! # Scenarios
//!
//! 1. **Lock alternation**: lock/unlock pairs on one mutex
//!    - Production (DashMap) vs verification (array) registry
//!
//! 2. **RCU update cycle**: write_lock → assign → write_unlock → synchronize
//!    → reclaim on one slot
//!
//! 3. **Trace replay**: reader_writer-N through the instrumentation adapter
//!    - N = 1, 4, 16

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use rcusync_model::adapters::Instrumenter;
use rcusync_model::domain::lock::{LockBackend, ProductionBackend, VerificationBackend};
use rcusync_model::domain::*;
use rcusync_model::infrastructure::{CallEvent, Trace, TraceEvent, TraceSlot};

// ============================================================================
// Helpers
// ============================================================================

fn lock_alternation<B: LockBackend>(pairs: usize) -> usize {
    let mut model = SyncModel::<B>::new();
    let (thread, lock) = (ThreadId::new(0), LockId::mutex(0));
    let _ = model.declare_lock(lock);
    for _ in 0..pairs {
        let _ = model.lock(thread, lock);
        let _ = model.unlock(thread, lock);
    }
    model.log().len()
}

fn update_cycles(cycles: u64) -> usize {
    let mut model = ProductionModel::new();
    let (writer, gp) = (ThreadId::new(1), SlotId::new(0));
    let _ = model.declare_slot(gp, None, Some(PtrValue::new(0)));
    for v in 1..=cycles {
        let _ = model.write_lock(writer, gp);
        let _ = model.assign_pointer(writer, gp, PtrValue::new(v));
        let _ = model.write_unlock(writer, gp);
        let _ = model.synchronize_grace_period(writer, gp);
        let _ = model.reclaim(writer, gp, PtrValue::new(v - 1));
    }
    model.log().len()
}

fn call(thread: &str, function: &str, args: &[&str]) -> TraceEvent {
    TraceEvent::Call(CallEvent::new(thread, function, args))
}

fn reader_writer_trace(writers: usize) -> Trace {
    let mut events = vec![
        call("main", "pthread_mutex_init", &["&mutex", "NULL"]),
        call("reader", "ldv_rcu_read_lock", &[]),
        call("reader", "ldv_rcu_dereference", &["gp"]),
        call("reader", "ldv_rcu_read_unlock", &[]),
    ];
    let mut observed = "gp_init".to_string();
    for i in 1..=writers {
        let name = format!("writer{}", i);
        let published = format!("pWriter{}", i);
        events.extend([
            call(&name, "pthread_mutex_lock", &["&mutex"]),
            call(&name, "ldv_wlock_rcu", &[]),
            call(&name, "ldv_rcu_assign_pointer", &["gp", published.as_str()]),
            call(&name, "ldv_wunlock_rcu", &[]),
            call(&name, "pthread_mutex_unlock", &["&mutex"]),
            call(&name, "ldv_synchronize_rcu", &[]),
            call(&name, "ldv_free", &[observed.as_str()]),
        ]);
        observed = published;
    }
    Trace {
        slots: vec![TraceSlot {
            name: "gp".into(),
            initial: Some("gp_init".into()),
            update_lock: None,
        }],
        events,
        ..Trace::default()
    }
}

// ============================================================================
// Benchmarks
// ============================================================================

fn bench_lock_alternation(c: &mut Criterion) {
    let mut group = c.benchmark_group("lock_alternation");
    group.bench_function("production", |b| {
        b.iter(|| lock_alternation::<ProductionBackend>(black_box(1_000)))
    });
    group.bench_function("verification", |b| {
        b.iter(|| lock_alternation::<VerificationBackend>(black_box(1_000)))
    });
    group.finish();
}

fn bench_update_cycle(c: &mut Criterion) {
    c.bench_function("rcu_update_cycle_1000", |b| {
        b.iter(|| update_cycles(black_box(1_000)))
    });
}

fn bench_trace_replay(c: &mut Criterion) {
    let mut group = c.benchmark_group("trace_replay");
    for writers in [1usize, 4, 16] {
        let trace = reader_writer_trace(writers);
        group.bench_with_input(BenchmarkId::new("reader_writer", writers), &trace, |b, trace| {
            b.iter(|| {
                let mut model = ProductionModel::new();
                Instrumenter::default()
                    .replay(&mut model, black_box(trace))
                    .map(|outcome| outcome.verdict)
            })
        });
    }
    group.finish();
}

criterion_group!(
    benches,
    bench_lock_alternation,
    bench_update_cycle,
    bench_trace_replay
);
criterion_main!(benches);
