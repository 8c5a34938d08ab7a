//! Scenario Replay - Labelled Regression Paths
//!
//! # Overview
//!
//! A scenario is a small concurrent program reduced to its synchronization
//! calls: a set of thread bodies (ordered [`Step`]s that share state only
//! through the model), a schedule that interleaves them, and the verdict the
//! path is expected to produce.
//!
//! ```text
//! Scenario
//!   ├─ locks, slots          declared up front
//!   ├─ threads[i].steps      ThreadBody i runs as ThreadId(i)
//!   ├─ schedule              Sequential | RoundRobin | Explicit([i, ...])
//!   └─ expected              Verdict
//!
//! replay() → fresh model → declare → interleave → finish() → ReplayOutcome
//! ```
//!
//! The model does not explore interleavings; an explicit schedule is how an
//! exploring driver hands one to it. Steps an explicit schedule leaves out run
//! afterwards, thread by thread.
//!
//! # JSON
//!
//! ```json
//! {
//!   "name": "double_lock",
//!   "expected": { "Violation": "DoubleLock" },
//!   "locks": [{ "Mutex": 0 }],
//!   "threads": [
//!     { "name": "main", "steps": [
//!       { "op": "lock", "lock": { "Mutex": 0 } },
//!       { "op": "lock", "lock": { "Mutex": 0 } }
//!     ] }
//!   ]
//! }
//! ```

use super::config::ModelConfig;
use super::lock::LockBackend;
use super::model::SyncModel;
use super::report::{Verdict, ViolationReport};
use super::types::{LockId, PtrValue, SlotId, ThreadId};
use crate::error::ModelError;
use serde::{Deserialize, Serialize};

/// One synchronization call of a thread body
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Step {
    /// `init(lock)`
    Init {
        /// Target lock
        lock: LockId,
    },
    /// `lock(lock)`
    Lock {
        /// Target lock
        lock: LockId,
    },
    /// `unlock(lock)`
    Unlock {
        /// Target lock
        lock: LockId,
    },
    /// `enter_read()`
    EnterRead,
    /// `exit_read()`
    ExitRead,
    /// `dereference(slot)`
    Dereference {
        /// Target slot
        slot: SlotId,
    },
    /// `write_lock(slot)`
    WriteLock {
        /// Target slot
        slot: SlotId,
    },
    /// `write_unlock(slot)`
    WriteUnlock {
        /// Target slot
        slot: SlotId,
    },
    /// `assign_pointer(slot, value)`
    AssignPointer {
        /// Target slot
        slot: SlotId,
        /// Value to publish
        value: PtrValue,
    },
    /// Plain store bypassing `assign_pointer`
    RawStore {
        /// Target slot
        slot: SlotId,
        /// Value stored
        value: PtrValue,
    },
    /// `synchronize_grace_period(slot)`, every slot when `slot` is absent
    Synchronize {
        /// Target slot
        #[serde(default, skip_serializing_if = "Option::is_none")]
        slot: Option<SlotId>,
    },
    /// `reclaim(slot, value)`
    Reclaim {
        /// Target slot
        slot: SlotId,
        /// Value freed
        value: PtrValue,
    },
    /// `check_all_released()`
    CheckAllReleased,
    /// `check_read_sections_closed()`
    CheckReadSectionsClosed,
}

impl Step {
    /// Run this step as `thread`
    ///
    /// Checkpoint steps return `Ok` even when they append findings; those
    /// findings are still in the model's log.
    pub fn apply<B: LockBackend>(
        &self,
        model: &mut SyncModel<B>,
        thread: ThreadId,
    ) -> Result<(), ViolationReport> {
        match *self {
            Step::Init { lock } => model.init(thread, lock),
            Step::Lock { lock } => model.lock(thread, lock),
            Step::Unlock { lock } => model.unlock(thread, lock),
            Step::EnterRead => model.enter_read(thread).map(drop),
            Step::ExitRead => model.exit_read(thread).map(drop),
            Step::Dereference { slot } => model.dereference(thread, slot).map(drop),
            Step::WriteLock { slot } => model.write_lock(thread, slot),
            Step::WriteUnlock { slot } => model.write_unlock(thread, slot),
            Step::AssignPointer { slot, value } => model.assign_pointer(thread, slot, value).map(drop),
            Step::RawStore { slot, value } => model.raw_store(thread, slot, value).map(drop),
            Step::Synchronize { slot: Some(slot) } => model.synchronize_grace_period(thread, slot),
            Step::Synchronize { slot: None } => model.synchronize_all(thread),
            Step::Reclaim { slot, value } => model.reclaim(thread, slot, value),
            Step::CheckAllReleased => {
                model.check_all_released();
                Ok(())
            }
            Step::CheckReadSectionsClosed => {
                model.check_read_sections_closed();
                Ok(())
            }
        }
    }
}

/// Ordered steps of one thread
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThreadBody {
    /// Display name (`main`, `reader`, `writer1`, ...)
    pub name: String,
    /// Calls in program order
    pub steps: Vec<Step>,
}

impl ThreadBody {
    /// Named body
    pub fn new(name: impl Into<String>, steps: Vec<Step>) -> Self {
        Self {
            name: name.into(),
            steps,
        }
    }
}

/// How thread bodies are interleaved
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Schedule {
    /// Each thread to completion, in thread order
    #[default]
    Sequential,
    /// One step per thread in turn until all are done
    RoundRobin,
    /// Thread index per step; remaining steps follow sequentially
    Explicit(Vec<usize>),
}

impl Schedule {
    /// `(thread index, step index)` pairs in execution order
    pub fn order(&self, threads: &[ThreadBody]) -> Result<Vec<(usize, usize)>, ModelError> {
        let total: usize = threads.iter().map(|t| t.steps.len()).sum();
        let mut order = Vec::with_capacity(total);
        let mut cursor = vec![0usize; threads.len()];

        match self {
            Schedule::Sequential => {}
            Schedule::RoundRobin => {
                while order.len() < total {
                    for (index, body) in threads.iter().enumerate() {
                        if cursor[index] < body.steps.len() {
                            order.push((index, cursor[index]));
                            cursor[index] += 1;
                        }
                    }
                }
            }
            Schedule::Explicit(picks) => {
                for (position, &thread) in picks.iter().enumerate() {
                    let remaining = threads
                        .get(thread)
                        .is_some_and(|body| cursor[thread] < body.steps.len());
                    if !remaining {
                        return Err(ModelError::InvalidSchedule { position, thread });
                    }
                    order.push((thread, cursor[thread]));
                    cursor[thread] += 1;
                }
            }
        }

        for (index, body) in threads.iter().enumerate() {
            order.extend((cursor[index]..body.steps.len()).map(|step| (index, step)));
        }
        Ok(order)
    }
}

/// Slot declaration of a scenario
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlotDecl {
    /// Slot identity
    pub slot: SlotId,
    /// Update lock, the slot's own when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub update_lock: Option<LockId>,
    /// Initially published value
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub initial: Option<PtrValue>,
}

/// A labelled path with its expected verdict
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scenario {
    /// Scenario name
    pub name: String,
    /// Verdict the path must produce
    #[serde(default)]
    pub expected: Verdict,
    /// Model configuration, defaults when absent
    #[serde(default)]
    pub config: ModelConfig,
    /// Locks declared before any thread runs
    #[serde(default)]
    pub locks: Vec<LockId>,
    /// Slots declared before any thread runs
    #[serde(default)]
    pub slots: Vec<SlotDecl>,
    /// Thread bodies; body `i` runs as `ThreadId(i)`
    pub threads: Vec<ThreadBody>,
    /// Interleaving
    #[serde(default)]
    pub schedule: Schedule,
}

/// Result of replaying a scenario
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReplayOutcome {
    /// Scenario name
    pub name: String,
    /// Verdict the path produced
    pub verdict: Verdict,
    /// Verdict the scenario expected
    pub expected: Verdict,
    /// Every finding, in path order
    pub findings: Vec<ViolationReport>,
    /// Number of steps executed
    pub steps: usize,
}

impl ReplayOutcome {
    /// Whether the path produced the expected verdict
    #[inline(always)]
    pub fn matched(&self) -> bool {
        self.verdict == self.expected
    }
}

impl Scenario {
    /// Start building a scenario
    pub fn builder(name: impl Into<String>) -> ScenarioBuilder {
        ScenarioBuilder::new(name)
    }

    /// Total number of steps across all threads
    pub fn step_count(&self) -> usize {
        self.threads.iter().map(|t| t.steps.len()).sum()
    }

    /// Replay against a fresh model over backend `B`
    ///
    /// # Errors
    /// `ModelError` when declarations do not fit the backend or the explicit
    /// schedule is invalid. Discipline violations are findings, not errors.
    pub fn replay<B: LockBackend>(&self) -> Result<ReplayOutcome, ModelError> {
        let order = self.schedule.order(&self.threads)?;
        let mut model: SyncModel<B> = SyncModel::with_config(self.config.clone());

        for lock in &self.locks {
            model.declare_lock(*lock)?;
        }
        for decl in &self.slots {
            model.declare_slot(decl.slot, decl.update_lock, decl.initial)?;
        }

        tracing::debug!(scenario = %self.name, steps = order.len(), "replaying");
        for &(thread, step) in &order {
            let _ = self.threads[thread].steps[step].apply(&mut model, ThreadId::new(thread));
        }
        model.finish();

        let outcome = ReplayOutcome {
            name: self.name.clone(),
            verdict: model.verdict(),
            expected: self.expected,
            findings: model.findings().to_vec(),
            steps: order.len(),
        };

        if outcome.matched() {
            tracing::info!(scenario = %self.name, verdict = %outcome.verdict, "scenario matched");
        } else {
            tracing::warn!(
                scenario = %self.name,
                verdict = %outcome.verdict,
                expected = %outcome.expected,
                "scenario mismatch"
            );
        }
        Ok(outcome)
    }
}

/// Fluent construction of a [`Scenario`]
///
/// # Example
///
/// ```rust
/// use rcusync_model::domain::lock::ProductionBackend;
/// use rcusync_model::domain::scenario::{Scenario, Step};
/// use rcusync_model::domain::{LockId, Verdict, ViolationKind};
///
/// let m = LockId::mutex(0);
/// let scenario = Scenario::builder("double_lock")
///     .expect(Verdict::Violation(ViolationKind::DoubleLock))
///     .lock(m)
///     .thread("main", vec![Step::Lock { lock: m }, Step::Lock { lock: m }])
///     .build();
///
/// let outcome = scenario.replay::<ProductionBackend>().unwrap();
/// assert!(outcome.matched());
/// ```
#[derive(Debug, Clone)]
pub struct ScenarioBuilder {
    scenario: Scenario,
}

impl ScenarioBuilder {
    fn new(name: impl Into<String>) -> Self {
        Self {
            scenario: Scenario {
                name: name.into(),
                expected: Verdict::Clean,
                config: ModelConfig::default(),
                locks: Vec::new(),
                slots: Vec::new(),
                threads: Vec::new(),
                schedule: Schedule::Sequential,
            },
        }
    }

    /// Expected verdict
    pub fn expect(mut self, verdict: Verdict) -> Self {
        self.scenario.expected = verdict;
        self
    }

    /// Model configuration
    pub fn config(mut self, config: ModelConfig) -> Self {
        self.scenario.config = config;
        self
    }

    /// Declare a lock
    pub fn lock(mut self, lock: LockId) -> Self {
        self.scenario.locks.push(lock);
        self
    }

    /// Declare a slot with its own update lock
    pub fn slot(self, slot: SlotId, initial: Option<PtrValue>) -> Self {
        self.slot_guarded_by(slot, None, initial)
    }

    /// Declare a slot with an explicit update lock
    pub fn slot_guarded_by(
        mut self,
        slot: SlotId,
        update_lock: Option<LockId>,
        initial: Option<PtrValue>,
    ) -> Self {
        self.scenario.slots.push(SlotDecl {
            slot,
            update_lock,
            initial,
        });
        self
    }

    /// Add a thread body; the n-th call becomes `ThreadId(n)`
    pub fn thread(mut self, name: impl Into<String>, steps: Vec<Step>) -> Self {
        self.scenario.threads.push(ThreadBody::new(name, steps));
        self
    }

    /// Interleaving
    pub fn schedule(mut self, schedule: Schedule) -> Self {
        self.scenario.schedule = schedule;
        self
    }

    /// Finish
    pub fn build(self) -> Scenario {
        self.scenario
    }
}
