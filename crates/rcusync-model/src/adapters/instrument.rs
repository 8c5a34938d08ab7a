//! Instrumentation Adapter - Trace Events → Model Hooks
//!
//! # Overview
//!
//! The verifier front-end sees calls by name with symbolic arguments. The
//! [`Instrumenter`] resolves the name through the [`HookTable`], interns the
//! arguments into model identities, and invokes the matching hook:
//!
//! ```text
//! CallEvent { thread: "writer", function: "ldv_rcu_assign_pointer",
//!             args: ["gp", "pWriter"] }
//!   ├─ HookTable::resolve      → HookKind::AssignPointer
//!   ├─ SymbolTable::thread     "writer"  → t2
//!   ├─ SymbolTable::slot       "gp"      → slot#0
//!   ├─ SymbolTable::value      "pWriter" → ptr#3
//!   └─ model.assign_pointer(t2, slot#0, ptr#3)
//! ```
//!
//! # Argument Conventions
//!
//! - Lock arguments may carry the address-of sigil (`"&mutex"`); it is
//!   stripped before interning.
//! - Value arguments (`assign_pointer`'s second, `ldv_free`'s only) name the
//!   pointed-to object, not the variable holding it. The adapter does no
//!   points-to analysis.
//! - `ldv_wlock_rcu()` / `ldv_wunlock_rcu()` take no slot; they apply to the
//!   sole declared slot.
//! - `ldv_synchronize_rcu()` with no argument is a grace period on every slot.
//! - `ldv_free(v)` is tied to the slot that has seen `v`; frees of objects no
//!   slot ever held are not RCU reclamation and are ignored.

use crate::domain::config::ModelConfig;
use crate::domain::hook::{HookKind, HookTable};
use crate::domain::lock::LockBackend;
use crate::domain::model::SyncModel;
use crate::domain::report::{Verdict, ViolationReport};
use crate::domain::types::{LockId, PtrValue, SlotId, ThreadId};
use crate::error::ModelError;
use crate::infrastructure::trace::{CallEvent, StoreEvent, Trace, TraceEvent};
use serde::Serialize;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Symbol Interning
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Symbolic names → numeric identities, in order of first appearance
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SymbolTable {
    threads: Vec<String>,
    locks: Vec<String>,
    slots: Vec<String>,
    values: Vec<String>,
}

fn normalize(name: &str) -> &str {
    name.trim().trim_start_matches('&').trim()
}

fn intern(names: &mut Vec<String>, name: &str) -> usize {
    let name = normalize(name);
    match names.iter().position(|n| n == name) {
        Some(index) => index,
        None => {
            names.push(name.to_string());
            names.len() - 1
        }
    }
}

fn lookup(names: &[String], name: &str) -> Option<usize> {
    let name = normalize(name);
    names.iter().position(|n| n == name)
}

impl SymbolTable {
    /// Empty table
    pub fn new() -> Self {
        Self::default()
    }

    /// Thread id of `name`
    pub fn thread(&mut self, name: &str) -> ThreadId {
        ThreadId::new(intern(&mut self.threads, name))
    }

    /// Lock id of `name` (a program-declared mutex)
    pub fn lock(&mut self, name: &str) -> LockId {
        LockId::mutex(intern(&mut self.locks, name))
    }

    /// Slot id of `name`
    pub fn slot(&mut self, name: &str) -> SlotId {
        SlotId::new(intern(&mut self.slots, name))
    }

    /// Pointer value of `name`
    pub fn value(&mut self, name: &str) -> PtrValue {
        PtrValue::new(intern(&mut self.values, name) as u64)
    }

    /// Slot id of `name` if it was ever interned
    pub fn find_slot(&self, name: &str) -> Option<SlotId> {
        lookup(&self.slots, name).map(SlotId::new)
    }

    /// Name behind a thread id
    pub fn thread_name(&self, thread: ThreadId) -> Option<&str> {
        self.threads.get(thread.as_usize()).map(String::as_str)
    }

    /// Name behind a lock id (`None` for update-side locks)
    pub fn lock_name(&self, lock: LockId) -> Option<&str> {
        match lock {
            LockId::Mutex(index) => self.locks.get(index).map(String::as_str),
            LockId::UpdateSide(_) => None,
        }
    }

    /// Name behind a slot id
    pub fn slot_name(&self, slot: SlotId) -> Option<&str> {
        self.slots.get(slot.as_usize()).map(String::as_str)
    }

    /// Name behind a pointer value
    pub fn value_name(&self, value: PtrValue) -> Option<&str> {
        usize::try_from(value.as_u64())
            .ok()
            .and_then(|index| self.values.get(index))
            .map(String::as_str)
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Dispatch
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// What happened to one event
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dispatch {
    /// A hook ran; `finding` is the first report it raised
    Applied {
        /// Hook that ran
        hook: HookKind,
        /// First finding of the call, if any
        finding: Option<ViolationReport>,
    },
    /// Not a synchronization event
    Ignored,
}

impl Dispatch {
    fn applied(hook: HookKind, result: Result<(), ViolationReport>) -> Self {
        Self::Applied {
            hook,
            finding: result.err(),
        }
    }

    /// Finding raised by the event, if any
    pub fn finding(&self) -> Option<&ViolationReport> {
        match self {
            Self::Applied { finding, .. } => finding.as_ref(),
            Self::Ignored => None,
        }
    }
}

/// Result of replaying a whole trace
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TraceOutcome {
    /// Verdict of the path
    pub verdict: Verdict,
    /// Verdict the trace declared, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expected: Option<Verdict>,
    /// Every finding, in path order
    pub findings: Vec<ViolationReport>,
    /// Events that ran a hook
    pub applied: usize,
    /// Events that were not synchronization calls
    pub ignored: usize,
}

impl TraceOutcome {
    /// Whether the verdict agrees with the declared one (vacuously true)
    pub fn matched(&self) -> bool {
        self.expected.map_or(true, |expected| expected == self.verdict)
    }
}

/// Maps instrumented calls onto a [`SyncModel`]
///
/// # Example
///
/// ```rust
/// use rcusync_model::adapters::Instrumenter;
/// use rcusync_model::domain::{ProductionModel, ViolationKind};
/// use rcusync_model::infrastructure::CallEvent;
///
/// let mut model = ProductionModel::new();
/// let mut inst = Instrumenter::default();
///
/// for call in [
///     CallEvent::new("main", "pthread_mutex_init", &["&mutex"]),
///     CallEvent::new("main", "pthread_mutex_lock", &["&mutex"]),
///     CallEvent::new("main", "pthread_mutex_lock", &["&mutex"]),
/// ] {
///     inst.dispatch_call(&mut model, &call).unwrap();
/// }
/// assert_eq!(model.log().first().unwrap().kind, ViolationKind::DoubleLock);
/// ```
#[derive(Debug, Clone)]
pub struct Instrumenter {
    table: HookTable,
    symbols: SymbolTable,
    final_state_checked: bool,
}

impl Default for Instrumenter {
    fn default() -> Self {
        Self::new(HookTable::defaults())
    }
}

impl Instrumenter {
    /// Adapter over a hook table
    pub fn new(table: HookTable) -> Self {
        Self {
            table,
            symbols: SymbolTable::new(),
            final_state_checked: false,
        }
    }

    /// Adapter over the hook table of `config`
    pub fn from_config(config: &ModelConfig) -> Self {
        Self::new(config.hook_table())
    }

    /// Hook table in use
    pub fn table(&self) -> &HookTable {
        &self.table
    }

    /// Interned names
    pub fn symbols(&self) -> &SymbolTable {
        &self.symbols
    }

    /// Declare the locks and slots a trace names up front
    pub fn prepare<B: LockBackend>(
        &mut self,
        model: &mut SyncModel<B>,
        trace: &Trace,
    ) -> Result<(), ModelError> {
        for name in &trace.locks {
            let lock = self.symbols.lock(name);
            model.declare_lock(lock)?;
        }
        for decl in &trace.slots {
            let slot = self.symbols.slot(&decl.name);
            let update_lock = decl.update_lock.as_deref().map(|n| self.symbols.lock(n));
            let initial = decl.initial.as_deref().map(|n| self.symbols.value(n));
            model.declare_slot(slot, update_lock, initial)?;
        }
        Ok(())
    }

    /// Run one trace event
    pub fn dispatch<B: LockBackend>(
        &mut self,
        model: &mut SyncModel<B>,
        event: &TraceEvent,
    ) -> Result<Dispatch, ModelError> {
        match event {
            TraceEvent::Call(call) => self.dispatch_call(model, call),
            TraceEvent::Store(store) => Ok(self.dispatch_store(model, store)),
        }
    }

    /// Run one call event
    ///
    /// # Errors
    /// `MissingArgument` or `AmbiguousSlot` when the call cannot be mapped
    /// onto its hook.
    pub fn dispatch_call<B: LockBackend>(
        &mut self,
        model: &mut SyncModel<B>,
        call: &CallEvent,
    ) -> Result<Dispatch, ModelError> {
        let Some(hook) = self.table.resolve(&call.function) else {
            tracing::trace!(function = %call.function, "not instrumented");
            return Ok(Dispatch::Ignored);
        };
        if call.args.len() < hook.min_args() {
            return Err(ModelError::MissingArgument {
                function: call.function.clone(),
                index: call.args.len(),
            });
        }

        let thread = self.symbols.thread(&call.thread);
        tracing::trace!(%thread, %hook, event = %call, "dispatch");

        let dispatch = match hook {
            HookKind::Init => {
                let lock = self.symbols.lock(&call.args[0]);
                Dispatch::applied(hook, model.init(thread, lock))
            }
            HookKind::Lock => {
                let lock = self.symbols.lock(&call.args[0]);
                Dispatch::applied(hook, model.lock(thread, lock))
            }
            HookKind::Unlock => {
                let lock = self.symbols.lock(&call.args[0]);
                Dispatch::applied(hook, model.unlock(thread, lock))
            }
            HookKind::EnterRead => Dispatch::applied(hook, model.enter_read(thread).map(drop)),
            HookKind::ExitRead => Dispatch::applied(hook, model.exit_read(thread).map(drop)),
            HookKind::Dereference => {
                let slot = self.symbols.slot(&call.args[0]);
                Dispatch::applied(hook, model.dereference(thread, slot).map(drop))
            }
            HookKind::WriteLock => {
                let slot = self.slot_arg(model, call)?;
                Dispatch::applied(hook, model.write_lock(thread, slot))
            }
            HookKind::WriteUnlock => {
                let slot = self.slot_arg(model, call)?;
                Dispatch::applied(hook, model.write_unlock(thread, slot))
            }
            HookKind::AssignPointer => {
                let slot = self.symbols.slot(&call.args[0]);
                let value = self.symbols.value(&call.args[1]);
                Dispatch::applied(hook, model.assign_pointer(thread, slot, value).map(drop))
            }
            HookKind::Synchronize => match call.args.first() {
                Some(name) => {
                    let slot = self.symbols.slot(name);
                    Dispatch::applied(hook, model.synchronize_grace_period(thread, slot))
                }
                None => Dispatch::applied(hook, model.synchronize_all(thread)),
            },
            HookKind::Reclaim => {
                let value = self.symbols.value(&call.args[0]);
                match model.rcu().slot_of_value(value) {
                    Some(slot) => Dispatch::applied(hook, model.reclaim(thread, slot, value)),
                    None => {
                        tracing::trace!(%thread, value = %call.args[0], "free of unprotected object");
                        Dispatch::Ignored
                    }
                }
            }
            HookKind::Marker => Dispatch::Applied {
                hook,
                finding: None,
            },
            HookKind::CheckFinalState => {
                let mark = model.log().mark();
                model.check_all_released();
                model.check_read_sections_closed();
                self.final_state_checked = true;
                Dispatch::Applied {
                    hook,
                    finding: model.log().first_since(mark).cloned(),
                }
            }
        };
        Ok(dispatch)
    }

    fn dispatch_store<B: LockBackend>(&mut self, model: &mut SyncModel<B>, store: &StoreEvent) -> Dispatch {
        let Some(slot) = self.symbols.find_slot(&store.target) else {
            tracing::trace!(target_name = %store.target, "store to unprotected pointer");
            return Dispatch::Ignored;
        };
        let thread = self.symbols.thread(&store.thread);
        let value = self.symbols.value(&store.value);
        Dispatch::Applied {
            hook: HookKind::AssignPointer,
            finding: model.raw_store(thread, slot, value).err(),
        }
    }

    /// Slot named by the first argument, or the sole declared slot
    fn slot_arg<B: LockBackend>(&mut self, model: &SyncModel<B>, call: &CallEvent) -> Result<SlotId, ModelError> {
        if let Some(name) = call.args.first() {
            return Ok(self.symbols.slot(name));
        }
        match model.rcu().slots() {
            [only] => Ok(only.id()),
            slots => Err(ModelError::AmbiguousSlot {
                function: call.function.clone(),
                declared: slots.len(),
            }),
        }
    }

    /// Declare, dispatch every event, then run the end-of-program checkpoints
    ///
    /// Each replay starts from an empty symbol table. The checkpoints are
    /// skipped when this trace already called `check_final_state`.
    pub fn replay<B: LockBackend>(
        &mut self,
        model: &mut SyncModel<B>,
        trace: &Trace,
    ) -> Result<TraceOutcome, ModelError> {
        self.symbols = SymbolTable::new();
        self.final_state_checked = false;
        self.prepare(model, trace)?;

        let (mut applied, mut ignored) = (0, 0);
        for event in &trace.events {
            match self.dispatch(model, event)? {
                Dispatch::Applied { .. } => applied += 1,
                Dispatch::Ignored => ignored += 1,
            }
        }
        if !self.final_state_checked {
            model.finish();
        }

        let outcome = TraceOutcome {
            verdict: model.verdict(),
            expected: trace.expected,
            findings: model.findings().to_vec(),
            applied,
            ignored,
        };
        tracing::info!(
            verdict = %outcome.verdict,
            findings = outcome.findings.len(),
            applied,
            ignored,
            "trace replayed"
        );
        Ok(outcome)
    }
}
