//! Instrumentation Hook Table
//!
//! # Overview
//!
//! The analyzed program calls synchronization primitives by name. The hook
//! table maps those names onto model operations:
//!
//! | Function | Hook |
//! |----------|------|
//! | `pthread_mutex_init`, `mutex_init`, `ldv_mutex_model_init` | `Init` |
//! | `pthread_mutex_lock`, `mutex_lock`, `ldv_mutex_model_lock` | `Lock` |
//! | `pthread_mutex_unlock`, `mutex_unlock`, `ldv_mutex_model_unlock` | `Unlock` |
//! | *contains* `ldv_rcu_read_lock` | `EnterRead` |
//! | *contains* `ldv_rcu_read_unlock` | `ExitRead` |
//! | `ldv_rcu_dereference` | `Dereference` |
//! | `ldv_wlock_rcu` | `WriteLock` |
//! | `ldv_wunlock_rcu` | `WriteUnlock` |
//! | `ldv_rcu_assign_pointer` | `AssignPointer` |
//! | `ldv_synchronize_rcu` | `Synchronize` |
//! | `ldv_free` | `Reclaim` |
//! | `ldv_rlock_rcu`, `ldv_runlock_rcu` | `Marker` |
//! | `check_final_state`, `ldv_check_final_state` | `CheckFinalState` |
//!
//! Exact names are looked up first, then the *contains* patterns in order.
//! Read-side wrappers are matched by substring because kernel code wraps
//! `rcu_read_lock` in many helpers (`ldv_rcu_read_lock_bh`, ...).

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Model operation an instrumented call maps to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HookKind {
    /// `init(lock)`
    Init,
    /// `lock(lock)`
    Lock,
    /// `unlock(lock)`
    Unlock,
    /// `enter_read()`
    EnterRead,
    /// `exit_read()`
    ExitRead,
    /// `dereference(slot)`
    Dereference,
    /// `write_lock([slot])`
    WriteLock,
    /// `write_unlock([slot])`
    WriteUnlock,
    /// `assign_pointer(slot, value)`
    AssignPointer,
    /// `synchronize_grace_period([slot])`
    Synchronize,
    /// `reclaim(value)`
    Reclaim,
    /// Marker call with no model effect (fictional reader locks used by
    /// the data-race analysis)
    Marker,
    /// Run the end-of-program checkpoints
    CheckFinalState,
}

impl HookKind {
    /// Minimum number of call arguments the hook reads
    pub const fn min_args(self) -> usize {
        match self {
            Self::Init | Self::Lock | Self::Unlock | Self::Dereference | Self::Reclaim => 1,
            Self::AssignPointer => 2,
            Self::EnterRead
            | Self::ExitRead
            | Self::WriteLock
            | Self::WriteUnlock
            | Self::Synchronize
            | Self::Marker
            | Self::CheckFinalState => 0,
        }
    }
}

impl fmt::Display for HookKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Init => "init",
            Self::Lock => "lock",
            Self::Unlock => "unlock",
            Self::EnterRead => "enter_read",
            Self::ExitRead => "exit_read",
            Self::Dereference => "dereference",
            Self::WriteLock => "write_lock",
            Self::WriteUnlock => "write_unlock",
            Self::AssignPointer => "assign_pointer",
            Self::Synchronize => "synchronize_grace_period",
            Self::Reclaim => "reclaim",
            Self::Marker => "marker",
            Self::CheckFinalState => "check_final_state",
        };
        f.write_str(name)
    }
}

/// How a table entry matches a function name
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchMode {
    /// Name equals the entry
    Exact,
    /// Name contains the entry
    Contains,
}

/// Configured additions to the default table
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HookOverrides {
    /// Exact names to add or remap
    pub functions: BTreeMap<String, HookKind>,
    /// Replacement for the `ldv_rcu_read_lock` pattern
    pub read_lock: Option<String>,
    /// Replacement for the `ldv_rcu_read_unlock` pattern
    pub read_unlock: Option<String>,
    /// Default names to drop
    pub disable: Vec<String>,
}

impl HookOverrides {
    /// Whether nothing is overridden
    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
            && self.read_lock.is_none()
            && self.read_unlock.is_none()
            && self.disable.is_empty()
    }
}

/// One row of the effective table
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HookEntry {
    /// Function name or substring
    pub function: String,
    /// How `function` is matched
    pub mode: MatchMode,
    /// Operation it maps to
    pub hook: HookKind,
}

/// Function name → model operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HookTable {
    exact: BTreeMap<String, HookKind>,
    patterns: Vec<(String, HookKind)>,
}

const DEFAULT_EXACT: &[(&str, HookKind)] = &[
    ("pthread_mutex_init", HookKind::Init),
    ("mutex_init", HookKind::Init),
    ("ldv_mutex_model_init", HookKind::Init),
    ("pthread_mutex_lock", HookKind::Lock),
    ("mutex_lock", HookKind::Lock),
    ("ldv_mutex_model_lock", HookKind::Lock),
    ("pthread_mutex_unlock", HookKind::Unlock),
    ("mutex_unlock", HookKind::Unlock),
    ("ldv_mutex_model_unlock", HookKind::Unlock),
    ("ldv_rcu_dereference", HookKind::Dereference),
    ("ldv_wlock_rcu", HookKind::WriteLock),
    ("ldv_wunlock_rcu", HookKind::WriteUnlock),
    ("ldv_rcu_assign_pointer", HookKind::AssignPointer),
    ("ldv_synchronize_rcu", HookKind::Synchronize),
    ("ldv_free", HookKind::Reclaim),
    ("ldv_rlock_rcu", HookKind::Marker),
    ("ldv_runlock_rcu", HookKind::Marker),
    ("check_final_state", HookKind::CheckFinalState),
    ("ldv_check_final_state", HookKind::CheckFinalState),
];

/// Default read-side lock pattern
pub const READ_LOCK_PATTERN: &str = "ldv_rcu_read_lock";
/// Default read-side unlock pattern
pub const READ_UNLOCK_PATTERN: &str = "ldv_rcu_read_unlock";

impl HookTable {
    /// Table with no entries
    pub fn empty() -> Self {
        Self {
            exact: BTreeMap::new(),
            patterns: Vec::new(),
        }
    }

    /// The built-in table
    pub fn defaults() -> Self {
        let mut table = Self::empty();
        for (name, hook) in DEFAULT_EXACT {
            table.insert(*name, *hook);
        }
        table.insert_pattern(READ_LOCK_PATTERN, HookKind::EnterRead);
        table.insert_pattern(READ_UNLOCK_PATTERN, HookKind::ExitRead);
        table
    }

    /// Defaults with `overrides` applied
    pub fn with_overrides(overrides: &HookOverrides) -> Self {
        let mut table = Self::defaults();
        table.apply(overrides);
        table
    }

    /// Apply configured overrides on top of the current entries
    pub fn apply(&mut self, overrides: &HookOverrides) {
        for name in &overrides.disable {
            if self.exact.remove(name).is_none() {
                self.patterns.retain(|(pattern, _)| pattern != name);
            }
        }
        if let Some(pattern) = &overrides.read_lock {
            self.replace_pattern(HookKind::EnterRead, pattern);
        }
        if let Some(pattern) = &overrides.read_unlock {
            self.replace_pattern(HookKind::ExitRead, pattern);
        }
        for (name, hook) in &overrides.functions {
            self.insert(name.clone(), *hook);
        }
    }

    /// Map `function` exactly to `hook`
    pub fn insert(&mut self, function: impl Into<String>, hook: HookKind) -> Option<HookKind> {
        self.exact.insert(function.into(), hook)
    }

    /// Map every function containing `pattern` to `hook`
    pub fn insert_pattern(&mut self, pattern: impl Into<String>, hook: HookKind) {
        self.patterns.push((pattern.into(), hook));
    }

    fn replace_pattern(&mut self, hook: HookKind, pattern: &str) {
        match self.patterns.iter_mut().find(|(_, h)| *h == hook) {
            Some(entry) => entry.0 = pattern.to_string(),
            None => self.insert_pattern(pattern, hook),
        }
    }

    /// Drop an exact mapping
    pub fn remove(&mut self, function: &str) -> Option<HookKind> {
        self.exact.remove(function)
    }

    /// Hook for `function`, if instrumented
    pub fn resolve(&self, function: &str) -> Option<HookKind> {
        if let Some(hook) = self.exact.get(function) {
            return Some(*hook);
        }
        self.patterns
            .iter()
            .find(|(pattern, _)| function.contains(pattern.as_str()))
            .map(|(_, hook)| *hook)
    }

    /// Effective entries: exact names sorted, then patterns in match order
    pub fn entries(&self) -> Vec<HookEntry> {
        let exact = self.exact.iter().map(|(name, hook)| HookEntry {
            function: name.clone(),
            mode: MatchMode::Exact,
            hook: *hook,
        });
        let patterns = self.patterns.iter().map(|(pattern, hook)| HookEntry {
            function: pattern.clone(),
            mode: MatchMode::Contains,
            hook: *hook,
        });
        exact.chain(patterns).collect()
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.exact.len() + self.patterns.len()
    }

    /// Whether the table has no entries
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for HookTable {
    fn default() -> Self {
        Self::defaults()
    }
}
