//! Violation Reporting - Findings as Data
//!
//! # Overview
//!
//! A discipline violation is never a crash. Every hook that detects one
//! builds a [`ViolationReport`] (kind + operand + broken rule), appends it to
//! the model's [`FindingLog`], and hands the first report of the call back to
//! the caller as the `Err` side of its `Result`. The model state has already
//! moved to the successor state the real program would reach, so the caller
//! can keep replaying the path.
//!
//! # Report Flow
//!
//! ```text
//! hook(thread, operand)
//!   ├─ mark = log.mark()
//!   ├─ ... rule check fails ...
//!   │    └─ log.report(ViolationReport::new(kind, operand))
//!   └─ log.outcome(mark, value)
//!        ├─ no report since mark → Ok(value)
//!        └─ otherwise            → Err(first report since mark)
//! ```
//!
//! The verifier surfaces the first violation on a path; [`FindingLog::verdict`]
//! gives exactly that.

use super::types::{LockId, SlotId, ThreadId};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of discipline violation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ViolationKind {
    /// `init` on a lock that is currently held
    DoubleInit,
    /// `lock` on a lock that is already held
    DoubleLock,
    /// `unlock` on a lock that is not held
    UnlockWithoutLock,
    /// A lock still held at a release checkpoint
    LeakedLock,
    /// Protected pointer read with read-side nesting depth 0
    DereferenceOutsideReadSection,
    /// Pointer published without holding the update-side lock
    UnprotectedPublish,
    /// Superseded value freed before a grace period elapsed
    PrematureReclaim,
    /// Superseded value freed twice
    DoubleReclaim,
    /// Grace period requested from inside a read-side section
    GracePeriodInReadSection,
    /// `exit_read` with nesting depth 0
    UnbalancedReadUnlock,
    /// A read-side section still open at a checkpoint
    ReadSectionLeak,
    /// Read-side nesting deeper than the configured limit
    ReadNestingOverflow,
    /// Hook on a lock or slot that was never declared
    UndeclaredOperand,
}

impl ViolationKind {
    /// Every kind, in declaration order
    pub const ALL: [ViolationKind; 13] = [
        ViolationKind::DoubleInit,
        ViolationKind::DoubleLock,
        ViolationKind::UnlockWithoutLock,
        ViolationKind::LeakedLock,
        ViolationKind::DereferenceOutsideReadSection,
        ViolationKind::UnprotectedPublish,
        ViolationKind::PrematureReclaim,
        ViolationKind::DoubleReclaim,
        ViolationKind::GracePeriodInReadSection,
        ViolationKind::UnbalancedReadUnlock,
        ViolationKind::ReadSectionLeak,
        ViolationKind::ReadNestingOverflow,
        ViolationKind::UndeclaredOperand,
    ];

    /// The rule a report of this kind says was broken
    pub const fn rule(self) -> &'static str {
        match self {
            Self::DoubleInit => "a lock may only be (re)initialized while unlocked",
            Self::DoubleLock => "a lock must be released before it is acquired again",
            Self::UnlockWithoutLock => "only a held lock may be released",
            Self::LeakedLock => "every lock must be released at a release checkpoint",
            Self::DereferenceOutsideReadSection => {
                "a protected pointer may only be dereferenced inside a read-side critical section"
            }
            Self::UnprotectedPublish => {
                "a protected pointer may only be published through assign_pointer under its update-side lock"
            }
            Self::PrematureReclaim => {
                "a superseded value may only be reclaimed after a subsequent grace period"
            }
            Self::DoubleReclaim => "a superseded value may only be reclaimed once",
            Self::GracePeriodInReadSection => {
                "a grace period cannot be awaited from inside a read-side critical section"
            }
            Self::UnbalancedReadUnlock => "every read-side exit must match an earlier enter",
            Self::ReadSectionLeak => "every read-side section must be closed at a checkpoint",
            Self::ReadNestingOverflow => "read-side nesting exceeded the configured depth",
            Self::UndeclaredOperand => "locks and slots must be declared before first use",
        }
    }

    /// Whether the kind belongs to the lock-state tracker
    #[inline(always)]
    pub const fn is_lock_discipline(self) -> bool {
        matches!(
            self,
            Self::DoubleInit | Self::DoubleLock | Self::UnlockWithoutLock | Self::LeakedLock
        )
    }

    /// Whether the kind belongs to the RCU protocol model
    #[inline(always)]
    pub const fn is_rcu_protocol(self) -> bool {
        !self.is_lock_discipline() && !matches!(self, Self::UndeclaredOperand)
    }
}

impl fmt::Display for ViolationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// What a report is about
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Operand {
    /// A lock handle
    Lock(LockId),
    /// A protected slot
    Slot(SlotId),
    /// A thread (read-side nesting state)
    Thread(ThreadId),
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Lock(lock) => write!(f, "{}", lock),
            Self::Slot(slot) => write!(f, "{}", slot),
            Self::Thread(thread) => write!(f, "{}", thread),
        }
    }
}

/// A single finding
///
/// Read-only for consumers. `seq` is assigned by the [`FindingLog`] when the
/// report is recorded and orders findings along the replayed path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, thiserror::Error)]
#[error("{kind} on {operand}: {rule}")]
pub struct ViolationReport {
    /// Which rule family was broken
    pub kind: ViolationKind,
    /// The lock, slot or thread involved
    pub operand: Operand,
    /// Thread performing the offending operation, if any
    ///
    /// Checkpoint findings (`LeakedLock`, `ReadSectionLeak`) carry the
    /// holder / owning thread instead.
    pub thread: Option<ThreadId>,
    /// Human-readable statement of the rule
    pub rule: &'static str,
    /// Extra context (values, generations)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    /// Position in the findings log
    pub seq: u64,
}

impl ViolationReport {
    /// Build an unrecorded report
    pub fn new(kind: ViolationKind, operand: Operand) -> Self {
        Self {
            kind,
            operand,
            thread: None,
            rule: kind.rule(),
            detail: None,
            seq: 0,
        }
    }

    /// Attach the acting thread
    #[must_use]
    pub fn by(mut self, thread: ThreadId) -> Self {
        self.thread = Some(thread);
        self
    }

    /// Attach extra context
    #[must_use]
    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }
}

/// Result of a replayed path
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Verdict {
    /// No finding on the path
    Clean,
    /// The path is violating; carries the kind of the first finding
    Violation(ViolationKind),
}

impl Verdict {
    /// Whether the path is clean
    #[inline(always)]
    pub const fn is_clean(self) -> bool {
        matches!(self, Self::Clean)
    }
}

impl Default for Verdict {
    fn default() -> Self {
        Self::Clean
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Clean => write!(f, "clean"),
            Self::Violation(kind) => write!(f, "violation: {}", kind),
        }
    }
}

/// Ordered, append-only log of findings
#[derive(Debug, Clone, Default)]
pub struct FindingLog {
    reports: Vec<ViolationReport>,
    next_seq: u64,
}

impl FindingLog {
    /// Create an empty log
    pub fn new() -> Self {
        Self::default()
    }

    /// Position to compare against after a hook runs
    #[inline(always)]
    pub fn mark(&self) -> usize {
        self.reports.len()
    }

    /// Record a finding, assigning its sequence number
    pub fn report(&mut self, mut report: ViolationReport) -> &ViolationReport {
        report.seq = self.next_seq;
        self.next_seq += 1;

        tracing::warn!(
            kind = %report.kind,
            operand = %report.operand,
            thread = ?report.thread,
            seq = report.seq,
            detail = report.detail.as_deref().unwrap_or(""),
            "discipline violation"
        );

        self.reports.push(report);
        &self.reports[self.reports.len() - 1]
    }

    /// First finding recorded at or after `mark`
    pub fn first_since(&self, mark: usize) -> Option<&ViolationReport> {
        self.reports.get(mark)
    }

    /// Turn the findings recorded since `mark` into a hook result
    pub fn outcome<T>(&self, mark: usize, value: T) -> Result<T, ViolationReport> {
        match self.first_since(mark) {
            Some(report) => Err(report.clone()),
            None => Ok(value),
        }
    }

    /// First finding on the path
    pub fn first(&self) -> Option<&ViolationReport> {
        self.reports.first()
    }

    /// All findings in order
    pub fn reports(&self) -> &[ViolationReport] {
        &self.reports
    }

    /// Iterate findings in order
    pub fn iter(&self) -> impl Iterator<Item = &ViolationReport> {
        self.reports.iter()
    }

    /// Number of findings
    #[inline(always)]
    pub fn len(&self) -> usize {
        self.reports.len()
    }

    /// Whether no finding was recorded
    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.reports.is_empty()
    }

    /// Alias of [`is_empty`](Self::is_empty) in verdict terms
    #[inline(always)]
    pub fn is_clean(&self) -> bool {
        self.is_empty()
    }

    /// Number of findings of `kind`
    pub fn count(&self, kind: ViolationKind) -> usize {
        self.reports.iter().filter(|r| r.kind == kind).count()
    }

    /// Whether any finding of `kind` was recorded
    pub fn contains(&self, kind: ViolationKind) -> bool {
        self.reports.iter().any(|r| r.kind == kind)
    }

    /// Kinds of all findings in order
    pub fn kinds(&self) -> Vec<ViolationKind> {
        self.reports.iter().map(|r| r.kind).collect()
    }

    /// Verdict of the path: the kind of the first finding, if any
    pub fn verdict(&self) -> Verdict {
        self.first()
            .map_or(Verdict::Clean, |report| Verdict::Violation(report.kind))
    }

    /// Drop all findings
    pub fn clear(&mut self) {
        self.reports.clear();
        self.next_seq = 0;
    }
}
