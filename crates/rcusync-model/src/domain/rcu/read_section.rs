//! Read-Side Sections - Per-Thread Nesting Depth
//!
//! `enter_read` / `exit_read` bracket a read-side critical section. Sections
//! nest, so each thread carries a depth; a thread is "inside" while its depth
//! is positive. Depth never goes negative: an unmatched exit is reported and
//! the depth stays 0.

use crate::domain::report::{FindingLog, Operand, ViolationKind, ViolationReport};
use crate::domain::types::ThreadId;

/// Read-side nesting depth of every thread that ever entered a section
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadSections {
    depths: Vec<(ThreadId, u32)>,
    max_depth: u32,
}

impl ReadSections {
    /// Empty table with a nesting limit
    pub fn new(max_depth: u32) -> Self {
        Self {
            depths: Vec::new(),
            max_depth,
        }
    }

    /// Configured nesting limit
    #[inline(always)]
    pub fn max_depth(&self) -> u32 {
        self.max_depth
    }

    /// Current depth of `thread` (0 when never entered)
    pub fn depth(&self, thread: ThreadId) -> u32 {
        self.depths
            .iter()
            .find(|(t, _)| *t == thread)
            .map_or(0, |(_, d)| *d)
    }

    /// Whether `thread` is inside a read-side section
    #[inline(always)]
    pub fn is_inside(&self, thread: ThreadId) -> bool {
        self.depth(thread) > 0
    }

    fn depth_mut(&mut self, thread: ThreadId) -> &mut u32 {
        let index = match self.depths.iter().position(|(t, _)| *t == thread) {
            Some(index) => index,
            None => {
                self.depths.push((thread, 0));
                self.depths.len() - 1
            }
        };
        &mut self.depths[index].1
    }

    /// Open a (possibly nested) section
    ///
    /// Returns the new depth. Past `max_depth` the depth is left unchanged
    /// and `ReadNestingOverflow` is reported.
    pub fn enter(&mut self, thread: ThreadId, log: &mut FindingLog) -> Result<u32, ViolationReport> {
        let mark = log.mark();
        let max = self.max_depth;
        let depth = self.depth_mut(thread);

        if *depth >= max {
            let at = *depth;
            log.report(
                ViolationReport::new(ViolationKind::ReadNestingOverflow, Operand::Thread(thread))
                    .by(thread)
                    .with_detail(format!("depth {} at limit {}", at, max)),
            );
        } else {
            *depth += 1;
        }

        let depth = *depth;
        tracing::trace!(%thread, depth, "enter_read");
        log.outcome(mark, depth)
    }

    /// Close the innermost section
    ///
    /// Returns the new depth. At depth 0 `UnbalancedReadUnlock` is reported.
    pub fn exit(&mut self, thread: ThreadId, log: &mut FindingLog) -> Result<u32, ViolationReport> {
        let mark = log.mark();
        let depth = self.depth_mut(thread);

        if *depth == 0 {
            log.report(
                ViolationReport::new(ViolationKind::UnbalancedReadUnlock, Operand::Thread(thread))
                    .by(thread),
            );
        } else {
            *depth -= 1;
        }

        let depth = *depth;
        tracing::trace!(%thread, depth, "exit_read");
        log.outcome(mark, depth)
    }

    /// Threads with an open section, in ascending id order
    pub fn open(&self) -> Vec<(ThreadId, u32)> {
        let mut open: Vec<(ThreadId, u32)> =
            self.depths.iter().copied().filter(|(_, d)| *d > 0).collect();
        open.sort_unstable();
        open
    }

    /// Checkpoint: true iff every depth is 0
    ///
    /// Appends one `ReadSectionLeak` per thread still inside.
    pub fn check_closed(&self, log: &mut FindingLog) -> bool {
        let open = self.open();
        for (thread, depth) in &open {
            log.report(
                ViolationReport::new(ViolationKind::ReadSectionLeak, Operand::Thread(*thread))
                    .by(*thread)
                    .with_detail(format!("depth {}", depth)),
            );
        }
        open.is_empty()
    }

    /// Forget every thread
    pub fn clear(&mut self) {
        self.depths.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const T0: ThreadId = ThreadId::new(0);
    const T1: ThreadId = ThreadId::new(1);

    #[test]
    fn test_nesting() {
        let mut reads = ReadSections::new(8);
        let mut log = FindingLog::new();

        assert_eq!(reads.enter(T0, &mut log), Ok(1));
        assert_eq!(reads.enter(T0, &mut log), Ok(2));
        assert!(reads.is_inside(T0));
        assert!(!reads.is_inside(T1));

        assert_eq!(reads.exit(T0, &mut log), Ok(1));
        assert_eq!(reads.exit(T0, &mut log), Ok(0));
        assert!(reads.check_closed(&mut log));
        assert!(log.is_clean());
    }

    #[test]
    fn test_unbalanced_exit() {
        let mut reads = ReadSections::new(8);
        let mut log = FindingLog::new();

        let err = reads.exit(T1, &mut log).unwrap_err();
        assert_eq!(err.kind, ViolationKind::UnbalancedReadUnlock);
        assert_eq!(reads.depth(T1), 0);
    }

    #[test]
    fn test_overflow_keeps_depth() {
        let mut reads = ReadSections::new(2);
        let mut log = FindingLog::new();
        reads.enter(T0, &mut log).unwrap();
        reads.enter(T0, &mut log).unwrap();

        let err = reads.enter(T0, &mut log).unwrap_err();
        assert_eq!(err.kind, ViolationKind::ReadNestingOverflow);
        assert_eq!(reads.depth(T0), 2);
    }

    #[test]
    fn test_leaks_reported_per_thread() {
        let mut reads = ReadSections::new(8);
        let mut log = FindingLog::new();
        reads.enter(T1, &mut log).unwrap();
        reads.enter(T0, &mut log).unwrap();
        reads.enter(T0, &mut log).unwrap();

        assert!(!reads.check_closed(&mut log));
        assert_eq!(log.count(ViolationKind::ReadSectionLeak), 2);
        assert_eq!(log.first().unwrap().thread, Some(T0));
        assert_eq!(reads.open(), vec![(T0, 2), (T1, 1)]);
    }
}
