//! Work queue for a reconciliation batch.
//!
//! A batch starts with the PRs named on the command line (or every open PR)
//! at depth 0. Observing a fresh merge enqueues the merged PR's open
//! siblings one level deeper, so a cascade fans out but cannot recurse
//! unboundedly: items past the depth cap are dropped with a warning, and a
//! PR already seen in this batch is never enqueued twice.

use std::collections::{BTreeSet, VecDeque};

use tracing::{debug, warn};

use crate::types::PrNumber;

/// A cascade may follow at most this many merge hops within one batch.
pub const MAX_CASCADE_DEPTH: u32 = 2;

/// One unit of work: reconcile a PR, tagged with its cascade depth.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkItem {
    pub pr: PrNumber,
    pub depth: u32,
}

/// FIFO queue with batch-level dedup and a depth cap.
#[derive(Debug, Default)]
pub struct WorkQueue {
    items: VecDeque<WorkItem>,
    seen: BTreeSet<PrNumber>,
}

impl WorkQueue {
    pub fn new() -> Self {
        WorkQueue::default()
    }

    /// Enqueues a PR at the given depth. Returns false if the item was
    /// dropped (already seen this batch, or past the depth cap).
    pub fn push(&mut self, pr: PrNumber, depth: u32) -> bool {
        if depth > MAX_CASCADE_DEPTH {
            warn!(pr = %pr, depth, "cascade depth cap exceeded, dropping");
            return false;
        }
        if !self.seen.insert(pr) {
            debug!(pr = %pr, "already enqueued this batch");
            return false;
        }
        self.items.push_back(WorkItem { pr, depth });
        true
    }

    pub fn pop(&mut self) -> Option<WorkItem> {
        self.items.pop_front()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn pops_in_fifo_order() {
        let mut queue = WorkQueue::new();
        assert!(queue.push(PrNumber(1), 0));
        assert!(queue.push(PrNumber(2), 0));
        assert!(queue.push(PrNumber(3), 1));
        assert_eq!(queue.pop().map(|item| item.pr), Some(PrNumber(1)));
        assert_eq!(queue.pop().map(|item| item.pr), Some(PrNumber(2)));
        assert_eq!(queue.pop().map(|item| item.pr), Some(PrNumber(3)));
        assert_eq!(queue.pop(), None);
    }

    #[test]
    fn duplicate_pr_is_dropped() {
        let mut queue = WorkQueue::new();
        assert!(queue.push(PrNumber(1), 0));
        assert!(!queue.push(PrNumber(1), 1));
        assert_eq!(queue.len(), 1);
    }

    #[test]
    fn dedup_survives_pop() {
        let mut queue = WorkQueue::new();
        assert!(queue.push(PrNumber(1), 0));
        queue.pop();
        assert!(!queue.push(PrNumber(1), 1));
        assert!(queue.is_empty());
    }

    #[test]
    fn depth_cap_is_inclusive() {
        let mut queue = WorkQueue::new();
        assert!(queue.push(PrNumber(1), MAX_CASCADE_DEPTH));
        assert!(!queue.push(PrNumber(2), MAX_CASCADE_DEPTH + 1));
        assert_eq!(queue.len(), 1);
    }

    proptest! {
        #[test]
        fn never_yields_a_pr_twice(
            pushes in prop::collection::vec((0u64..20, 0u32..5), 0..60)
        ) {
            let mut queue = WorkQueue::new();
            for (pr, depth) in pushes {
                queue.push(PrNumber(pr), depth);
            }
            let mut seen = BTreeSet::new();
            while let Some(item) = queue.pop() {
                prop_assert!(seen.insert(item.pr));
                prop_assert!(item.depth <= MAX_CASCADE_DEPTH);
            }
        }

        #[test]
        fn accepted_count_matches_queue_length(
            pushes in prop::collection::vec((0u64..20, 0u32..5), 0..60)
        ) {
            let mut queue = WorkQueue::new();
            let accepted = pushes
                .into_iter()
                .filter(|&(pr, depth)| queue.push(PrNumber(pr), depth))
                .count();
            prop_assert_eq!(queue.len(), accepted);
        }
    }
}
