//! Per-frame task queue with "latest value wins" coalescing
//!
//! Input such as pinch updates can arrive many times between two animation
//! frames. Processing every one of them is wasted work, and queueing them
//! adds latency. Tasks that implement [`Coalesce`] replace the pending task at
//! the tail of the queue instead of queueing behind it; every other task keeps
//! its arrival order.

use std::collections::VecDeque;
use tracing::trace;

/// Decides whether a newly pushed task supersedes the task queued before it.
pub trait Coalesce {
    /// Returns `true` when `self` should replace `pending` in place.
    fn coalesces_with(&self, pending: &Self) -> bool;
}

/// Ordered queue of tasks waiting for the next animation frame.
///
/// Only the tail is considered for coalescing, so a coalescable task that
/// arrives after a non-coalescable one is never reordered ahead of it.
#[derive(Debug)]
pub struct FrameQueue<T> {
    pending: VecDeque<T>,
    /// Tasks replaced before they ran
    superseded: u64,
}

impl<T: Coalesce> FrameQueue<T> {
    /// Create an empty queue
    pub fn new() -> Self {
        Self { pending: VecDeque::new(), superseded: 0 }
    }

    /// Queue a task for the next frame
    ///
    /// Returns `true` if the task replaced a pending one.
    pub fn push(&mut self, task: T) -> bool {
        if let Some(last) = self.pending.back_mut() {
            if task.coalesces_with(last) {
                *last = task;
                self.superseded += 1;
                trace!(superseded = self.superseded, "coalesced frame task");
                return true;
            }
        }
        self.pending.push_back(task);
        false
    }

    /// Take every pending task in arrival order
    pub fn drain(&mut self) -> Vec<T> {
        self.pending.drain(..).collect()
    }

    /// Drop all pending tasks without running them
    pub fn clear(&mut self) {
        self.pending.clear();
    }

    /// Check whether a frame needs to be scheduled
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Number of pending tasks
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    /// Total number of tasks that were superseded before running
    pub fn superseded_count(&self) -> u64 {
        self.superseded
    }
}

impl<T: Coalesce> Default for FrameQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    enum Task {
        Start,
        Update(u32),
        End,
    }

    impl Coalesce for Task {
        fn coalesces_with(&self, pending: &Self) -> bool {
            matches!((self, pending), (Task::Update(_), Task::Update(_)))
        }
    }

    #[test]
    fn test_latest_update_wins() {
        let mut queue = FrameQueue::new();
        assert!(!queue.push(Task::Update(1)));
        assert!(queue.push(Task::Update(2)));
        assert!(queue.push(Task::Update(3)));

        assert_eq!(queue.len(), 1);
        assert_eq!(queue.superseded_count(), 2);
        assert_eq!(queue.drain(), vec![Task::Update(3)]);
        assert!(queue.is_empty());
    }

    #[test]
    fn test_non_coalescing_tasks_keep_order() {
        let mut queue = FrameQueue::new();
        queue.push(Task::Start);
        queue.push(Task::Update(1));
        queue.push(Task::Update(2));
        queue.push(Task::End);
        queue.push(Task::Update(3));

        assert_eq!(queue.drain(), vec![Task::Start, Task::Update(2), Task::End, Task::Update(3)]);
    }

    #[test]
    fn test_clear_drops_pending() {
        let mut queue = FrameQueue::default();
        queue.push(Task::Start);
        queue.clear();
        assert!(queue.is_empty());
        assert!(queue.drain().is_empty());
    }
}
