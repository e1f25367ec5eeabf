//! Deferred work queue.
//!
//! Plugins schedule tasks here instead of doing expensive work inside a
//! transaction. The host drains the queue with `Editor::run_deferred` on
//! the same thread, in FIFO order.

use std::collections::VecDeque;

use smol_str::SmolStr;

/// A task addressed to a plugin by name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Deferred {
    pub plugin: SmolStr,
    pub task: SmolStr,
    /// Document version when the task was scheduled.
    pub scheduled_version: u64,
    /// Drop the task if the document changed in the meantime.
    pub discard_if_stale: bool,
}

impl Deferred {
    pub fn is_stale(&self, version: u64) -> bool {
        self.discard_if_stale && self.scheduled_version != version
    }
}

#[derive(Debug, Default)]
pub struct Scheduler {
    queue: VecDeque<Deferred>,
    version: u64,
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Document version new tasks are stamped with.
    pub(crate) fn set_version(&mut self, version: u64) {
        self.version = version;
    }

    pub fn schedule(&mut self, plugin: impl Into<SmolStr>, task: impl Into<SmolStr>) {
        self.push(plugin.into(), task.into(), false);
    }

    /// Schedule a task that only makes sense for the current document.
    pub fn schedule_for_current(&mut self, plugin: impl Into<SmolStr>, task: impl Into<SmolStr>) {
        self.push(plugin.into(), task.into(), true);
    }

    fn push(&mut self, plugin: SmolStr, task: SmolStr, discard_if_stale: bool) {
        tracing::trace!(target: "quire::editor", %plugin, %task, discard_if_stale, "scheduled");
        self.queue.push_back(Deferred {
            plugin,
            task,
            scheduled_version: self.version,
            discard_if_stale,
        });
    }

    pub fn pop(&mut self) -> Option<Deferred> {
        self.queue.pop_front()
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fifo_order_and_staleness() {
        let mut scheduler = Scheduler::new();
        scheduler.schedule("a", "first");
        scheduler.schedule_for_current("b", "second");
        scheduler.set_version(3);
        scheduler.schedule_for_current("c", "third");

        let first = scheduler.pop().unwrap();
        assert_eq!(first.task, "first");
        assert!(!first.is_stale(3));
        let second = scheduler.pop().unwrap();
        assert!(second.is_stale(3));
        let third = scheduler.pop().unwrap();
        assert!(!third.is_stale(3));
        assert!(scheduler.is_empty());
    }
}
