// src/engine/queue.rs

use std::collections::VecDeque;

use tracing::debug;

use super::Trigger;

/// Triggers that arrived while a triggered task was already running.
///
/// Semantics:
/// - Pending triggers run one at a time, oldest first.
/// - A trigger for a task that is already pending is coalesced into the
///   existing entry; the reload flags are merged (any `true` wins).
/// - On shutdown the session drops whatever is still pending.
#[derive(Debug, Default)]
pub struct TriggerQueue {
    pending: VecDeque<Trigger>,
}

impl TriggerQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    /// Queue a trigger, coalescing it with a pending one for the same task.
    pub fn push(&mut self, trigger: Trigger) {
        if let Some(existing) = self.pending.iter_mut().find(|t| t.task == trigger.task) {
            existing.reload |= trigger.reload;
            debug!(task = %trigger.task, "coalesced trigger into pending entry");
            return;
        }

        debug!(task = %trigger.task, reason = ?trigger.reason, "queued trigger");
        self.pending.push_back(trigger);
    }

    pub fn pop(&mut self) -> Option<Trigger> {
        self.pending.pop_front()
    }

    /// Drop everything pending, returning how many triggers were discarded.
    pub fn clear(&mut self) -> usize {
        let dropped = self.pending.len();
        self.pending.clear();
        dropped
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn coalesces_same_task_and_merges_reload() {
        let mut q = TriggerQueue::new();
        q.push(Trigger::file_watch("html", false));
        q.push(Trigger::file_watch("sass-dev", false));
        q.push(Trigger::file_watch("html", true));

        assert_eq!(q.len(), 2);
        let first = q.pop().unwrap();
        assert_eq!(first.task, "html");
        assert!(first.reload);
        assert_eq!(q.pop().unwrap().task, "sass-dev");
        assert!(q.pop().is_none());
    }

    #[test]
    fn clear_reports_dropped() {
        let mut q = TriggerQueue::new();
        q.push(Trigger::manual("a"));
        q.push(Trigger::manual("b"));
        assert_eq!(q.clear(), 2);
        assert!(q.is_empty());
    }
}
