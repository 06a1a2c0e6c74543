// src/engine/report.rs

use std::time::Duration;

use crate::errors::{Result, SitepipeError};

use super::{NodeState, TaskName};

/// What happened to one plan leaf.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskRecord {
    pub task: TaskName,
    pub state: NodeState,
    /// Set once the leaf reached a terminal state.
    pub elapsed: Option<Duration>,
    pub error: Option<String>,
}

impl TaskRecord {
    pub(crate) fn pending(task: impl Into<TaskName>) -> Self {
        Self {
            task: task.into(),
            state: NodeState::Pending,
            elapsed: None,
            error: None,
        }
    }
}

/// Outcome of executing one plan: a record per leaf, in plan order.
#[derive(Debug, Clone)]
pub struct RunReport {
    pub root: TaskName,
    pub records: Vec<TaskRecord>,
    pub elapsed: Duration,
}

impl RunReport {
    pub fn succeeded(&self) -> bool {
        self.records.iter().all(|r| r.state != NodeState::Failed)
    }

    /// Failed tasks in plan order.
    pub fn failed_tasks(&self) -> Vec<&str> {
        self.records
            .iter()
            .filter(|r| r.state == NodeState::Failed)
            .map(|r| r.task.as_str())
            .collect()
    }

    /// States of every leaf for `task` (a task can appear more than once).
    pub fn states_of(&self, task: &str) -> Vec<NodeState> {
        self.records
            .iter()
            .filter(|r| r.task == task)
            .map(|r| r.state)
            .collect()
    }

    /// State of the first leaf for `task`.
    pub fn state_of(&self, task: &str) -> Option<NodeState> {
        self.records.iter().find(|r| r.task == task).map(|r| r.state)
    }

    /// Err(`ActionFailure`) naming the first failed task.
    pub fn into_result(self) -> Result<RunReport> {
        match self.records.iter().find(|r| r.state == NodeState::Failed) {
            Some(record) => Err(SitepipeError::ActionFailure {
                task: record.task.clone(),
                message: record
                    .error
                    .clone()
                    .unwrap_or_else(|| "unknown error".to_string()),
            }),
            None => Ok(self),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(task: &str, state: NodeState, error: Option<&str>) -> TaskRecord {
        TaskRecord {
            task: task.to_string(),
            state,
            elapsed: None,
            error: error.map(str::to_string),
        }
    }

    #[test]
    fn first_failure_is_attributed() {
        let report = RunReport {
            root: "build".into(),
            records: vec![
                record("clean", NodeState::Succeeded, None),
                record("html", NodeState::Failed, Some("boom")),
                record("copy", NodeState::Failed, Some("bang")),
            ],
            elapsed: Duration::ZERO,
        };

        assert!(!report.succeeded());
        assert_eq!(report.failed_tasks(), vec!["html", "copy"]);
        match report.into_result() {
            Err(SitepipeError::ActionFailure { task, message }) => {
                assert_eq!(task, "html");
                assert_eq!(message, "boom");
            }
            other => panic!("expected action failure, got {other:?}"),
        }
    }

    #[test]
    fn pending_leaves_do_not_count_as_failures() {
        let report = RunReport {
            root: "a".into(),
            records: vec![
                record("a", NodeState::Succeeded, None),
                record("b", NodeState::Pending, None),
            ],
            elapsed: Duration::ZERO,
        };
        assert!(report.succeeded());
        assert_eq!(report.state_of("b"), Some(NodeState::Pending));
    }
}
