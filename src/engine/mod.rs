// src/engine/mod.rs

//! Orchestration engine.
//!
//! This module ties together:
//! - the [`executor`], which walks an execution plan (series / parallel)
//! - the [`report`] describing what happened to every leaf
//! - the trigger [`queue`] used while a triggered task is running
//! - the [`session`] that owns the registry and reacts to runtime events:
//!   - file-watch triggers
//!   - watcher registration from the `watch` action
//!   - shutdown requests

use std::fmt;

use crate::watch::WatcherHandle;

/// Canonical task name type used throughout the engine.
pub type TaskName = String;

/// Lifecycle of one plan leaf. No retries, so `Failed` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeState {
    Pending,
    Running,
    Succeeded,
    Failed,
}

impl NodeState {
    pub fn is_terminal(self) -> bool {
        matches!(self, NodeState::Succeeded | NodeState::Failed)
    }
}

impl fmt::Display for NodeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            NodeState::Pending => "pending",
            NodeState::Running => "running",
            NodeState::Succeeded => "succeeded",
            NodeState::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// Why a task was triggered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerReason {
    /// Manual trigger (CLI invocation or tests).
    Manual,
    /// Triggered due to a filesystem event.
    FileWatch,
}

/// Request to run a task inside a watch session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Trigger {
    pub task: TaskName,
    pub reason: TriggerReason,
    /// Notify live-reload clients once the task succeeds.
    pub reload: bool,
}

impl Trigger {
    pub fn manual(task: impl Into<TaskName>) -> Self {
        Self {
            task: task.into(),
            reason: TriggerReason::Manual,
            reload: false,
        }
    }

    pub fn file_watch(task: impl Into<TaskName>, reload: bool) -> Self {
        Self {
            task: task.into(),
            reason: TriggerReason::FileWatch,
            reload,
        }
    }
}

/// Events flowing into the session from watchers, actions and signals.
#[derive(Debug)]
pub enum RuntimeEvent {
    /// A task should be run.
    TaskTriggered(Trigger),
    /// The `watch` action started a watcher; the session keeps it alive.
    WatchStarted(WatcherHandle),
    /// Graceful shutdown requested (e.g. Ctrl-C).
    ShutdownRequested,
}

pub mod executor;
pub mod queue;
pub mod report;
pub mod session;

pub use executor::Executor;
pub use queue::TriggerQueue;
pub use report::{RunReport, TaskRecord};
pub use session::{Session, SessionHandle};
