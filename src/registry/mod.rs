// src/registry/mod.rs

//! Task registry: named tasks and their bodies.
//!
//! The registry is a plain value owned by whoever drives a build (normally
//! the [`crate::engine::Session`]); there is no process-wide instance.

pub mod action;

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use tracing::debug;

use crate::dag::graph::DependencyGraph;
use crate::engine::TaskName;
use crate::errors::{Result, SitepipeError};

pub use action::{action_fn, Action, ActionContext, ActionFuture};

/// Body of a composite task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    /// Run the named task (with its own predecessors).
    Task(TaskName),
    /// Run each step to completion before starting the next.
    Series(Vec<Step>),
    /// Run all steps concurrently; the group completes when all finish.
    Parallel(Vec<Step>),
}

impl Step {
    pub fn task(name: impl Into<TaskName>) -> Self {
        Step::Task(name.into())
    }

    /// Series of plain task names.
    pub fn series<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<TaskName>,
    {
        Step::Series(names.into_iter().map(|n| Step::Task(n.into())).collect())
    }

    /// Parallel group of plain task names.
    pub fn parallel<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<TaskName>,
    {
        Step::Parallel(names.into_iter().map(|n| Step::Task(n.into())).collect())
    }

    /// Task names referenced anywhere in this step.
    pub fn referenced_tasks(&self) -> Vec<&str> {
        match self {
            Step::Task(name) => vec![name.as_str()],
            Step::Series(steps) | Step::Parallel(steps) => {
                steps.iter().flat_map(|s| s.referenced_tasks()).collect()
            }
        }
    }
}

#[derive(Clone)]
pub enum TaskBody {
    Action(Arc<dyn Action>),
    Composite(Step),
}

impl fmt::Debug for TaskBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaskBody::Action(_) => f.write_str("Action(..)"),
            TaskBody::Composite(step) => f.debug_tuple("Composite").field(step).finish(),
        }
    }
}

/// A registered task. Immutable once registered.
#[derive(Debug, Clone)]
pub struct Task {
    pub name: TaskName,
    pub body: TaskBody,
    /// Tasks run, in order, before this task's body.
    pub predecessors: Vec<TaskName>,
    pub description: Option<String>,
}

impl Task {
    pub fn is_composite(&self) -> bool {
        matches!(self.body, TaskBody::Composite(_))
    }
}

/// Owns all tasks known to a build session.
#[derive(Debug, Default)]
pub struct TaskRegistry {
    tasks: BTreeMap<TaskName, Task>,
}

impl TaskRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a task whose body is an action.
    ///
    /// Fails with [`SitepipeError::DuplicateTask`] if `name` is taken; the
    /// existing registration is left untouched.
    pub fn register(
        &mut self,
        name: impl Into<TaskName>,
        action: Arc<dyn Action>,
        predecessors: Vec<TaskName>,
    ) -> Result<()> {
        self.insert(Task {
            name: name.into(),
            body: TaskBody::Action(action),
            predecessors,
            description: None,
        })
    }

    /// Register a task whose body is a series / parallel composition.
    pub fn register_composite(
        &mut self,
        name: impl Into<TaskName>,
        step: Step,
        predecessors: Vec<TaskName>,
    ) -> Result<()> {
        self.insert(Task {
            name: name.into(),
            body: TaskBody::Composite(step),
            predecessors,
            description: None,
        })
    }

    /// Register a fully built [`Task`].
    pub fn insert(&mut self, task: Task) -> Result<()> {
        if self.tasks.contains_key(&task.name) {
            return Err(SitepipeError::DuplicateTask(task.name));
        }
        debug!(
            task = %task.name,
            composite = task.is_composite(),
            predecessors = ?task.predecessors,
            "registered task"
        );
        self.tasks.insert(task.name.clone(), task);
        Ok(())
    }

    pub fn resolve(&self, name: &str) -> Result<&Task> {
        self.tasks
            .get(name)
            .ok_or_else(|| SitepipeError::UnknownTask(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tasks.contains_key(name)
    }

    /// Tasks in name order.
    pub fn tasks(&self) -> impl Iterator<Item = &Task> {
        self.tasks.values()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.tasks.keys().map(|s| s.as_str())
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Check that every referenced task exists and that the dependency graph
    /// has no cycle.
    pub fn validate(&self) -> Result<()> {
        DependencyGraph::from_registry(self)?.ensure_acyclic()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn noop() -> Arc<dyn Action> {
        action_fn(|_ctx| async { Ok(()) })
    }

    #[test]
    fn duplicate_registration_keeps_first() {
        let mut reg = TaskRegistry::new();
        reg.register("html", noop(), vec![]).unwrap();

        let err = reg
            .register_composite("html", Step::series(["a"]), vec![])
            .unwrap_err();

        assert!(matches!(err, SitepipeError::DuplicateTask(ref n) if n == "html"));
        assert!(!reg.resolve("html").unwrap().is_composite());
        assert_eq!(reg.len(), 1);
    }

    #[test]
    fn resolve_unknown_task_fails() {
        let reg = TaskRegistry::new();
        assert!(matches!(
            reg.resolve("nope"),
            Err(SitepipeError::UnknownTask(ref n)) if n == "nope"
        ));
    }

    #[test]
    fn step_lists_referenced_tasks() {
        let step = Step::Series(vec![
            Step::task("clean"),
            Step::parallel(["html", "copy"]),
        ]);
        assert_eq!(step.referenced_tasks(), vec!["clean", "html", "copy"]);
    }
}
