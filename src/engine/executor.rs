// src/engine/executor.rs

//! Walks an [`ExecutionNode`] tree and runs its actions.

use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Instant;

use futures::future::join_all;
use tracing::{debug, error, info};

use crate::dag::ExecutionNode;
use crate::registry::{Action, ActionContext};

use super::report::{RunReport, TaskRecord};
use super::NodeState;

type NodeFuture<'a> = Pin<Box<dyn Future<Output = bool> + Send + 'a>>;

/// Executes plans against one [`ActionContext`].
///
/// - Sequential nodes stop at the first failing child; later children stay
///   `Pending` and finished ones are left as they are.
/// - Parallel nodes start every child and wait for all of them. A failing
///   child fails the group but never cancels its siblings.
#[derive(Debug, Clone)]
pub struct Executor {
    ctx: ActionContext,
}

impl Executor {
    pub fn new(ctx: ActionContext) -> Self {
        Self { ctx }
    }

    pub async fn run(&self, plan: &ExecutionNode) -> RunReport {
        let started = Instant::now();
        let tracker = Tracker::new(plan);

        let ok = self.run_node(plan, 0, &tracker).await;
        debug!(root = plan.label(), ok, "plan finished");

        RunReport {
            root: plan.label().to_string(),
            records: tracker.into_records(),
            elapsed: started.elapsed(),
        }
    }

    /// `offset` is the index of the node's first leaf in plan order.
    fn run_node<'a>(
        &'a self,
        node: &'a ExecutionNode,
        offset: usize,
        tracker: &'a Tracker,
    ) -> NodeFuture<'a> {
        Box::pin(async move {
            match node {
                ExecutionNode::Leaf { task, action } => {
                    self.run_leaf(task, action, offset, tracker).await
                }
                ExecutionNode::Sequential { label, children } => {
                    let mut next = offset;
                    for child in children {
                        if !self.run_node(child, next, tracker).await {
                            debug!(group = %label, failed = child.label(), "series halted");
                            return false;
                        }
                        next += child.leaf_count();
                    }
                    true
                }
                ExecutionNode::Parallel { label, children } => {
                    let mut next = offset;
                    let mut branches = Vec::with_capacity(children.len());
                    for child in children {
                        branches.push(self.run_node(child, next, tracker));
                        next += child.leaf_count();
                    }
                    let results = join_all(branches).await;
                    let ok = results.iter().all(|ok| *ok);
                    if !ok {
                        debug!(group = %label, "parallel group failed");
                    }
                    ok
                }
            }
        })
    }

    async fn run_leaf(
        &self,
        task: &str,
        action: &Arc<dyn Action>,
        index: usize,
        tracker: &Tracker,
    ) -> bool {
        tracker.set_running(index);
        info!(task, "Starting '{task}'...");
        let started = Instant::now();

        let result = action.run(&self.ctx).await;
        let elapsed = started.elapsed();
        let elapsed_ms = elapsed.as_millis() as u64;

        match result {
            Ok(()) => {
                info!(task, elapsed_ms, "Finished '{task}' after {elapsed_ms} ms");
                tracker.finish(index, elapsed, None);
                true
            }
            Err(err) => {
                let message = format!("{err:#}");
                error!(task, elapsed_ms, error = %message, "'{task}' errored after {elapsed_ms} ms");
                tracker.finish(index, elapsed, Some(message));
                false
            }
        }
    }
}

/// Leaf records shared by concurrently running branches.
struct Tracker {
    records: Mutex<Vec<TaskRecord>>,
}

impl Tracker {
    fn new(plan: &ExecutionNode) -> Self {
        let records = plan.flatten().into_iter().map(TaskRecord::pending).collect();
        Self {
            records: Mutex::new(records),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Vec<TaskRecord>> {
        self.records.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn set_running(&self, index: usize) {
        if let Some(record) = self.lock().get_mut(index) {
            record.state = NodeState::Running;
        }
    }

    fn finish(&self, index: usize, elapsed: std::time::Duration, error: Option<String>) {
        if let Some(record) = self.lock().get_mut(index) {
            record.state = if error.is_some() {
                NodeState::Failed
            } else {
                NodeState::Succeeded
            };
            record.elapsed = Some(elapsed);
            record.error = error;
        }
    }

    fn into_records(self) -> Vec<TaskRecord> {
        self.records
            .into_inner()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
