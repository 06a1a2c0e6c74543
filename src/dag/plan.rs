// src/dag/plan.rs

//! Execution plan tree produced by the [`super::PlanBuilder`].

use std::fmt;
use std::sync::Arc;

use crate::engine::TaskName;
use crate::registry::Action;

/// One node of an execution plan. Built fresh for every invocation.
#[derive(Clone)]
pub enum ExecutionNode {
    /// Run a single action.
    Leaf {
        task: TaskName,
        action: Arc<dyn Action>,
    },
    /// Run children one after another; stop at the first failure.
    Sequential {
        label: String,
        children: Vec<ExecutionNode>,
    },
    /// Run children concurrently and wait for all of them.
    Parallel {
        label: String,
        children: Vec<ExecutionNode>,
    },
}

impl ExecutionNode {
    pub fn label(&self) -> &str {
        match self {
            ExecutionNode::Leaf { task, .. } => task,
            ExecutionNode::Sequential { label, .. } | ExecutionNode::Parallel { label, .. } => {
                label
            }
        }
    }

    /// Number of leaves below (and including) this node.
    pub fn leaf_count(&self) -> usize {
        match self {
            ExecutionNode::Leaf { .. } => 1,
            ExecutionNode::Sequential { children, .. }
            | ExecutionNode::Parallel { children, .. } => {
                children.iter().map(ExecutionNode::leaf_count).sum()
            }
        }
    }

    /// Leaf task names in depth-first order.
    ///
    /// For a plan without parallel groups this is exactly the execution order.
    pub fn flatten(&self) -> Vec<&str> {
        let mut out = Vec::with_capacity(self.leaf_count());
        self.collect_leaves(&mut out);
        out
    }

    fn collect_leaves<'a>(&'a self, out: &mut Vec<&'a str>) {
        match self {
            ExecutionNode::Leaf { task, .. } => out.push(task),
            ExecutionNode::Sequential { children, .. }
            | ExecutionNode::Parallel { children, .. } => {
                for child in children {
                    child.collect_leaves(out);
                }
            }
        }
    }

    fn fmt_tree(&self, f: &mut fmt::Formatter<'_>, depth: usize) -> fmt::Result {
        let indent = "  ".repeat(depth);
        match self {
            ExecutionNode::Leaf { task, .. } => writeln!(f, "{indent}- {task}"),
            ExecutionNode::Sequential { label, children } => {
                writeln!(f, "{indent}series {label}")?;
                children.iter().try_for_each(|c| c.fmt_tree(f, depth + 1))
            }
            ExecutionNode::Parallel { label, children } => {
                writeln!(f, "{indent}parallel {label}")?;
                children.iter().try_for_each(|c| c.fmt_tree(f, depth + 1))
            }
        }
    }
}

impl fmt::Debug for ExecutionNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExecutionNode::Leaf { task, .. } => f.debug_tuple("Leaf").field(task).finish(),
            ExecutionNode::Sequential { label, children } => f
                .debug_struct("Sequential")
                .field("label", label)
                .field("children", children)
                .finish(),
            ExecutionNode::Parallel { label, children } => f
                .debug_struct("Parallel")
                .field("label", label)
                .field("children", children)
                .finish(),
        }
    }
}

/// Indented tree, as printed by `--dry-run`.
impl fmt::Display for ExecutionNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.fmt_tree(f, 0)
    }
}
