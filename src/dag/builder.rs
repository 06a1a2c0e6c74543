// src/dag/builder.rs

use tracing::debug;

use crate::dag::plan::ExecutionNode;
use crate::errors::{Result, SitepipeError};
use crate::registry::{Step, TaskBody, TaskRegistry};

/// Turns a root task name into an [`ExecutionNode`] tree.
///
/// - Predecessors run sequentially, each to completion, before the task body.
/// - Composite bodies become sequential / parallel groups.
/// - A task reachable through two branches appears (and runs) twice.
///
/// Cycles are detected on the current resolution path, so a plan is never
/// returned for a cyclic graph and no action can run.
#[derive(Debug, Clone, Copy)]
pub struct PlanBuilder<'r> {
    registry: &'r TaskRegistry,
}

impl<'r> PlanBuilder<'r> {
    pub fn new(registry: &'r TaskRegistry) -> Self {
        Self { registry }
    }

    pub fn build(&self, root: &str) -> Result<ExecutionNode> {
        let mut path = Vec::new();
        let plan = self.build_task(root, &mut path)?;
        debug!(root, leaves = plan.leaf_count(), "built execution plan");
        Ok(plan)
    }

    fn build_task(&self, name: &str, path: &mut Vec<String>) -> Result<ExecutionNode> {
        if let Some(pos) = path.iter().position(|p| p == name) {
            let mut cycle = path[pos..].to_vec();
            cycle.push(name.to_string());
            return Err(SitepipeError::Cycle {
                task: name.to_string(),
                path: cycle,
            });
        }

        let task = self.registry.resolve(name)?;
        path.push(name.to_string());

        let body = match &task.body {
            TaskBody::Action(action) => ExecutionNode::Leaf {
                task: task.name.clone(),
                action: action.clone(),
            },
            TaskBody::Composite(step) => self.build_step(step, &task.name, path)?,
        };

        let node = if task.predecessors.is_empty() {
            body
        } else {
            let mut children = Vec::with_capacity(task.predecessors.len() + 1);
            for pred in &task.predecessors {
                children.push(self.build_task(pred, path)?);
            }
            children.push(body);
            ExecutionNode::Sequential {
                label: format!("{} (after {})", task.name, task.predecessors.join(", ")),
                children,
            }
        };

        path.pop();
        Ok(node)
    }

    fn build_step(&self, step: &Step, label: &str, path: &mut Vec<String>) -> Result<ExecutionNode> {
        match step {
            Step::Task(name) => self.build_task(name, path),
            Step::Series(steps) => Ok(ExecutionNode::Sequential {
                label: label.to_string(),
                children: self.build_children(steps, label, path)?,
            }),
            Step::Parallel(steps) => Ok(ExecutionNode::Parallel {
                label: label.to_string(),
                children: self.build_children(steps, label, path)?,
            }),
        }
    }

    fn build_children(
        &self,
        steps: &[Step],
        label: &str,
        path: &mut Vec<String>,
    ) -> Result<Vec<ExecutionNode>> {
        steps
            .iter()
            .enumerate()
            .map(|(i, s)| self.build_step(s, &format!("{label}[{i}]"), path))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::action_fn;

    fn noop_registry(entries: &[(&str, &[&str])]) -> TaskRegistry {
        let mut reg = TaskRegistry::new();
        for (name, preds) in entries {
            reg.register(
                *name,
                action_fn(|_ctx| async { Ok(()) }),
                preds.iter().map(|p| p.to_string()).collect(),
            )
            .unwrap();
        }
        reg
    }

    #[test]
    fn predecessors_run_before_body() {
        let reg = noop_registry(&[("a", &[]), ("b", &["a"]), ("c", &["b"])]);
        let plan = PlanBuilder::new(&reg).build("c").unwrap();
        assert_eq!(plan.flatten(), vec!["a", "b", "c"]);
    }

    #[test]
    fn composite_steps_become_groups() {
        let mut reg = noop_registry(&[("clean", &[]), ("html", &[]), ("copy", &[])]);
        reg.register_composite(
            "build",
            Step::Series(vec![Step::task("clean"), Step::parallel(["html", "copy"])]),
            vec![],
        )
        .unwrap();

        let plan = PlanBuilder::new(&reg).build("build").unwrap();
        let ExecutionNode::Sequential { children, .. } = &plan else {
            panic!("expected sequential root, got {plan:?}");
        };
        assert!(matches!(children[1], ExecutionNode::Parallel { .. }));
        assert_eq!(plan.flatten(), vec!["clean", "html", "copy"]);
    }

    #[test]
    fn cycle_names_the_repeated_task() {
        let reg = noop_registry(&[("a", &["b"]), ("b", &["a"])]);
        let err = PlanBuilder::new(&reg).build("a").unwrap_err();
        match err {
            SitepipeError::Cycle { task, path } => {
                assert_eq!(task, "a");
                assert_eq!(path, vec!["a", "b", "a"]);
            }
            other => panic!("expected cycle, got {other:?}"),
        }
    }

    #[test]
    fn composite_self_membership_is_a_cycle() {
        let mut reg = TaskRegistry::new();
        reg.register_composite("default", Step::series(["default"]), vec![])
            .unwrap();
        assert!(matches!(
            PlanBuilder::new(&reg).build("default"),
            Err(SitepipeError::Cycle { .. })
        ));
    }

    #[test]
    fn diamond_dependency_appears_twice() {
        let reg = noop_registry(&[("base", &[]), ("left", &["base"]), ("right", &["base"])]);
        let mut reg = reg;
        reg.register_composite("top", Step::parallel(["left", "right"]), vec![])
            .unwrap();

        let plan = PlanBuilder::new(&reg).build("top").unwrap();
        assert_eq!(plan.flatten(), vec!["base", "left", "base", "right"]);
    }

    #[test]
    fn unknown_reference_fails() {
        let reg = noop_registry(&[("a", &["ghost"])]);
        assert!(matches!(
            PlanBuilder::new(&reg).build("a"),
            Err(SitepipeError::UnknownTask(ref n)) if n == "ghost"
        ));
    }
}
