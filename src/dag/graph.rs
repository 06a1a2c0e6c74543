// src/dag/graph.rs

use petgraph::algo::toposort;
use petgraph::graphmap::DiGraphMap;

use crate::errors::{Result, SitepipeError};
use crate::registry::{TaskBody, TaskRegistry};

/// Registry-wide dependency graph.
///
/// Edge direction: prerequisite -> dependent. A task listed in `after` of B
/// gets an edge to B; a member of a composite gets an edge to the composite.
#[derive(Debug, Clone)]
pub struct DependencyGraph<'r> {
    graph: DiGraphMap<&'r str, ()>,
}

impl<'r> DependencyGraph<'r> {
    /// Build the graph, failing on any reference to an unregistered task.
    pub fn from_registry(registry: &'r TaskRegistry) -> Result<Self> {
        let mut graph: DiGraphMap<&str, ()> = DiGraphMap::new();

        for name in registry.names() {
            graph.add_node(name);
        }

        for task in registry.tasks() {
            for pred in &task.predecessors {
                if !registry.contains(pred) {
                    return Err(SitepipeError::UnknownTask(format!(
                        "{pred} (listed in `after` of task '{}')",
                        task.name
                    )));
                }
                graph.add_edge(pred.as_str(), task.name.as_str(), ());
            }

            if let TaskBody::Composite(step) = &task.body {
                for member in step.referenced_tasks() {
                    if !registry.contains(member) {
                        return Err(SitepipeError::UnknownTask(format!(
                            "{member} (member of composite task '{}')",
                            task.name
                        )));
                    }
                    graph.add_edge(member, task.name.as_str(), ());
                }
            }
        }

        Ok(Self { graph })
    }

    pub fn ensure_acyclic(&self) -> Result<()> {
        self.topological_order().map(|_| ())
    }

    /// Every task, each after all of its prerequisites.
    pub fn topological_order(&self) -> Result<Vec<&'r str>> {
        toposort(&self.graph, None).map_err(|cycle| {
            let node = cycle.node_id();
            SitepipeError::Cycle {
                task: node.to_string(),
                path: self.cycle_path(node),
            }
        })
    }

    /// Direct prerequisites of `task`.
    pub fn prerequisites_of(&self, task: &'r str) -> Vec<&'r str> {
        self.graph
            .neighbors_directed(task, petgraph::Direction::Incoming)
            .collect()
    }

    /// A path `start -> ... -> start` through the graph, or just `[start]`
    /// when none is found.
    fn cycle_path(&self, start: &'r str) -> Vec<String> {
        let mut stack = vec![start];
        let mut visited = std::collections::HashSet::new();
        if self.walk_back_to(start, start, &mut stack, &mut visited) {
            stack.iter().map(|s| s.to_string()).collect()
        } else {
            vec![start.to_string()]
        }
    }

    fn walk_back_to(
        &self,
        target: &'r str,
        current: &'r str,
        stack: &mut Vec<&'r str>,
        visited: &mut std::collections::HashSet<&'r str>,
    ) -> bool {
        for next in self.graph.neighbors(current) {
            if next == target {
                stack.push(next);
                return true;
            }
            if visited.insert(next) {
                stack.push(next);
                if self.walk_back_to(target, next, stack, visited) {
                    return true;
                }
                stack.pop();
            }
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::{action_fn, Step};

    fn noop() -> std::sync::Arc<dyn crate::registry::Action> {
        action_fn(|_ctx| async { Ok(()) })
    }

    #[test]
    fn orders_prerequisites_first() {
        let mut reg = TaskRegistry::new();
        reg.register("html", noop(), vec!["clean".into()]).unwrap();
        reg.register("clean", noop(), vec![]).unwrap();
        reg.register_composite("build", Step::parallel(["html"]), vec![])
            .unwrap();

        let graph = DependencyGraph::from_registry(&reg).unwrap();
        let order = graph.topological_order().unwrap();
        let pos = |n: &str| order.iter().position(|t| *t == n).unwrap();

        assert!(pos("clean") < pos("html"));
        assert!(pos("html") < pos("build"));
        assert_eq!(graph.prerequisites_of("html"), vec!["clean"]);
    }

    #[test]
    fn reports_cycle_with_path() {
        let mut reg = TaskRegistry::new();
        reg.register("a", noop(), vec!["b".into()]).unwrap();
        reg.register("b", noop(), vec!["a".into()]).unwrap();

        let err = reg.validate().unwrap_err();
        match err {
            SitepipeError::Cycle { task, path } => {
                assert!(task == "a" || task == "b");
                assert_eq!(path.first(), Some(&task));
                assert_eq!(path.last(), Some(&task));
            }
            other => panic!("expected cycle, got {other:?}"),
        }
    }

    #[test]
    fn unknown_member_is_reported() {
        let mut reg = TaskRegistry::new();
        reg.register_composite("default", Step::series(["ghost"]), vec![])
            .unwrap();
        assert!(matches!(reg.validate(), Err(SitepipeError::UnknownTask(_))));
    }
}
