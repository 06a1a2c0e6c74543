// src/tasks/mod.rs

//! Built-in actions and the bridge from `[task.*]` config to a registry.

pub mod clean;
pub mod copy;
pub mod serve;
pub mod shell;
pub mod style;
pub mod vendor;
pub mod watch;

use std::sync::Arc;
use std::time::Duration;

use crate::assets::IncrementalCopy;
use crate::config::{ConfigFile, StepConfig, TaskConfig};
use crate::errors::{Result, SitepipeError};
use crate::registry::{Action, Step, Task, TaskBody, TaskRegistry};
use crate::services::VendorOptions;
use crate::types::ActionKind;
use crate::watch::{build_bindings, WatchBinding};

pub use clean::CleanAction;
pub use copy::CopyAction;
pub use serve::ServeAction;
pub use shell::ShellAction;
pub use style::StyleAction;
pub use vendor::VendorAction;
pub use watch::WatchAction;

const DEFAULT_MANIFEST: &str = "package.json";

/// Register every `[task.<name>]` of `cfg` and validate the result (unknown
/// references, cycles).
pub fn registry_from_config(cfg: &ConfigFile) -> Result<TaskRegistry> {
    let bindings = build_bindings(cfg.watch_bindings())?;
    let mut registry = TaskRegistry::new();

    for (name, tc) in cfg.tasks() {
        registry.insert(Task {
            name: name.clone(),
            body: task_body(cfg, name, tc, &bindings)?,
            predecessors: tc.after.clone(),
            description: tc.description.clone(),
        })?;
    }

    registry.validate()?;
    Ok(registry)
}

fn task_body(
    cfg: &ConfigFile,
    name: &str,
    tc: &TaskConfig,
    bindings: &[WatchBinding],
) -> Result<TaskBody> {
    if let Some(kind) = tc.action {
        return Ok(TaskBody::Action(build_action(cfg, name, kind, tc, bindings)?));
    }
    if let Some(steps) = &tc.series {
        return Ok(TaskBody::Composite(Step::Series(
            steps.iter().map(to_step).collect(),
        )));
    }
    if let Some(steps) = &tc.parallel {
        return Ok(TaskBody::Composite(Step::Parallel(
            steps.iter().map(to_step).collect(),
        )));
    }
    Err(SitepipeError::ConfigError(format!(
        "task '{name}' has no body"
    )))
}

fn to_step(step: &StepConfig) -> Step {
    match step {
        StepConfig::Task(name) => Step::Task(name.clone()),
        StepConfig::Series { series } => Step::Series(series.iter().map(to_step).collect()),
        StepConfig::Parallel { parallel } => {
            Step::Parallel(parallel.iter().map(to_step).collect())
        }
    }
}

fn required(name: &str, kind: ActionKind, field: &str, value: &Option<String>) -> Result<String> {
    value.clone().ok_or_else(|| {
        SitepipeError::ConfigError(format!(
            "task '{name}' (action = \"{kind}\") requires `{field}`"
        ))
    })
}

fn build_action(
    cfg: &ConfigFile,
    name: &str,
    kind: ActionKind,
    tc: &TaskConfig,
    bindings: &[WatchBinding],
) -> Result<Arc<dyn Action>> {
    let action: Arc<dyn Action> = match kind {
        ActionKind::Clean => Arc::new(CleanAction {
            target: required(name, kind, "target", &tc.target)?,
        }),
        ActionKind::Copy => Arc::new(CopyAction {
            src: tc.src.clone(),
            base: tc.base.clone(),
            dest: required(name, kind, "dest", &tc.dest)?,
            filter: if tc.effective_incremental() {
                IncrementalCopy::new(tc.effective_compare())
            } else {
                IncrementalCopy::always()
            },
        }),
        ActionKind::Style => Arc::new(StyleAction {
            src: tc.src.clone(),
            dest: required(name, kind, "dest", &tc.dest)?,
            profile: tc.effective_profile(),
            style: cfg.style.clone(),
        }),
        ActionKind::Vendor => Arc::new(VendorAction {
            manifest: tc
                .manifest
                .clone()
                .unwrap_or_else(|| DEFAULT_MANIFEST.to_string()),
            dest: required(name, kind, "dest", &tc.dest)?,
            options: VendorOptions {
                copy_unminified: tc.effective_copy_unminified(),
            },
        }),
        ActionKind::Serve => Arc::new(ServeAction {
            serve: cfg.serve.clone(),
        }),
        ActionKind::Watch => Arc::new(WatchAction {
            bindings: bindings.to_vec(),
            debounce: Duration::from_millis(cfg.config.debounce_ms),
        }),
        ActionKind::Shell => Arc::new(ShellAction {
            task: name.to_string(),
            cmd: required(name, kind, "cmd", &tc.cmd)?,
        }),
    };
    Ok(action)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::parse_and_validate;
    use crate::dag::PlanBuilder;

    const SITE: &str = r#"
        [task.clean]
        action = "clean"
        target = "dist"

        [task.html]
        action = "copy"
        src = ["pages/*.html"]
        dest = "dist"

        [task.sass-build]
        action = "style"
        profile = "build"
        src = ["scss/style.default.scss"]
        dest = "dist/css"

        [task.build]
        series = ["clean", { parallel = ["html", "sass-build"] }]
    "#;

    #[test]
    fn builds_registry_and_plan_from_config() {
        let cfg = parse_and_validate(SITE).unwrap();
        let registry = registry_from_config(&cfg).unwrap();

        assert_eq!(registry.len(), 4);
        assert!(registry.resolve("build").unwrap().is_composite());

        let plan = PlanBuilder::new(&registry).build("build").unwrap();
        assert_eq!(plan.flatten(), vec!["clean", "html", "sass-build"]);
    }

    #[test]
    fn cyclic_config_is_rejected() {
        let cfg = parse_and_validate(
            r#"
            [task.a]
            action = "shell"
            cmd = "true"
            after = ["b"]

            [task.b]
            action = "shell"
            cmd = "true"
            after = ["a"]
            "#,
        )
        .unwrap();

        assert!(matches!(
            registry_from_config(&cfg),
            Err(SitepipeError::Cycle { .. })
        ));
    }
}
