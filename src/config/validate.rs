// src/config/validate.rs

use crate::config::model::{ConfigFile, RawConfigFile, StepConfig, TaskConfig};
use crate::errors::{Result, SitepipeError};
use crate::types::ActionKind;
use crate::watch::patterns::PatternSet;

/// Upper bound for `[config].debounce_ms`.
const MAX_DEBOUNCE_MS: u64 = 60_000;

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = SitepipeError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        validate_raw_config(&raw)?;
        Ok(ConfigFile::new_unchecked(raw))
    }
}

fn validate_raw_config(cfg: &RawConfigFile) -> Result<()> {
    ensure_has_tasks(cfg)?;
    validate_global_config(cfg)?;
    for (name, task) in cfg.task.iter() {
        validate_task_shape(name, task)?;
        validate_task_references(cfg, name, task)?;
    }
    validate_watch_bindings(cfg)?;
    Ok(())
}

fn ensure_has_tasks(cfg: &RawConfigFile) -> Result<()> {
    if cfg.task.is_empty() {
        return Err(SitepipeError::ConfigError(
            "config must contain at least one [task.<name>] section".to_string(),
        ));
    }
    Ok(())
}

fn validate_global_config(cfg: &RawConfigFile) -> Result<()> {
    if cfg.config.debounce_ms > MAX_DEBOUNCE_MS {
        return Err(SitepipeError::ConfigError(format!(
            "[config].debounce_ms must be <= {MAX_DEBOUNCE_MS} (got {})",
            cfg.config.debounce_ms
        )));
    }

    if cfg.style.compiler.is_empty() {
        return Err(SitepipeError::ConfigError(
            "[style].compiler must name a program".to_string(),
        ));
    }

    compile_globs("[serve].files", &cfg.serve.files)?;
    Ok(())
}

fn validate_task_shape(name: &str, task: &TaskConfig) -> Result<()> {
    let bodies = [
        task.action.is_some(),
        task.series.is_some(),
        task.parallel.is_some(),
    ]
    .iter()
    .filter(|set| **set)
    .count();

    if bodies != 1 {
        return Err(SitepipeError::ConfigError(format!(
            "task '{name}' must set exactly one of `action`, `series` or `parallel`"
        )));
    }

    let Some(kind) = task.action else {
        return Ok(());
    };

    let missing = |field: &str| {
        SitepipeError::ConfigError(format!(
            "task '{name}' (action = \"{kind}\") requires `{field}`"
        ))
    };

    match kind {
        ActionKind::Clean => {
            if task.target.is_none() {
                return Err(missing("target"));
            }
        }
        ActionKind::Copy | ActionKind::Style => {
            if task.src.is_empty() {
                return Err(missing("src"));
            }
            if task.dest.is_none() {
                return Err(missing("dest"));
            }
            compile_globs(&format!("task '{name}' src"), &task.src)?;
        }
        ActionKind::Vendor => {
            if task.dest.is_none() {
                return Err(missing("dest"));
            }
        }
        ActionKind::Shell => {
            if task.cmd.as_deref().is_none_or(|c| c.trim().is_empty()) {
                return Err(missing("cmd"));
            }
        }
        ActionKind::Serve | ActionKind::Watch => {}
    }

    Ok(())
}

fn validate_task_references(cfg: &RawConfigFile, name: &str, task: &TaskConfig) -> Result<()> {
    for dep in task.after.iter() {
        if !cfg.task.contains_key(dep) {
            return Err(SitepipeError::UnknownTask(format!(
                "{dep} (referenced in `after` of task '{name}')"
            )));
        }
    }

    let steps = task.series.iter().chain(task.parallel.iter()).flatten();
    for step in steps {
        ensure_step_known(cfg, name, step)?;
    }

    Ok(())
}

fn ensure_step_known(cfg: &RawConfigFile, owner: &str, step: &StepConfig) -> Result<()> {
    for referenced in step.referenced_tasks() {
        if !cfg.task.contains_key(referenced) {
            return Err(SitepipeError::UnknownTask(format!(
                "{referenced} (referenced in steps of task '{owner}')"
            )));
        }
    }
    Ok(())
}

fn validate_watch_bindings(cfg: &RawConfigFile) -> Result<()> {
    for (idx, binding) in cfg.watch.iter().enumerate() {
        if binding.patterns.is_empty() {
            return Err(SitepipeError::ConfigError(format!(
                "[[watch]] #{idx} (task '{}') has no patterns",
                binding.task
            )));
        }
        if !cfg.task.contains_key(&binding.task) {
            return Err(SitepipeError::UnknownTask(format!(
                "{} (bound by [[watch]] #{idx})",
                binding.task
            )));
        }
        compile_globs(&format!("[[watch]] #{idx}"), &binding.patterns)?;
    }
    Ok(())
}

fn compile_globs(what: &str, patterns: &[String]) -> Result<()> {
    PatternSet::new(patterns)
        .map(|_| ())
        .map_err(|e| SitepipeError::ConfigError(format!("{what}: {e:#}")))
}
