#![allow(dead_code)]

use std::collections::BTreeMap;

use sitepipe::config::{ConfigFile, RawConfigFile, StepConfig, TaskConfig, WatchConfig};
use sitepipe::types::{ActionKind, StyleProfile};

/// Builder for `ConfigFile` to simplify test setup.
pub struct ConfigFileBuilder {
    config: RawConfigFile,
}

impl ConfigFileBuilder {
    pub fn new() -> Self {
        Self {
            config: RawConfigFile {
                task: BTreeMap::new(),
                ..RawConfigFile::default()
            },
        }
    }

    pub fn with_task(mut self, name: &str, task: TaskConfig) -> Self {
        self.config.task.insert(name.to_string(), task);
        self
    }

    pub fn with_watch(mut self, patterns: &[&str], task: &str, reload: bool) -> Self {
        self.config.watch.push(WatchConfig {
            patterns: patterns.iter().map(|p| p.to_string()).collect(),
            task: task.to_string(),
            reload,
        });
        self
    }

    pub fn with_debounce_ms(mut self, ms: u64) -> Self {
        self.config.config.debounce_ms = ms;
        self
    }

    pub fn with_serve_files(mut self, files: &[&str]) -> Self {
        self.config.serve.files = files.iter().map(|f| f.to_string()).collect();
        self
    }

    pub fn raw(self) -> RawConfigFile {
        self.config
    }

    pub fn build(self) -> ConfigFile {
        ConfigFile::try_from(self.config).expect("Failed to build valid config from builder")
    }
}

impl Default for ConfigFileBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for `TaskConfig`.
pub struct TaskConfigBuilder {
    task: TaskConfig,
}

impl TaskConfigBuilder {
    pub fn action(kind: ActionKind) -> Self {
        Self {
            task: TaskConfig {
                action: Some(kind),
                ..TaskConfig::default()
            },
        }
    }

    pub fn shell(cmd: &str) -> Self {
        Self::action(ActionKind::Shell).cmd(cmd)
    }

    pub fn series(steps: &[&str]) -> Self {
        Self {
            task: TaskConfig {
                series: Some(steps.iter().map(|s| StepConfig::Task(s.to_string())).collect()),
                ..TaskConfig::default()
            },
        }
    }

    pub fn parallel(steps: &[&str]) -> Self {
        Self {
            task: TaskConfig {
                parallel: Some(steps.iter().map(|s| StepConfig::Task(s.to_string())).collect()),
                ..TaskConfig::default()
            },
        }
    }

    pub fn after(mut self, dep: &str) -> Self {
        self.task.after.push(dep.to_string());
        self
    }

    pub fn src(mut self, pattern: &str) -> Self {
        self.task.src.push(pattern.to_string());
        self
    }

    pub fn base(mut self, base: &str) -> Self {
        self.task.base = Some(base.to_string());
        self
    }

    pub fn dest(mut self, dest: &str) -> Self {
        self.task.dest = Some(dest.to_string());
        self
    }

    pub fn target(mut self, target: &str) -> Self {
        self.task.target = Some(target.to_string());
        self
    }

    pub fn profile(mut self, profile: StyleProfile) -> Self {
        self.task.profile = Some(profile);
        self
    }

    pub fn cmd(mut self, cmd: &str) -> Self {
        self.task.cmd = Some(cmd.to_string());
        self
    }

    pub fn incremental(mut self, val: bool) -> Self {
        self.task.incremental = Some(val);
        self
    }

    pub fn build(self) -> TaskConfig {
        self.task
    }
}
