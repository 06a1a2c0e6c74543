// src/config/model.rs

use std::collections::BTreeMap;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};

use serde::Deserialize;

use crate::types::{ActionKind, ChangeDetection, OutputStyle, StyleProfile};

/// Top-level configuration as read from a TOML file.
///
/// ```toml
/// [config]
/// debounce_ms = 100
///
/// [task.html]
/// action = "copy"
/// src = ["pages/*.html"]
/// dest = "dist"
///
/// [task.build]
/// series = ["clean", { parallel = ["html", "sass-build"] }]
///
/// [[watch]]
/// patterns = ["pages/*.html"]
/// task = "html"
/// reload = true
/// ```
///
/// This is the raw, unvalidated form. Use `ConfigFile::try_from` (or
/// `load_and_validate`) to get a [`ConfigFile`].
#[derive(Debug, Clone, Deserialize, Default)]
pub struct RawConfigFile {
    #[serde(default)]
    pub config: ConfigSection,

    #[serde(default)]
    pub style: StyleSection,

    #[serde(default)]
    pub serve: ServeSection,

    /// All tasks from `[task.<name>]`, keyed by task name.
    #[serde(default)]
    pub task: BTreeMap<String, TaskConfig>,

    /// All `[[watch]]` bindings, in declaration order.
    #[serde(default)]
    pub watch: Vec<WatchConfig>,
}

/// A validated configuration.
///
/// Only constructible through `TryFrom<RawConfigFile>`, so holders can rely on
/// task shapes and references having been checked.
#[derive(Debug, Clone)]
pub struct ConfigFile {
    pub config: ConfigSection,
    pub style: StyleSection,
    pub serve: ServeSection,
    pub task: BTreeMap<String, TaskConfig>,
    pub watch: Vec<WatchConfig>,
}

impl ConfigFile {
    pub(crate) fn new_unchecked(raw: RawConfigFile) -> Self {
        Self {
            config: raw.config,
            style: raw.style,
            serve: raw.serve,
            task: raw.task,
            watch: raw.watch,
        }
    }

    pub fn tasks(&self) -> &BTreeMap<String, TaskConfig> {
        &self.task
    }

    pub fn watch_bindings(&self) -> &[WatchConfig] {
        &self.watch
    }
}

/// `[config]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct ConfigSection {
    /// Quiet period before a burst of file events fires its binding.
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,
}

fn default_debounce_ms() -> u64 {
    100
}

impl Default for ConfigSection {
    fn default() -> Self {
        Self {
            debounce_ms: default_debounce_ms(),
        }
    }
}

/// `[style]` section: options for the stylesheet collaborators.
#[derive(Debug, Clone, Deserialize)]
pub struct StyleSection {
    /// Compiler program plus leading arguments, e.g. `["npx", "sass"]`.
    #[serde(default = "default_compiler")]
    pub compiler: Vec<String>,

    #[serde(default)]
    pub output_style: OutputStyle,

    /// Extra load paths handed to the compiler.
    #[serde(default)]
    pub include_paths: Vec<String>,

    /// Optional prefixer command (reads CSS on stdin, writes CSS on stdout).
    /// Empty means the CSS passes through untouched.
    #[serde(default)]
    pub prefixer: Vec<String>,

    #[serde(default = "default_true")]
    pub source_maps: bool,

    #[serde(default = "default_true")]
    pub minify: bool,
}

fn default_compiler() -> Vec<String> {
    vec!["sass".to_string()]
}

fn default_true() -> bool {
    true
}

impl Default for StyleSection {
    fn default() -> Self {
        Self {
            compiler: default_compiler(),
            output_style: OutputStyle::default(),
            include_paths: Vec::new(),
            prefixer: Vec::new(),
            source_maps: true,
            minify: true,
        }
    }
}

/// `[serve]` section: the live-reload HTTP server.
#[derive(Debug, Clone, Deserialize)]
pub struct ServeSection {
    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default = "default_base_dir")]
    pub base_dir: String,

    /// Built assets whose change is pushed to connected clients.
    #[serde(default)]
    pub files: Vec<String>,

    #[serde(default = "default_host")]
    pub host: IpAddr,

    /// `0` picks a free port.
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_base_dir() -> String {
    "dist".to_string()
}

fn default_host() -> IpAddr {
    IpAddr::V4(Ipv4Addr::LOCALHOST)
}

fn default_port() -> u16 {
    3000
}

impl ServeSection {
    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

impl Default for ServeSection {
    fn default() -> Self {
        Self {
            enabled: true,
            base_dir: default_base_dir(),
            files: Vec::new(),
            host: default_host(),
            port: default_port(),
        }
    }
}

/// One entry of a `series` / `parallel` list.
///
/// Either a task name or a nested group:
///
/// ```toml
/// series = ["clean", { parallel = ["html", "copy"] }]
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum StepConfig {
    Task(String),
    Series { series: Vec<StepConfig> },
    Parallel { parallel: Vec<StepConfig> },
}

impl StepConfig {
    /// Every task name referenced by this step, depth first.
    pub fn referenced_tasks(&self) -> Vec<&str> {
        let mut out = Vec::new();
        self.collect_names(&mut out);
        out
    }

    fn collect_names<'a>(&'a self, out: &mut Vec<&'a str>) {
        match self {
            StepConfig::Task(name) => out.push(name.as_str()),
            StepConfig::Series { series: steps } | StepConfig::Parallel { parallel: steps } => {
                for step in steps {
                    step.collect_names(out);
                }
            }
        }
    }
}

/// `[task.<name>]` section.
///
/// Exactly one of `action`, `series` and `parallel` must be set. The remaining
/// fields are parameters of the built-in actions; which ones are required
/// depends on `action`.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct TaskConfig {
    #[serde(default)]
    pub action: Option<ActionKind>,

    /// Composite body: run these steps one after another.
    #[serde(default)]
    pub series: Option<Vec<StepConfig>>,

    /// Composite body: run these steps concurrently.
    #[serde(default)]
    pub parallel: Option<Vec<StepConfig>>,

    /// Tasks that must complete, in order, before this one starts.
    #[serde(default)]
    pub after: Vec<String>,

    #[serde(default)]
    pub description: Option<String>,

    /// Source globs (`copy`, `style`).
    #[serde(default)]
    pub src: Vec<String>,

    /// Base directory the `src` globs are relative to (`copy`).
    #[serde(default)]
    pub base: Option<String>,

    /// Output directory (`copy`, `style`, `vendor`).
    #[serde(default)]
    pub dest: Option<String>,

    /// Directory to empty (`clean`).
    #[serde(default)]
    pub target: Option<String>,

    #[serde(default)]
    pub profile: Option<StyleProfile>,

    /// Project manifest listing dependencies (`vendor`).
    #[serde(default)]
    pub manifest: Option<String>,

    /// Also copy unminified files that have a `.min` sibling (`vendor`).
    #[serde(default)]
    pub copy_unminified: Option<bool>,

    /// Skip unchanged files (`copy`). Defaults to true.
    #[serde(default)]
    pub incremental: Option<bool>,

    #[serde(default)]
    pub compare: Option<ChangeDetection>,

    /// Shell command (`shell`).
    #[serde(default)]
    pub cmd: Option<String>,
}

impl TaskConfig {
    pub fn effective_incremental(&self) -> bool {
        self.incremental.unwrap_or(true)
    }

    pub fn effective_copy_unminified(&self) -> bool {
        self.copy_unminified.unwrap_or(true)
    }

    pub fn effective_profile(&self) -> StyleProfile {
        self.profile.unwrap_or_default()
    }

    pub fn effective_compare(&self) -> ChangeDetection {
        self.compare.unwrap_or_default()
    }
}

/// `[[watch]]` entry.
#[derive(Debug, Clone, Deserialize)]
pub struct WatchConfig {
    pub patterns: Vec<String>,

    /// Task to run when a matching file changes.
    pub task: String,

    /// Notify live-reload clients after the task succeeds.
    #[serde(default)]
    pub reload: bool,
}
