// src/watch/patterns.rs

use std::fmt;

use anyhow::{Context, Result};
use globset::{GlobBuilder, GlobSet, GlobSetBuilder};

use crate::config::model::WatchConfig;
use crate::engine::{Trigger, TriggerReason};

/// A compiled set of glob patterns.
///
/// Patterns are matched against `/`-separated paths relative to the project
/// root (e.g. `"scss/base/_vars.scss"`). `*` stays within one path segment;
/// `**` crosses directories.
#[derive(Clone)]
pub struct PatternSet {
    patterns: Vec<String>,
    set: GlobSet,
}

impl fmt::Debug for PatternSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PatternSet")
            .field("patterns", &self.patterns)
            .finish_non_exhaustive()
    }
}

impl PatternSet {
    pub fn new<S: AsRef<str>>(patterns: &[S]) -> Result<Self> {
        let mut builder = GlobSetBuilder::new();
        for pat in patterns {
            let pat = pat.as_ref();
            let glob = GlobBuilder::new(pat)
                .literal_separator(true)
                .build()
                .with_context(|| format!("invalid glob pattern: {pat}"))?;
            builder.add(glob);
        }
        Ok(Self {
            patterns: patterns.iter().map(|p| p.as_ref().to_string()).collect(),
            set: builder.build()?,
        })
    }

    pub fn is_match(&self, rel_path: &str) -> bool {
        self.set.is_match(rel_path)
    }

    pub fn patterns(&self) -> &[String] {
        &self.patterns
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }
}

/// A set of patterns routed to a payload: when a matching path changes, the
/// watcher emits `payload` (once per debounced burst).
#[derive(Debug, Clone)]
pub struct WatchRoute<T> {
    pub patterns: PatternSet,
    pub payload: T,
}

impl<T> WatchRoute<T> {
    pub fn new(patterns: PatternSet, payload: T) -> Self {
        Self { patterns, payload }
    }

    pub fn matches(&self, rel_path: &str) -> bool {
        self.patterns.is_match(rel_path)
    }
}

/// A glob pattern set bound to a task, with an optional reload after the task
/// succeeds.
pub type WatchBinding = WatchRoute<Trigger>;

/// Compile the `[[watch]]` entries of a config into bindings.
pub fn build_bindings(watch: &[WatchConfig]) -> Result<Vec<WatchBinding>> {
    watch
        .iter()
        .map(|w| {
            let patterns = PatternSet::new(&w.patterns)
                .with_context(|| format!("building watch patterns for task {}", w.task))?;
            Ok(WatchRoute::new(
                patterns,
                Trigger {
                    task: w.task.clone(),
                    reason: TriggerReason::FileWatch,
                    reload: w.reload,
                },
            ))
        })
        .collect()
}

/// Split a glob into its literal parent directory and the remaining pattern.
///
/// - `"pages/*.html"` -> `("pages", "*.html")`
/// - `"scss/**/*.scss"` -> `("scss", "**/*.scss")`
/// - `"favicon.png"` -> `("", "favicon.png")`
/// - `"css/custom.css"` -> `("css", "custom.css")`
pub fn split_glob_base(pattern: &str) -> (String, String) {
    let segments: Vec<&str> = pattern.split('/').filter(|s| !s.is_empty() && *s != ".").collect();

    let first_glob = segments
        .iter()
        .position(|s| s.contains(['*', '?', '[', '{']));

    // Without glob characters the last segment is the file name itself.
    let split_at = first_glob.unwrap_or(segments.len().saturating_sub(1));

    (
        segments[..split_at].join("/"),
        segments[split_at..].join("/"),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn star_does_not_cross_directories() {
        let set = PatternSet::new(&["pages/*.html"]).unwrap();
        assert!(set.is_match("pages/index.html"));
        assert!(!set.is_match("pages/partials/nav.html"));
    }

    #[test]
    fn double_star_matches_any_depth() {
        let set = PatternSet::new(&["scss/**/*.scss"]).unwrap();
        assert!(set.is_match("scss/style.default.scss"));
        assert!(set.is_match("scss/base/_vars.scss"));
        assert!(!set.is_match("css/custom.css"));

        let dir = PatternSet::new(&["js/**"]).unwrap();
        assert!(dir.is_match("js/vendor/app.js"));
    }

    #[test]
    fn splits_glob_parent() {
        assert_eq!(split_glob_base("pages/*.html"), ("pages".into(), "*.html".into()));
        assert_eq!(
            split_glob_base("./scss/**/*.scss"),
            ("scss".into(), "**/*.scss".into())
        );
        assert_eq!(split_glob_base("favicon.png"), ("".into(), "favicon.png".into()));
        assert_eq!(
            split_glob_base("css/custom.css"),
            ("css".into(), "custom.css".into())
        );
    }

    #[test]
    fn builds_bindings_from_config() {
        let watch = vec![WatchConfig {
            patterns: vec!["pages/*.html".to_string()],
            task: "html".to_string(),
            reload: true,
        }];
        let bindings = build_bindings(&watch).unwrap();
        assert_eq!(bindings.len(), 1);
        assert!(bindings[0].matches("pages/about.html"));
        assert_eq!(bindings[0].payload.task, "html");
        assert!(bindings[0].payload.reload);
    }
}
