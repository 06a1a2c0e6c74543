use std::fmt;
use std::str::FromStr;

use serde::Deserialize;

/// Built-in action a `[task.<name>]` entry can run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionKind {
    Clean,
    Copy,
    Style,
    Vendor,
    Serve,
    Watch,
    Shell,
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ActionKind::Clean => "clean",
            ActionKind::Copy => "copy",
            ActionKind::Style => "style",
            ActionKind::Vendor => "vendor",
            ActionKind::Serve => "serve",
            ActionKind::Watch => "watch",
            ActionKind::Shell => "shell",
        };
        f.write_str(s)
    }
}

/// Which stylesheet pipeline a `style` task runs.
///
/// - `Dev`: compile only.
/// - `Build`: compile, prefix, minify, and write source maps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum StyleProfile {
    #[default]
    Dev,
    Build,
}

impl FromStr for StyleProfile {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "dev" => Ok(StyleProfile::Dev),
            "build" => Ok(StyleProfile::Build),
            other => Err(format!(
                "invalid style profile: {other} (expected \"dev\" or \"build\")"
            )),
        }
    }
}

/// Output style handed to the style compiler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum OutputStyle {
    #[default]
    Expanded,
    Compressed,
}

impl OutputStyle {
    pub fn as_str(&self) -> &'static str {
        match self {
            OutputStyle::Expanded => "expanded",
            OutputStyle::Compressed => "compressed",
        }
    }
}

/// How the incremental copy decides a destination is stale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ChangeDetection {
    /// Copy when the destination is missing or older than the source.
    #[default]
    Mtime,
    /// Copy when the destination is missing or its content hash differs.
    Contents,
}

impl FromStr for ChangeDetection {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "mtime" => Ok(ChangeDetection::Mtime),
            "contents" => Ok(ChangeDetection::Contents),
            other => Err(format!(
                "invalid compare mode: {other} (expected \"mtime\" or \"contents\")"
            )),
        }
    }
}
