// src/services/vendor.rs

//! Resolution of third-party dependency files to vendor into the output.

use std::collections::BTreeMap;
use std::fmt::Debug;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;
use tracing::{debug, warn};

use crate::assets::sources::walk_files;
use crate::fs::FileSystem;
use crate::watch::path_utils::to_slash;
use crate::watch::PatternSet;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VendorOptions {
    /// Keep `x.js` even when `x.min.js` sits next to it.
    pub copy_unminified: bool,
}

impl Default for VendorOptions {
    fn default() -> Self {
        Self {
            copy_unminified: true,
        }
    }
}

/// One file to vendor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VendorFile {
    pub source: PathBuf,
    /// Destination relative to the vendor output directory, `/`-separated.
    pub relative: String,
}

pub trait VendorResolver: Send + Sync + Debug {
    fn list_dependency_files(
        &self,
        fs: &dyn FileSystem,
        root: &Path,
        manifest: &Path,
        options: &VendorOptions,
    ) -> Result<Vec<VendorFile>>;
}

/// Files never vendored, matched relative to the package directory.
const EXCLUDED: &[&str] = &[
    "**/*.map",
    "**/src/**",
    "**/examples/**",
    "**/example/**",
    "**/demo/**",
    "**/spec/**",
    "**/docs/**",
    "**/tests/**",
    "**/test/**",
    "**/Gruntfile.js",
    "**/gulpfile.js",
    "**/package.json",
    "**/package-lock.json",
    "**/bower.json",
    "**/composer.json",
    "**/yarn.lock",
    "**/webpack.config.js",
    "**/README",
    "**/LICENSE",
    "**/CHANGELOG",
    "**/*.yml",
    "**/*.md",
    "**/*.coffee",
    "**/*.ts",
    "**/*.scss",
    "**/*.less",
];

#[derive(Debug, Deserialize)]
struct PackageManifest {
    #[serde(default)]
    dependencies: BTreeMap<String, String>,
}

/// Reads `dependencies` from a `package.json` and lists the distributable
/// files of each package under `node_modules/`.
#[derive(Debug, Clone, Default)]
pub struct NpmDistResolver;

impl VendorResolver for NpmDistResolver {
    fn list_dependency_files(
        &self,
        fs: &dyn FileSystem,
        root: &Path,
        manifest: &Path,
        options: &VendorOptions,
    ) -> Result<Vec<VendorFile>> {
        let manifest_path = root.join(manifest);
        let text = fs.read_to_string(&manifest_path)?;
        let pkg: PackageManifest = serde_json::from_str(&text)
            .with_context(|| format!("parsing {:?}", manifest_path))?;

        let excluded = PatternSet::new(EXCLUDED)?;
        let modules = root.join("node_modules");
        let mut out = Vec::new();

        for dep in pkg.dependencies.keys() {
            let dep_dir = modules.join(dep);
            if !fs.is_dir(&dep_dir) {
                warn!(dependency = %dep, "dependency not installed; skipping");
                continue;
            }

            let mut rel_files: Vec<(PathBuf, String)> = walk_files(fs, &dep_dir)?
                .into_iter()
                .filter_map(|path| {
                    let rel = to_slash(path.strip_prefix(&dep_dir).ok()?);
                    Some((path, rel))
                })
                .filter(|(_, rel)| !excluded.is_match(rel))
                .collect();

            if !options.copy_unminified {
                let all: Vec<String> = rel_files.iter().map(|(_, r)| r.clone()).collect();
                rel_files.retain(|(_, rel)| !has_minified_sibling(rel, &all));
            }

            debug!(dependency = %dep, files = rel_files.len(), "resolved vendor files");

            out.extend(rel_files.into_iter().map(|(source, rel)| VendorFile {
                source,
                relative: format!("{dep}/{}", strip_dist_dirs(&rel)),
            }));
        }

        Ok(out)
    }
}

/// Drop the first `distribute` and then the first `dist` directory from a
/// package-relative path: `dist/js/a.js` -> `js/a.js`.
pub fn strip_dist_dirs(rel: &str) -> String {
    let mut parts: Vec<&str> = rel.split('/').collect();
    for dir in ["distribute", "dist"] {
        // Only directories; the last part is the file name.
        let dirs = parts.len().saturating_sub(1);
        if let Some(pos) = parts[..dirs].iter().position(|p| *p == dir) {
            parts.remove(pos);
        }
    }
    parts.join("/")
}

fn has_minified_sibling(rel: &str, all: &[String]) -> bool {
    let Some((stem, ext)) = rel.rsplit_once('.') else {
        return false;
    };
    if stem.ends_with(".min") {
        return false;
    }
    let minified = format!("{stem}.min.{ext}");
    all.iter().any(|r| *r == minified)
}
