// src/assets/sources.rs

//! Glob expansion over the [`FileSystem`] trait.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::Result;

use crate::fs::FileSystem;
use crate::watch::path_utils::to_slash;
use crate::watch::{split_glob_base, PatternSet};

/// A matched source file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    pub path: PathBuf,
    /// Path relative to the pattern base, `/`-separated. Destinations are
    /// `dest/<relative>`.
    pub relative: String,
}

/// All files below `dir`, depth first, in name order. A missing directory
/// yields nothing.
pub fn walk_files(fs: &dyn FileSystem, dir: &Path) -> Result<Vec<PathBuf>> {
    let mut out = Vec::new();
    if fs.is_dir(dir) {
        walk_into(fs, dir, &mut out)?;
    }
    Ok(out)
}

fn walk_into(fs: &dyn FileSystem, dir: &Path, out: &mut Vec<PathBuf>) -> Result<()> {
    let mut entries = fs.read_dir(dir)?;
    entries.sort();
    for entry in entries {
        if fs.is_dir(&entry) {
            walk_into(fs, &entry, out)?;
        } else if fs.is_file(&entry) {
            out.push(entry);
        }
    }
    Ok(())
}

fn has_glob_meta(pattern: &str) -> bool {
    pattern.contains(['*', '?', '[', '{'])
}

/// Expand `patterns` into source files.
///
/// - With `base`, patterns are relative to `root/base` and so is
///   [`SourceFile::relative`].
/// - Without `base`, each pattern's literal parent directory is its base:
///   `pages/*.html` matches `pages/index.html` with relative `index.html`.
///
/// Results are de-duplicated and ordered by relative path.
pub fn expand_sources<S: AsRef<str>>(
    fs: &dyn FileSystem,
    root: &Path,
    base: Option<&str>,
    patterns: &[S],
) -> Result<Vec<SourceFile>> {
    let mut found: BTreeMap<String, SourceFile> = BTreeMap::new();

    for pattern in patterns {
        let pattern = pattern.as_ref().trim_start_matches("./");
        let (dir, rest) = match base {
            Some(base) => (base.trim_start_matches("./").to_string(), pattern.to_string()),
            None => split_glob_base(pattern),
        };
        let base_dir = if dir.is_empty() { root.to_path_buf() } else { root.join(&dir) };

        if !has_glob_meta(&rest) {
            let path = base_dir.join(&rest);
            if fs.is_file(&path) {
                found.entry(rest.clone()).or_insert(SourceFile {
                    path,
                    relative: rest,
                });
            }
            continue;
        }

        let matcher = PatternSet::new(&[rest.as_str()])?;
        for path in walk_files(fs, &base_dir)? {
            let Ok(rel) = path.strip_prefix(&base_dir) else {
                continue;
            };
            let rel = to_slash(rel);
            if matcher.is_match(&rel) {
                found
                    .entry(rel.clone())
                    .or_insert(SourceFile { path, relative: rel });
            }
        }
    }

    Ok(found.into_values().collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::mock::MockFileSystem;

    fn site() -> MockFileSystem {
        let fs = MockFileSystem::new();
        fs.add_file("/s/pages/index.html", "<h1>");
        fs.add_file("/s/pages/about.html", "<h2>");
        fs.add_file("/s/pages/js/app.js", "js");
        fs.add_file("/s/pages/js/lib/util.js", "js");
        fs.add_file("/s/pages/favicon.png", "png");
        fs.add_file("/s/scss/style.default.scss", "a{}");
        fs.add_file("/s/scss/_vars.scss", "$x: 1;");
        fs
    }

    fn rels(files: &[SourceFile]) -> Vec<&str> {
        files.iter().map(|f| f.relative.as_str()).collect()
    }

    #[test]
    fn glob_parent_is_the_base() {
        let fs = site();
        let files = expand_sources(&fs, Path::new("/s"), None, &["pages/*.html"]).unwrap();
        assert_eq!(rels(&files), vec!["about.html", "index.html"]);
        assert_eq!(files[1].path, PathBuf::from("/s/pages/index.html"));
    }

    #[test]
    fn explicit_base_keeps_directory_structure() {
        let fs = site();
        let files = expand_sources(
            &fs,
            Path::new("/s"),
            Some("pages"),
            &["js/**", "favicon.png", "img/**"],
        )
        .unwrap();
        assert_eq!(rels(&files), vec!["favicon.png", "js/app.js", "js/lib/util.js"]);
    }

    #[test]
    fn literal_file_pattern() {
        let fs = site();
        let files =
            expand_sources(&fs, Path::new("/s"), None, &["scss/style.default.scss"]).unwrap();
        assert_eq!(rels(&files), vec!["style.default.scss"]);
    }

    #[test]
    fn missing_base_is_empty() {
        let fs = site();
        let files = expand_sources(&fs, Path::new("/s"), Some("nope"), &["**"]).unwrap();
        assert!(files.is_empty());
    }
}
