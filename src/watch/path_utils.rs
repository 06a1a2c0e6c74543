// src/watch/path_utils.rs

//! Path helpers shared by the watcher and source discovery.

use std::path::Path;

/// Render a relative path with forward slashes, the form globs match against.
pub fn to_slash(rel: &Path) -> String {
    rel.to_string_lossy().replace('\\', "/")
}

/// Convert `path` into a `/`-separated string relative to `root`.
///
/// Tries a plain `strip_prefix` first. Event paths from the OS may use a
/// different absolute prefix for the same directory (symlinks, `/private/var`
/// on macOS), so on failure both sides are canonicalized and compared again.
///
/// Returns `None` if `path` is not under `root`.
pub fn relative_str(root: &Path, path: &Path) -> Option<String> {
    if let Ok(rel) = path.strip_prefix(root) {
        return Some(to_slash(rel));
    }

    let root_canon = root.canonicalize().ok()?;
    let path_canon = path.canonicalize().ok()?;
    path_canon.strip_prefix(&root_canon).ok().map(to_slash)
}
