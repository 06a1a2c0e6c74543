// src/assets/incremental.rs

//! Copy only what changed.

use std::path::PathBuf;

use anyhow::Result;
use tracing::debug;

use crate::fs::FileSystem;
use crate::types::ChangeDetection;

/// Source and destination of one file copy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CopyEntry {
    pub source: PathBuf,
    pub dest: PathBuf,
}

impl CopyEntry {
    pub fn new(source: impl Into<PathBuf>, dest: impl Into<PathBuf>) -> Self {
        Self {
            source: source.into(),
            dest: dest.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CopyStats {
    pub copied: usize,
    pub skipped: usize,
}

/// Stateless change filter: every decision is made from the current source
/// and destination, nothing is remembered between runs.
#[derive(Debug, Clone, Copy)]
pub struct IncrementalCopy {
    compare: ChangeDetection,
    enabled: bool,
}

impl IncrementalCopy {
    pub fn new(compare: ChangeDetection) -> Self {
        Self {
            compare,
            enabled: true,
        }
    }

    /// Copy every entry unconditionally.
    pub fn always() -> Self {
        Self {
            compare: ChangeDetection::default(),
            enabled: false,
        }
    }

    /// Whether `entry.dest` is missing or stale.
    pub fn needs_copy(&self, fs: &dyn FileSystem, entry: &CopyEntry) -> Result<bool> {
        if !self.enabled {
            return Ok(true);
        }
        let Some(dest_mtime) = fs.modified(&entry.dest)? else {
            return Ok(true);
        };

        match self.compare {
            ChangeDetection::Mtime => {
                let src_mtime = fs.modified(&entry.source)?;
                Ok(src_mtime.is_some_and(|src| src > dest_mtime))
            }
            ChangeDetection::Contents => {
                let src = blake3::hash(&fs.read(&entry.source)?);
                let dest = blake3::hash(&fs.read(&entry.dest)?);
                Ok(src != dest)
            }
        }
    }

    pub fn run(&self, fs: &dyn FileSystem, entries: &[CopyEntry]) -> Result<CopyStats> {
        let mut stats = CopyStats::default();
        for entry in entries {
            if self.needs_copy(fs, entry)? {
                fs.copy_file(&entry.source, &entry.dest)?;
                debug!(src = ?entry.source, dest = ?entry.dest, "copied");
                stats.copied += 1;
            } else {
                debug!(dest = ?entry.dest, "up to date; skipping");
                stats.skipped += 1;
            }
        }
        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::mock::MockFileSystem;

    fn entries() -> Vec<CopyEntry> {
        vec![
            CopyEntry::new("/s/pages/index.html", "/s/dist/index.html"),
            CopyEntry::new("/s/pages/about.html", "/s/dist/about.html"),
        ]
    }

    fn seeded() -> MockFileSystem {
        let fs = MockFileSystem::new();
        fs.add_file("/s/pages/index.html", "index");
        fs.add_file("/s/pages/about.html", "about");
        fs
    }

    #[test]
    fn mtime_copies_once_then_only_touched() {
        let fs = seeded();
        let copy = IncrementalCopy::new(ChangeDetection::Mtime);

        let first = copy.run(&fs, &entries()).unwrap();
        assert_eq!(first, CopyStats { copied: 2, skipped: 0 });

        fs.clear_write_log();
        let second = copy.run(&fs, &entries()).unwrap();
        assert_eq!(second.copied, 0);
        assert_eq!(fs.write_count(), 0);

        fs.touch("/s/pages/about.html");
        let third = copy.run(&fs, &entries()).unwrap();
        assert_eq!(third, CopyStats { copied: 1, skipped: 1 });
        assert_eq!(fs.writes(), vec![PathBuf::from("/s/dist/about.html")]);
    }

    #[test]
    fn contents_ignores_touch_without_change() {
        let fs = seeded();
        let copy = IncrementalCopy::new(ChangeDetection::Contents);
        copy.run(&fs, &entries()).unwrap();

        fs.touch("/s/pages/index.html");
        fs.clear_write_log();
        assert_eq!(copy.run(&fs, &entries()).unwrap().copied, 0);

        fs.add_file("/s/pages/index.html", "changed");
        assert_eq!(copy.run(&fs, &entries()).unwrap().copied, 1);
    }

    #[test]
    fn always_copies_everything() {
        let fs = seeded();
        let copy = IncrementalCopy::always();
        copy.run(&fs, &entries()).unwrap();
        assert_eq!(copy.run(&fs, &entries()).unwrap().copied, 2);
    }
}
