// src/fs/mod.rs

use std::fmt::Debug;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use anyhow::{Context, Result};

pub mod mock;

/// Abstract filesystem interface.
///
/// Everything that reads sources or writes build output goes through this
/// trait so tests can substitute [`mock::MockFileSystem`].
pub trait FileSystem: Send + Sync + Debug {
    fn read(&self, path: &Path) -> Result<Vec<u8>>;
    fn read_to_string(&self, path: &Path) -> Result<String>;

    /// Write `contents` to `path`, creating parent directories as needed.
    fn write(&self, path: &Path, contents: &[u8]) -> Result<()>;
    fn exists(&self, path: &Path) -> bool;
    fn is_file(&self, path: &Path) -> bool;
    fn is_dir(&self, path: &Path) -> bool;

    /// Return a list of entries in a directory.
    /// Returns full paths.
    fn read_dir(&self, path: &Path) -> Result<Vec<PathBuf>>;

    /// Last modification time, or `None` if `path` does not exist.
    fn modified(&self, path: &Path) -> Result<Option<SystemTime>>;

    fn create_dir_all(&self, path: &Path) -> Result<()>;

    /// Remove everything inside `path`, keeping the directory itself.
    /// A missing directory is not an error.
    fn clear_dir(&self, path: &Path) -> Result<()>;

    /// Copy a file. The destination gets a fresh modification time.
    fn copy_file(&self, from: &Path, to: &Path) -> Result<()> {
        let data = self.read(from)?;
        self.write(to, &data)
    }
}

/// Implementation that uses `std::fs`.
#[derive(Debug, Clone, Default)]
pub struct RealFileSystem;

impl FileSystem for RealFileSystem {
    fn read(&self, path: &Path) -> Result<Vec<u8>> {
        fs::read(path).with_context(|| format!("reading file {:?}", path))
    }

    fn read_to_string(&self, path: &Path) -> Result<String> {
        fs::read_to_string(path).with_context(|| format!("reading file {:?}", path))
    }

    fn write(&self, path: &Path, contents: &[u8]) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| format!("creating dir {:?}", parent))?;
        }
        let mut file = fs::File::create(path).with_context(|| format!("creating file {:?}", path))?;
        file.write_all(contents).with_context(|| format!("writing to file {:?}", path))?;
        Ok(())
    }

    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn is_file(&self, path: &Path) -> bool {
        path.is_file()
    }

    fn is_dir(&self, path: &Path) -> bool {
        path.is_dir()
    }

    fn read_dir(&self, path: &Path) -> Result<Vec<PathBuf>> {
        let mut entries = Vec::new();
        for entry in fs::read_dir(path).with_context(|| format!("reading dir {:?}", path))? {
            let entry = entry?;
            entries.push(entry.path());
        }
        entries.sort();
        Ok(entries)
    }

    fn modified(&self, path: &Path) -> Result<Option<SystemTime>> {
        match fs::metadata(path) {
            Ok(meta) => {
                let mtime = meta
                    .modified()
                    .with_context(|| format!("reading mtime of {:?}", path))?;
                Ok(Some(mtime))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e).with_context(|| format!("reading metadata of {:?}", path)),
        }
    }

    fn create_dir_all(&self, path: &Path) -> Result<()> {
        fs::create_dir_all(path).with_context(|| format!("creating dir {:?}", path))
    }

    fn clear_dir(&self, path: &Path) -> Result<()> {
        if !path.is_dir() {
            return Ok(());
        }
        for entry in fs::read_dir(path).with_context(|| format!("reading dir {:?}", path))? {
            let entry_path = entry?.path();
            if entry_path.is_dir() {
                fs::remove_dir_all(&entry_path)
                    .with_context(|| format!("removing dir {:?}", entry_path))?;
            } else {
                fs::remove_file(&entry_path)
                    .with_context(|| format!("removing file {:?}", entry_path))?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clear_dir_keeps_directory() {
        let tmp = tempfile::tempdir().unwrap();
        let fs = RealFileSystem;
        let dist = tmp.path().join("dist");
        fs.write(&dist.join("css/a.css"), b"a{}").unwrap();
        fs.write(&dist.join("index.html"), b"<html>").unwrap();

        fs.clear_dir(&dist).unwrap();

        assert!(dist.is_dir());
        assert!(fs.read_dir(&dist).unwrap().is_empty());
    }

    #[test]
    fn modified_of_missing_file_is_none() {
        let tmp = tempfile::tempdir().unwrap();
        let fs = RealFileSystem;
        assert!(fs.modified(&tmp.path().join("nope")).unwrap().is_none());
    }
}
