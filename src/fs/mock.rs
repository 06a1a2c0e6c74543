// src/fs/mock.rs

use super::FileSystem;
use anyhow::{anyhow, Result};
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Component, Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::{Duration, SystemTime};

#[derive(Debug, Clone)]
pub enum MockEntry {
    File { content: Vec<u8>, mtime: u64 },
    Dir,
}

#[derive(Debug, Default)]
struct MockState {
    entries: BTreeMap<PathBuf, MockEntry>,
    /// Logical clock; every write or touch advances it by one second.
    clock: u64,
    writes: Vec<PathBuf>,
}

/// In-memory filesystem for tests.
///
/// Paths are compared after dropping `.` components, so `./pages/a.html` and
/// `pages/a.html` name the same file. Directories exist implicitly above any
/// file. Modification times come from a logical clock, which makes
/// "source newer than destination" deterministic.
#[derive(Debug, Clone, Default)]
pub struct MockFileSystem {
    state: Arc<Mutex<MockState>>,
}

fn key(path: &Path) -> PathBuf {
    path.components()
        .filter(|c| !matches!(c, Component::CurDir))
        .collect()
}

fn to_time(tick: u64) -> SystemTime {
    SystemTime::UNIX_EPOCH + Duration::from_secs(tick)
}

impl MockFileSystem {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a file without recording it as a write.
    pub fn add_file(&self, path: impl AsRef<Path>, content: impl Into<Vec<u8>>) {
        let mut state = self.state.lock().unwrap();
        state.clock += 1;
        let mtime = state.clock;
        state.entries.insert(
            key(path.as_ref()),
            MockEntry::File {
                content: content.into(),
                mtime,
            },
        );
    }

    /// Bump the modification time of an existing file.
    pub fn touch(&self, path: impl AsRef<Path>) {
        let mut state = self.state.lock().unwrap();
        state.clock += 1;
        let now = state.clock;
        if let Some(MockEntry::File { mtime, .. }) = state.entries.get_mut(&key(path.as_ref())) {
            *mtime = now;
        }
    }

    /// Paths written through [`FileSystem::write`], in order.
    pub fn writes(&self) -> Vec<PathBuf> {
        self.state.lock().unwrap().writes.clone()
    }

    pub fn write_count(&self) -> usize {
        self.state.lock().unwrap().writes.len()
    }

    pub fn clear_write_log(&self) {
        self.state.lock().unwrap().writes.clear();
    }

    /// All file paths currently stored, sorted.
    pub fn files(&self) -> Vec<PathBuf> {
        let state = self.state.lock().unwrap();
        state
            .entries
            .iter()
            .filter(|(_, e)| matches!(e, MockEntry::File { .. }))
            .map(|(p, _)| p.clone())
            .collect()
    }
}

impl FileSystem for MockFileSystem {
    fn read(&self, path: &Path) -> Result<Vec<u8>> {
        let state = self.state.lock().unwrap();
        match state.entries.get(&key(path)) {
            Some(MockEntry::File { content, .. }) => Ok(content.clone()),
            Some(MockEntry::Dir) => Err(anyhow!("Is a directory: {:?}", path)),
            None => Err(anyhow!("File not found: {:?}", path)),
        }
    }

    fn read_to_string(&self, path: &Path) -> Result<String> {
        let bytes = self.read(path)?;
        String::from_utf8(bytes).map_err(|e| anyhow!("Invalid UTF-8: {}", e))
    }

    fn write(&self, path: &Path, contents: &[u8]) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        let k = key(path);
        if matches!(state.entries.get(&k), Some(MockEntry::Dir)) {
            return Err(anyhow!("Is a directory: {:?}", path));
        }
        state.clock += 1;
        let mtime = state.clock;
        state.entries.insert(
            k.clone(),
            MockEntry::File {
                content: contents.to_vec(),
                mtime,
            },
        );
        state.writes.push(k);
        Ok(())
    }

    fn exists(&self, path: &Path) -> bool {
        self.is_file(path) || self.is_dir(path)
    }

    fn is_file(&self, path: &Path) -> bool {
        let state = self.state.lock().unwrap();
        matches!(state.entries.get(&key(path)), Some(MockEntry::File { .. }))
    }

    fn is_dir(&self, path: &Path) -> bool {
        let k = key(path);
        if k.as_os_str().is_empty() {
            return true;
        }
        let state = self.state.lock().unwrap();
        match state.entries.get(&k) {
            Some(MockEntry::Dir) => true,
            Some(MockEntry::File { .. }) => false,
            None => state.entries.keys().any(|p| p != &k && p.starts_with(&k)),
        }
    }

    fn read_dir(&self, path: &Path) -> Result<Vec<PathBuf>> {
        if !self.is_dir(path) {
            return Err(anyhow!("Not a directory or not found: {:?}", path));
        }
        let k = key(path);
        let state = self.state.lock().unwrap();
        let mut children = BTreeSet::new();
        for entry in state.entries.keys() {
            if entry == &k {
                continue;
            }
            if let Ok(rest) = entry.strip_prefix(&k) {
                if let Some(first) = rest.components().next() {
                    children.insert(first.as_os_str().to_os_string());
                }
            }
        }
        Ok(children.into_iter().map(|name| path.join(name)).collect())
    }

    fn modified(&self, path: &Path) -> Result<Option<SystemTime>> {
        let state = self.state.lock().unwrap();
        match state.entries.get(&key(path)) {
            Some(MockEntry::File { mtime, .. }) => Ok(Some(to_time(*mtime))),
            Some(MockEntry::Dir) => Ok(Some(to_time(0))),
            None => Ok(None),
        }
    }

    fn create_dir_all(&self, path: &Path) -> Result<()> {
        let k = key(path);
        let mut state = self.state.lock().unwrap();
        if matches!(state.entries.get(&k), Some(MockEntry::File { .. })) {
            return Err(anyhow!("Not a directory: {:?}", path));
        }
        state.entries.entry(k).or_insert(MockEntry::Dir);
        Ok(())
    }

    fn clear_dir(&self, path: &Path) -> Result<()> {
        if !self.is_dir(path) {
            return Ok(());
        }
        let k = key(path);
        let mut state = self.state.lock().unwrap();
        state.entries.retain(|p, _| p == &k || !p.starts_with(&k));
        if !k.as_os_str().is_empty() {
            state.entries.entry(k).or_insert(MockEntry::Dir);
        }
        Ok(())
    }
}
