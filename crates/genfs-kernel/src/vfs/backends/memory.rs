//! In-memory filesystem backend.
//!
//! Stands in for the project directory in tests and lets embedders feed
//! GenFS a tree that never touches disk.

use async_trait::async_trait;
use std::collections::HashMap;
use std::path::{Component, Path, PathBuf};
use std::sync::RwLock;

use genfs_types::{DEFAULT_DIR_PERM, DEFAULT_FILE_PERM, DirEntry, FileAttr, FileType};

use crate::vfs::error::{VfsError, VfsResult};
use crate::vfs::ops::VfsOps;

/// Entry in the memory filesystem.
#[derive(Debug, Clone)]
enum Entry {
    File { data: Vec<u8>, attr: FileAttr },
    Directory { attr: FileAttr },
}

impl Entry {
    fn attr(&self) -> &FileAttr {
        match self {
            Entry::File { attr, .. } => attr,
            Entry::Directory { attr } => attr,
        }
    }
}

/// In-memory filesystem backend.
///
/// Thread-safe via internal `RwLock`. All data is lost when dropped.
/// Mutation is only exposed through inherent methods; the [`VfsOps`] view is
/// read-only like every other GenFS backend.
#[derive(Debug)]
pub struct MemoryBackend {
    entries: RwLock<HashMap<PathBuf, Entry>>,
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryBackend {
    /// Create a new empty in-memory filesystem.
    pub fn new() -> Self {
        let mut entries = HashMap::new();
        // Root directory always exists
        entries.insert(
            PathBuf::new(),
            Entry::Directory {
                attr: FileAttr::directory(DEFAULT_DIR_PERM),
            },
        );
        Self {
            entries: RwLock::new(entries),
        }
    }

    /// Builder: add a file, creating parent directories as needed.
    pub fn with_file(mut self, path: impl AsRef<Path>, data: impl Into<Vec<u8>>) -> Self {
        let entries = self
            .entries
            .get_mut()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        insert_file(entries, &Self::normalize(path.as_ref()), data.into());
        self
    }

    /// Builder: add an (empty) directory, creating parents as needed.
    pub fn with_dir(mut self, path: impl AsRef<Path>) -> Self {
        let entries = self
            .entries
            .get_mut()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        insert_dir(entries, &Self::normalize(path.as_ref()));
        self
    }

    /// Write a file, replacing any existing content.
    pub fn write_file(&self, path: impl AsRef<Path>, data: impl Into<Vec<u8>>) -> VfsResult<()> {
        let normalized = Self::normalize(path.as_ref());
        if normalized.as_os_str().is_empty() {
            return Err(VfsError::is_a_directory("/"));
        }
        let mut entries = self
            .entries
            .write()
            .map_err(|_| VfsError::other("lock poisoned"))?;
        if let Some(Entry::Directory { .. }) = entries.get(&normalized) {
            return Err(VfsError::is_a_directory(Self::path_str(&normalized)));
        }
        insert_file(&mut entries, &normalized, data.into());
        Ok(())
    }

    /// Remove a file or directory (and everything below it).
    ///
    /// Returns `true` if anything was removed.
    pub fn remove(&self, path: impl AsRef<Path>) -> VfsResult<bool> {
        let normalized = Self::normalize(path.as_ref());
        if normalized.as_os_str().is_empty() {
            return Err(VfsError::invalid_path("cannot remove root"));
        }
        let mut entries = self
            .entries
            .write()
            .map_err(|_| VfsError::other("lock poisoned"))?;
        let before = entries.len();
        entries.retain(|p, _| !p.starts_with(&normalized));
        Ok(entries.len() != before)
    }

    /// Normalize a path: remove leading `/`, resolve `.` and `..`.
    fn normalize(path: &Path) -> PathBuf {
        let mut result = PathBuf::new();
        for component in path.components() {
            match component {
                Component::ParentDir => {
                    result.pop();
                }
                Component::Normal(s) => {
                    result.push(s);
                }
                Component::RootDir | Component::CurDir | Component::Prefix(_) => {}
            }
        }
        result
    }

    /// Get the path string for error messages.
    fn path_str(path: &Path) -> String {
        path.display().to_string()
    }
}

/// Ensure all directories from the root down to `path` (inclusive) exist.
fn insert_dir(entries: &mut HashMap<PathBuf, Entry>, path: &Path) {
    let mut current = PathBuf::new();
    for component in path.components() {
        if let Component::Normal(s) = component {
            current.push(s);
            entries.entry(current.clone()).or_insert(Entry::Directory {
                attr: FileAttr::directory(DEFAULT_DIR_PERM),
            });
        }
    }
}

fn insert_file(entries: &mut HashMap<PathBuf, Entry>, path: &Path, data: Vec<u8>) {
    if let Some(parent) = path.parent() {
        insert_dir(entries, parent);
    }
    let attr = FileAttr::file(data.len() as u64, DEFAULT_FILE_PERM);
    entries.insert(path.to_path_buf(), Entry::File { data, attr });
}

#[async_trait]
impl VfsOps for MemoryBackend {
    async fn getattr(&self, path: &Path) -> VfsResult<FileAttr> {
        let normalized = Self::normalize(path);
        let entries = self
            .entries
            .read()
            .map_err(|_| VfsError::other("lock poisoned"))?;

        entries
            .get(&normalized)
            .map(|e| e.attr().clone())
            .ok_or_else(|| VfsError::not_found(Self::path_str(&normalized)))
    }

    async fn readdir(&self, path: &Path) -> VfsResult<Vec<DirEntry>> {
        let normalized = Self::normalize(path);
        let entries = self
            .entries
            .read()
            .map_err(|_| VfsError::other("lock poisoned"))?;

        match entries.get(&normalized) {
            Some(Entry::Directory { .. }) => {}
            Some(Entry::File { .. }) => {
                return Err(VfsError::not_a_directory(Self::path_str(&normalized)));
            }
            None => return Err(VfsError::not_found(Self::path_str(&normalized))),
        }

        // Find all direct children
        let mut result = Vec::new();
        for (entry_path, entry) in entries.iter() {
            if entry_path == &normalized || entry_path.parent() != Some(normalized.as_path()) {
                continue;
            }
            let Some(name) = entry_path.file_name() else {
                continue;
            };
            let dir_entry = match entry {
                Entry::File { attr, .. } => {
                    DirEntry::new(name.to_string_lossy(), FileType::File).with_size(attr.size)
                }
                Entry::Directory { .. } => DirEntry::directory(name.to_string_lossy()),
            };
            result.push(dir_entry.with_perm(entry.attr().perm));
        }

        // Sort for consistent ordering
        result.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(result)
    }

    async fn read(&self, path: &Path, offset: u64, size: u32) -> VfsResult<Vec<u8>> {
        let normalized = Self::normalize(path);
        let entries = self
            .entries
            .read()
            .map_err(|_| VfsError::other("lock poisoned"))?;

        match entries.get(&normalized) {
            Some(Entry::File { data, .. }) => {
                let start = (offset as usize).min(data.len());
                let end = (start + size as usize).min(data.len());
                Ok(data[start..end].to_vec())
            }
            Some(Entry::Directory { .. }) => {
                Err(VfsError::is_a_directory(Self::path_str(&normalized)))
            }
            None => Err(VfsError::not_found(Self::path_str(&normalized))),
        }
    }
}
