//! Local filesystem backend.
//!
//! Provides read access to a real directory tree, with path security
//! to prevent escaping the root directory.

use async_trait::async_trait;
use std::os::unix::fs::PermissionsExt;
use std::path::{Component, Path, PathBuf};
use tokio::fs;

use genfs_types::{DirEntry, FileAttr, FileType};

use crate::vfs::error::{VfsError, VfsResult};
use crate::vfs::ops::VfsOps;

/// Local filesystem backend.
///
/// All operations are relative to `root`. For example, if `root` is
/// `/home/amy/project`, then `read("app/main.go")` reads
/// `/home/amy/project/app/main.go`.
///
/// Paths containing `..` are refused, and symlinks that resolve outside the
/// root are blocked.
#[derive(Debug, Clone)]
pub struct LocalBackend {
    root: PathBuf,
}

impl LocalBackend {
    /// Create a new local filesystem rooted at the given path.
    ///
    /// The root is canonicalized at construction time to handle symlinks
    /// (e.g. macOS `/tmp` → `/private/tmp`).
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root: PathBuf = root.into();
        let root = dunce::canonicalize(&root).unwrap_or(root);
        Self { root }
    }

    /// Get the root path.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve a relative path to an absolute path within the root.
    fn resolve(&self, path: &Path) -> VfsResult<PathBuf> {
        let path = path.strip_prefix("/").unwrap_or(path);
        if path.as_os_str().is_empty() {
            return Ok(self.root.clone());
        }

        if path
            .components()
            .any(|c| matches!(c, Component::ParentDir | Component::Prefix(_)))
        {
            return Err(VfsError::path_escapes_root(path.display().to_string()));
        }

        let full = self.root.join(path);

        // Only existing paths can hide a symlink escape; missing ones fail
        // with NotFound on the actual operation.
        if let Ok(canonical) = dunce::canonicalize(&full) {
            if !canonical.starts_with(&self.root) {
                return Err(VfsError::path_escapes_root(format!(
                    "{} is not under {}",
                    canonical.display(),
                    self.root.display()
                )));
            }
            return Ok(canonical);
        }

        Ok(full)
    }

    /// Convert std::fs::Metadata to FileAttr.
    fn metadata_to_attr(meta: &std::fs::Metadata) -> FileAttr {
        let kind = file_type(&meta.file_type());
        let attr = FileAttr {
            size: if kind.is_dir() { 0 } else { meta.len() },
            kind,
            perm: meta.permissions().mode() & 0o7777,
            mtime: None,
        };
        match meta.modified() {
            Ok(mtime) => attr.with_mtime(mtime),
            Err(_) => attr,
        }
    }
}

fn file_type(ft: &std::fs::FileType) -> FileType {
    if ft.is_dir() {
        FileType::Directory
    } else if ft.is_symlink() {
        FileType::Symlink
    } else {
        FileType::File
    }
}

#[async_trait]
impl VfsOps for LocalBackend {
    async fn getattr(&self, path: &Path) -> VfsResult<FileAttr> {
        let full_path = self.resolve(path)?;
        let meta = fs::metadata(&full_path).await.map_err(VfsError::from)?;
        Ok(Self::metadata_to_attr(&meta))
    }

    async fn readdir(&self, path: &Path) -> VfsResult<Vec<DirEntry>> {
        let full_path = self.resolve(path)?;
        let mut entries = Vec::new();
        let mut dir = fs::read_dir(&full_path).await.map_err(VfsError::from)?;

        while let Some(entry) = dir.next_entry().await.map_err(VfsError::from)? {
            let meta = entry.metadata().await.map_err(VfsError::from)?;
            let kind = file_type(&meta.file_type());
            let mut dir_entry = DirEntry::new(entry.file_name().to_string_lossy(), kind)
                .with_perm(meta.permissions().mode() & 0o7777);
            if kind.is_file() {
                dir_entry = dir_entry.with_size(meta.len());
            }
            entries.push(dir_entry);
        }

        entries.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(entries)
    }

    async fn read(&self, path: &Path, offset: u64, size: u32) -> VfsResult<Vec<u8>> {
        use tokio::io::{AsyncReadExt, AsyncSeekExt};

        let full_path = self.resolve(path)?;
        let mut file = fs::File::open(&full_path).await.map_err(VfsError::from)?;

        file.seek(std::io::SeekFrom::Start(offset))
            .await
            .map_err(VfsError::from)?;

        let mut buffer = Vec::with_capacity(size as usize);
        file.take(size as u64)
            .read_to_end(&mut buffer)
            .await
            .map_err(VfsError::from)?;

        Ok(buffer)
    }

    async fn read_all(&self, path: &Path) -> VfsResult<Vec<u8>> {
        let full_path = self.resolve(path)?;
        let meta = fs::metadata(&full_path).await.map_err(VfsError::from)?;
        if meta.is_dir() {
            return Err(VfsError::is_a_directory(path.display().to_string()));
        }
        fs::read(&full_path).await.map_err(VfsError::from)
    }
}
