//! VFS operations trait.

use async_trait::async_trait;
use std::path::Path;

use genfs_types::{DirEntry, FileAttr};

use super::{VfsError, VfsResult};

/// Read-only VFS operations.
///
/// All operations are path-based, relative to the backend's root. An empty
/// path names the root itself.
#[async_trait]
pub trait VfsOps: Send + Sync {
    /// Get file attributes.
    async fn getattr(&self, path: &Path) -> VfsResult<FileAttr>;

    /// Read directory entries, sorted by name.
    async fn readdir(&self, path: &Path) -> VfsResult<Vec<DirEntry>>;

    /// Read file contents.
    ///
    /// Reads up to `size` bytes starting at `offset`.
    /// Returns fewer bytes if EOF is reached.
    async fn read(&self, path: &Path, offset: u64, size: u32) -> VfsResult<Vec<u8>>;

    /// Check if a path exists.
    async fn exists(&self, path: &Path) -> bool {
        self.getattr(path).await.is_ok()
    }

    /// Read entire file contents.
    async fn read_all(&self, path: &Path) -> VfsResult<Vec<u8>> {
        let attr = self.getattr(path).await?;
        if attr.is_dir() {
            return Err(VfsError::is_a_directory(path.display().to_string()));
        }
        let size = u32::try_from(attr.size)
            .map_err(|_| VfsError::other(format!("{} is too large", path.display())))?;
        self.read(path, 0, size).await
    }
}
