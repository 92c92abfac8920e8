//! Resolved path content.

use genfs_types::{DEFAULT_DIR_PERM, DirEntry, FileAttr};

/// What a path currently contains: file bytes or a directory listing.
///
/// A `Content` is an immutable snapshot. Opening the same path again may
/// produce a fresh snapshot (or the cached one); a snapshot never changes
/// under its holder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Content {
    /// Regular file.
    File {
        /// File bytes.
        data: Vec<u8>,
        /// Metadata (size always matches `data`).
        attr: FileAttr,
    },
    /// Directory listing, sorted by name.
    Dir {
        /// Immediate children.
        entries: Vec<DirEntry>,
        /// Metadata.
        attr: FileAttr,
    },
}

impl Content {
    /// File content with the given permissions.
    pub fn file(data: Vec<u8>, perm: u32) -> Self {
        let attr = FileAttr::file(data.len() as u64, perm);
        Content::File { data, attr }
    }

    /// Directory listing with default permissions.
    pub fn dir(entries: Vec<DirEntry>) -> Self {
        Content::Dir {
            entries,
            attr: FileAttr::directory(DEFAULT_DIR_PERM),
        }
    }

    /// Metadata for this content.
    pub fn attr(&self) -> &FileAttr {
        match self {
            Content::File { attr, .. } => attr,
            Content::Dir { attr, .. } => attr,
        }
    }

    /// Returns true if this is a directory listing.
    pub fn is_dir(&self) -> bool {
        matches!(self, Content::Dir { .. })
    }

    /// File bytes, or None for directories.
    pub fn data(&self) -> Option<&[u8]> {
        match self {
            Content::File { data, .. } => Some(data),
            Content::Dir { .. } => None,
        }
    }

    /// Directory entries, or None for files.
    pub fn entries(&self) -> Option<&[DirEntry]> {
        match self {
            Content::File { .. } => None,
            Content::Dir { entries, .. } => Some(entries),
        }
    }
}
