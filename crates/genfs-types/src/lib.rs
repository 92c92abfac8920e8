//! Shared value types for genfs.
//!
//! A leaf crate with no async and no I/O. The kernel crate and any
//! out-of-tree generators build on these types.
//!
//! | Type         | Purpose                                        |
//! |--------------|------------------------------------------------|
//! | [`Event`]    | Change kind carried on links and notifications |
//! | [`FileType`] | File / directory / symlink                     |
//! | [`FileAttr`] | Metadata of a resolved path                    |
//! | [`DirEntry`] | One named child in a directory listing         |

mod entry;
mod event;

pub use entry::{DEFAULT_DIR_PERM, DEFAULT_FILE_PERM, DirEntry, FileAttr, FileType};
pub use event::Event;
