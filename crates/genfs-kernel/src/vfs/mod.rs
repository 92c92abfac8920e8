//! Real-filesystem handles.
//!
//! GenFS never writes, so the backend surface is the read half of a
//! path-based VFS:
//!
//! - [`VfsOps`] - read-only operations every backend offers
//! - [`LocalBackend`] - a directory on disk (with path security)
//! - [`MemoryBackend`] - an in-memory tree (for embedding and testing)
//!
//! Paths handed to a backend are always relative to its root.

pub mod backends;
mod error;
mod ops;

pub use backends::{LocalBackend, MemoryBackend};
pub use error::{VfsError, VfsResult};
pub use ops::VfsOps;
