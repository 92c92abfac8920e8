//! # genfs-kernel
//!
//! A generated virtual filesystem.
//!
//! Generators are bound to paths and produce file bytes or directory
//! listings on demand. Their first path segments (the *roots*) shadow the
//! real filesystem underneath; everything else falls through to it. While
//! generating, a generator can read other paths and declare what it
//! depends on. Triggering an input then notifies every path that consumed
//! it.
//!
//! - [`GenFs`] - the facade: open, subscribe, trigger
//! - [`Generator`] - file, directory and served-filesystem bindings
//! - [`GenContext`] - what a generator sees while it runs
//! - [`TopicBus`] - per-path invalidation notifications
//! - [`vfs`] - real-filesystem backends

pub mod cache;
pub mod config;
pub mod content;
pub mod context;
pub mod entries;
pub mod error;
pub mod filesystem;
pub mod flows;
pub mod gate;
pub mod generator;
pub mod graph;
pub mod path;
pub mod registry;
pub mod router;
pub mod vfs;

pub use cache::ContentCache;
pub use config::GenFsConfig;
pub use content::Content;
pub use context::GenContext;
pub use entries::EntrySet;
pub use error::{GenFsError, GenResult};
pub use filesystem::GenFs;
pub use flows::{DEFAULT_TOPIC_CAPACITY, Notification, Subscription, TopicBus};
pub use gate::{PathExists, exists_all};
pub use generator::{DirGenerator, FileGenerator, GenDir, GenFile, Generator, dir_fn, file_fn};
pub use graph::{DepGraph, Link};
pub use registry::Registry;
pub use router::Router;
pub use vfs::{LocalBackend, MemoryBackend, VfsError, VfsOps, VfsResult};

pub use genfs_types::{DirEntry, Event, FileAttr, FileType};
pub use tokio_util::sync::CancellationToken;
