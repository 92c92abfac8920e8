//! The generator contract.
//!
//! A [`Generator`] is bound to a path and produces that path's content on
//! demand. The kind is fixed when the binding is created, so the registry
//! branches on an enum rather than probing capabilities at read time:
//!
//! - [`Generator::File`] writes bytes into a [`GenFile`]
//! - [`Generator::Dir`] declares named children in a [`GenDir`], each child
//!   carrying its own generator (so directories nest)
//! - [`Generator::Serve`] exposes another read-only filesystem under the path
//!
//! Generators report "nothing here" by returning [`GenFsError::NotFound`]
//! (wrapped in `anyhow::Error`); anything else aborts resolution as a
//! generation failure.
//!
//! [`GenFsError::NotFound`]: crate::GenFsError::NotFound

use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use indexmap::IndexMap;

use genfs_types::{DEFAULT_FILE_PERM, DirEntry, FileType};

use crate::context::GenContext;
use crate::vfs::VfsOps;

/// Produces the bytes of a generated file.
#[async_trait]
pub trait FileGenerator: Send + Sync {
    /// Fill in `file` for `file.path()`.
    async fn generate_file(&self, ctx: &GenContext, file: &mut GenFile) -> anyhow::Result<()>;
}

/// Enumerates the children of a generated directory.
#[async_trait]
pub trait DirGenerator: Send + Sync {
    /// Declare the entries of `dir.path()`.
    async fn generate_dir(&self, ctx: &GenContext, dir: &mut GenDir) -> anyhow::Result<()>;
}

/// A generator binding, tagged by kind.
#[derive(Clone)]
pub enum Generator {
    /// Generated file.
    File(Arc<dyn FileGenerator>),
    /// Generated directory.
    Dir(Arc<dyn DirGenerator>),
    /// Another filesystem served under this path.
    Serve(Arc<dyn VfsOps>),
}

impl Generator {
    /// Wrap a file generator.
    pub fn file(generator: impl FileGenerator + 'static) -> Self {
        Generator::File(Arc::new(generator))
    }

    /// Wrap a directory generator.
    pub fn dir(generator: impl DirGenerator + 'static) -> Self {
        Generator::Dir(Arc::new(generator))
    }

    /// Serve a filesystem under the bound path.
    pub fn serve(fs: impl VfsOps + 'static) -> Self {
        Generator::Serve(Arc::new(fs))
    }

    /// A file whose content never changes.
    pub fn bytes(data: impl Into<Vec<u8>>) -> Self {
        Generator::File(Arc::new(StaticFile(data.into())))
    }

    /// What this binding looks like in a directory listing.
    pub fn kind(&self) -> FileType {
        match self {
            Generator::File(_) => FileType::File,
            Generator::Dir(_) | Generator::Serve(_) => FileType::Directory,
        }
    }
}

impl std::fmt::Debug for Generator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let kind = match self {
            Generator::File(_) => "File",
            Generator::Dir(_) => "Dir",
            Generator::Serve(_) => "Serve",
        };
        f.debug_tuple("Generator").field(&kind).finish()
    }
}

/// Output buffer for a [`FileGenerator`].
#[derive(Debug)]
pub struct GenFile {
    path: String,
    /// File bytes.
    pub data: Vec<u8>,
    /// Unix permissions.
    pub perm: u32,
}

impl GenFile {
    pub(crate) fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            data: Vec::new(),
            perm: DEFAULT_FILE_PERM,
        }
    }

    /// Path being generated.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Replace the file's bytes.
    pub fn write(&mut self, data: impl Into<Vec<u8>>) {
        self.data = data.into();
    }
}

/// Output buffer for a [`DirGenerator`].
#[derive(Debug)]
pub struct GenDir {
    path: String,
    entries: IndexMap<String, Generator>,
}

impl GenDir {
    pub(crate) fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            entries: IndexMap::new(),
        }
    }

    /// Path being generated.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Declare a child. A later entry with the same name replaces the
    /// earlier one. Names must be a single path segment.
    pub fn entry(&mut self, name: impl Into<String>, generator: Generator) -> &mut Self {
        let name = name.into();
        if name.is_empty() || name.contains('/') || name == "." || name == ".." {
            tracing::warn!(dir = %self.path, name = %name, "ignoring invalid entry name");
            return self;
        }
        self.entries.insert(name, generator);
        self
    }

    /// Number of declared children.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if no child was declared.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Remove and return the generator declared for `name`.
    pub(crate) fn take(&mut self, name: &str) -> Option<Generator> {
        self.entries.swap_remove(name)
    }

    /// Entries as they appear in a listing, in declaration order.
    pub(crate) fn listing(&self) -> impl Iterator<Item = DirEntry> + '_ {
        self.entries
            .iter()
            .map(|(name, generator)| DirEntry::new(name.clone(), generator.kind()))
    }
}

struct StaticFile(Vec<u8>);

#[async_trait]
impl FileGenerator for StaticFile {
    async fn generate_file(&self, _ctx: &GenContext, file: &mut GenFile) -> anyhow::Result<()> {
        file.write(self.0.clone());
        Ok(())
    }
}

struct FnFile<F>(F);

#[async_trait]
impl<F, Fut> FileGenerator for FnFile<F>
where
    F: Fn(GenContext) -> Fut + Send + Sync,
    Fut: Future<Output = anyhow::Result<Vec<u8>>> + Send,
{
    async fn generate_file(&self, ctx: &GenContext, file: &mut GenFile) -> anyhow::Result<()> {
        let data = (self.0)(ctx.clone()).await?;
        file.write(data);
        Ok(())
    }
}

struct FnDir<F>(F);

#[async_trait]
impl<F, Fut> DirGenerator for FnDir<F>
where
    F: Fn(GenContext) -> Fut + Send + Sync,
    Fut: Future<Output = anyhow::Result<Vec<(String, Generator)>>> + Send,
{
    async fn generate_dir(&self, ctx: &GenContext, dir: &mut GenDir) -> anyhow::Result<()> {
        for (name, generator) in (self.0)(ctx.clone()).await? {
            dir.entry(name, generator);
        }
        Ok(())
    }
}

/// Build a file generator from an async closure returning the file bytes.
///
/// The closure receives a [`GenContext`] targeting the file being generated.
///
/// ```ignore
/// let main = file_fn(|ctx| async move {
///     let app = ctx.read("app.go").await?;
///     ctx.link_target("app.go", Event::Update);
///     Ok(render(&app))
/// });
/// ```
pub fn file_fn<F, Fut>(f: F) -> Generator
where
    F: Fn(GenContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<Vec<u8>>> + Send + 'static,
{
    Generator::File(Arc::new(FnFile(f)))
}

/// Build a directory generator from an async closure returning its children.
pub fn dir_fn<F, Fut>(f: F) -> Generator
where
    F: Fn(GenContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<Vec<(String, Generator)>>> + Send + 'static,
{
    Generator::Dir(Arc::new(FnDir(f)))
}
