//! Routing between generated roots and the real filesystem.
//!
//! The first segment of a path decides where it goes. Registered roots are
//! served entirely by the [`Registry`] and hide anything the real
//! filesystem holds under the same name. Everything else falls through to
//! the real filesystem, if there is one. The root itself is the union of
//! both listings.

use std::path::Path;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use genfs_types::FileAttr;

use crate::content::Content;
use crate::context::GenContext;
use crate::entries::EntrySet;
use crate::error::{GenFsError, GenResult};
use crate::graph::DepGraph;
use crate::path;
use crate::registry::Registry;
use crate::vfs::VfsOps;

/// Merged view of generators over an optional real filesystem.
///
/// Cloning is cheap; the registry is copied only when a shared router is
/// mutated.
#[derive(Clone)]
pub struct Router {
    registry: Arc<Registry>,
    real: Option<Arc<dyn VfsOps>>,
    graph: Arc<DepGraph>,
}

impl std::fmt::Debug for Router {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Router")
            .field("registry", &self.registry)
            .field("real", &self.real.is_some())
            .field("graph", &self.graph)
            .finish()
    }
}

impl Router {
    /// Create a router with an empty registry.
    pub fn new(real: Option<Arc<dyn VfsOps>>, graph: Arc<DepGraph>) -> Self {
        Self {
            registry: Arc::new(Registry::new()),
            real,
            graph,
        }
    }

    /// The generator registry.
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Mutable registry, copied first if another snapshot shares it.
    pub(crate) fn registry_mut(&mut self) -> &mut Registry {
        Arc::make_mut(&mut self.registry)
    }

    /// The dependency graph generators link into.
    pub fn graph(&self) -> &Arc<DepGraph> {
        &self.graph
    }

    /// Returns true if a real filesystem sits underneath.
    pub fn has_real(&self) -> bool {
        self.real.is_some()
    }

    /// Returns true if `path` falls under a generated root.
    pub fn is_generated(&self, path: &str) -> bool {
        let root = path::root_segment(path);
        !path::is_root(root) && self.registry.is_root(root)
    }

    /// Resolve `path` to its current content.
    ///
    /// Nothing is cached here; every call routes and generates afresh.
    pub async fn resolve(
        self: &Arc<Self>,
        path: &str,
        cancel: &CancellationToken,
    ) -> GenResult<Content> {
        let path = path::normalize(path)?;
        if cancel.is_cancelled() {
            return Err(GenFsError::cancelled(path));
        }

        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(GenFsError::cancelled(path.as_str())),
            result = self.route(&path, cancel) => result,
        }
    }

    async fn route(self: &Arc<Self>, path: &str, cancel: &CancellationToken) -> GenResult<Content> {
        if path::is_root(path) {
            return self.merge_root().await;
        }

        if self.is_generated(path) {
            tracing::debug!(path = %path, "resolving generated path");
            let ctx = GenContext::new(Arc::clone(self), path, cancel.clone());
            return self.registry.open(&ctx, path).await;
        }

        match &self.real {
            Some(fs) => open_backend(fs.as_ref(), path, path).await,
            None => Err(GenFsError::not_found(path)),
        }
    }

    async fn merge_root(&self) -> GenResult<Content> {
        let mut set = EntrySet::new();
        // Generator entries first so they win name collisions.
        set.extend(self.registry.children(path::ROOT).unwrap_or_default());
        if let Some(fs) = &self.real {
            let entries = fs
                .readdir(Path::new(""))
                .await
                .map_err(|e| GenFsError::from_vfs(path::ROOT, e))?;
            set.extend(entries);
        }
        Ok(Content::dir(set.list()))
    }
}

/// Read `relative` from a backend as [`Content`], reporting errors against
/// `display`.
pub(crate) async fn open_backend(
    fs: &dyn VfsOps,
    relative: &str,
    display: &str,
) -> GenResult<Content> {
    let relative = Path::new(relative);
    let attr = fs
        .getattr(relative)
        .await
        .map_err(|e| GenFsError::from_vfs(display, e))?;

    if attr.is_dir() {
        let entries = fs
            .readdir(relative)
            .await
            .map_err(|e| GenFsError::from_vfs(display, e))?;
        return Ok(Content::Dir { entries, attr });
    }

    let data = fs
        .read_all(relative)
        .await
        .map_err(|e| GenFsError::from_vfs(display, e))?;
    let attr = FileAttr {
        size: data.len() as u64,
        ..attr
    };
    Ok(Content::File { data, attr })
}
