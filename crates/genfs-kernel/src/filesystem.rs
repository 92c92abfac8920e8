//! The GenFS facade.
//!
//! [`GenFs`] ties the pieces together: the [`Router`] resolves paths
//! through generators and the real filesystem, the [`DepGraph`] records
//! what each generated path consumed, and the [`TopicBus`] tells
//! subscribers when an input they depend on changes.
//!
//! ```ignore
//! let mut fsys = GenFs::with_backend(LocalBackend::new("."));
//! fsys.add_generators([("bud/app/main.go", file_fn(|ctx| async move {
//!     let app = ctx.read("app.go").await?;
//!     ctx.link_target("app.go", Event::Update);
//!     Ok(render(&app))
//! }))])?;
//!
//! let mut sub = fsys.subscribe("bud/app/main.go").await?;
//! fsys.trigger("app.go", Event::Update);
//! assert_eq!(sub.recv().await.unwrap().event, Event::Update);
//! ```

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use genfs_types::{DirEntry, Event};

use crate::cache::ContentCache;
use crate::config::GenFsConfig;
use crate::content::Content;
use crate::error::{GenFsError, GenResult};
use crate::flows::{Subscription, TopicBus};
use crate::generator::Generator;
use crate::graph::{DepGraph, Link};
use crate::path;
use crate::registry::Registry;
use crate::router::Router;
use crate::vfs::VfsOps;

/// A generated filesystem layered over an optional real one.
///
/// Register generators with [`GenFs::add_generators`] during setup; after
/// that every operation takes `&self` and may run from many tasks.
#[derive(Debug)]
pub struct GenFs {
    router: Arc<Router>,
    bus: TopicBus,
    cache: Option<ContentCache>,
    config: GenFsConfig,
}

impl Default for GenFs {
    fn default() -> Self {
        Self::new(None, GenFsConfig::default())
    }
}

impl GenFs {
    /// Create a filesystem over `real` (if any) with the given config.
    pub fn new(real: Option<Arc<dyn VfsOps>>, config: GenFsConfig) -> Self {
        let router = Router::new(real, Arc::new(DepGraph::new()));
        Self {
            router: Arc::new(router),
            bus: TopicBus::new(config.bus_capacity),
            cache: config.cache.then(ContentCache::new),
            config,
        }
    }

    /// Generated paths only; anything outside a root is not found.
    pub fn generated_only() -> Self {
        Self::default()
    }

    /// Generators layered over `real`, default config.
    pub fn with_backend(real: impl VfsOps + 'static) -> Self {
        Self::new(Some(Arc::new(real)), GenFsConfig::default())
    }

    /// Active configuration.
    pub fn config(&self) -> &GenFsConfig {
        &self.config
    }

    /// The generator registry.
    pub fn registry(&self) -> &Registry {
        self.router.registry()
    }

    /// The notification bus.
    pub fn bus(&self) -> &TopicBus {
        &self.bus
    }

    /// The content cache, when enabled.
    pub fn cache(&self) -> Option<&ContentCache> {
        self.cache.as_ref()
    }

    /// Registered roots, sorted.
    pub fn roots(&self) -> Vec<String> {
        self.registry().roots().map(str::to_string).collect()
    }

    /// Bind generators to paths.
    ///
    /// A later binding for the same path replaces the earlier one. All
    /// paths are validated before any is bound. Cached content is dropped,
    /// since new roots may shadow paths that were served by the real
    /// filesystem.
    pub fn add_generators<I, P>(&mut self, bindings: I) -> GenResult<()>
    where
        I: IntoIterator<Item = (P, Generator)>,
        P: AsRef<str>,
    {
        let mut validated = Vec::new();
        for (path, generator) in bindings {
            let path = path::normalize(path.as_ref())?;
            if path::is_root(&path) {
                return Err(GenFsError::InvalidPath(path));
            }
            validated.push((path, generator));
        }

        let registry = Arc::make_mut(&mut self.router).registry_mut();
        for (path, generator) in validated {
            tracing::debug!(path = %path, kind = ?generator.kind(), "adding generator");
            registry.insert(&path, generator)?;
        }

        if let Some(cache) = &self.cache {
            cache.clear();
        }
        Ok(())
    }

    /// Bind one generator.
    pub fn add_generator(&mut self, path: &str, generator: Generator) -> GenResult<()> {
        self.add_generators([(path, generator)])
    }

    /// Resolve `path` to its content.
    pub async fn open(&self, path: &str) -> GenResult<Arc<Content>> {
        self.open_with_cancel(path, &CancellationToken::new()).await
    }

    /// Resolve `path`, giving up with [`GenFsError::Cancelled`] as soon as
    /// `cancel` fires.
    pub async fn open_with_cancel(
        &self,
        path: &str,
        cancel: &CancellationToken,
    ) -> GenResult<Arc<Content>> {
        let path = path::normalize(path)?;
        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(GenFsError::cancelled(path.as_str())),
            result = self.resolve(&path, cancel) => result,
        }
    }

    async fn resolve(&self, path: &str, cancel: &CancellationToken) -> GenResult<Arc<Content>> {
        match &self.cache {
            Some(cache) => {
                cache
                    .get_or_try_init(path, move || self.router.resolve(path, cancel))
                    .await
            }
            None => self.router.resolve(path, cancel).await.map(Arc::new),
        }
    }

    /// Read a file.
    pub async fn read(&self, path: &str) -> GenResult<Vec<u8>> {
        let content = self.open(path).await?;
        content
            .data()
            .map(<[u8]>::to_vec)
            .ok_or_else(|| GenFsError::IsADirectory(path.to_string()))
    }

    /// List a directory.
    pub async fn read_dir(&self, path: &str) -> GenResult<Vec<DirEntry>> {
        let content = self.open(path).await?;
        content
            .entries()
            .map(<[DirEntry]>::to_vec)
            .ok_or_else(|| GenFsError::NotADirectory(path.to_string()))
    }

    /// Returns true if `path` resolves.
    pub async fn exists(&self, path: &str) -> bool {
        self.open(path).await.is_ok()
    }

    /// Watch `path` for invalidation events.
    ///
    /// The path must resolve; subscribing to something that does not exist
    /// fails with the resolution error. Resolving also lets the path's
    /// generators declare their links.
    pub async fn subscribe(&self, path: &str) -> GenResult<Subscription> {
        let path = path::normalize(path)?;
        self.open(&path).await?;
        Ok(self.bus.subscribe(&path))
    }

    /// Report that `path` experienced `event`.
    ///
    /// Every path linked to `path` under `event` is notified exactly once.
    /// Dependents of dependents are not. Returns the number of dependents
    /// notified.
    ///
    /// With eviction enabled, cached content for `path` and each dependent
    /// is dropped, as is the parent listing on `Create` and `Delete`.
    pub fn trigger(&self, path: &str, event: Event) -> usize {
        let path = match path::normalize(path) {
            Ok(path) => path,
            Err(err) => {
                tracing::warn!(path = %path, error = %err, "ignoring trigger");
                return 0;
            }
        };

        self.evict(&path);
        // Creating or deleting a path changes its parent's listing.
        if matches!(event, Event::Create | Event::Delete) {
            if let Some(parent) = path::parent(&path) {
                self.evict(parent);
            }
        }
        let dependents = self.router.graph().ins(&path, event);
        for dependent in &dependents {
            self.evict(dependent);
            let delivered = self.bus.publish(dependent, event);
            tracing::debug!(path = %dependent, event = %event, delivered, "notified dependent");
        }
        tracing::debug!(path = %path, event = %event, dependents = dependents.len(), "triggered");
        dependents.len()
    }

    /// Paths that depend on `path` under `event`, in link order.
    pub fn dependents(&self, path: &str, event: Event) -> Vec<String> {
        match path::normalize(path) {
            Ok(path) => self.router.graph().ins(&path, event),
            Err(_) => Vec::new(),
        }
    }

    /// Every link declared so far.
    pub fn links(&self) -> Vec<Link> {
        self.router.graph().links()
    }

    fn evict(&self, path: &str) {
        if !self.config.evict_on_trigger {
            return;
        }
        if let Some(cache) = &self.cache {
            if cache.evict(path) {
                tracing::debug!(path = %path, "evicted cached content");
            }
        }
    }
}
