//! Context handed to generators.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use genfs_types::{DirEntry, Event};

use crate::content::Content;
use crate::error::{GenFsError, GenResult};
use crate::path;
use crate::router::Router;

/// What a generator can see and declare while it runs.
///
/// Reads go through the merged filesystem (generated roots over the real
/// one) and are never served from the content cache, so a generator always
/// observes current inputs. Cloning is cheap.
#[derive(Clone, Debug)]
pub struct GenContext {
    router: Arc<Router>,
    target: String,
    cancel: CancellationToken,
}

impl GenContext {
    pub(crate) fn new(
        router: Arc<Router>,
        target: impl Into<String>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            router,
            target: target.into(),
            cancel,
        }
    }

    /// Same context, generating a different path.
    pub(crate) fn with_target(&self, target: &str) -> Self {
        Self {
            router: Arc::clone(&self.router),
            target: target.to_string(),
            cancel: self.cancel.clone(),
        }
    }

    /// Path being generated.
    pub fn target(&self) -> &str {
        &self.target
    }

    /// Token that fires when the request driving this generation is
    /// cancelled. Long-running generators should watch it.
    pub fn cancel_token(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Returns true if the driving request was cancelled.
    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Resolve another path.
    pub async fn open(&self, path: &str) -> GenResult<Content> {
        self.router.resolve(path, &self.cancel).await
    }

    /// Read a file.
    pub async fn read(&self, path: &str) -> GenResult<Vec<u8>> {
        match self.open(path).await? {
            Content::File { data, .. } => Ok(data),
            Content::Dir { .. } => Err(GenFsError::IsADirectory(path.to_string())),
        }
    }

    /// List a directory.
    pub async fn read_dir(&self, path: &str) -> GenResult<Vec<DirEntry>> {
        match self.open(path).await? {
            Content::Dir { entries, .. } => Ok(entries),
            Content::File { .. } => Err(GenFsError::NotADirectory(path.to_string())),
        }
    }

    /// Returns true if `path` resolves.
    pub async fn exists(&self, path: &str) -> bool {
        self.open(path).await.is_ok()
    }

    /// Declare that `from` depends on `to` under `event`.
    ///
    /// Returns true if the edge is new. Invalid paths are logged and
    /// ignored.
    pub fn link(&self, from: &str, to: &str, event: Event) -> bool {
        let (from, to) = match (path::normalize(from), path::normalize(to)) {
            (Ok(from), Ok(to)) => (from, to),
            (Err(err), _) | (_, Err(err)) => {
                tracing::warn!(from = %from, to = %to, error = %err, "ignoring link");
                return false;
            }
        };
        self.router.graph().link(&from, &to, event)
    }

    /// Declare that the path being generated depends on `to`.
    pub fn link_target(&self, to: &str, event: Event) -> bool {
        self.link(&self.target, to, event)
    }
}
