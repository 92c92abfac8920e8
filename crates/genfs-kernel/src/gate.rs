//! Existence gate: fail fast when prerequisites are missing.
//!
//! A generator that needs several inputs can check them all at once before
//! doing any work:
//!
//! ```ignore
//! exists_all(ctx, ["go.mod", "bud/app/main.go"]).await?;
//! ```

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use futures::StreamExt;
use futures::stream;

use crate::context::GenContext;
use crate::error::{GenFsError, GenResult};
use crate::filesystem::GenFs;
use crate::vfs::VfsOps;

/// Upper bound on concurrent checks for one gate.
const MAX_CONCURRENT_CHECKS: usize = 16;

/// Something that can answer "does this path exist?".
#[async_trait]
pub trait PathExists: Send + Sync {
    /// Returns true if `path` exists.
    async fn path_exists(&self, path: &str) -> bool;
}

#[async_trait]
impl PathExists for GenContext {
    async fn path_exists(&self, path: &str) -> bool {
        self.exists(path).await
    }
}

#[async_trait]
impl PathExists for GenFs {
    async fn path_exists(&self, path: &str) -> bool {
        self.exists(path).await
    }
}

#[async_trait]
impl PathExists for Arc<dyn VfsOps> {
    async fn path_exists(&self, path: &str) -> bool {
        self.exists(Path::new(path)).await
    }
}

/// Check every path concurrently.
///
/// Succeeds when all paths exist. Otherwise fails with
/// [`GenFsError::Missing`] naming every missing path, in input order.
pub async fn exists_all<F, I, P>(fsys: &F, paths: I) -> GenResult<()>
where
    F: PathExists + ?Sized,
    I: IntoIterator<Item = P>,
    P: AsRef<str>,
{
    let paths: Vec<String> = paths.into_iter().map(|p| p.as_ref().to_string()).collect();

    // Built up front so the stream holds only boxed futures across awaits.
    let checks: Vec<_> = paths.iter().map(|path| fsys.path_exists(path)).collect();
    let found: Vec<bool> = stream::iter(checks)
        .buffered(MAX_CONCURRENT_CHECKS)
        .collect()
        .await;

    let missing: Vec<String> = paths
        .into_iter()
        .zip(found)
        .filter_map(|(path, exists)| (!exists).then_some(path))
        .collect();

    if missing.is_empty() {
        Ok(())
    } else {
        tracing::debug!(missing = ?missing, "prerequisites missing");
        Err(GenFsError::Missing { paths: missing })
    }
}
