//! GenFS error types.
//!
//! Every "does not exist" signal, whether a generator declined, the registry
//! had no match, or the real filesystem lacks the path, folds into
//! [`GenFsError::NotFound`] (or [`GenFsError::Missing`] from the existence
//! gate) so callers have a single check: [`GenFsError::is_not_found`].

use thiserror::Error;

use crate::vfs::VfsError;

/// GenFS error type.
#[derive(Debug, Error)]
pub enum GenFsError {
    /// Path resolves nowhere.
    #[error("open {0}: not found")]
    NotFound(String),

    /// Prerequisite paths were absent (from [`exists_all`](crate::exists_all)).
    #[error("missing {}", quote_all(.paths))]
    Missing {
        /// Every path that failed the existence check, in request order.
        paths: Vec<String>,
    },

    /// A generator failed for a reason other than "not mine".
    #[error("open {path}: generate: {source}")]
    Generate {
        /// Path being generated.
        path: String,
        /// What the generator reported.
        #[source]
        source: anyhow::Error,
    },

    /// The real filesystem failed with something other than not-found.
    #[error("open {path}: {source}")]
    Io {
        /// Path being read.
        path: String,
        /// Backend error.
        #[source]
        source: VfsError,
    },

    /// The caller cancelled resolution.
    #[error("open {0}: cancelled")]
    Cancelled(String),

    /// Path is malformed (e.g. contains `..`).
    #[error("invalid path: {0}")]
    InvalidPath(String),

    /// Resolved to a directory where file content was expected.
    #[error("open {0}: is a directory")]
    IsADirectory(String),

    /// Resolved to a file where a directory listing was expected.
    #[error("open {0}: not a directory")]
    NotADirectory(String),

    /// Configuration could not be loaded.
    #[error("config: {0}")]
    Config(String),
}

impl GenFsError {
    /// Create a NotFound error.
    pub fn not_found(path: impl Into<String>) -> Self {
        Self::NotFound(path.into())
    }

    /// Create a Cancelled error.
    pub fn cancelled(path: impl Into<String>) -> Self {
        Self::Cancelled(path.into())
    }

    /// Wrap a backend error with the path it was reading.
    ///
    /// Not-found flavours are normalized to [`GenFsError::NotFound`].
    pub fn from_vfs(path: impl Into<String>, err: VfsError) -> Self {
        let path = path.into();
        if err.is_not_found() {
            Self::NotFound(path)
        } else {
            Self::Io { path, source: err }
        }
    }

    /// Wrap a generator error with the path being generated.
    ///
    /// Generators signal "nothing here" and cancellation by returning the
    /// corresponding `GenFsError` inside the `anyhow::Error`; those keep
    /// their kind instead of becoming a generation failure.
    pub fn from_generator(path: impl Into<String>, err: anyhow::Error) -> Self {
        let path = path.into();
        match err.downcast::<GenFsError>() {
            Ok(inner) if inner.is_not_found() || inner.is_cancelled() => inner,
            Ok(inner) => Self::Generate {
                path,
                source: anyhow::Error::new(inner),
            },
            Err(source) => Self::Generate { path, source },
        }
    }

    /// Returns true for every not-found kind.
    pub fn is_not_found(&self) -> bool {
        matches!(self, GenFsError::NotFound(_) | GenFsError::Missing { .. })
    }

    /// Returns true if the caller cancelled.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, GenFsError::Cancelled(_))
    }
}

fn quote_all(paths: &[String]) -> String {
    paths
        .iter()
        .map(|p| format!("{:?}", p))
        .collect::<Vec<_>>()
        .join(", ")
}

/// GenFS result type.
pub type GenResult<T> = Result<T, GenFsError>;
