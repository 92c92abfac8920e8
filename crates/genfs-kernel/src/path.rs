//! Path normalization for GenFS.
//!
//! Every GenFS path is relative and `/`-separated: `bud/app/main.go`.
//! The root is written `.` (or empty). `..` is refused outright since a
//! generated tree has no meaningful parent to climb into.

use crate::error::{GenFsError, GenResult};

/// The canonical spelling of the root path.
pub const ROOT: &str = ".";

/// Normalize a request path.
///
/// Strips leading `/` and `./`, collapses repeated separators and `.`
/// segments, and drops trailing separators. Returns [`ROOT`] for the root.
pub fn normalize(path: &str) -> GenResult<String> {
    let mut segments = Vec::new();
    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => return Err(GenFsError::InvalidPath(path.to_string())),
            s => segments.push(s),
        }
    }
    if segments.is_empty() {
        Ok(ROOT.to_string())
    } else {
        Ok(segments.join("/"))
    }
}

/// Returns true if a normalized path names the root.
pub fn is_root(path: &str) -> bool {
    path == ROOT || path.is_empty()
}

/// First segment of a normalized path: the routing key.
pub fn root_segment(path: &str) -> &str {
    match path.find('/') {
        Some(index) => &path[..index],
        None => path,
    }
}

/// Split a normalized path into its segments (empty for the root).
pub fn segments(path: &str) -> impl Iterator<Item = &str> {
    path.split('/').filter(|s| !s.is_empty() && *s != ROOT)
}

/// Parent of a normalized path; `None` for the root.
pub fn parent(path: &str) -> Option<&str> {
    if is_root(path) {
        return None;
    }
    match path.rfind('/') {
        Some(index) => Some(&path[..index]),
        None => Some(ROOT),
    }
}

/// Join a parent path and a child name.
pub fn join(parent: &str, name: &str) -> String {
    if is_root(parent) {
        name.to_string()
    } else {
        format!("{}/{}", parent, name)
    }
}
