//! Generator registry: a prefix tree of bound paths.
//!
//! Paths are stored segment by segment in an arena. Every ancestor of a
//! bound path exists as a node, so the tree doubles as the set of virtual
//! directories the generators imply. The first-level children of the root
//! node are the *roots*: path prefixes that belong to generators and shadow
//! the real filesystem.
//!
//! Resolution walks the target's segments and picks the first applicable
//! rule:
//!
//! 1. The target is a bound node: run its generator.
//! 2. The target is an unbound node: list its children.
//! 3. The target is deeper than the tree: hand the remaining segments to
//!    the deepest bound ancestor, which must be a `Dir` or `Serve` binding.

use std::collections::{BTreeMap, HashSet};

use genfs_types::{DirEntry, FileType};

use crate::content::Content;
use crate::context::GenContext;
use crate::entries::EntrySet;
use crate::error::{GenFsError, GenResult};
use crate::generator::{GenDir, GenFile, Generator};
use crate::path;
use crate::router::open_backend;

type NodeId = usize;

const ROOT_ID: NodeId = 0;

#[derive(Debug, Clone)]
struct Node {
    segment: String,
    parent: Option<NodeId>,
    children: BTreeMap<String, NodeId>,
    generator: Option<Generator>,
}

impl Node {
    fn new(segment: impl Into<String>, parent: Option<NodeId>) -> Self {
        Self {
            segment: segment.into(),
            parent,
            children: BTreeMap::new(),
            generator: None,
        }
    }
}

/// Prefix tree of generator bindings.
#[derive(Debug, Clone)]
pub struct Registry {
    nodes: Vec<Node>,
    roots: HashSet<String>,
    bindings: usize,
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

impl Registry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            nodes: vec![Node::new(path::ROOT, None)],
            roots: HashSet::new(),
            bindings: 0,
        }
    }

    /// Bind `generator` to `path`, replacing any earlier binding.
    pub fn insert(&mut self, path: &str, generator: Generator) -> GenResult<()> {
        let path = path::normalize(path)?;
        if path::is_root(&path) {
            return Err(GenFsError::InvalidPath(path));
        }

        let mut node = ROOT_ID;
        for segment in path::segments(&path) {
            node = match self.nodes[node].children.get(segment) {
                Some(&child) => child,
                None => {
                    let child = self.nodes.len();
                    self.nodes.push(Node::new(segment, Some(node)));
                    self.nodes[node].children.insert(segment.to_string(), child);
                    child
                }
            };
        }

        self.roots.insert(path::root_segment(&path).to_string());
        if self.nodes[node].generator.replace(generator).is_some() {
            tracing::debug!(path = %path, "replaced generator");
        } else {
            self.bindings += 1;
        }
        Ok(())
    }

    /// Number of bound paths.
    pub fn len(&self) -> usize {
        self.bindings
    }

    /// Returns true if nothing is bound.
    pub fn is_empty(&self) -> bool {
        self.bindings == 0
    }

    /// First segments of all bound paths, sorted.
    pub fn roots(&self) -> impl Iterator<Item = &str> {
        self.nodes[ROOT_ID].children.keys().map(String::as_str)
    }

    /// Returns true if `segment` is a root.
    pub fn is_root(&self, segment: &str) -> bool {
        self.roots.contains(segment)
    }

    /// Generator bound exactly at `path`.
    pub fn get(&self, path: &str) -> Option<&Generator> {
        let id = self.lookup(path)?;
        self.nodes[id].generator.as_ref()
    }

    /// Immediate children of `path` in the tree, sorted by name.
    ///
    /// Returns `None` if `path` is not a node. Only the registered structure
    /// is consulted; no generator runs.
    pub fn children(&self, path: &str) -> Option<Vec<DirEntry>> {
        self.lookup(path).map(|id| self.child_entries(id))
    }

    /// Every bound path with the kind of its binding.
    pub fn bindings(&self) -> Vec<(String, FileType)> {
        let mut bound: Vec<_> = self
            .nodes
            .iter()
            .enumerate()
            .filter_map(|(id, node)| {
                let generator = node.generator.as_ref()?;
                Some((self.path_of(id), generator.kind()))
            })
            .collect();
        bound.sort_by(|a, b| a.0.cmp(&b.0));
        bound
    }

    /// Resolve a normalized `target` under this registry.
    pub async fn open(&self, ctx: &GenContext, target: &str) -> GenResult<Content> {
        let segments: Vec<&str> = path::segments(target).collect();

        let mut node = ROOT_ID;
        let mut matched = 0;
        for segment in &segments {
            match self.nodes[node].children.get(*segment) {
                Some(&child) => {
                    node = child;
                    matched += 1;
                }
                None => break,
            }
        }

        if matched == segments.len() {
            return self.open_node(ctx, node, target).await;
        }

        // Deeper than the tree: find the closest bound ancestor.
        let mut depth = matched;
        loop {
            if let Some(generator) = &self.nodes[node].generator {
                let base = segments[..depth].join("/");
                return expand(ctx, base, generator.clone(), &segments[depth..], target).await;
            }
            match self.nodes[node].parent {
                Some(parent) => {
                    node = parent;
                    depth -= 1;
                }
                None => return Err(GenFsError::not_found(target)),
            }
        }
    }

    async fn open_node(&self, ctx: &GenContext, id: NodeId, target: &str) -> GenResult<Content> {
        let node = &self.nodes[id];
        let Some(generator) = &node.generator else {
            return Ok(Content::dir(self.child_entries(id)));
        };

        let result = expand(ctx, target.to_string(), generator.clone(), &[], target).await;
        if node.children.is_empty() {
            return result;
        }

        // Deeper bindings show through the generated listing.
        match result {
            Ok(Content::Dir { entries, attr }) => {
                let mut set = EntrySet::with_capacity(entries.len() + node.children.len());
                set.extend(entries);
                set.extend(self.child_entries(id));
                Ok(Content::Dir {
                    entries: set.list(),
                    attr,
                })
            }
            Err(err) if err.is_not_found() => Ok(Content::dir(self.child_entries(id))),
            other => other,
        }
    }

    fn lookup(&self, path: &str) -> Option<NodeId> {
        let mut node = ROOT_ID;
        for segment in path::segments(path) {
            node = *self.nodes[node].children.get(segment)?;
        }
        Some(node)
    }

    /// One directory entry per next segment, whatever is bound below it.
    fn child_entries(&self, id: NodeId) -> Vec<DirEntry> {
        self.nodes[id]
            .children
            .keys()
            .map(|name| DirEntry::directory(name.clone()))
            .collect()
    }

    fn path_of(&self, id: NodeId) -> String {
        let mut segments = Vec::new();
        let mut node = Some(id);
        while let Some(current) = node {
            if current != ROOT_ID {
                segments.push(self.nodes[current].segment.as_str());
            }
            node = self.nodes[current].parent;
        }
        segments.reverse();
        segments.join("/")
    }
}

/// Run `generator` for `base`, then walk `rest` through nested `Dir` entries.
async fn expand(
    ctx: &GenContext,
    mut base: String,
    mut generator: Generator,
    mut rest: &[&str],
    target: &str,
) -> GenResult<Content> {
    loop {
        let scoped = ctx.with_target(&base);
        match generator {
            Generator::File(file_gen) => {
                if !rest.is_empty() {
                    return Err(GenFsError::not_found(target));
                }
                tracing::debug!(path = %base, "generating file");
                let mut file = GenFile::new(base.as_str());
                file_gen
                    .generate_file(&scoped, &mut file)
                    .await
                    .map_err(|e| GenFsError::from_generator(&base, e))?;
                return Ok(Content::file(file.data, file.perm));
            }
            Generator::Serve(fs) => {
                let relative = rest.join("/");
                return open_backend(fs.as_ref(), &relative, target).await;
            }
            Generator::Dir(dir_gen) => {
                tracing::debug!(path = %base, "generating dir");
                let mut dir = GenDir::new(base.as_str());
                dir_gen
                    .generate_dir(&scoped, &mut dir)
                    .await
                    .map_err(|e| GenFsError::from_generator(&base, e))?;

                let Some((name, tail)) = rest.split_first() else {
                    let mut set = EntrySet::with_capacity(dir.len());
                    set.extend(dir.listing());
                    return Ok(Content::dir(set.list()));
                };
                generator = dir
                    .take(name)
                    .ok_or_else(|| GenFsError::not_found(target))?;
                base = path::join(&base, name);
                rest = tail;
            }
        }
    }
}
