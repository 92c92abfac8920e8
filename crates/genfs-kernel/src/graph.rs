//! Dependency graph between generated paths and their inputs.
//!
//! An edge `(from, to, event)` reads "`from` was generated by consuming `to`;
//! if `to` sees `event`, `from` is stale". The graph only answers the reverse
//! question, "who consumed `to` under `event`?", which is what triggering
//! needs. There is no cycle detection: a trigger walks exactly one hop.

use indexmap::{IndexMap, IndexSet};
use parking_lot::RwLock;

use genfs_types::Event;

/// A declared dependency edge.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Link {
    /// Generated path that consumed `to`.
    pub from: String,
    /// Input path.
    pub to: String,
    /// Event on `to` that makes `from` stale.
    pub event: Event,
}

#[derive(Debug, Default)]
struct Edges {
    /// (to, event) → from, in first-declaration order.
    ins: IndexMap<(String, Event), IndexSet<String>>,
    /// Total distinct edges.
    len: usize,
}

/// Thread-safe reverse-indexed edge set.
///
/// Edges accumulate for the lifetime of the graph. Declaring the same triple
/// again is a no-op, so generators can re-link on every regeneration.
#[derive(Debug, Default)]
pub struct DepGraph {
    edges: RwLock<Edges>,
}

impl DepGraph {
    /// Create an empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that `from` depends on `to` under `event`.
    ///
    /// Returns true if the edge is new.
    pub fn link(&self, from: &str, to: &str, event: Event) -> bool {
        let key = (to.to_string(), event);
        {
            let edges = self.edges.read();
            if edges.ins.get(&key).is_some_and(|froms| froms.contains(from)) {
                return false;
            }
        }

        let mut edges = self.edges.write();
        let inserted = edges.ins.entry(key).or_default().insert(from.to_string());
        if inserted {
            edges.len += 1;
            tracing::debug!(from, to, %event, "linked");
        }
        inserted
    }

    /// All paths that declared a dependency on `(to, event)`, in the order
    /// they were first linked.
    pub fn ins(&self, to: &str, event: Event) -> Vec<String> {
        let edges = self.edges.read();
        edges
            .ins
            .get(&(to.to_string(), event))
            .map(|froms| froms.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Snapshot of every edge, grouped by input in first-declaration order.
    pub fn links(&self) -> Vec<Link> {
        let edges = self.edges.read();
        edges
            .ins
            .iter()
            .flat_map(|((to, event), froms)| {
                froms.iter().map(move |from| Link {
                    from: from.clone(),
                    to: to.clone(),
                    event: *event,
                })
            })
            .collect()
    }

    /// Number of distinct edges.
    pub fn len(&self) -> usize {
        self.edges.read().len
    }

    /// Returns true if no edge has been declared.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
