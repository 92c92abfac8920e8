//! Directory entry deduplication.

use std::collections::HashSet;

use genfs_types::DirEntry;

/// Accumulates directory entries from several sources.
///
/// The first entry seen for a name wins; later duplicates are dropped.
/// [`EntrySet::list`] returns the survivors sorted by name.
#[derive(Debug, Default)]
pub struct EntrySet {
    seen: HashSet<String>,
    entries: Vec<DirEntry>,
}

impl EntrySet {
    /// Create an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty set sized for roughly `capacity` entries.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            seen: HashSet::with_capacity(capacity),
            entries: Vec::with_capacity(capacity),
        }
    }

    /// Add one entry. Returns false if the name was already present.
    pub fn add(&mut self, entry: DirEntry) -> bool {
        if self.seen.contains(&entry.name) {
            return false;
        }
        self.seen.insert(entry.name.clone());
        self.entries.push(entry);
        true
    }

    /// Number of distinct names collected so far.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if nothing has been added.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Consume the set, returning entries sorted by name.
    pub fn list(mut self) -> Vec<DirEntry> {
        self.entries.sort_by(|a, b| a.name.cmp(&b.name));
        self.entries
    }
}

impl Extend<DirEntry> for EntrySet {
    fn extend<I: IntoIterator<Item = DirEntry>>(&mut self, iter: I) {
        for entry in iter {
            self.add(entry);
        }
    }
}

impl FromIterator<DirEntry> for EntrySet {
    fn from_iter<I: IntoIterator<Item = DirEntry>>(iter: I) -> Self {
        let mut set = EntrySet::new();
        set.extend(iter);
        set
    }
}
