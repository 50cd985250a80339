//! Concurrent accumulation of hashed entries for one run.
//!
//! A [`ResultPool`] is created empty at the start of a run, written by every
//! hashing worker through [`EntryCollector::collect`], and read once the walk
//! has joined. Entries are keyed by path; a second entry for the same path
//! replaces the first (last write wins). Each entry is inserted as a whole
//! value, so readers never observe a partially written record.
//!
//! The pool is an ordinary value owned by the caller and passed explicitly
//! to the walker (writer) and the persistence layer (reader).

use std::path::{Path, PathBuf};

use dashmap::DashMap;

use crate::scanner::{CollectError, Entry, EntryCollector};

/// Concurrency-safe map from file path to its [`Entry`].
#[derive(Debug, Default)]
pub struct ResultPool {
    entries: DashMap<PathBuf, Entry>,
}

impl ResultPool {
    /// Create an empty pool.
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: DashMap::new(),
        }
    }

    /// Create an empty pool with room for `capacity` entries.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: DashMap::with_capacity(capacity),
        }
    }

    /// Insert `entry`, replacing any previous entry for the same path.
    ///
    /// Returns the replaced entry, if there was one.
    pub fn put(&self, entry: Entry) -> Option<Entry> {
        self.entries.insert(entry.path.clone(), entry)
    }

    /// Clone of the entry stored for `path`.
    #[must_use]
    pub fn get(&self, path: &Path) -> Option<Entry> {
        self.entries.get(path).map(|e| e.value().clone())
    }

    /// Whether an entry exists for `path`.
    #[must_use]
    pub fn contains(&self, path: &Path) -> bool {
        self.entries.contains_key(path)
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the pool holds no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Visit every entry exactly once, in no particular order.
    ///
    /// Must not run while a walk is still writing into the pool; holding
    /// shard read locks while workers insert can stall them.
    pub fn for_each<F>(&self, mut visitor: F)
    where
        F: FnMut(&Entry),
    {
        for item in self.entries.iter() {
            visitor(item.value());
        }
    }

    /// Consume the pool and return its entries.
    #[must_use]
    pub fn into_entries(self) -> Vec<Entry> {
        self.entries.into_iter().map(|(_, entry)| entry).collect()
    }
}

impl EntryCollector for ResultPool {
    fn collect(&self, entry: Entry) -> Result<(), CollectError> {
        if let Some(previous) = self.put(entry) {
            log::debug!(
                "Replaced earlier entry for {}",
                previous.path.display()
            );
        }
        Ok(())
    }
}
