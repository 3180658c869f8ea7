//! MemTable implementation
//!
//! BTreeMap-based table with RwLock for concurrency.

use std::collections::BTreeMap;
use std::ops::Bound;
use std::sync::atomic::{AtomicUsize, Ordering};

use parking_lot::RwLock;

use super::Entry;

/// In-memory ordered table
pub struct MemTable {
    data: RwLock<BTreeMap<Vec<u8>, Vec<u8>>>,
    /// Sum of key and value lengths of live entries
    size: AtomicUsize,
}

impl MemTable {
    /// Create a new empty MemTable
    pub fn new() -> Self {
        Self {
            data: RwLock::new(BTreeMap::new()),
            size: AtomicUsize::new(0),
        }
    }

    /// Build a table from already loaded entries
    pub fn from_entries(entries: impl IntoIterator<Item = Entry>) -> Self {
        let table = Self::new();
        for (key, value) in entries {
            table.put(key, value);
        }
        table
    }

    /// Get a value by key (read lock)
    pub fn get(&self, key: &[u8]) -> Option<Vec<u8>> {
        self.data.read().get(key).cloned()
    }

    pub fn contains(&self, key: &[u8]) -> bool {
        self.data.read().contains_key(key)
    }

    /// Insert or overwrite a pair (write lock). Returns the new table size.
    pub fn put(&self, key: Vec<u8>, value: Vec<u8>) -> usize {
        let added = key.len() + value.len();
        let mut data = self.data.write();
        let key_len = key.len();
        let removed = data
            .insert(key, value)
            .map(|old| key_len + old.len())
            .unwrap_or(0);
        self.size.fetch_add(added, Ordering::SeqCst);
        self.size.fetch_sub(removed, Ordering::SeqCst);
        self.size.load(Ordering::SeqCst)
    }

    /// Remove a key (write lock). Returns false if the key was absent.
    pub fn delete(&self, key: &[u8]) -> bool {
        let mut data = self.data.write();
        match data.remove(key) {
            Some(old) => {
                self.size.fetch_sub(key.len() + old.len(), Ordering::SeqCst);
                true
            }
            None => false,
        }
    }

    /// First entry strictly after `key`, or the first entry when `key` is None
    pub fn next_after(&self, key: Option<&[u8]>) -> Option<Entry> {
        let data = self.data.read();
        let lower = match key {
            Some(k) => Bound::Excluded(k),
            None => Bound::Unbounded,
        };
        data.range::<[u8], _>((lower, Bound::Unbounded))
            .next()
            .map(|(k, v)| (k.clone(), v.clone()))
    }

    /// Last entry strictly before `key`, or the last entry when `key` is None
    pub fn prev_before(&self, key: Option<&[u8]>) -> Option<Entry> {
        let data = self.data.read();
        let upper = match key {
            Some(k) => Bound::Excluded(k),
            None => Bound::Unbounded,
        };
        data.range::<[u8], _>((Bound::Unbounded, upper))
            .next_back()
            .map(|(k, v)| (k.clone(), v.clone()))
    }

    /// Copy of all entries in key order (for snapshot writes)
    pub fn entries(&self) -> Vec<Entry> {
        self.data
            .read()
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }

    /// Get approximate size in bytes
    pub fn size(&self) -> usize {
        self.size.load(Ordering::SeqCst)
    }

    /// Get entry count
    pub fn entry_count(&self) -> usize {
        self.data.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.read().is_empty()
    }
}

impl Default for MemTable {
    fn default() -> Self {
        Self::new()
    }
}
