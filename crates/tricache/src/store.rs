//! Independently locked key/value store
//!
//! A `Store` pairs one backing map with one `RwLock`. Writers take the lock
//! exclusively, readers share it. Two stores never share a lock, so traffic
//! on one never waits on another.

use std::collections::{BTreeMap, HashMap};

use ahash::RandomState;
use bytes::Bytes;
use parking_lot::RwLock;

/// Backing map a `Store` can wrap
pub trait StoreMap: Default + Send + Sync {
    /// Insert or overwrite, returning the previous value
    fn insert(&mut self, key: Box<[u8]>, value: Bytes) -> Option<Bytes>;

    /// Look up a key
    fn get(&self, key: &[u8]) -> Option<&Bytes>;

    /// Number of entries
    fn len(&self) -> usize;

    /// Drop all entries
    fn clear(&mut self);

    /// Snapshot of all keys, in the map's iteration order
    fn keys(&self) -> Vec<Box<[u8]>>;
}

impl StoreMap for BTreeMap<Box<[u8]>, Bytes> {
    fn insert(&mut self, key: Box<[u8]>, value: Bytes) -> Option<Bytes> {
        BTreeMap::insert(self, key, value)
    }

    fn get(&self, key: &[u8]) -> Option<&Bytes> {
        BTreeMap::get(self, key)
    }

    fn len(&self) -> usize {
        BTreeMap::len(self)
    }

    fn clear(&mut self) {
        BTreeMap::clear(self)
    }

    fn keys(&self) -> Vec<Box<[u8]>> {
        BTreeMap::keys(self).cloned().collect()
    }
}

impl StoreMap for HashMap<Box<[u8]>, Bytes, RandomState> {
    fn insert(&mut self, key: Box<[u8]>, value: Bytes) -> Option<Bytes> {
        HashMap::insert(self, key, value)
    }

    fn get(&self, key: &[u8]) -> Option<&Bytes> {
        HashMap::get(self, key)
    }

    fn len(&self) -> usize {
        HashMap::len(self)
    }

    fn clear(&mut self) {
        HashMap::clear(self)
    }

    fn keys(&self) -> Vec<Box<[u8]>> {
        HashMap::keys(self).cloned().collect()
    }
}

/// Store kept in ascending key order
pub type OrderedStore = Store<BTreeMap<Box<[u8]>, Bytes>>;

/// Store backed by an AHash hash map
pub type HashStore = Store<HashMap<Box<[u8]>, Bytes, RandomState>>;

/// One key/value mapping behind its own reader/writer lock
#[derive(Debug, Default)]
pub struct Store<M> {
    pub(crate) map: RwLock<M>,
}

impl<M: StoreMap> Store<M> {
    /// Create an empty store
    pub fn new() -> Self {
        Self {
            map: RwLock::new(M::default()),
        }
    }

    /// Insert or overwrite the entry for `key`.
    ///
    /// Holds the write lock for the whole mutation, so readers see either
    /// the old value or the new one.
    pub fn put(&self, key: impl AsRef<[u8]>, value: impl Into<Bytes>) {
        let key: Box<[u8]> = key.as_ref().into();
        let value = value.into();

        let mut map = self.map.write();
        map.insert(key, value);
    }

    /// Get the value for `key`, or `None` if it was never stored
    pub fn get(&self, key: impl AsRef<[u8]>) -> Option<Bytes> {
        let map = self.map.read();
        map.get(key.as_ref()).cloned()
    }

    /// Get the current number of entries
    pub fn len(&self) -> usize {
        self.map.read().len()
    }

    /// Check if the store is empty
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Remove every entry
    pub fn clear(&self) {
        self.map.write().clear();
    }

    /// Snapshot of the stored keys
    pub fn keys(&self) -> Vec<Box<[u8]>> {
        self.map.read().keys()
    }
}
