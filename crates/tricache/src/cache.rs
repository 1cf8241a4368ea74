//! Cache: three independently locked stores plus lookup diagnostics

use std::fmt;
use std::time::Duration;

use bytes::Bytes;

use crate::stats::LookupStats;
use crate::store::{HashStore, OrderedStore};
use crate::timer::{time, LatencySlot};

/// Names one of the three stores a `Cache` owns
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreKind {
    /// Ordered text store
    Ordered,
    /// Hash text store
    Hash,
    /// Binary blob store
    Blob,
}

impl fmt::Display for StoreKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            StoreKind::Ordered => "ordered",
            StoreKind::Hash => "hash",
            StoreKind::Blob => "blob",
        };
        f.write_str(name)
    }
}

/// In-memory cache composed of an ordered store, a hash store and a blob store.
///
/// Each store has its own lock. Writing a large blob never holds up a
/// lookup in the ordered or hash store.
///
/// Lookup latencies are kept per cache, one most-recent slot per lookup
/// kind. With several threads looking up at once the slot holds whichever
/// measurement was written last; treat it as diagnostic data only.
#[derive(Debug, Default)]
pub struct Cache {
    /// Ordered text entries
    ordered: OrderedStore,

    /// Hashed text entries
    hashed: HashStore,

    /// Opaque binary payloads
    blobs: HashStore,

    ordered_latency: LatencySlot,
    hash_latency: LatencySlot,

    ordered_stats: LookupStats,
    hash_stats: LookupStats,
    blob_stats: LookupStats,
}

impl Cache {
    /// Create an empty cache
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or overwrite an entry in the ordered store
    pub fn populate_ordered(&self, key: impl AsRef<[u8]>, value: impl Into<Bytes>) {
        self.ordered.put(key, value);
    }

    /// Insert or overwrite an entry in the hash store
    pub fn populate_hash(&self, key: impl AsRef<[u8]>, value: impl Into<Bytes>) {
        self.hashed.put(key, value);
    }

    /// Store a binary payload
    ///
    /// # Arguments
    /// * `key` - Blob key
    /// * `data` - Payload; its length is taken from the buffer, so embedded
    ///   zero bytes are kept
    pub fn set_blob(&self, key: impl AsRef<[u8]>, data: impl Into<Bytes>) {
        self.blobs.put(key, data);
    }

    /// Fetch a binary payload
    ///
    /// # Returns
    /// * `Option<Bytes>` - The exact stored bytes, or `None` if absent
    pub fn get_blob(&self, key: impl AsRef<[u8]>) -> Option<Bytes> {
        let value = self.blobs.get(key);
        self.blob_stats.record(value.is_some());
        value
    }

    /// Look up a key in the ordered store and record how long the lookup took
    ///
    /// # Returns
    /// * `Option<Bytes>` - Stored value, or `None` if absent
    pub fn lookup_ordered(&self, key: impl AsRef<[u8]>) -> Option<Bytes> {
        let (value, elapsed) = time(|| self.ordered.get(key));
        self.ordered_latency.record(elapsed);
        self.ordered_stats.record(value.is_some());
        value
    }

    /// Look up a key in the hash store and record how long the lookup took
    ///
    /// # Returns
    /// * `Option<Bytes>` - Stored value, or `None` if absent
    pub fn lookup_hash(&self, key: impl AsRef<[u8]>) -> Option<Bytes> {
        let (value, elapsed) = time(|| self.hashed.get(key));
        self.hash_latency.record(elapsed);
        self.hash_stats.record(value.is_some());
        value
    }

    /// Duration of the most recent ordered lookup on this cache
    pub fn ordered_lookup_latency(&self) -> Duration {
        self.ordered_latency.last()
    }

    /// Duration of the most recent hash lookup on this cache
    pub fn hash_lookup_latency(&self) -> Duration {
        self.hash_latency.last()
    }

    /// Hit/miss counters for lookups against one store
    pub fn stats(&self, kind: StoreKind) -> &LookupStats {
        match kind {
            StoreKind::Ordered => &self.ordered_stats,
            StoreKind::Hash => &self.hash_stats,
            StoreKind::Blob => &self.blob_stats,
        }
    }

    /// Number of entries in one store
    pub fn len(&self, kind: StoreKind) -> usize {
        match kind {
            StoreKind::Ordered => self.ordered.len(),
            StoreKind::Hash => self.hashed.len(),
            StoreKind::Blob => self.blobs.len(),
        }
    }

    /// Check if all three stores are empty
    pub fn is_empty(&self) -> bool {
        self.ordered.is_empty() && self.hashed.is_empty() && self.blobs.is_empty()
    }

    /// Keys of the ordered store in ascending byte order
    pub fn ordered_keys(&self) -> Vec<Box<[u8]>> {
        self.ordered.keys()
    }
}
