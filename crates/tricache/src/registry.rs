//! Handle registry for caches shared across a foreign boundary
//!
//! Callers outside Rust never see a pointer. They get a `Handle`: a slot
//! index in the low 32 bits and that slot's generation in the high 32 bits.
//! Destroying a cache bumps the slot generation, so a stale handle is
//! rejected even after its slot has been reused. A slot that has used up
//! every generation is left empty for good.

use std::fmt;
use std::sync::{Arc, OnceLock};

use parking_lot::RwLock;
use tracing::debug;

use crate::cache::Cache;
use crate::error::{Error, Result};

/// Opaque identifier for a live `Cache`. Zero is never a valid handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Handle(u64);

impl Handle {
    /// Rebuild a handle from the raw value a foreign caller passed in
    pub fn from_raw(raw: u64) -> Self {
        Handle(raw)
    }

    /// Raw value to hand to a foreign caller
    pub fn into_raw(self) -> u64 {
        self.0
    }

    fn new(index: u32, generation: u32) -> Self {
        Handle((u64::from(generation) << 32) | u64::from(index))
    }

    fn index(self) -> usize {
        (self.0 & 0xffff_ffff) as usize
    }

    fn generation(self) -> u32 {
        (self.0 >> 32) as u32
    }
}

impl fmt::Display for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

/// Registry slot; `cache` is `None` while the slot sits on the free list
struct Slot {
    generation: u32,
    cache: Option<Arc<Cache>>,
}

#[derive(Default)]
struct Slots {
    slots: Vec<Slot>,
    free_list: Vec<usize>,
    live: usize,
}

/// Table of live caches addressed by `Handle`
#[derive(Default)]
pub struct Registry {
    inner: RwLock<Slots>,
}

impl Registry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate a new, empty cache and return its handle
    ///
    /// # Returns
    /// * `Result<Handle>` - Handle of the new cache, or `Error::RegistryFull`
    pub fn create(&self) -> Result<Handle> {
        let cache = Arc::new(Cache::new());
        let mut inner = self.inner.write();

        let index = match inner.free_list.pop() {
            Some(index) => index,
            None => {
                let index = inner.slots.len();
                if index > u32::MAX as usize {
                    return Err(Error::RegistryFull);
                }
                inner.slots.push(Slot {
                    generation: 1,
                    cache: None,
                });
                index
            }
        };

        let slot = &mut inner.slots[index];
        slot.cache = Some(cache);
        let handle = Handle::new(index as u32, slot.generation);
        inner.live += 1;

        debug!(%handle, "cache created");
        Ok(handle)
    }

    /// Resolve a handle to its cache
    ///
    /// The returned `Arc` keeps the cache alive for the caller even if
    /// another thread destroys the handle meanwhile.
    ///
    /// # Returns
    /// * `Result<Arc<Cache>>` - The cache, or `Error::InvalidHandle`
    pub fn get(&self, handle: Handle) -> Result<Arc<Cache>> {
        let inner = self.inner.read();
        inner
            .slots
            .get(handle.index())
            .filter(|slot| slot.generation == handle.generation())
            .and_then(|slot| slot.cache.clone())
            .ok_or(Error::InvalidHandle(handle.into_raw()))
    }

    /// Release the cache behind `handle`. Succeeds at most once per handle.
    ///
    /// # Returns
    /// * `Result<()>` - Ok if released, `Error::InvalidHandle` if the handle
    ///   is unknown or already destroyed
    pub fn destroy(&self, handle: Handle) -> Result<()> {
        let mut inner = self.inner.write();
        let index = handle.index();

        let slot = match inner.slots.get_mut(index) {
            Some(slot) if slot.generation == handle.generation() && slot.cache.is_some() => slot,
            _ => return Err(Error::InvalidHandle(handle.into_raw())),
        };

        slot.cache = None;
        // A slot whose generation cannot advance is retired, never reused.
        match slot.generation.checked_add(1) {
            Some(next) => {
                slot.generation = next;
                inner.free_list.push(index);
            }
            None => debug!(index, "registry slot retired"),
        }
        inner.live -= 1;

        debug!(%handle, "cache destroyed");
        Ok(())
    }

    /// Number of live caches
    pub fn len(&self) -> usize {
        self.inner.read().live
    }

    /// Check if no cache is live
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Process-wide registry used by the foreign boundary
pub fn global() -> &'static Registry {
    static GLOBAL: OnceLock<Registry> = OnceLock::new();
    GLOBAL.get_or_init(Registry::new)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_and_get() {
        let registry = Registry::new();

        let handle = registry.create().unwrap();
        let cache = registry.get(handle).unwrap();
        cache.populate_hash("k", "v");

        let again = registry.get(handle).unwrap();
        assert_eq!(again.lookup_hash("k").as_deref(), Some(&b"v"[..]));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_handles_are_nonzero_and_distinct() {
        let registry = Registry::new();

        let a = registry.create().unwrap();
        let b = registry.create().unwrap();

        assert_ne!(a.into_raw(), 0);
        assert_ne!(b.into_raw(), 0);
        assert_ne!(a, b);
    }

    #[test]
    fn test_caches_do_not_share_stores() {
        let registry = Registry::new();
        let a = registry.create().unwrap();
        let b = registry.create().unwrap();

        registry.get(a).unwrap().populate_ordered("k", "from-a");

        assert_eq!(registry.get(b).unwrap().lookup_ordered("k"), None);
    }

    #[test]
    fn test_destroy_once() {
        let registry = Registry::new();
        let handle = registry.create().unwrap();

        registry.destroy(handle).unwrap();

        assert_eq!(
            registry.destroy(handle),
            Err(Error::InvalidHandle(handle.into_raw()))
        );
        assert!(registry.get(handle).is_err());
        assert!(registry.is_empty());
    }

    #[test]
    fn test_stale_handle_after_reuse() {
        let registry = Registry::new();
        let old = registry.create().unwrap();
        registry.destroy(old).unwrap();

        // Slot is reused with a new generation
        let new = registry.create().unwrap();
        assert_eq!(old.index(), new.index());
        assert_ne!(old, new);

        assert!(registry.get(old).is_err());
        assert!(registry.get(new).is_ok());
    }

    #[test]
    fn test_exhausted_slot_is_retired() {
        let registry = Registry::new();
        let first = registry.create().unwrap();
        let index = first.index();
        registry.inner.write().slots[index].generation = u32::MAX;
        let last = Handle::new(index as u32, u32::MAX);

        registry.destroy(last).unwrap();

        let next = registry.create().unwrap();
        assert_ne!(next.index(), index);
        assert!(registry.inner.read().free_list.is_empty());
        assert!(registry.get(first).is_err());
        assert!(registry.get(last).is_err());
        assert!(registry.destroy(last).is_err());
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_unknown_handles() {
        let registry = Registry::new();

        assert!(registry.get(Handle::from_raw(0)).is_err());
        assert!(registry.get(Handle::from_raw(0xdead_beef_0000_0007)).is_err());
        assert!(registry.destroy(Handle::from_raw(42)).is_err());
    }

    #[test]
    fn test_in_flight_cache_survives_destroy() {
        let registry = Registry::new();
        let handle = registry.create().unwrap();

        let cache = registry.get(handle).unwrap();
        registry.destroy(handle).unwrap();

        cache.set_blob("k", vec![7u8]);
        assert_eq!(cache.get_blob("k").as_deref(), Some(&[7u8][..]));
    }

    #[test]
    fn test_handle_roundtrip_raw() {
        let handle = Handle::new(3, 9);
        assert_eq!(handle.index(), 3);
        assert_eq!(handle.generation(), 9);
        assert_eq!(Handle::from_raw(handle.into_raw()), handle);
        assert_eq!(handle.to_string(), "0x900000003");
    }
}
