// ==============================================
// CACHE CONCURRENCY TESTS (integration)
// ==============================================
//
// Multi-threaded checks on lost writes, torn reads and handle lifetime.

use std::sync::{Arc, Barrier};
use std::thread;
use std::time::Duration;

use tricache::{Cache, Registry, StoreKind};

const THREADS: usize = 16;

#[test]
fn distinct_keys_populated_concurrently_are_all_readable() {
    let cache = Arc::new(Cache::new());
    let barrier = Arc::new(Barrier::new(THREADS));

    let writers: Vec<_> = (0..THREADS)
        .map(|i| {
            let cache = Arc::clone(&cache);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                cache.populate_ordered(format!("k{i}"), format!("v{i}"));
                cache.populate_hash(format!("k{i}"), format!("v{i}"));
            })
        })
        .collect();
    for writer in writers {
        writer.join().unwrap();
    }

    let readers: Vec<_> = (0..THREADS)
        .map(|i| {
            let cache = Arc::clone(&cache);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                let expected = format!("v{i}");
                assert_eq!(
                    cache.lookup_ordered(format!("k{i}")).as_deref(),
                    Some(expected.as_bytes())
                );
                assert_eq!(
                    cache.lookup_hash(format!("k{i}")).as_deref(),
                    Some(expected.as_bytes())
                );
            })
        })
        .collect();
    for reader in readers {
        reader.join().unwrap();
    }

    assert_eq!(cache.len(StoreKind::Ordered), THREADS);
    assert_eq!(cache.len(StoreKind::Hash), THREADS);
}

#[test]
fn readers_never_observe_partial_overwrites() {
    let cache = Arc::new(Cache::new());
    let first = vec![b'a'; 4096];
    let second = vec![b'b'; 4096];
    cache.set_blob("payload", first.clone());

    let barrier = Arc::new(Barrier::new(2));

    let writer = {
        let cache = Arc::clone(&cache);
        let barrier = Arc::clone(&barrier);
        let (first, second) = (first.clone(), second.clone());
        thread::spawn(move || {
            barrier.wait();
            for i in 0..2_000 {
                let next = if i % 2 == 0 { &second } else { &first };
                cache.set_blob("payload", next.clone());
            }
        })
    };

    let reader = {
        let cache = Arc::clone(&cache);
        let barrier = Arc::clone(&barrier);
        thread::spawn(move || {
            barrier.wait();
            for _ in 0..2_000 {
                let blob = cache.get_blob("payload").unwrap();
                assert_eq!(blob.len(), 4096);
                assert!(blob.iter().all(|&b| b == blob[0]));
            }
        })
    };

    writer.join().unwrap();
    reader.join().unwrap();
}

#[test]
fn concurrent_lookups_leave_a_recorded_latency() {
    let cache = Arc::new(Cache::new());
    for i in 0..1_000 {
        cache.populate_hash(format!("key_{i}"), format!("value_{i}"));
    }

    let handles: Vec<_> = (0..8)
        .map(|t| {
            let cache = Arc::clone(&cache);
            thread::spawn(move || {
                for i in 0..500 {
                    let key = format!("key_{}", (i * 7 + t) % 1_000);
                    assert!(cache.lookup_hash(&key).is_some());
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    // Whichever thread wrote last, the slot holds a real measurement.
    assert!(cache.hash_lookup_latency() > Duration::ZERO);
    assert_eq!(cache.ordered_lookup_latency(), Duration::ZERO);
    assert_eq!(cache.stats(StoreKind::Hash).hits(), 8 * 500);
    assert_eq!(cache.stats(StoreKind::Hash).misses(), 0);
}

#[test]
fn registry_create_and_destroy_from_many_threads() {
    let registry = Arc::new(Registry::new());
    let barrier = Arc::new(Barrier::new(THREADS));

    let workers: Vec<_> = (0..THREADS)
        .map(|i| {
            let registry = Arc::clone(&registry);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                for round in 0..50 {
                    let handle = registry.create().unwrap();
                    let cache = registry.get(handle).unwrap();
                    let key = format!("t{i}-r{round}");
                    cache.populate_ordered(&key, "x");
                    assert_eq!(cache.lookup_ordered(&key).as_deref(), Some(&b"x"[..]));
                    registry.destroy(handle).unwrap();
                    assert!(registry.get(handle).is_err());
                }
            })
        })
        .collect();
    for worker in workers {
        worker.join().unwrap();
    }

    assert!(registry.is_empty());
}
