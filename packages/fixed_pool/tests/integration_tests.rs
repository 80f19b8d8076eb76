//! Integration tests for the `fixed_pool` package.
//!
//! These tests exercise `FixedPool` and `Pooled` through the public API only, including long
//! random request/release sequences and contention from many threads.

use std::collections::HashSet;
use std::sync::Mutex;

use fixed_pool::{Error, FixedPool, Pooled};
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use testing::{run_on_threads, with_watchdog};

const RNG_SEED: u64 = 2049;

#[test]
fn random_sequence_matches_model() {
    const CAPACITY: usize = 16;

    let pool = FixedPool::<u64, CAPACITY>::new();
    let mut rng = SmallRng::seed_from_u64(RNG_SEED);

    // Values we expect to find behind each live handle, in the same order as `live`.
    let mut live: Vec<Pooled<'_, u64, CAPACITY>> = Vec::new();
    let mut expected: Vec<u64> = Vec::new();

    for _ in 0..10_000 {
        if rng.random_bool(0.55) {
            let value = rng.random::<u64>();
            let size_before = pool.size();

            match pool.request(value) {
                Ok(handle) => {
                    assert!(size_before < CAPACITY);
                    assert_eq!(*handle, value);
                    live.push(handle);
                    expected.push(value);
                }
                Err(Error::CapacityExhausted { capacity }) => {
                    assert_eq!(capacity, CAPACITY);
                    assert_eq!(size_before, CAPACITY);
                    assert_eq!(pool.size(), CAPACITY);
                }
                Err(other) => panic!("unexpected error: {other}"),
            }
        } else if !live.is_empty() {
            let victim = rng.random_range(0..live.len());
            drop(live.swap_remove(victim));
            expected.swap_remove(victim);
        }

        assert_eq!(pool.size(), live.len());
        assert_eq!(pool.is_full(), live.len() == CAPACITY);
        assert_eq!(pool.capacity(), CAPACITY);

        for (handle, value) in live.iter().zip(&expected) {
            assert_eq!(**handle, *value);
        }
    }
}

/// Counts how many times the value with a given id has been dropped.
struct Tracked<'a> {
    id: usize,
    drops: &'a Mutex<Vec<usize>>,
}

impl Drop for Tracked<'_> {
    fn drop(&mut self) {
        self.drops.lock().unwrap()[self.id] += 1;
    }
}

#[test]
fn random_leaks_are_dropped_exactly_once_with_pool() {
    const CAPACITY: usize = 8;
    const VALUES: usize = 1_000;

    let drops = Mutex::new(vec![0_usize; VALUES]);
    let mut rng = SmallRng::seed_from_u64(RNG_SEED);

    {
        let pool = FixedPool::<Tracked<'_>, CAPACITY>::new();
        let mut live = Vec::new();

        for id in 0..VALUES {
            if let Ok(handle) = pool.request(Tracked { id, drops: &drops }) {
                live.push(handle);
            }

            if live.len() > 1 && rng.random_bool(0.5) {
                let victim = live.swap_remove(rng.random_range(0..live.len()));

                // Leaked values stay in their slot until the pool goes away.
                if rng.random_bool(0.01) {
                    std::mem::forget(victim);
                } else {
                    drop(victim);
                }
            }

            if pool.is_full() {
                live.clear();
            }
        }

        drop(live);
    }

    // Values rejected by a full pool are dropped on the spot, so every value drops exactly once.
    assert!(drops.lock().unwrap().iter().all(|&count| count == 1));
}

#[test]
fn released_slot_is_reused_immediately() {
    let pool = FixedPool::<[u8; 32], 4>::new();

    let _a = pool.request([1; 32]).unwrap();
    let b = pool.request([2; 32]).unwrap();
    let _c = pool.request([3; 32]).unwrap();

    let b_address = b.ptr();
    drop(b);

    let d = pool.request([4; 32]).unwrap();
    assert_eq!(d.ptr(), b_address);
    assert_eq!(*d, [4; 32]);
}

#[test]
fn handles_stored_in_collections() {
    let pool = FixedPool::<String, 8>::new();

    let mut names: Vec<_> = ["alice", "bob", "charlie"]
        .into_iter()
        .map(|name| pool.request(name.to_string()).unwrap())
        .collect();

    assert_eq!(pool.len(), 3);

    names.retain(|name| name.as_str() != "bob");
    assert_eq!(pool.len(), 2);

    let joined: Vec<&str> = names.iter().map(|name| name.as_str()).collect();
    assert_eq!(joined, ["alice", "charlie"]);
}

#[test]
fn error_is_reported_through_question_mark() {
    fn fill(pool: &FixedPool<u32, 2>) -> fixed_pool::Result<Vec<Pooled<'_, u32, 2>>> {
        let mut handles = Vec::new();

        for n in 0..3 {
            handles.push(pool.request(n)?);
        }

        Ok(handles)
    }

    let pool = FixedPool::<u32, 2>::new();

    assert_eq!(
        fill(&pool).unwrap_err(),
        Error::CapacityExhausted { capacity: 2 }
    );

    // The handles acquired before the failure were dropped with the partial vector.
    assert!(pool.is_empty());
}

#[cfg_attr(miri, ignore)] // Too slow under Miri.
#[test]
fn concurrent_cycles_never_share_a_slot() {
    with_watchdog(|| {
        const CAPACITY: usize = 8;
        const THREADS: usize = 6;
        const ROUNDS: usize = 2_000;

        let pool = FixedPool::<usize, CAPACITY>::new();
        let live_addresses = Mutex::new(HashSet::new());

        run_on_threads(THREADS, |thread_index| {
            let mut held = Vec::new();

            for round in 0..ROUNDS {
                let value = thread_index * ROUNDS + round;

                match pool.request(value) {
                    Ok(handle) => {
                        let address = handle.ptr().addr().get();

                        assert!(
                            live_addresses.lock().unwrap().insert(address),
                            "slot {address:#x} handed out twice"
                        );

                        assert_eq!(*handle, value);
                        held.push(handle);
                    }
                    Err(Error::CapacityExhausted { .. }) => {}
                    Err(other) => panic!("unexpected error: {other}"),
                }

                // Hold only a few slots per thread so that the pool regularly runs dry but
                // every thread still makes progress.
                let should_release = held.len() > 2 || round % 3 == 0;

                if should_release {
                    if let Some(handle) = held.pop() {
                        // Forget the address before the slot goes back, or another thread could
                        // legitimately receive it while we still have it recorded.
                        assert!(live_addresses.lock().unwrap().remove(&handle.ptr().addr().get()));
                        drop(handle);
                    }
                }

                assert!(pool.size() <= CAPACITY);
            }

            for handle in held {
                assert!(live_addresses.lock().unwrap().remove(&handle.ptr().addr().get()));
            }
        });

        assert!(pool.is_empty());
        assert!(live_addresses.lock().unwrap().is_empty());
        assert_eq!(pool.capacity(), CAPACITY);
    });
}

#[cfg_attr(miri, ignore)] // Too slow under Miri.
#[test]
fn concurrent_fill_respects_capacity() {
    with_watchdog(|| {
        const CAPACITY: usize = 10;
        const THREADS: usize = 4;

        let pool = FixedPool::<usize, CAPACITY>::new();

        thread_fill(&pool, THREADS);

        assert!(pool.is_empty());
    });
}

fn thread_fill<const CAPACITY: usize>(pool: &FixedPool<usize, CAPACITY>, threads: usize) {
    let barrier = std::sync::Barrier::new(threads);

    // Every thread grabs as many slots as it can and holds them until all threads are done, so
    // the total number of successful requests must be exactly the capacity.
    let acquired = std::thread::scope(|s| {
        let workers: Vec<_> = (0..threads)
            .map(|_| {
                let barrier = &barrier;

                s.spawn(move || {
                    let mut held = Vec::new();

                    while let Ok(handle) = pool.request(held.len()) {
                        held.push(handle);
                    }

                    let count = held.len();
                    barrier.wait();
                    count
                })
            })
            .collect();

        workers
            .into_iter()
            .map(|worker| worker.join().unwrap())
            .sum::<usize>()
    });

    assert_eq!(acquired, CAPACITY);
}
