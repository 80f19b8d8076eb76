#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
#![cfg_attr(coverage_nightly, coverage(off))] // This is all test code, no need to test it.

//! Private helpers for testing the fixed pool packages.

use std::panic;
use std::sync::mpsc::{self, RecvTimeoutError};
use std::thread;
use std::time::Duration;

/// How long a test may run before the watchdog declares it hung.
///
/// Miri is dramatically slower at thread synchronization, so it gets more room.
fn watchdog_timeout() -> Duration {
    if cfg!(miri) {
        Duration::from_secs(60)
    } else {
        Duration::from_secs(10)
    }
}

/// Runs a test body on a separate thread and fails the test if it does not finish in time.
///
/// Pool tests that block on the pool lock from many threads can deadlock if the locking logic
/// is broken. Without a watchdog such a test would hang the whole test run instead of failing.
///
/// Panics from the test body are propagated unchanged. When the `MUTATION_TESTING` environment
/// variable is `1` the body runs directly, so that mutation testing can observe hangs itself.
///
/// # Panics
///
/// Panics if the test body does not complete within the timeout.
///
/// # Example
///
/// ```rust
/// use testing::with_watchdog;
///
/// let answer = with_watchdog(|| 6 * 7);
/// assert_eq!(answer, 42);
/// ```
pub fn with_watchdog<F, R>(test_fn: F) -> R
where
    F: FnOnce() -> R + Send + 'static,
    R: Send + 'static,
{
    if std::env::var("MUTATION_TESTING").as_deref() == Ok("1") {
        return test_fn();
    }

    let (done_tx, done_rx) = mpsc::channel();

    let worker = thread::Builder::new()
        .name("watched-test".to_string())
        .spawn(move || {
            // If the receiver is gone, the watchdog already gave up on us.
            drop(done_tx.send(test_fn()));
        })
        .expect("failed to spawn test thread: thread spawning failure is not supported");

    let timeout = watchdog_timeout();

    match done_rx.recv_timeout(timeout) {
        Ok(result) => {
            worker
                .join()
                .expect("test thread cannot panic after reporting its result");
            result
        }
        Err(RecvTimeoutError::Timeout) => {
            panic!("test did not complete within {timeout:?}, it is probably deadlocked");
        }
        Err(RecvTimeoutError::Disconnected) => match worker.join() {
            Ok(()) => panic!("test thread exited without reporting a result"),
            Err(payload) => panic::resume_unwind(payload),
        },
    }
}

/// Runs `f` on `threads` threads at the same time and returns the results in thread order.
///
/// Each invocation receives the index of its thread. All threads are released together through
/// a barrier to maximize contention on whatever they share.
///
/// # Panics
///
/// Panics if any of the threads panics.
///
/// # Example
///
/// ```rust
/// use testing::run_on_threads;
///
/// let doubled = run_on_threads(3, |index| index * 2);
/// assert_eq!(doubled, vec![0, 2, 4]);
/// ```
pub fn run_on_threads<F, R>(threads: usize, f: F) -> Vec<R>
where
    F: Fn(usize) -> R + Sync,
    R: Send,
{
    let barrier = std::sync::Barrier::new(threads);

    thread::scope(|s| {
        let handles: Vec<_> = (0..threads)
            .map(|index| {
                let barrier = &barrier;
                let f = &f;

                s.spawn(move || {
                    barrier.wait();
                    f(index)
                })
            })
            .collect();

        handles
            .into_iter()
            .map(|handle| match handle.join() {
                Ok(result) => result,
                Err(payload) => panic::resume_unwind(payload),
            })
            .collect()
    })
}
