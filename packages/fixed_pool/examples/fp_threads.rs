//! Sharing one `FixedPool` between several threads.
//!
//! Each worker requests a buffer from a pool that is smaller than the number of workers, so some
//! requests fail and are retried by the caller.

use std::thread;
use std::time::Duration;

use fixed_pool::FixedPool;

const WORKERS: usize = 6;

fn main() {
    let pool = FixedPool::<[u8; 4096], 4>::builder()
        .name("scratch_buffers")
        .build();

    thread::scope(|s| {
        for worker in 0..WORKERS {
            let pool = &pool;

            s.spawn(move || {
                // The pool never retries on its own; waiting for a free slot is up to us.
                let mut buffer = loop {
                    match pool.request_with(|| [0; 4096]) {
                        Ok(buffer) => break buffer,
                        Err(error) => {
                            println!("worker {worker}: {error}, retrying");
                            thread::sleep(Duration::from_millis(1));
                        }
                    }
                };

                buffer.fill(u8::try_from(worker).expect("worker count fits in a byte"));
                thread::sleep(Duration::from_millis(5));

                println!("worker {worker} used slot {}", buffer.index());
            });
        }
    });

    println!("all workers done, {} slots in use", pool.size());
}
