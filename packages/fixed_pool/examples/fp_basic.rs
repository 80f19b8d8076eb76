//! Basic usage of the `fixed_pool` crate:
//!
//! * Creating a pool.
//! * Requesting slots.
//! * Handling a full pool.
//! * Releasing slots by dropping handles.

use fixed_pool::{Error, FixedPool};

#[derive(Debug, Default)]
struct Order {
    id: u32,
    quantity: f32,
    price: f64,
}

fn main() {
    let pool = FixedPool::<Order, 2>::new();

    // Requesting a slot moves the value into preallocated storage and hands back a handle.
    let buy = pool
        .request(Order {
            id: 1,
            quantity: 2.5,
            price: 3.3,
        })
        .expect("pool starts empty");

    println!(
        "Pool holds {} of {} orders; first order: {buy:?}",
        pool.size(),
        pool.capacity()
    );

    {
        // No-argument requests produce the default value.
        let blank = pool.request_default().expect("one slot is still free");
        println!("Blank order: {blank:?}, pool full: {}", pool.is_full());

        match pool.request_default() {
            Err(Error::CapacityExhausted { capacity }) => {
                println!("Pool of {capacity} is exhausted, try again later");
            }
            Err(other) => println!("Unexpected error: {other}"),
            Ok(_) => unreachable!("the pool is full"),
        }

        // `blank` goes out of scope here and its slot returns to the pool.
    }

    let reused = pool.request_default().expect("a slot was just released");
    println!(
        "Reused slot {} for order {}, {} orders in the pool",
        reused.index(),
        reused.id,
        pool.size()
    );

    println!(
        "First order is still intact: {} x {} @ {}",
        buy.id, buy.quantity, buy.price
    );
}
