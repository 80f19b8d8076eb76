//! A fixed-capacity object pool: preallocated storage for up to `CAPACITY` values of one type,
//! from which values can be requested and released in constant time without going through the
//! global allocator.
//!
//! This crate provides [`FixedPool`], which hands out [`Pooled`] handles. A handle owns exactly
//! one slot of the pool; dropping it drops the value and returns the slot, exactly once.
//!
//! # Features
//!
//! - **Fixed capacity**: The capacity is a const generic; storage for all slots is allocated
//!   once when the pool is created and never grows, shrinks or moves.
//! - **Self-releasing handles**: [`Pooled`] cannot be cloned or copied, so a slot can never be
//!   released twice. Moving a handle moves the release obligation with it.
//! - **Borrow-checked lifetimes**: Handles borrow the pool, so the pool always outlives them.
//! - **Thread-safe**: Requests and releases may happen concurrently from any number of threads.
//! - **Recoverable exhaustion**: Requesting from a full pool returns
//!   [`Error::CapacityExhausted`] and leaves the pool untouched.
//! - **Last in, first out reuse**: The most recently released slot is the next one handed out.
//! - **Stable addresses**: Values never move while in the pool and can be accessed pinned.
//!
//! # Example
//!
//! ```rust
//! use fixed_pool::{Error, FixedPool};
//!
//! #[derive(Debug, Default, PartialEq)]
//! struct Particle {
//!     id: u32,
//!     mass: f32,
//!     velocity: f64,
//! }
//!
//! let pool = FixedPool::<Particle, 2>::new();
//!
//! let heavy = pool.request(Particle { id: 1, mass: 2.5, velocity: 3.3 })?;
//! assert_eq!(heavy.id, 1);
//!
//! {
//!     let at_rest = pool.request_default()?;
//!     assert_eq!(*at_rest, Particle::default());
//!     assert!(pool.is_full());
//!
//!     assert!(matches!(
//!         pool.request_default(),
//!         Err(Error::CapacityExhausted { capacity: 2 })
//!     ));
//! }
//!
//! // The inner handle went out of scope and released its slot.
//! assert_eq!(pool.size(), 1);
//! # Ok::<(), Error>(())
//! ```
//!
//! Sharing one pool between threads:
//!
//! ```rust
//! use std::thread;
//!
//! use fixed_pool::FixedPool;
//!
//! let pool = FixedPool::<u64, 8>::new();
//!
//! thread::scope(|s| {
//!     for n in 0..4 {
//!         let pool = &pool;
//!         s.spawn(move || {
//!             let value = pool.request(n).expect("4 threads never exhaust 8 slots");
//!             assert_eq!(*value, n);
//!         });
//!     }
//! });
//!
//! assert!(pool.is_empty());
//! ```

mod builder;
mod drop_policy;
mod error;
mod free_slot_stack;
mod pool;
mod pooled;
mod slot_arena;

pub use builder::*;
pub use drop_policy::*;
pub use error::*;
pub(crate) use free_slot_stack::*;
pub use pool::*;
pub use pooled::*;
pub(crate) use slot_arena::*;
