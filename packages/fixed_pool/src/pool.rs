use std::fmt;
use std::marker::PhantomData;
use std::ptr::NonNull;
use std::thread;

use parking_lot::Mutex;
use scopeguard::ScopeGuard;
use tracing::{debug, trace, warn};

use crate::{DropPolicy, Error, FixedPoolBuilder, FreeSlotStack, Pooled, Result, SlotArena};

/// A thread-safe object pool with room for exactly `CAPACITY` values of type `T`.
///
/// All storage is allocated up front when the pool is created. Requesting a slot moves a value
/// into preallocated memory and returns a [`Pooled`] handle to it; dropping the handle drops the
/// value and returns the slot to the pool. Neither operation touches the global allocator and
/// both run in constant time.
///
/// # Capacity
///
/// The capacity is part of the pool's type. When every slot is in use, requests fail with
/// [`Error::CapacityExhausted`] and leave the pool unchanged; a later request succeeds once a
/// handle has been dropped. The most recently released slot is always the next one reused.
///
/// # Thread safety
///
/// All bookkeeping sits behind a single mutex held only for a handful of instructions per
/// operation. Values are moved in and dropped outside of the lock. Share the pool by reference
/// (e.g. with [`std::thread::scope`] or by putting it in an `Arc`) to request slots from several
/// threads at once.
///
/// # Handle lifetime
///
/// Handles borrow the pool, so the compiler guarantees that the pool outlives them. The only
/// way to still have slots in use when the pool is dropped is to leak a handle; the
/// [`DropPolicy`] decides what happens in that case.
///
/// # Example
///
/// ```
/// use fixed_pool::{Error, FixedPool};
///
/// let pool = FixedPool::<u64, 2>::new();
///
/// let first = pool.request(1).unwrap();
/// let second = pool.request(2).unwrap();
/// assert!(pool.is_full());
///
/// assert_eq!(
///     pool.request(3).unwrap_err(),
///     Error::CapacityExhausted { capacity: 2 }
/// );
///
/// drop(second);
/// assert_eq!(pool.size(), 1);
/// assert_eq!(*first, 1);
/// ```
pub struct FixedPool<T, const CAPACITY: usize> {
    arena: SlotArena<T, CAPACITY>,

    /// The free-slot stack doubles as the in-use counter: its cursor is the number of slots
    /// currently handed out.
    free_slots: Mutex<FreeSlotStack<CAPACITY>>,

    drop_policy: DropPolicy,

    name: &'static str,

    /// Handles write values of type `T` into slots that the pool may later drop, so `T` must
    /// not be shortened through variance.
    _invariant: PhantomData<fn(T) -> T>,
}

impl<T, const CAPACITY: usize> FixedPool<T, CAPACITY> {
    /// The number of slots in every pool of this type.
    pub const CAPACITY: usize = CAPACITY;

    /// # Panics
    ///
    /// Panics if `T` is zero-sized or `CAPACITY` is zero.
    #[must_use]
    pub(crate) fn new_inner(drop_policy: DropPolicy, name: &'static str) -> Self {
        let pool = Self {
            arena: SlotArena::new(),
            free_slots: Mutex::new(FreeSlotStack::new()),
            drop_policy,
            name,
            _invariant: PhantomData,
        };

        debug!(pool = name, capacity = CAPACITY, "created fixed pool");

        pool
    }

    /// Creates a new [`FixedPool`] with the default configuration, allocating storage for all
    /// `CAPACITY` slots.
    ///
    /// # Panics
    ///
    /// Panics if `T` is zero-sized or `CAPACITY` is zero.
    ///
    /// # Example
    ///
    /// ```
    /// use fixed_pool::FixedPool;
    ///
    /// let pool = FixedPool::<String, 32>::new();
    ///
    /// assert_eq!(pool.capacity(), 32);
    /// assert!(pool.is_empty());
    /// ```
    #[must_use]
    pub fn new() -> Self {
        Self::builder().build()
    }

    /// Returns a builder for creating a [`FixedPool`] with custom configuration.
    pub fn builder() -> FixedPoolBuilder<T, CAPACITY> {
        FixedPoolBuilder::new()
    }

    /// The number of slots in the pool. This never changes.
    #[must_use]
    #[inline]
    pub const fn capacity(&self) -> usize {
        CAPACITY
    }

    /// The number of slots currently in use.
    ///
    /// Under concurrent use this is a snapshot that may already be outdated when it returns.
    #[must_use]
    pub fn size(&self) -> usize {
        self.free_slots.lock().in_use()
    }

    /// The number of slots currently in use. Same as [`size()`][Self::size].
    #[must_use]
    pub fn len(&self) -> usize {
        self.size()
    }

    /// Whether no slot is currently in use.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.size() == 0
    }

    /// Whether every slot is in use, i.e. whether the next request would fail.
    ///
    /// Under concurrent use this is a snapshot that may already be outdated when it returns.
    #[must_use]
    pub fn is_full(&self) -> bool {
        self.free_slots.lock().is_exhausted()
    }

    /// The number of slots that can still be requested.
    #[must_use]
    pub fn available(&self) -> usize {
        CAPACITY
            .checked_sub(self.size())
            .expect("in-use count never exceeds capacity")
    }

    /// The name this pool uses in log events.
    #[must_use]
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// The [`DropPolicy`] the pool was created with.
    #[must_use]
    pub fn drop_policy(&self) -> DropPolicy {
        self.drop_policy
    }

    /// Moves `value` into a free slot and returns a handle that owns it.
    ///
    /// # Errors
    ///
    /// Returns [`Error::CapacityExhausted`] if every slot is in use. The value is dropped and
    /// the pool is left unchanged.
    ///
    /// # Example
    ///
    /// ```
    /// use fixed_pool::FixedPool;
    ///
    /// let pool = FixedPool::<String, 4>::new();
    ///
    /// let mut greeting = pool.request("Hello".to_string())?;
    /// greeting.push_str(", world");
    ///
    /// assert_eq!(*greeting, "Hello, world");
    /// # Ok::<(), fixed_pool::Error>(())
    /// ```
    pub fn request(&self, value: T) -> Result<Pooled<'_, T, CAPACITY>> {
        self.request_with(|| value)
    }

    /// Reserves a free slot, then calls `f` to create the value that goes into it.
    ///
    /// `f` is only called once a slot is guaranteed, so a failed request never creates a value.
    /// If `f` panics, the reserved slot is returned to the pool before the panic propagates.
    ///
    /// # Errors
    ///
    /// Returns [`Error::CapacityExhausted`] without calling `f` if every slot is in use.
    ///
    /// # Example
    ///
    /// ```
    /// use fixed_pool::FixedPool;
    ///
    /// let pool = FixedPool::<Vec<u8>, 4>::new();
    ///
    /// let buffer = pool.request_with(|| Vec::with_capacity(1024))?;
    /// assert!(buffer.capacity() >= 1024);
    /// # Ok::<(), fixed_pool::Error>(())
    /// ```
    pub fn request_with<F>(&self, f: F) -> Result<Pooled<'_, T, CAPACITY>>
    where
        F: FnOnce() -> T,
    {
        let index = self.acquire_index()?;

        let reservation = scopeguard::guard(index, |index| {
            warn!(
                pool = self.name,
                index, "value construction panicked, returning reserved slot"
            );
            self.release_index(index);
        });

        let value = f();

        let index = ScopeGuard::into_inner(reservation);
        let ptr = self.arena.slot_ptr(index);

        // SAFETY: The index was just taken off the free-slot stack, so the slot is vacant and
        // nobody else can access it until it is pushed back, which only the handle does.
        unsafe {
            ptr.write(value);
        }

        // SAFETY: The slot at `ptr` belongs to this pool, holds a live value and is owned by
        // nobody else; the handle takes over the obligation to release it.
        Ok(unsafe { Pooled::new(self, ptr) })
    }

    /// Requests a slot holding the default value of `T`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::CapacityExhausted`] if every slot is in use.
    ///
    /// # Example
    ///
    /// ```
    /// use fixed_pool::FixedPool;
    ///
    /// let pool = FixedPool::<(u32, f64), 4>::new();
    ///
    /// let zeroed = pool.request_default()?;
    /// assert_eq!(*zeroed, (0, 0.0));
    /// # Ok::<(), fixed_pool::Error>(())
    /// ```
    pub fn request_default(&self) -> Result<Pooled<'_, T, CAPACITY>>
    where
        T: Default,
    {
        self.request_with(T::default)
    }

    fn acquire_index(&self) -> Result<usize> {
        let mut free_slots = self.free_slots.lock();

        let Some(index) = free_slots.acquire() else {
            drop(free_slots);

            debug!(
                pool = self.name,
                capacity = CAPACITY,
                "request rejected, all slots in use"
            );

            return Err(Error::CapacityExhausted { capacity: CAPACITY });
        };

        trace!(
            pool = self.name,
            index,
            in_use = free_slots.in_use(),
            "slot acquired"
        );

        Ok(index)
    }

    /// Returns the slot at `ptr` to the pool. Called by the handle once the value in the slot
    /// has been dropped or moved out.
    ///
    /// # Panics
    ///
    /// Panics if `ptr` does not address a slot of this pool.
    pub(crate) fn release(&self, ptr: NonNull<T>) {
        let index = self.arena.index_of(ptr);
        self.release_index(index);
    }

    fn release_index(&self, index: usize) {
        let mut free_slots = self.free_slots.lock();
        free_slots.release(index);

        trace!(
            pool = self.name,
            index,
            in_use = free_slots.in_use(),
            "slot released"
        );
    }

    #[must_use]
    pub(crate) fn slot_index(&self, ptr: NonNull<T>) -> usize {
        self.arena.index_of(ptr)
    }
}

impl<T, const CAPACITY: usize> Default for FixedPool<T, CAPACITY> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T, const CAPACITY: usize> Drop for FixedPool<T, CAPACITY> {
    fn drop(&mut self) {
        let free_slots = self.free_slots.get_mut();

        #[cfg(debug_assertions)]
        free_slots.integrity_check();

        let in_use = free_slots.in_use();

        if in_use == 0 {
            debug!(pool = self.name, "dropped fixed pool");
            return;
        }

        if self.drop_policy == DropPolicy::MayDropItems {
            warn!(
                pool = self.name,
                in_use, "dropping fixed pool with leaked values still in use"
            );
        }

        // Leaked values are dropped under either policy. Their memory is about to be freed and
        // a value that was pinned through its handle must be dropped before that happens.
        for &index in free_slots.in_use_indices() {
            // SAFETY: Every index below the stack cursor holds a live value whose handle was
            // leaked. The pool is being dropped, so nothing can reach the value.
            unsafe {
                self.arena.slot_ptr(index).drop_in_place();
            }
        }

        // If we are already panicking, we do not want to panic again because that will
        // simply obscure whatever the original panic was, leading to debug difficulties.
        if self.drop_policy == DropPolicy::MustNotDropItems && !thread::panicking() {
            panic!(
                "dropped fixed pool '{}' with {in_use} slots still in use and a policy that says it must be empty when dropped",
                self.name
            );
        }
    }
}
