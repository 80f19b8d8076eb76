use std::fmt;
use std::marker::PhantomData;
use std::mem::ManuallyDrop;
use std::ops::{Deref, DerefMut};
use std::pin::Pin;
use std::ptr::NonNull;

use crate::FixedPool;

/// Exclusive ownership of one slot of a [`FixedPool`] and the value stored in it.
///
/// Returned by [`FixedPool::request()`] and its siblings. Dropping the handle drops the value and
/// returns the slot to the pool, exactly once. The handle cannot be cloned or copied, so no slot
/// can ever be released twice; moving the handle moves the release obligation along with it.
///
/// The handle borrows the pool, so the pool is guaranteed to outlive it.
///
/// # Thread safety
///
/// [`Pooled`] is [`Send`] if `T` is [`Send`], so a value requested on one thread may be used and
/// released on another. It is [`Sync`] if `T` is both [`Send`] and [`Sync`].
///
/// # Example
///
/// ```
/// use fixed_pool::FixedPool;
///
/// let pool = FixedPool::<Vec<u32>, 4>::new();
///
/// {
///     let mut numbers = pool.request(vec![1, 2])?;
///     numbers.push(3);
///
///     assert_eq!(*numbers, [1, 2, 3]);
///     assert_eq!(pool.size(), 1);
/// }
///
/// // The handle went out of scope, so the slot is free again.
/// assert_eq!(pool.size(), 0);
/// # Ok::<(), fixed_pool::Error>(())
/// ```
pub struct Pooled<'p, T, const CAPACITY: usize> {
    pool: &'p FixedPool<T, CAPACITY>,

    /// Address of the slot. Always points at a live value owned by this handle.
    ptr: NonNull<T>,

    _value: PhantomData<T>,
}

impl<'p, T, const CAPACITY: usize> Pooled<'p, T, CAPACITY> {
    /// # Safety
    ///
    /// `ptr` must address a slot of `pool` that holds an initialized value and that is not
    /// owned by any other handle.
    #[must_use]
    pub(crate) unsafe fn new(pool: &'p FixedPool<T, CAPACITY>, ptr: NonNull<T>) -> Self {
        Self {
            pool,
            ptr,
            _value: PhantomData,
        }
    }

    /// The address of the slot holding the value.
    ///
    /// The address stays the same for as long as the handle exists. After the handle is dropped
    /// the same address may be handed out again by a later request.
    #[must_use]
    #[inline]
    pub fn ptr(&self) -> NonNull<T> {
        self.ptr
    }

    /// The index of the slot holding the value, in `0..CAPACITY`.
    #[must_use]
    pub fn index(&self) -> usize {
        self.pool.slot_index(self.ptr)
    }

    /// The pool that issued this handle.
    #[must_use]
    pub fn pool(&self) -> &'p FixedPool<T, CAPACITY> {
        self.pool
    }

    /// Returns a pinned reference to the value.
    ///
    /// Values never move while they are in the pool, so pinning is always upheld.
    #[must_use]
    #[inline]
    pub fn as_pin(&self) -> Pin<&T> {
        // SAFETY: The value stays in its slot until the handle drops it. The only way to move it
        // out is `into_inner()`, which is limited to `T: Unpin`.
        unsafe { Pin::new_unchecked(&**self) }
    }

    /// Returns a pinned exclusive reference to the value.
    ///
    /// Values never move while they are in the pool, so pinning is always upheld.
    #[must_use]
    #[inline]
    pub fn as_pin_mut(&mut self) -> Pin<&mut T> {
        // SAFETY: See `as_pin()`. We have exclusive access through `&mut self`.
        unsafe { Pin::new_unchecked(&mut **self) }
    }

    /// Moves the value out of the pool and releases its slot without dropping the value.
    ///
    /// Only available for [`Unpin`] types because the handle hands out pinned references.
    ///
    /// # Example
    ///
    /// ```
    /// use fixed_pool::FixedPool;
    ///
    /// let pool = FixedPool::<String, 1>::new();
    ///
    /// let name = pool.request("Alice".to_string())?;
    /// let name: String = name.into_inner();
    ///
    /// assert_eq!(name, "Alice");
    /// assert!(pool.is_empty());
    /// # Ok::<(), fixed_pool::Error>(())
    /// ```
    #[must_use]
    pub fn into_inner(self) -> T
    where
        T: Unpin,
    {
        let this = ManuallyDrop::new(self);

        // SAFETY: The slot holds a live value owned by this handle. We never touch the slot again
        // after reading and the handle's own drop logic is suppressed by `ManuallyDrop`.
        let value = unsafe { this.ptr.read() };

        this.pool.release(this.ptr);

        value
    }
}

impl<T, const CAPACITY: usize> Deref for Pooled<'_, T, CAPACITY> {
    type Target = T;

    #[inline]
    fn deref(&self) -> &Self::Target {
        // SAFETY: The slot holds a live value and this handle is its only owner, so a shared
        // reference tied to `&self` cannot alias any exclusive reference.
        unsafe { self.ptr.as_ref() }
    }
}

impl<T, const CAPACITY: usize> DerefMut for Pooled<'_, T, CAPACITY> {
    #[inline]
    fn deref_mut(&mut self) -> &mut Self::Target {
        // SAFETY: The slot holds a live value and we have exclusive access to its only owner.
        unsafe { self.ptr.as_mut() }
    }
}

impl<T, const CAPACITY: usize> Drop for Pooled<'_, T, CAPACITY> {
    fn drop(&mut self) {
        let pool = self.pool;
        let ptr = self.ptr;

        // The slot goes back to the pool even if the value's own drop logic panics.
        let _release = scopeguard::guard((), move |()| pool.release(ptr));

        // SAFETY: The slot holds a live value owned by this handle and nobody can observe it
        // after this point. The slot is only returned to the pool once the value is gone.
        unsafe {
            ptr.drop_in_place();
        }
    }
}

impl<T: fmt::Debug, const CAPACITY: usize> fmt::Debug for Pooled<'_, T, CAPACITY> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pooled")
            .field("pool", &self.pool.name())
            .field("index", &self.index())
            .field("value", &**self)
            .finish()
    }
}

// SAFETY: The handle exclusively owns its value, so sending the handle sends the value. The
// pool reference is `Send` because the pool is `Sync` for `T: Send`.
unsafe impl<T: Send, const CAPACITY: usize> Send for Pooled<'_, T, CAPACITY> {}

// SAFETY: A shared reference to the handle yields shared references to the value and to the
// pool. The pool reference is only safe to share if `T: Send` because it can be used to move new
// values into the pool from the other thread.
unsafe impl<T: Send + Sync, const CAPACITY: usize> Sync for Pooled<'_, T, CAPACITY> {}
