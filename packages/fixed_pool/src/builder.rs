use std::any::type_name;
use std::fmt;
use std::marker::PhantomData;

use crate::{DropPolicy, FixedPool};

/// Builder for creating an instance of [`FixedPool`].
///
/// You only need to use this builder if you want to customize the pool configuration.
/// The default configuration used by [`FixedPool::new()`][1] is sufficient for most use cases.
///
/// # Examples
///
/// ```
/// use fixed_pool::{DropPolicy, FixedPool};
///
/// let pool = FixedPool::<u32, 64>::builder()
///     .name("connection_ids")
///     .drop_policy(DropPolicy::MayDropItems)
///     .build();
///
/// assert_eq!(pool.capacity(), 64);
/// ```
///
/// [1]: FixedPool::new
#[must_use]
pub struct FixedPoolBuilder<T, const CAPACITY: usize> {
    drop_policy: DropPolicy,
    name: Option<&'static str>,

    _item: PhantomData<T>,
}

impl<T, const CAPACITY: usize> fmt::Debug for FixedPoolBuilder<T, CAPACITY> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FixedPoolBuilder")
            .field("item_type", &format_args!("{}", type_name::<T>()))
            .field("capacity", &CAPACITY)
            .field("drop_policy", &self.drop_policy)
            .field("name", &self.name)
            .finish()
    }
}

impl<T, const CAPACITY: usize> FixedPoolBuilder<T, CAPACITY> {
    pub(crate) fn new() -> Self {
        Self {
            drop_policy: DropPolicy::default(),
            name: None,
            _item: PhantomData,
        }
    }

    /// Sets the [drop policy][DropPolicy] for the pool. This governs how to treat slots that
    /// are still in use (because their handles were leaked) when the pool is dropped.
    ///
    /// # Examples
    ///
    /// ```
    /// use fixed_pool::{DropPolicy, FixedPool};
    ///
    /// let pool = FixedPool::<u32, 8>::builder()
    ///     .drop_policy(DropPolicy::MustNotDropItems)
    ///     .build();
    /// ```
    pub fn drop_policy(mut self, policy: DropPolicy) -> Self {
        self.drop_policy = policy;
        self
    }

    /// Sets the name the pool uses to identify itself in log events.
    ///
    /// Defaults to the name of the item type.
    pub fn name(mut self, name: &'static str) -> Self {
        self.name = Some(name);
        self
    }

    /// Builds the pool with the specified configuration.
    ///
    /// # Panics
    ///
    /// Panics if `T` is zero-sized or `CAPACITY` is zero.
    #[must_use]
    pub fn build(self) -> FixedPool<T, CAPACITY> {
        FixedPool::new_inner(
            self.drop_policy,
            self.name.unwrap_or_else(type_name::<T>),
        )
    }
}
