/// Determines what a [`FixedPool`][crate::FixedPool] does with slots that are still in use
/// when the pool itself is dropped.
///
/// Handles borrow the pool, so this can only happen if a handle was leaked
/// (e.g. via [`std::mem::forget()`]) instead of being dropped.
///
/// # Examples
///
/// ```
/// use fixed_pool::{DropPolicy, FixedPool};
///
/// // The drop policy is set at pool creation time.
/// let pool = FixedPool::<u32, 16>::builder()
///     .drop_policy(DropPolicy::MustNotDropItems)
///     .build();
/// ```
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
#[non_exhaustive]
pub enum DropPolicy {
    /// The pool drops any values still in use when the pool is dropped. This is the default.
    #[default]
    MayDropItems,

    /// The pool will panic if any slot is still in use when it is dropped. The values in those
    /// slots are still dropped first.
    ///
    /// Useful when a leaked handle indicates a bug, e.g. when the values are also referenced
    /// from unsafe code that must be torn down before the pool goes away.
    MustNotDropItems,
}
