use thiserror::Error;

/// Errors that can occur when requesting a slot from a [`FixedPool`][crate::FixedPool].
#[derive(Clone, Copy, Debug, Eq, Error, PartialEq)]
#[non_exhaustive]
pub enum Error {
    /// Every slot of the pool is already in use. The pool itself is left untouched, so a later
    /// request succeeds once some handle has been dropped.
    #[error("object pool reached max capacity of {capacity} items")]
    CapacityExhausted {
        /// The fixed capacity of the pool that rejected the request.
        capacity: usize,
    },
}

/// A specialized `Result` type for pool operations, returning the crate's
/// [`Error`] type as the error value.
pub type Result<T> = std::result::Result<T, Error>;
