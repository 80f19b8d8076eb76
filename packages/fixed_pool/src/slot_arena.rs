use std::alloc::{Layout, alloc, dealloc, handle_alloc_error};
use std::any::type_name;
use std::fmt;
use std::ptr::NonNull;

use num_integer::Integer;

/// The backing storage of a [`FixedPool`][crate::FixedPool]: one heap block laid out as
/// `[T; CAPACITY]`, allocated once and never moved or resized.
///
/// The arena does not track which slots hold a live value. It hands out slot pointers and
/// translates them back to indices; the owner is responsible for writing a value into a slot
/// before reading it and for dropping it before the slot is reused. When the arena is dropped
/// it frees the memory without dropping any slot contents.
pub(crate) struct SlotArena<T, const CAPACITY: usize> {
    first_slot_ptr: NonNull<T>,
}

impl<T, const CAPACITY: usize> SlotArena<T, CAPACITY> {
    /// # Panics
    ///
    /// Panics if the arena would be zero-sized either due to capacity or item size being zero.
    #[must_use]
    pub(crate) fn new() -> Self {
        assert!(CAPACITY > 0, "FixedPool must have non-zero capacity");
        assert!(size_of::<T>() > 0, "FixedPool must have non-zero item size");

        let layout = Self::layout();

        // SAFETY: The layout is valid for `[T; CAPACITY]` and not zero-sized (guarded above).
        let ptr = unsafe { alloc(layout) };

        let first_slot_ptr =
            NonNull::new(ptr.cast::<T>()).unwrap_or_else(|| handle_alloc_error(layout));

        Self { first_slot_ptr }
    }

    #[must_use]
    fn layout() -> Layout {
        Layout::array::<T>(CAPACITY).expect("simple flat array layout must be calculable")
    }

    /// Returns the address of the slot at `index`. The address is stable for the lifetime of
    /// the arena.
    ///
    /// # Panics
    ///
    /// Panics if `index` is out of bounds.
    #[must_use]
    pub(crate) fn slot_ptr(&self, index: usize) -> NonNull<T> {
        assert!(
            index < CAPACITY,
            "slot {index} index out of bounds in arena of {}",
            type_name::<T>()
        );

        // SAFETY: Guarded by bounds check above, so the result stays inside the allocation.
        unsafe { self.first_slot_ptr.add(index) }
    }

    /// Translates a slot address obtained from [`slot_ptr()`][Self::slot_ptr] back into its
    /// index.
    ///
    /// # Panics
    ///
    /// Panics if the pointer does not point at the start of a slot in this arena.
    #[must_use]
    pub(crate) fn index_of(&self, ptr: NonNull<T>) -> usize {
        let byte_offset = ptr
            .addr()
            .get()
            .checked_sub(self.first_slot_ptr.addr().get())
            .unwrap_or_else(|| {
                panic!(
                    "pointer {ptr:?} is below the start of the arena of {}",
                    type_name::<T>()
                )
            });

        let (index, misalignment) = byte_offset.div_rem(&size_of::<T>());

        assert!(
            misalignment == 0 && index < CAPACITY,
            "pointer {ptr:?} does not address a slot in the arena of {}",
            type_name::<T>()
        );

        index
    }
}

impl<T, const CAPACITY: usize> Drop for SlotArena<T, CAPACITY> {
    fn drop(&mut self) {
        // SAFETY: The layout must match between alloc and dealloc. It does.
        unsafe {
            dealloc(self.first_slot_ptr.as_ptr().cast(), Self::layout());
        }
    }
}

impl<T, const CAPACITY: usize> fmt::Debug for SlotArena<T, CAPACITY> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct(type_name::<Self>())
            .field("first_slot_ptr", &self.first_slot_ptr)
            .field("capacity", &CAPACITY)
            .finish()
    }
}
