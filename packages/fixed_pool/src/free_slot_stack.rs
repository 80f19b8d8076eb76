/// Bookkeeping for which slots of a [`SlotArena`][crate::SlotArena] are vacant.
///
/// The stack is a permutation of `0..CAPACITY` plus a cursor. Every entry below `top` is a slot
/// index that is currently handed out; every entry at or above `top` is vacant, and the entry at
/// `top` is the next one to be handed out.
///
/// A released index is swapped with the last in-use entry before the cursor moves down, so the
/// most recently released slot is always the next one acquired and the permutation is preserved.
/// `positions` is the inverse permutation and makes finding a released index O(1).
#[derive(Debug)]
pub(crate) struct FreeSlotStack<const CAPACITY: usize> {
    indices: Box<[usize]>,

    /// `positions[index]` is where `index` currently sits in `indices`.
    positions: Box<[usize]>,

    /// Number of slots currently in use. Also the position of the next free index in `indices`.
    top: usize,
}

impl<const CAPACITY: usize> FreeSlotStack<CAPACITY> {
    /// Creates a stack with every slot vacant, handing them out in ascending order.
    ///
    /// # Panics
    ///
    /// Panics if `CAPACITY` is zero.
    #[must_use]
    pub(crate) fn new() -> Self {
        assert!(CAPACITY > 0, "FreeSlotStack must have non-zero capacity");

        Self {
            indices: (0..CAPACITY).collect(),
            positions: (0..CAPACITY).collect(),
            top: 0,
        }
    }

    #[must_use]
    pub(crate) fn in_use(&self) -> usize {
        self.top
    }

    #[must_use]
    pub(crate) fn is_exhausted(&self) -> bool {
        self.top >= CAPACITY
    }

    /// Pops the next vacant slot index, or returns `None` if every slot is in use.
    ///
    /// An exhausted stack is left unchanged.
    #[must_use]
    pub(crate) fn acquire(&mut self) -> Option<usize> {
        let index = *self.indices.get(self.top)?;

        self.top = self
            .top
            .checked_add(1)
            .expect("guarded by the bounds check on the lookup above");

        Some(index)
    }

    /// Pushes a previously acquired slot index back onto the stack.
    ///
    /// # Panics
    ///
    /// Panics if `index` is out of bounds or is not currently acquired.
    pub(crate) fn release(&mut self, index: usize) {
        assert!(
            index < CAPACITY,
            "released slot index {index} is out of bounds for capacity {CAPACITY}"
        );

        let position = *self
            .positions
            .get(index)
            .expect("guarded by the bounds assertion above");
        assert!(position < self.top, "released slot index {index} is not currently in use");

        let last = self
            .top
            .checked_sub(1)
            .expect("position < top means top is at least 1");

        let displaced = *self
            .indices
            .get(last)
            .expect("top never exceeds the length of the index array");

        // Move the released index to the boundary, then shift the boundary below it.
        self.indices.swap(position, last);
        *self
            .positions
            .get_mut(displaced)
            .expect("every entry in the stack is a valid index") = position;
        *self
            .positions
            .get_mut(index)
            .expect("guarded by the bounds assertion above") = last;

        self.top = last;
    }

    /// The indices of all slots that are currently in use, in no particular order.
    #[must_use]
    pub(crate) fn in_use_indices(&self) -> &[usize] {
        self.indices
            .get(..self.top)
            .expect("top never exceeds the length of the index array")
    }

    #[cfg_attr(test, mutants::skip)] // This is essentially test logic, mutation is meaningless.
    #[cfg(debug_assertions)]
    pub(crate) fn integrity_check(&self) {
        assert!(
            self.top <= CAPACITY,
            "top {} is beyond capacity {CAPACITY}",
            self.top
        );

        let mut seen = vec![false; CAPACITY];

        for (position, &index) in self.indices.iter().enumerate() {
            let slot = seen
                .get_mut(index)
                .unwrap_or_else(|| panic!("index {index} is beyond capacity {CAPACITY}"));

            assert!(!*slot, "index {index} appears more than once in the stack");
            *slot = true;

            assert_eq!(
                self.positions.get(index),
                Some(&position),
                "position map disagrees with the stack for index {index}"
            );
        }
    }
}
