//! Two-slot arena with a front/back tag.

/// Physical slot of a [`DoubleBuffer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BufferIndex {
    Zero,
    One,
}

impl BufferIndex {
    pub fn toggled(self) -> Self {
        match self {
            BufferIndex::Zero => BufferIndex::One,
            BufferIndex::One => BufferIndex::Zero,
        }
    }

    pub fn as_usize(self) -> usize {
        match self {
            BufferIndex::Zero => 0,
            BufferIndex::One => 1,
        }
    }
}

/// Logical role of a slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BufferSlot {
    Front,
    Back,
}

/// A readable front value and a writable back value that trade places on
/// [`swap`](Self::swap).
///
/// Only this crate can reach the back slot; everyone else sees the front.
#[derive(Debug)]
pub struct DoubleBuffer<T> {
    slots: [T; 2],
    front: BufferIndex,
    back_lent: bool,
}

impl<T> DoubleBuffer<T> {
    pub fn new(front: T, back: T) -> Self {
        Self {
            slots: [front, back],
            front: BufferIndex::Zero,
            back_lent: false,
        }
    }

    pub fn front_index(&self) -> BufferIndex {
        self.front
    }

    pub fn index_of(&self, slot: BufferSlot) -> BufferIndex {
        match slot {
            BufferSlot::Front => self.front,
            BufferSlot::Back => self.front.toggled(),
        }
    }

    pub fn front(&self) -> &T {
        &self.slots[self.front.as_usize()]
    }

    /// Move the back value out, leaving a placeholder until
    /// [`restore_back`](Self::restore_back).
    pub(crate) fn take_back(&mut self) -> T
    where
        T: Default,
    {
        debug_assert!(!self.back_lent, "back buffer already lent out");
        self.back_lent = true;
        std::mem::take(self.back_slot_mut())
    }

    pub(crate) fn restore_back(&mut self, value: T) {
        *self.back_slot_mut() = value;
        self.back_lent = false;
    }

    /// Promote the back value to the front.
    pub(crate) fn swap(&mut self) {
        debug_assert!(!self.back_lent, "swapping while the back buffer is lent out");
        self.front = self.front.toggled();
    }

    fn back_slot_mut(&mut self) -> &mut T {
        let back = self.index_of(BufferSlot::Back).as_usize();
        &mut self.slots[back]
    }
}
