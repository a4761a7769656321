use std::fmt;

use crate::SlotState;

const INDEX_SHIFT: u32 = 8;

/// The largest capacity a [`SlotPool`][crate::SlotPool] may have, bounded by the 24 bits
/// available for the slot index in a [`Handle`].
pub const MAX_CAPACITY: usize = 1 << 24;

/// A 32-bit reference to one allocation in a [`SlotPool`][crate::SlotPool].
///
/// The encoding is a stable external format, suitable for storing in save files or handing to
/// scripts:
///
/// | Bits  | Meaning                                   |
/// |-------|-------------------------------------------|
/// | 8-31  | slot index                                |
/// | 7     | occupied flag (always set in live handles) |
/// | 0-6   | slot generation at allocation time        |
///
/// A handle only resolves while the slot it names is occupied by the same allocation that
/// produced the handle. Once the object is removed, the handle goes stale and lookups return
/// `None`, even after the slot is reused for a new object.
///
/// Handles from untrusted sources may be reconstructed via [`Handle::from_bits()`]. Any bit
/// pattern is acceptable input to the non-panicking lookup methods of the pool.
///
/// # Example
///
/// ```rust
/// use new_zealand::nz;
/// use slotted_pool::{Handle, SlotPool};
///
/// let mut pool = SlotPool::<u32>::new(nz!(4));
/// let handle = pool.insert(42).unwrap();
///
/// // Persist the handle as a plain integer and bring it back later.
/// let bits: u32 = handle.into();
/// let restored = Handle::from_bits(bits);
///
/// assert_eq!(pool.get(restored), Some(&42));
/// ```
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct Handle(u32);

impl Handle {
    /// # Panics
    ///
    /// Panics if the index does not fit into the 24 bits reserved for it.
    #[must_use]
    pub(crate) fn new(index: usize, state: SlotState) -> Self {
        assert!(
            index < MAX_CAPACITY,
            "slot index {index} does not fit into a handle"
        );

        let index = u32::try_from(index).expect("guarded by MAX_CAPACITY assertion above");

        Self((index << INDEX_SHIFT) | u32::from(state.to_byte()))
    }

    /// Reconstructs a handle from its raw 32-bit representation.
    ///
    /// No validation takes place - the result may not refer to anything in any pool.
    #[must_use]
    #[inline]
    pub const fn from_bits(bits: u32) -> Self {
        Self(bits)
    }

    /// Returns the raw 32-bit representation of the handle.
    #[must_use]
    #[inline]
    pub const fn to_bits(self) -> u32 {
        self.0
    }

    /// The index of the slot this handle refers to.
    #[must_use]
    #[inline]
    pub fn index(self) -> usize {
        usize::try_from(self.0 >> INDEX_SHIFT).expect("24-bit value always fits in usize")
    }

    /// The generation of the slot at the time the handle was created.
    #[must_use]
    #[inline]
    pub fn generation(self) -> u8 {
        self.state().generation()
    }

    /// Whether the occupied flag is set. Every handle issued by a pool for a live object has it.
    #[must_use]
    #[inline]
    pub fn is_occupied(self) -> bool {
        self.state().is_occupied()
    }

    /// The slot state byte this handle expects to find in the pool.
    #[must_use]
    pub(crate) fn state(self) -> SlotState {
        let [low, ..] = self.0.to_le_bytes();
        SlotState::from_byte(low)
    }
}

impl From<Handle> for u32 {
    #[inline]
    fn from(handle: Handle) -> Self {
        handle.0
    }
}

impl From<u32> for Handle {
    #[inline]
    fn from(bits: u32) -> Self {
        Self(bits)
    }
}

impl fmt::Display for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}@{}", self.index(), self.generation())
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use std::fmt::{Debug, Display};
    use std::hash::Hash;

    use static_assertions::assert_impl_all;

    use super::*;

    assert_impl_all!(Handle: Copy, Send, Sync, Debug, Display, Eq, Hash);

    #[test]
    fn packs_index_above_state_byte() {
        let state = SlotState::VACANT.next_occupied();
        let handle = Handle::new(5, state);

        assert_eq!(handle.to_bits(), 0x0000_0581);
        assert_eq!(handle.index(), 5);
        assert_eq!(handle.generation(), 1);
        assert!(handle.is_occupied());
        assert_eq!(handle.state(), state);
    }

    #[test]
    fn decodes_arbitrary_bits() {
        let handle = Handle::from_bits(0xABCD_EF7F);

        assert_eq!(handle.index(), 0x00AB_CDEF);
        assert_eq!(handle.generation(), 0x7F);
        assert!(!handle.is_occupied());
    }

    #[test]
    fn largest_index_fits() {
        let handle = Handle::new(MAX_CAPACITY - 1, SlotState::VACANT);

        assert_eq!(handle.index(), MAX_CAPACITY - 1);
        assert_eq!(handle.to_bits(), 0xFFFF_FF00);
    }

    #[test]
    #[should_panic]
    fn index_beyond_24_bits_panics() {
        _ = Handle::new(MAX_CAPACITY, SlotState::VACANT);
    }

    #[test]
    fn converts_to_and_from_u32() {
        let handle = Handle::from(0x1234_5681_u32);
        let bits: u32 = handle.into();

        assert_eq!(bits, 0x1234_5681);
        assert_eq!(Handle::from_bits(bits), handle);
    }

    #[test]
    fn display_shows_index_and_generation() {
        let handle = Handle::new(12, SlotState::VACANT.next_occupied().next_occupied());

        assert_eq!(handle.to_string(), "#12@2");
    }
}
