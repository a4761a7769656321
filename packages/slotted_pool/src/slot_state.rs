use std::fmt;

const OCCUPIED_BIT: u8 = 0x80;
const GENERATION_MASK: u8 = 0x7F;

/// The largest generation a slot can reach before wrapping back to 1.
pub const MAX_GENERATION: u8 = GENERATION_MASK;

/// Per-slot bookkeeping of a [`SlotPool`][crate::SlotPool]: whether the slot holds a live
/// object and how many times it has been allocated.
///
/// The record is a single byte with the same layout as the low byte of a [`Handle`][crate::Handle]:
/// bit 7 is the occupied flag and bits 0-6 are the generation. This allows a handle to be
/// validated with one byte comparison.
///
/// The only reason to name this type is to provide state storage for a pool built via
/// [`SlotPoolBuilder::build_in()`][crate::SlotPoolBuilder::build_in], in which case the buffer
/// is seeded with [`SlotState::VACANT`].
///
/// # Example
///
/// ```rust
/// use slotted_pool::SlotState;
///
/// let states = [SlotState::VACANT; 4];
///
/// assert!(states.iter().all(|state| !state.is_occupied()));
/// assert!(states.iter().all(|state| state.generation() == 0));
/// ```
#[derive(Clone, Copy, Default, Eq, Hash, PartialEq)]
#[repr(transparent)]
pub struct SlotState(u8);

impl SlotState {
    /// A slot that has never held an object.
    pub const VACANT: Self = Self(0);

    #[must_use]
    pub(crate) const fn from_byte(byte: u8) -> Self {
        Self(byte)
    }

    #[must_use]
    pub(crate) const fn to_byte(self) -> u8 {
        self.0
    }

    /// Whether the slot currently holds a live object.
    #[must_use]
    #[inline]
    pub const fn is_occupied(self) -> bool {
        (self.0 & OCCUPIED_BIT) != 0
    }

    /// How many times (modulo the wrap-around) the slot has been allocated.
    ///
    /// Zero means the slot has never been allocated. An occupied slot never has generation zero.
    #[must_use]
    #[inline]
    pub const fn generation(self) -> u8 {
        self.0 & GENERATION_MASK
    }

    /// The state of this slot after one more allocation into it.
    #[must_use]
    pub(crate) const fn next_occupied(self) -> Self {
        Self(OCCUPIED_BIT | next_generation(self.generation()))
    }

    /// The state of this slot after its object has been removed. The generation is kept so that
    /// the next allocation advances past it.
    #[must_use]
    pub(crate) const fn vacated(self) -> Self {
        Self(self.generation())
    }
}

impl fmt::Debug for SlotState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SlotState")
            .field("occupied", &self.is_occupied())
            .field("generation", &self.generation())
            .finish()
    }
}

/// Generations run 1, 2, ..., 127, 1, ... so that zero only ever means "never allocated".
///
/// This means a handle taken at allocation cycle `n` of a slot and one taken at cycle `n + 127`
/// are indistinguishable. Stale handles that survive that many reallocations of the same slot
/// will be accepted as valid.
const fn next_generation(generation: u8) -> u8 {
    if generation >= MAX_GENERATION {
        1
    } else {
        // Cannot overflow, guarded by the branch above.
        generation.wrapping_add(1)
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use std::mem;

    use static_assertions::assert_eq_size;

    use super::*;

    assert_eq_size!(SlotState, u8);

    #[test]
    fn vacant_is_unoccupied_generation_zero() {
        assert!(!SlotState::VACANT.is_occupied());
        assert_eq!(SlotState::VACANT.generation(), 0);
        assert_eq!(SlotState::default(), SlotState::VACANT);
    }

    #[test]
    fn first_allocation_moves_to_generation_one() {
        let state = SlotState::VACANT.next_occupied();

        assert!(state.is_occupied());
        assert_eq!(state.generation(), 1);
        assert_eq!(state.to_byte(), 0x81);
    }

    #[test]
    fn vacated_keeps_generation() {
        let state = SlotState::VACANT.next_occupied().next_occupied();
        let vacated = state.vacated();

        assert!(!vacated.is_occupied());
        assert_eq!(vacated.generation(), 2);
    }

    #[test]
    fn generation_wraps_past_zero() {
        let mut state = SlotState::VACANT;

        for expected in 1..=MAX_GENERATION {
            state = state.vacated().next_occupied();
            assert_eq!(state.generation(), expected);
        }

        state = state.vacated().next_occupied();
        assert_eq!(state.generation(), 1);
        assert!(state.is_occupied());
    }

    #[test]
    fn occupied_state_never_has_generation_zero() {
        for byte in 0..=u8::MAX {
            let state = SlotState::from_byte(byte).vacated().next_occupied();
            assert_ne!(state.generation(), 0, "from byte {byte:#04x}");
        }
    }

    #[test]
    fn debug_output_names_fields() {
        let text = format!("{:?}", SlotState::VACANT.next_occupied());

        assert!(text.contains("occupied: true"));
        assert!(text.contains("generation: 1"));
    }

    #[test]
    fn has_same_layout_as_byte_buffer() {
        assert_eq!(mem::align_of::<SlotState>(), 1);
    }
}
