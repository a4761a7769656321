//! Diagnostic fill patterns for slot memory that does not hold a live object.
//!
//! The byte values follow the conventions of the MSVC debug heap so that they are familiar when
//! seen in a debugger or memory dump. None of them is ever interpreted as object state.
//!
//! Filling is active in builds with `debug_assertions` or with the `poison` feature enabled.
//! Otherwise every function here is a no-op.

use std::mem::{MaybeUninit, size_of};
use std::slice;

/// Storage that no object has ever occupied.
pub(crate) const NEVER_USED: u8 = 0xFD;

/// Storage whose object has been removed.
pub(crate) const FREED: u8 = 0xDD;

/// Storage that was just allocated and is about to receive a value.
pub(crate) const FRESH: u8 = 0xCD;

pub(crate) const ENABLED: bool = cfg!(any(debug_assertions, feature = "poison"));

/// Overwrites every byte of the given slots with `pattern`.
#[inline]
pub(crate) fn fill<T>(slots: &mut [MaybeUninit<T>], pattern: u8) {
    if !ENABLED {
        return;
    }

    // SAFETY: Any byte pattern is a valid `MaybeUninit<T>` and the slice guarantees the pointer
    // is valid for writes of `slots.len()` elements.
    unsafe {
        slots.as_mut_ptr().write_bytes(pattern, slots.len());
    }
}

/// Overwrites every byte of one slot with `pattern`.
#[inline]
pub(crate) fn fill_one<T>(slot: &mut MaybeUninit<T>, pattern: u8) {
    fill(slice::from_mut(slot), pattern);
}

/// Whether every byte of the slot still holds `pattern`. Always `true` if poisoning is disabled.
///
/// # Safety
///
/// The caller must guarantee that every byte of the slot has been initialized, which is the
/// case for any slot that has been filled and not written to since.
#[cfg_attr(test, mutants::skip)] // Only feeds a diagnostic log message.
pub(crate) unsafe fn holds<T>(slot: &MaybeUninit<T>, pattern: u8) -> bool {
    if !ENABLED {
        return true;
    }

    // SAFETY: The pointer is valid for reads of `size_of::<T>()` bytes because it comes from a
    // reference to a `MaybeUninit<T>`. The caller guarantees that the bytes are initialized.
    let bytes = unsafe { slice::from_raw_parts(slot.as_ptr().cast::<u8>(), size_of::<T>()) };

    bytes.iter().all(|byte| *byte == pattern)
}

#[cfg(all(test, debug_assertions))]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    #[test]
    fn fill_overwrites_all_bytes() {
        let mut slots = [MaybeUninit::<u64>::uninit(); 3];

        fill(&mut slots, NEVER_USED);

        for slot in &slots {
            // SAFETY: Just filled.
            assert!(unsafe { holds(slot, NEVER_USED) });
            // SAFETY: Every bit pattern is a valid u64 and the bytes are initialized.
            assert_eq!(unsafe { slot.assume_init_read() }, 0xFDFD_FDFD_FDFD_FDFD);
        }
    }

    #[test]
    fn fill_one_touches_only_its_slot() {
        let mut slots = [MaybeUninit::<u32>::uninit(); 2];
        fill(&mut slots, FREED);

        let [first, second] = &mut slots;
        fill_one(first, FRESH);

        // SAFETY: Both slots are fully filled.
        unsafe {
            assert!(holds(first, FRESH));
            assert!(holds(second, FREED));
            assert!(!holds(second, FRESH));
        }
    }

    #[test]
    fn patterns_are_distinct() {
        assert_ne!(NEVER_USED, FREED);
        assert_ne!(FREED, FRESH);
        assert_ne!(NEVER_USED, FRESH);
    }
}
