use thiserror::Error;

use crate::Handle;

/// Errors returned by the fallible operations of a [`SlotPool`][crate::SlotPool].
///
/// Misuse by trusted callers (double removal, out of bounds indexes and similar) is not reported
/// through this type - such bugs panic. These errors cover conditions that a caller may
/// reasonably need to handle, such as handles loaded from external data.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// The buffers supplied for a non-owning pool do not match its capacity.
    #[error(
        "storage buffers do not match pool capacity {expected}: {items} item slots, {states} state slots"
    )]
    StorageSizeMismatch {
        /// The capacity configured for the pool.
        expected: usize,

        /// The length of the supplied item buffer.
        items: usize,

        /// The length of the supplied state buffer.
        states: usize,
    },

    /// Every slot in the pool is occupied.
    #[error("all {capacity} slots of the pool are occupied")]
    Exhausted {
        /// The capacity of the pool.
        capacity: usize,
    },

    /// The handle names a slot beyond the end of the pool.
    #[error("slot index {index} is out of bounds for pool capacity {capacity}")]
    IndexOutOfBounds {
        /// The slot index that was requested.
        index: usize,

        /// The capacity of the pool.
        capacity: usize,
    },

    /// The slot is already occupied by another object.
    #[error("slot {index} is already occupied")]
    SlotOccupied {
        /// The slot index that was requested.
        index: usize,
    },

    /// The handle cannot refer to a live object because its occupied flag is clear or its
    /// generation is zero.
    #[error("handle {handle} cannot refer to a live object")]
    InvalidHandle {
        /// The rejected handle.
        handle: Handle,
    },
}

/// A specialized `Result` type for pool operations, returning the crate's
/// [`Error`] type as the error value.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use std::fmt::Debug;

    use static_assertions::assert_impl_all;

    use super::*;

    assert_impl_all!(Error: Send, Sync, Debug);

    #[test]
    fn messages_name_the_problem() {
        let error = Error::StorageSizeMismatch {
            expected: 8,
            items: 8,
            states: 4,
        };
        assert_eq!(
            error.to_string(),
            "storage buffers do not match pool capacity 8: 8 item slots, 4 state slots"
        );

        let error = Error::Exhausted { capacity: 3 };
        assert_eq!(error.to_string(), "all 3 slots of the pool are occupied");

        let error = Error::InvalidHandle {
            handle: Handle::from_bits(0x0000_0300),
        };
        assert_eq!(error.to_string(), "handle #3@0 cannot refer to a live object");
    }
}
