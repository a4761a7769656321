/// Determines what happens when an allocation is attempted on a full pool.
///
/// A full pool usually means the pool was sized too small for the workload, so by default this
/// is treated as a bug and the allocating call panics. Callers that are prepared to handle a
/// missing object can opt into [`ExhaustionPolicy::ReturnNone`].
///
/// # Examples
///
/// ```
/// use new_zealand::nz;
/// use slotted_pool::{ExhaustionPolicy, SlotPool};
///
/// let mut pool = SlotPool::<u32>::builder()
///     .capacity(nz!(1))
///     .exhaustion_policy(ExhaustionPolicy::ReturnNone)
///     .build();
///
/// assert!(pool.insert(1).is_some());
/// assert!(pool.insert(2).is_none());
/// ```
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
#[non_exhaustive]
pub enum ExhaustionPolicy {
    /// Allocating from a full pool panics. This is the default.
    #[default]
    Panic,

    /// Allocating from a full pool logs an error and returns `None`.
    ReturnNone,
}

/// Determines item dropping behavior when the pool is dropped.
///
/// By default, the pool will drop its items when it is dropped.
///
/// # Examples
///
/// ```
/// use new_zealand::nz;
/// use slotted_pool::{DropPolicy, SlotPool};
///
/// // The drop policy is set at pool creation time.
/// let pool = SlotPool::<u32>::builder()
///     .capacity(nz!(8))
///     .drop_policy(DropPolicy::MustNotDropItems)
///     .build();
/// ```
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
#[non_exhaustive]
pub enum DropPolicy {
    /// The pool will drop its items when the pool is dropped. This is the default.
    #[default]
    MayDropItems,

    /// The pool will panic if it still contains items when it is dropped.
    ///
    /// This is useful when every object is expected to be explicitly removed by its owner,
    /// for example because removal has side effects elsewhere in the program.
    MustNotDropItems,
}
