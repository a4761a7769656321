use std::cell::Cell;
use std::marker::PhantomData;
use std::mem::MaybeUninit;
use std::num::NonZero;
use std::ptr::NonNull;

use crate::{DropPolicy, Error, ExhaustionPolicy, Result, SlotPool, SlotState};

/// Builder for creating an instance of [`SlotPool`].
///
/// The capacity is mandatory, whereas other settings are optional.
///
/// # Examples
///
/// A pool that owns its storage:
///
/// ```
/// use new_zealand::nz;
/// use slotted_pool::{ExhaustionPolicy, SlotPool};
///
/// let pool = SlotPool::<u64>::builder()
///     .capacity(nz!(128))
///     .exhaustion_policy(ExhaustionPolicy::ReturnNone)
///     .build();
/// ```
///
/// A pool in caller-supplied storage:
///
/// ```
/// use std::mem::MaybeUninit;
///
/// use new_zealand::nz;
/// use slotted_pool::{SlotPool, SlotState};
///
/// let items = Box::leak(Box::new([const { MaybeUninit::<u64>::uninit() }; 16]));
/// let states = Box::leak(Box::new([SlotState::VACANT; 16]));
///
/// let pool = SlotPool::<u64>::builder()
///     .capacity(nz!(16))
///     .build_in(items, states)
///     .unwrap();
///
/// assert!(!pool.owns_storage());
/// ```
///
/// # Thread safety
///
/// The builder is thread-mobile ([`Send`]) and can be safely transferred between threads,
/// allowing pool configuration to happen on different threads than where the pool is used.
/// However, it is not thread-safe ([`Sync`]) as it contains mutable configuration state.
#[derive(Debug)]
#[must_use]
pub struct SlotPoolBuilder<T> {
    capacity: Option<NonZero<usize>>,
    exhaustion_policy: ExhaustionPolicy,
    drop_policy: DropPolicy,

    _item: PhantomData<fn() -> T>,

    // Configuration happens on one thread at a time. The builder may move, not be shared.
    _not_sync: PhantomData<Cell<()>>,
}

impl<T> SlotPoolBuilder<T> {
    #[inline]
    pub(crate) fn new() -> Self {
        Self {
            capacity: None,
            exhaustion_policy: ExhaustionPolicy::default(),
            drop_policy: DropPolicy::default(),
            _item: PhantomData,
            _not_sync: PhantomData,
        }
    }

    /// Sets the number of slots in the pool. This cannot be changed after the pool is built.
    #[inline]
    pub fn capacity(mut self, capacity: NonZero<usize>) -> Self {
        self.capacity = Some(capacity);
        self
    }

    /// Sets the [exhaustion policy][ExhaustionPolicy] for the pool. This governs what happens
    /// when allocating from a full pool.
    #[inline]
    pub fn exhaustion_policy(mut self, policy: ExhaustionPolicy) -> Self {
        self.exhaustion_policy = policy;
        self
    }

    /// Sets the [drop policy][DropPolicy] for the pool. This governs how
    /// to treat remaining items in the pool when the pool is dropped.
    #[inline]
    pub fn drop_policy(mut self, policy: DropPolicy) -> Self {
        self.drop_policy = policy;
        self
    }

    /// Builds a pool that allocates and owns its storage.
    ///
    /// # Panics
    ///
    /// Panics if no capacity has been set, if the capacity exceeds
    /// [`MAX_CAPACITY`][crate::MAX_CAPACITY] or if `T` is zero-sized.
    #[must_use]
    pub fn build(self) -> SlotPool<T> {
        SlotPool::new_owned(
            self.required_capacity(),
            self.exhaustion_policy,
            self.drop_policy,
        )
    }

    /// Builds a pool in storage supplied by the caller. The pool never frees this storage.
    ///
    /// Both buffers must have exactly as many elements as the configured capacity. Their previous
    /// contents are irrelevant - the pool resets every slot state to [`SlotState::VACANT`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::StorageSizeMismatch`] if either buffer length differs from the capacity.
    ///
    /// # Panics
    ///
    /// Panics if no capacity has been set, if the capacity exceeds
    /// [`MAX_CAPACITY`][crate::MAX_CAPACITY] or if `T` is zero-sized.
    pub fn build_in(
        self,
        items: &'static mut [MaybeUninit<T>],
        states: &'static mut [SlotState],
    ) -> Result<SlotPool<T>>
    where
        T: 'static,
    {
        let capacity = self.required_capacity();

        if items.len() != capacity.get() || states.len() != capacity.get() {
            return Err(Error::StorageSizeMismatch {
                expected: capacity.get(),
                items: items.len(),
                states: states.len(),
            });
        }

        // SAFETY: The buffers have the right length, live forever and we hold the only
        // references to them, which we give up here.
        Ok(unsafe {
            SlotPool::new_borrowed(
                NonNull::from(items).cast(),
                NonNull::from(states).cast(),
                capacity,
                self.exhaustion_policy,
                self.drop_policy,
            )
        })
    }

    /// Builds a pool in storage supplied by the caller as raw pointers. The pool never frees
    /// this storage.
    ///
    /// # Safety
    ///
    /// Both pointers must be valid for reads and writes of `capacity` elements for the entire
    /// lifetime of the pool and must not be accessed through any other path while the pool
    /// exists (after [`SlotPool::flush()`] the pool no longer touches them).
    ///
    /// # Panics
    ///
    /// Panics if no capacity has been set, if the capacity exceeds
    /// [`MAX_CAPACITY`][crate::MAX_CAPACITY] or if `T` is zero-sized.
    #[must_use]
    pub unsafe fn build_from_raw(
        self,
        items: NonNull<MaybeUninit<T>>,
        states: NonNull<SlotState>,
    ) -> SlotPool<T> {
        // SAFETY: Forwarding the requirements to the caller.
        unsafe {
            SlotPool::new_borrowed(
                items,
                states,
                self.required_capacity(),
                self.exhaustion_policy,
                self.drop_policy,
            )
        }
    }

    fn required_capacity(&self) -> NonZero<usize> {
        self.capacity
            .expect("capacity must be set using .capacity() before building the pool")
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use new_zealand::nz;
    use static_assertions::{assert_impl_all, assert_not_impl_any};

    use super::*;

    // Test trait implementations.
    assert_impl_all!(SlotPoolBuilder<u32>: Send, std::fmt::Debug);
    assert_not_impl_any!(SlotPoolBuilder<u32>: Sync);

    fn leak_buffers<T>(
        items: usize,
        states: usize,
    ) -> (&'static mut [MaybeUninit<T>], &'static mut [SlotState]) {
        (
            Box::leak(Box::<[T]>::new_uninit_slice(items)),
            Box::leak(vec![SlotState::VACANT; states].into_boxed_slice()),
        )
    }

    #[test]
    fn builder_new_creates_default_state() {
        let builder = SlotPoolBuilder::<u32>::new();

        assert!(builder.capacity.is_none());
        assert_eq!(builder.exhaustion_policy, ExhaustionPolicy::Panic);
        assert_eq!(builder.drop_policy, DropPolicy::MayDropItems);
    }

    #[test]
    fn setters_store_values() {
        let builder = SlotPoolBuilder::<u32>::new()
            .capacity(nz!(7))
            .exhaustion_policy(ExhaustionPolicy::ReturnNone)
            .drop_policy(DropPolicy::MustNotDropItems);

        assert_eq!(builder.capacity, Some(nz!(7)));
        assert_eq!(builder.exhaustion_policy, ExhaustionPolicy::ReturnNone);
        assert_eq!(builder.drop_policy, DropPolicy::MustNotDropItems);
    }

    #[test]
    fn build_applies_configuration() {
        let pool = SlotPoolBuilder::<u32>::new()
            .capacity(nz!(7))
            .exhaustion_policy(ExhaustionPolicy::ReturnNone)
            .build();

        assert_eq!(pool.capacity(), 7);
        assert!(pool.owns_storage());
        assert_eq!(pool.exhaustion_policy(), ExhaustionPolicy::ReturnNone);
    }

    #[test]
    #[should_panic]
    fn build_without_capacity_panics() {
        _ = SlotPoolBuilder::<u32>::new().build();
    }

    #[test]
    fn build_in_adopts_matching_buffers() {
        let (items, states) = leak_buffers::<u32>(4, 4);
        states.fill(SlotState::from_byte(0xFF));

        let pool = SlotPoolBuilder::<u32>::new()
            .capacity(nz!(4))
            .build_in(items, states)
            .unwrap();

        assert_eq!(pool.capacity(), 4);
        assert!(!pool.owns_storage());
        assert!(pool.is_empty());
    }

    #[test]
    fn build_in_rejects_mismatched_buffers() {
        let (items, states) = leak_buffers::<u32>(4, 3);

        let error = SlotPoolBuilder::<u32>::new()
            .capacity(nz!(4))
            .build_in(items, states)
            .unwrap_err();

        assert!(matches!(
            error,
            Error::StorageSizeMismatch {
                expected: 4,
                items: 4,
                states: 3
            }
        ));
    }

    #[test]
    fn build_from_raw_uses_supplied_storage() {
        let mut items = [const { MaybeUninit::<u64>::uninit() }; 2];
        let mut states = [SlotState::VACANT; 2];
        let items_ptr = NonNull::from(&mut items).cast::<MaybeUninit<u64>>();
        let states_ptr = NonNull::from(&mut states).cast::<SlotState>();

        {
            // SAFETY: The arrays outlive the pool and are not touched while it exists.
            let mut pool = unsafe {
                SlotPoolBuilder::<u64>::new()
                    .capacity(nz!(2))
                    .build_from_raw(items_ptr, states_ptr)
            };

            let handle = pool.insert(5).unwrap();
            assert!(pool.contains_ptr(items_ptr.as_ptr().cast::<u64>()));
            assert_eq!(pool.get(handle), Some(&5));
        }

        // The pool is gone but the storage is intact and was reset to vacant.
        assert!(states.iter().all(|state| !state.is_occupied()));
    }
}
