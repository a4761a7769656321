use std::any::type_name;
use std::marker::PhantomData;
use std::mem::{MaybeUninit, size_of};
use std::num::NonZero;
use std::ptr::{self, NonNull};
use std::{fmt, slice, thread};

use tracing::{debug, error, warn};

use crate::{
    DropPolicy, Error, ExhaustionPolicy, Handle, Iter, IterMut, MAX_CAPACITY, Result, SlotPoolBuilder,
    SlotState, poison,
};

/// A fixed-capacity pool of `T` with stable slots addressed by index or by [`Handle`].
///
/// The capacity is chosen when the pool is built and never changes. Each object lives in one
/// slot for its whole lifetime, so references into the pool never see the object move. When an
/// object is removed, its slot becomes available to the next allocation and the slot's
/// generation advances, which invalidates every handle issued for the previous occupant.
///
/// # Storage
///
/// The pool either owns its storage (see [`SlotPoolBuilder::build()`]) or adopts buffers supplied
/// by the caller (see [`SlotPoolBuilder::build_in()`]), which the pool never frees. The latter
/// is intended for pools whose storage lives in a `static`.
///
/// # Allocation
///
/// Allocation scans for a vacant slot starting at a cursor that remembers where the last
/// allocation or the earliest removal happened. In typical allocate/remove churn this finds a
/// vacant slot immediately; the worst case on a nearly full pool is a scan of every slot.
///
/// What happens when the pool is full depends on the [`ExhaustionPolicy`].
///
/// # Handles from external sources
///
/// [`get()`](Self::get) and [`get_mut()`](Self::get_mut) accept any handle, including forged
/// or stale ones, and return `None` if the handle does not identify a live object. Handles
/// read from save files or received from scripts should always go through these methods.
///
/// # Memory poisoning
///
/// In builds with `debug_assertions` (or with the `poison` feature) the storage of vacant slots
/// is filled with recognizable byte patterns, making use-after-free visible in a debugger.
///
/// # Example
///
/// ```rust
/// use new_zealand::nz;
/// use slotted_pool::SlotPool;
///
/// let mut pool = SlotPool::<String>::new(nz!(4));
///
/// let hello = pool.insert("hello".to_string()).unwrap();
/// let world = pool.insert("world".to_string()).unwrap();
///
/// assert_eq!(pool.get(hello).map(String::as_str), Some("hello"));
/// assert_eq!(pool.count_occupied(), 2);
///
/// let removed = pool.remove(hello);
/// assert_eq!(removed, "hello");
///
/// // The handle is now stale and no longer resolves.
/// assert!(pool.get(hello).is_none());
/// assert!(pool.get(world).is_some());
/// ```
///
/// # Thread safety
///
/// The pool has no internal synchronization. It is [`Send`] if `T` is [`Send`] and [`Sync`] if
/// `T` is [`Sync`]. To allocate from multiple threads, guard the entire pool with one mutex.
pub struct SlotPool<T> {
    /// Start of `capacity` item slots. Dangling once the pool has been flushed.
    items: NonNull<MaybeUninit<T>>,

    /// Start of `capacity` slot states. Dangling once the pool has been flushed.
    states: NonNull<SlotState>,

    /// Zero once the pool has been flushed.
    capacity: usize,

    /// Where the next search for a vacant slot begins. This is a hint, not the ground truth - the
    /// slot it points to may well be occupied.
    free_slot_hint: usize,

    /// Whether `items` and `states` were allocated by us and must be released on flush.
    owns_storage: bool,

    exhaustion_policy: ExhaustionPolicy,
    drop_policy: DropPolicy,

    /// We own the items stored in the slots and drop them.
    _items: PhantomData<T>,
}

impl<T> SlotPool<T> {
    /// Creates a builder for configuring and constructing a [`SlotPool`].
    ///
    /// You must specify the capacity before building the pool.
    ///
    /// # Example
    ///
    /// ```rust
    /// use new_zealand::nz;
    /// use slotted_pool::SlotPool;
    ///
    /// let pool = SlotPool::<u64>::builder().capacity(nz!(16)).build();
    ///
    /// assert_eq!(pool.capacity(), 16);
    /// assert!(pool.is_empty());
    /// ```
    #[inline]
    pub fn builder() -> SlotPoolBuilder<T> {
        SlotPoolBuilder::new()
    }

    /// Creates a pool that owns storage for `capacity` objects, with default policies.
    ///
    /// # Panics
    ///
    /// Panics if `T` is zero-sized or if `capacity` exceeds [`MAX_CAPACITY`].
    #[must_use]
    pub fn new(capacity: NonZero<usize>) -> Self {
        Self::builder().capacity(capacity).build()
    }

    /// Allocates owned storage for the pool.
    #[must_use]
    pub(crate) fn new_owned(
        capacity: NonZero<usize>,
        exhaustion_policy: ExhaustionPolicy,
        drop_policy: DropPolicy,
    ) -> Self {
        assert_valid_configuration::<T>(capacity.get());

        let items = Box::leak(Box::<[T]>::new_uninit_slice(capacity.get()));
        let states = Box::leak(vec![SlotState::VACANT; capacity.get()].into_boxed_slice());

        // SAFETY: The buffers were just allocated with `capacity` elements each and are
        // leaked, so they live until we reassemble the boxes in `flush()`.
        unsafe {
            Self::adopt(
                NonNull::from(items).cast(),
                NonNull::from(states).cast(),
                capacity.get(),
                true,
                exhaustion_policy,
                drop_policy,
            )
        }
    }

    /// Takes over storage supplied by the caller, without taking ownership of it.
    ///
    /// # Safety
    ///
    /// Both pointers must be valid for reads and writes of `capacity` elements for the entire
    /// lifetime of the pool and must not be accessed by anyone else during that time.
    #[must_use]
    pub(crate) unsafe fn new_borrowed(
        items: NonNull<MaybeUninit<T>>,
        states: NonNull<SlotState>,
        capacity: NonZero<usize>,
        exhaustion_policy: ExhaustionPolicy,
        drop_policy: DropPolicy,
    ) -> Self {
        assert_valid_configuration::<T>(capacity.get());

        // SAFETY: Forwarding the requirements to the caller.
        unsafe {
            Self::adopt(
                items,
                states,
                capacity.get(),
                false,
                exhaustion_policy,
                drop_policy,
            )
        }
    }

    /// # Safety
    ///
    /// Both pointers must be valid for reads and writes of `capacity` elements until `flush()`.
    unsafe fn adopt(
        items: NonNull<MaybeUninit<T>>,
        states: NonNull<SlotState>,
        capacity: usize,
        owns_storage: bool,
        exhaustion_policy: ExhaustionPolicy,
        drop_policy: DropPolicy,
    ) -> Self {
        let mut pool = Self {
            items,
            states,
            capacity,
            free_slot_hint: 0,
            owns_storage,
            exhaustion_policy,
            drop_policy,
            _items: PhantomData,
        };

        // Borrowed state buffers may contain anything, so we always reset them.
        pool.states_mut().fill(SlotState::VACANT);
        poison::fill(pool.slots_mut(), poison::NEVER_USED);

        pool
    }

    /// The number of slots in the pool. Zero after [`flush()`](Self::flush).
    #[must_use]
    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// The size in bytes of one slot.
    #[must_use]
    #[inline]
    pub fn item_size(&self) -> usize {
        size_of::<T>()
    }

    /// Whether the pool releases its storage when flushed or dropped.
    ///
    /// This is `false` for pools built via [`SlotPoolBuilder::build_in()`] and for flushed pools.
    #[must_use]
    #[inline]
    pub fn owns_storage(&self) -> bool {
        self.owns_storage
    }

    /// The policy applied when allocating from a full pool.
    #[must_use]
    #[inline]
    pub fn exhaustion_policy(&self) -> ExhaustionPolicy {
        self.exhaustion_policy
    }

    /// The policy applied when the pool is dropped while still holding objects.
    #[must_use]
    #[inline]
    pub fn drop_policy(&self) -> DropPolicy {
        self.drop_policy
    }

    /// Counts the occupied slots.
    ///
    /// This scans every slot in the pool, so avoid it on hot paths. It is intended for
    /// diagnostics and tooling.
    #[must_use]
    pub fn count_occupied(&self) -> usize {
        self.states()
            .iter()
            .filter(|state| state.is_occupied())
            .count()
    }

    /// Counts the vacant slots. Like [`count_occupied()`](Self::count_occupied), this scans
    /// every slot in the pool.
    #[must_use]
    pub fn count_vacant(&self) -> usize {
        // Cannot underflow - we never count more occupied slots than there are slots.
        self.capacity.wrapping_sub(self.count_occupied())
    }

    /// Whether no slot is occupied. Scans the pool.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        !self.states().iter().any(|state| state.is_occupied())
    }

    /// Whether every slot is occupied. Scans the pool.
    #[must_use]
    pub fn is_full(&self) -> bool {
        self.states().iter().all(|state| state.is_occupied())
    }

    /// Whether `index` names a slot of this pool.
    #[must_use]
    #[inline]
    pub fn is_in_bounds(&self, index: usize) -> bool {
        index < self.capacity
    }

    /// Whether the slot at `index` holds a live object.
    ///
    /// # Panics
    ///
    /// Panics if `index` is out of bounds.
    #[must_use]
    pub fn is_occupied(&self, index: usize) -> bool {
        self.state(index).is_occupied()
    }

    /// Whether `ptr` points into the storage of this pool, regardless of whether the slot it
    /// points to is occupied.
    ///
    /// The pointer is never dereferenced, so any pointer value is acceptable.
    #[must_use]
    pub fn contains_ptr(&self, ptr: *const T) -> bool {
        let start = self.items.as_ptr().addr();
        // Cannot overflow - the storage would not fit into virtual memory.
        let end = start.wrapping_add(size_of::<T>().wrapping_mul(self.capacity));

        (start..end).contains(&ptr.addr())
    }

    /// Returns the index of the slot that `ptr` points to.
    ///
    /// # Panics
    ///
    /// Panics if `ptr` does not point to the start of a slot in this pool.
    #[must_use]
    pub fn index_of(&self, ptr: *const T) -> usize {
        assert!(
            self.contains_ptr(ptr),
            "pointer {ptr:p} does not point into SlotPool of capacity {}",
            self.capacity
        );

        // Cannot underflow - the pointer is inside our storage.
        let offset = ptr.addr().wrapping_sub(self.items.as_ptr().addr());

        #[expect(
            clippy::integer_division,
            reason = "we verify below that the division has no remainder"
        )]
        let index = offset / size_of::<T>();

        assert!(
            index.wrapping_mul(size_of::<T>()) == offset,
            "pointer {ptr:p} points into the middle of slot {index} in SlotPool of capacity {}",
            self.capacity
        );

        index
    }

    /// Returns the handle of the slot that `ptr` points to, reflecting the slot's current state.
    ///
    /// If the slot is vacant, the returned handle has its occupied flag clear and will not
    /// resolve to anything.
    ///
    /// # Panics
    ///
    /// Panics if `ptr` does not point to the start of a slot in this pool.
    #[must_use]
    pub fn handle_of(&self, ptr: *const T) -> Handle {
        let index = self.index_of(ptr);
        Handle::new(index, self.state(index))
    }

    /// Returns the handle of the object in slot `index`, or `None` if the slot is vacant.
    ///
    /// # Panics
    ///
    /// Panics if `index` is out of bounds.
    #[must_use]
    pub fn handle_at(&self, index: usize) -> Option<Handle> {
        let state = self.state(index);
        state.is_occupied().then(|| Handle::new(index, state))
    }

    /// Inserts a value into a vacant slot and returns its handle.
    ///
    /// # Panics
    ///
    /// Panics if the pool is full and the pool uses [`ExhaustionPolicy::Panic`].
    ///
    /// # Example
    ///
    /// ```rust
    /// use new_zealand::nz;
    /// use slotted_pool::SlotPool;
    ///
    /// let mut pool = SlotPool::<u32>::new(nz!(2));
    ///
    /// let handle = pool.insert(7).unwrap();
    /// assert_eq!(pool.get(handle), Some(&7));
    /// ```
    pub fn insert(&mut self, value: T) -> Option<Handle> {
        self.insert_with(|_| value)
    }

    /// Inserts a value produced by `f` into a vacant slot and returns its handle.
    ///
    /// The closure receives the handle the new object will have, which allows objects to know
    /// their own handle. If the closure panics, the pool is left unchanged.
    ///
    /// # Panics
    ///
    /// Panics if the pool is full and the pool uses [`ExhaustionPolicy::Panic`].
    ///
    /// # Example
    ///
    /// ```rust
    /// use new_zealand::nz;
    /// use slotted_pool::{Handle, SlotPool};
    ///
    /// struct Entity {
    ///     me: Handle,
    /// }
    ///
    /// let mut pool = SlotPool::<Entity>::new(nz!(2));
    ///
    /// let handle = pool.insert_with(|me| Entity { me }).unwrap();
    /// assert_eq!(pool.get(handle).unwrap().me, handle);
    /// ```
    pub fn insert_with(&mut self, f: impl FnOnce(Handle) -> T) -> Option<Handle> {
        let Some(index) = self.find_vacant() else {
            return self.on_exhausted();
        };

        let handle = self.place(index, self.state(index).next_occupied(), f);
        self.free_slot_hint = index;

        Some(handle)
    }

    /// Inserts a value into a vacant slot, returning an error if the pool is full.
    ///
    /// Unlike [`insert()`](Self::insert), this ignores the exhaustion policy.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Exhausted`] if every slot is occupied.
    pub fn try_insert(&mut self, value: T) -> Result<Handle> {
        let index = self.find_vacant().ok_or(Error::Exhausted {
            capacity: self.capacity,
        })?;

        let handle = self.place(index, self.state(index).next_occupied(), |_| value);
        self.free_slot_hint = index;

        Ok(handle)
    }

    /// Inserts a value into the specific slot `index`, advancing the slot's generation as any
    /// allocation does.
    ///
    /// This is used when an object must come back at a known index, for example when
    /// scripted content refers to objects by index.
    ///
    /// # Panics
    ///
    /// Panics if `index` is out of bounds or if the slot is already occupied.
    pub fn insert_at(&mut self, index: usize, value: T) -> Handle {
        let state = self.state(index);

        assert!(
            !state.is_occupied(),
            "cannot insert into slot {index} that is already occupied in SlotPool of capacity {}",
            self.capacity
        );

        // The free slot hint stays where it is. If it happens to point at the slot we just
        // occupied, the next search simply moves on from there.
        self.place(index, state.next_occupied(), |_| value)
    }

    /// Recreates an object at exactly the slot and generation encoded in `handle`.
    ///
    /// This is the counterpart to persisting handles: after the objects of a saved pool have
    /// been restored with their original handles, every handle stored elsewhere in the save
    /// data resolves again.
    ///
    /// The handle is treated as untrusted input and is validated without panicking.
    ///
    /// # Errors
    ///
    /// Returns [`Error::IndexOutOfBounds`] if the handle names a slot beyond the capacity,
    /// [`Error::InvalidHandle`] if the handle cannot refer to a live object and
    /// [`Error::SlotOccupied`] if its slot is in use.
    ///
    /// # Example
    ///
    /// ```rust
    /// use new_zealand::nz;
    /// use slotted_pool::{Handle, SlotPool};
    ///
    /// let mut saved = SlotPool::<u32>::new(nz!(4));
    /// let handle = saved.insert(42).unwrap();
    /// let bits = handle.to_bits();
    ///
    /// let mut loaded = SlotPool::<u32>::new(nz!(4));
    /// loaded.restore(Handle::from_bits(bits), 42).unwrap();
    ///
    /// assert_eq!(loaded.get(handle), Some(&42));
    /// ```
    pub fn restore(&mut self, handle: Handle, value: T) -> Result<()> {
        let index = handle.index();

        if !self.is_in_bounds(index) {
            return Err(Error::IndexOutOfBounds {
                index,
                capacity: self.capacity,
            });
        }

        let state = handle.state();

        if !state.is_occupied() || state.generation() == 0 {
            return Err(Error::InvalidHandle { handle });
        }

        if self.state(index).is_occupied() {
            return Err(Error::SlotOccupied { index });
        }

        self.place(index, state, |_| value);
        Ok(())
    }

    /// Removes the object that `handle` refers to and returns it.
    ///
    /// # Panics
    ///
    /// Panics if the handle does not refer to a live object in this pool. This includes
    /// removing the same object twice.
    pub fn remove(&mut self, handle: Handle) -> T {
        assert!(
            self.is_live(handle),
            "cannot remove {handle} - it does not refer to a live object in SlotPool of capacity {}",
            self.capacity
        );

        self.remove_at(handle.index())
    }

    /// Removes the object in slot `index` and returns it.
    ///
    /// # Panics
    ///
    /// Panics if `index` is out of bounds or the slot is vacant.
    pub fn remove_at(&mut self, index: usize) -> T {
        let state = self.state(index);

        assert!(
            state.is_occupied(),
            "cannot remove slot {index} that is not occupied in SlotPool of capacity {}",
            self.capacity
        );

        self.set_state(index, state.vacated());

        let slot = self.slot_mut(index);

        // SAFETY: The slot was occupied, so it holds an initialized value. We have just marked
        // it vacant, so the value will not be read or dropped again.
        let value = unsafe { slot.assume_init_read() };

        poison::fill_one(slot, poison::FREED);

        if index < self.free_slot_hint {
            self.free_slot_hint = index;
        }

        value
    }

    /// Returns a reference to the object that `handle` refers to, or `None` if the handle is
    /// stale, forged or out of bounds for this pool.
    ///
    /// This never panics, whatever the handle.
    #[must_use]
    pub fn get(&self, handle: Handle) -> Option<&T> {
        if !self.is_live(handle) {
            return None;
        }

        let slot = self.slots().get(handle.index())?;

        // SAFETY: The slot is occupied, so it holds an initialized value.
        Some(unsafe { slot.assume_init_ref() })
    }

    /// Returns an exclusive reference to the object that `handle` refers to, or `None` if the
    /// handle is stale, forged or out of bounds for this pool.
    ///
    /// This never panics, whatever the handle.
    #[must_use]
    pub fn get_mut(&mut self, handle: Handle) -> Option<&mut T> {
        if !self.is_live(handle) {
            return None;
        }

        let slot = self.slots_mut().get_mut(handle.index())?;

        // SAFETY: The slot is occupied, so it holds an initialized value.
        Some(unsafe { slot.assume_init_mut() })
    }

    /// Like [`get()`](Self::get) but for handles that the caller has already established to be
    /// in bounds. A stale handle still yields `None`.
    ///
    /// # Panics
    ///
    /// Panics if the handle's index is out of bounds.
    #[must_use]
    pub fn get_trusted(&self, handle: Handle) -> Option<&T> {
        self.assert_in_bounds(handle.index());
        self.get(handle)
    }

    /// Like [`get_mut()`](Self::get_mut) but for handles that the caller has already
    /// established to be in bounds. A stale handle still yields `None`.
    ///
    /// # Panics
    ///
    /// Panics if the handle's index is out of bounds.
    #[must_use]
    pub fn get_trusted_mut(&mut self, handle: Handle) -> Option<&mut T> {
        self.assert_in_bounds(handle.index());
        self.get_mut(handle)
    }

    /// Returns a reference to the object in slot `index`, or `None` if the slot is vacant.
    ///
    /// # Panics
    ///
    /// Panics if `index` is out of bounds.
    #[must_use]
    pub fn get_at(&self, index: usize) -> Option<&T> {
        if !self.is_occupied(index) {
            return None;
        }

        // SAFETY: The slot is occupied, so it holds an initialized value.
        Some(unsafe { self.slot(index).assume_init_ref() })
    }

    /// Returns an exclusive reference to the object in slot `index`, or `None` if the slot is
    /// vacant.
    ///
    /// # Panics
    ///
    /// Panics if `index` is out of bounds.
    #[must_use]
    pub fn get_at_mut(&mut self, index: usize) -> Option<&mut T> {
        if !self.is_occupied(index) {
            return None;
        }

        // SAFETY: The slot is occupied, so it holds an initialized value.
        Some(unsafe { self.slot_mut(index).assume_init_mut() })
    }

    /// Iterates over the occupied slots in index order, yielding `(index, &T)`.
    ///
    /// Each call starts a fresh pass over the pool. To add or remove objects while walking the
    /// pool, use a [`SlotWalker`][crate::SlotWalker] instead.
    ///
    /// # Example
    ///
    /// ```rust
    /// use new_zealand::nz;
    /// use slotted_pool::SlotPool;
    ///
    /// let mut pool = SlotPool::<char>::new(nz!(4));
    /// pool.insert('a');
    /// let b = pool.insert('b').unwrap();
    /// pool.insert('c');
    /// pool.remove(b);
    ///
    /// let live: Vec<_> = pool.iter().collect();
    /// assert_eq!(live, [(0, &'a'), (2, &'c')]);
    /// ```
    pub fn iter(&self) -> Iter<'_, T> {
        Iter::new(self.states(), self.slots())
    }

    /// Iterates over the occupied slots in index order, yielding `(index, &mut T)`.
    pub fn iter_mut(&mut self) -> IterMut<'_, T> {
        let (states, slots) = self.split_mut();
        IterMut::new(states, slots)
    }

    /// Removes every object from the pool, keeping the storage and the slot generations.
    ///
    /// Handles issued before the call no longer resolve afterwards.
    pub fn clear(&mut self) {
        self.drop_occupied();
        poison::fill(self.slots_mut(), poison::FREED);
        self.free_slot_hint = 0;
    }

    /// Drops every object and releases the storage if the pool owns it, leaving the pool with
    /// zero capacity. Calling this again does nothing.
    ///
    /// Storage supplied by the caller is left in place, with all states reset to
    /// [`SlotState::VACANT`].
    pub fn flush(&mut self) {
        if self.capacity == 0 {
            return;
        }

        debug!(
            capacity = self.capacity,
            owns_storage = self.owns_storage,
            item_type = type_name::<T>(),
            "flushing slot pool"
        );

        self.drop_occupied();
        self.states_mut().fill(SlotState::VACANT);
        poison::fill(self.slots_mut(), poison::NEVER_USED);

        if self.owns_storage {
            // SAFETY: When we own the storage, both pointers came from leaking boxed slices of
            // exactly `capacity` elements in `new_owned()`, and we have not released them yet.
            drop(unsafe {
                Box::from_raw(ptr::slice_from_raw_parts_mut(
                    self.items.as_ptr(),
                    self.capacity,
                ))
            });

            // SAFETY: As above.
            drop(unsafe {
                Box::from_raw(ptr::slice_from_raw_parts_mut(
                    self.states.as_ptr(),
                    self.capacity,
                ))
            });
        }

        self.items = NonNull::dangling();
        self.states = NonNull::dangling();
        self.capacity = 0;
        self.free_slot_hint = 0;
        self.owns_storage = false;
    }

    #[cfg(test)]
    pub(crate) fn free_slot_hint(&self) -> usize {
        self.free_slot_hint
    }

    /// Whether `handle` identifies the current occupant of its slot.
    fn is_live(&self, handle: Handle) -> bool {
        self.states()
            .get(handle.index())
            .is_some_and(|state| state.is_occupied() && *state == handle.state())
    }

    /// Finds a vacant slot, starting at the hint and wrapping around to the start.
    fn find_vacant(&self) -> Option<usize> {
        let start = if self.free_slot_hint < self.capacity {
            self.free_slot_hint
        } else {
            0
        };

        (start..self.capacity)
            .chain(0..start)
            .find(|&index| !self.state(index).is_occupied())
    }

    fn on_exhausted(&self) -> Option<Handle> {
        match self.exhaustion_policy {
            ExhaustionPolicy::ReturnNone => {
                error!(
                    capacity = self.capacity,
                    item_type = type_name::<T>(),
                    "slot pool is exhausted, allocation failed"
                );
                None
            }
            ExhaustionPolicy::Panic => panic!(
                "SlotPool of capacity {} for {} is exhausted - the pool is too small for the workload",
                self.capacity,
                type_name::<T>()
            ),
        }
    }

    /// Occupies the vacant slot `index` with the given state and moves the value from `f` in.
    fn place(&mut self, index: usize, state: SlotState, f: impl FnOnce(Handle) -> T) -> Handle {
        let handle = Handle::new(index, state);

        // Produce the value before touching the slot, so a panic in `f` leaves no trace.
        let value = f(handle);

        if self.is_tampered(index) {
            warn!(
                index,
                item_type = type_name::<T>(),
                "memory of a vacant slot was modified after its object was removed"
            );
        }

        let slot = self.slot_mut(index);

        poison::fill_one(slot, poison::FRESH);
        slot.write(value);

        self.set_state(index, state);

        handle
    }

    /// Whether the vacant slot `index` was written to after its previous object was removed.
    /// Always `false` for slots that have never been allocated or when poisoning is disabled.
    fn is_tampered(&self, index: usize) -> bool {
        let state = self.state(index);
        debug_assert!(!state.is_occupied());

        if state.generation() == 0 {
            return false;
        }

        // SAFETY: A vacant slot that has been allocated before was filled with the freed
        // pattern when its object left, so every byte of it is initialized.
        !unsafe { poison::holds(self.slot(index), poison::FREED) }
    }

    /// Drops every live object and marks its slot vacant.
    fn drop_occupied(&mut self) {
        for index in 0..self.capacity {
            let state = self.state(index);

            if !state.is_occupied() {
                continue;
            }

            self.set_state(index, state.vacated());

            let slot = self.slot_mut(index);

            // SAFETY: The slot was occupied, so it holds an initialized value. It is now marked
            // vacant, so the value will not be read or dropped again.
            let value = unsafe { slot.assume_init_read() };

            // The slot must already look freed if the destructor below panics.
            poison::fill_one(slot, poison::FREED);

            drop(value);
        }
    }

    fn assert_in_bounds(&self, index: usize) {
        assert!(
            self.is_in_bounds(index),
            "slot index {index} out of bounds in SlotPool of capacity {}",
            self.capacity
        );
    }

    fn state(&self, index: usize) -> SlotState {
        self.assert_in_bounds(index);

        *self
            .states()
            .get(index)
            .expect("guarded by bounds check above")
    }

    fn set_state(&mut self, index: usize, state: SlotState) {
        self.assert_in_bounds(index);

        *self
            .states_mut()
            .get_mut(index)
            .expect("guarded by bounds check above") = state;
    }

    fn slot(&self, index: usize) -> &MaybeUninit<T> {
        self.assert_in_bounds(index);

        self.slots()
            .get(index)
            .expect("guarded by bounds check above")
    }

    fn slot_mut(&mut self, index: usize) -> &mut MaybeUninit<T> {
        self.assert_in_bounds(index);

        self.slots_mut()
            .get_mut(index)
            .expect("guarded by bounds check above")
    }

    fn states(&self) -> &[SlotState] {
        // SAFETY: `states` is valid for `capacity` elements (or dangling with zero capacity)
        // and we hold a shared reference to the pool.
        unsafe { slice::from_raw_parts(self.states.as_ptr(), self.capacity) }
    }

    fn states_mut(&mut self) -> &mut [SlotState] {
        // SAFETY: `states` is valid for `capacity` elements (or dangling with zero capacity)
        // and we hold an exclusive reference to the pool.
        unsafe { slice::from_raw_parts_mut(self.states.as_ptr(), self.capacity) }
    }

    fn slots(&self) -> &[MaybeUninit<T>] {
        // SAFETY: `items` is valid for `capacity` elements (or dangling with zero capacity)
        // and we hold a shared reference to the pool.
        unsafe { slice::from_raw_parts(self.items.as_ptr(), self.capacity) }
    }

    fn slots_mut(&mut self) -> &mut [MaybeUninit<T>] {
        // SAFETY: `items` is valid for `capacity` elements (or dangling with zero capacity)
        // and we hold an exclusive reference to the pool.
        unsafe { slice::from_raw_parts_mut(self.items.as_ptr(), self.capacity) }
    }

    fn split_mut(&mut self) -> (&[SlotState], &mut [MaybeUninit<T>]) {
        // SAFETY: `states` is valid for `capacity` elements and never overlaps `items`.
        let states = unsafe { slice::from_raw_parts(self.states.as_ptr(), self.capacity) };

        // SAFETY: `items` is valid for `capacity` elements and we hold an exclusive reference
        // to the pool, so nobody else accesses it.
        let slots = unsafe { slice::from_raw_parts_mut(self.items.as_ptr(), self.capacity) };

        (states, slots)
    }
}

fn assert_valid_configuration<T>(capacity: usize) {
    assert!(size_of::<T>() > 0, "SlotPool must have non-zero item size");
    assert!(
        capacity <= MAX_CAPACITY,
        "SlotPool capacity {capacity} exceeds the maximum of {MAX_CAPACITY}"
    );
}

impl<T> Drop for SlotPool<T> {
    fn drop(&mut self) {
        let remaining = self.count_occupied();

        self.flush();

        // Storage is released before the policy check. A second panic during unwinding
        // would abort the process.
        if !thread::panicking() && matches!(self.drop_policy, DropPolicy::MustNotDropItems) {
            assert!(
                remaining == 0,
                "dropped a SlotPool with {remaining} items - this is forbidden by DropPolicy::MustNotDropItems"
            );
        }
    }
}

impl<T> fmt::Debug for SlotPool<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SlotPool")
            .field("item_type", &type_name::<T>())
            .field("capacity", &self.capacity)
            .field("occupied", &self.count_occupied())
            .field("free_slot_hint", &self.free_slot_hint)
            .field("owns_storage", &self.owns_storage)
            .field("exhaustion_policy", &self.exhaustion_policy)
            .field("drop_policy", &self.drop_policy)
            .finish_non_exhaustive()
    }
}

impl<'a, T> IntoIterator for &'a SlotPool<T> {
    type Item = (usize, &'a T);
    type IntoIter = Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<'a, T> IntoIterator for &'a mut SlotPool<T> {
    type Item = (usize, &'a mut T);
    type IntoIter = IterMut<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter_mut()
    }
}

// SAFETY: The pool exclusively owns the objects in its slots (or exclusively uses the storage
// supplied by the caller), so moving the pool to another thread moves the objects with it.
unsafe impl<T: Send> Send for SlotPool<T> {}

// SAFETY: Through a shared reference, the pool only hands out shared references to its objects
// and never mutates anything.
unsafe impl<T: Sync> Sync for SlotPool<T> {}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
#[allow(
    clippy::indexing_slicing,
    clippy::arithmetic_side_effects,
    reason = "test code doesn't need the same rigor as production code"
)]
mod tests {
    use std::cell::Cell;
    use std::panic::{self, AssertUnwindSafe};
    use std::rc::Rc;

    use new_zealand::nz;
    use static_assertions::{assert_impl_all, assert_not_impl_any};

    use super::*;
    use crate::MAX_GENERATION;

    assert_impl_all!(SlotPool<u32>: Send, Sync, fmt::Debug);
    assert_impl_all!(SlotPool<Cell<u32>>: Send);
    assert_not_impl_any!(SlotPool<Cell<u32>>: Sync);
    assert_not_impl_any!(SlotPool<Rc<u32>>: Send, Sync);

    /// Counts how many times it has been dropped.
    struct DropCounter(Rc<Cell<usize>>);

    impl Drop for DropCounter {
        fn drop(&mut self) {
            self.0.set(self.0.get() + 1);
        }
    }

    fn tolerant_pool<T>(capacity: NonZero<usize>) -> SlotPool<T> {
        SlotPool::builder()
            .capacity(capacity)
            .exhaustion_policy(ExhaustionPolicy::ReturnNone)
            .build()
    }

    #[test]
    fn new_pool_is_empty() {
        let pool = SlotPool::<u64>::new(nz!(4));

        assert_eq!(pool.capacity(), 4);
        assert_eq!(pool.count_occupied(), 0);
        assert_eq!(pool.count_vacant(), 4);
        assert!(pool.is_empty());
        assert!(!pool.is_full());
        assert!(pool.owns_storage());
        assert_eq!(pool.item_size(), 8);
        assert_eq!(pool.free_slot_hint(), 0);
        assert_eq!(pool.exhaustion_policy(), ExhaustionPolicy::Panic);
        assert_eq!(pool.drop_policy(), DropPolicy::MayDropItems);

        for index in 0..4 {
            assert!(!pool.is_occupied(index));
        }
    }

    #[test]
    fn insert_and_get() {
        let mut pool = SlotPool::<u32>::new(nz!(3));

        let a = pool.insert(10).unwrap();
        let b = pool.insert(20).unwrap();

        assert_eq!(a.index(), 0);
        assert_eq!(b.index(), 1);
        assert_eq!(a.generation(), 1);
        assert!(a.is_occupied());

        assert_eq!(pool.get(a), Some(&10));
        assert_eq!(pool.get(b), Some(&20));
        assert_eq!(pool.get_at(0), Some(&10));
        assert_eq!(pool.get_at(2), None);

        *pool.get_mut(a).unwrap() += 5;
        *pool.get_at_mut(1).unwrap() += 5;

        assert_eq!(pool.get(a), Some(&15));
        assert_eq!(pool.get(b), Some(&25));
        assert_eq!(pool.count_occupied(), 2);
    }

    #[test]
    fn allocation_sets_hint_to_allocated_slot() {
        let mut pool = SlotPool::<u32>::new(nz!(4));

        pool.insert(1);
        pool.insert(2);

        assert_eq!(pool.free_slot_hint(), 1);
    }

    #[test]
    fn remove_moves_hint_back_to_earlier_slot() {
        let mut pool = SlotPool::<u32>::new(nz!(4));

        let a = pool.insert(1).unwrap();
        pool.insert(2);
        pool.insert(3);
        assert_eq!(pool.free_slot_hint(), 2);

        assert_eq!(pool.remove(a), 1);
        assert_eq!(pool.free_slot_hint(), 0);

        // The next allocation reuses the earliest slot.
        let d = pool.insert(4).unwrap();
        assert_eq!(d.index(), 0);
    }

    #[test]
    fn remove_later_slot_keeps_hint() {
        let mut pool = SlotPool::<u32>::new(nz!(4));

        pool.insert(1);
        let b = pool.insert(2).unwrap();
        let c = pool.insert(3).unwrap();

        pool.remove(c);
        pool.remove(b);
        assert_eq!(pool.free_slot_hint(), 1);
    }

    #[test]
    fn search_wraps_around_to_start() {
        let mut pool = SlotPool::<u32>::new(nz!(3));

        let a = pool.insert(1).unwrap();
        pool.insert(2);
        pool.insert(3);

        pool.remove(a);

        // Removal moved the hint back to 0. Push it to the end to exercise the wrap-around.
        pool.free_slot_hint = 2;

        let d = pool.insert(4).unwrap();
        assert_eq!(d.index(), 0);
    }

    #[test]
    fn correct_regardless_of_hint_value() {
        for hint in 0..8 {
            let mut pool = SlotPool::<usize>::new(nz!(4));

            let handles: Vec<_> = (0..4).map(|i| pool.insert(i).unwrap()).collect();
            pool.remove(handles[2]);

            pool.free_slot_hint = hint;

            let handle = pool.insert(99).unwrap();
            assert_eq!(handle.index(), 2, "hint {hint}");
        }
    }

    #[test]
    fn reallocation_advances_generation() {
        let mut pool = SlotPool::<u32>::new(nz!(1));

        let first = pool.insert(1).unwrap();
        pool.remove(first);
        let second = pool.insert(2).unwrap();

        assert_eq!(first.index(), second.index());
        assert!(second.generation() > first.generation());
        assert_ne!(first, second);
        assert_eq!(pool.get(first), None);
        assert_eq!(pool.get(second), Some(&2));
    }

    #[test]
    fn generation_wraps_with_bounded_collision_window() {
        let mut pool = SlotPool::<u32>::new(nz!(1));

        let first = pool.insert(0).unwrap();
        pool.remove(first);

        let mut last = first;
        for cycle in 1..u32::from(MAX_GENERATION) {
            last = pool.insert(cycle).unwrap();
            assert_ne!(last, first);
            pool.remove(last);
        }
        assert_eq!(last.generation(), MAX_GENERATION);

        // The allocation after generation 127 reuses generation 1, so the very first handle
        // resolves again. This is the known false-acceptance window.
        let wrapped = pool.insert(128).unwrap();
        assert_eq!(wrapped, first);
        assert_eq!(pool.get(first), Some(&128));
    }

    #[test]
    fn exhaustion_returns_none_when_tolerated() {
        let mut pool = tolerant_pool::<u32>(nz!(2));

        assert!(pool.insert(1).is_some());
        assert!(pool.insert(2).is_some());
        assert!(pool.insert(3).is_none());
        assert!(pool.insert_with(|_| 4).is_none());

        assert_eq!(pool.count_occupied(), 2);
        assert!(pool.is_full());
    }

    #[test]
    #[should_panic]
    fn exhaustion_panics_by_default() {
        let mut pool = SlotPool::<u32>::new(nz!(1));

        pool.insert(1);
        pool.insert(2);
    }

    #[test]
    fn try_insert_reports_exhaustion_regardless_of_policy() {
        let mut pool = SlotPool::<u32>::new(nz!(1));

        pool.try_insert(1).unwrap();
        let error = pool.try_insert(2).unwrap_err();

        assert!(matches!(error, Error::Exhausted { capacity: 1 }));
    }

    #[test]
    fn insert_with_passes_own_handle() {
        let mut pool = SlotPool::<Handle>::new(nz!(2));

        let handle = pool.insert_with(|me| me).unwrap();

        assert_eq!(pool.get(handle), Some(&handle));
    }

    #[test]
    fn insert_with_panic_leaves_pool_unchanged() {
        let mut pool = SlotPool::<u32>::new(nz!(2));

        let result = panic::catch_unwind(AssertUnwindSafe(|| {
            pool.insert_with(|_| panic!("construction failed"));
        }));
        assert!(result.is_err());

        assert!(pool.is_empty());
        assert_eq!(pool.handle_at(0), None);
    }

    #[test]
    fn insert_at_occupies_requested_slot() {
        let mut pool = SlotPool::<u32>::new(nz!(8));

        let handle = pool.insert_at(5, 55);

        assert_eq!(handle.index(), 5);
        assert_eq!(handle.generation(), 1);
        assert!(pool.is_occupied(5));
        assert_eq!(pool.get(handle), Some(&55));

        // The hint still points at the lowest vacant slot, so regular allocation fills from 0.
        assert_eq!(pool.free_slot_hint(), 0);
        assert_eq!(pool.insert(0).unwrap().index(), 0);
    }

    #[test]
    fn insert_at_hint_slot_moves_on() {
        let mut pool = SlotPool::<u32>::new(nz!(3));

        pool.insert_at(0, 1);

        assert_eq!(pool.insert(2).unwrap().index(), 1);
    }

    #[test]
    #[should_panic]
    fn insert_at_occupied_slot_panics() {
        let mut pool = SlotPool::<u32>::new(nz!(2));

        pool.insert_at(1, 1);
        pool.insert_at(1, 2);
    }

    #[test]
    #[should_panic]
    fn insert_at_out_of_bounds_panics() {
        let mut pool = SlotPool::<u32>::new(nz!(2));

        pool.insert_at(2, 1);
    }

    #[test]
    fn restore_reuses_exact_handle() {
        let mut pool = SlotPool::<u32>::new(nz!(4));
        let handle = Handle::new(3, SlotState::from_byte(0x80 | 42));

        pool.restore(handle, 7).unwrap();

        assert_eq!(pool.get(handle), Some(&7));
        assert_eq!(pool.handle_at(3), Some(handle));

        // Later allocations of the slot continue from the restored generation.
        pool.remove(handle);
        let next = pool.insert(8).unwrap();
        assert_eq!(next.index(), 0);
        let again = pool.insert_at(3, 9);
        assert_eq!(again.generation(), 43);
    }

    #[test]
    fn restore_rejects_bad_handles() {
        let mut pool = SlotPool::<u32>::new(nz!(4));
        let occupied = pool.insert(1).unwrap();

        assert!(matches!(
            pool.restore(Handle::from_bits(0x0000_0481), 0),
            Err(Error::IndexOutOfBounds {
                index: 4,
                capacity: 4
            })
        ));
        assert!(matches!(
            pool.restore(Handle::from_bits(0x0000_0101), 0),
            Err(Error::InvalidHandle { .. })
        ));
        assert!(matches!(
            pool.restore(Handle::from_bits(0x0000_0180), 0),
            Err(Error::InvalidHandle { .. })
        ));
        assert!(matches!(
            pool.restore(occupied, 0),
            Err(Error::SlotOccupied { index: 0 })
        ));

        assert_eq!(pool.count_occupied(), 1);
    }

    #[test]
    #[should_panic]
    fn double_remove_panics() {
        let mut pool = SlotPool::<u32>::new(nz!(2));

        let handle = pool.insert(1).unwrap();
        pool.remove(handle);
        pool.remove(handle);
    }

    #[test]
    #[should_panic]
    fn remove_stale_handle_panics() {
        let mut pool = SlotPool::<u32>::new(nz!(1));

        let stale = pool.insert(1).unwrap();
        pool.remove(stale);
        pool.insert(2);

        pool.remove(stale);
    }

    #[test]
    #[should_panic]
    fn remove_at_vacant_slot_panics() {
        let mut pool = SlotPool::<u32>::new(nz!(2));

        pool.remove_at(0);
    }

    #[test]
    fn get_never_panics_on_arbitrary_handles() {
        let mut pool = SlotPool::<u32>::new(nz!(4));
        pool.insert(1);
        let removed = pool.insert(2).unwrap();
        pool.remove(removed);

        for bits in [0, 0x80, 0x81, 0x101, 0x181, 0x400, 0xFFFF_FFFF, 0x8000_0081] {
            let handle = Handle::from_bits(bits);
            let expected = (bits == 0x81).then_some(&1);

            assert_eq!(pool.get(handle), expected, "bits {bits:#x}");
            assert_eq!(pool.get_mut(handle).is_some(), expected.is_some());
        }
    }

    #[test]
    fn get_rejects_vacant_slot_with_matching_state_byte() {
        let mut pool = SlotPool::<u32>::new(nz!(1));

        let handle = pool.insert(1).unwrap();
        pool.remove(handle);

        // Occupied flag clear, generation equal to the vacant slot's state.
        let forged = Handle::from_bits(0x0000_0001);
        assert_eq!(pool.get(forged), None);
    }

    #[test]
    fn get_trusted_checks_generation() {
        let mut pool = SlotPool::<u32>::new(nz!(2));

        let stale = pool.insert(1).unwrap();
        pool.remove(stale);
        let fresh = pool.insert(2).unwrap();

        assert_eq!(pool.get_trusted(stale), None);
        assert_eq!(pool.get_trusted(fresh), Some(&2));
        *pool.get_trusted_mut(fresh).unwrap() = 3;
        assert_eq!(pool.get(fresh), Some(&3));
    }

    #[test]
    #[should_panic]
    fn get_trusted_out_of_bounds_panics() {
        let pool = SlotPool::<u32>::new(nz!(2));

        _ = pool.get_trusted(Handle::from_bits(0x0000_0281));
    }

    #[test]
    #[should_panic]
    fn is_occupied_out_of_bounds_panics() {
        let pool = SlotPool::<u32>::new(nz!(2));

        _ = pool.is_occupied(2);
    }

    #[test]
    fn pointer_queries() {
        let mut pool = SlotPool::<u64>::new(nz!(4));

        pool.insert(1);
        let b = pool.insert(2).unwrap();

        let ptr: *const u64 = pool.get(b).unwrap();

        assert!(pool.contains_ptr(ptr));
        assert_eq!(pool.index_of(ptr), 1);
        assert_eq!(pool.handle_of(ptr), b);

        let outside = 5_u64;
        assert!(!pool.contains_ptr(&outside));

        let vacant = ptr.wrapping_add(1);
        assert!(pool.contains_ptr(vacant));
        assert_eq!(pool.index_of(vacant), 2);
        assert!(!pool.handle_of(vacant).is_occupied());

        let past_end = ptr.wrapping_add(3);
        assert!(!pool.contains_ptr(past_end));
    }

    #[test]
    #[should_panic]
    fn index_of_foreign_pointer_panics() {
        let pool = SlotPool::<u64>::new(nz!(4));
        let outside = 5_u64;

        _ = pool.index_of(&outside);
    }

    #[test]
    #[should_panic]
    fn index_of_misaligned_pointer_panics() {
        let mut pool = SlotPool::<u64>::new(nz!(4));
        let handle = pool.insert(1).unwrap();

        let ptr: *const u64 = pool.get(handle).unwrap();
        let inside = ptr.cast::<u8>().wrapping_add(3).cast::<u64>();

        _ = pool.index_of(inside);
    }

    #[test]
    fn remove_returns_value_without_dropping_it() {
        let drops = Rc::new(Cell::new(0));
        let mut pool = SlotPool::<DropCounter>::new(nz!(2));

        let handle = pool.insert(DropCounter(Rc::clone(&drops))).unwrap();
        let value = pool.remove(handle);
        assert_eq!(drops.get(), 0);

        drop(value);
        assert_eq!(drops.get(), 1);
    }

    #[test]
    fn clear_drops_items_and_keeps_generations() {
        let drops = Rc::new(Cell::new(0));
        let mut pool = SlotPool::<DropCounter>::new(nz!(3));

        let a = pool.insert(DropCounter(Rc::clone(&drops))).unwrap();
        pool.insert(DropCounter(Rc::clone(&drops)));

        pool.clear();

        assert_eq!(drops.get(), 2);
        assert!(pool.is_empty());
        assert_eq!(pool.capacity(), 3);
        assert!(pool.get(a).is_none());

        let again = pool.insert(DropCounter(Rc::clone(&drops))).unwrap();
        assert_eq!(again.index(), 0);
        assert_eq!(again.generation(), 2);
    }

    #[test]
    fn clear_survives_panicking_destructor() {
        struct Bomb(u64);

        impl Drop for Bomb {
            fn drop(&mut self) {
                panic!("bomb {} went off", self.0);
            }
        }

        let mut pool = SlotPool::<Bomb>::new(nz!(2));
        pool.insert(Bomb(7));

        let result = panic::catch_unwind(AssertUnwindSafe(|| pool.clear()));
        assert!(result.is_err());

        // The object is gone exactly once and the slot can be reused.
        assert!(!pool.is_occupied(0));
        let handle = pool.insert(Bomb(8)).unwrap();
        assert_eq!(handle.index(), 0);
        assert_eq!(handle.generation(), 2);

        std::mem::forget(pool.remove(handle));
    }

    #[test]
    fn flush_is_idempotent() {
        let drops = Rc::new(Cell::new(0));
        let mut pool = SlotPool::<DropCounter>::new(nz!(3));

        let handle = pool.insert(DropCounter(Rc::clone(&drops))).unwrap();

        pool.flush();
        assert_eq!(drops.get(), 1);
        assert_eq!(pool.capacity(), 0);
        assert!(!pool.owns_storage());
        assert!(pool.get(handle).is_none());
        assert_eq!(pool.iter().count(), 0);

        pool.flush();
        assert_eq!(drops.get(), 1);
    }

    #[test]
    fn drop_drops_remaining_items() {
        let drops = Rc::new(Cell::new(0));

        {
            let mut pool = SlotPool::<DropCounter>::new(nz!(3));
            pool.insert(DropCounter(Rc::clone(&drops)));
            pool.insert(DropCounter(Rc::clone(&drops)));
        }

        assert_eq!(drops.get(), 2);
    }

    #[test]
    #[should_panic]
    fn must_not_drop_items_panics_when_items_remain() {
        let mut pool = SlotPool::<u32>::builder()
            .capacity(nz!(2))
            .drop_policy(DropPolicy::MustNotDropItems)
            .build();

        pool.insert(1);
    }

    #[test]
    fn must_not_drop_items_allows_empty_drop() {
        let mut pool = SlotPool::<u32>::builder()
            .capacity(nz!(2))
            .drop_policy(DropPolicy::MustNotDropItems)
            .build();

        let handle = pool.insert(1).unwrap();
        pool.remove(handle);
    }

    #[test]
    fn iteration_skips_vacant_slots() {
        let mut pool = SlotPool::<u32>::new(nz!(5));

        let handles: Vec<_> = (0..5).map(|i| pool.insert(i * 10).unwrap()).collect();
        pool.remove(handles[1]);
        pool.remove(handles[3]);

        let live: Vec<_> = pool.iter().map(|(index, value)| (index, *value)).collect();
        assert_eq!(live, [(0, 0), (2, 20), (4, 40)]);

        for (_, value) in &mut pool {
            *value += 1;
        }

        let live: Vec<_> = (&pool).into_iter().map(|(_, value)| *value).collect();
        assert_eq!(live, [1, 21, 41]);
    }

    #[test]
    fn debug_output_summarizes_pool() {
        let mut pool = SlotPool::<u32>::new(nz!(2));
        pool.insert(1);

        let text = format!("{pool:?}");

        assert!(text.contains("capacity: 2"));
        assert!(text.contains("occupied: 1"));
    }

    #[test]
    #[should_panic]
    fn zero_sized_items_are_rejected() {
        _ = SlotPool::<()>::new(nz!(1));
    }

    #[test]
    #[should_panic]
    fn oversized_capacity_is_rejected() {
        _ = SlotPool::<u8>::new(NonZero::new(MAX_CAPACITY + 1).unwrap());
    }

    #[cfg(debug_assertions)]
    mod poisoning {
        use super::*;

        fn slot_holds<T>(pool: &SlotPool<T>, index: usize, pattern: u8) -> bool {
            // SAFETY: Only used on vacant slots or slots holding a type without padding, so
            // every byte is initialized.
            unsafe { poison::holds(pool.slot(index), pattern) }
        }

        #[test]
        fn new_storage_is_never_used() {
            let pool = SlotPool::<u64>::new(nz!(3));

            for index in 0..3 {
                assert!(slot_holds(&pool, index, poison::NEVER_USED));
            }
        }

        #[test]
        fn removed_slot_is_freed() {
            let mut pool = SlotPool::<u64>::new(nz!(3));

            let handle = pool.insert(1).unwrap();
            assert!(!slot_holds(&pool, 0, poison::FREED));

            pool.remove(handle);
            assert!(slot_holds(&pool, 0, poison::FREED));
            assert!(slot_holds(&pool, 1, poison::NEVER_USED));
        }

        #[test]
        fn slot_vacated_by_panicking_destructor_is_freed() {
            struct Bomb(u64);

            impl Drop for Bomb {
                fn drop(&mut self) {
                    panic!("bomb {} went off", self.0);
                }
            }

            let mut pool = SlotPool::<Bomb>::new(nz!(2));
            pool.insert(Bomb(7));

            let result = panic::catch_unwind(AssertUnwindSafe(|| pool.clear()));
            assert!(result.is_err());

            assert!(!pool.is_occupied(0));
            assert!(slot_holds(&pool, 0, poison::FREED));
            assert!(!pool.is_tampered(0));
        }

        #[test]
        fn write_to_vacant_slot_is_detected() {
            let mut pool = SlotPool::<u64>::new(nz!(2));

            let handle = pool.insert(1).unwrap();
            pool.remove(handle);
            assert!(!pool.is_tampered(0));
            assert!(!pool.is_tampered(1));

            // SAFETY: Slot 0 is vacant and lies within the storage, so writing one byte into it
            // does not break any live object.
            unsafe {
                pool.items.as_ptr().cast::<u8>().write(0x42);
            }
            assert!(pool.is_tampered(0));

            // Allocation proceeds regardless and overwrites the damage.
            let again = pool.insert(2).unwrap();
            assert_eq!(again.index(), 0);
            assert_eq!(pool.get(again), Some(&2));

            pool.remove(again);
            assert!(!pool.is_tampered(0));
        }

        #[test]
        fn clear_fills_everything_with_freed() {
            let mut pool = SlotPool::<u64>::new(nz!(3));
            pool.insert(1);

            pool.clear();

            for index in 0..3 {
                assert!(slot_holds(&pool, index, poison::FREED));
            }
        }
    }
}
