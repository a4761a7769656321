use std::iter::{Enumerate, FusedIterator, Zip};
use std::mem::MaybeUninit;
use std::slice;

use crate::{Handle, SlotPool, SlotState};

/// Iterator over the occupied slots of a [`SlotPool`], yielding `(index, &T)`.
///
/// Created by [`SlotPool::iter()`].
#[derive(Debug)]
pub struct Iter<'a, T> {
    inner: Zip<Enumerate<slice::Iter<'a, SlotState>>, slice::Iter<'a, MaybeUninit<T>>>,
}

impl<'a, T> Iter<'a, T> {
    pub(crate) fn new(states: &'a [SlotState], slots: &'a [MaybeUninit<T>]) -> Self {
        Self {
            inner: states.iter().enumerate().zip(slots.iter()),
        }
    }
}

impl<'a, T> Iterator for Iter<'a, T> {
    type Item = (usize, &'a T);

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.find_map(|((index, state), slot)| {
            // SAFETY: Occupied slots hold initialized values.
            state
                .is_occupied()
                .then(|| (index, unsafe { slot.assume_init_ref() }))
        })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (0, self.inner.size_hint().1)
    }
}

impl<T> FusedIterator for Iter<'_, T> {}

/// Iterator over the occupied slots of a [`SlotPool`], yielding `(index, &mut T)`.
///
/// Created by [`SlotPool::iter_mut()`].
#[derive(Debug)]
pub struct IterMut<'a, T> {
    inner: Zip<Enumerate<slice::Iter<'a, SlotState>>, slice::IterMut<'a, MaybeUninit<T>>>,
}

impl<'a, T> IterMut<'a, T> {
    pub(crate) fn new(states: &'a [SlotState], slots: &'a mut [MaybeUninit<T>]) -> Self {
        Self {
            inner: states.iter().enumerate().zip(slots.iter_mut()),
        }
    }
}

impl<'a, T> Iterator for IterMut<'a, T> {
    type Item = (usize, &'a mut T);

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.find_map(|((index, state), slot)| {
            // SAFETY: Occupied slots hold initialized values.
            state
                .is_occupied()
                .then(|| (index, unsafe { slot.assume_init_mut() }))
        })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (0, self.inner.size_hint().1)
    }
}

impl<T> FusedIterator for IterMut<'_, T> {}

/// Walks the occupied slots of a [`SlotPool`] without borrowing it between steps.
///
/// Unlike [`SlotPool::iter()`], the walker lets you allocate and remove objects while walking,
/// including removing the object the walker just yielded. Slots that become occupied behind the
/// walker's position are not visited; slots ahead of it are visited if they are occupied when
/// the walker reaches them.
///
/// # Example
///
/// ```rust
/// use new_zealand::nz;
/// use slotted_pool::{SlotPool, SlotWalker};
///
/// let mut pool = SlotPool::<u32>::new(nz!(8));
/// for value in 0..8 {
///     pool.insert(value);
/// }
///
/// // Remove every odd value while walking the pool.
/// let mut walker = SlotWalker::new();
/// while let Some(handle) = walker.next_handle(&pool) {
///     if pool.get(handle).is_some_and(|value| value % 2 == 1) {
///         pool.remove(handle);
///     }
/// }
///
/// assert_eq!(pool.count_occupied(), 4);
/// ```
#[derive(Clone, Debug, Default)]
pub struct SlotWalker {
    next_index: usize,
}

impl SlotWalker {
    /// Creates a walker positioned at the first slot.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the handle of the next occupied slot at or after the walker's position, or `None`
    /// once the walker has passed the end of the pool.
    pub fn next_handle<T>(&mut self, pool: &SlotPool<T>) -> Option<Handle> {
        while pool.is_in_bounds(self.next_index) {
            let index = self.next_index;

            // Cannot overflow - bounded by the pool capacity.
            self.next_index = index.wrapping_add(1);

            if let Some(handle) = pool.handle_at(index) {
                return Some(handle);
            }
        }

        None
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
#[allow(
    clippy::indexing_slicing,
    reason = "test code doesn't need the same rigor as production code"
)]
mod tests {
    use new_zealand::nz;
    use static_assertions::assert_impl_all;

    use super::*;

    assert_impl_all!(Iter<'static, u32>: Send, Sync, FusedIterator);
    assert_impl_all!(IterMut<'static, u32>: Send, FusedIterator);
    assert_impl_all!(SlotWalker: Send, Sync, Clone);

    #[test]
    fn iter_on_empty_pool_yields_nothing() {
        let pool = SlotPool::<u32>::new(nz!(4));

        assert_eq!(pool.iter().next(), None);
        assert_eq!(pool.iter().size_hint(), (0, Some(4)));
    }

    #[test]
    fn iter_is_restartable() {
        let mut pool = SlotPool::<u32>::new(nz!(4));
        pool.insert(1);
        pool.insert(2);

        let first: Vec<_> = pool.iter().collect();
        let second: Vec<_> = pool.iter().collect();

        assert_eq!(first, second);
        assert_eq!(first.len(), 2);
    }

    #[test]
    fn iter_mut_modifies_in_place() {
        let mut pool = SlotPool::<u32>::new(nz!(3));
        let a = pool.insert(1).unwrap();
        let b = pool.insert(2).unwrap();

        for (index, value) in pool.iter_mut() {
            *value *= 10 + u32::try_from(index).unwrap();
        }

        assert_eq!(pool.get(a), Some(&10));
        assert_eq!(pool.get(b), Some(&22));
    }

    #[test]
    fn iter_is_fused() {
        let mut pool = SlotPool::<u32>::new(nz!(2));
        pool.insert(1);

        let mut iter = pool.iter();
        assert!(iter.next().is_some());
        assert!(iter.next().is_none());
        assert!(iter.next().is_none());
    }

    #[test]
    fn walker_visits_occupied_slots_in_order() {
        let mut pool = SlotPool::<u32>::new(nz!(5));
        let handles: Vec<_> = (0..5).map(|i| pool.insert(i).unwrap()).collect();
        pool.remove(handles[0]);
        pool.remove(handles[3]);

        let mut walker = SlotWalker::new();
        let mut visited = Vec::new();
        while let Some(handle) = walker.next_handle(&pool) {
            visited.push(handle);
        }

        assert_eq!(visited, [handles[1], handles[2], handles[4]]);
        assert_eq!(walker.next_handle(&pool), None);
    }

    #[test]
    fn walker_tolerates_removal_of_other_slots() {
        let mut pool = SlotPool::<u32>::new(nz!(4));
        let handles: Vec<_> = (0..4).map(|i| pool.insert(i).unwrap()).collect();

        let mut walker = SlotWalker::new();
        let first = walker.next_handle(&pool).unwrap();
        assert_eq!(first, handles[0]);

        // Remove a slot ahead of the walker - it must not be visited.
        pool.remove(handles[2]);

        let rest: Vec<_> = std::iter::from_fn(|| walker.next_handle(&pool)).collect();
        assert_eq!(rest, [handles[1], handles[3]]);
    }

    #[test]
    fn walker_on_flushed_pool_yields_nothing() {
        let mut pool = SlotPool::<u32>::new(nz!(2));
        pool.insert(1);
        pool.flush();

        assert_eq!(SlotWalker::new().next_handle(&pool), None);
    }
}
