//! End-to-end scenarios for `SlotPool`, exercised through the public API only.

use std::mem::MaybeUninit;
use std::ptr::NonNull;
use std::sync::{Arc, Mutex};
use std::thread;

use new_zealand::nz;
use slotted_pool::{
    Error, ExhaustionPolicy, Handle, MAX_GENERATION, SlotPool, SlotState, SlotWalker,
};

fn tolerant_pool<T>(capacity: usize) -> SlotPool<T> {
    SlotPool::builder()
        .capacity(capacity.try_into().unwrap())
        .exhaustion_policy(ExhaustionPolicy::ReturnNone)
        .build()
}

#[test]
fn fill_free_and_refill() {
    let mut pool = tolerant_pool::<String>(4);

    let handles: Vec<Handle> = (0..4)
        .map(|i| pool.insert(format!("object {i}")).unwrap())
        .collect();

    // Four distinct handles, all of which resolve.
    for (i, handle) in handles.iter().enumerate() {
        assert_eq!(pool.get(*handle), Some(&format!("object {i}")));
        for other in &handles[i + 1..] {
            assert_ne!(handle, other);
        }
    }

    assert!(pool.insert("overflow".to_string()).is_none());
    assert_eq!(pool.count_occupied(), 4);

    let old = handles[2];
    assert_eq!(pool.remove(old), "object 2");
    assert_eq!(pool.count_occupied(), 3);

    let new = pool.insert("replacement".to_string()).unwrap();
    assert_eq!(new.index(), 2);
    assert!(new.generation() > old.generation());

    assert!(pool.get(old).is_none());
    assert_eq!(pool.get(new).map(String::as_str), Some("replacement"));
}

#[test]
fn insert_at_fixed_index_on_empty_pool() {
    let mut pool = SlotPool::<u32>::new(nz!(8));

    let handle = pool.insert_at(5, 500);

    assert!(pool.is_occupied(5));
    assert_eq!(handle.index(), 5);
    assert_eq!(handle.generation(), 1);

    // Regular allocation goes to the lowest vacant slot.
    let next = pool.insert(0).unwrap();
    assert_eq!(next.index(), 0);
}

#[test]
fn count_never_exceeds_capacity() {
    let mut pool = tolerant_pool::<usize>(3);
    let mut live = Vec::new();

    for step in 0..50_usize {
        if step % 3 == 2 {
            if let Some(handle) = live.pop() {
                pool.remove(handle);
            }
        } else if let Some(handle) = pool.insert(step) {
            live.push(handle);
        }

        assert!(pool.count_occupied() <= pool.capacity());
        assert_eq!(pool.count_occupied(), live.len());
    }
}

#[test]
fn iteration_excludes_freed_slot() {
    let mut pool = SlotPool::<u32>::new(nz!(6));
    let handles: Vec<_> = (0..6).map(|i| pool.insert(i).unwrap()).collect();

    pool.remove(handles[3]);

    let indexes: Vec<usize> = pool.iter().map(|(index, _)| index).collect();
    assert_eq!(indexes.len(), pool.count_occupied());
    assert!(!indexes.contains(&3));
}

#[test]
fn stale_handle_resolves_again_after_full_generation_cycle() {
    let mut pool = SlotPool::<u32>::new(nz!(1));

    let cycle_1 = pool.insert(1).unwrap();
    pool.remove(cycle_1);

    for cycle in 2..=u32::from(MAX_GENERATION) {
        let handle = pool.insert(cycle).unwrap();
        assert!(pool.get(cycle_1).is_none());
        pool.remove(handle);
    }

    let cycle_128 = pool.insert(128).unwrap();
    assert_eq!(cycle_128, cycle_1);
}

#[test]
fn non_owning_pool_leaves_storage_to_caller() {
    let items = Box::into_raw(Box::<[u64]>::new_uninit_slice(4));
    let states = Box::into_raw(vec![SlotState::VACANT; 4].into_boxed_slice());

    let items_start = NonNull::new(items).unwrap().cast::<MaybeUninit<u64>>();
    let states_start = NonNull::new(states).unwrap().cast::<SlotState>();

    // SAFETY: Both buffers have 4 elements and are not touched until the pool is gone.
    let mut pool = unsafe {
        SlotPool::<u64>::builder()
            .capacity(nz!(4))
            .build_from_raw(items_start, states_start)
    };

    assert!(!pool.owns_storage());
    assert!(pool.contains_ptr(items_start.as_ptr().cast::<u64>()));

    let handle = pool.insert(0xAAAA).unwrap();
    assert_eq!(pool.get(handle), Some(&0xAAAA));

    pool.flush();
    pool.flush();
    drop(pool);

    // SAFETY: The pool is gone and never released the buffers, so they are still ours to
    // inspect and free. Freeing them twice would abort the test process.
    unsafe {
        assert!((*states).iter().all(|state| *state == SlotState::VACANT));
    }

    // SAFETY: As above.
    drop(unsafe { Box::from_raw(states) });
    // SAFETY: As above.
    drop(unsafe { Box::from_raw(items) });
}

#[test]
fn persisted_handles_survive_reload() {
    let mut original = SlotPool::<String>::new(nz!(8));

    let a = original.insert("a".to_string()).unwrap();
    let b = original.insert("b".to_string()).unwrap();
    original.remove(a);
    let c = original.insert("c".to_string()).unwrap();

    let saved: Vec<(u32, String)> = original
        .iter()
        .map(|(index, value)| (original.handle_at(index).unwrap().into(), value.clone()))
        .collect();

    let mut reloaded = SlotPool::<String>::new(nz!(8));
    for (bits, value) in saved {
        reloaded.restore(Handle::from(bits), value).unwrap();
    }

    assert!(reloaded.get(a).is_none());
    assert_eq!(reloaded.get(b).map(String::as_str), Some("b"));
    assert_eq!(reloaded.get(c).map(String::as_str), Some("c"));

    // A pool reloaded without restoring generations does not accept the old handles.
    let mut regenerated = SlotPool::<String>::new(nz!(8));
    regenerated.insert_at(0, "c".to_string());
    regenerated.insert_at(1, "b".to_string());
    assert!(regenerated.get(c).is_none());
}

#[test]
fn restore_from_corrupted_save_fails_gracefully() {
    let mut pool = SlotPool::<u32>::new(nz!(2));

    for bits in [0xFFFF_FFFF, 0x0000_0000, 0x0000_0005, 0x0000_0200] {
        assert!(pool.restore(Handle::from_bits(bits), 1).is_err());
    }

    assert!(matches!(
        pool.restore(Handle::from_bits(0x0000_0200), 1),
        Err(Error::IndexOutOfBounds { .. })
    ));
    assert!(pool.is_empty());
}

#[test]
fn walker_allows_removal_during_traversal() {
    let mut pool = SlotPool::<u32>::new(nz!(10));
    for value in 0..10 {
        pool.insert(value);
    }

    let mut walker = SlotWalker::new();
    let mut visited = 0;
    while let Some(handle) = walker.next_handle(&pool) {
        visited += 1;
        pool.remove(handle);
    }

    assert_eq!(visited, 10);
    assert!(pool.is_empty());
}

#[test]
fn shared_behind_mutex_across_threads() {
    let pool = Arc::new(Mutex::new(SlotPool::<usize>::new(nz!(64))));

    let workers: Vec<_> = (0..4)
        .map(|worker| {
            let pool = Arc::clone(&pool);
            thread::spawn(move || {
                for i in 0..100 {
                    let handle = pool.lock().unwrap().insert(worker * 1000 + i).unwrap();
                    let value = pool.lock().unwrap().remove(handle);
                    assert_eq!(value, worker * 1000 + i);
                }
            })
        })
        .collect();

    for worker in workers {
        worker.join().unwrap();
    }

    assert!(pool.lock().unwrap().is_empty());
}
