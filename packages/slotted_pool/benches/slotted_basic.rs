//! Basic benchmarks for the `slotted_pool` crate.
#![allow(
    missing_docs,
    reason = "No need for API documentation in benchmark code"
)]

use std::hint::black_box;
use std::num::NonZero;
use std::time::Instant;

use alloc_tracker::Allocator;
use criterion::{Criterion, criterion_group, criterion_main};
use new_zealand::nz;
use slotted_pool::{Handle, SlotPool};

criterion_group!(benches, entrypoint);
criterion_main!(benches);

#[global_allocator]
static ALLOCATOR: Allocator<std::alloc::System> = Allocator::system();

type TestItem = usize;
const TEST_VALUE: TestItem = 1024;
const CAPACITY: NonZero<usize> = nz!(1024);

fn entrypoint(c: &mut Criterion) {
    let allocs = alloc_tracker::Session::new();

    let mut group = c.benchmark_group("slotted_basic");

    let allocs_op = allocs.operation("build");
    group.bench_function("build", |b| {
        b.iter_custom(|iters| {
            let _span = allocs_op.measure_thread().iterations(iters);

            let start = Instant::now();

            for _ in 0..iters {
                drop(black_box(SlotPool::<TestItem>::new(CAPACITY)));
            }

            start.elapsed()
        });
    });

    let allocs_op = allocs.operation("insert_remove_churn");
    group.bench_function("insert_remove_churn", |b| {
        b.iter_custom(|iters| {
            let mut pool = SlotPool::<TestItem>::new(CAPACITY);

            // Half full, so the churn happens in the middle of the pool.
            let _resident: Vec<Handle> = (0..CAPACITY.get() / 2)
                .map(|_| pool.insert(TEST_VALUE).unwrap())
                .collect();

            let _span = allocs_op.measure_thread().iterations(iters);

            let start = Instant::now();

            for _ in 0..iters {
                let handle = pool.insert(black_box(TEST_VALUE)).unwrap();
                _ = black_box(pool.remove(handle));
            }

            start.elapsed()
        });
    });

    let allocs_op = allocs.operation("get");
    group.bench_function("get", |b| {
        b.iter_custom(|iters| {
            let mut pool = SlotPool::<TestItem>::new(CAPACITY);
            let handle = pool.insert(TEST_VALUE).unwrap();

            let _span = allocs_op.measure_thread().iterations(iters);

            let start = Instant::now();

            for _ in 0..iters {
                _ = black_box(pool.get(black_box(handle)));
            }

            start.elapsed()
        });
    });

    let allocs_op = allocs.operation("iter_half_full");
    group.bench_function("iter_half_full", |b| {
        b.iter_custom(|iters| {
            let mut pool = SlotPool::<TestItem>::new(CAPACITY);

            let handles: Vec<Handle> = (0..CAPACITY.get())
                .map(|i| pool.insert(i).unwrap())
                .collect();

            for handle in handles.into_iter().step_by(2) {
                pool.remove(handle);
            }

            let _span = allocs_op.measure_thread().iterations(iters);

            let start = Instant::now();

            for _ in 0..iters {
                _ = black_box(pool.iter().map(|(_, value)| *value).sum::<usize>());
            }

            start.elapsed()
        });
    });

    group.finish();

    allocs.print_to_stdout();
}
