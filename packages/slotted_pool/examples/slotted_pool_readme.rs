//! Example that demonstrates the basic lifecycle of a `SlotPool`.
//!
//! Run with `RUST_LOG=debug` to see the diagnostics the pool emits.

use new_zealand::nz;
use slotted_pool::{ExhaustionPolicy, Handle, SlotPool};

#[derive(Debug)]
struct Projectile {
    me: Handle,
    speed: f32,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    println!("=== Slotted Pool README Example ===");

    let mut pool = SlotPool::<Projectile>::builder()
        .capacity(nz!(3))
        .exhaustion_policy(ExhaustionPolicy::ReturnNone)
        .build();

    let handles: Vec<Handle> = (1..=3_u8)
        .filter_map(|i| {
            pool.insert_with(|me| Projectile {
                me,
                speed: f32::from(i) * 10.0,
            })
        })
        .collect();

    // The pool is full. With ExhaustionPolicy::ReturnNone this logs an error and returns None.
    assert!(pool.insert_with(|me| Projectile { me, speed: 0.0 }).is_none());

    for (index, projectile) in &pool {
        println!("slot {index}: {} at speed {}", projectile.me, projectile.speed);
    }

    let first = *handles.first().expect("we inserted three projectiles");

    let removed = pool.remove(first);
    println!(
        "removed {} - its handle now resolves to {:?}",
        removed.me,
        pool.get(first).map(|p| p.me)
    );

    let replacement = pool
        .insert_with(|me| Projectile { me, speed: 99.0 })
        .expect("a slot was just freed");
    println!("replacement landed at {replacement}");

    println!("README example completed successfully!");
}
