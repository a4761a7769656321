#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
#![cfg_attr(docsrs, feature(doc_cfg))]

//! A fixed-capacity object pool with stable slots and generational 32-bit handles.
//!
//! This crate provides [`SlotPool`], an arena for objects of one type that is sized once at
//! construction and never grows. Objects are identified either by their slot index or by a
//! [`Handle`] that also records which allocation of the slot it refers to.
//!
//! # Key Features
//!
//! - **Fixed capacity**: All memory is allocated up front (or supplied by the caller)
//! - **Stable slots**: Objects never move once inserted
//! - **Generational handles**: Stale handles are detected and resolve to `None`
//! - **Stable handle encoding**: Handles are plain `u32` values, safe to persist and validate later
//! - **Exact slot restoration**: Objects can be recreated at the index and generation of a
//!   persisted handle
//! - **Caller-supplied storage**: Pools can live in `static` buffers that they never free
//! - **Memory poisoning**: Debug builds fill vacant slots with recognizable byte patterns
//! - **Configurable exhaustion**: A full pool either panics or logs and returns `None`
//!
//! # Handle Encoding
//!
//! A [`Handle`] packs the slot index into bits 8-31, an occupied flag into bit 7 and the slot
//! generation into bits 0-6. The generation advances on every allocation into a slot, cycling
//! through 1 to 127. A handle that has outlived 127 reallocations of its slot may therefore
//! resolve to an unrelated object - a deliberate trade-off for a compact encoding.
//!
//! # Examples
//!
//! ## Basic Usage
//!
//! ```rust
//! use new_zealand::nz;
//! use slotted_pool::SlotPool;
//!
//! let mut pool = SlotPool::<String>::new(nz!(4));
//!
//! let handle = pool.insert("Hello, World!".to_string()).unwrap();
//! assert_eq!(pool.get(handle).map(String::len), Some(13));
//!
//! let value = pool.remove(handle);
//! assert_eq!(value, "Hello, World!");
//!
//! // The handle no longer resolves once its object is gone.
//! assert!(pool.get(handle).is_none());
//! ```
//!
//! ## Tolerating Exhaustion
//!
//! ```rust
//! use new_zealand::nz;
//! use slotted_pool::{ExhaustionPolicy, SlotPool};
//!
//! let mut pool = SlotPool::<u32>::builder()
//!     .capacity(nz!(2))
//!     .exhaustion_policy(ExhaustionPolicy::ReturnNone)
//!     .build();
//!
//! assert!(pool.insert(1).is_some());
//! assert!(pool.insert(2).is_some());
//! assert!(pool.insert(3).is_none());
//! ```
//!
//! ## Persisting Handles
//!
//! ```rust
//! use new_zealand::nz;
//! use slotted_pool::{Handle, SlotPool};
//!
//! let mut pool = SlotPool::<u32>::new(nz!(8));
//! let handle = pool.insert(42).unwrap();
//!
//! // Save the objects together with their handles.
//! let saved: Vec<(u32, u32)> = pool
//!     .iter()
//!     .map(|(index, value)| (pool.handle_at(index).unwrap().to_bits(), *value))
//!     .collect();
//!
//! // Load them into a fresh pool, preserving every handle.
//! let mut loaded = SlotPool::<u32>::new(nz!(8));
//! for (bits, value) in saved {
//!     loaded.restore(Handle::from_bits(bits), value).unwrap();
//! }
//!
//! assert_eq!(loaded.get(handle), Some(&42));
//! ```
//!
//! # Thread Safety
//!
//! The pool is not internally synchronized. It can be moved between threads if `T` can, and
//! shared between threads for reading if `T` can. To allocate or remove from multiple threads,
//! wrap the whole pool in a single [`std::sync::Mutex`].

mod builder;
mod error;
mod handle;
mod iter;
mod policy;
mod poison;
mod pool;
mod slot_state;

pub use builder::*;
pub use error::*;
pub use handle::*;
pub use iter::*;
pub use policy::*;
pub use pool::SlotPool;
pub use slot_state::*;
