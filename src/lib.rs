//! # `quarry` - Concurrent Bump-Pointer Arena
//!
//! A region allocator for workloads that create many short-lived objects of
//! mixed types and discard them together, such as the values built while
//! serving one request. Objects are carved out of large fixed-size chunks with
//! a short compare-and-swap on an atomic cursor and reclaimed all at once.
//!
//! ## Guarantees
//!
//! ### Memory Safety
//! - **Borrowed views**: every reference, string and slice the arena returns
//!   borrows the arena, so none can outlive it or survive a safe reset.
//! - **Zero-valued objects**: memory is zero until first handed out, and
//!   `zerocopy::FromZeroes` restricts zero-valued views to types for which
//!   that is a valid value.
//! - **No spanning**: an object never crosses a chunk boundary.
//!
//! ### Concurrency Safety
//! - **Lock-free fast path**: concurrent allocations receive pairwise-disjoint
//!   ranges from a compare-and-swap loop on the active chunk's cursor.
//! - **Single expansion**: when a chunk is exhausted exactly one thread
//!   provisions the next one; the others retry against it.
//! - **Misuse detection**: a reset that observes an allocation racing with it
//!   panics with [`ArenaError::ConcurrentResetMisuse`].
//!
//! ## Architecture
//!
//! 1. **Chunks** (`alloc::chunk`): zero-initialised buffers, each with its own
//!    cache-padded cursor, kept in an ordered store behind a mutex.
//! 2. **Arena** ([`Arena`]): the fast path, the expansion protocol and reset.
//! 3. **Typed views** ([`Arena::new_object`], [`Arena::new_string`],
//!    [`ArenaVec`]): the only code turning raw ranges into typed references.
//! 4. **Context** ([`Context`]): optional request-scoped arena passing.
//!
//! ## Example
//!
//! ```rust
//! use quarry::{Arena, ArenaConfig, ArenaVec, FromZeroes};
//!
//! #[derive(FromZeroes)]
//! #[repr(C)]
//! struct Point {
//!     x: f64,
//!     y: f64,
//! }
//!
//! let arena = Arena::with_config(ArenaConfig::new(64 * 1024).with_limit(16));
//!
//! let origin = arena.new_object::<Point>();
//! assert_eq!(origin.x, 0.0);
//!
//! let mut ids = ArenaVec::new_in(&arena);
//! ids.extend(0..100u32);
//! assert_eq!(ids.len(), 100);
//!
//! let label = arena.new_string("origin");
//! assert_eq!(label, "origin");
//! ```

#![warn(missing_docs, clippy::all, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

#[macro_use]
mod trace;

pub mod alloc;
pub mod collections;
pub mod context;

pub(crate) mod concurrency;

pub use alloc::{Arena, ArenaConfig, ArenaError, ArenaStats};
pub use collections::ArenaVec;
pub use context::Context;
pub use zerocopy::FromZeroes;

// Compile-time assertions for the shared-handle guarantees.
const _: () = {
    const fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<Arena>();
    assert_send_sync::<Context>();
    assert_send_sync::<ArenaVec<'static, u64>>();
};
