//! Concurrency plumbing for the arena.
//!
//! Important: the arena only synchronizes its own bookkeeping (cursor, chunk
//! list). The bytes it hands out are exclusively owned by the caller that
//! reserved them and need no further synchronization.

pub(crate) mod sync;
