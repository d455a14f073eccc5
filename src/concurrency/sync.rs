//! Synchronization primitives used by the arena.
//!
//! Under `--cfg loom` these resolve to `loom`'s model-checked types so the
//! fast path, expansion and reset protocols can be explored exhaustively.

#[cfg(loom)]
pub(crate) use loom::sync::{
    atomic::{AtomicPtr, AtomicUsize, Ordering},
    Mutex, MutexGuard,
};

#[cfg(not(loom))]
pub(crate) use std::sync::{
    atomic::{AtomicPtr, AtomicUsize, Ordering},
    Mutex, MutexGuard,
};
