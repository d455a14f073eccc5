//! `Arena`: a concurrent bump-pointer arena.
//!
//! Objects are carved out of fixed-size chunks and reclaimed all at once by
//! [`Arena::reset`] or by dropping the arena.
//!
//! # Protocols
//!
//! - **Fast path** (lock-free): a compare-and-swap loop moves the active
//!   chunk's cursor from the end of the last object to the end of the new,
//!   aligned one. Concurrent callers always receive pairwise-disjoint ranges
//!   and no bytes are reserved beyond the padding alignment requires.
//! - **Expansion** (locked): a caller whose object does not fit the active
//!   chunk takes the lock. If the chunk it overflowed is no longer active,
//!   another thread already rolled over and the caller restarts from the top.
//!   Otherwise it provisions the next chunk (subject to the limit), places its
//!   own object first and publishes the chunk.
//! - **Reset** (locked): zeroes the first chunk, releases the rest and rewinds
//!   the cursor. An allocation racing with it is detected on a best-effort
//!   basis and reported as [`ArenaError::ConcurrentResetMisuse`].
//!
//! The lock is never taken on the fast path.

use core::alloc::Layout;
use core::fmt;
use core::ptr::{self, NonNull};
use std::sync::PoisonError;

use crate::alloc::chunk::{footprint, Chunk, ChunkStore};
use crate::alloc::config::ArenaConfig;
use crate::alloc::error::{fault, ArenaError};
use crate::alloc::stats::ArenaStats;
use crate::concurrency::sync::{AtomicPtr, Mutex, MutexGuard, Ordering};

/// A concurrent bump-pointer arena.
///
/// `Arena` is `Send + Sync`: any number of threads may allocate from a shared
/// `&Arena` without external synchronization. Every view it hands out borrows
/// the arena, so the safe [`reset`](Self::reset), which needs `&mut self`,
/// cannot run while a view is alive.
///
/// Values placed in the arena are never dropped.
pub struct Arena {
    /// Chunk receiving allocations. Points into a box owned by `store`.
    active: AtomicPtr<Chunk>,
    store: Mutex<ChunkStore>,
    chunk_size: usize,
    limit: usize,
}

impl Arena {
    /// Creates an unbounded arena with `chunk_size`-byte chunks.
    ///
    /// The chunk size is the increment by which the arena grows and the
    /// largest single object it can hold.
    ///
    /// # Panics
    /// Panics if `chunk_size` is zero.
    #[track_caller]
    pub fn new(chunk_size: usize) -> Self {
        Self::with_config(ArenaConfig::new(chunk_size))
    }

    /// Creates an arena from `config`.
    ///
    /// # Panics
    /// Panics if the configuration is invalid.
    #[track_caller]
    pub fn with_config(config: ArenaConfig) -> Self {
        match Self::try_with_config(config) {
            Ok(arena) => arena,
            Err(err) => fault(err),
        }
    }

    /// Creates an arena from `config`.
    ///
    /// # Errors
    /// Returns [`ArenaError::InvalidConfig`] if the chunk size is zero or too large.
    pub fn try_with_config(config: ArenaConfig) -> Result<Self, ArenaError> {
        config.validate()?;
        let store = ChunkStore::new(config.chunk_size, config.limit)?;
        let active = ptr::from_ref(store.first()).cast_mut();
        Ok(Self {
            active: AtomicPtr::new(active),
            store: Mutex::new(store),
            chunk_size: config.chunk_size,
            limit: config.limit,
        })
    }

    /// Size of every chunk in bytes.
    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Maximum chunk count, `0` when unbounded.
    pub fn limit(&self) -> usize {
        self.limit
    }

    /// The configuration this arena was built from.
    pub fn config(&self) -> ArenaConfig {
        ArenaConfig::new(self.chunk_size).with_limit(self.limit)
    }

    /// Number of chunks currently owned.
    pub fn chunk_count(&self) -> usize {
        self.lock_store().len()
    }

    /// Index of the active chunk.
    pub fn chunk_index(&self) -> usize {
        self.lock_store().index()
    }

    /// End of the last object carved from the active chunk, alignment padding
    /// before it included. Never exceeds [`chunk_size`](Self::chunk_size).
    pub fn offset(&self) -> usize {
        self.active_chunk().cursor()
    }

    /// Returns `true` if `ptr` points into one of the arena's chunks.
    pub fn contains<T: ?Sized>(&self, ptr: *const T) -> bool {
        let addr = ptr.cast::<u8>() as usize;
        self.lock_store().iter().any(|chunk| chunk.contains(addr))
    }

    /// Snapshot of the arena's bookkeeping.
    pub fn stats(&self) -> ArenaStats {
        let store = self.lock_store();
        ArenaStats {
            chunk_size: self.chunk_size,
            limit: self.limit,
            chunk_count: store.len(),
            chunk_index: store.index(),
            offset: store.active().cursor(),
            reserved_bytes: store.len() * self.chunk_size,
        }
    }

    /// Every byte of every owned chunk, in chunk order.
    pub fn chunk_bytes(&mut self) -> Vec<&[u8]> {
        let store = self.lock_store();
        // SAFETY: `&mut self` is held for as long as the slices live, so no
        // allocation can write the chunks and no reset can release them.
        store.iter().map(|chunk| unsafe { chunk.bytes() }).collect()
    }

    /// Allocates memory for `layout`.
    ///
    /// The memory is zero only if nothing has written it since the chunk was
    /// created or last reset. Zero-sized layouts receive a dangling, aligned
    /// pointer and never touch a chunk.
    ///
    /// # Errors
    /// - [`ArenaError::ObjectTooLarge`] if the object cannot fit in one chunk.
    /// - [`ArenaError::CapacityExceeded`] if a new chunk is needed past the limit.
    #[inline]
    pub fn try_alloc_layout(&self, layout: Layout) -> Result<NonNull<u8>, ArenaError> {
        if layout.size() == 0 {
            // SAFETY: alignments are at least 1, so the address is non-null.
            return Ok(unsafe {
                NonNull::new_unchecked(ptr::null_mut::<u8>().wrapping_add(layout.align()))
            });
        }
        if footprint(layout) > self.chunk_size {
            return Err(self.too_large(layout));
        }
        loop {
            let chunk = self.active_chunk();
            if let Some(ptr) = chunk.try_bump(layout) {
                return Ok(ptr);
            }
            if let Some(ptr) = self.expand(chunk, layout)? {
                return Ok(ptr);
            }
        }
    }

    /// Allocates memory for `layout`.
    ///
    /// # Panics
    /// Panics on the faults listed for [`try_alloc_layout`](Self::try_alloc_layout).
    #[inline]
    #[track_caller]
    pub fn alloc_layout(&self, layout: Layout) -> NonNull<u8> {
        match self.try_alloc_layout(layout) {
            Ok(ptr) => ptr,
            Err(err) => fault(err),
        }
    }

    /// Allocates `len` bytes.
    ///
    /// # Errors
    /// As [`try_alloc_layout`](Self::try_alloc_layout).
    #[allow(clippy::mut_from_ref)]
    pub fn try_alloc_bytes(&self, len: usize) -> Result<&mut [u8], ArenaError> {
        let layout = Layout::array::<u8>(len).map_err(|_| ArenaError::LayoutOverflow)?;
        let ptr = self.try_alloc_layout(layout)?;
        // SAFETY: the range is exclusively ours until the next reset, which
        // cannot happen while `&self` is borrowed. Chunk bytes are always
        // initialised (zeroed on creation and reset).
        Ok(unsafe { core::slice::from_raw_parts_mut(ptr.as_ptr(), len) })
    }

    /// Allocates `len` bytes.
    ///
    /// # Panics
    /// Panics on the faults listed for [`try_alloc_layout`](Self::try_alloc_layout).
    #[allow(clippy::mut_from_ref)]
    #[track_caller]
    pub fn alloc_bytes(&self, len: usize) -> &mut [u8] {
        match self.try_alloc_bytes(len) {
            Ok(bytes) => bytes,
            Err(err) => fault(err),
        }
    }

    /// Rolls the arena over to a new chunk.
    ///
    /// Returns `Ok(None)` when `exhausted` is no longer the active chunk: some
    /// other thread rolled over while this one waited, and the caller must
    /// retry from the top rather than reuse its stale offset.
    #[cold]
    fn expand(&self, exhausted: &Chunk, layout: Layout) -> Result<Option<NonNull<u8>>, ArenaError> {
        let mut store = self.lock_store();
        if !ptr::eq(store.active(), exhausted) {
            return Ok(None);
        }

        let chunk = match store.append() {
            Ok(chunk) => chunk,
            Err(err) => {
                trace_warn!(limit = self.limit, "arena chunk limit reached");
                return Err(err);
            }
        };
        let placed = chunk.place_first(layout);
        self.active
            .store(ptr::from_ref(chunk).cast_mut(), Ordering::Release);

        trace_debug!(
            chunk_index = store.index(),
            chunk_count = store.len(),
            chunk_size = self.chunk_size,
            "arena expanded"
        );
        placed.map(Some).ok_or_else(|| self.too_large(layout))
    }

    /// Resets the arena, zeroing memory and rewinding the cursor.
    ///
    /// Only the first chunk is kept; the others are released. Zeroing costs
    /// time linear in the chunk size, so for very large chunks it can be
    /// cheaper to build a new arena.
    pub fn reset(&mut self) {
        // SAFETY: `&mut self` rules out live views and in-flight allocations.
        unsafe { self.reset_with(|| {}) }
    }

    /// Resets an arena reached through a shared handle such as `Arc<Arena>`.
    ///
    /// # Safety
    /// Every view previously returned by this arena becomes dangling: the
    /// caller must guarantee none is used afterwards, and that no allocation is
    /// in flight while the reset runs.
    ///
    /// # Panics
    /// Panics with [`ArenaError::ConcurrentResetMisuse`] if an allocation is
    /// observed racing with the reset. Races that finish before the check are
    /// not detected and may already have been corrupted by the zeroing.
    pub unsafe fn reset_unchecked(&self) {
        self.reset_with(|| {});
    }

    /// `interleave` runs between zeroing and the cursor swap.
    unsafe fn reset_with(&self, interleave: impl FnOnce()) {
        let mut store = self.lock_store();
        let active = store.active();
        let before = active.cursor();

        store.first().zero();
        interleave();

        if let Err(observed) = active.rewind(before) {
            trace_error!(before, observed, "allocation raced with arena reset");
            fault(ArenaError::ConcurrentResetMisuse { before, observed });
        }

        #[cfg_attr(not(feature = "tracing"), allow(unused_variables))]
        let chunks_released = store.truncate_to_first();
        trace_debug!(
            chunks_released,
            bytes_zeroed = self.chunk_size,
            "arena reset"
        );
        let first = store.first();
        first.clear_cursor();
        self.active
            .store(ptr::from_ref(first).cast_mut(), Ordering::Release);
    }

    fn active_chunk(&self) -> &Chunk {
        // SAFETY: `active` always points at a chunk owned by `store`. Chunks are
        // released only by reset, which requires that no caller still holds one.
        unsafe { &*self.active.load(Ordering::Acquire) }
    }

    fn lock_store(&self) -> MutexGuard<'_, ChunkStore> {
        // A poisoned lock only means a fault was raised while it was held; the
        // store itself is always left consistent.
        self.store.lock().unwrap_or_else(PoisonError::into_inner)
    }

    #[cold]
    fn too_large(&self, layout: Layout) -> ArenaError {
        trace_warn!(
            size = layout.size(),
            align = layout.align(),
            chunk_size = self.chunk_size,
            "object does not fit in a chunk"
        );
        ArenaError::ObjectTooLarge {
            requested: footprint(layout),
            chunk_size: self.chunk_size,
        }
    }
}

impl fmt::Debug for Arena {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let stats = self.stats();
        f.debug_struct("Arena")
            .field("chunk_size", &stats.chunk_size)
            .field("limit", &stats.limit)
            .field("chunk_count", &stats.chunk_count)
            .field("offset", &stats.offset)
            .finish()
    }
}

#[cfg(all(test, not(loom)))]
mod tests {
    use super::*;

    fn bytes(n: usize) -> Layout {
        Layout::from_size_align(n, 1).unwrap()
    }

    #[test]
    fn full_chunk_fits_without_expansion() {
        let arena = Arena::new(100);
        arena.alloc_layout(bytes(100));
        assert_eq!(arena.chunk_count(), 1);
        assert_eq!(arena.offset(), 100);

        arena.alloc_layout(bytes(1));
        assert_eq!(arena.chunk_count(), 2);
        assert_eq!(arena.chunk_index(), 1);
        assert_eq!(arena.offset(), 1);
    }

    #[test]
    fn rollover_places_object_at_chunk_start() {
        let arena = Arena::new(64);
        arena.alloc_layout(bytes(60));
        let p = arena.alloc_layout(bytes(10));
        let mut arena = arena;
        let second = arena.chunk_bytes()[1].as_ptr();
        assert_eq!(p.as_ptr().cast_const(), second);
    }

    #[test]
    fn oversized_object_fails_regardless_of_occupancy() {
        let arena = Arena::new(16);
        let err = arena.try_alloc_layout(bytes(17)).unwrap_err();
        assert_eq!(
            err,
            ArenaError::ObjectTooLarge {
                requested: 17,
                chunk_size: 16
            }
        );
        arena.alloc_layout(bytes(8));
        assert!(arena.try_alloc_layout(bytes(17)).is_err());
        assert_eq!(arena.chunk_count(), 1);
    }

    #[test]
    #[should_panic(expected = "larger than chunk size")]
    fn oversized_object_panics() {
        Arena::new(4).alloc_layout(Layout::new::<[u64; 2]>());
    }

    #[test]
    fn limit_stops_expansion() {
        let arena = Arena::with_config(ArenaConfig::new(8).with_limit(2));
        arena.alloc_layout(bytes(8));
        arena.alloc_layout(bytes(8));
        assert_eq!(arena.chunk_count(), 2);
        assert_eq!(
            arena.try_alloc_layout(bytes(1)),
            Err(ArenaError::CapacityExceeded { limit: 2 })
        );
        assert_eq!(arena.chunk_count(), 2);
    }

    #[test]
    fn limit_counts_every_aligned_slot() {
        let arena = Arena::with_config(ArenaConfig::new(16).with_limit(1));
        arena.alloc_layout(Layout::new::<u64>());
        arena.alloc_layout(Layout::new::<u64>());
        assert_eq!(arena.offset(), 16);
        assert_eq!(
            arena.try_alloc_layout(Layout::new::<u64>()),
            Err(ArenaError::CapacityExceeded { limit: 1 })
        );
    }

    #[test]
    fn zero_sized_layouts_never_expand() {
        let arena = Arena::with_config(ArenaConfig::new(8).with_limit(1));
        arena.alloc_layout(bytes(8));
        let p = arena.alloc_layout(Layout::new::<[u64; 0]>());
        assert_eq!(p.as_ptr() as usize % 8, 0);
        assert!(arena.alloc_bytes(0).is_empty());
        assert_eq!(arena.chunk_count(), 1);
    }

    #[test]
    fn reset_rewinds_and_releases() {
        let mut arena = Arena::new(32);
        arena.alloc_bytes(32).fill(0xFF);
        arena.alloc_bytes(32).fill(0xFF);
        assert_eq!(arena.chunk_count(), 2);

        arena.reset();
        assert_eq!(arena.offset(), 0);
        assert_eq!(arena.chunk_count(), 1);
        assert_eq!(arena.chunk_index(), 0);
        assert!(arena
            .chunk_bytes()
            .iter()
            .all(|chunk| chunk.iter().all(|&b| b == 0)));
    }

    #[test]
    fn reset_reuses_the_first_chunk() {
        let mut arena = Arena::new(32);
        let before = arena.alloc_bytes(4).as_ptr() as usize;
        arena.reset();
        let after = arena.alloc_bytes(4).as_ptr() as usize;
        assert_eq!(before, after);
    }

    #[test]
    #[should_panic(expected = "another thread is using the arena")]
    fn reset_detects_racing_allocation() {
        let arena = Arena::new(32);
        arena.alloc_bytes(4);
        unsafe {
            arena.reset_with(|| {
                arena.alloc_bytes(1);
            });
        }
    }

    #[test]
    fn contains_tracks_owned_chunks() {
        let arena = Arena::new(16);
        let inside = arena.alloc_bytes(4).as_ptr();
        let outside = Box::new(0u8);
        assert!(arena.contains(inside));
        assert!(!arena.contains(&*outside as *const u8));
    }

    #[test]
    fn stats_report_reserved_bytes() {
        let arena = Arena::new(16);
        arena.alloc_bytes(16);
        arena.alloc_bytes(4);
        let stats = arena.stats();
        assert_eq!(stats.chunk_count, 2);
        assert_eq!(stats.chunk_index, 1);
        assert_eq!(stats.offset, 4);
        assert_eq!(stats.reserved_bytes, 32);
    }

    #[test]
    fn stats_report_exact_remaining_space() {
        let arena = Arena::new(32);
        arena.alloc_layout(Layout::new::<u8>());
        arena.alloc_layout(Layout::new::<u64>());
        let stats = arena.stats();
        assert_eq!(stats.offset, 16);
        assert_eq!(stats.remaining_in_chunk(), 16);
        arena.alloc_layout(Layout::new::<[u64; 2]>());
        assert_eq!(arena.stats().remaining_in_chunk(), 0);
        assert_eq!(arena.chunk_count(), 1);
    }

    #[test]
    fn reset_reports_released_chunks() {
        let mut arena = Arena::new(8);
        for _ in 0..4 {
            arena.alloc_bytes(8);
        }
        assert_eq!(arena.chunk_count(), 4);
        arena.reset();
        assert_eq!(arena.stats().reserved_bytes, 8);
    }

    #[test]
    fn invalid_config_is_an_error() {
        assert!(matches!(
            Arena::try_with_config(ArenaConfig::new(0)),
            Err(ArenaError::InvalidConfig(_))
        ));
    }

    #[test]
    #[should_panic(expected = "chunk size must be positive")]
    fn zero_chunk_size_panics() {
        let _ = Arena::new(0);
    }

    #[test]
    fn debug_shows_bookkeeping() {
        let arena = Arena::new(16);
        let text = format!("{arena:?}");
        assert!(text.contains("chunk_size: 16"));
        assert!(text.contains("chunk_count: 1"));
    }
}
