//! Fixed-size chunks and the chunk store.
//!
//! A [`Chunk`] is one zero-initialised buffer with its own bump cursor. The
//! cursor lives next to the buffer it indexes so that a thread which loaded a
//! chunk pointer always bumps the offset *of that chunk*, even if a rollover
//! publishes a newer chunk in between.

use core::alloc::Layout;
use core::ptr::NonNull;
use core::slice;
use std::alloc::{alloc_zeroed, dealloc, handle_alloc_error};

use crossbeam_utils::CachePadded;

use crate::alloc::error::ArenaError;
use crate::concurrency::sync::{AtomicUsize, Ordering};

/// Base alignment of every chunk buffer.
pub(crate) const CHUNK_ALIGN: usize = 16;

/// Rounds `value` up to the next multiple of `align` (a power of two).
pub(crate) fn checked_align_up(value: usize, align: usize) -> Option<usize> {
    Some(value.checked_add(align - 1)? & !(align - 1))
}

/// Worst-case bytes an object occupies when placed at the start of a fresh
/// chunk. Chunk bases are `CHUNK_ALIGN`-aligned, so only stricter alignments
/// need padding there.
#[inline]
pub(crate) fn footprint(layout: Layout) -> usize {
    layout.size() + layout.align().saturating_sub(CHUNK_ALIGN)
}

/// A chunk of memory owned by the arena.
pub(crate) struct Chunk {
    ptr: NonNull<u8>,
    layout: Layout,
    cursor: CachePadded<AtomicUsize>,
}

impl Chunk {
    fn new(layout: Layout) -> Self {
        // SAFETY: `ChunkStore::new` only builds layouts with a nonzero size.
        let ptr = unsafe { alloc_zeroed(layout) };
        let Some(ptr) = NonNull::new(ptr) else {
            handle_alloc_error(layout)
        };
        Self {
            ptr,
            layout,
            cursor: CachePadded::new(AtomicUsize::new(0)),
        }
    }

    pub(crate) fn capacity(&self) -> usize {
        self.layout.size()
    }

    /// End of the last object carved from this chunk. Never exceeds `capacity`.
    pub(crate) fn cursor(&self) -> usize {
        self.cursor.load(Ordering::Acquire)
    }

    /// Reserves room for `layout` by advancing the cursor to the end of the
    /// aligned object.
    ///
    /// Returns `None`, leaving the cursor untouched, when the aligned object
    /// would run past the end of the chunk.
    #[inline]
    pub(crate) fn try_bump(&self, layout: Layout) -> Option<NonNull<u8>> {
        let mut start = self.cursor.load(Ordering::Relaxed);
        loop {
            let offset = self.fit(start, layout)?;
            let end = offset + layout.size();
            match self
                .cursor
                .compare_exchange_weak(start, end, Ordering::Relaxed, Ordering::Relaxed)
            {
                // SAFETY: `fit` checked `offset + size <= capacity`.
                Ok(_) => return Some(unsafe { self.at(offset) }),
                Err(current) => start = current,
            }
        }
    }

    /// Places the first object of a chunk that has not been published yet.
    pub(crate) fn place_first(&self, layout: Layout) -> Option<NonNull<u8>> {
        let offset = self.fit(0, layout)?;
        self.cursor.store(offset + layout.size(), Ordering::Relaxed);
        // SAFETY: `fit` checked `offset + size <= capacity`.
        Some(unsafe { self.at(offset) })
    }

    /// Offset at which `layout` starts when placed at or after `start`, if it fits.
    fn fit(&self, start: usize, layout: Layout) -> Option<usize> {
        let base = self.ptr.as_ptr() as usize;
        let offset = checked_align_up(base.checked_add(start)?, layout.align())? - base;
        (offset.checked_add(layout.size())? <= self.capacity()).then_some(offset)
    }

    /// # Safety
    /// `offset` must not exceed `capacity`.
    unsafe fn at(&self, offset: usize) -> NonNull<u8> {
        NonNull::new_unchecked(self.ptr.as_ptr().add(offset))
    }

    /// Swaps the cursor from `before` to zero, returning the value found on failure.
    pub(crate) fn rewind(&self, before: usize) -> Result<(), usize> {
        self.cursor
            .compare_exchange(before, 0, Ordering::AcqRel, Ordering::Acquire)
            .map(|_| ())
    }

    pub(crate) fn clear_cursor(&self) {
        self.cursor.store(0, Ordering::Release);
    }

    /// Zeroes every byte of the buffer.
    ///
    /// # Safety
    /// No reference into the buffer may be live and no thread may be writing it.
    pub(crate) unsafe fn zero(&self) {
        zero_bytes(slice::from_raw_parts_mut(self.ptr.as_ptr(), self.capacity()));
    }

    /// Views the whole buffer.
    ///
    /// # Safety
    /// No thread may write the buffer while the returned slice is live.
    pub(crate) unsafe fn bytes<'a>(&self) -> &'a [u8] {
        slice::from_raw_parts(self.ptr.as_ptr(), self.capacity())
    }

    pub(crate) fn contains(&self, addr: usize) -> bool {
        let base = self.ptr.as_ptr() as usize;
        addr >= base && addr - base < self.capacity()
    }
}

impl Drop for Chunk {
    fn drop(&mut self) {
        // SAFETY: `ptr` was returned by `alloc_zeroed` with this exact layout.
        unsafe { dealloc(self.ptr.as_ptr(), self.layout) }
    }
}

// SAFETY: the buffer is written only through disjoint reservations handed out
// by the cursor; the chunk itself never touches its bytes outside `zero`.
unsafe impl Send for Chunk {}
unsafe impl Sync for Chunk {}

#[cfg(feature = "parallel")]
fn zero_bytes(bytes: &mut [u8]) {
    use rayon::prelude::*;

    const STRIDE: usize = 64 * 1024;
    bytes.par_chunks_mut(STRIDE).for_each(|b| b.fill(0));
}

#[cfg(not(feature = "parallel"))]
fn zero_bytes(bytes: &mut [u8]) {
    bytes.fill(0);
}

/// Ordered list of owned chunks. Never empty.
///
/// Chunks are boxed so their headers keep a stable address while the list
/// grows; the arena publishes raw pointers to them.
pub(crate) struct ChunkStore {
    chunks: Vec<Box<Chunk>>,
    index: usize,
    layout: Layout,
    limit: usize,
}

impl ChunkStore {
    pub(crate) fn new(chunk_size: usize, limit: usize) -> Result<Self, ArenaError> {
        let layout = Layout::from_size_align(chunk_size, CHUNK_ALIGN)
            .map_err(|e| ArenaError::InvalidConfig(e.to_string()))?;
        if layout.size() == 0 {
            return Err(ArenaError::InvalidConfig(
                "chunk size must be positive".to_owned(),
            ));
        }
        Ok(Self {
            chunks: vec![Box::new(Chunk::new(layout))],
            index: 0,
            layout,
            limit,
        })
    }

    /// The chunk currently receiving allocations.
    pub(crate) fn active(&self) -> &Chunk {
        &self.chunks[self.index]
    }

    pub(crate) fn first(&self) -> &Chunk {
        &self.chunks[0]
    }

    pub(crate) fn len(&self) -> usize {
        self.chunks.len()
    }

    pub(crate) fn index(&self) -> usize {
        self.index
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = &Chunk> {
        self.chunks.iter().map(|chunk| &**chunk)
    }

    /// Provisions a new chunk and makes it the active one.
    pub(crate) fn append(&mut self) -> Result<&Chunk, ArenaError> {
        if self.limit != 0 && self.chunks.len() >= self.limit {
            return Err(ArenaError::CapacityExceeded { limit: self.limit });
        }
        self.chunks.push(Box::new(Chunk::new(self.layout)));
        self.index = self.chunks.len() - 1;
        Ok(&self.chunks[self.index])
    }

    /// Releases every chunk but the first, which becomes active again.
    /// Returns how many chunks were released.
    pub(crate) fn truncate_to_first(&mut self) -> usize {
        let released = self.chunks.len() - 1;
        self.chunks.truncate(1);
        self.index = 0;
        released
    }
}
