//! `ArenaVec`: a growable slice whose storage lives in an [`Arena`].
//!
//! Design:
//! - Appending within the spare capacity writes in place; the arena is not
//!   touched and the storage does not move.
//! - Appending past the capacity doubles it until it strictly exceeds the
//!   required length, takes fresh storage from the arena and moves the
//!   existing elements over. The old storage is simply abandoned; the arena
//!   reclaims it on reset.
//! - Elements are never dropped, matching every other arena value.

use core::fmt;
use core::mem;
use core::ops::{Deref, DerefMut};
use core::ptr::{self, NonNull};
use core::slice;

use crate::alloc::error::{fault, ArenaError};
use crate::Arena;

/// A growable slice backed by arena memory.
pub struct ArenaVec<'a, T> {
    arena: &'a Arena,
    ptr: NonNull<T>,
    len: usize,
    cap: usize,
}

// SAFETY: `ArenaVec` exclusively owns its elements; the arena reference is `Sync`.
unsafe impl<T: Send> Send for ArenaVec<'_, T> {}
unsafe impl<T: Sync> Sync for ArenaVec<'_, T> {}

/// Smallest capacity a zero-capacity vector grows to.
const fn min_non_zero_cap<T>() -> usize {
    if mem::size_of::<T>() == 1 {
        8
    } else if mem::size_of::<T>() <= 1024 {
        4
    } else {
        1
    }
}

/// Doubles `cap` until it strictly exceeds `required`, starting from a
/// nonzero seed so an empty vector still grows.
fn grown_capacity<T>(cap: usize, required: usize) -> Result<usize, ArenaError> {
    let mut new_cap = if cap == 0 { min_non_zero_cap::<T>() } else { cap };
    while new_cap <= required {
        new_cap = new_cap.checked_mul(2).ok_or(ArenaError::LayoutOverflow)?;
    }
    Ok(new_cap)
}

impl<'a, T> ArenaVec<'a, T> {
    /// Creates an empty vector. Nothing is allocated until the first append.
    pub fn new_in(arena: &'a Arena) -> Self {
        // SAFETY: zero elements over a dangling, aligned pointer.
        unsafe { Self::from_raw_parts_in(NonNull::dangling(), 0, 0, arena) }
    }

    /// Creates an empty vector with room for `cap` elements.
    ///
    /// # Errors
    /// As [`Arena::try_alloc_layout`], or [`ArenaError::LayoutOverflow`].
    pub fn try_with_capacity_in(cap: usize, arena: &'a Arena) -> Result<Self, ArenaError> {
        let ptr = arena.try_alloc_array::<T>(cap)?;
        // SAFETY: room for `cap` elements, none initialised.
        Ok(unsafe { Self::from_raw_parts_in(ptr, 0, cap, arena) })
    }

    /// Creates an empty vector with room for `cap` elements.
    ///
    /// # Panics
    /// Panics if the storage does not fit in a chunk or the chunk limit is reached.
    #[track_caller]
    pub fn with_capacity_in(cap: usize, arena: &'a Arena) -> Self {
        match Self::try_with_capacity_in(cap, arena) {
            Ok(vec) => vec,
            Err(err) => fault(err),
        }
    }

    /// Clones `items` into a new arena-backed vector of exactly that capacity.
    /// `items` itself may live anywhere.
    ///
    /// # Errors
    /// As [`Arena::try_alloc_layout`], or [`ArenaError::LayoutOverflow`].
    pub fn try_from_slice_in(items: &[T], arena: &'a Arena) -> Result<Self, ArenaError>
    where
        T: Clone,
    {
        let mut vec = Self::try_with_capacity_in(items.len(), arena)?;
        vec.try_append_slice(items)?;
        Ok(vec)
    }

    /// Clones `items` into a new arena-backed vector of exactly that capacity.
    ///
    /// # Panics
    /// Panics if the storage does not fit in a chunk or the chunk limit is reached.
    #[track_caller]
    pub fn from_slice_in(items: &[T], arena: &'a Arena) -> Self
    where
        T: Clone,
    {
        match Self::try_from_slice_in(items, arena) {
            Ok(vec) => vec,
            Err(err) => fault(err),
        }
    }

    /// # Safety
    /// `ptr` must be valid for `cap` elements of arena memory borrowed from
    /// `arena`, and the first `len` must be initialised.
    pub(crate) unsafe fn from_raw_parts_in(
        ptr: NonNull<T>,
        len: usize,
        cap: usize,
        arena: &'a Arena,
    ) -> Self {
        let cap = if mem::size_of::<T>() == 0 { usize::MAX } else { cap };
        Self {
            arena,
            ptr,
            len,
            cap,
        }
    }

    /// Number of elements.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns `true` if empty.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Elements the current storage holds before it must move.
    pub fn capacity(&self) -> usize {
        self.cap
    }

    /// The arena providing the storage.
    pub fn arena(&self) -> &'a Arena {
        self.arena
    }

    /// Pointer to the first element. Stable until the next growth.
    pub fn as_ptr(&self) -> *const T {
        self.ptr.as_ptr()
    }

    /// Elements as a slice.
    pub fn as_slice(&self) -> &[T] {
        // SAFETY: the first `len` elements are initialised.
        unsafe { slice::from_raw_parts(self.ptr.as_ptr(), self.len) }
    }

    /// Elements as a mutable slice.
    pub fn as_mut_slice(&mut self) -> &mut [T] {
        // SAFETY: the first `len` elements are initialised and exclusively ours.
        unsafe { slice::from_raw_parts_mut(self.ptr.as_ptr(), self.len) }
    }

    /// Appends one element, growing through the arena if needed.
    ///
    /// # Errors
    /// As [`Arena::try_alloc_layout`]. `value` is dropped on error.
    pub fn try_push(&mut self, value: T) -> Result<(), ArenaError> {
        let required = self.len.checked_add(1).ok_or(ArenaError::LayoutOverflow)?;
        self.reserve_for(required)?;
        // SAFETY: `len < cap` after `reserve_for`.
        unsafe { self.ptr.as_ptr().add(self.len).write(value) };
        self.len = required;
        Ok(())
    }

    /// Appends one element, growing through the arena if needed.
    ///
    /// # Panics
    /// Panics if the grown storage does not fit in a chunk or the chunk limit
    /// is reached.
    #[track_caller]
    pub fn push(&mut self, value: T) {
        if let Err(err) = self.try_push(value) {
            fault(err);
        }
    }

    /// Appends clones of `items`.
    ///
    /// With enough spare capacity this writes in place and the storage stays
    /// put; otherwise the storage moves to a larger arena range first.
    ///
    /// # Errors
    /// As [`Arena::try_alloc_layout`], or [`ArenaError::LayoutOverflow`].
    pub fn try_append_slice(&mut self, items: &[T]) -> Result<(), ArenaError>
    where
        T: Clone,
    {
        let required = self
            .len
            .checked_add(items.len())
            .ok_or(ArenaError::LayoutOverflow)?;
        self.reserve_for(required)?;
        for item in items {
            // SAFETY: `len < required <= cap`. `len` is bumped per element so
            // a panicking `clone` leaves only initialised elements counted.
            unsafe { self.ptr.as_ptr().add(self.len).write(item.clone()) };
            self.len += 1;
        }
        Ok(())
    }

    /// Appends clones of `items`.
    ///
    /// # Panics
    /// Panics if the grown storage does not fit in a chunk or the chunk limit
    /// is reached.
    #[track_caller]
    pub fn append_slice(&mut self, items: &[T])
    where
        T: Clone,
    {
        if let Err(err) = self.try_append_slice(items) {
            fault(err);
        }
    }

    /// Removes the last element and returns it.
    pub fn pop(&mut self) -> Option<T> {
        if self.len == 0 {
            return None;
        }
        self.len -= 1;
        // SAFETY: the element at the old `len - 1` is initialised and no
        // longer counted, so it is read exactly once.
        Some(unsafe { self.ptr.as_ptr().add(self.len).read() })
    }

    /// Gives up growability and returns the elements, borrowed for as long as
    /// the arena is.
    pub fn into_slice(self) -> &'a mut [T] {
        // SAFETY: the storage belongs to the arena borrow `'a`, not to `self`.
        unsafe { slice::from_raw_parts_mut(self.ptr.as_ptr(), self.len) }
    }

    fn reserve_for(&mut self, required: usize) -> Result<(), ArenaError> {
        if required <= self.cap {
            return Ok(());
        }
        let new_cap = grown_capacity::<T>(self.cap, required)?;
        let new_ptr = self.arena.try_alloc_array::<T>(new_cap)?;
        // SAFETY: the new range is fresh, so disjoint from the old one, and
        // holds at least `len` elements. The old copies are abandoned.
        unsafe { ptr::copy_nonoverlapping(self.ptr.as_ptr(), new_ptr.as_ptr(), self.len) };
        self.ptr = new_ptr;
        self.cap = new_cap;
        Ok(())
    }
}

impl<T> Deref for ArenaVec<'_, T> {
    type Target = [T];
    fn deref(&self) -> &[T] {
        self.as_slice()
    }
}

impl<T> DerefMut for ArenaVec<'_, T> {
    fn deref_mut(&mut self) -> &mut [T] {
        self.as_mut_slice()
    }
}

impl<T> Extend<T> for ArenaVec<'_, T> {
    fn extend<I: IntoIterator<Item = T>>(&mut self, iter: I) {
        for value in iter {
            self.push(value);
        }
    }
}

impl<'v, T> IntoIterator for &'v ArenaVec<'_, T> {
    type Item = &'v T;
    type IntoIter = slice::Iter<'v, T>;
    fn into_iter(self) -> Self::IntoIter {
        self.as_slice().iter()
    }
}

impl<T: fmt::Debug> fmt::Debug for ArenaVec<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}

impl<T: PartialEq> PartialEq<[T]> for ArenaVec<'_, T> {
    fn eq(&self, other: &[T]) -> bool {
        self.as_slice() == other
    }
}
