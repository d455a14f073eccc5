//! Typed views over raw arena memory.
//!
//! This module and [`ArenaVec`] are the only places that turn raw byte ranges
//! into typed references. Every view borrows the arena, so it cannot outlive
//! the arena or survive a safe [`Arena::reset`].
//!
//! Zero-valued views rely on arena memory being zero until first handed out:
//! chunks are zeroed when created and on reset, and no byte is handed out
//! twice in between. `zerocopy::FromZeroes` restricts those views to types for
//! which the all-zero bit pattern is a valid value.
//!
//! One arena serves many element types. The alternative, one arena per element
//! type, would let every view be a plain `&mut [T]` into a `Vec<T>`-backed
//! chunk and drop the raw casts, at the cost of an arena per type.

use core::alloc::Layout;
use core::ptr::NonNull;
use core::{slice, str};

use zerocopy::FromZeroes;

use crate::alloc::arena::Arena;
use crate::alloc::error::{fault, ArenaError};
use crate::collections::ArenaVec;

#[allow(clippy::mut_from_ref)]
impl Arena {
    /// Allocates a zero-valued `T`.
    ///
    /// # Errors
    /// As [`Arena::try_alloc_layout`].
    pub fn try_new_object<T: FromZeroes>(&self) -> Result<&mut T, ArenaError> {
        let ptr = self.try_alloc_layout(Layout::new::<T>())?.cast::<T>();
        // SAFETY: the range is aligned for `T`, exclusively ours, and still
        // zero; `FromZeroes` makes zero bytes a valid `T`.
        Ok(unsafe { &mut *ptr.as_ptr() })
    }

    /// Allocates a zero-valued `T`.
    ///
    /// # Panics
    /// Panics if `T` does not fit in a chunk or the chunk limit is reached.
    #[track_caller]
    pub fn new_object<T: FromZeroes>(&self) -> &mut T {
        match self.try_new_object() {
            Ok(object) => object,
            Err(err) => fault(err),
        }
    }

    /// Moves `value` into the arena.
    ///
    /// # Errors
    /// As [`Arena::try_alloc_layout`]. `value` is dropped on error.
    pub fn try_new_value<T>(&self, value: T) -> Result<&mut T, ArenaError> {
        let ptr = self.try_alloc_layout(Layout::new::<T>())?.cast::<T>();
        // SAFETY: the range is aligned for `T` and exclusively ours.
        unsafe {
            ptr.as_ptr().write(value);
            Ok(&mut *ptr.as_ptr())
        }
    }

    /// Moves `value` into the arena.
    ///
    /// ```
    /// let arena = quarry::Arena::new(1024);
    /// let answer = arena.new_value(42u64);
    /// *answer += 1;
    /// assert_eq!(*answer, 43);
    /// ```
    ///
    /// # Panics
    /// Panics if `T` does not fit in a chunk or the chunk limit is reached.
    #[track_caller]
    pub fn new_value<T>(&self, value: T) -> &mut T {
        match self.try_new_value(value) {
            Ok(value) => value,
            Err(err) => fault(err),
        }
    }

    /// Allocates storage for `cap` elements and returns a growable slice whose
    /// first `len` elements are zero-valued.
    ///
    /// # Errors
    /// As [`Arena::try_alloc_layout`], or [`ArenaError::LayoutOverflow`].
    ///
    /// # Panics
    /// Panics if `len > cap`.
    pub fn try_make_slice<T: FromZeroes>(
        &self,
        len: usize,
        cap: usize,
    ) -> Result<ArenaVec<'_, T>, ArenaError> {
        assert!(len <= cap, "slice length {len} exceeds capacity {cap}");
        let ptr = self.try_alloc_array::<T>(cap)?;
        // SAFETY: room for `cap` elements, the first `len` of which are zero
        // bytes and therefore valid `T`s.
        Ok(unsafe { ArenaVec::from_raw_parts_in(ptr, len, cap, self) })
    }

    /// Allocates storage for `cap` elements and returns a growable slice whose
    /// first `len` elements are zero-valued.
    ///
    /// # Panics
    /// Panics if `len > cap`, if the storage does not fit in a chunk, or if the
    /// chunk limit is reached.
    #[track_caller]
    pub fn make_slice<T: FromZeroes>(&self, len: usize, cap: usize) -> ArenaVec<'_, T> {
        match self.try_make_slice(len, cap) {
            Ok(vec) => vec,
            Err(err) => fault(err),
        }
    }

    /// Copies `s` into the arena.
    ///
    /// # Errors
    /// As [`Arena::try_alloc_layout`].
    pub fn try_new_string_mut(&self, s: &str) -> Result<&mut str, ArenaError> {
        let bytes = self.try_alloc_bytes(s.len())?;
        bytes.copy_from_slice(s.as_bytes());
        // SAFETY: the bytes were copied from a `&str`.
        Ok(unsafe { str::from_utf8_unchecked_mut(bytes) })
    }

    /// Copies `s` into the arena and returns a mutable view of the copy.
    ///
    /// # Panics
    /// Panics if `s` is longer than a chunk or the chunk limit is reached.
    #[track_caller]
    pub fn new_string_mut(&self, s: &str) -> &mut str {
        match self.try_new_string_mut(s) {
            Ok(s) => s,
            Err(err) => fault(err),
        }
    }

    /// Copies `s` into the arena.
    ///
    /// # Errors
    /// As [`Arena::try_alloc_layout`].
    pub fn try_new_string(&self, s: &str) -> Result<&str, ArenaError> {
        let s: &str = self.try_new_string_mut(s)?;
        Ok(s)
    }

    /// Copies `s` into the arena. The returned string owns nothing; it is a
    /// window into arena memory.
    ///
    /// # Panics
    /// Panics if `s` is longer than a chunk or the chunk limit is reached.
    #[track_caller]
    pub fn new_string(&self, s: &str) -> &str {
        self.new_string_mut(s)
    }

    /// Copies `src` into the arena.
    ///
    /// # Errors
    /// As [`Arena::try_alloc_layout`], or [`ArenaError::LayoutOverflow`].
    pub fn try_new_slice_copy<T: Copy>(&self, src: &[T]) -> Result<&mut [T], ArenaError> {
        let ptr = self.try_alloc_array::<T>(src.len())?;
        // SAFETY: room for `src.len()` elements, disjoint from `src`.
        unsafe {
            ptr.as_ptr()
                .copy_from_nonoverlapping(src.as_ptr(), src.len());
            Ok(slice::from_raw_parts_mut(ptr.as_ptr(), src.len()))
        }
    }

    /// Copies `src` into the arena.
    ///
    /// # Panics
    /// Panics if `src` does not fit in a chunk or the chunk limit is reached.
    #[track_caller]
    pub fn new_slice_copy<T: Copy>(&self, src: &[T]) -> &mut [T] {
        match self.try_new_slice_copy(src) {
            Ok(slice) => slice,
            Err(err) => fault(err),
        }
    }

    /// Uninitialised, aligned storage for `cap` values of `T`.
    pub(crate) fn try_alloc_array<T>(&self, cap: usize) -> Result<NonNull<T>, ArenaError> {
        let layout = Layout::array::<T>(cap).map_err(|_| ArenaError::LayoutOverflow)?;
        Ok(self.try_alloc_layout(layout)?.cast())
    }
}
