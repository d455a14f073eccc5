//! Arena fault taxonomy.
//!
//! The plain allocation surface panics with these errors' `Display` text; the
//! `try_` surface returns them so a caller can decide where a fault stops.

use std::error::Error;
use std::fmt;

/// Errors produced by [`Arena`](crate::Arena) and its typed views.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ArenaError {
    /// A single object does not fit in one chunk. Objects never span chunks.
    ObjectTooLarge {
        /// Bytes the object needs, worst-case alignment padding included.
        requested: usize,
        /// Configured chunk size in bytes.
        chunk_size: usize,
    },
    /// A new chunk was required but the chunk limit has been reached.
    CapacityExceeded {
        /// Configured maximum chunk count.
        limit: usize,
    },
    /// `reset` observed an allocation racing with it.
    ConcurrentResetMisuse {
        /// Cursor value recorded when the reset started.
        before: usize,
        /// Cursor value found when the reset tried to rewind it.
        observed: usize,
    },
    /// A [`Context`](crate::Context) was asked for an arena it does not carry.
    MissingContextArena,
    /// The arena configuration was rejected.
    InvalidConfig(String),
    /// `len * size_of::<T>()` does not fit in `isize`.
    LayoutOverflow,
}

impl fmt::Display for ArenaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ObjectTooLarge {
                requested,
                chunk_size,
            } => write!(
                f,
                "object size {requested} is larger than chunk size {chunk_size}"
            ),
            Self::CapacityExceeded { limit } => {
                write!(f, "arena limit of {limit} chunks reached")
            }
            Self::ConcurrentResetMisuse { before, observed } => write!(
                f,
                "reset failed, another thread is using the arena (cursor moved from {before} to {observed})"
            ),
            Self::MissingContextArena => f.write_str("no arena attached to context"),
            Self::InvalidConfig(reason) => write!(f, "invalid arena config: {reason}"),
            Self::LayoutOverflow => f.write_str("allocation size overflows isize"),
        }
    }
}

impl Error for ArenaError {}

/// Aborts the calling unit of work with `err`.
#[cold]
#[track_caller]
pub(crate) fn fault(err: ArenaError) -> ! {
    panic!("{err}")
}
