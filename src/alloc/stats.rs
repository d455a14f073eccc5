//! Point-in-time arena bookkeeping.

use serde::Serialize;

/// A snapshot of an arena's chunk bookkeeping, taken under the expansion lock.
///
/// Serializable so it can be attached to structured logs or exported as JSON.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct ArenaStats {
    /// Size of every chunk in bytes.
    pub chunk_size: usize,
    /// Maximum chunk count, `0` when unbounded.
    pub limit: usize,
    /// Chunks currently owned.
    pub chunk_count: usize,
    /// Index of the active chunk.
    pub chunk_index: usize,
    /// End of the last object in the active chunk, padding included.
    pub offset: usize,
    /// Bytes held from the host allocator.
    pub reserved_bytes: usize,
}

impl ArenaStats {
    /// Bytes of the active chunk not yet handed out.
    ///
    /// An aligned object placed next may still need up to `align - 1` of
    /// these bytes as padding.
    pub fn remaining_in_chunk(&self) -> usize {
        self.chunk_size.saturating_sub(self.offset)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_as_flat_json() {
        let stats = ArenaStats {
            chunk_size: 64,
            limit: 0,
            chunk_count: 1,
            chunk_index: 0,
            offset: 40,
            reserved_bytes: 64,
        };
        let json = serde_json::to_value(stats).unwrap();
        assert_eq!(json["chunk_size"], 64);
        assert_eq!(json["reserved_bytes"], 64);
        assert_eq!(stats.remaining_in_chunk(), 24);
    }
}
