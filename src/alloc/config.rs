//! Arena configuration parameters.

use serde::{Deserialize, Serialize};

use crate::alloc::chunk::CHUNK_ALIGN;
use crate::alloc::error::ArenaError;

/// Configuration for an [`Arena`](crate::Arena).
///
/// Validated at construction; both values are immutable once the arena exists.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArenaConfig {
    /// Size of every chunk in bytes. Also the largest single object the arena
    /// can hold.
    pub chunk_size: usize,

    /// Maximum number of chunks the arena may own. `0` means unbounded.
    #[serde(default)]
    pub limit: usize,
}

impl ArenaConfig {
    /// Unbounded configuration with the given chunk size.
    pub const fn new(chunk_size: usize) -> Self {
        Self {
            chunk_size,
            limit: 0,
        }
    }

    /// Caps the total chunk count. `0` removes the cap.
    #[must_use]
    pub const fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    /// Parses and validates a JSON configuration such as
    /// `{"chunk_size": 65536, "limit": 8}`.
    ///
    /// # Errors
    /// Returns [`ArenaError::InvalidConfig`] for malformed JSON or rejected values.
    pub fn from_json(json: &str) -> Result<Self, ArenaError> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| ArenaError::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Checks that a chunk of `chunk_size` bytes can be allocated.
    ///
    /// # Errors
    /// Returns [`ArenaError::InvalidConfig`] if the chunk size is zero or too
    /// large to describe as a `Layout`.
    pub fn validate(&self) -> Result<(), ArenaError> {
        if self.chunk_size == 0 {
            return Err(ArenaError::InvalidConfig(
                "chunk size must be positive".to_owned(),
            ));
        }
        if self.chunk_size > isize::MAX as usize - CHUNK_ALIGN {
            return Err(ArenaError::InvalidConfig(format!(
                "chunk size {} exceeds the largest supported chunk",
                self.chunk_size
            )));
        }
        Ok(())
    }

    /// Total bytes the arena may reserve, or `None` when unbounded.
    pub fn max_reserved_bytes(&self) -> Option<usize> {
        match self.limit {
            0 => None,
            limit => Some(limit.saturating_mul(self.chunk_size)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn limit_defaults_to_unbounded() {
        let config = ArenaConfig::from_json(r#"{"chunk_size": 4096}"#).unwrap();
        assert_eq!(config, ArenaConfig::new(4096));
        assert_eq!(config.max_reserved_bytes(), None);
    }

    #[test]
    fn json_limit_is_read() {
        let config = ArenaConfig::from_json(r#"{"chunk_size": 100, "limit": 3}"#).unwrap();
        assert_eq!(config, ArenaConfig::new(100).with_limit(3));
        assert_eq!(config.max_reserved_bytes(), Some(300));
    }

    #[test]
    fn zero_chunk_size_is_rejected() {
        let err = ArenaConfig::from_json(r#"{"chunk_size": 0}"#).unwrap_err();
        assert!(matches!(err, ArenaError::InvalidConfig(_)));
    }

    #[test]
    fn malformed_json_is_rejected() {
        let err = ArenaConfig::from_json("{chunk_size: }").unwrap_err();
        assert!(matches!(err, ArenaError::InvalidConfig(_)));
    }

    #[test]
    fn oversized_chunk_is_rejected() {
        assert!(ArenaConfig::new(usize::MAX).validate().is_err());
    }
}
