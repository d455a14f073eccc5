//! Arena allocation.
//!
//! - [`Arena`]: the concurrent bump-pointer arena.
//! - [`ArenaConfig`]: chunk size and chunk limit.
//! - [`ArenaError`]: every fault the arena reports.
//! - [`ArenaStats`]: a serializable bookkeeping snapshot.

pub mod arena;
pub mod config;
pub mod error;
pub mod stats;

mod chunk;
mod typed;

pub use arena::Arena;
pub use config::ArenaConfig;
pub use error::ArenaError;
pub use stats::ArenaStats;
