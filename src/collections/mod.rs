//! Collections whose storage lives in an [`Arena`](crate::Arena).

pub mod arena_vec;

pub use arena_vec::ArenaVec;
