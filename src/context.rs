//! Request-scoped arena passing.
//!
//! A [`Context`] carries an optional shared arena alongside other request
//! state, so code deep in a call chain can allocate into the arena owned by
//! the request without threading it through every signature. The arena itself
//! never consults a context.

use std::sync::Arc;

use crate::alloc::error::{fault, ArenaError};
use crate::Arena;

/// A cloneable handle that may carry an arena.
#[derive(Clone, Debug, Default)]
pub struct Context {
    arena: Option<Arc<Arena>>,
}

impl Context {
    /// An empty context.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a context carrying `arena`, replacing any arena already attached.
    #[must_use]
    pub fn attach(self, arena: Arc<Arena>) -> Self {
        Self { arena: Some(arena) }
    }

    /// The attached arena.
    ///
    /// # Errors
    /// Returns [`ArenaError::MissingContextArena`] if none is attached.
    pub fn try_retrieve(&self) -> Result<&Arc<Arena>, ArenaError> {
        self.arena.as_ref().ok_or(ArenaError::MissingContextArena)
    }

    /// The attached arena.
    ///
    /// ```
    /// use std::sync::Arc;
    /// use quarry::{Arena, Context};
    ///
    /// let ctx = Context::new().attach(Arc::new(Arena::new(4096)));
    /// let name = ctx.retrieve().new_string("request-17");
    /// assert_eq!(name, "request-17");
    /// ```
    ///
    /// # Panics
    /// Panics if no arena is attached.
    #[track_caller]
    pub fn retrieve(&self) -> &Arc<Arena> {
        match self.try_retrieve() {
            Ok(arena) => arena,
            Err(err) => fault(err),
        }
    }
}
