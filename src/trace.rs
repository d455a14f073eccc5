//! Structured logging hooks.
//!
//! Each macro forwards to the matching `tracing` macro when the `tracing`
//! feature is enabled and expands to nothing otherwise. Arguments are not
//! evaluated without the feature, so they must be side-effect free.

macro_rules! trace_debug {
    ($($arg:tt)*) => {
        #[cfg(feature = "tracing")]
        {
            ::tracing::debug!($($arg)*);
        }
    };
}

macro_rules! trace_warn {
    ($($arg:tt)*) => {
        #[cfg(feature = "tracing")]
        {
            ::tracing::warn!($($arg)*);
        }
    };
}

macro_rules! trace_error {
    ($($arg:tt)*) => {
        #[cfg(feature = "tracing")]
        {
            ::tracing::error!($($arg)*);
        }
    };
}
