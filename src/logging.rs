//! Logging abstraction layer
//!
//! The router logs through whichever backend is enabled at compile time:
//!
//! - `log` (default) - the standard `log` facade
//! - `tracing` - structured events through `tracing`
//!
//! The two features are mutually exclusive. With neither enabled every macro
//! expands to nothing. All records use the `route_tree` target so they can be
//! filtered independently of the host application.
//!
//! # Usage
//!
//! ```ignore
//! use route_tree::{debug_log, trace_log};
//!
//! trace_log!("matching {:?} against {}", rest, name);
//! debug_log!("navigation to {} committed", href);
//! ```

/// Shared expansion for the level macros below.
#[doc(hidden)]
#[macro_export]
macro_rules! __route_log {
    ($level:ident, $($arg:tt)*) => {
        #[cfg(feature = "tracing")]
        ::tracing::$level!(target: "route_tree", $($arg)*);
        #[cfg(feature = "log")]
        ::log::$level!(target: "route_tree", $($arg)*);
    };
}

/// Per-node matching detail.
#[macro_export]
macro_rules! trace_log {
    ($($arg:tt)*) => {
        $crate::__route_log!(trace, $($arg)*)
    };
}

/// Navigation outcomes and vetoes.
#[macro_export]
macro_rules! debug_log {
    ($($arg:tt)*) => {
        $crate::__route_log!(debug, $($arg)*)
    };
}

/// Informational messages.
#[macro_export]
macro_rules! info_log {
    ($($arg:tt)*) => {
        $crate::__route_log!(info, $($arg)*)
    };
}

/// Recoverable oddities, e.g. an unknown group in the location.
#[macro_export]
macro_rules! warn_log {
    ($($arg:tt)*) => {
        $crate::__route_log!(warn, $($arg)*)
    };
}

/// Tolerated hook failures.
#[macro_export]
macro_rules! error_log {
    ($($arg:tt)*) => {
        $crate::__route_log!(error, $($arg)*)
    };
}
