//! FILENAME: core/table-engine/src/logging.rs
//! Category-tagged logging macros.
//!
//! Every message carries a category (RESOLVE, LAYOUT, MATCH, TABLE) which
//! becomes the `log` target, so a subscriber can filter one stage of the
//! pipeline. The crate never installs a logger itself.
//!
//! Usage:
//!   log_debug!("RESOLVE", "axis {} has {} leaves", axis, count);
//!   log_enter!("LAYOUT", "build_headers", "axis={}", axis);
//!   log_exit!("LAYOUT", "build_headers");

pub const CAT_RESOLVE: &str = "RESOLVE";
pub const CAT_LAYOUT: &str = "LAYOUT";
pub const CAT_MATCH: &str = "MATCH";
pub const CAT_TABLE: &str = "TABLE";

#[macro_export]
macro_rules! log_debug {
    ($cat:expr, $($arg:tt)*) => {
        ::log::debug!(target: $cat, $($arg)*)
    };
}

#[macro_export]
macro_rules! log_info {
    ($cat:expr, $($arg:tt)*) => {
        ::log::info!(target: $cat, $($arg)*)
    };
}

#[macro_export]
macro_rules! log_warn {
    ($cat:expr, $($arg:tt)*) => {
        ::log::warn!(target: $cat, $($arg)*)
    };
}

#[macro_export]
macro_rules! log_error {
    ($cat:expr, $($arg:tt)*) => {
        ::log::error!(target: $cat, $($arg)*)
    };
}

// ENTER/EXIT macros for function tracing

#[macro_export]
macro_rules! log_enter {
    ($cat:expr, $func:expr) => {
        ::log::trace!(target: $cat, "ENTER {}", $func)
    };
    ($cat:expr, $func:expr, $($arg:tt)*) => {
        ::log::trace!(target: $cat, "ENTER {} {}", $func, format_args!($($arg)*))
    };
}

#[macro_export]
macro_rules! log_exit {
    ($cat:expr, $func:expr) => {
        ::log::trace!(target: $cat, "EXIT {}", $func)
    };
    ($cat:expr, $func:expr, $($arg:tt)*) => {
        ::log::trace!(target: $cat, "EXIT {} {}", $func, format_args!($($arg)*))
    };
}
