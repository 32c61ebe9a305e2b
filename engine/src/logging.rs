//! FILENAME: engine/src/logging.rs
//! PURPOSE: Category-tagged logging macros shared by the workspace crates.
//! CONTEXT: Thin wrappers over the `log` facade. The category becomes the log
//! target so hosts can filter ("FORMULA", "STRATEGY", "COLUMNS", "STORAGE").
//! The library never installs a logger; that is the host's job.

#[doc(hidden)]
pub use log;

#[macro_export]
macro_rules! log_debug {
    ($cat:expr, $($arg:tt)*) => {
        $crate::logging::log::debug!(target: $cat, $($arg)*)
    };
}

#[macro_export]
macro_rules! log_info {
    ($cat:expr, $($arg:tt)*) => {
        $crate::logging::log::info!(target: $cat, $($arg)*)
    };
}

#[macro_export]
macro_rules! log_warn {
    ($cat:expr, $($arg:tt)*) => {
        $crate::logging::log::warn!(target: $cat, $($arg)*)
    };
}
