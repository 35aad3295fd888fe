//! Structured logging for walletscout
//!
//! ## Usage
//!
//! ```rust
//! use walletscout::logger::{self, LogTag};
//!
//! logger::info(LogTag::Scheduler, "Dispatching 12 wallets");
//! logger::warning(LogTag::RateLimit, "Throttled, backing off 60s");
//! logger::debug(LogTag::Oracle, "Raw answer: ..."); // Only with --debug-oracle
//! ```
//!
//! Call `logger::init()` once at startup, then `logger::init_file_logging`
//! once the log directory is known.

mod config;
mod core;
mod file;
mod format;
mod levels;
mod tags;

pub use config::{get_logger_config, init_from_args, set_logger_config, LoggerConfig};
pub use file::init_file_logging;
pub use levels::LogLevel;
pub use tags::LogTag;

/// Read --verbose/--quiet/--debug-<tag> from the command line
pub fn init() {
    config::init_from_args();
}

/// Always shown
pub fn error(tag: LogTag, message: &str) {
    core::log_internal(tag, LogLevel::Error, message);
}

/// Shown unless --quiet
pub fn warning(tag: LogTag, message: &str) {
    core::log_internal(tag, LogLevel::Warning, message);
}

/// Normal operation
pub fn info(tag: LogTag, message: &str) {
    core::log_internal(tag, LogLevel::Info, message);
}

/// Only with --debug-<tag> for this tag
pub fn debug(tag: LogTag, message: &str) {
    core::log_internal(tag, LogLevel::Debug, message);
}

/// Only with --verbose
pub fn verbose(tag: LogTag, message: &str) {
    core::log_internal(tag, LogLevel::Verbose, message);
}

/// Flush pending file writes (call before exit)
pub fn flush() {
    file::flush_file_logging();
}
