#![deny(missing_docs)]
//! Shared logging utilities for the ingest workspace.
//!
//! This crate provides the `engine_*` logging macros used across the codebase,
//! a helper for keeping bearer tokens out of log lines, and a minimal test
//! initializer for the global logger.

/// Number of leading characters of a secret kept by [`redact`].
const VISIBLE_PREFIX: usize = 4;

/// Returns a log-safe rendering of a secret such as a bearer token.
///
/// Only a short prefix and the total length are kept, so two log lines can
/// still be correlated without the credential itself ending up on disk.
pub fn redact(secret: &str) -> String {
    let len = secret.chars().count();
    if len <= VISIBLE_PREFIX * 2 {
        return format!("<redacted len={len}>");
    }
    let prefix: String = secret.chars().take(VISIBLE_PREFIX).collect();
    format!("{prefix}…<redacted len={len}>")
}

/// Logs a trace-level message using the global logging facade.
#[macro_export]
macro_rules! engine_trace {
    ($($arg:tt)*) => {{
        log::trace!($($arg)*);
    }};
}

/// Logs an info-level message using the global logging facade.
#[macro_export]
macro_rules! engine_info {
    ($($arg:tt)*) => {{
        log::info!($($arg)*);
    }};
}

/// Logs a debug-level message using the global logging facade.
#[macro_export]
macro_rules! engine_debug {
    ($($arg:tt)*) => {{
        log::debug!($($arg)*);
    }};
}

/// Logs a warn-level message using the global logging facade.
#[macro_export]
macro_rules! engine_warn {
    ($($arg:tt)*) => {{
        log::warn!($($arg)*);
    }};
}

/// Logs an error-level message using the global logging facade.
#[macro_export]
macro_rules! engine_error {
    ($($arg:tt)*) => {{
        log::error!($($arg)*);
    }};
}

/// Initializes a simple terminal logger for use in unit tests.
///
/// This safely no-ops if another logger has already been initialized.
pub fn initialize_for_tests() {
    use simplelog::{ColorChoice, CombinedLogger, Config, TermLogger, TerminalMode};

    // Use debug level in debug builds, info in release builds.
    let level = if cfg!(debug_assertions) {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };

    // Ignore the error if a logger was already set by another test.
    let _ = CombinedLogger::init(vec![TermLogger::new(
        level,
        Config::default(),
        TerminalMode::Mixed,
        ColorChoice::Auto,
    )]);
}
