//! Debug logging utilities
//!
//! Debug output is switched on by the global `--debug` flag or the
//! `CYNDI_BUILD_DEBUG` environment variable. Warnings are always printed;
//! they cover the few conditions the build tolerates (a missing numpy, an old
//! transpiler) but that a developer should still see.

use std::sync::OnceLock;

static DEBUG_ENABLED: OnceLock<bool> = OnceLock::new();

/// Initialize debug mode from the command-line flag
///
/// The environment variable is honoured even when the flag is absent.
pub fn init_debug(enabled: bool) {
    let _ = DEBUG_ENABLED.set(enabled || crate::env_vars::debug_enabled());
}

/// Check if debug mode is enabled
pub fn is_debug_enabled() -> bool {
    DEBUG_ENABLED.get().copied().unwrap_or(false)
}

/// Print a debug message if debug mode is enabled
pub fn debug_log(message: &str) {
    if is_debug_enabled() {
        eprintln!("[DEBUG] {message}");
    }
}

/// Print a warning to stderr
pub fn warn_log(message: &str) {
    eprintln!("warning: {message}");
}

/// Macro for convenient debug logging
///
/// Usage: `debug!("scanning {}", path.display())`
#[macro_export]
macro_rules! debug {
    ($($arg:tt)*) => {
        if $crate::debug::is_debug_enabled() {
            eprintln!("[DEBUG] {}", format_args!($($arg)*));
        }
    };
}

/// Macro for warnings that do not stop the build
#[macro_export]
macro_rules! warn {
    ($($arg:tt)*) => {
        $crate::debug::warn_log(&format!($($arg)*))
    };
}
