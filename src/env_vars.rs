//! Environment variable handling.
//!
//! Every knob the build reads from the process environment lives here so the
//! rest of the crate never calls `std::env::var` directly.

use std::env;
use std::path::PathBuf;

/// Interpret a boolean environment value ("1", "true", "yes", case-insensitive).
#[must_use]
pub fn parse_bool(value: &str) -> bool {
    let s = value.trim().to_lowercase();
    s == "1" || s == "true" || s == "yes"
}

// Helper for boolean environment variables
fn is_enabled(var: &str) -> bool {
    env::var(var).ok().is_some_and(|s| parse_bool(&s))
}

fn non_empty(var: &str) -> Option<String> {
    env::var(var).ok().filter(|s| !s.trim().is_empty())
}

// Build mode selection

/// Check if the instrumentation (profile + line tracing) build is requested.
pub fn use_profile() -> bool {
    is_enabled("CYNDI_BUILD_PROFILE")
}

/// Get the requested build mode (`auto`, `direct` or `assembled`).
pub fn build_mode() -> Option<String> {
    non_empty("CYNDI_BUILD_MODE")
}

/// Check if debug logging is enabled.
pub fn debug_enabled() -> bool {
    is_enabled("CYNDI_BUILD_DEBUG")
}

// Configuration and layout

/// Get an explicit configuration file path.
pub fn config_path() -> Option<PathBuf> {
    non_empty("CYNDI_BUILD_CONFIG").map(PathBuf::from)
}

/// Get the target OS override (`windows`, `macos`, anything else is "other").
pub fn target_os() -> Option<String> {
    non_empty("CYNDI_BUILD_TARGET_OS")
}

/// Get the NDI SDK directory override for the current platform.
pub fn ndi_sdk_dir() -> Option<PathBuf> {
    non_empty("NDI_SDK_DIR").map(PathBuf::from)
}

/// Get the XDG configuration home.
pub fn xdg_config_home() -> Option<PathBuf> {
    non_empty("XDG_CONFIG_HOME").map(PathBuf::from)
}

// Host toolchain

/// Get the transpiler executable (`CYTHON`).
pub fn cython() -> Option<PathBuf> {
    non_empty("CYTHON").map(PathBuf::from)
}

/// Get the Python interpreter used for header queries (`PYTHON`).
pub fn python() -> Option<PathBuf> {
    non_empty("PYTHON").map(PathBuf::from)
}
