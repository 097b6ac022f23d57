//! Common test utilities and helpers
//!
//! This module provides shared functionality used across integration tests:
//! - Binary invocation (via `cyndi_build_command`)
//! - Project fixtures (via `helpers`)

pub(crate) mod helpers;

// Re-export the binary helpers for convenient access
#[allow(unused_imports)]
pub(crate) use helpers::{cyndi_build_command, get_cyndi_build_binary};
