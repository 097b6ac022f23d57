//! Cross-reference index of compiled modules
//!
//! Arranges the built modules by their dotted names and writes one
//! `index.html` per tree node so the annotated transpiler output can be
//! browsed by package.

pub mod render;
pub mod tree;

pub use render::{IndexRenderer, RenderReport};
pub use tree::{ModuleIndex, ModuleIndexNode};

use std::path::PathBuf;
use thiserror::Error;

/// Index rendering errors
#[derive(Debug, Error)]
pub enum IndexError {
    #[error("Failed to write index page {}: {source}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Skipped index page for \"{name}\": segment \"{segment}\" is not a Python identifier")]
    InvalidName { name: String, segment: String },
}
