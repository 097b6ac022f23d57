//! Errors raised while discovering and assembling extensions

use std::path::PathBuf;
use thiserror::Error;

/// Appended to metadata errors: the direct build does not need metadata
pub const ALTERNATE_MODE_HINT: &str = "try building with \"--mode direct\"";

#[derive(Debug, Error)]
pub enum ExtensionError {
    #[error("Could not find a generated source for \"{}\" (expected .c or .cpp next to it)", .interface.display())]
    MissingGeneratedSource { interface: PathBuf },

    #[error("Could not read metadata from source \"{}\" ({})", .generated.display(), ALTERNATE_MODE_HINT)]
    MissingMetadata { generated: PathBuf },

    #[error("Invalid metadata in \"{}\": {source} ({})", .path.display(), ALTERNATE_MODE_HINT)]
    InvalidMetadata {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Unsupported metadata sidecar version {found} in \"{}\" ({})", .path.display(), ALTERNATE_MODE_HINT)]
    UnsupportedSidecar { path: PathBuf, found: u32 },

    #[error("Duplicate extension name \"{name}\" declared by \"{}\" and \"{}\"", .first.display(), .second.display())]
    DuplicateName {
        name: String,
        first: PathBuf,
        second: PathBuf,
    },

    #[error("Invalid module name \"{name}\" from \"{}\" (every dotted segment must be a Python identifier)", .origin.display())]
    InvalidModuleName { name: String, origin: PathBuf },

    #[error("Invalid search pattern '{pattern}': {message}")]
    InvalidPattern { pattern: String, message: String },

    #[error("Failed to access {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Transpiling \"{}\" failed: {message}", .interface.display())]
    Transpile { interface: PathBuf, message: String },
}

impl ExtensionError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn metadata_errors_carry_mode_hint() {
        let err = ExtensionError::MissingMetadata {
            generated: PathBuf::from("src/pkg/x.c"),
        };
        let message = err.to_string();
        assert!(message.contains("src/pkg/x.c"));
        assert!(message.contains(ALTERNATE_MODE_HINT));
    }

    #[test]
    fn duplicate_names_both_sources() {
        let err = ExtensionError::DuplicateName {
            name: "pkg.x".to_string(),
            first: PathBuf::from("a/x.c"),
            second: PathBuf::from("b/x.c"),
        };
        let message = err.to_string();
        assert!(message.contains("pkg.x"));
        assert!(message.contains("a/x.c"));
        assert!(message.contains("b/x.c"));
    }
}
