//! Extension manifest
//!
//! The build's single output for the packaging step: the ordered descriptor
//! list plus when, where and how it was produced. Written atomically so a
//! reader never sees half a manifest.

use crate::extensions::BuildDescriptor;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Manifest read and write errors
#[derive(Debug, Error)]
pub enum ManifestError {
    #[error("Failed to write manifest {}: {source}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to read manifest {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid manifest {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Everything the packaging step needs to compile the extensions
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manifest {
    /// RFC 3339 timestamp
    pub generated_at: String,
    /// Platform tag of the build host (e.g. `x86_64-linux`)
    pub platform: String,
    /// `direct` or `assembled`
    pub mode: String,
    pub extensions: Vec<BuildDescriptor>,
}

impl Manifest {
    /// Manifest for `extensions`, stamped with the current time and platform
    #[must_use]
    pub fn new(mode: &str, extensions: Vec<BuildDescriptor>) -> Self {
        Self {
            generated_at: chrono::Local::now().to_rfc3339(),
            platform: crate::platform::detect_current_platform(),
            mode: mode.to_string(),
            extensions,
        }
    }

    /// Write the manifest to `path`.
    ///
    /// The JSON goes to a temporary file in the same directory which is then
    /// renamed over `path`. Parent directories are created as needed.
    ///
    /// # Errors
    ///
    /// Returns [`ManifestError::Write`] if any step fails; `path` is left
    /// untouched in that case.
    pub fn write(&self, path: &Path) -> Result<(), ManifestError> {
        let wrap = |source| ManifestError::Write {
            path: path.to_path_buf(),
            source,
        };
        let dir = path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        fs::create_dir_all(dir).map_err(wrap)?;

        let json = serde_json::to_string_pretty(self).map_err(|e| wrap(e.into()))?;

        let mut temp_file = tempfile::NamedTempFile::new_in(dir).map_err(wrap)?;
        temp_file.write_all(json.as_bytes()).map_err(wrap)?;
        temp_file.write_all(b"\n").map_err(wrap)?;
        temp_file.flush().map_err(wrap)?;

        // Atomic rename
        temp_file.persist(path).map_err(|e| wrap(e.error))?;
        crate::debug!("wrote manifest {}", path.display());
        Ok(())
    }

    /// Read a manifest written by [`Manifest::write`].
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or is not a manifest.
    pub fn load(path: &Path) -> Result<Self, ManifestError> {
        let contents = fs::read_to_string(path).map_err(|source| ManifestError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&contents).map_err(|source| ManifestError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }
}
