//! Windows provisioning
//!
//! Windows builds use the headers bundled with the project and a project-local
//! "NDI SDK for Windows" folder. The SDK's runtime DLLs are copied into the
//! package directory so the built extension can load them.

use super::{Provisioning, SdkError, SdkProvisioner};
use crate::platform::{OsKind, PlatformFactsBuilder};
use std::fs;
use std::path::{Path, PathBuf};

/// Runtime binaries, relative to the SDK root
const RUNTIME_BIN_DIR: [&str; 2] = ["Bin", "x64"];

/// Import libraries, relative to the SDK root
const IMPORT_LIB_DIR: [&str; 2] = ["Lib", "x64"];

/// Files handled by a runtime-binary copy
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CopyReport {
    /// Destination paths written by this run
    pub copied: Vec<PathBuf>,
    /// Destination paths that already existed and were left alone
    pub skipped: Vec<PathBuf>,
}

impl CopyReport {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.copied.is_empty() && self.skipped.is_empty()
    }
}

/// Project-local SDK on Windows
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WindowsProvisioner {
    bundled_include: PathBuf,
    sdk_dir: PathBuf,
    package_dir: PathBuf,
}

impl WindowsProvisioner {
    #[must_use]
    pub fn new(bundled_include: &Path, sdk_dir: &Path, package_dir: &Path) -> Self {
        Self {
            bundled_include: bundled_include.to_path_buf(),
            sdk_dir: sdk_dir.to_path_buf(),
            package_dir: package_dir.to_path_buf(),
        }
    }

    fn runtime_bin_dir(&self) -> PathBuf {
        RUNTIME_BIN_DIR.iter().fold(self.sdk_dir.clone(), |dir, part| dir.join(part))
    }

    fn import_lib_dir(&self) -> PathBuf {
        IMPORT_LIB_DIR.iter().fold(self.sdk_dir.clone(), |dir, part| dir.join(part))
    }
}

impl SdkProvisioner for WindowsProvisioner {
    fn os_kind(&self) -> OsKind {
        OsKind::Windows
    }

    fn provision(&self, facts: PlatformFactsBuilder) -> Result<Provisioning, SdkError> {
        let facts = facts.with_include_dir(&self.bundled_include);

        if !self.sdk_dir.is_dir() {
            crate::debug!("no local NDI SDK at {}", self.sdk_dir.display());
            return Ok(Provisioning::unchanged(facts));
        }

        let copy = copy_runtime_binaries(&self.runtime_bin_dir(), &self.package_dir)?;
        Ok(Provisioning {
            facts: facts.with_library_dir(self.import_lib_dir()),
            copy,
        })
    }
}

/// Copy every regular file of `src_dir` into `dest_dir`.
///
/// Files already present at the destination are skipped, never overwritten,
/// so the copy can be re-run between incremental builds. Subdirectories are
/// ignored. A missing `src_dir` copies nothing.
///
/// # Errors
///
/// Returns an error if `src_dir` exists but cannot be read, or a copy fails.
pub fn copy_runtime_binaries(src_dir: &Path, dest_dir: &Path) -> Result<CopyReport, SdkError> {
    let mut report = CopyReport::default();

    if !src_dir.is_dir() {
        crate::debug!("no runtime binaries at {}", src_dir.display());
        return Ok(report);
    }

    let read_dir_err = |source| SdkError::ReadDir {
        path: src_dir.to_path_buf(),
        source,
    };

    let mut entries = fs::read_dir(src_dir)
        .map_err(read_dir_err)?
        .map(|entry| entry.map(|e| e.path()))
        .collect::<Result<Vec<_>, _>>()
        .map_err(read_dir_err)?;
    entries.sort();

    for path in entries {
        if !path.is_file() {
            continue;
        }
        let Some(file_name) = path.file_name() else {
            continue;
        };

        let dest = dest_dir.join(file_name);
        if dest.exists() {
            report.skipped.push(dest);
            continue;
        }

        fs::copy(&path, &dest).map_err(|source| SdkError::Copy {
            from: path.clone(),
            to: dest.clone(),
            source,
        })?;
        crate::debug!("copied {} -> {}", path.display(), dest.display());
        report.copied.push(dest);
    }

    Ok(report)
}
