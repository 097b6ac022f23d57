//! NDI SDK provisioning
//!
//! Resolves the platform's compiler facts before anything is compiled:
//! - host Python headers (required)
//! - the NDI SDK headers / import library for the platform
//! - runtime DLLs copied next to the package on Windows
//! - numpy headers (optional)
//!
//! Each platform family has its own [`SdkProvisioner`]; all knowledge about
//! vendor SDK layouts stays behind that trait.

pub mod host;
pub mod provisioner;
pub mod windows;

pub use host::{FixedHost, HostToolchain, PythonHost, host_toolchain};
pub use provisioner::{MacosProvisioner, OtherProvisioner};
pub use windows::{CopyReport, WindowsProvisioner, copy_runtime_binaries};

use crate::paths::ProjectLayout;
use crate::platform::{OsKind, PlatformFacts, PlatformFactsBuilder};
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while provisioning the SDK
#[derive(Debug, Error)]
pub enum SdkError {
    #[error("Python development headers not found: {reason}")]
    HostHeaders { reason: String },

    #[error("Failed to read SDK directory {}: {source}", .path.display())]
    ReadDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to copy {} to {}: {source}", .from.display(), .to.display())]
    Copy {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Result of one provisioning stage: the updated accumulator plus whatever
/// the stage copied
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Provisioning {
    pub facts: PlatformFactsBuilder,
    pub copy: CopyReport,
}

impl Provisioning {
    #[must_use]
    pub fn unchanged(facts: PlatformFactsBuilder) -> Self {
        Self {
            facts,
            copy: CopyReport::default(),
        }
    }
}

/// Platform-specific SDK handling
pub trait SdkProvisioner: fmt::Debug {
    /// Platform family this provisioner serves
    fn os_kind(&self) -> OsKind;

    /// Add the SDK's include/library facts and perform any filesystem setup.
    ///
    /// Must be safe to re-run: nothing is overwritten or deleted.
    ///
    /// # Errors
    ///
    /// Returns an error if the SDK exists but cannot be read or copied.
    fn provision(&self, facts: PlatformFactsBuilder) -> Result<Provisioning, SdkError>;
}

/// Fully provisioned facts for one build
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Provisioned {
    pub facts: PlatformFacts,
    pub copy: CopyReport,
}

/// Pick the provisioner for `os_kind` using the project's SDK locations
#[must_use]
pub fn provisioner_for(os_kind: OsKind, layout: &ProjectLayout) -> Box<dyn SdkProvisioner> {
    match os_kind {
        OsKind::Macos => Box::new(MacosProvisioner::new(&layout.macos_sdk_dir)),
        OsKind::Windows => Box::new(WindowsProvisioner::new(
            &layout.bundled_include,
            &layout.windows_sdk_dir,
            &layout.package_dir,
        )),
        OsKind::Other => Box::new(OtherProvisioner),
    }
}

/// Resolve the platform facts for a build.
///
/// Include order: Python headers, SDK headers, numpy headers. A missing numpy
/// is logged and ignored; missing Python headers abort.
///
/// # Errors
///
/// Returns [`SdkError::HostHeaders`] if the Python headers cannot be located,
/// or a filesystem error from the provisioner.
pub fn resolve_platform_facts(
    provisioner: &dyn SdkProvisioner,
    host: &dyn HostToolchain,
) -> Result<Provisioned, SdkError> {
    let python_include = host.python_include()?;
    crate::debug!("python headers: {}", python_include.display());

    let facts = PlatformFactsBuilder::new(provisioner.os_kind()).with_include_dir(&python_include);
    let Provisioning { facts, copy } = provisioner.provision(facts)?;

    let facts = match host.numpy_include() {
        Some(numpy) => {
            crate::debug!("numpy headers: {}", numpy.display());
            facts.with_include_dir(numpy)
        }
        None => {
            crate::warn!("numpy not available, building without its headers");
            facts
        }
    };

    Ok(Provisioned {
        facts: facts.finish(),
        copy,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used, reason = "Tests can panic")]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn other_platform_uses_only_host_headers() {
        let temp = TempDir::new().unwrap();
        let host = FixedHost {
            python_include: Some(temp.path().to_path_buf()),
            numpy_include: None,
        };

        let provisioned = resolve_platform_facts(&OtherProvisioner, &host).unwrap();

        assert_eq!(provisioned.facts.os_kind, OsKind::Other);
        assert_eq!(provisioned.facts.include_dirs, vec![temp.path().to_path_buf()]);
        assert!(provisioned.facts.library_dirs.is_empty());
        assert_eq!(provisioned.facts.library_name, "ndi");
        assert!(provisioned.copy.is_empty());
    }

    #[test]
    fn numpy_include_goes_last() {
        let temp = TempDir::new().unwrap();
        let python = temp.path().join("python");
        let sdk = temp.path().join("sdk");
        let numpy = temp.path().join("numpy");
        for dir in [&python, &sdk.join("include"), &numpy] {
            fs::create_dir_all(dir).unwrap();
        }
        let host = FixedHost {
            python_include: Some(python.clone()),
            numpy_include: Some(numpy.clone()),
        };

        let provisioned = resolve_platform_facts(&MacosProvisioner::new(&sdk), &host).unwrap();

        assert_eq!(
            provisioned.facts.include_dirs,
            vec![python, sdk.join("include"), numpy]
        );
    }

    #[test]
    fn missing_host_headers_abort() {
        let host = FixedHost {
            python_include: None,
            numpy_include: None,
        };
        let err = resolve_platform_facts(&OtherProvisioner, &host).unwrap_err();
        assert!(matches!(err, SdkError::HostHeaders { .. }));
    }

    #[test]
    fn provisioner_matches_platform() {
        let layout = ProjectLayout::resolve(
            std::path::Path::new("/work/p"),
            &crate::config::Config::default(),
        );
        for os in [OsKind::Windows, OsKind::Macos, OsKind::Other] {
            assert_eq!(provisioner_for(os, &layout).os_kind(), os);
        }
    }
}
