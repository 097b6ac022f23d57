//! macOS and fallback provisioners

use super::{Provisioning, SdkError, SdkProvisioner};
use crate::platform::{OsKind, PlatformFactsBuilder};
use std::path::{Path, PathBuf};

/// System-wide "NDI SDK for Apple" install
///
/// Only the headers are added; the library resolves through the linker's
/// default search path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MacosProvisioner {
    sdk_dir: PathBuf,
}

impl MacosProvisioner {
    #[must_use]
    pub fn new(sdk_dir: &Path) -> Self {
        Self {
            sdk_dir: sdk_dir.to_path_buf(),
        }
    }
}

impl SdkProvisioner for MacosProvisioner {
    fn os_kind(&self) -> OsKind {
        OsKind::Macos
    }

    fn provision(&self, facts: PlatformFactsBuilder) -> Result<Provisioning, SdkError> {
        if !self.sdk_dir.is_dir() {
            crate::debug!("no NDI SDK at {}", self.sdk_dir.display());
            return Ok(Provisioning::unchanged(facts));
        }

        Ok(Provisioning::unchanged(
            facts.with_include_dir(self.sdk_dir.join("include")),
        ))
    }
}

/// Platforms relying on system-installed headers and libraries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct OtherProvisioner;

impl SdkProvisioner for OtherProvisioner {
    fn os_kind(&self) -> OsKind {
        OsKind::Other
    }

    fn provision(&self, facts: PlatformFactsBuilder) -> Result<Provisioning, SdkError> {
        Ok(Provisioning::unchanged(facts))
    }
}
