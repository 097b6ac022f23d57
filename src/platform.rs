//! Platform detection and compiler facts
//!
//! Detects which platform family the build targets and carries the
//! platform-specific compiler and linker inputs (`PlatformFacts`) that every
//! extension descriptor is built from.

use serde::Serialize;
use std::env;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

/// Cached platform tag (computed once, reused throughout execution)
static CURRENT_PLATFORM: LazyLock<String> = LazyLock::new(detect_platform_impl);

/// NDI runtime library name on Windows (import library without extension)
pub const WINDOWS_LIBRARY_NAME: &str = "Processing.NDI.Lib.x64";

/// NDI runtime library name everywhere else
pub const DEFAULT_LIBRARY_NAME: &str = "ndi";

/// Platform families with distinct SDK layouts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OsKind {
    /// Windows: bundled headers, project-local SDK with runtime DLLs
    Windows,
    /// macOS: system-wide SDK install under `/Library`
    Macos,
    /// Anything else: system headers and libraries
    Other,
}

impl OsKind {
    /// The platform family of the running host, unless overridden by
    /// `CYNDI_BUILD_TARGET_OS`.
    #[must_use]
    pub fn current() -> Self {
        crate::env_vars::target_os()
            .map_or_else(|| Self::from_name(env::consts::OS), |os| Self::from_name(&os))
    }

    /// Map an OS name (`std::env::consts::OS` style) onto a platform family
    #[must_use]
    pub fn from_name(name: &str) -> Self {
        match name.to_lowercase().as_str() {
            "windows" | "win32" => Self::Windows,
            "macos" | "darwin" => Self::Macos,
            _ => Self::Other,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Windows => "windows",
            Self::Macos => "macos",
            Self::Other => "other",
        }
    }

    /// The NDI library to link against. Not discovered from disk.
    #[must_use]
    pub const fn library_name(self) -> &'static str {
        match self {
            Self::Windows => WINDOWS_LIBRARY_NAME,
            Self::Macos | Self::Other => DEFAULT_LIBRARY_NAME,
        }
    }

    /// Compiler flags the generated sources need on this platform
    #[must_use]
    pub fn extra_compile_args(self) -> Vec<String> {
        match self {
            Self::Windows => vec!["/Zc:strictStrings".to_string()],
            Self::Macos | Self::Other => vec!["-fpermissive".to_string()],
        }
    }
}

/// Resolved compiler and linker inputs for one build invocation
///
/// Immutable once built; create it through [`PlatformFactsBuilder`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlatformFacts {
    pub os_kind: OsKind,
    pub include_dirs: Vec<PathBuf>,
    pub library_dirs: Vec<PathBuf>,
    pub library_name: String,
}

impl PlatformFacts {
    /// Compiler flags for every descriptor built with these facts
    #[must_use]
    pub fn extra_compile_args(&self) -> Vec<String> {
        self.os_kind.extra_compile_args()
    }
}

/// Accumulator threaded through the provisioning stages
///
/// Each stage takes the builder by value and hands it back, so no stage
/// depends on shared mutable state. Paths are kept in insertion order and
/// de-duplicated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlatformFactsBuilder {
    os_kind: OsKind,
    include_dirs: Vec<PathBuf>,
    library_dirs: Vec<PathBuf>,
}

impl PlatformFactsBuilder {
    #[must_use]
    pub const fn new(os_kind: OsKind) -> Self {
        Self {
            os_kind,
            include_dirs: Vec::new(),
            library_dirs: Vec::new(),
        }
    }

    #[must_use]
    pub const fn os_kind(&self) -> OsKind {
        self.os_kind
    }

    #[must_use]
    pub fn include_dirs(&self) -> &[PathBuf] {
        &self.include_dirs
    }

    #[must_use]
    pub fn library_dirs(&self) -> &[PathBuf] {
        &self.library_dirs
    }

    /// Append an include directory (ignored if already present)
    #[must_use]
    pub fn with_include_dir(mut self, dir: impl AsRef<Path>) -> Self {
        push_unique(&mut self.include_dirs, dir.as_ref());
        self
    }

    /// Append a library search directory (ignored if already present)
    #[must_use]
    pub fn with_library_dir(mut self, dir: impl AsRef<Path>) -> Self {
        push_unique(&mut self.library_dirs, dir.as_ref());
        self
    }

    /// Freeze the accumulated facts
    #[must_use]
    pub fn finish(self) -> PlatformFacts {
        PlatformFacts {
            os_kind: self.os_kind,
            include_dirs: self.include_dirs,
            library_dirs: self.library_dirs,
            library_name: self.os_kind.library_name().to_string(),
        }
    }
}

/// Push `path` onto `paths` unless an equal path is already there
pub fn push_unique(paths: &mut Vec<PathBuf>, path: &Path) {
    if !paths.iter().any(|p| p == path) {
        paths.push(path.to_path_buf());
    }
}

/// Detect the current platform tag (e.g. "x86_64-linux", "arm64-darwin")
///
/// Cached: the tag is computed on first call and reused afterwards.
#[must_use]
pub fn detect_current_platform() -> String {
    CURRENT_PLATFORM.clone()
}

fn detect_platform_impl() -> String {
    let arch = match env::consts::ARCH {
        "aarch64" => "arm64",
        other => other,
    };

    let os = match env::consts::OS {
        "macos" => "darwin",
        "windows" => "win32",
        other => other,
    };

    format!("{arch}-{os}")
}
