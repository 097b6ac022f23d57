//! Host toolchain queries
//!
//! The compiled extensions need the host Python development headers (fatal
//! when missing) and, optionally, the numpy headers. Both come from the
//! interpreter's own configuration unless the project config pins them.

use super::SdkError;
use std::fmt;
use std::path::{Path, PathBuf};
use std::process::Command;

const PYTHON_INCLUDE_QUERY: &str = "import sysconfig; print(sysconfig.get_paths()['include'])";
const NUMPY_INCLUDE_QUERY: &str = "import numpy; print(numpy.get_include())";

/// Source of host compiler headers
pub trait HostToolchain: fmt::Debug {
    /// Directory containing `Python.h`
    ///
    /// # Errors
    ///
    /// Returns [`SdkError::HostHeaders`] when the directory cannot be located.
    fn python_include(&self) -> Result<PathBuf, SdkError>;

    /// numpy's include directory, if numpy is importable
    fn numpy_include(&self) -> Option<PathBuf>;
}

/// Queries a Python interpreter for its header locations
#[derive(Debug, Clone)]
pub struct PythonHost {
    executable: PathBuf,
}

impl PythonHost {
    /// Use an explicit interpreter
    #[must_use]
    pub fn new(executable: impl Into<PathBuf>) -> Self {
        Self {
            executable: executable.into(),
        }
    }

    /// Find the interpreter: `PYTHON` env var, then `python3`, then `python`
    /// on PATH.
    #[must_use]
    pub fn detect() -> Option<Self> {
        if let Some(python) = crate::env_vars::python() {
            return Some(Self::new(python));
        }

        ["python3", "python"]
            .iter()
            .find_map(|name| find_on_path(name))
            .map(Self::new)
    }

    #[must_use]
    pub fn executable(&self) -> &Path {
        &self.executable
    }

    fn query(&self, script: &str) -> Result<String, String> {
        let output = Command::new(&self.executable)
            .args(["-c", script])
            .output()
            .map_err(|e| format!("failed to run {}: {e}", self.executable.display()))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(format!(
                "{} exited with {}: {}",
                self.executable.display(),
                output.status,
                stderr.trim()
            ));
        }

        let stdout = String::from_utf8_lossy(&output.stdout).trim().to_string();
        if stdout.is_empty() {
            return Err(format!("{} printed nothing", self.executable.display()));
        }
        Ok(stdout)
    }
}

impl HostToolchain for PythonHost {
    fn python_include(&self) -> Result<PathBuf, SdkError> {
        let dir = self
            .query(PYTHON_INCLUDE_QUERY)
            .map(PathBuf::from)
            .map_err(|reason| SdkError::HostHeaders { reason })?;
        require_dir(dir)
    }

    fn numpy_include(&self) -> Option<PathBuf> {
        match self.query(NUMPY_INCLUDE_QUERY) {
            Ok(dir) => Some(PathBuf::from(dir)),
            Err(reason) => {
                crate::debug!("numpy query failed: {reason}");
                None
            }
        }
    }
}

/// Header locations pinned by configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FixedHost {
    pub python_include: Option<PathBuf>,
    pub numpy_include: Option<PathBuf>,
}

impl HostToolchain for FixedHost {
    fn python_include(&self) -> Result<PathBuf, SdkError> {
        let dir = self.python_include.clone().ok_or_else(|| SdkError::HostHeaders {
            reason: "no Python include directory configured".to_string(),
        })?;
        require_dir(dir)
    }

    fn numpy_include(&self) -> Option<PathBuf> {
        self.numpy_include.clone().filter(|dir| dir.is_dir())
    }
}

/// Pick the host toolchain for a build: configured paths win, otherwise the
/// detected interpreter is queried.
///
/// # Errors
///
/// Returns [`SdkError::HostHeaders`] when nothing is configured and no
/// interpreter can be found.
pub fn host_toolchain(
    python_include: Option<&Path>,
    numpy_include: Option<&Path>,
) -> Result<Box<dyn HostToolchain>, SdkError> {
    if let Some(include) = python_include {
        return Ok(Box::new(FixedHost {
            python_include: Some(include.to_path_buf()),
            numpy_include: numpy_include.map(Path::to_path_buf),
        }));
    }

    let python = PythonHost::detect().ok_or_else(|| SdkError::HostHeaders {
        reason: "no Python interpreter found (set PYTHON or sdk.python_include)".to_string(),
    })?;
    crate::debug!("using interpreter {}", python.executable().display());

    match numpy_include {
        Some(numpy) => Ok(Box::new(PinnedNumpy {
            inner: python,
            numpy_include: numpy.to_path_buf(),
        })),
        None => Ok(Box::new(python)),
    }
}

/// Interpreter-derived Python headers with a configured numpy location
#[derive(Debug, Clone)]
struct PinnedNumpy {
    inner: PythonHost,
    numpy_include: PathBuf,
}

impl HostToolchain for PinnedNumpy {
    fn python_include(&self) -> Result<PathBuf, SdkError> {
        self.inner.python_include()
    }

    fn numpy_include(&self) -> Option<PathBuf> {
        Some(self.numpy_include.clone()).filter(|dir| dir.is_dir())
    }
}

fn require_dir(dir: PathBuf) -> Result<PathBuf, SdkError> {
    if dir.is_dir() {
        Ok(dir)
    } else {
        Err(SdkError::HostHeaders {
            reason: format!("{} is not a directory", dir.display()),
        })
    }
}

/// Locate an executable on PATH
///
/// Uses `where` on Windows and `which` elsewhere.
pub(crate) fn find_on_path(name: &str) -> Option<PathBuf> {
    let finder = if cfg!(windows) { "where" } else { "which" };
    let output = Command::new(finder).arg(name).output().ok()?;
    if !output.status.success() {
        return None;
    }

    let stdout = String::from_utf8_lossy(&output.stdout);
    let path = PathBuf::from(stdout.lines().next()?.trim());
    path.exists().then_some(path)
}
