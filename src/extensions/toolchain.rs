//! Transpiler toolchain
//!
//! The direct build hands every interface file to a transpiler that writes
//! the generated C/C++ source (and an annotated HTML view of it). The
//! transpiler is a black box behind [`Transpiler`]; [`CythonToolchain`] runs
//! the `cython` executable.

use super::error::ExtensionError;
use super::types::Language;
use regex::Regex;
use semver::Version;
use std::fmt;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::LazyLock;

static VERSION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d+)\.(\d+)(?:\.(\d+))?").expect("should build valid regex"));

/// Oldest transpiler known to embed distutils metadata
pub const MIN_CYTHON_VERSION: Version = Version::new(0, 29, 0);

/// Compiler directives passed to the transpiler
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompilerDirectives {
    /// Embed call signatures in docstrings
    pub embedsignature: bool,
    /// Profiling hooks
    pub profile: bool,
    /// Line tracing (coverage, line profilers)
    pub linetrace: bool,
}

impl Default for CompilerDirectives {
    fn default() -> Self {
        Self {
            embedsignature: true,
            profile: false,
            linetrace: false,
        }
    }
}

impl CompilerDirectives {
    /// `-X` argument value, e.g. `embedsignature=True,profile=True`
    #[must_use]
    pub fn to_arg(self) -> String {
        let mut parts = Vec::new();
        if self.embedsignature {
            parts.push("embedsignature=True");
        }
        if self.profile {
            parts.push("profile=True");
        }
        if self.linetrace {
            parts.push("linetrace=True");
        }
        parts.join(",")
    }
}

/// One interface file to transpile
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranspileRequest {
    pub interface: PathBuf,
    pub output: PathBuf,
    pub language: Language,
    pub directives: CompilerDirectives,
    pub include_dirs: Vec<PathBuf>,
    pub annotate: bool,
}

/// Files a transpile run produced
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranspileOutput {
    pub generated: PathBuf,
    /// Annotated HTML, for humans only
    pub annotation: Option<PathBuf>,
}

/// An interface-definition to C/C++ transpiler
pub trait Transpiler: fmt::Debug {
    /// Short name for logs and the manifest
    fn name(&self) -> String;

    /// Transpile one interface file.
    ///
    /// # Errors
    ///
    /// Returns [`ExtensionError::Transpile`] if the transpiler fails or does
    /// not produce the requested output.
    fn transpile(&self, request: &TranspileRequest) -> Result<TranspileOutput, ExtensionError>;
}

/// The `cython` command-line transpiler
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CythonToolchain {
    executable: PathBuf,
    version: Option<Version>,
}

impl CythonToolchain {
    /// Use an explicit executable, querying its version
    #[must_use]
    pub fn new(executable: impl Into<PathBuf>) -> Self {
        let executable = executable.into();
        let version = query_version(&executable);
        Self {
            executable,
            version,
        }
    }

    /// Find the transpiler.
    /// Priority order:
    /// 1. `CYTHON` environment variable
    /// 2. `cython` in PATH
    /// 3. `cython3` in PATH
    #[must_use]
    pub fn detect() -> Option<Self> {
        let executable = crate::env_vars::cython()
            .filter(|path| path.exists())
            .or_else(|| crate::sdk::host::find_on_path("cython"))
            .or_else(|| crate::sdk::host::find_on_path("cython3"))?;

        let toolchain = Self::new(executable);
        match &toolchain.version {
            Some(version) if *version < MIN_CYTHON_VERSION => crate::warn!(
                "cython {version} is older than {MIN_CYTHON_VERSION}; generated sources may lack metadata"
            ),
            Some(version) => crate::debug!("found cython {version}"),
            None => crate::debug!("could not determine cython version"),
        }
        Some(toolchain)
    }

    #[must_use]
    pub fn executable(&self) -> &Path {
        &self.executable
    }

    #[must_use]
    pub const fn version(&self) -> Option<&Version> {
        self.version.as_ref()
    }

    fn command(&self, request: &TranspileRequest) -> Command {
        let mut cmd = Command::new(&self.executable);
        cmd.arg("-3").arg("--fast-fail");

        let directives = request.directives.to_arg();
        if !directives.is_empty() {
            cmd.arg("-X").arg(directives);
        }
        if request.language == Language::Cpp {
            cmd.arg("--cplus");
        }
        if request.annotate {
            cmd.arg("--annotate");
        }
        for dir in &request.include_dirs {
            cmd.arg("-I").arg(dir);
        }
        cmd.arg("-o").arg(&request.output).arg(&request.interface);
        cmd
    }
}

impl Transpiler for CythonToolchain {
    fn name(&self) -> String {
        self.version
            .as_ref()
            .map_or_else(|| "cython".to_string(), |v| format!("cython {v}"))
    }

    fn transpile(&self, request: &TranspileRequest) -> Result<TranspileOutput, ExtensionError> {
        let failure = |message: String| ExtensionError::Transpile {
            interface: request.interface.clone(),
            message,
        };

        crate::debug!(
            "Running: {} on {}",
            self.executable.display(),
            request.interface.display()
        );
        let output = self
            .command(request)
            .output()
            .map_err(|e| failure(format!("failed to run {}: {e}", self.executable.display())))?;

        if !output.status.success() {
            let mut message = format!(
                "cython failed with exit code: {}",
                output
                    .status
                    .code()
                    .map_or_else(|| "unknown".to_string(), |c| c.to_string())
            );
            let stderr = String::from_utf8_lossy(&output.stderr);
            if !stderr.trim().is_empty() {
                message.push('\n');
                message.push_str(stderr.trim_end());
            }
            return Err(failure(message));
        }

        if !request.output.is_file() {
            return Err(failure(format!(
                "expected output {} was not written",
                request.output.display()
            )));
        }

        let annotation = request.output.with_extension("html");
        Ok(TranspileOutput {
            generated: request.output.clone(),
            annotation: (request.annotate && annotation.is_file()).then_some(annotation),
        })
    }
}

fn query_version(executable: &Path) -> Option<Version> {
    let output = Command::new(executable).arg("--version").output().ok()?;
    // Older releases print the version on stderr
    let text = format!(
        "{}{}",
        String::from_utf8_lossy(&output.stdout),
        String::from_utf8_lossy(&output.stderr)
    );
    parse_version(&text)
}

/// Parse a version out of `cython --version` output (`Cython version 3.0.11`)
#[must_use]
pub fn parse_version(text: &str) -> Option<Version> {
    let caps = VERSION_RE.captures(text)?;
    let part = |i: usize| caps.get(i).and_then(|m| m.as_str().parse::<u64>().ok());
    Some(Version::new(part(1)?, part(2)?, part(3).unwrap_or(0)))
}
