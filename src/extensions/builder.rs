//! Build mode selection
//!
//! Picks how descriptors are produced for this run and delegates to the
//! matching path (similar to how `setup.py` chooses between `cythonize` and
//! prebuilt sources):
//! - **direct**: the transpiler is available, so every interface file is
//!   transpiled now
//! - **assembled**: no transpiler, so descriptors are rebuilt from the
//!   metadata in previously generated sources
//!
//! Both paths yield the same `Vec<BuildDescriptor>`.

use super::assembler::assemble;
use super::direct::{AggregateTarget, Instrumentation, expand};
use super::error::ExtensionError;
use super::toolchain::Transpiler;
use super::types::BuildDescriptor;
use crate::paths::ProjectLayout;
use crate::platform::PlatformFacts;
use clap::ValueEnum;
use indicatif::ProgressBar;
use std::fmt;
use thiserror::Error;

/// Problems choosing a build mode
#[derive(Debug, Error)]
pub enum BuildModeError {
    #[error("Unknown build mode '{value}' (expected auto, direct or assembled)")]
    UnknownMode { value: String },

    #[error("Direct build requested but no Cython transpiler was found (set CYTHON or install cython)")]
    TranspilerUnavailable,
}

/// Mode asked for on the command line, in the environment or in config
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum ModeRequest {
    /// Direct when a transpiler is found, assembled otherwise
    #[default]
    Auto,
    /// Always transpile
    Direct,
    /// Never transpile; use existing generated sources
    Assembled,
}

impl ModeRequest {
    /// Parse a mode name (`auto`, `direct`, `assembled`; case-insensitive)
    ///
    /// # Errors
    ///
    /// Returns [`BuildModeError::UnknownMode`] for anything else.
    pub fn parse(value: &str) -> Result<Self, BuildModeError> {
        match value.trim().to_lowercase().as_str() {
            "auto" => Ok(Self::Auto),
            "direct" => Ok(Self::Direct),
            "assembled" | "fallback" => Ok(Self::Assembled),
            _ => Err(BuildModeError::UnknownMode {
                value: value.to_string(),
            }),
        }
    }
}

/// Options shared by both build paths
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BuildOptions {
    pub instrumentation: Instrumentation,
    pub annotate: bool,
}

impl Default for BuildOptions {
    fn default() -> Self {
        Self {
            instrumentation: Instrumentation::Off,
            annotate: true,
        }
    }
}

/// How this run produces its descriptors
#[derive(Debug)]
pub enum BuildMode {
    Direct(Box<dyn Transpiler>),
    Assembled,
}

impl BuildMode {
    /// Resolve `request` into a concrete mode.
    ///
    /// `detect` is only called when the request allows transpiling.
    ///
    /// # Errors
    ///
    /// Returns [`BuildModeError::TranspilerUnavailable`] when direct mode is
    /// forced but `detect` finds nothing.
    pub fn select<F>(request: ModeRequest, detect: F) -> Result<Self, BuildModeError>
    where
        F: FnOnce() -> Option<Box<dyn Transpiler>>,
    {
        match request {
            ModeRequest::Assembled => Ok(Self::Assembled),
            ModeRequest::Direct => detect()
                .map(Self::Direct)
                .ok_or(BuildModeError::TranspilerUnavailable),
            ModeRequest::Auto => Ok(detect().map_or_else(
                || {
                    crate::debug!("no transpiler found, assembling from generated sources");
                    Self::Assembled
                },
                Self::Direct,
            )),
        }
    }

    /// Short mode name recorded in the manifest
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Direct(_) => "direct",
            Self::Assembled => "assembled",
        }
    }

    /// Human-readable description for progress output
    #[must_use]
    pub fn description(&self) -> String {
        match self {
            Self::Direct(transpiler) => format!("direct build with {}", transpiler.name()),
            Self::Assembled => "assembled from generated sources".to_string(),
        }
    }

    /// Produce the descriptor list for the project.
    ///
    /// Every descriptor carries the platform facts: the direct path builds
    /// them in through the aggregate target, the assembled path merges them
    /// into the recorded metadata.
    ///
    /// # Errors
    ///
    /// Returns the first error of the chosen path; nothing is returned
    /// partially.
    pub fn descriptors(
        &self,
        layout: &ProjectLayout,
        facts: &PlatformFacts,
        options: BuildOptions,
        progress: &ProgressBar,
    ) -> Result<Vec<BuildDescriptor>, ExtensionError> {
        match self {
            Self::Direct(transpiler) => {
                let target = AggregateTarget::declare(
                    facts,
                    &layout.aggregate_glob(),
                    options.instrumentation,
                )
                .with_annotation(options.annotate);
                crate::debug!(
                    "aggregate target {} over {} ({:?})",
                    target.name,
                    target.source_glob,
                    target.instrumentation
                );
                expand(
                    &target,
                    &layout.source_root,
                    &layout.pattern,
                    transpiler.as_ref(),
                    progress,
                )
            }
            Self::Assembled => {
                if options.instrumentation == Instrumentation::Profile {
                    crate::warn!(
                        "instrumentation needs a transpile; assembled sources keep the options they were generated with"
                    );
                }
                let mut descriptors = assemble(&layout.source_root, &layout.pattern)?;
                for descriptor in &mut descriptors {
                    descriptor.apply_platform(facts);
                }
                Ok(descriptors)
            }
        }
    }
}

impl fmt::Display for BuildMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::indexing_slicing,
    reason = "Tests can panic"
)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::platform::{OsKind, PlatformFactsBuilder};
    use crate::test_utils::assertions::assert_error_contains;
    use crate::test_utils::fixtures::{CopyingTranspiler, generated_source, write_file};
    use std::path::PathBuf;
    use tempfile::TempDir;

    fn facts() -> PlatformFacts {
        PlatformFactsBuilder::new(OsKind::Other)
            .with_include_dir("/py/include")
            .finish()
    }

    fn fake() -> Option<Box<dyn Transpiler>> {
        Some(Box::new(CopyingTranspiler::default()))
    }

    #[test]
    fn parses_mode_names() {
        assert_eq!(ModeRequest::parse("auto").unwrap(), ModeRequest::Auto);
        assert_eq!(ModeRequest::parse("Direct").unwrap(), ModeRequest::Direct);
        assert_eq!(
            ModeRequest::parse("assembled").unwrap(),
            ModeRequest::Assembled
        );
        let err = ModeRequest::parse("turbo").unwrap_err();
        assert_error_contains(&err.to_string(), "turbo");
    }

    #[test]
    fn auto_prefers_transpiler() {
        let mode = BuildMode::select(ModeRequest::Auto, fake).unwrap();
        assert_eq!(mode.as_str(), "direct");

        let mode = BuildMode::select(ModeRequest::Auto, || None).unwrap();
        assert_eq!(mode.as_str(), "assembled");
    }

    #[test]
    fn forced_direct_needs_transpiler() {
        assert!(matches!(
            BuildMode::select(ModeRequest::Direct, || None),
            Err(BuildModeError::TranspilerUnavailable)
        ));
    }

    #[test]
    fn assembled_never_detects() {
        let mode = BuildMode::select(ModeRequest::Assembled, || {
            unreachable!("detection must not run for assembled builds")
        })
        .unwrap();
        assert_eq!(mode.to_string(), "assembled");
    }

    #[test]
    fn assembled_descriptors_get_platform_facts() {
        let temp = TempDir::new().unwrap();
        write_file(temp.path(), "src/pkg/x.pyx", "");
        write_file(
            temp.path(),
            "src/pkg/x.c",
            &generated_source("pkg.x", &["src/pkg/x.pyx"]),
        );
        let layout = ProjectLayout::resolve(temp.path(), &Config::default());

        let descriptors = BuildMode::Assembled
            .descriptors(
                &layout,
                &facts(),
                BuildOptions::default(),
                &ProgressBar::hidden(),
            )
            .unwrap();

        assert_eq!(descriptors.len(), 1);
        assert_eq!(descriptors[0].module_name, "pkg.x");
        assert_eq!(descriptors[0].include_dirs, vec![PathBuf::from("/py/include")]);
        assert_eq!(descriptors[0].libraries, vec!["ndi"]);
    }

    #[test]
    fn direct_descriptors_cover_every_interface() {
        let temp = TempDir::new().unwrap();
        write_file(temp.path(), "src/pkg/__init__.py", "");
        write_file(temp.path(), "src/pkg/a.pyx", "");
        write_file(temp.path(), "src/pkg/b.pyx", "");
        write_file(temp.path(), "src/pkg/sub/__init__.py", "");
        write_file(temp.path(), "src/pkg/sub/c.pyx", "");
        let layout = ProjectLayout::resolve(temp.path(), &Config::default());

        let mode = BuildMode::select(ModeRequest::Direct, fake).unwrap();
        let descriptors = mode
            .descriptors(
                &layout,
                &facts(),
                BuildOptions::default(),
                &ProgressBar::hidden(),
            )
            .unwrap();

        let names: Vec<_> = descriptors.iter().map(|d| d.module_name.as_str()).collect();
        assert_eq!(names, vec!["pkg.a", "pkg.b", "pkg.sub.c"]);
        assert!(
            descriptors
                .iter()
                .all(|d| d.include_dirs == vec![PathBuf::from("/py/include")])
        );
    }
}
