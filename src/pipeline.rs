//! Build pipeline
//!
//! Provision → descriptors → manifest → index, strictly in that order. Any
//! failure before the manifest is written aborts the run with no manifest on
//! disk. Index pages are rendered after the manifest and their failures are
//! reported, not raised.

use crate::extensions::{BuildDescriptor, BuildMode, BuildOptions, ExtensionError};
use crate::index::{IndexRenderer, ModuleIndex, RenderReport};
use crate::manifest::{Manifest, ManifestError};
use crate::paths::ProjectLayout;
use crate::sdk::{CopyReport, HostToolchain, SdkError, SdkProvisioner, resolve_platform_facts};
use indicatif::ProgressBar;
use std::path::PathBuf;
use thiserror::Error;

/// Errors that abort a build
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Sdk(#[from] SdkError),

    #[error(transparent)]
    Extension(#[from] ExtensionError),

    #[error(transparent)]
    Manifest(#[from] ManifestError),
}

/// What to build and where the results go
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildRequest {
    pub options: BuildOptions,
    pub manifest_path: PathBuf,
    pub render_index: bool,
}

/// Everything one successful run produced
#[derive(Debug)]
pub struct BuildOutcome {
    pub manifest: Manifest,
    pub manifest_path: PathBuf,
    pub copy: CopyReport,
    /// `None` when index rendering was disabled
    pub index: Option<RenderReport>,
}

impl BuildOutcome {
    #[must_use]
    pub fn extensions(&self) -> &[BuildDescriptor] {
        &self.manifest.extensions
    }
}

/// Run the full build for `layout`.
///
/// # Errors
///
/// Returns the first provisioning, descriptor or manifest error. Index
/// failures end up in [`BuildOutcome::index`] instead.
pub fn run_build(
    layout: &ProjectLayout,
    provisioner: &dyn SdkProvisioner,
    host: &dyn HostToolchain,
    mode: &BuildMode,
    request: &BuildRequest,
    progress: &ProgressBar,
) -> Result<BuildOutcome, PipelineError> {
    let provisioned = resolve_platform_facts(provisioner, host)?;
    crate::debug!(
        "platform facts: {} include dir(s), {} library dir(s), library {}",
        provisioned.facts.include_dirs.len(),
        provisioned.facts.library_dirs.len(),
        provisioned.facts.library_name
    );

    let descriptors = mode.descriptors(layout, &provisioned.facts, request.options, progress)?;
    progress.finish_and_clear();

    let manifest = Manifest::new(mode.as_str(), descriptors);
    manifest.write(&request.manifest_path)?;

    let index = request
        .render_index
        .then(|| render_index(layout, &manifest.extensions));

    Ok(BuildOutcome {
        manifest,
        manifest_path: request.manifest_path.clone(),
        copy: provisioned.copy,
        index,
    })
}

/// Render the module index for `descriptors` under the layout's index root
#[must_use]
pub fn render_index(layout: &ProjectLayout, descriptors: &[BuildDescriptor]) -> RenderReport {
    let index =
        ModuleIndex::from_descriptors(&layout.index_root, &layout.project_root, descriptors);
    IndexRenderer::new(&layout.index_filename).render(&index)
}
