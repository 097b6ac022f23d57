//! Index command
//!
//! Re-renders the module index from a manifest written by an earlier build.

use super::GlobalOptions;
use anyhow::{Result, bail};
use cyndi_build::Manifest;
use cyndi_build::pipeline::render_index;
use std::path::Path;

/// Render the module index for the extensions listed in a manifest
pub(crate) fn run(globals: &GlobalOptions, manifest: Option<&Path>) -> Result<()> {
    let project = globals.load_project()?;
    let manifest_path = manifest.unwrap_or(&project.layout.manifest_path);
    let manifest = Manifest::load(manifest_path)?;

    if manifest.extensions.is_empty() {
        println!("No extensions in {}", manifest_path.display());
        return Ok(());
    }

    let report = render_index(&project.layout, &manifest.extensions);
    for path in &report.written {
        println!("{}", path.display());
    }

    if !report.is_success() {
        for failure in &report.failures {
            eprintln!("error: {failure}");
        }
        bail!("{} index page(s) could not be written", report.failures.len());
    }

    Ok(())
}
