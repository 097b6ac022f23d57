//! Build command
//!
//! Runs the whole pipeline: SDK provisioning, descriptor generation (direct
//! or assembled), manifest write and module index.

use super::GlobalOptions;
use anyhow::{Result, bail};
use cyndi_build::extensions::Transpiler;
use cyndi_build::{
    BuildMode, BuildOptions, BuildRequest, CythonToolchain, Instrumentation, ModeRequest, OsKind,
    provisioner_for, run_build,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;

/// Options of `cyndi-build build`
#[derive(Debug, Clone)]
pub(crate) struct BuildArgs {
    pub(crate) mode: Option<ModeRequest>,
    pub(crate) use_profile: bool,
    pub(crate) manifest: Option<PathBuf>,
    pub(crate) no_index: bool,
    pub(crate) quiet: bool,
}

/// Mode priority: `--mode` -> `CYNDI_BUILD_MODE` -> `build.mode` in config
fn requested_mode(flag: Option<ModeRequest>, configured: &str) -> Result<ModeRequest> {
    if let Some(mode) = flag {
        return Ok(mode);
    }
    if let Some(mode) = cyndi_build::env_vars::build_mode() {
        return Ok(ModeRequest::parse(&mode)?);
    }
    Ok(ModeRequest::parse(configured)?)
}

fn detect_transpiler() -> Option<Box<dyn Transpiler>> {
    let toolchain = CythonToolchain::detect()?;
    Some(Box::new(toolchain))
}

fn progress_bar(quiet: bool) -> Result<ProgressBar> {
    if quiet {
        return Ok(ProgressBar::hidden());
    }
    let pb = ProgressBar::new(0);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")?
            .progress_chars("#>-"),
    );
    Ok(pb)
}

/// Build the project's extensions
pub(crate) fn run(globals: &GlobalOptions, args: &BuildArgs) -> Result<()> {
    let project = globals.load_project()?;
    let layout = &project.layout;

    let request = requested_mode(args.mode, &project.config.build.mode)?;
    let instrumentation =
        Instrumentation::from_flag(args.use_profile || cyndi_build::env_vars::use_profile());

    let host = project.host()?;

    let os_kind = OsKind::current();
    let provisioner = provisioner_for(os_kind, layout);
    cyndi_build::debug!("target platform family: {}", os_kind.as_str());

    let mode = BuildMode::select(request, detect_transpiler)?;

    if !args.quiet {
        println!("Building extensions ({})", mode.description());
        if instrumentation == Instrumentation::Profile {
            println!("Instrumentation: profile + linetrace");
        }
    }

    let build_request = BuildRequest {
        options: BuildOptions {
            instrumentation,
            annotate: project.config.build.annotate,
        },
        manifest_path: args
            .manifest
            .clone()
            .unwrap_or_else(|| layout.manifest_path.clone()),
        render_index: project.config.index.enabled && !args.no_index,
    };

    let progress = progress_bar(args.quiet)?;
    let outcome = run_build(
        layout,
        provisioner.as_ref(),
        host.as_ref(),
        &mode,
        &build_request,
        &progress,
    )?;

    if !args.quiet {
        for path in &outcome.copy.copied {
            println!("  copied {}", path.display());
        }
        if !outcome.copy.skipped.is_empty() {
            println!(
                "  {} runtime file(s) already present",
                outcome.copy.skipped.len()
            );
        }
        println!(
            "{} extension(s) -> {}",
            outcome.extensions().len(),
            outcome.manifest_path.display()
        );
    }

    if let Some(report) = &outcome.index {
        if !args.quiet {
            for path in &report.written {
                println!("  {}", path.display());
            }
        }
        if !report.is_success() {
            for failure in &report.failures {
                eprintln!("error: {failure}");
            }
            bail!(
                "{} index page(s) could not be written (manifest was written to {})",
                report.failures.len(),
                outcome.manifest_path.display()
            );
        }
    }

    Ok(())
}
