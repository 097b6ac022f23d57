//! Subcommand implementations

pub(crate) mod build;
pub(crate) mod completion;
pub(crate) mod index;
pub(crate) mod metadata;
pub(crate) mod provision;

use anyhow::{Context, Result};
use cyndi_build::sdk::{HostToolchain, host_toolchain};
use cyndi_build::{Config, ProjectLayout, find_project_root};
use std::env;
use std::path::PathBuf;

/// Flags accepted by every subcommand
#[derive(Debug, Clone)]
pub(crate) struct GlobalOptions {
    pub(crate) project_dir: Option<PathBuf>,
    pub(crate) config: Option<PathBuf>,
    pub(crate) norc: bool,
}

/// Configuration and resolved layout of the project being built
#[derive(Debug)]
pub(crate) struct Project {
    pub(crate) config: Config,
    pub(crate) layout: ProjectLayout,
}

impl GlobalOptions {
    /// Locate the project and load its configuration.
    /// Priority for the config file: `--config` -> `CYNDI_BUILD_CONFIG` ->
    /// `cyndi-build.toml` -> user config.
    pub(crate) fn load_project(&self) -> Result<Project> {
        let root = match &self.project_dir {
            Some(dir) => dir.clone(),
            None => {
                let cwd = env::current_dir().context("Failed to read current directory")?;
                find_project_root(&cwd).with_context(|| {
                    format!(
                        "Could not find a project root in {} or any parent (looked for cyndi-build.toml, setup.py, pyproject.toml)",
                        cwd.display()
                    )
                })?
            }
        };
        cyndi_build::debug!("project root: {}", root.display());

        let custom = self.config.clone().or_else(cyndi_build::env_vars::config_path);
        let config = Config::load_with_options(&root, custom.as_deref(), self.norc)?;
        let layout = ProjectLayout::resolve(&root, &config);

        Ok(Project { config, layout })
    }
}

impl Project {
    /// Host header source: configured include dirs, else the interpreter
    pub(crate) fn host(&self) -> Result<Box<dyn HostToolchain>> {
        let root = &self.layout.project_root;
        let python_include = self.config.sdk.python_include.as_ref().map(|p| root.join(p));
        let numpy_include = self.config.sdk.numpy_include.as_ref().map(|p| root.join(p));
        Ok(host_toolchain(
            python_include.as_deref(),
            numpy_include.as_deref(),
        )?)
    }
}
