//! Configuration file management
//!
//! Reads `cyndi-build.toml` from the project root or the user's config
//! directory. Every field has a default matching the cyndilib layout, so a
//! project without a config file builds as-is.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Name of the project-local configuration file
pub const CONFIG_FILE_NAME: &str = "cyndi-build.toml";

/// Application configuration loaded from TOML files
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq, Eq)]
#[serde(default)]
pub struct Config {
    pub project: ProjectConfig,
    pub build: BuildConfig,
    pub sdk: SdkConfig,
    pub index: IndexConfig,
}

/// Source layout and manifest location
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct ProjectConfig {
    /// Root of the importable packages (relative to the project root)
    pub source_dir: PathBuf,
    /// Package directory receiving runtime binaries
    pub package_dir: PathBuf,
    /// Glob selecting interface-definition files below `source_dir`
    pub pattern: String,
    /// Where the extension manifest is written
    pub manifest: PathBuf,
}

impl Default for ProjectConfig {
    fn default() -> Self {
        Self {
            source_dir: PathBuf::from("src"),
            package_dir: PathBuf::from("src").join("cyndilib"),
            pattern: "**/*.pyx".to_string(),
            manifest: PathBuf::from("build").join("extensions.json"),
        }
    }
}

/// Build mode defaults
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct BuildConfig {
    /// `auto`, `direct` or `assembled`
    pub mode: String,
    /// Emit annotated HTML next to each transpiled module
    pub annotate: bool,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            mode: "auto".to_string(),
            annotate: true,
        }
    }
}

/// Vendor SDK locations and host header overrides
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct SdkConfig {
    /// System-wide SDK install on macOS
    pub macos_dir: PathBuf,
    /// Project-local SDK distribution on Windows (relative to project root)
    pub windows_dir: PathBuf,
    /// Headers shipped with the project, used on Windows
    pub bundled_include: PathBuf,
    /// Skip the interpreter query and use this Python include directory
    pub python_include: Option<PathBuf>,
    /// Skip the interpreter query and use this numpy include directory
    pub numpy_include: Option<PathBuf>,
}

impl Default for SdkConfig {
    fn default() -> Self {
        Self {
            macos_dir: PathBuf::from("/Library/NDI SDK for Apple"),
            windows_dir: PathBuf::from("NDI SDK for Windows"),
            bundled_include: ["src", "cyndilib", "wrapper", "include"].iter().collect(),
            python_include: None,
            numpy_include: None,
        }
    }
}

/// Module index rendering
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct IndexConfig {
    pub enabled: bool,
    /// File name written for every node
    pub filename: String,
    /// Root of the rendered tree (defaults to the source dir)
    pub output_dir: Option<PathBuf>,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            filename: "index.html".to_string(),
            output_dir: None,
        }
    }
}

impl Config {
    /// Load configuration for the project at `project_root`.
    /// Priority: `<project_root>/cyndi-build.toml` -> user config -> defaults
    ///
    /// # Errors
    ///
    /// Returns an error if a config file exists but cannot be parsed.
    pub fn load(project_root: &Path) -> Result<Self> {
        Self::load_with_options(project_root, None, false)
    }

    /// Load configuration with custom options.
    ///
    /// # Arguments
    /// * `project_root` - Directory searched for `cyndi-build.toml`
    /// * `custom_path` - Optional explicit config file (overrides defaults)
    /// * `skip_rc` - If true, skip loading config files (return default config)
    ///
    /// # Errors
    ///
    /// Returns an error if config file reading or parsing fails. A missing
    /// explicit `custom_path` is an error; missing default files are not.
    pub fn load_with_options(
        project_root: &Path,
        custom_path: Option<&Path>,
        skip_rc: bool,
    ) -> Result<Self> {
        if skip_rc {
            return Ok(Self::default());
        }

        if let Some(path) = custom_path {
            return Self::load_from(path);
        }

        let local = project_root.join(CONFIG_FILE_NAME);
        if local.is_file() {
            return Self::load_from(&local);
        }

        if let Some(config_dir) = Self::user_config_dir() {
            let config_path = config_dir.join("config.toml");
            if config_path.is_file() {
                return Self::load_from(&config_path);
            }
        }

        Ok(Self::default())
    }

    /// Parse configuration from TOML text
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML is malformed or has wrongly typed keys.
    pub fn parse(contents: &str) -> Result<Self> {
        toml::from_str(contents).context("Failed to parse configuration")
    }

    fn load_from(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        Self::parse(&contents).with_context(|| format!("Invalid config file {}", path.display()))
    }

    fn user_config_dir() -> Option<PathBuf> {
        if let Some(xdg_config) = crate::env_vars::xdg_config_home() {
            return Some(xdg_config.join("cyndi-build"));
        }

        dirs::home_dir().map(|home| home.join(".config").join("cyndi-build"))
    }
}
