//! Project root discovery and resolved on-disk layout.

use crate::config::{CONFIG_FILE_NAME, Config};
use std::path::{Path, PathBuf};

/// Files that mark the root of a buildable project, in priority order
const ROOT_MARKERS: [&str; 3] = [CONFIG_FILE_NAME, "setup.py", "pyproject.toml"];

/// Find the project root by walking up from `start`.
/// Returns the first directory containing `cyndi-build.toml`, `setup.py` or
/// `pyproject.toml`, or `None` when no ancestor has one.
#[must_use]
pub fn find_project_root(start: &Path) -> Option<PathBuf> {
    start
        .ancestors()
        .find(|dir| ROOT_MARKERS.iter().any(|marker| dir.join(marker).is_file()))
        .map(Path::to_path_buf)
}

/// Absolute paths every pipeline stage works from
///
/// Built once from the project root and the configuration; relative config
/// paths are resolved against the project root, absolute ones kept as-is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectLayout {
    pub project_root: PathBuf,
    pub source_root: PathBuf,
    pub package_dir: PathBuf,
    pub pattern: String,
    pub manifest_path: PathBuf,
    pub macos_sdk_dir: PathBuf,
    pub windows_sdk_dir: PathBuf,
    pub bundled_include: PathBuf,
    pub index_root: PathBuf,
    pub index_filename: String,
}

impl ProjectLayout {
    /// Resolve the layout for `project_root` using `config`.
    ///
    /// `NDI_SDK_DIR` replaces both SDK locations when set.
    #[must_use]
    pub fn resolve(project_root: &Path, config: &Config) -> Self {
        let root = project_root.to_path_buf();
        let source_root = root.join(&config.project.source_dir);
        let sdk_override = crate::env_vars::ndi_sdk_dir();

        Self {
            package_dir: root.join(&config.project.package_dir),
            pattern: config.project.pattern.clone(),
            manifest_path: root.join(&config.project.manifest),
            macos_sdk_dir: sdk_override
                .clone()
                .unwrap_or_else(|| root.join(&config.sdk.macos_dir)),
            windows_sdk_dir: sdk_override.unwrap_or_else(|| root.join(&config.sdk.windows_dir)),
            bundled_include: root.join(&config.sdk.bundled_include),
            index_root: config
                .index
                .output_dir
                .as_ref()
                .map_or_else(|| source_root.clone(), |dir| root.join(dir)),
            index_filename: config.index.filename.clone(),
            source_root,
            project_root: root,
        }
    }

    /// Glob for the aggregate target, relative to the project root
    /// (e.g. `src/**/*.pyx`)
    #[must_use]
    pub fn aggregate_glob(&self) -> String {
        let relative = self
            .source_root
            .strip_prefix(&self.project_root)
            .unwrap_or(&self.source_root);
        let prefix = relative.to_string_lossy().replace('\\', "/");
        if prefix.is_empty() {
            self.pattern.clone()
        } else {
            format!("{prefix}/{}", self.pattern)
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, reason = "Tests can panic")]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn finds_root_from_nested_directory() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("setup.py"), "").unwrap();
        let nested = temp.path().join("src").join("cyndilib");
        fs::create_dir_all(&nested).unwrap();

        assert_eq!(find_project_root(&nested), Some(temp.path().to_path_buf()));
    }

    #[test]
    fn prefers_nearest_marker() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("pyproject.toml"), "").unwrap();
        let inner = temp.path().join("inner");
        fs::create_dir_all(&inner).unwrap();
        fs::write(inner.join(CONFIG_FILE_NAME), "").unwrap();

        assert_eq!(find_project_root(&inner), Some(inner.clone()));
    }

    #[test]
    fn resolves_relative_paths_against_root() {
        let root = Path::new("/work/cyndilib");
        let layout = ProjectLayout::resolve(root, &Config::default());

        assert_eq!(layout.source_root, root.join("src"));
        assert_eq!(layout.package_dir, root.join("src").join("cyndilib"));
        assert_eq!(layout.index_root, layout.source_root);
        assert_eq!(layout.aggregate_glob(), "src/**/*.pyx");
    }

    #[test]
    fn absolute_config_paths_are_kept() {
        let mut config = Config::default();
        config.sdk.macos_dir = PathBuf::from("/Library/NDI SDK for Apple");
        let layout = ProjectLayout::resolve(Path::new("/work/p"), &config);

        if crate::env_vars::ndi_sdk_dir().is_none() {
            assert_eq!(
                layout.macos_sdk_dir,
                PathBuf::from("/Library/NDI SDK for Apple")
            );
        }
    }
}
