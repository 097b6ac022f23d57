//! Fallback build: reassemble descriptors from generated sources
//!
//! When no transpiler is available the project can still be built from the
//! `.c`/`.cpp` files a previous transpile left next to each interface file.
//! Their embedded metadata carries everything the compiler needs.

use super::error::ExtensionError;
use super::metadata;
use super::types::{BuildDescriptor, Language, NameRegistry};
use glob::{MatchOptions, Pattern};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// `*` must not cross directory boundaries
const MATCH_OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: true,
    require_literal_separator: true,
    require_literal_leading_dot: false,
};

/// Generated source suffixes, in lookup order
const GENERATED_PRIORITY: [Language; 2] = [Language::C, Language::Cpp];

/// Compile `pattern`, reporting a bad glob as [`ExtensionError::InvalidPattern`]
pub(crate) fn compile_pattern(pattern: &str) -> Result<Pattern, ExtensionError> {
    Pattern::new(pattern).map_err(|e| ExtensionError::InvalidPattern {
        pattern: pattern.to_string(),
        message: e.to_string(),
    })
}

/// Find interface files under `root` whose root-relative path matches
/// `pattern` (e.g. `**/*.pyx`).
///
/// Results are in a stable order: directories are walked with entries sorted
/// by file name.
///
/// # Errors
///
/// Returns an error if the pattern is invalid or a directory cannot be read.
pub fn discover_interfaces(root: &Path, pattern: &str) -> Result<Vec<PathBuf>, ExtensionError> {
    let pattern = compile_pattern(pattern)?;
    let mut found = Vec::new();

    for entry in WalkDir::new(root)
        .follow_links(false)
        .sort_by_file_name()
    {
        let entry = entry.map_err(|e| {
            let path = e.path().map_or_else(|| root.to_path_buf(), Path::to_path_buf);
            ExtensionError::io(path, e.into())
        })?;
        if !entry.file_type().is_file() {
            continue;
        }

        let Ok(relative) = entry.path().strip_prefix(root) else {
            continue;
        };
        let relative = relative.to_string_lossy().replace('\\', "/");
        if pattern.matches_with(&relative, MATCH_OPTIONS) {
            found.push(entry.into_path());
        }
    }

    crate::debug!(
        "discovered {} interface file(s) under {}",
        found.len(),
        root.display()
    );
    Ok(found)
}

/// Generated source for `interface`: same stem, `.c` first, then `.cpp`
#[must_use]
pub fn find_generated_source(interface: &Path) -> Option<PathBuf> {
    GENERATED_PRIORITY
        .iter()
        .map(|language| interface.with_extension(language.source_suffix()))
        .find(|candidate| candidate.is_file())
}

/// Build one descriptor per interface file from the metadata of its
/// generated source.
///
/// All or nothing: the first problem aborts the whole assembly.
///
/// # Errors
///
/// - [`ExtensionError::MissingGeneratedSource`] if an interface file has no
///   `.c`/`.cpp` next to it
/// - [`ExtensionError::MissingMetadata`] if the generated source carries no
///   metadata block
/// - [`ExtensionError::DuplicateName`] if two sources declare the same module
/// - any discovery or parse error
pub fn assemble(root: &Path, pattern: &str) -> Result<Vec<BuildDescriptor>, ExtensionError> {
    let mut registry = NameRegistry::new();
    let mut descriptors = Vec::new();

    for interface in discover_interfaces(root, pattern)? {
        let generated = find_generated_source(&interface).ok_or_else(|| {
            ExtensionError::MissingGeneratedSource {
                interface: interface.clone(),
            }
        })?;

        let metadata = metadata::extract(&generated)?.ok_or_else(|| {
            ExtensionError::MissingMetadata {
                generated: generated.clone(),
            }
        })?;

        registry.register(&metadata.module_name, &generated)?;
        crate::debug!(
            "assembled {} from {}",
            metadata.module_name,
            generated.display()
        );
        descriptors.push(metadata.into_descriptor(&generated));
    }

    Ok(descriptors)
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::indexing_slicing,
    clippy::panic,
    reason = "Tests can panic"
)]
mod tests {
    use super::*;
    use crate::test_utils::fixtures::generated_source;
    use std::fs;
    use tempfile::TempDir;

    fn touch(path: &Path, contents: &str) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, contents).unwrap();
    }

    #[test]
    fn discovery_is_recursive_and_sorted() {
        let temp = TempDir::new().unwrap();
        let root = temp.path();
        touch(&root.join("pkg/b.pyx"), "");
        touch(&root.join("pkg/a.pyx"), "");
        touch(&root.join("pkg/sub/c.pyx"), "");
        touch(&root.join("top.pyx"), "");
        touch(&root.join("pkg/a.pxd"), "");

        let found = discover_interfaces(root, "**/*.pyx").unwrap();
        let relative: Vec<_> = found
            .iter()
            .map(|p| p.strip_prefix(root).unwrap().to_path_buf())
            .collect();

        assert_eq!(
            relative,
            vec![
                PathBuf::from("pkg/a.pyx"),
                PathBuf::from("pkg/b.pyx"),
                PathBuf::from("pkg/sub/c.pyx"),
                PathBuf::from("top.pyx"),
            ]
        );
    }

    #[test]
    fn single_star_stays_in_directory() {
        let temp = TempDir::new().unwrap();
        touch(&temp.path().join("pkg/a.pyx"), "");
        touch(&temp.path().join("pkg/deep/b.pyx"), "");

        let found = discover_interfaces(temp.path(), "pkg/*.pyx").unwrap();
        assert_eq!(found, vec![temp.path().join("pkg/a.pyx")]);
    }

    #[test]
    fn invalid_pattern_is_rejected() {
        let temp = TempDir::new().unwrap();
        assert!(matches!(
            discover_interfaces(temp.path(), "***/[.pyx"),
            Err(ExtensionError::InvalidPattern { .. })
        ));
    }

    #[test]
    fn c_source_wins_over_cpp() {
        let temp = TempDir::new().unwrap();
        let interface = temp.path().join("x.pyx");
        touch(&interface, "");
        touch(&temp.path().join("x.cpp"), "");
        assert_eq!(
            find_generated_source(&interface),
            Some(temp.path().join("x.cpp"))
        );

        touch(&temp.path().join("x.c"), "");
        assert_eq!(
            find_generated_source(&interface),
            Some(temp.path().join("x.c"))
        );
    }

    #[test]
    fn missing_generated_source_names_interface() {
        let temp = TempDir::new().unwrap();
        touch(&temp.path().join("pkg/foo.pyx"), "");

        match assemble(temp.path(), "**/*.pyx").unwrap_err() {
            ExtensionError::MissingGeneratedSource { interface } => {
                assert_eq!(interface, temp.path().join("pkg/foo.pyx"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn missing_metadata_names_generated_source() {
        let temp = TempDir::new().unwrap();
        touch(&temp.path().join("foo.pyx"), "");
        touch(&temp.path().join("foo.c"), "int main(void) { return 0; }\n");

        match assemble(temp.path(), "**/*.pyx").unwrap_err() {
            ExtensionError::MissingMetadata { generated } => {
                assert_eq!(generated, temp.path().join("foo.c"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn duplicate_module_names_fail() {
        let temp = TempDir::new().unwrap();
        for dir in ["one", "two"] {
            touch(&temp.path().join(dir).join("x.pyx"), "");
            touch(
                &temp.path().join(dir).join("x.c"),
                &generated_source("pkg.x", &[]),
            );
        }

        match assemble(temp.path(), "**/*.pyx").unwrap_err() {
            ExtensionError::DuplicateName {
                name,
                first,
                second,
            } => {
                assert_eq!(name, "pkg.x");
                assert_eq!(first, temp.path().join("one/x.c"));
                assert_eq!(second, temp.path().join("two/x.c"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn assembles_one_descriptor_per_interface() {
        let temp = TempDir::new().unwrap();
        touch(&temp.path().join("pkg/x.pyx"), "");
        touch(
            &temp.path().join("pkg/x.c"),
            &generated_source("pkg.x", &["pkg/x.pyx"]),
        );
        touch(&temp.path().join("pkg/y.pyx"), "");
        touch(
            &temp.path().join("pkg/y.cpp"),
            &generated_source("pkg.y", &[]),
        );

        let descriptors = assemble(temp.path(), "**/*.pyx").unwrap();

        assert_eq!(descriptors.len(), 2);
        assert_eq!(descriptors[0].module_name, "pkg.x");
        assert_eq!(descriptors[0].sources, vec![PathBuf::from("pkg/x.pyx")]);
        assert_eq!(descriptors[1].module_name, "pkg.y");
        assert_eq!(descriptors[1].sources, vec![temp.path().join("pkg/y.cpp")]);
    }

    #[test]
    fn empty_tree_assembles_nothing() {
        let temp = TempDir::new().unwrap();
        assert!(assemble(temp.path(), "**/*.pyx").unwrap().is_empty());
    }
}
