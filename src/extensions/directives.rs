//! Per-module build options declared in interface files
//!
//! Interface files may open with `# distutils: key = value` comment lines
//! (language, extra sources, libraries, ...). The transpiler honours them
//! when it expands the aggregate target, so the direct build does too. The
//! dotted module name is derived from the package structure around the file.

use super::types::{DefinedMacro, Language};
use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

static DIRECTIVE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^#\s*distutils\s*:\s*([A-Za-z_][A-Za-z0-9_]*)\s*=\s*(.*?)\s*$")
        .expect("should build valid regex")
});

/// Files marking a directory as a package
const PACKAGE_MARKERS: [&str; 3] = ["__init__.py", "__init__.pxd", "__init__.pyx"];

/// Options collected from an interface file's header comments
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModuleDirectives {
    pub language: Option<Language>,
    pub sources: Vec<PathBuf>,
    pub include_dirs: Vec<PathBuf>,
    pub library_dirs: Vec<PathBuf>,
    pub libraries: Vec<String>,
    pub extra_compile_args: Vec<String>,
    pub extra_link_args: Vec<String>,
    pub define_macros: Vec<DefinedMacro>,
    pub depends: Vec<PathBuf>,
}

impl ModuleDirectives {
    /// Parse the leading comment block of an interface file.
    ///
    /// Scanning stops at the first line that is neither blank nor a comment.
    /// Unknown keys are ignored; repeated keys accumulate.
    #[must_use]
    pub fn parse(text: &str) -> Self {
        let mut directives = Self::default();

        for line in text.lines() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            if !line.starts_with('#') {
                break;
            }
            let Some(caps) = DIRECTIVE_RE.captures(line) else {
                continue;
            };
            let (Some(key), Some(value)) = (caps.get(1), caps.get(2)) else {
                continue;
            };
            directives.apply(key.as_str(), value.as_str());
        }

        directives
    }

    fn apply(&mut self, key: &str, value: &str) {
        match key {
            "language" => match Language::from_name(value) {
                Some(language) => self.language = Some(language),
                None => crate::warn!("ignoring unknown distutils language {value:?}"),
            },
            "sources" => self.sources.extend(split_list(value).map(PathBuf::from)),
            "include_dirs" => self.include_dirs.extend(split_list(value).map(PathBuf::from)),
            "library_dirs" => self.library_dirs.extend(split_list(value).map(PathBuf::from)),
            "libraries" => self.libraries.extend(split_list(value).map(str::to_string)),
            "extra_compile_args" => self
                .extra_compile_args
                .extend(split_list(value).map(str::to_string)),
            "extra_link_args" => self
                .extra_link_args
                .extend(split_list(value).map(str::to_string)),
            "define_macros" => self.define_macros.extend(split_list(value).map(|item| {
                match item.split_once('=') {
                    Some((name, value)) => DefinedMacro::new(name, Some(value)),
                    None => DefinedMacro::new(item, None),
                }
            })),
            "depends" => self.depends.extend(split_list(value).map(PathBuf::from)),
            other => crate::debug!("ignoring distutils directive {other}"),
        }
    }
}

/// distutils list values are separated by whitespace or commas
fn split_list(value: &str) -> impl Iterator<Item = &str> {
    value
        .split(|c: char| c.is_whitespace() || c == ',')
        .filter(|item| !item.is_empty())
}

/// Dotted module name of `interface`.
///
/// Walks up from the file's directory while each directory is a package
/// (contains `__init__.py`, `__init__.pxd` or `__init__.pyx`), never leaving
/// `source_root`. `src/cyndilib/wrapper/ndi_structs.pyx` becomes
/// `cyndilib.wrapper.ndi_structs` when `cyndilib` and `wrapper` are packages.
#[must_use]
pub fn module_name_for(interface: &Path, source_root: &Path) -> String {
    let stem = interface
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();

    let mut segments = vec![stem];
    let mut dir = interface.parent();

    while let Some(current) = dir {
        if current == source_root || !is_package(current) {
            break;
        }
        let Some(name) = current.file_name() else {
            break;
        };
        segments.push(name.to_string_lossy().into_owned());
        dir = current.parent();
    }

    segments.reverse();
    segments.join(".")
}

fn is_package(dir: &Path) -> bool {
    PACKAGE_MARKERS.iter().any(|marker| dir.join(marker).is_file())
}

#[cfg(test)]
#[allow(clippy::unwrap_used, reason = "Tests can panic")]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn parses_header_directives() {
        let text = "\
# cython: language_level=3
# distutils: language = c++
# distutils: sources = extra.c, helper.c
# distutils: define_macros = NPY_NO_DEPRECATED_API=NPY_1_7_API_VERSION FAST
# distutils: libraries = m

cimport cython
# distutils: libraries = ignored
";
        let directives = ModuleDirectives::parse(text);

        assert_eq!(directives.language, Some(Language::Cpp));
        assert_eq!(
            directives.sources,
            vec![PathBuf::from("extra.c"), PathBuf::from("helper.c")]
        );
        assert_eq!(directives.libraries, vec!["m"]);
        assert_eq!(
            directives.define_macros,
            vec![
                DefinedMacro::new("NPY_NO_DEPRECATED_API", Some("NPY_1_7_API_VERSION")),
                DefinedMacro::new("FAST", None),
            ]
        );
    }

    #[test]
    fn no_header_means_defaults() {
        assert_eq!(
            ModuleDirectives::parse("from libc.stdint cimport *\n"),
            ModuleDirectives::default()
        );
    }

    #[test]
    fn module_name_follows_packages() {
        let temp = TempDir::new().unwrap();
        let src = temp.path().join("src");
        let wrapper = src.join("cyndilib").join("wrapper");
        fs::create_dir_all(&wrapper).unwrap();
        fs::write(src.join("cyndilib").join("__init__.py"), "").unwrap();
        fs::write(wrapper.join("__init__.pxd"), "").unwrap();

        assert_eq!(
            module_name_for(&wrapper.join("ndi_structs.pyx"), &src),
            "cyndilib.wrapper.ndi_structs"
        );
        assert_eq!(
            module_name_for(&src.join("cyndilib").join("finder.pyx"), &src),
            "cyndilib.finder"
        );
    }

    #[test]
    fn module_name_stops_at_non_package() {
        let temp = TempDir::new().unwrap();
        let scripts = temp.path().join("src").join("scripts");
        fs::create_dir_all(&scripts).unwrap();

        assert_eq!(
            module_name_for(&scripts.join("tool.pyx"), &temp.path().join("src")),
            "tool"
        );
    }

    #[test]
    fn module_name_never_leaves_source_root() {
        let temp = TempDir::new().unwrap();
        let src = temp.path().join("src");
        fs::create_dir_all(&src).unwrap();
        fs::write(src.join("__init__.py"), "").unwrap();

        assert_eq!(module_name_for(&src.join("top.pyx"), &src), "top");
    }
}
