//! Extension descriptor types
//!
//! A `BuildDescriptor` is the compiler-ready description of one extension
//! module. It is what the packaging step receives, whichever build mode
//! produced it. Field names follow distutils' `Extension` keyword arguments so
//! the manifest can be fed to it verbatim.

use super::error::ExtensionError;
use crate::platform::{PlatformFacts, push_unique};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

/// Source language of a generated module
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Language {
    #[default]
    #[serde(rename = "c")]
    C,
    #[serde(rename = "c++", alias = "cpp", alias = "cxx")]
    Cpp,
}

impl Language {
    /// Parse a distutils language string (`c`, `c++`, `cpp`)
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_lowercase().as_str() {
            "c" => Some(Self::C),
            "c++" | "cpp" | "cxx" => Some(Self::Cpp),
            _ => None,
        }
    }

    /// Suffix of the generated source file
    #[must_use]
    pub const fn source_suffix(self) -> &'static str {
        match self {
            Self::C => "c",
            Self::Cpp => "cpp",
        }
    }
}

/// A preprocessor definition (`-DNAME` or `-DNAME=VALUE`)
///
/// Serialised as a `[name, value]` pair, `value` being `null` for a bare
/// definition. Numeric values in metadata are accepted and kept as text.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(
    from = "(String, Option<serde_json::Value>)",
    into = "(String, Option<String>)"
)]
pub struct DefinedMacro {
    pub name: String,
    pub value: Option<String>,
}

impl DefinedMacro {
    #[must_use]
    pub fn new(name: &str, value: Option<&str>) -> Self {
        Self {
            name: name.to_string(),
            value: value.map(str::to_string),
        }
    }
}

impl From<(String, Option<serde_json::Value>)> for DefinedMacro {
    fn from((name, value): (String, Option<serde_json::Value>)) -> Self {
        let value = value.and_then(|v| match v {
            serde_json::Value::Null => None,
            serde_json::Value::String(s) => Some(s),
            other => Some(other.to_string()),
        });
        Self { name, value }
    }
}

impl From<DefinedMacro> for (String, Option<String>) {
    fn from(m: DefinedMacro) -> Self {
        (m.name, m.value)
    }
}

/// Compiler-ready description of one extension module
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildDescriptor {
    /// Dotted module name, unique within one build
    #[serde(rename = "name")]
    pub module_name: String,
    pub sources: Vec<PathBuf>,
    #[serde(default)]
    pub include_dirs: Vec<PathBuf>,
    #[serde(default)]
    pub library_dirs: Vec<PathBuf>,
    #[serde(default)]
    pub libraries: Vec<String>,
    #[serde(default)]
    pub extra_compile_args: Vec<String>,
    #[serde(default)]
    pub extra_link_args: Vec<String>,
    #[serde(default)]
    pub define_macros: Vec<DefinedMacro>,
    #[serde(default)]
    pub depends: Vec<PathBuf>,
    #[serde(default)]
    pub language: Language,
    /// Other `Extension` keywords recorded in metadata (`extra_objects`,
    /// `runtime_library_dirs`, ...)
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

impl BuildDescriptor {
    /// Empty descriptor for `module_name`
    #[must_use]
    pub fn new(module_name: &str, language: Language) -> Self {
        Self {
            module_name: module_name.to_string(),
            sources: Vec::new(),
            include_dirs: Vec::new(),
            library_dirs: Vec::new(),
            libraries: Vec::new(),
            extra_compile_args: Vec::new(),
            extra_link_args: Vec::new(),
            define_macros: Vec::new(),
            depends: Vec::new(),
            language,
            extra: BTreeMap::new(),
        }
    }

    /// Merge the platform's include/library facts into this descriptor.
    ///
    /// Existing entries keep their position; new ones are appended once.
    pub fn apply_platform(&mut self, facts: &PlatformFacts) {
        for dir in &facts.include_dirs {
            push_unique(&mut self.include_dirs, dir);
        }
        for dir in &facts.library_dirs {
            push_unique(&mut self.library_dirs, dir);
        }
        if !self.libraries.contains(&facts.library_name) {
            self.libraries.push(facts.library_name.clone());
        }
        for arg in facts.extra_compile_args() {
            if !self.extra_compile_args.contains(&arg) {
                self.extra_compile_args.push(arg);
            }
        }
    }

    /// Directory of the first source file, where the module's generated
    /// artifacts live
    #[must_use]
    pub fn source_dir(&self) -> Option<&Path> {
        self.sources.first().and_then(|source| source.parent())
    }
}

/// Whether `segment` can name a Python package or module
#[must_use]
pub fn is_identifier(segment: &str) -> bool {
    let mut chars = segment.chars();
    chars
        .next()
        .is_some_and(|first| first == '_' || first.is_alphabetic())
        && chars.all(|c| c == '_' || c.is_alphanumeric())
}

/// Whether every dotted segment of `name` is an identifier
#[must_use]
pub fn is_module_name(name: &str) -> bool {
    name.split('.').all(is_identifier)
}

/// Tracks module names claimed so far in one build
///
/// Threaded through discovery as an explicit accumulator; a second claim on a
/// name is an error, never a merge.
#[derive(Debug, Clone, Default)]
pub struct NameRegistry {
    seen: HashMap<String, PathBuf>,
}

impl NameRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim `name` for the module generated from `origin`.
    ///
    /// # Errors
    ///
    /// Returns [`ExtensionError::InvalidModuleName`] if a segment is not an
    /// identifier, or [`ExtensionError::DuplicateName`] naming both origins if
    /// the name was already claimed.
    pub fn register(&mut self, name: &str, origin: &Path) -> Result<(), ExtensionError> {
        if !is_module_name(name) {
            return Err(ExtensionError::InvalidModuleName {
                name: name.to_string(),
                origin: origin.to_path_buf(),
            });
        }
        if let Some(first) = self.seen.get(name) {
            return Err(ExtensionError::DuplicateName {
                name: name.to_string(),
                first: first.clone(),
                second: origin.to_path_buf(),
            });
        }
        self.seen.insert(name.to_string(), origin.to_path_buf());
        Ok(())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.seen.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }
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
    use crate::platform::{OsKind, PlatformFactsBuilder};

    #[test]
    fn language_names() {
        assert_eq!(Language::from_name("c"), Some(Language::C));
        assert_eq!(Language::from_name("C++"), Some(Language::Cpp));
        assert_eq!(Language::from_name("cpp"), Some(Language::Cpp));
        assert_eq!(Language::from_name("rust"), None);
        assert_eq!(Language::Cpp.source_suffix(), "cpp");
    }

    #[test]
    fn macros_accept_numbers_and_null() {
        let macros: Vec<DefinedMacro> =
            serde_json::from_str(r#"[["CYTHON_TRACE", 1], ["NDEBUG", null], ["MODE", "fast"]]"#)
                .unwrap();

        assert_eq!(
            macros,
            vec![
                DefinedMacro::new("CYTHON_TRACE", Some("1")),
                DefinedMacro::new("NDEBUG", None),
                DefinedMacro::new("MODE", Some("fast")),
            ]
        );
        assert_eq!(
            serde_json::to_string(&macros[0]).unwrap(),
            r#"["CYTHON_TRACE","1"]"#
        );
    }

    #[test]
    fn descriptor_uses_distutils_field_names() {
        let descriptor = BuildDescriptor::new("cyndilib.finder", Language::Cpp);
        let json = serde_json::to_value(&descriptor).unwrap();

        assert_eq!(json["name"], "cyndilib.finder");
        assert_eq!(json["language"], "c++");
        assert!(json.get("module_name").is_none());
    }

    #[test]
    fn apply_platform_merges_without_duplicates() {
        let facts = PlatformFactsBuilder::new(OsKind::Other)
            .with_include_dir("/py")
            .with_include_dir("/numpy")
            .finish();
        let mut descriptor = BuildDescriptor::new("pkg.a", Language::C);
        descriptor.include_dirs.push(PathBuf::from("/numpy"));

        descriptor.apply_platform(&facts);
        descriptor.apply_platform(&facts);

        assert_eq!(
            descriptor.include_dirs,
            vec![PathBuf::from("/numpy"), PathBuf::from("/py")]
        );
        assert_eq!(descriptor.libraries, vec!["ndi"]);
        assert_eq!(descriptor.extra_compile_args, vec!["-fpermissive"]);
    }

    #[test]
    fn registry_rejects_second_claim() {
        let mut registry = NameRegistry::new();
        registry.register("pkg.a", Path::new("a.c")).unwrap();
        registry.register("pkg.b", Path::new("b.c")).unwrap();

        let err = registry.register("pkg.a", Path::new("other/a.c")).unwrap_err();
        match err {
            ExtensionError::DuplicateName {
                name,
                first,
                second,
            } => {
                assert_eq!(name, "pkg.a");
                assert_eq!(first, PathBuf::from("a.c"));
                assert_eq!(second, PathBuf::from("other/a.c"));
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn identifiers() {
        assert!(is_module_name("cyndilib.wrapper.ndi_recv"));
        assert!(is_module_name("_private.mod2"));
        assert!(!is_module_name("pkg..x"));
        assert!(!is_module_name("pkg.2fast"));
        assert!(!is_module_name("my-mod"));
        assert!(!is_module_name(""));
    }

    #[test]
    fn registry_rejects_path_like_names() {
        let mut registry = NameRegistry::new();
        for name in ["pkg./tmp/escape", "pkg.sub\\x", "../pkg"] {
            let err = registry.register(name, Path::new("x.c")).unwrap_err();
            assert!(
                matches!(err, ExtensionError::InvalidModuleName { name: ref n, .. } if n == name),
                "{name}"
            );
        }
        assert!(registry.is_empty());
    }

    #[test]
    fn unknown_distutils_keys_survive_serialization() {
        let json = r#"{
            "name": "pkg.x",
            "sources": ["x.c"],
            "extra_objects": ["libfoo.a"],
            "runtime_library_dirs": ["/opt/ndi/lib"]
        }"#;
        let descriptor: BuildDescriptor = serde_json::from_str(json).unwrap();

        assert_eq!(descriptor.extra["extra_objects"], serde_json::json!(["libfoo.a"]));
        let back = serde_json::to_value(&descriptor).unwrap();
        assert_eq!(back["runtime_library_dirs"], serde_json::json!(["/opt/ndi/lib"]));
        assert!(back.get("extra").is_none());
    }
}
