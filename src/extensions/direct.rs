//! Direct build: transpile every interface file now
//!
//! The build declares a single aggregate target covering all interface files
//! (`src/**/*.pyx`) and carrying the platform facts. Expanding it runs the
//! transpiler once per discovered module and yields one descriptor each.

use super::assembler::discover_interfaces;
use super::directives::{ModuleDirectives, module_name_for};
use super::error::ExtensionError;
use super::metadata::{ExtensionMetadata, write_sidecar};
use super::toolchain::{CompilerDirectives, TranspileRequest, Transpiler};
use super::types::{BuildDescriptor, DefinedMacro, NameRegistry};
use crate::platform::{PlatformFacts, push_unique};
use indicatif::ProgressBar;
use std::fs;
use std::path::{Path, PathBuf};

/// Name of the aggregate target; expansion replaces it with real module names
pub const AGGREGATE_NAME: &str = "*";

/// Whether generated modules are built with profiling and line tracing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Instrumentation {
    #[default]
    Off,
    /// `profile` + `linetrace` directives and the matching trace macros
    Profile,
}

impl Instrumentation {
    #[must_use]
    pub const fn from_flag(enabled: bool) -> Self {
        if enabled { Self::Profile } else { Self::Off }
    }

    #[must_use]
    pub const fn directives(self) -> CompilerDirectives {
        let traced = matches!(self, Self::Profile);
        CompilerDirectives {
            embedsignature: true,
            profile: traced,
            linetrace: traced,
        }
    }

    /// Macros that switch the generated code's trace hooks on
    #[must_use]
    pub fn define_macros(self) -> Vec<DefinedMacro> {
        match self {
            Self::Off => Vec::new(),
            Self::Profile => vec![
                DefinedMacro::new("CYTHON_TRACE", Some("1")),
                DefinedMacro::new("CYTHON_TRACE_NOGIL", Some("1")),
            ],
        }
    }
}

/// The single wildcard target handed to the transpiler
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AggregateTarget {
    /// Always [`AGGREGATE_NAME`]
    pub name: String,
    /// Glob of interface files, relative to the project root
    pub source_glob: String,
    pub include_dirs: Vec<PathBuf>,
    pub library_dirs: Vec<PathBuf>,
    pub libraries: Vec<String>,
    pub extra_compile_args: Vec<String>,
    pub define_macros: Vec<DefinedMacro>,
    pub directives: CompilerDirectives,
    pub instrumentation: Instrumentation,
    /// Ask the transpiler for annotated HTML next to each source
    pub annotate: bool,
}

impl AggregateTarget {
    /// Declare the aggregate target over `source_glob` (e.g. `src/**/*.pyx`)
    #[must_use]
    pub fn declare(
        facts: &PlatformFacts,
        source_glob: &str,
        instrumentation: Instrumentation,
    ) -> Self {
        Self {
            name: AGGREGATE_NAME.to_string(),
            source_glob: source_glob.to_string(),
            include_dirs: facts.include_dirs.clone(),
            library_dirs: facts.library_dirs.clone(),
            libraries: vec![facts.library_name.clone()],
            extra_compile_args: facts.extra_compile_args(),
            define_macros: instrumentation.define_macros(),
            directives: instrumentation.directives(),
            instrumentation,
            annotate: true,
        }
    }

    #[must_use]
    pub const fn with_annotation(mut self, annotate: bool) -> Self {
        self.annotate = annotate;
        self
    }

    /// Descriptor for one module: target facts first, then the module's own
    /// header directives
    fn descriptor_for(
        &self,
        module_name: &str,
        generated: &Path,
        interface_dir: &Path,
        directives: ModuleDirectives,
    ) -> BuildDescriptor {
        let resolve = |path: PathBuf| {
            if path.is_absolute() {
                path
            } else {
                interface_dir.join(path)
            }
        };

        let mut descriptor =
            BuildDescriptor::new(module_name, directives.language.unwrap_or_default());
        descriptor.sources.push(generated.to_path_buf());
        descriptor
            .sources
            .extend(directives.sources.into_iter().map(resolve));

        descriptor.include_dirs.clone_from(&self.include_dirs);
        for dir in directives.include_dirs.into_iter().map(resolve) {
            push_unique(&mut descriptor.include_dirs, &dir);
        }
        descriptor.library_dirs.clone_from(&self.library_dirs);
        for dir in directives.library_dirs.into_iter().map(resolve) {
            push_unique(&mut descriptor.library_dirs, &dir);
        }

        descriptor.libraries.clone_from(&self.libraries);
        for library in directives.libraries {
            if !descriptor.libraries.contains(&library) {
                descriptor.libraries.push(library);
            }
        }

        descriptor.extra_compile_args.clone_from(&self.extra_compile_args);
        descriptor
            .extra_compile_args
            .extend(directives.extra_compile_args);
        descriptor.extra_link_args = directives.extra_link_args;
        descriptor.define_macros.clone_from(&self.define_macros);
        descriptor.define_macros.extend(directives.define_macros);
        descriptor.depends = directives
            .depends
            .into_iter()
            .map(resolve)
            .collect();

        descriptor
    }
}

/// Expand the aggregate target into one descriptor per interface file.
///
/// Interface files matching `pattern` are found under `source_root`, the
/// same walk an assembled build does. Module names are derived from the
/// package structure below `source_root`.
/// Every generated source gets a metadata sidecar so a later build without
/// the transpiler can reassemble it.
///
/// # Errors
///
/// Returns the first discovery, transpile, or duplicate-name error; no
/// descriptors are returned in that case.
pub fn expand(
    target: &AggregateTarget,
    source_root: &Path,
    pattern: &str,
    transpiler: &dyn Transpiler,
    progress: &ProgressBar,
) -> Result<Vec<BuildDescriptor>, ExtensionError> {
    let interfaces = discover_interfaces(source_root, pattern)?;
    progress.set_length(interfaces.len() as u64);

    let mut registry = NameRegistry::new();
    let mut descriptors = Vec::with_capacity(interfaces.len());

    for interface in interfaces {
        let text =
            fs::read_to_string(&interface).map_err(|e| ExtensionError::io(&interface, e))?;
        let directives = ModuleDirectives::parse(&text);
        let language = directives.language.unwrap_or_default();
        let module_name = module_name_for(&interface, source_root);
        let output = interface.with_extension(language.source_suffix());

        registry.register(&module_name, &output)?;
        progress.set_message(module_name.clone());

        let request = TranspileRequest {
            interface: interface.clone(),
            output,
            language,
            directives: target.directives,
            include_dirs: target.include_dirs.clone(),
            annotate: target.annotate,
        };
        let transpiled = transpiler.transpile(&request)?;
        crate::debug!(
            "{} -> {} ({})",
            interface.display(),
            transpiled.generated.display(),
            module_name
        );

        let interface_dir = interface.parent().unwrap_or(source_root);
        let descriptor =
            target.descriptor_for(&module_name, &transpiled.generated, interface_dir, directives);
        write_sidecar(
            &transpiled.generated,
            &ExtensionMetadata::from_descriptor(&descriptor),
        )?;

        descriptors.push(descriptor);
        progress.inc(1);
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
    use crate::extensions::metadata;
    use crate::extensions::types::Language;
    use crate::platform::{OsKind, PlatformFactsBuilder};
    use crate::test_utils::fixtures::CopyingTranspiler;
    use tempfile::TempDir;

    fn facts() -> PlatformFacts {
        PlatformFactsBuilder::new(OsKind::Windows)
            .with_include_dir("/py/include")
            .with_library_dir("/sdk/Lib/x64")
            .finish()
    }

    fn write(path: &Path, contents: &str) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, contents).unwrap();
    }

    #[test]
    fn plain_target_has_no_trace_macros() {
        let target = AggregateTarget::declare(&facts(), "src/**/*.pyx", Instrumentation::Off);

        assert_eq!(target.name, "*");
        assert_eq!(target.libraries, vec!["Processing.NDI.Lib.x64"]);
        assert_eq!(target.extra_compile_args, vec!["/Zc:strictStrings"]);
        assert!(target.define_macros.is_empty());
        assert_eq!(target.directives.to_arg(), "embedsignature=True");
    }

    #[test]
    fn profile_target_traces() {
        let target = AggregateTarget::declare(&facts(), "src/**/*.pyx", Instrumentation::Profile);

        assert_eq!(
            target.define_macros,
            vec![
                DefinedMacro::new("CYTHON_TRACE", Some("1")),
                DefinedMacro::new("CYTHON_TRACE_NOGIL", Some("1")),
            ]
        );
        assert!(target.directives.profile);
        assert!(target.directives.linetrace);
        assert!(target.directives.embedsignature);
    }

    #[test]
    fn expands_one_descriptor_per_interface() {
        let temp = TempDir::new().unwrap();
        let root = temp.path();
        write(&root.join("src/pkg/__init__.py"), "");
        write(&root.join("src/pkg/a.pyx"), "def f(): pass\n");
        write(
            &root.join("src/pkg/b.pyx"),
            "# distutils: language = c++\n# distutils: libraries = m\n",
        );

        let target = AggregateTarget::declare(&facts(), "src/**/*.pyx", Instrumentation::Off);
        let transpiler = CopyingTranspiler::default();
        let descriptors = expand(
            &target,
            &root.join("src"),
            "**/*.pyx",
            &transpiler,
            &ProgressBar::hidden(),
        )
        .unwrap();

        assert_eq!(descriptors.len(), 2);
        assert_eq!(descriptors[0].module_name, "pkg.a");
        assert_eq!(descriptors[0].language, Language::C);
        assert_eq!(descriptors[0].sources, vec![root.join("src/pkg/a.c")]);
        assert_eq!(descriptors[1].module_name, "pkg.b");
        assert_eq!(descriptors[1].language, Language::Cpp);
        assert_eq!(descriptors[1].libraries, vec!["Processing.NDI.Lib.x64", "m"]);
        for descriptor in &descriptors {
            assert_eq!(descriptor.include_dirs, vec![PathBuf::from("/py/include")]);
            assert_eq!(descriptor.library_dirs, vec![PathBuf::from("/sdk/Lib/x64")]);
        }
        assert_eq!(transpiler.calls(), 2);
    }

    #[test]
    fn writes_sidecars_for_fallback_builds() {
        let temp = TempDir::new().unwrap();
        let root = temp.path();
        write(&root.join("src/pkg/__init__.py"), "");
        write(&root.join("src/pkg/a.pyx"), "");

        let target = AggregateTarget::declare(&facts(), "src/**/*.pyx", Instrumentation::Off);
        let descriptors = expand(
            &target,
            &root.join("src"),
            "**/*.pyx",
            &CopyingTranspiler::default(),
            &ProgressBar::hidden(),
        )
        .unwrap();

        let recovered = metadata::extract(&root.join("src/pkg/a.c")).unwrap().unwrap();
        assert_eq!(
            recovered.into_descriptor(&root.join("src/pkg/a.c")),
            descriptors[0]
        );
    }

    #[test]
    fn only_the_source_root_is_walked() {
        let temp = TempDir::new().unwrap();
        let root = temp.path();
        write(&root.join("src/pkg/a.pyx"), "");
        write(&root.join("build/stale/b.pyx"), "");
        write(&root.join("docs/c.pyx"), "");

        let target = AggregateTarget::declare(&facts(), "src/**/*.pyx", Instrumentation::Off);
        let transpiler = CopyingTranspiler::default();
        let descriptors = expand(
            &target,
            &root.join("src"),
            "**/*.pyx",
            &transpiler,
            &ProgressBar::hidden(),
        )
        .unwrap();

        assert_eq!(descriptors.len(), 1);
        assert_eq!(descriptors[0].module_name, "a");
        assert_eq!(transpiler.calls(), 1);
        assert!(!root.join("build/stale/b.c").exists());
        assert!(!root.join("docs/c.c").exists());
    }

    #[test]
    fn duplicate_names_stop_expansion() {
        let temp = TempDir::new().unwrap();
        let root = temp.path();
        write(&root.join("src/one/x.pyx"), "");
        write(&root.join("src/two/x.pyx"), "");

        let target = AggregateTarget::declare(&facts(), "src/**/*.pyx", Instrumentation::Off);
        let err = expand(
            &target,
            &root.join("src"),
            "**/*.pyx",
            &CopyingTranspiler::default(),
            &ProgressBar::hidden(),
        )
        .unwrap_err();

        assert!(matches!(err, ExtensionError::DuplicateName { ref name, .. } if name == "x"));
    }

    #[test]
    fn relative_directive_paths_follow_interface() {
        let temp = TempDir::new().unwrap();
        let root = temp.path();
        write(
            &root.join("src/pkg/a.pyx"),
            "# distutils: sources = helper.c\n# distutils: include_dirs = include\n",
        );

        let target = AggregateTarget::declare(&facts(), "src/**/*.pyx", Instrumentation::Off);
        let descriptors = expand(
            &target,
            &root.join("src"),
            "**/*.pyx",
            &CopyingTranspiler::default(),
            &ProgressBar::hidden(),
        )
        .unwrap();

        assert_eq!(
            descriptors[0].sources,
            vec![root.join("src/pkg/a.c"), root.join("src/pkg/helper.c")]
        );
        assert_eq!(
            descriptors[0].include_dirs,
            vec![PathBuf::from("/py/include"), root.join("src/pkg/include")]
        );
    }
}
