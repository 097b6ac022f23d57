mod common;

use common::helpers::{RecordingTranspiler, create_project, write_file};
use cyndi_build::extensions::{AggregateTarget, DefinedMacro, Instrumentation, assemble, expand};
use cyndi_build::platform::{OsKind, PlatformFactsBuilder};
use cyndi_build::sdk::{FixedHost, OtherProvisioner};
use cyndi_build::{
    BuildMode, BuildOptions, BuildRequest, Config, Manifest, ProjectLayout, run_build,
};
use indicatif::ProgressBar;
use tempfile::TempDir;

fn project_with_modules(root: &std::path::Path, names: &[&str]) {
    create_project(root);
    write_file(root, "src/pkg/__init__.py", "");
    for name in names {
        write_file(root, &format!("src/pkg/{name}.pyx"), "def f(): pass\n");
    }
}

#[test]
fn direct_build_describes_every_interface() {
    let temp = TempDir::new().unwrap();
    let root = temp.path();
    project_with_modules(root, &["a", "b", "c"]);
    let layout = ProjectLayout::resolve(root, &Config::default());
    let host = FixedHost {
        python_include: Some(root.join("include")),
        numpy_include: None,
    };
    let request = BuildRequest {
        options: BuildOptions::default(),
        manifest_path: layout.manifest_path.clone(),
        render_index: true,
    };

    let outcome = run_build(
        &layout,
        &OtherProvisioner,
        &host,
        &BuildMode::Direct(Box::new(RecordingTranspiler::default())),
        &request,
        &ProgressBar::hidden(),
    )
    .unwrap();

    let names: Vec<_> = outcome
        .extensions()
        .iter()
        .map(|d| d.module_name.as_str())
        .collect();
    assert_eq!(names, vec!["pkg.a", "pkg.b", "pkg.c"]);
    for descriptor in outcome.extensions() {
        assert_eq!(descriptor.include_dirs, vec![root.join("include")]);
        assert_eq!(descriptor.libraries, vec!["ndi"]);
        assert_eq!(descriptor.extra_compile_args, vec!["-fpermissive"]);
    }

    let manifest = Manifest::load(&layout.manifest_path).unwrap();
    assert_eq!(manifest.mode, "direct");
    assert_eq!(manifest.extensions.len(), 3);

    // Annotations written by the transpiler are linked from the module pages
    let page = std::fs::read_to_string(root.join("src/pkg/a/index.html")).unwrap();
    assert!(page.contains("a.html"));
}

#[test]
fn profile_build_requests_tracing() {
    let temp = TempDir::new().unwrap();
    let root = temp.path();
    project_with_modules(root, &["a"]);
    let facts = PlatformFactsBuilder::new(OsKind::Other)
        .with_include_dir(root.join("include"))
        .finish();
    let target = AggregateTarget::declare(&facts, "src/**/*.pyx", Instrumentation::Profile)
        .with_annotation(false);
    let transpiler = RecordingTranspiler::default();

    let descriptors = expand(
        &target,
        &root.join("src"),
        "**/*.pyx",
        &transpiler,
        &ProgressBar::hidden(),
    )
    .unwrap();

    let requests = transpiler.requests();
    assert_eq!(requests.len(), 1);
    let request = requests.first().unwrap();
    assert_eq!(request.interface, root.join("src/pkg/a.pyx"));
    assert_eq!(request.output, root.join("src/pkg/a.c"));
    assert!(!request.annotate);
    assert_eq!(
        request.directives.to_arg(),
        "embedsignature=True,profile=True,linetrace=True"
    );

    let descriptor = descriptors.first().unwrap();
    assert_eq!(
        descriptor.define_macros,
        vec![
            DefinedMacro::new("CYTHON_TRACE", Some("1")),
            DefinedMacro::new("CYTHON_TRACE_NOGIL", Some("1")),
        ]
    );
    assert!(!root.join("src/pkg/a.html").exists());
}

#[test]
fn sidecars_let_assembled_builds_reproduce_descriptors() {
    let temp = TempDir::new().unwrap();
    let root = temp.path();
    project_with_modules(root, &["a", "b"]);
    write_file(
        root,
        "src/pkg/b.pyx",
        "# distutils: language = c++\n# distutils: libraries = m\n",
    );
    let facts = PlatformFactsBuilder::new(OsKind::Other)
        .with_include_dir(root.join("include"))
        .finish();
    let target = AggregateTarget::declare(&facts, "src/**/*.pyx", Instrumentation::Off);

    let direct = expand(
        &target,
        &root.join("src"),
        "**/*.pyx",
        &RecordingTranspiler::default(),
        &ProgressBar::hidden(),
    )
    .unwrap();
    let assembled = assemble(&root.join("src"), "**/*.pyx").unwrap();

    assert_eq!(assembled, direct);
    assert_eq!(
        assembled.get(1).map(|d| d.sources.clone()),
        Some(vec![root.join("src/pkg/b.cpp")])
    );
}

#[test]
fn module_names_follow_packages() {
    let temp = TempDir::new().unwrap();
    let root = temp.path();
    create_project(root);
    write_file(root, "src/pkg/__init__.py", "");
    write_file(root, "src/pkg/sub/__init__.py", "");
    write_file(root, "src/pkg/sub/deep.pyx", "");
    write_file(root, "src/loose/mod.pyx", "");
    let facts = PlatformFactsBuilder::new(OsKind::Other).finish();
    let target = AggregateTarget::declare(&facts, "src/**/*.pyx", Instrumentation::Off);

    let descriptors = expand(
        &target,
        &root.join("src"),
        "**/*.pyx",
        &RecordingTranspiler::default(),
        &ProgressBar::hidden(),
    )
    .unwrap();

    let names: Vec<_> = descriptors.iter().map(|d| d.module_name.clone()).collect();
    assert_eq!(names, vec!["mod".to_string(), "pkg.sub.deep".to_string()]);
    assert_eq!(
        descriptors.first().map(|d| d.sources.clone()),
        Some(vec![root.join("src/loose/mod.c")])
    );
}
