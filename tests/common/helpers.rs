//! Shared test helpers and utilities

use cyndi_build::extensions::{ExtensionError, TranspileOutput, TranspileRequest, Transpiler};
use std::cell::RefCell;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

/// Get the path to the cyndi-build binary
///
/// This is shared across all integration tests to avoid duplication.
#[allow(dead_code)]
pub(crate) fn get_cyndi_build_binary() -> String {
    env!("CARGO_BIN_EXE_cyndi-build").to_string()
}

/// A command for the binary, run inside `project` with an environment that
/// does not leak the developer's settings
#[allow(dead_code)]
pub(crate) fn cyndi_build_command(project: &Path) -> Command {
    let mut cmd = Command::new(get_cyndi_build_binary());
    cmd.current_dir(project)
        .env("CYNDI_BUILD_TARGET_OS", "linux")
        .env("XDG_CONFIG_HOME", project.join(".config"))
        .env_remove("CYNDI_BUILD_MODE")
        .env_remove("CYNDI_BUILD_PROFILE")
        .env_remove("CYNDI_BUILD_CONFIG")
        .env_remove("CYNDI_BUILD_DEBUG")
        .env_remove("NDI_SDK_DIR")
        .env_remove("CYTHON");
    cmd
}

/// Create `root/relative` (and its parents) with `contents`
#[allow(dead_code)]
pub(crate) fn write_file(root: &Path, relative: &str, contents: &str) -> PathBuf {
    let path = root.join(relative);
    fs::create_dir_all(path.parent().expect("fixture path has a parent"))
        .expect("Failed to create fixture directory");
    fs::write(&path, contents).expect("Failed to write fixture file");
    path
}

/// Lay out a minimal project: config file pinning the Python headers to
/// `include/`, and an empty `src/`
#[allow(dead_code)]
pub(crate) fn create_project(root: &Path) {
    write_file(
        root,
        "cyndi-build.toml",
        "[sdk]\npython_include = \"include\"\n",
    );
    fs::create_dir_all(root.join("include")).expect("Failed to create include dir");
    fs::create_dir_all(root.join("src")).expect("Failed to create src dir");
}

/// An embedded metadata block for `module_name`
#[allow(dead_code)]
pub(crate) fn metadata_block(module_name: &str, sources: &[&str]) -> String {
    let json = serde_json::json!({
        "distutils": {
            "name": module_name,
            "sources": sources,
            "language": "c",
        },
        "module_name": module_name,
    });
    let body = serde_json::to_string_pretty(&json).expect("Failed to serialize metadata");
    format!("/* BEGIN: Cython Metadata\n{body}\nEND: Cython Metadata */\n")
}

/// A generated C source carrying a metadata block for `module_name`
#[allow(dead_code)]
pub(crate) fn generated_source(module_name: &str, sources: &[&str]) -> String {
    format!(
        "/* Generated by Cython 3.0.11 */\n\n{}#include \"Python.h\"\n",
        metadata_block(module_name, sources)
    )
}

/// Transpiler stand-in that writes a stub source and remembers every request
#[derive(Debug, Default)]
#[allow(dead_code)]
pub(crate) struct RecordingTranspiler {
    requests: RefCell<Vec<TranspileRequest>>,
}

#[allow(dead_code)]
impl RecordingTranspiler {
    pub(crate) fn requests(&self) -> Vec<TranspileRequest> {
        self.requests.borrow().clone()
    }
}

impl Transpiler for RecordingTranspiler {
    fn name(&self) -> String {
        "recording".to_string()
    }

    fn transpile(&self, request: &TranspileRequest) -> Result<TranspileOutput, ExtensionError> {
        self.requests.borrow_mut().push(request.clone());
        fs::write(&request.output, "/* stub */\nint x;\n").map_err(|source| {
            ExtensionError::Io {
                path: request.output.clone(),
                source,
            }
        })?;

        let annotation = request.output.with_extension("html");
        if request.annotate {
            fs::write(&annotation, "<html></html>\n").map_err(|source| ExtensionError::Io {
                path: annotation.clone(),
                source,
            })?;
        }
        Ok(TranspileOutput {
            generated: request.output.clone(),
            annotation: request.annotate.then_some(annotation),
        })
    }
}

/// Shell script standing in for `cython`: answers `--version` and writes a
/// stub source to the `-o` argument
#[cfg(unix)]
#[allow(dead_code)]
pub(crate) fn fake_cython(dir: &Path) -> PathBuf {
    use std::os::unix::fs::PermissionsExt;

    let script = r#"#!/bin/sh
if [ "$1" = "--version" ]; then
    echo "Cython version 3.0.11"
    exit 0
fi
out=""
prev=""
for arg in "$@"; do
    if [ "$prev" = "-o" ]; then
        out="$arg"
    fi
    prev="$arg"
done
printf '/* fake cython */\nint x;\n' > "$out"
"#;
    let path = write_file(dir, "bin/cython", script);
    fs::set_permissions(&path, fs::Permissions::from_mode(0o755))
        .expect("Failed to make fake cython executable");
    path
}
