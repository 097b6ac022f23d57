//! Build metadata of generated sources
//!
//! The transpiler embeds the options it used as a JSON comment block near the
//! top of each generated source:
//!
//! ```text
//! /* BEGIN: Cython Metadata
//! {
//!     "distutils": {
//!         "depends": ["..."],
//!         "include_dirs": ["..."],
//!         "language": "c",
//!         "name": "cyndilib.finder",
//!         "sources": ["src/cyndilib/finder.pyx"]
//!     },
//!     "module_name": "cyndilib.finder"
//! }
//! END: Cython Metadata */
//! ```
//!
//! That block is enough to rebuild the extension without the transpiler
//! installed. A versioned sidecar (`<source>.meta.json`) with the same
//! payload takes precedence over the embedded block, as long as the checksum
//! it records still matches the generated source. A source regenerated by
//! another tool invalidates its sidecar.
//!
//! Absent metadata is `Ok(None)`; only a block that exists but does not parse
//! is an error.

use super::error::ExtensionError;
use super::types::{BuildDescriptor, DefinedMacro, Language};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{BufRead, BufReader, Read};
use std::path::{Path, PathBuf};

/// Marker on the line opening the embedded block
pub const METADATA_BEGIN: &str = "BEGIN: Cython Metadata";

/// Marker on the line closing the embedded block
pub const METADATA_END: &str = "END: Cython Metadata";

/// The opening marker must appear within this many lines
pub const SCAN_LIMIT: usize = 100;

/// Appended to the generated source's file name to form the sidecar path
pub const SIDECAR_SUFFIX: &str = "meta.json";

/// Sidecar format version written and accepted by this build
pub const SIDECAR_VERSION: u32 = 1;

/// Compiler options recorded by the transpiler (distutils `Extension` kwargs)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DistutilsOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub sources: Vec<PathBuf>,
    pub include_dirs: Vec<PathBuf>,
    pub library_dirs: Vec<PathBuf>,
    pub libraries: Vec<String>,
    pub extra_compile_args: Vec<String>,
    pub extra_link_args: Vec<String>,
    pub define_macros: Vec<DefinedMacro>,
    pub depends: Vec<PathBuf>,
    pub language: Language,
    /// Any other `Extension` keyword, passed through untouched
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

/// Parsed metadata of one generated source
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtensionMetadata {
    pub module_name: String,
    #[serde(default)]
    pub distutils: DistutilsOptions,
}

impl ExtensionMetadata {
    /// Turn the recorded options into a descriptor.
    ///
    /// `generated` stands in for the source list when the metadata names no
    /// sources.
    #[must_use]
    pub fn into_descriptor(self, generated: &Path) -> BuildDescriptor {
        let options = self.distutils;
        if let Some(name) = options.name.as_deref()
            && name != self.module_name
        {
            crate::debug!(
                "{}: distutils name {name} differs from module_name {}",
                generated.display(),
                self.module_name
            );
        }

        let sources = if options.sources.is_empty() {
            vec![generated.to_path_buf()]
        } else {
            options.sources
        };

        BuildDescriptor {
            module_name: self.module_name,
            sources,
            include_dirs: options.include_dirs,
            library_dirs: options.library_dirs,
            libraries: options.libraries,
            extra_compile_args: options.extra_compile_args,
            extra_link_args: options.extra_link_args,
            define_macros: options.define_macros,
            depends: options.depends,
            language: options.language,
            extra: options.extra,
        }
    }

    /// Record a descriptor's options as metadata
    #[must_use]
    pub fn from_descriptor(descriptor: &BuildDescriptor) -> Self {
        Self {
            module_name: descriptor.module_name.clone(),
            distutils: DistutilsOptions {
                name: Some(descriptor.module_name.clone()),
                sources: descriptor.sources.clone(),
                include_dirs: descriptor.include_dirs.clone(),
                library_dirs: descriptor.library_dirs.clone(),
                libraries: descriptor.libraries.clone(),
                extra_compile_args: descriptor.extra_compile_args.clone(),
                extra_link_args: descriptor.extra_link_args.clone(),
                define_macros: descriptor.define_macros.clone(),
                depends: descriptor.depends.clone(),
                language: descriptor.language,
                extra: descriptor.extra.clone(),
            },
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct Sidecar {
    version: u32,
    /// SHA256 of the generated source the sidecar was written for
    source_sha256: String,
    #[serde(flatten)]
    metadata: ExtensionMetadata,
}

#[derive(Deserialize)]
struct SidecarVersion {
    version: u32,
}

/// Whether `path` has a generated-source suffix (`.c` or `.cpp`)
#[must_use]
pub fn is_generated_source(path: &Path) -> bool {
    path.extension()
        .is_some_and(|ext| ext == Language::C.source_suffix() || ext == Language::Cpp.source_suffix())
}

/// Sidecar location for a generated source (`foo.c` -> `foo.c.meta.json`)
#[must_use]
pub fn sidecar_path(generated: &Path) -> PathBuf {
    let mut name = generated.as_os_str().to_owned();
    name.push(".");
    name.push(SIDECAR_SUFFIX);
    PathBuf::from(name)
}

/// Read the build metadata of a generated source.
///
/// Returns `Ok(None)` when the file is not a `.c`/`.cpp` source, when the
/// opening marker is not within the first [`SCAN_LIMIT`] lines, when the
/// closing marker is missing, or when the block is empty.
///
/// # Errors
///
/// Returns an error if the file cannot be read, or if a metadata block or
/// sidecar exists but is not valid.
pub fn extract(generated: &Path) -> Result<Option<ExtensionMetadata>, ExtensionError> {
    if !is_generated_source(generated) {
        return Ok(None);
    }

    let sidecar = sidecar_path(generated);
    if sidecar.is_file() {
        crate::debug!("reading metadata sidecar {}", sidecar.display());
        let (checksum, metadata) = read_sidecar(&sidecar)?;
        if checksum == compute_checksum(generated)? {
            return Ok(Some(metadata));
        }
        crate::debug!(
            "{} no longer matches {}, scanning the source instead",
            sidecar.display(),
            generated.display()
        );
    }

    let file = File::open(generated).map_err(|e| ExtensionError::io(generated, e))?;
    let Some(block) =
        scan_embedded(BufReader::new(file)).map_err(|e| ExtensionError::io(generated, e))?
    else {
        return Ok(None);
    };

    parse_block(&block, generated).map(Some)
}

/// Extract the raw text between the metadata markers.
///
/// Lines are compared after lossy UTF-8 decoding, so stray bytes elsewhere
/// in a generated file do not abort the scan.
///
/// # Errors
///
/// Returns an error if reading from `reader` fails.
pub fn scan_embedded(mut reader: impl BufRead) -> std::io::Result<Option<String>> {
    let mut buf = Vec::new();
    let mut line_no = 0;
    let mut block: Option<Vec<String>> = None;

    loop {
        buf.clear();
        if reader.read_until(b'\n', &mut buf)? == 0 {
            // EOF: either the marker never showed up or the block is truncated
            return Ok(None);
        }
        let line = String::from_utf8_lossy(&buf);

        match block.as_mut() {
            None => {
                line_no += 1;
                if line.contains(METADATA_BEGIN) {
                    block = Some(Vec::new());
                } else if line_no >= SCAN_LIMIT {
                    return Ok(None);
                }
            }
            Some(lines) => {
                if line.contains(METADATA_END) {
                    break;
                }
                lines.push(line.into_owned());
            }
        }
    }

    Ok(block
        .filter(|lines| lines.iter().any(|l| !l.trim().is_empty()))
        .map(|lines| lines.concat()))
}

fn parse_block(block: &str, path: &Path) -> Result<ExtensionMetadata, ExtensionError> {
    serde_json::from_str(block).map_err(|source| ExtensionError::InvalidMetadata {
        path: path.to_path_buf(),
        source,
    })
}

/// SHA256 of `path`'s contents as lowercase hex
///
/// # Errors
///
/// Returns an error if the file cannot be read.
pub fn compute_checksum(path: &Path) -> Result<String, ExtensionError> {
    let mut file = File::open(path).map_err(|e| ExtensionError::io(path, e))?;
    let mut hasher = Sha256::new();
    let mut buffer = [0; 8192];

    loop {
        let count = file.read(&mut buffer).map_err(|e| ExtensionError::io(path, e))?;
        if count == 0 {
            break;
        }
        hasher.update(buffer.get(..count).unwrap_or(&[]));
    }

    let result = hasher.finalize();
    Ok(format!("{result:x}"))
}

fn read_sidecar(path: &Path) -> Result<(String, ExtensionMetadata), ExtensionError> {
    let contents = fs::read_to_string(path).map_err(|e| ExtensionError::io(path, e))?;
    let invalid = |source| ExtensionError::InvalidMetadata {
        path: path.to_path_buf(),
        source,
    };

    let SidecarVersion { version } = serde_json::from_str(&contents).map_err(invalid)?;
    if version != SIDECAR_VERSION {
        return Err(ExtensionError::UnsupportedSidecar {
            path: path.to_path_buf(),
            found: version,
        });
    }

    let sidecar: Sidecar = serde_json::from_str(&contents).map_err(invalid)?;
    Ok((sidecar.source_sha256, sidecar.metadata))
}

/// Write the metadata sidecar next to `generated`.
///
/// Later builds without the transpiler read it instead of scanning the
/// generated source, until the source changes.
///
/// # Errors
///
/// Returns an error if the source cannot be hashed or the sidecar cannot be
/// written.
pub fn write_sidecar(
    generated: &Path,
    metadata: &ExtensionMetadata,
) -> Result<PathBuf, ExtensionError> {
    let path = sidecar_path(generated);
    let sidecar = Sidecar {
        version: SIDECAR_VERSION,
        source_sha256: compute_checksum(generated)?,
        metadata: metadata.clone(),
    };
    let json = serde_json::to_string_pretty(&sidecar).map_err(|source| {
        ExtensionError::InvalidMetadata {
            path: path.clone(),
            source,
        }
    })?;
    fs::write(&path, json + "\n").map_err(|e| ExtensionError::io(&path, e))?;
    Ok(path)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing, reason = "Tests can panic")]
mod tests {
    use super::*;
    use crate::test_utils::fixtures::{generated_source, metadata_block};
    use std::io::Cursor;
    use tempfile::TempDir;

    #[test]
    fn non_generated_suffix_is_not_applicable() {
        let temp = TempDir::new().unwrap();
        let header = temp.path().join("finder.h");
        fs::write(&header, metadata_block("pkg.finder", &["finder.pyx"])).unwrap();

        assert!(extract(&header).unwrap().is_none());
        assert!(extract(&temp.path().join("finder.pyx")).unwrap().is_none());
    }

    #[test]
    fn extracts_embedded_block() {
        let temp = TempDir::new().unwrap();
        let source = temp.path().join("finder.c");
        fs::write(&source, generated_source("cyndilib.finder", &["src/cyndilib/finder.pyx"]))
            .unwrap();

        let metadata = extract(&source).unwrap().unwrap();

        assert_eq!(metadata.module_name, "cyndilib.finder");
        assert_eq!(
            metadata.distutils.sources,
            vec![PathBuf::from("src/cyndilib/finder.pyx")]
        );
        assert_eq!(metadata.distutils.language, Language::C);
    }

    #[test]
    fn marker_past_scan_limit_is_absent() {
        let mut text = "/* filler */\n".repeat(SCAN_LIMIT);
        text.push_str(&metadata_block("pkg.late", &[]));

        assert!(scan_embedded(Cursor::new(text)).unwrap().is_none());
    }

    #[test]
    fn marker_on_last_scanned_line_is_found() {
        let mut text = "/* filler */\n".repeat(SCAN_LIMIT - 1);
        text.push_str(&metadata_block("pkg.edge", &[]));

        assert!(scan_embedded(Cursor::new(text)).unwrap().is_some());
    }

    #[test]
    fn missing_end_marker_is_absent() {
        let text = format!("/* {METADATA_BEGIN}\n{{\"module_name\": \"pkg.x\"}}\n");
        assert!(scan_embedded(Cursor::new(text)).unwrap().is_none());
    }

    #[test]
    fn empty_block_is_absent() {
        let text = format!("/* {METADATA_BEGIN}\n\n{METADATA_END} */\nint x;\n");
        assert!(scan_embedded(Cursor::new(text)).unwrap().is_none());
    }

    #[test]
    fn unparseable_block_is_an_error() {
        let temp = TempDir::new().unwrap();
        let source = temp.path().join("broken.c");
        fs::write(
            &source,
            format!("/* {METADATA_BEGIN}\n{{ not json\n{METADATA_END} */\n"),
        )
        .unwrap();

        let err = extract(&source).unwrap_err();
        assert!(matches!(err, ExtensionError::InvalidMetadata { .. }));
    }

    #[test]
    fn missing_module_name_is_an_error() {
        let temp = TempDir::new().unwrap();
        let source = temp.path().join("anon.cpp");
        fs::write(
            &source,
            format!("/* {METADATA_BEGIN}\n{{\"distutils\": {{}}}}\n{METADATA_END} */\n"),
        )
        .unwrap();

        assert!(matches!(
            extract(&source),
            Err(ExtensionError::InvalidMetadata { .. })
        ));
    }

    #[test]
    fn extraction_is_idempotent() {
        let temp = TempDir::new().unwrap();
        let source = temp.path().join("sender.cpp");
        fs::write(&source, generated_source("cyndilib.sender", &["sender.pyx"])).unwrap();

        let first = extract(&source).unwrap();
        let second = extract(&source).unwrap();
        assert!(first.is_some());
        assert_eq!(first, second);
    }

    #[test]
    fn sidecar_takes_precedence() {
        let temp = TempDir::new().unwrap();
        let source = temp.path().join("finder.c");
        fs::write(&source, "/* hand written */\nint x;\n").unwrap();

        let mut descriptor = BuildDescriptor::new("cyndilib.finder", Language::Cpp);
        descriptor.sources.push(source.clone());
        let metadata = ExtensionMetadata::from_descriptor(&descriptor);
        let written = write_sidecar(&source, &metadata).unwrap();

        assert_eq!(written, temp.path().join("finder.c.meta.json"));
        assert_eq!(extract(&source).unwrap(), Some(metadata));
    }

    #[test]
    fn regenerated_source_outranks_stale_sidecar() {
        let temp = TempDir::new().unwrap();
        let source = temp.path().join("x.c");
        fs::write(&source, generated_source("pkg.old", &[])).unwrap();
        let old = extract(&source).unwrap().unwrap();
        write_sidecar(&source, &old).unwrap();

        fs::write(&source, generated_source("pkg.new", &[])).unwrap();

        let current = extract(&source).unwrap().unwrap();
        assert_eq!(current.module_name, "pkg.new");
    }

    #[test]
    fn stale_sidecar_without_embedded_block_is_absent() {
        let temp = TempDir::new().unwrap();
        let source = temp.path().join("x.c");
        fs::write(&source, "int x;\n").unwrap();
        let mut descriptor = BuildDescriptor::new("pkg.x", Language::C);
        descriptor.sources.push(source.clone());
        write_sidecar(&source, &ExtensionMetadata::from_descriptor(&descriptor)).unwrap();

        fs::write(&source, "int y;\n").unwrap();

        assert!(extract(&source).unwrap().is_none());
    }

    #[test]
    fn unrecognized_distutils_keys_are_kept() {
        let temp = TempDir::new().unwrap();
        let source = temp.path().join("x.c");
        let block = r#"{
    "distutils": {
        "name": "pkg.x",
        "sources": ["x.pyx"],
        "extra_objects": ["libfoo.a"],
        "runtime_library_dirs": ["/opt/ndi/lib"],
        "undef_macros": ["NDEBUG"]
    },
    "module_name": "pkg.x"
}"#;
        fs::write(
            &source,
            format!("/* {METADATA_BEGIN}\n{block}\n{METADATA_END} */\nint x;\n"),
        )
        .unwrap();

        let metadata = extract(&source).unwrap().unwrap();
        let descriptor = metadata.clone().into_descriptor(&source);
        let json = serde_json::to_value(&descriptor).unwrap();

        assert_eq!(json["extra_objects"], serde_json::json!(["libfoo.a"]));
        assert_eq!(json["runtime_library_dirs"], serde_json::json!(["/opt/ndi/lib"]));
        assert_eq!(json["undef_macros"], serde_json::json!(["NDEBUG"]));

        // Through a sidecar and back
        write_sidecar(&source, &ExtensionMetadata::from_descriptor(&descriptor)).unwrap();
        let reread = extract(&source).unwrap().unwrap().into_descriptor(&source);
        assert_eq!(reread, descriptor);
        assert_eq!(metadata.distutils.extra.len(), 3);
    }

    #[test]
    fn unknown_sidecar_version_is_rejected() {
        let temp = TempDir::new().unwrap();
        let source = temp.path().join("finder.c");
        fs::write(&source, "int x;\n").unwrap();
        fs::write(
            sidecar_path(&source),
            r#"{"version": 99, "module_name": "pkg.finder"}"#,
        )
        .unwrap();

        assert!(matches!(
            extract(&source),
            Err(ExtensionError::UnsupportedSidecar { found: 99, .. })
        ));
    }

    #[test]
    fn descriptor_falls_back_to_generated_source() {
        let metadata = ExtensionMetadata {
            module_name: "pkg.x".to_string(),
            distutils: DistutilsOptions::default(),
        };
        let descriptor = metadata.into_descriptor(Path::new("src/pkg/x.c"));

        assert_eq!(descriptor.module_name, "pkg.x");
        assert_eq!(descriptor.sources, vec![PathBuf::from("src/pkg/x.c")]);
    }
}
