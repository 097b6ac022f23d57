//! Shared test utilities
//!
//! Fixtures for generated sources, metadata blocks and project trees, plus a
//! transpiler stand-in so the direct build can be tested without Cython.

#[cfg(test)]
pub mod fixtures {
    use crate::extensions::metadata::{METADATA_BEGIN, METADATA_END};
    use crate::extensions::{ExtensionError, TranspileOutput, TranspileRequest, Transpiler};
    use std::cell::Cell;
    use std::fs;
    use std::path::Path;

    /// An embedded metadata block for `module_name`, markers included
    pub fn metadata_block(module_name: &str, sources: &[&str]) -> String {
        let json = serde_json::json!({
            "distutils": {
                "name": module_name,
                "sources": sources,
                "language": "c",
            },
            "module_name": module_name,
        });
        let body = serde_json::to_string_pretty(&json).expect("Failed to serialize metadata");
        format!("/* {METADATA_BEGIN}\n{body}\n{METADATA_END} */\n")
    }

    /// A generated C source carrying a metadata block for `module_name`
    pub fn generated_source(module_name: &str, sources: &[&str]) -> String {
        format!(
            "/* Generated by Cython 3.0.11 */\n\n{}#ifndef PY_SSIZE_T_CLEAN\n#define PY_SSIZE_T_CLEAN\n#endif\n#include \"Python.h\"\n",
            metadata_block(module_name, sources)
        )
    }

    /// Create `root/relative` (and its parents) with `contents`
    pub fn write_file(root: &Path, relative: &str, contents: &str) {
        let path = root.join(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("Failed to create fixture directory");
        }
        fs::write(&path, contents).expect("Failed to write fixture file");
    }

    /// Transpiler stand-in: writes a stub source (and annotation) for every
    /// request and counts the calls
    #[derive(Debug, Default)]
    pub struct CopyingTranspiler {
        calls: Cell<usize>,
    }

    impl CopyingTranspiler {
        pub fn calls(&self) -> usize {
            self.calls.get()
        }
    }

    impl Transpiler for CopyingTranspiler {
        fn name(&self) -> String {
            "fake".to_string()
        }

        fn transpile(
            &self,
            request: &TranspileRequest,
        ) -> Result<TranspileOutput, ExtensionError> {
            self.calls.set(self.calls.get() + 1);
            fs::write(&request.output, "/* stub */\nint x;\n")
                .map_err(|e| ExtensionError::io(&request.output, e))?;

            let annotation = request.output.with_extension("html");
            if request.annotate {
                fs::write(&annotation, "<html></html>\n")
                    .map_err(|e| ExtensionError::io(&annotation, e))?;
            }
            Ok(TranspileOutput {
                generated: request.output.clone(),
                annotation: request.annotate.then_some(annotation),
            })
        }
    }
}

#[cfg(test)]
pub mod assertions {
    /// Assert that an error message contains expected text
    pub fn assert_error_contains(error_msg: &str, expected_text: &str) {
        assert!(
            error_msg.contains(expected_text),
            "Expected error to contain '{expected_text}', but got: {error_msg}"
        );
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, reason = "Tests can panic")]
mod tests {
    use super::fixtures::*;
    use crate::extensions::metadata::scan_embedded;
    use std::io::Cursor;

    #[test]
    fn metadata_block_is_scannable() {
        let block = scan_embedded(Cursor::new(generated_source("pkg.x", &["x.pyx"])))
            .unwrap()
            .unwrap();
        let json: serde_json::Value = serde_json::from_str(&block).unwrap();
        assert_eq!(json["module_name"], "pkg.x");
        assert_eq!(json["distutils"]["sources"][0], "x.pyx");
    }
}
