//! Metadata command
//!
//! Shows the build options a generated source records, the same data the
//! assembled build reads.

use anyhow::{Result, bail};
use cyndi_build::extensions::error::ALTERNATE_MODE_HINT;
use cyndi_build::extensions::metadata::{extract, is_generated_source};
use std::path::Path;

/// Print the metadata of `file` as JSON
pub(crate) fn run(file: &Path) -> Result<()> {
    if !file.is_file() {
        bail!("File not found: {}", file.display());
    }
    if !is_generated_source(file) {
        bail!(
            "{} is not a generated source (expected a .c or .cpp file)",
            file.display()
        );
    }

    let Some(metadata) = extract(file)? else {
        bail!(
            "No build metadata found in {} ({ALTERNATE_MODE_HINT})",
            file.display()
        );
    };

    println!("{}", serde_json::to_string_pretty(&metadata)?);
    Ok(())
}
