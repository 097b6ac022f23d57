//! Provision command
//!
//! Runs SDK provisioning on its own and shows the resulting platform facts,
//! similar to an `env` report for the native build.

use super::GlobalOptions;
use anyhow::Result;
use cyndi_build::{OsKind, PlatformFacts, provisioner_for, resolve_platform_facts};
use std::path::PathBuf;

/// Provision the SDK and print the platform facts
pub(crate) fn run(globals: &GlobalOptions, json: bool) -> Result<()> {
    let project = globals.load_project()?;
    let host = project.host()?;
    let provisioner = provisioner_for(OsKind::current(), &project.layout);

    let provisioned = resolve_platform_facts(provisioner.as_ref(), host.as_ref())?;

    if json {
        println!("{}", serde_json::to_string_pretty(&provisioned.facts)?);
        return Ok(());
    }

    print!("{}", describe(&provisioned.facts));
    for path in &provisioned.copy.copied {
        println!("Copied       {}", path.display());
    }
    if !provisioned.copy.skipped.is_empty() {
        println!(
            "Skipped      {} file(s) already present",
            provisioned.copy.skipped.len()
        );
    }
    Ok(())
}

fn describe(facts: &PlatformFacts) -> String {
    let list = |dirs: &[PathBuf]| {
        if dirs.is_empty() {
            "(none)".to_string()
        } else {
            dirs.iter()
                .map(|d| d.display().to_string())
                .collect::<Vec<_>>()
                .join("\n             ")
        }
    };

    format!(
        "Platform     {}\nInclude      {}\nLibrary dirs {}\nLibrary      {}\nCompile args {}\n",
        facts.os_kind.as_str(),
        list(&facts.include_dirs),
        list(&facts.library_dirs),
        facts.library_name,
        facts.extra_compile_args().join(" ")
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use cyndi_build::platform::PlatformFactsBuilder;

    #[test]
    fn describes_facts() {
        let facts = PlatformFactsBuilder::new(OsKind::Windows)
            .with_include_dir("C:/py/include")
            .with_include_dir("C:/proj/include")
            .finish();
        let text = describe(&facts);

        assert!(text.contains("Platform     windows"));
        assert!(text.contains("C:/py/include\n             C:/proj/include"));
        assert!(text.contains("Library dirs (none)"));
        assert!(text.contains("Processing.NDI.Lib.x64"));
        assert!(text.contains("/Zc:strictStrings"));
    }
}
