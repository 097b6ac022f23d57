//! cyndi-build internal library code

pub mod config;
pub mod debug;
pub mod env_vars;
pub mod extensions;
pub mod index;
pub mod manifest;
pub mod paths;
pub mod pipeline;
pub mod platform;
pub mod sdk;

#[cfg(test)]
pub mod test_utils;

// Re-export common types for convenience
pub use config::Config;
pub use debug::{debug_log, init_debug, is_debug_enabled};
pub use extensions::{
    BuildDescriptor, BuildMode, BuildModeError, BuildOptions, CythonToolchain, ExtensionError,
    ExtensionMetadata, Instrumentation, ModeRequest, Transpiler,
};
pub use index::{IndexError, IndexRenderer, ModuleIndex, RenderReport};
pub use manifest::{Manifest, ManifestError};
pub use paths::{ProjectLayout, find_project_root};
pub use pipeline::{BuildOutcome, BuildRequest, PipelineError, run_build};
pub use platform::{OsKind, PlatformFacts, detect_current_platform};
pub use sdk::{SdkError, SdkProvisioner, provisioner_for, resolve_platform_facts};
