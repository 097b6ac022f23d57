//! Extension descriptors
//!
//! Produces the compiler-ready description of every extension module in the
//! project. Two paths lead there:
//! - direct: transpile each interface file (`.pyx`) now
//! - assembled: recover the build options from generated `.c`/`.cpp` sources
//!
//! [`BuildMode`] chooses between them.

pub mod assembler;
pub mod builder;
pub mod direct;
pub mod directives;
pub mod error;
pub mod metadata;
pub mod toolchain;
pub mod types;

pub use assembler::{assemble, discover_interfaces, find_generated_source};
pub use builder::{BuildMode, BuildModeError, BuildOptions, ModeRequest};
pub use direct::{AggregateTarget, Instrumentation, expand};
pub use directives::{ModuleDirectives, module_name_for};
pub use error::ExtensionError;
pub use metadata::{ExtensionMetadata, extract, write_sidecar};
pub use toolchain::{
    CompilerDirectives, CythonToolchain, TranspileOutput, TranspileRequest, Transpiler,
};
pub use types::{BuildDescriptor, DefinedMacro, Language, NameRegistry};
