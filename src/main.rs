//! cyndi-build command-line interface
//!
//! Build orchestrator for the cyndilib native extensions

use clap::{Parser, Subcommand};
use clap_complete::Shell;
use cyndi_build::ModeRequest;
use std::path::PathBuf;
use std::process;

/// Display an error with optional backtrace information
fn display_error(err: &anyhow::Error, backtrace_enabled: bool) {
    eprintln!("error: {err}");

    // Show error chain
    let mut source = err.source();
    while let Some(err) = source {
        eprintln!("caused by: {err}");
        source = err.source();
    }

    // Show backtrace if enabled
    if backtrace_enabled {
        let backtrace = err.backtrace();
        if backtrace.status() == std::backtrace::BacktraceStatus::Captured {
            eprintln!("\nBacktrace:");
            eprintln!("{backtrace}");
        }
    }
}

#[derive(Parser)]
#[command(name = "cyndi-build")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Build orchestrator for the cyndilib native extensions", long_about = None)]
pub(crate) struct Cli {
    /// Project root (default: nearest directory with cyndi-build.toml, setup.py or pyproject.toml)
    #[arg(long, global = true, value_name = "DIR")]
    project_dir: Option<PathBuf>,

    /// Configuration file (overrides cyndi-build.toml and the user config)
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Ignore all configuration files
    #[arg(long, global = true)]
    norc: bool,

    /// Enable debug output
    #[arg(long, global = true)]
    debug: bool,

    /// Show backtraces on errors
    #[arg(long, global = true)]
    backtrace: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Provision the SDK, produce the extension manifest and render the module index
    Build {
        /// How descriptors are produced (default: config, then auto)
        #[arg(long, value_enum)]
        mode: Option<ModeRequest>,

        /// Build with profiling and line tracing (also CYNDI_BUILD_PROFILE)
        #[arg(long)]
        use_profile: bool,

        /// Where to write the manifest (default: build/extensions.json)
        #[arg(long, value_name = "PATH")]
        manifest: Option<PathBuf>,

        /// Skip rendering the module index
        #[arg(long)]
        no_index: bool,

        /// Suppress progress output
        #[arg(short, long)]
        quiet: bool,
    },

    /// Resolve the platform's include and library directories
    Provision {
        /// Print the facts as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print the build metadata recorded in a generated source
    Metadata {
        /// Generated .c or .cpp file
        file: PathBuf,
    },

    /// Render the module index from an existing manifest
    Index {
        /// Manifest to read (default: build/extensions.json)
        #[arg(long, value_name = "PATH")]
        manifest: Option<PathBuf>,
    },

    /// Generate shell completion scripts
    Completion {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

fn main() {
    let cli = Cli::parse();

    cyndi_build::init_debug(cli.debug);

    let globals = commands::GlobalOptions {
        project_dir: cli.project_dir,
        config: cli.config,
        norc: cli.norc,
    };

    let result = match cli.command {
        Commands::Build {
            mode,
            use_profile,
            manifest,
            no_index,
            quiet,
        } => commands::build::run(
            &globals,
            &commands::build::BuildArgs {
                mode,
                use_profile,
                manifest,
                no_index,
                quiet,
            },
        ),
        Commands::Provision { json } => commands::provision::run(&globals, json),
        Commands::Metadata { file } => commands::metadata::run(&file),
        Commands::Index { manifest } => commands::index::run(&globals, manifest.as_deref()),
        Commands::Completion { shell } => commands::completion::run(shell),
    };

    if let Err(e) = result {
        // Display error with formatting
        display_error(&e, cli.backtrace);
        process::exit(1);
    }
}

mod commands;
