//! Stencil — declarative template version management CLI.
//!
//! # Usage
//!
//! ```text
//! stencil hash <dir>
//! stencil plan <manifest> [--strict-variables] [--json]
//! stencil apply <manifest> --url <url> --token <token> [--organization <org>] [--strict-variables]
//! stencil checkpoint show <template> [--json]
//! ```

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};

use commands::{apply::ApplyArgs, checkpoint::CheckpointCommand, hash::HashArgs, plan::PlanArgs};

// ---------------------------------------------------------------------------
// CLI entry point
// ---------------------------------------------------------------------------

#[derive(Parser, Debug)]
#[command(
    name = "stencil",
    version,
    about = "Keep remote template versions in step with a declared manifest",
    long_about = None,
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Print the content hash of a version directory.
    Hash(HashArgs),

    /// Show what an apply would do, without contacting the remote service.
    Plan(PlanArgs),

    /// Create, rename and activate remote versions to match a manifest.
    Apply(ApplyArgs),

    /// Inspect the local checkpoint of a template.
    Checkpoint {
        #[command(subcommand)]
        command: CheckpointCommand,
    },
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();
    match cli.command {
        Commands::Hash(args) => args.run(),
        Commands::Plan(args) => args.run(),
        Commands::Apply(args) => args.run(),
        Commands::Checkpoint { command } => commands::checkpoint::run(command),
    }
}

fn init_tracing() {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}
