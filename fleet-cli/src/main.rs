//! fleet: self-hosted GitHub Actions runner fleet reconciler.
//!
//! # Usage
//!
//! ```text
//! fleet run --token <pat> [--repos owner/a,owner/b] [--runners 2] [--skip-docker]
//! fleet list [--config runners-config.json] [--json]
//! ```

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};

use commands::{list::ListArgs, run::RunArgs};

// ---------------------------------------------------------------------------
// CLI entry point
// ---------------------------------------------------------------------------

#[derive(Parser, Debug)]
#[command(
    name = "fleet",
    version,
    about = "Reconcile self-hosted GitHub Actions runners against a roster",
    long_about = None,
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Add repositories, refresh tokens, render the manifest and redeploy.
    Run(RunArgs),

    /// Print the roster without contacting GitHub or Docker.
    List(ListArgs),
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();
    match cli.command {
        Commands::Run(args) => args.run(),
        Commands::List(args) => args.run(),
    }
}

/// Logs go to stderr so `--json` output stays parseable.
fn init_tracing() {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}
