//! Steward: declarative management of directory users.
//!
//! # Usage
//!
//! ```text
//! steward apply   <name> <manifest.yaml> [--dry-run]
//! steward plan    <name> <manifest.yaml>
//! steward refresh <name> [--json]
//! steward destroy <name>
//! steward import  <name> <pool_id/username>
//! steward status  [--json]
//! steward diff    <name> <manifest.yaml>
//! ```

mod commands;
mod remote;

use anyhow::Result;
use clap::{ArgAction, Args, Parser, Subcommand};

use commands::{
    apply::ApplyArgs, destroy::DestroyArgs, diff::DiffArgs, import::ImportArgs, plan::PlanArgs,
    refresh::RefreshArgs, status::StatusArgs,
};

// ---------------------------------------------------------------------------
// CLI entry point
// ---------------------------------------------------------------------------

#[derive(Parser, Debug)]
#[command(
    name = "steward",
    version,
    about = "Reconcile directory users against YAML manifests",
    long_about = None,
)]
struct Cli {
    #[command(flatten)]
    globals: GlobalOpts,

    #[command(subcommand)]
    command: Commands,
}

/// Flags accepted before or after any subcommand.
#[derive(Args, Debug, Clone)]
pub struct GlobalOpts {
    /// Directory service endpoint; overrides `endpoint` in ~/.steward/config.yaml.
    #[arg(long, global = true, env = "STEWARD_ENDPOINT")]
    pub endpoint: Option<String>,

    /// Log more (-v info, -vv debug). `STEWARD_LOG` takes precedence.
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Create, update or replace a user to match its manifest.
    Apply(ApplyArgs),

    /// Show the remote calls `apply` would make, without making them.
    Plan(PlanArgs),

    /// Re-read a tracked user and record what the directory reports.
    Refresh(RefreshArgs),

    /// Delete a tracked user and forget it.
    Destroy(DestroyArgs),

    /// Start tracking an existing user by `<pool_id>/<username>`.
    Import(ImportArgs),

    /// Show drift between manifests and the last apply for every tracked user.
    Status(StatusArgs),

    /// Show a unified diff between the last observed user and a manifest.
    Diff(DiffArgs),
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.globals.verbose);
    let globals = cli.globals;
    match cli.command {
        Commands::Apply(args) => args.run(&globals),
        Commands::Plan(args) => args.run(),
        Commands::Refresh(args) => args.run(&globals),
        Commands::Destroy(args) => args.run(&globals),
        Commands::Import(args) => args.run(&globals),
        Commands::Status(args) => args.run(),
        Commands::Diff(args) => args.run(),
    }
}

/// Logs go to stderr so `--json` output on stdout stays parseable.
fn init_tracing(verbose: u8) {
    use tracing_subscriber::{fmt, EnvFilter};

    let default = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_env("STEWARD_LOG")
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new(default));
    let _ = fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}
