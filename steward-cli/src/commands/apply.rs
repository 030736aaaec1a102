//! `steward apply <name> <manifest>`: converge a user to its manifest.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;

use steward_sync::{apply, plan_for, ApplyOutcome};

use super::plan::print_plan;
use crate::GlobalOpts;

/// Arguments for `steward apply`.
#[derive(Args, Debug)]
pub struct ApplyArgs {
    /// Logical name the user is tracked under.
    pub name: String,

    /// Path to the user manifest (YAML).
    pub manifest: PathBuf,

    /// Show what would change without calling the directory.
    #[arg(long)]
    pub dry_run: bool,
}

impl ApplyArgs {
    pub fn run(self, globals: &GlobalOpts) -> Result<()> {
        let home = super::home()?;

        if self.dry_run {
            let plan = plan_for(&home, &self.name, &self.manifest)
                .with_context(|| format!("plan failed for '{}'", self.name))?;
            print_plan(&self.name, &plan, "[dry-run] ");
            return Ok(());
        }

        // Validate the manifest before requiring an endpoint.
        steward_sync::pipeline::load_manifest(&self.manifest)
            .with_context(|| format!("invalid manifest {}", self.manifest.display()))?;

        let client = super::connect(&home, globals)?;
        let outcome = apply(&home, &client, &self.name, &self.manifest)
            .with_context(|| format!("apply failed for '{}'", self.name))?;

        match outcome {
            ApplyOutcome::Created { identity } => println!("✓ '{}' created {identity}", self.name),
            ApplyOutcome::Updated { identity } => println!("✓ '{}' updated {identity}", self.name),
            ApplyOutcome::Unchanged { identity } => {
                println!("✓ '{}': {identity} already up to date", self.name)
            }
            ApplyOutcome::Replaced { from, to } => {
                println!("✓ '{}' replaced {from} with {to}", self.name)
            }
        }
        Ok(())
    }
}
