//! `steward plan <name> <manifest>`: preview remote calls without making them.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;

use steward_sync::{plan_for, Plan, PlannedCall};

/// Arguments for `steward plan`.
#[derive(Args, Debug)]
pub struct PlanArgs {
    /// Logical name the user is tracked under.
    pub name: String,

    /// Path to the user manifest (YAML).
    pub manifest: PathBuf,
}

impl PlanArgs {
    pub fn run(self) -> Result<()> {
        let home = super::home()?;
        let plan = plan_for(&home, &self.name, &self.manifest)
            .with_context(|| format!("plan failed for '{}'", self.name))?;
        print_plan(&self.name, &plan, "");
        Ok(())
    }
}

pub(crate) fn print_plan(name: &str, plan: &Plan, prefix: &str) {
    if plan.is_empty() {
        println!("{prefix}✓ '{name}': nothing to do");
        return;
    }
    println!("{prefix}'{name}': {} remote call(s)", plan.calls.len());
    if plan.requires_replacement() {
        let warning = format!("! '{name}' will be deleted and recreated; group memberships are rebuilt");
        println!("{prefix}{}", warning.yellow().bold());
    }
    for call in &plan.calls {
        let line = call.to_string();
        let line = match call {
            PlannedCall::CreateUser { .. } | PlannedCall::AddToGroup(_) => line.green(),
            PlannedCall::RemoveFromGroup(_) => line.red(),
            PlannedCall::Replace { .. } => line.yellow().bold(),
            PlannedCall::UpdateAttributes { .. } | PlannedCall::SetPassword { .. } => line.yellow(),
        };
        println!("  {line}");
    }
}
