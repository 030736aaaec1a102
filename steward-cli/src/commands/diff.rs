//! `steward diff <name> <manifest>`: unified diff of observed vs declared.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;

use steward_sync::diff::diff;

/// Arguments for `steward diff`.
#[derive(Args, Debug)]
pub struct DiffArgs {
    /// Logical name the user is tracked under.
    pub name: String,

    /// Path to the user manifest (YAML).
    pub manifest: PathBuf,
}

impl DiffArgs {
    pub fn run(self) -> Result<()> {
        let home = super::home()?;

        let result = diff(&home, &self.name, &self.manifest)
            .with_context(|| format!("diff failed for '{}'", self.name))?;

        if result.is_empty() {
            println!("No differences for '{}'.", result.name);
            return Ok(());
        }

        print!("{}", result.unified_diff);
        if !result.unified_diff.ends_with('\n') {
            println!();
        }
        Ok(())
    }
}
