//! `steward destroy <name>`: delete a tracked user.

use anyhow::{Context, Result};
use clap::Args;

use steward_sync::{destroy, store};

use crate::GlobalOpts;

/// Arguments for `steward destroy`.
#[derive(Args, Debug)]
pub struct DestroyArgs {
    /// Logical name the user is tracked under.
    pub name: String,
}

impl DestroyArgs {
    pub fn run(self, globals: &GlobalOpts) -> Result<()> {
        let home = super::home()?;
        if store::load_at(&home, &self.name)
            .with_context(|| format!("failed to load state for '{}'", self.name))?
            .is_none()
        {
            println!("'{}' is not tracked: nothing to destroy", self.name);
            return Ok(());
        }

        let client = super::connect(&home, globals)?;
        destroy(&home, &client, &self.name)
            .with_context(|| format!("destroy failed for '{}'", self.name))?;
        println!("✓ '{}' destroyed", self.name);
        Ok(())
    }
}
