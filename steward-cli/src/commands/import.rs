//! `steward import <name> <pool_id/username>`: adopt an existing user.

use anyhow::{Context, Result};
use clap::Args;

use steward_core::ResourceIdentity;
use steward_sync::import;

use crate::GlobalOpts;

/// Arguments for `steward import`.
#[derive(Args, Debug)]
pub struct ImportArgs {
    /// Logical name to track the user under.
    pub name: String,

    /// Identifier of the existing user, `<pool_id>/<username>`.
    pub id: String,
}

impl ImportArgs {
    pub fn run(self, globals: &GlobalOpts) -> Result<()> {
        // Reject malformed ids before touching config or the network.
        ResourceIdentity::decode(&self.id)?;

        let home = super::home()?;
        let client = super::connect(&home, globals)?;
        let doc = import(&home, &client, &self.name, &self.id)
            .with_context(|| format!("import of {} failed", self.id))?;

        println!("✓ imported {} as '{}'", doc.identity, self.name);
        println!(
            "  {} attribute(s), {} group(s)",
            doc.applied.user_attributes.len(),
            doc.applied.groups.len()
        );
        Ok(())
    }
}
