//! `steward refresh <name>`: re-read a tracked user.

use anyhow::{Context, Result};
use clap::Args;
use serde::Serialize;

use steward_core::{Attribute, ObservedState, ResourceIdentity};
use steward_sync::{refresh, RefreshOutcome};

use crate::GlobalOpts;

/// Arguments for `steward refresh`.
#[derive(Args, Debug)]
pub struct RefreshArgs {
    /// Logical name the user is tracked under.
    pub name: String,

    /// Emit machine-readable JSON.
    #[arg(long)]
    pub json: bool,
}

#[derive(Serialize)]
struct RefreshJson<'a> {
    name: &'a str,
    identity: &'a ResourceIdentity,
    present: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    observed: Option<&'a ObservedState>,
}

impl RefreshArgs {
    pub fn run(self, globals: &GlobalOpts) -> Result<()> {
        let home = super::home()?;
        let client = super::connect(&home, globals)?;
        let outcome = refresh(&home, &client, &self.name)
            .with_context(|| format!("refresh failed for '{}'", self.name))?;

        let (identity, observed) = match &outcome {
            RefreshOutcome::Gone { identity } => (identity, None),
            RefreshOutcome::Present { identity, observed } => (identity, Some(observed)),
        };

        if self.json {
            let payload = RefreshJson {
                name: &self.name,
                identity,
                present: observed.is_some(),
                observed,
            };
            println!(
                "{}",
                serde_json::to_string_pretty(&payload).context("failed to serialize refresh JSON")?
            );
            return Ok(());
        }

        let Some(observed) = observed else {
            println!("'{}': {identity} no longer exists; stopped tracking it", self.name);
            return Ok(());
        };
        println!("'{}': {identity}", self.name);
        println!("  enabled: {}", observed.enabled);
        println!("  status:  {}", observed.status);
        for Attribute { name, value } in &observed.user_attributes {
            println!("  attribute {name} = {value}");
        }
        match &observed.groups {
            Some(groups) => {
                let mut groups: Vec<&String> = groups.iter().collect();
                groups.sort();
                for g in groups {
                    println!("  group {g}");
                }
            }
            None => println!("  groups:  unknown"),
        }
        Ok(())
    }
}
