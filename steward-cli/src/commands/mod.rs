//! One module per subcommand. Each exposes an `Args` struct with a `run` method.

pub mod apply;
pub mod destroy;
pub mod diff;
pub mod import;
pub mod plan;
pub mod refresh;
pub mod status;

use std::path::PathBuf;

use anyhow::{Context, Result};

use steward_core::config;

use crate::remote::HttpDirectory;
use crate::GlobalOpts;

pub(crate) fn home() -> Result<PathBuf> {
    config::home().context("could not determine home directory")
}

/// Build the directory client from `~/.steward/config.yaml` and global flags.
pub(crate) fn connect(home: &std::path::Path, globals: &GlobalOpts) -> Result<HttpDirectory> {
    let cfg = config::load_at(home).context("failed to load ~/.steward/config.yaml")?;
    HttpDirectory::from_config(&cfg, globals.endpoint.as_deref())
}
