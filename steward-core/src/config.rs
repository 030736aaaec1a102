//! Tool configuration and the `~/.steward/` layout.
//!
//! ```text
//! ~/.steward/
//!   config.yaml          (optional: endpoint, region, timeout)
//!   state/
//!     <name>.json        (one state document per managed user)
//! ```
//!
//! Every function takes `home` explicitly so tests can pass a `TempDir`;
//! [`home`] resolves the real one from `dirs::home_dir()`.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Contents of `~/.steward/config.yaml`. Every field is optional on disk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StewardConfig {
    /// Base URL of the directory service JSON API.
    pub endpoint: Option<String>,
    pub region: Option<String>,
    pub timeout_secs: u64,
}

impl Default for StewardConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            region: None,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

/// `<home>/.steward/`
pub fn steward_dir_at(home: &Path) -> PathBuf {
    home.join(".steward")
}

/// `<home>/.steward/config.yaml`
pub fn config_path_at(home: &Path) -> PathBuf {
    steward_dir_at(home).join("config.yaml")
}

/// Load the config file, falling back to defaults when it does not exist.
pub fn load_at(home: &Path) -> Result<StewardConfig, CoreError> {
    let path = config_path_at(home);
    if !path.exists() {
        return Ok(StewardConfig::default());
    }
    let contents = std::fs::read_to_string(&path)?;
    serde_yaml::from_str(&contents).map_err(|e| CoreError::Parse { path, source: e })
}

/// The current user's home directory.
pub fn home() -> Result<PathBuf, CoreError> {
    dirs::home_dir().ok_or(CoreError::HomeNotFound)
}
