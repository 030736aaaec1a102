//! State store: the durable record of what was last applied.
//!
//! Persists one [`StateDocument`] JSON file per managed user at
//! `<home>/.steward/state/<name>.json`, where `<name>` is the caller's
//! logical name for the user. Writes use the `.tmp` + rename pattern.
//!
//! Passwords never reach this file: [`DesiredState`] skips them on serialize.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use steward_core::{config, CoreError, DesiredState, ObservedState, ResourceIdentity};

use crate::error::{io_err, SyncError};

/// On-disk state for one managed user.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StateDocument {
    pub identity: ResourceIdentity,
    /// The declaration last applied; the `previous` side of the next update.
    pub applied: DesiredState,
    /// Hex SHA-256 of the manifest bytes last applied. Empty for imports and
    /// for a create that did not complete.
    #[serde(default)]
    pub manifest_sha256: String,
    /// Manifest last applied from. `None` for imported users.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub manifest_path: Option<PathBuf>,
    pub applied_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub observed: Option<ObservedState>,
}

/// `<home>/.steward/state/`
pub fn state_dir_at(home: &Path) -> PathBuf {
    config::steward_dir_at(home).join("state")
}

/// `<home>/.steward/state/<name>.json`
pub fn store_path_at(home: &Path, name: &str) -> PathBuf {
    state_dir_at(home).join(format!("{name}.json"))
}

/// Names become file names, so they must be a single plain path segment.
pub fn validate_name(name: &str) -> Result<(), SyncError> {
    let bad = name.is_empty()
        || name.starts_with('.')
        || name.contains(['/', '\\'])
        || name.chars().any(char::is_control);
    if bad {
        return Err(CoreError::Invalid {
            field: "name".into(),
            reason: format!("'{name}' must be a plain name without path separators"),
        }
        .into());
    }
    Ok(())
}

/// Hex SHA-256 of manifest contents, with line endings normalised to LF.
pub fn fingerprint(contents: &str) -> String {
    let normalized = contents.replace("\r\n", "\n");
    let mut h = Sha256::new();
    h.update(normalized.as_bytes());
    hex::encode(h.finalize())
}

/// Load the state for `name`, or `None` if the user is not tracked.
pub fn load_at(home: &Path, name: &str) -> Result<Option<StateDocument>, SyncError> {
    validate_name(name)?;
    let path = store_path_at(home, name);
    if !path.exists() {
        return Ok(None);
    }
    let contents = std::fs::read_to_string(&path).map_err(|e| io_err(&path, e))?;
    Ok(Some(serde_json::from_str(&contents)?))
}

/// Save the state for `name` atomically.
///
/// Writes to `<path>.tmp` then renames to `<path>`.
pub fn save_at(home: &Path, name: &str, doc: &StateDocument) -> Result<(), SyncError> {
    validate_name(name)?;
    let path = store_path_at(home, name);
    let Some(dir) = path.parent() else {
        return Err(io_err(
            path,
            std::io::Error::other("invalid state store path"),
        ));
    };

    std::fs::create_dir_all(dir).map_err(|e| io_err(dir, e))?;

    let json = serde_json::to_string_pretty(doc)?;
    let tmp = path.with_extension("json.tmp");
    std::fs::write(&tmp, &json).map_err(|e| io_err(&tmp, e))?;
    set_file_permissions(&tmp)?;
    std::fs::rename(&tmp, &path).map_err(|e| io_err(&path, e))?;
    Ok(())
}

/// Forget `name`. Removing an untracked name is a no-op.
pub fn remove_at(home: &Path, name: &str) -> Result<bool, SyncError> {
    validate_name(name)?;
    let path = store_path_at(home, name);
    match std::fs::remove_file(&path) {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(io_err(&path, e)),
    }
}

/// Every tracked user, sorted by name.
pub fn list_at(home: &Path) -> Result<Vec<(String, StateDocument)>, SyncError> {
    let dir = state_dir_at(home);
    if !dir.exists() {
        return Ok(vec![]);
    }
    let mut entries: Vec<_> = std::fs::read_dir(&dir)
        .map_err(|e| io_err(&dir, e))?
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().map(|t| t.is_file()).unwrap_or(false))
        .collect();
    entries.sort_by_key(|e| e.file_name());

    let mut result = Vec::new();
    for entry in entries {
        let file_name = entry.file_name().to_string_lossy().into_owned();
        let Some(name) = file_name.strip_suffix(".json") else {
            continue;
        };
        if let Some(doc) = load_at(home, name)? {
            result.push((name.to_string(), doc));
        }
    }
    Ok(result)
}

#[cfg(unix)]
fn set_file_permissions(path: &Path) -> Result<(), SyncError> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))
        .map_err(|e| io_err(path, e))
}
#[cfg(not(unix))]
fn set_file_permissions(_path: &Path) -> Result<(), SyncError> {
    Ok(())
}
