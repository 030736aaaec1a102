//! Offline drift signals from the state store and manifest fingerprints.
//!
//! Signal precedence:
//! 1. `Untracked` (no stored state)
//! 2. `Orphaned` (stored state, but the manifest file is gone)
//! 3. `Pending` (manifest bytes differ from the last apply, or never applied)
//! 4. `InSync`
//!
//! No remote calls are made; `steward refresh` is what notices remote drift.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};

use steward_core::ResourceIdentity;

use crate::{
    error::io_err,
    store::{self, StateDocument},
    SyncError,
};

/// Classification of one tracked name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatusSignal {
    Untracked,
    InSync,
    Pending { reason: String },
    Orphaned { manifest: PathBuf },
}

impl StatusSignal {
    pub fn label(&self) -> &'static str {
        match self {
            StatusSignal::Untracked => "untracked",
            StatusSignal::InSync => "in-sync",
            StatusSignal::Pending { .. } => "pending",
            StatusSignal::Orphaned { .. } => "orphaned",
        }
    }
}

/// One row of `steward status`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusEntry {
    pub name: String,
    pub identity: ResourceIdentity,
    pub applied_at: DateTime<Utc>,
    pub signal: StatusSignal,
}

/// Classify `name`. `manifest` overrides the path recorded at the last apply.
pub fn check(home: &Path, name: &str, manifest: Option<&Path>) -> Result<StatusSignal, SyncError> {
    match store::load_at(home, name)? {
        None => Ok(StatusSignal::Untracked),
        Some(doc) => classify(&doc, manifest),
    }
}

/// Every tracked name, sorted, classified against its recorded manifest.
pub fn status_all(home: &Path) -> Result<Vec<StatusEntry>, SyncError> {
    store::list_at(home)?
        .into_iter()
        .map(|(name, doc)| {
            let signal = classify(&doc, None)?;
            Ok(StatusEntry {
                name,
                identity: doc.identity,
                applied_at: doc.applied_at,
                signal,
            })
        })
        .collect()
}

fn classify(doc: &StateDocument, manifest: Option<&Path>) -> Result<StatusSignal, SyncError> {
    let Some(path) = manifest.or(doc.manifest_path.as_deref()) else {
        return Ok(StatusSignal::Pending {
            reason: "imported; no manifest applied yet".into(),
        });
    };

    let contents = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(err) if err.kind() == ErrorKind::NotFound => {
            return Ok(StatusSignal::Orphaned {
                manifest: path.to_path_buf(),
            })
        }
        Err(err) => return Err(io_err(path, err)),
    };

    if doc.manifest_sha256.is_empty() {
        let reason = if doc.manifest_path.is_some() {
            "last apply did not complete"
        } else {
            "imported; no manifest applied yet"
        };
        return Ok(StatusSignal::Pending { reason: reason.into() });
    }
    if store::fingerprint(&contents) != doc.manifest_sha256 {
        return Ok(StatusSignal::Pending {
            reason: format!(
                "manifest changed since last apply {} ago",
                format_datetime_age(doc.applied_at)
            ),
        });
    }
    Ok(StatusSignal::InSync)
}

/// Format age from a chrono timestamp (state store `applied_at`).
pub fn format_datetime_age(timestamp: DateTime<Utc>) -> String {
    let now = Utc::now();
    let age = now.signed_duration_since(timestamp).num_seconds().max(0) as u64;
    format_seconds(age)
}

fn format_seconds(seconds: u64) -> String {
    if seconds < 60 {
        return format!("{seconds}s");
    }
    if seconds < 60 * 60 {
        return format!("{}m", seconds / 60);
    }
    if seconds < 60 * 60 * 24 {
        return format!("{}h", seconds / (60 * 60));
    }
    format!("{}d", seconds / (60 * 60 * 24))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use steward_core::DesiredState;
    use tempfile::TempDir;

    fn save(home: &Path, manifest: Option<&Path>, sha: &str) {
        let applied = DesiredState::new("poolX".into(), "alice".into());
        let doc = StateDocument {
            identity: applied.identity(),
            applied,
            manifest_sha256: sha.to_string(),
            manifest_path: manifest.map(Path::to_path_buf),
            applied_at: Utc::now() - Duration::minutes(5),
            observed: None,
        };
        store::save_at(home, "alice", &doc).expect("save");
    }

    #[test]
    fn untracked_without_state() {
        let home = TempDir::new().expect("home");
        assert_eq!(check(home.path(), "alice", None).unwrap(), StatusSignal::Untracked);
    }

    #[test]
    fn in_sync_then_pending_after_edit() {
        let home = TempDir::new().expect("home");
        let manifest = home.path().join("alice.yaml");
        std::fs::write(&manifest, "username: alice\n").unwrap();
        save(home.path(), Some(manifest.as_path()), &store::fingerprint("username: alice\n"));
        assert_eq!(check(home.path(), "alice", None).unwrap(), StatusSignal::InSync);

        std::fs::write(&manifest, "username: alice\ngroups: [ops]\n").unwrap();
        match check(home.path(), "alice", None).unwrap() {
            StatusSignal::Pending { reason } => assert!(reason.contains("5m ago"), "{reason}"),
            other => panic!("expected pending, got {other:?}"),
        }
    }

    #[test]
    fn orphaned_when_manifest_removed() {
        let home = TempDir::new().expect("home");
        let manifest = home.path().join("gone.yaml");
        save(home.path(), Some(manifest.as_path()), "abc");
        assert!(matches!(
            check(home.path(), "alice", None).unwrap(),
            StatusSignal::Orphaned { .. }
        ));
    }

    #[test]
    fn imported_user_is_pending() {
        let home = TempDir::new().expect("home");
        save(home.path(), None, "");
        let all = status_all(home.path()).unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].signal.label(), "pending");
    }

    #[test]
    fn incomplete_apply_is_pending() {
        let home = TempDir::new().expect("home");
        let manifest = home.path().join("alice.yaml");
        std::fs::write(&manifest, "username: alice\n").unwrap();
        save(home.path(), Some(manifest.as_path()), "");
        assert_eq!(
            check(home.path(), "alice", None).unwrap(),
            StatusSignal::Pending { reason: "last apply did not complete".into() }
        );
    }

    #[test]
    fn format_seconds_buckets() {
        assert_eq!(format_seconds(5), "5s");
        assert_eq!(format_seconds(120), "2m");
        assert_eq!(format_seconds(7200), "2h");
        assert_eq!(format_seconds(3 * 86400), "3d");
    }
}
