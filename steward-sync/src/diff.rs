//! Unified diff between the last observed user and a manifest, for `steward diff`.
//!
//! Both sides are projected onto the comparable fields (attributes and
//! groups) and rendered one item per line, sorted, so the diff only moves
//! when membership or values do.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use similar::TextDiff;

use steward_core::Attribute;

use crate::{pipeline::load_manifest, store, SyncError};

/// Diff result for one tracked name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceDiff {
    pub name: String,
    pub manifest: PathBuf,
    /// Empty when the observed state already matches the declaration.
    pub unified_diff: String,
}

impl ResourceDiff {
    pub fn is_empty(&self) -> bool {
        self.unified_diff.is_empty()
    }
}

/// Compare the stored observation for `name` with the manifest. No remote calls.
///
/// An untracked name diffs against nothing, so every declared line is an addition.
pub fn diff(home: &Path, name: &str, manifest_path: &Path) -> Result<ResourceDiff, SyncError> {
    let loaded = load_manifest(manifest_path)?;
    let observed = store::load_at(home, name)?.and_then(|doc| doc.observed);

    let existing = match &observed {
        Some(o) => render(&o.user_attributes, o.groups.as_ref()),
        None => String::new(),
    };
    let declared = render(&loaded.desired.user_attributes, Some(&loaded.desired.groups));

    let unified_diff = if existing == declared {
        String::new()
    } else {
        let old_header = format!("a/{name} (observed)");
        let new_header = format!("b/{}", manifest_path.display());
        TextDiff::from_lines(&existing, &declared)
            .unified_diff()
            .header(&old_header, &new_header)
            .context_radius(3)
            .to_string()
    };

    Ok(ResourceDiff {
        name: name.to_string(),
        manifest: manifest_path.to_path_buf(),
        unified_diff,
    })
}

/// `None` groups (never listed) render no group lines.
fn render(attributes: &[Attribute], groups: Option<&HashSet<String>>) -> String {
    let mut attrs: Vec<&Attribute> = attributes.iter().collect();
    attrs.sort_by(|a, b| (&a.name, &a.value).cmp(&(&b.name, &b.value)));

    let mut out = String::new();
    for a in attrs {
        out.push_str(&format!("attribute {} = {}\n", a.name, a.value));
    }
    if let Some(groups) = groups {
        let mut sorted: Vec<&String> = groups.iter().collect();
        sorted.sort();
        for g in sorted {
            out.push_str(&format!("group {g}\n"));
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use std::fs;

    use chrono::Utc;
    use steward_core::{DesiredState, ObservedState};
    use tempfile::TempDir;

    use super::*;
    use crate::store::StateDocument;

    fn track(home: &Path, attributes: Vec<Attribute>, groups: &[&str]) {
        let applied = DesiredState::new("eu-west-1_Pool1".into(), "alice".into());
        let doc = StateDocument {
            identity: applied.identity(),
            applied,
            manifest_sha256: String::new(),
            manifest_path: None,
            applied_at: Utc::now(),
            observed: Some(ObservedState {
                enabled: true,
                user_attributes: attributes,
                groups: Some(groups.iter().map(|g| g.to_string()).collect()),
                ..ObservedState::default()
            }),
        };
        store::save_at(home, "alice", &doc).expect("save");
    }

    fn manifest(dir: &TempDir, body: &str) -> PathBuf {
        let path = dir.path().join("alice.yaml");
        fs::write(
            &path,
            format!("pool_id: eu-west-1_Pool1\nusername: alice\n{body}"),
        )
        .expect("write");
        path
    }

    #[test]
    fn matching_observation_has_no_diff() {
        let home = TempDir::new().expect("home");
        track(home.path(), vec![Attribute::new("email", "a@x.io")], &["b", "a"]);
        let path = manifest(
            &home,
            "user_attributes:\n  - { name: email, value: a@x.io }\ngroups: [a, b]\n",
        );
        let d = diff(home.path(), "alice", &path).expect("diff");
        assert!(d.is_empty(), "{}", d.unified_diff);
    }

    #[test]
    fn group_change_shows_in_unified_diff() {
        let home = TempDir::new().expect("home");
        track(home.path(), vec![], &["admins"]);
        let path = manifest(&home, "groups: [readers]\n");
        let d = diff(home.path(), "alice", &path).expect("diff");
        assert!(d.unified_diff.contains("--- a/alice (observed)"));
        assert!(d.unified_diff.contains("-group admins"));
        assert!(d.unified_diff.contains("+group readers"));
        assert!(d.unified_diff.contains("@@"));
    }

    #[test]
    fn untracked_name_is_all_additions() {
        let home = TempDir::new().expect("home");
        let path = manifest(&home, "groups: [ops]\n");
        let d = diff(home.path(), "alice", &path).expect("diff");
        assert!(d.unified_diff.contains("+group ops"));
        assert!(!d.unified_diff.contains("\n-group"));
    }
}
