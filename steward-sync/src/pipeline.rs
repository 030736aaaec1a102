//! Store-backed entrypoints used by the CLI.
//!
//! Each function loads what it needs from the state store, drives a
//! [`Lifecycle`], and writes the outcome back. Remote calls only happen
//! after the manifest has been parsed and validated.

use std::path::{Path, PathBuf};

use chrono::Utc;
use tracing::{info, warn};

use steward_core::{manifest, CoreError, DesiredState, ObservedState, ResourceIdentity};

use crate::client::DirectoryClient;
use crate::error::{io_err, SyncError};
use crate::lifecycle::{Lifecycle, ResourceState};
use crate::plan::{forces_replacement, plan, Plan};
use crate::store::{self, StateDocument};

// ---------------------------------------------------------------------------
// Manifest loading
// ---------------------------------------------------------------------------

/// A validated manifest plus the fingerprint of the bytes it came from.
#[derive(Debug, Clone)]
pub struct LoadedManifest {
    pub path: PathBuf,
    pub desired: DesiredState,
    pub sha256: String,
}

/// Read, parse and validate a manifest.
pub fn load_manifest(path: &Path) -> Result<LoadedManifest, SyncError> {
    let contents = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(CoreError::ManifestNotFound {
                path: path.to_path_buf(),
            }
            .into())
        }
        Err(e) => return Err(io_err(path, e)),
    };
    let desired = manifest::parse(path, &contents)?.into_desired()?;
    Ok(LoadedManifest {
        path: path.to_path_buf(),
        desired,
        sha256: store::fingerprint(&contents),
    })
}

// ---------------------------------------------------------------------------
// Plan / apply
// ---------------------------------------------------------------------------

/// What `apply` did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApplyOutcome {
    Created {
        identity: ResourceIdentity,
    },
    Updated {
        identity: ResourceIdentity,
    },
    /// Nothing to change; the observed state was refreshed.
    Unchanged {
        identity: ResourceIdentity,
    },
    Replaced {
        from: ResourceIdentity,
        to: ResourceIdentity,
    },
}

impl ApplyOutcome {
    pub fn identity(&self) -> &ResourceIdentity {
        match self {
            ApplyOutcome::Created { identity }
            | ApplyOutcome::Updated { identity }
            | ApplyOutcome::Unchanged { identity } => identity,
            ApplyOutcome::Replaced { to, .. } => to,
        }
    }
}

/// Preview what [`apply`] would do for `name`. No remote calls.
pub fn plan_for(home: &Path, name: &str, manifest_path: &Path) -> Result<Plan, SyncError> {
    let loaded = load_manifest(manifest_path)?;
    let stored = store::load_at(home, name)?;
    let baseline = stored.as_ref().map(|doc| baseline(doc, &loaded.desired));
    Ok(plan(baseline.as_ref(), &loaded.desired))
}

/// Converge the user tracked as `name` to the manifest at `manifest_path`.
///
/// Untracked names are created. A changed `pool_id`, `username` or
/// `validation_data` deletes the old user before creating the new one. An
/// update that finds the user gone fails with [`SyncError::ResourceNotFound`]
/// instead of recreating it.
///
/// A create that fails after `CreateUser` still records the user, with only
/// the groups that were added, so `destroy` can reach it and the next apply
/// finishes the job as an update.
pub fn apply<C: DirectoryClient + ?Sized>(
    home: &Path,
    client: &C,
    name: &str,
    manifest_path: &Path,
) -> Result<ApplyOutcome, SyncError> {
    store::validate_name(name)?;
    let loaded = load_manifest(manifest_path)?;
    let previous = store::load_at(home, name)?;
    let lifecycle = Lifecycle::new(client);

    let (state, outcome) = match previous {
        None => {
            ensure_unclaimed(home, name, &loaded.desired)?;
            let state = create_tracked(&lifecycle, home, name, &loaded)?;
            let identity = present_identity(&state, &loaded.desired)?;
            (state, ApplyOutcome::Created { identity })
        }
        Some(prev) => {
            let applied = baseline(&prev, &loaded.desired);
            if forces_replacement(&applied, &loaded.desired) {
                ensure_unclaimed(home, name, &loaded.desired)?;
                info!(name, from = %prev.identity, to = %loaded.desired.identity(), "create-only field changed; replacing user");
                lifecycle.delete(&prev.identity)?;
                store::remove_at(home, name)?;
                let state = create_tracked(&lifecycle, home, name, &loaded)?;
                let to = present_identity(&state, &loaded.desired)?;
                (
                    state,
                    ApplyOutcome::Replaced {
                        from: prev.identity,
                        to,
                    },
                )
            } else {
                let unchanged = plan(Some(&applied), &loaded.desired).is_empty();
                let state = lifecycle.update(&prev.identity, &applied, &loaded.desired)?;
                let identity = prev.identity;
                let outcome = if unchanged {
                    ApplyOutcome::Unchanged { identity }
                } else {
                    ApplyOutcome::Updated { identity }
                };
                (state, outcome)
            }
        }
    };

    let doc = StateDocument {
        identity: outcome.identity().clone(),
        applied: loaded.desired,
        manifest_sha256: loaded.sha256,
        manifest_path: Some(absolute(&loaded.path)),
        applied_at: Utc::now(),
        observed: state.observed().cloned(),
    };
    store::save_at(home, name, &doc)?;
    Ok(outcome)
}

/// What the stored state says was last applied, as the starting point for
/// `desired`. Imports never declared `validation_data`, so theirs is taken
/// from the manifest instead of forcing a replacement.
fn baseline(doc: &StateDocument, desired: &DesiredState) -> DesiredState {
    let mut applied = doc.applied.clone();
    if doc.manifest_path.is_none() {
        applied.validation_data = desired.validation_data.clone();
    }
    applied
}

/// Refuse to create a user that another name already tracks.
fn ensure_unclaimed(home: &Path, name: &str, desired: &DesiredState) -> Result<(), SyncError> {
    let identity = desired.identity();
    for (other, doc) in store::list_at(home)? {
        if other != name && (doc.identity == identity || doc.applied.identity() == identity) {
            warn!(name, other = %other, identity = %doc.identity, "user already tracked under another name");
            return Err(SyncError::AlreadyTracked {
                name: other,
                identity: doc.identity,
            });
        }
    }
    Ok(())
}

/// Run a create, recording the user even when it only partly succeeded.
fn create_tracked<C: DirectoryClient + ?Sized>(
    lifecycle: &Lifecycle<'_, C>,
    home: &Path,
    name: &str,
    loaded: &LoadedManifest,
) -> Result<ResourceState, SyncError> {
    match lifecycle.create(&loaded.desired) {
        Err(SyncError::PartialCreate {
            identity,
            groups_added,
            source,
        }) => {
            let mut applied = loaded.desired.clone();
            applied.groups = groups_added.clone();
            let doc = StateDocument {
                identity: identity.clone(),
                applied,
                // Empty until an apply completes, so status keeps it pending.
                manifest_sha256: String::new(),
                manifest_path: Some(absolute(&loaded.path)),
                applied_at: Utc::now(),
                observed: None,
            };
            store::save_at(home, name, &doc)?;
            warn!(name, identity = %identity, "recorded incomplete user; apply again or destroy it");
            Err(SyncError::PartialCreate {
                identity,
                groups_added,
                source,
            })
        }
        other => other,
    }
}

/// The user was created but vanished before it could be read back.
fn present_identity(
    state: &ResourceState,
    desired: &DesiredState,
) -> Result<ResourceIdentity, SyncError> {
    match state {
        ResourceState::Present { identity, .. } => Ok(identity.clone()),
        ResourceState::Absent => Err(SyncError::ResourceNotFound {
            identity: desired.identity(),
        }),
    }
}

fn absolute(path: &Path) -> PathBuf {
    std::fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
}

// ---------------------------------------------------------------------------
// Refresh / destroy / import
// ---------------------------------------------------------------------------

/// What `refresh` found.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// The user was deleted out of band; its state has been dropped.
    Gone { identity: ResourceIdentity },
    Present {
        identity: ResourceIdentity,
        observed: ObservedState,
    },
}

/// Re-read the tracked user and record what was observed.
pub fn refresh<C: DirectoryClient + ?Sized>(
    home: &Path,
    client: &C,
    name: &str,
) -> Result<RefreshOutcome, SyncError> {
    let mut doc = tracked(home, name)?;
    let prior_groups = doc.observed.as_ref().and_then(|o| o.groups.as_ref());
    match Lifecycle::new(client).read(&doc.identity, prior_groups)? {
        ResourceState::Absent => {
            warn!(name, identity = %doc.identity, "user deleted outside steward; forgetting it");
            store::remove_at(home, name)?;
            Ok(RefreshOutcome::Gone {
                identity: doc.identity,
            })
        }
        ResourceState::Present { identity, observed } => {
            doc.observed = Some(observed.clone());
            store::save_at(home, name, &doc)?;
            Ok(RefreshOutcome::Present { identity, observed })
        }
    }
}

/// Delete the tracked user and forget it. Returns `false` for an untracked name.
pub fn destroy<C: DirectoryClient + ?Sized>(
    home: &Path,
    client: &C,
    name: &str,
) -> Result<bool, SyncError> {
    let Some(doc) = store::load_at(home, name)? else {
        info!(name, "nothing to destroy");
        return Ok(false);
    };
    Lifecycle::new(client).delete(&doc.identity)?;
    store::remove_at(home, name)
}

/// Adopt an existing user under `name` from its `<pool_id>/<username>` id.
pub fn import<C: DirectoryClient + ?Sized>(
    home: &Path,
    client: &C,
    name: &str,
    raw_id: &str,
) -> Result<StateDocument, SyncError> {
    if let Some(existing) = store::load_at(home, name)? {
        return Err(SyncError::AlreadyTracked {
            name: name.to_string(),
            identity: existing.identity,
        });
    }
    let imported = Lifecycle::new(client).import(raw_id)?;
    ensure_unclaimed(home, name, &imported.desired)?;
    let ResourceState::Present { identity, observed } = imported.state else {
        return Err(SyncError::ResourceNotFound {
            identity: imported.desired.identity(),
        });
    };

    let doc = StateDocument {
        identity,
        applied: imported.desired,
        manifest_sha256: String::new(),
        manifest_path: None,
        applied_at: Utc::now(),
        observed: Some(observed),
    };
    store::save_at(home, name, &doc)?;
    info!(name, identity = %doc.identity, "imported user");
    Ok(doc)
}

fn tracked(home: &Path, name: &str) -> Result<StateDocument, SyncError> {
    store::load_at(home, name)?.ok_or_else(|| SyncError::Untracked {
        name: name.to_string(),
    })
}
