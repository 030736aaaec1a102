//! Lifecycle orchestration for one managed user.
//!
//! ```text
//! Absent ─create─▶ Creating ─▶ Present ─update─▶ Updating ─▶ Present
//!    ▲                            │  │
//!    └──── read finds it gone ────┘  └─delete─▶ Deleting ─▶ Absent
//! ```
//!
//! Every remote call is issued sequentially and blocks until it returns.
//! Nothing here locks: callers serialize operations per identity.

use std::collections::HashSet;
use std::fmt;

use tracing::{debug, info, warn};

use steward_core::{DesiredState, ObservedState, ResourceIdentity, Username};

use crate::client::{ClientError, CreateUserRequest, DirectoryClient, Operation, RemoteUser};
use crate::error::{remote_err, SyncError};
use crate::plan::forces_replacement;
use crate::reconcile::{attributes_changed, reconcile};

/// Lifecycle phase of a managed user, used for transition logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Absent,
    Creating,
    Present,
    Updating,
    Deleting,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Phase::Absent => "absent",
            Phase::Creating => "creating",
            Phase::Present => "present",
            Phase::Updating => "updating",
            Phase::Deleting => "deleting",
        };
        f.write_str(s)
    }
}

/// Where a user stands once an operation has settled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResourceState {
    /// The user does not exist remotely (never created, deleted, or drifted away).
    Absent,
    Present {
        identity: ResourceIdentity,
        observed: ObservedState,
    },
}

impl ResourceState {
    pub fn is_absent(&self) -> bool {
        matches!(self, ResourceState::Absent)
    }

    pub fn observed(&self) -> Option<&ObservedState> {
        match self {
            ResourceState::Absent => None,
            ResourceState::Present { observed, .. } => Some(observed),
        }
    }
}

/// Outcome of the best-effort group listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GroupListing {
    Listed(HashSet<String>),
    Unavailable { reason: ClientError },
}

/// A successful read: the primary user record plus the group enrichment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Observation {
    pub user: RemoteUser,
    pub groups: GroupListing,
}

impl Observation {
    /// Collapse into an [`ObservedState`]. When the listing failed, `prior`
    /// groups are carried over unchanged.
    pub fn into_observed(self, prior: Option<&HashSet<String>>) -> ObservedState {
        let groups = match self.groups {
            GroupListing::Listed(groups) => Some(groups),
            GroupListing::Unavailable { .. } => prior.cloned(),
        };
        ObservedState {
            enabled: self.user.enabled,
            status: self.user.status,
            user_attributes: self.user.attributes,
            groups,
        }
    }
}

/// Result of adopting an existing user by identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Imported {
    pub desired: DesiredState,
    pub state: ResourceState,
}

/// Drives create / read / update / delete / import against a directory.
pub struct Lifecycle<'a, C: DirectoryClient + ?Sized> {
    client: &'a C,
}

impl<'a, C: DirectoryClient + ?Sized> Lifecycle<'a, C> {
    pub fn new(client: &'a C) -> Self {
        Self { client }
    }

    /// Create the user, assign its groups, finalize its credential, read it back.
    ///
    /// A failure after `CreateUser` leaves the user in place with whatever
    /// groups were added; there is no rollback. That case is reported as
    /// [`SyncError::PartialCreate`] so the caller can keep tracking the user.
    pub fn create(&self, desired: &DesiredState) -> Result<ResourceState, SyncError> {
        let requested = desired.identity();
        transition(&requested, Phase::Absent, Phase::Creating);

        debug!(identity = %requested, "issuing {}", Operation::CreateUser);
        let request = CreateUserRequest::from_desired(desired);
        let created = self
            .client
            .create_user(&request)
            .map_err(|source| SyncError::RemoteCallFailed {
                operation: Operation::CreateUser,
                identity: requested.clone(),
                source,
            })?;

        // The directory may normalize the username; the returned one is canonical.
        let identity = ResourceIdentity::new(
            desired.pool_id.clone(),
            Username::from(created.username),
        );
        if identity != requested {
            info!(requested = %requested, created = %identity, "directory normalized username");
        }

        let mut groups_added = HashSet::new();
        for group in desired.sorted_groups() {
            debug!(identity = %identity, group, "issuing {}", Operation::AddToGroup);
            if let Err(e) = self.client.add_to_group(&identity, group) {
                let source = remote_err(Operation::AddToGroup, &identity, e);
                return Err(partial_create(identity, groups_added, source));
            }
            groups_added.insert(group.to_string());
        }

        if let Some(password) = desired.password.permanent() {
            debug!(identity = %identity, "issuing {} (permanent)", Operation::SetPassword);
            if let Err(e) = self.client.set_password(&identity, password, true) {
                let source = remote_err(Operation::SetPassword, &identity, e);
                return Err(partial_create(identity, groups_added, source));
            }
        }

        transition(&identity, Phase::Creating, Phase::Present);
        self.read(&identity, None)
    }

    /// Fetch the user and its groups.
    ///
    /// Returns `Ok(None)` when the user no longer exists. A failed group
    /// listing is reported through [`GroupListing::Unavailable`], never as
    /// the read's own error.
    pub fn observe(&self, identity: &ResourceIdentity) -> Result<Option<Observation>, SyncError> {
        debug!(identity = %identity, "issuing {}", Operation::GetUser);
        let user = match self.client.get_user(identity) {
            Ok(user) => user,
            Err(e) if e.is_not_found() => return Ok(None),
            Err(e) => return Err(remote_err(Operation::GetUser, identity, e)),
        };

        debug!(identity = %identity, "issuing {}", Operation::ListGroupsForUser);
        let groups = match self.client.list_groups_for_user(identity) {
            Ok(groups) => GroupListing::Listed(groups.into_iter().collect()),
            Err(reason) => {
                warn!(identity = %identity, error = %reason, "could not list groups; keeping previous membership");
                GroupListing::Unavailable { reason }
            }
        };

        Ok(Some(Observation { user, groups }))
    }

    /// Refresh the observed state. A user that is gone is reported as
    /// [`ResourceState::Absent`], not as an error.
    pub fn read(
        &self,
        identity: &ResourceIdentity,
        prior_groups: Option<&HashSet<String>>,
    ) -> Result<ResourceState, SyncError> {
        match self.observe(identity)? {
            Some(observation) => Ok(ResourceState::Present {
                identity: identity.clone(),
                observed: observation.into_observed(prior_groups),
            }),
            None => {
                warn!(identity = %identity, "user is already gone");
                transition(identity, Phase::Present, Phase::Absent);
                Ok(ResourceState::Absent)
            }
        }
    }

    /// Converge an existing user from `previous` to `desired`.
    ///
    /// Attributes are replaced as a whole list when they differ; a failure
    /// there aborts. Group calls run additions first, then removals; each is
    /// attempted even if an earlier one failed, and the first failure is
    /// returned once all have run. The read-back is skipped on failure.
    pub fn update(
        &self,
        identity: &ResourceIdentity,
        previous: &DesiredState,
        desired: &DesiredState,
    ) -> Result<ResourceState, SyncError> {
        if forces_replacement(previous, desired) {
            return Err(SyncError::ReplacementRequired {
                from: previous.identity(),
                to: desired.identity(),
            });
        }
        transition(identity, Phase::Present, Phase::Updating);

        if attributes_changed(&previous.user_attributes, &desired.user_attributes) {
            debug!(identity = %identity, count = desired.user_attributes.len(), "issuing {}", Operation::UpdateAttributes);
            self.client
                .update_attributes(identity, &desired.user_attributes)
                .map_err(|e| remote_err(Operation::UpdateAttributes, identity, e))?;
        }

        let delta = reconcile(&previous.groups, &desired.groups).sorted();
        let mut failures = Vec::new();
        for group in &delta.to_add {
            debug!(identity = %identity, group = %group, "issuing {}", Operation::AddToGroup);
            if let Err(e) = self.client.add_to_group(identity, group) {
                warn!(identity = %identity, group = %group, error = %e, "group add failed");
                failures.push(remote_err(Operation::AddToGroup, identity, e));
            }
        }
        for group in &delta.to_remove {
            debug!(identity = %identity, group = %group, "issuing {}", Operation::RemoveFromGroup);
            if let Err(e) = self.client.remove_from_group(identity, group) {
                warn!(identity = %identity, group = %group, error = %e, "group removal failed");
                failures.push(remote_err(Operation::RemoveFromGroup, identity, e));
            }
        }
        if let Some(first) = failures.into_iter().next() {
            return Err(first);
        }

        transition(identity, Phase::Updating, Phase::Present);
        // Every group call succeeded, so the declared set is the best prior.
        match self.read(identity, Some(&desired.groups))? {
            ResourceState::Absent => Err(SyncError::ResourceNotFound {
                identity: identity.clone(),
            }),
            present => Ok(present),
        }
    }

    /// Delete the user. A user that is already gone counts as deleted.
    pub fn delete(&self, identity: &ResourceIdentity) -> Result<ResourceState, SyncError> {
        transition(identity, Phase::Present, Phase::Deleting);
        debug!(identity = %identity, "issuing {}", Operation::DeleteUser);
        match self.client.delete_user(identity) {
            Ok(()) => {}
            Err(e) if e.is_not_found() => {
                info!(identity = %identity, "user already deleted");
            }
            Err(source) => {
                return Err(SyncError::RemoteCallFailed {
                    operation: Operation::DeleteUser,
                    identity: identity.clone(),
                    source,
                })
            }
        }
        transition(identity, Phase::Deleting, Phase::Absent);
        Ok(ResourceState::Absent)
    }

    /// Adopt an existing user from its `<pool_id>/<username>` identifier.
    ///
    /// The returned declaration carries the identity plus whatever the read
    /// hydrated (attributes and listed groups).
    pub fn import(&self, raw_id: &str) -> Result<Imported, SyncError> {
        let identity = ResourceIdentity::decode(raw_id)?;
        let mut desired = DesiredState::new(identity.pool_id.clone(), identity.username.clone());
        let state = self.read(&identity, None)?;
        if let Some(observed) = state.observed() {
            desired.user_attributes = observed.user_attributes.clone();
            desired.groups = observed.groups.clone().unwrap_or_default();
        }
        Ok(Imported { desired, state })
    }
}

fn partial_create(
    identity: ResourceIdentity,
    groups_added: HashSet<String>,
    source: SyncError,
) -> SyncError {
    warn!(identity = %identity, error = %source, "user created but left incomplete");
    SyncError::PartialCreate {
        identity,
        groups_added,
        source: Box::new(source),
    }
}

fn transition(identity: &ResourceIdentity, from: Phase, to: Phase) {
    info!(identity = %identity, %from, %to, "lifecycle transition");
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
