//! In-memory [`DirectoryClient`] that records every call: exported for
//! integration tests.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use steward_core::{Attribute, ResourceIdentity, UserStatus, Username};

use crate::client::{ClientError, CreateUserRequest, DirectoryClient, Operation, RemoteUser};

/// One recorded remote call, in issue order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    CreateUser { username: String },
    GetUser,
    SetPassword { permanent: bool },
    UpdateAttributes { attributes: Vec<Attribute> },
    AddToGroup(String),
    RemoveFromGroup(String),
    ListGroupsForUser,
    DeleteUser,
}

impl Call {
    pub fn operation(&self) -> Operation {
        match self {
            Call::CreateUser { .. } => Operation::CreateUser,
            Call::GetUser => Operation::GetUser,
            Call::SetPassword { .. } => Operation::SetPassword,
            Call::UpdateAttributes { .. } => Operation::UpdateAttributes,
            Call::AddToGroup(_) => Operation::AddToGroup,
            Call::RemoveFromGroup(_) => Operation::RemoveFromGroup,
            Call::ListGroupsForUser => Operation::ListGroupsForUser,
            Call::DeleteUser => Operation::DeleteUser,
        }
    }
}

#[derive(Debug, Clone)]
struct MockUser {
    status: UserStatus,
    attributes: Vec<Attribute>,
    groups: HashSet<String>,
}

/// Mock directory for tests.
#[derive(Default)]
pub struct MockDirectory {
    users: Mutex<HashMap<ResourceIdentity, MockUser>>,
    calls: Mutex<Vec<Call>>,
    failures: Mutex<HashMap<Operation, ClientError>>,
    group_failures: Mutex<HashSet<String>>,
    lowercase_usernames: bool,
}

impl MockDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulate a directory that normalizes usernames to lower case.
    pub fn lowercasing_usernames() -> Self {
        Self {
            lowercase_usernames: true,
            ..Self::default()
        }
    }

    /// Seed an existing user.
    pub fn with_user(
        self,
        identity: &ResourceIdentity,
        attributes: Vec<Attribute>,
        groups: &[&str],
    ) -> Self {
        self.lock_users().insert(
            identity.clone(),
            MockUser {
                status: UserStatus::Confirmed,
                attributes,
                groups: groups.iter().map(|g| g.to_string()).collect(),
            },
        );
        self
    }

    /// Make every call of `operation` fail with `error`.
    pub fn fail(&self, operation: Operation, error: ClientError) {
        self.failures
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(operation, error);
    }

    /// Make group add/remove calls for `group` fail with a service error.
    pub fn fail_group(&self, group: &str) {
        self.group_failures
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(group.to_string());
    }

    /// Stop every failure injected with [`fail`](Self::fail) or
    /// [`fail_group`](Self::fail_group).
    pub fn recover(&self) {
        self.failures.lock().unwrap_or_else(|e| e.into_inner()).clear();
        self.group_failures
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clear();
    }

    /// Remove a user behind the engine's back (out-of-band deletion).
    pub fn forget(&self, identity: &ResourceIdentity) {
        self.lock_users().remove(identity);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Recorded calls without the read-back (`GetUser`, `ListGroupsForUser`).
    pub fn mutations(&self) -> Vec<Call> {
        self.calls()
            .into_iter()
            .filter(|c| !matches!(c, Call::GetUser | Call::ListGroupsForUser))
            .collect()
    }

    pub fn clear_calls(&self) {
        self.calls.lock().unwrap_or_else(|e| e.into_inner()).clear();
    }

    pub fn groups_of(&self, identity: &ResourceIdentity) -> Option<HashSet<String>> {
        self.lock_users().get(identity).map(|u| u.groups.clone())
    }

    pub fn attributes_of(&self, identity: &ResourceIdentity) -> Option<Vec<Attribute>> {
        self.lock_users().get(identity).map(|u| u.attributes.clone())
    }

    pub fn status_of(&self, identity: &ResourceIdentity) -> Option<UserStatus> {
        self.lock_users().get(identity).map(|u| u.status)
    }

    fn lock_users(&self) -> std::sync::MutexGuard<'_, HashMap<ResourceIdentity, MockUser>> {
        self.users.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn record(&self, call: Call) -> Result<(), ClientError> {
        let operation = call.operation();
        self.calls
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(call);
        match self
            .failures
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(&operation)
        {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }

    fn not_found(identity: &ResourceIdentity) -> ClientError {
        ClientError::NotFound {
            message: format!("User does not exist: {identity}"),
        }
    }

    fn with_existing<R>(
        &self,
        identity: &ResourceIdentity,
        f: impl FnOnce(&mut MockUser) -> R,
    ) -> Result<R, ClientError> {
        let mut users = self.lock_users();
        users
            .get_mut(identity)
            .map(f)
            .ok_or_else(|| Self::not_found(identity))
    }

    fn check_group(&self, group: &str) -> Result<(), ClientError> {
        if self
            .group_failures
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .contains(group)
        {
            return Err(ClientError::Service {
                code: "InternalErrorException".into(),
                message: format!("group {group} unavailable"),
            });
        }
        Ok(())
    }
}

impl DirectoryClient for MockDirectory {
    fn create_user(&self, request: &CreateUserRequest) -> Result<RemoteUser, ClientError> {
        self.record(Call::CreateUser {
            username: request.identity.username.0.clone(),
        })?;
        let username = if self.lowercase_usernames {
            request.identity.username.0.to_lowercase()
        } else {
            request.identity.username.0.clone()
        };
        let identity = ResourceIdentity::new(
            request.identity.pool_id.clone(),
            Username::from(username.clone()),
        );
        let mut users = self.lock_users();
        if users.contains_key(&identity) {
            return Err(ClientError::Service {
                code: "UsernameExistsException".into(),
                message: "User account already exists".into(),
            });
        }
        let status = if request.temporary_password.is_some() {
            UserStatus::ForceChangePassword
        } else {
            UserStatus::Unconfirmed
        };
        users.insert(
            identity,
            MockUser {
                status,
                attributes: request.user_attributes.clone(),
                groups: HashSet::new(),
            },
        );
        Ok(RemoteUser {
            username,
            enabled: true,
            status,
            attributes: request.user_attributes.clone(),
        })
    }

    fn get_user(&self, identity: &ResourceIdentity) -> Result<RemoteUser, ClientError> {
        self.record(Call::GetUser)?;
        self.with_existing(identity, |u| RemoteUser {
            username: identity.username.0.clone(),
            enabled: true,
            status: u.status,
            attributes: u.attributes.clone(),
        })
    }

    fn set_password(
        &self,
        identity: &ResourceIdentity,
        _password: &str,
        permanent: bool,
    ) -> Result<(), ClientError> {
        self.record(Call::SetPassword { permanent })?;
        self.with_existing(identity, |u| {
            u.status = if permanent {
                UserStatus::Confirmed
            } else {
                UserStatus::ForceChangePassword
            };
        })
    }

    fn update_attributes(
        &self,
        identity: &ResourceIdentity,
        attributes: &[Attribute],
    ) -> Result<(), ClientError> {
        self.record(Call::UpdateAttributes {
            attributes: attributes.to_vec(),
        })?;
        self.with_existing(identity, |u| u.attributes = attributes.to_vec())
    }

    fn add_to_group(&self, identity: &ResourceIdentity, group: &str) -> Result<(), ClientError> {
        self.record(Call::AddToGroup(group.to_string()))?;
        self.check_group(group)?;
        self.with_existing(identity, |u| {
            u.groups.insert(group.to_string());
        })
    }

    fn remove_from_group(
        &self,
        identity: &ResourceIdentity,
        group: &str,
    ) -> Result<(), ClientError> {
        self.record(Call::RemoveFromGroup(group.to_string()))?;
        self.check_group(group)?;
        self.with_existing(identity, |u| {
            u.groups.remove(group);
        })
    }

    fn list_groups_for_user(
        &self,
        identity: &ResourceIdentity,
    ) -> Result<Vec<String>, ClientError> {
        self.record(Call::ListGroupsForUser)?;
        self.with_existing(identity, |u| {
            let mut groups: Vec<String> = u.groups.iter().cloned().collect();
            groups.sort();
            groups
        })
    }

    fn delete_user(&self, identity: &ResourceIdentity) -> Result<(), ClientError> {
        self.record(Call::DeleteUser)?;
        self.lock_users()
            .remove(identity)
            .map(|_| ())
            .ok_or_else(|| Self::not_found(identity))
    }
}
