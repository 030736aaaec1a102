//! The remote directory, seen as a set of named blocking operations.
//!
//! Implementations own transport, signing and retries. The engine only needs
//! one guarantee: a missing user is reported as [`ClientError::NotFound`] and
//! never folded into another variant, because that is what drives drift
//! detection.

use std::collections::BTreeMap;
use std::fmt;

use thiserror::Error;

use steward_core::{
    Attribute, DeliveryMedium, DesiredState, MessageAction, ResourceIdentity, UserStatus,
};

/// Named remote operations, used in errors, logs and plans.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Operation {
    CreateUser,
    GetUser,
    SetPassword,
    UpdateAttributes,
    AddToGroup,
    RemoveFromGroup,
    ListGroupsForUser,
    DeleteUser,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Operation::CreateUser => "CreateUser",
            Operation::GetUser => "GetUser",
            Operation::SetPassword => "SetPassword",
            Operation::UpdateAttributes => "UpdateAttributes",
            Operation::AddToGroup => "AddToGroup",
            Operation::RemoveFromGroup => "RemoveFromGroup",
            Operation::ListGroupsForUser => "ListGroupsForUser",
            Operation::DeleteUser => "DeleteUser",
        };
        f.write_str(s)
    }
}

/// Failure reported by a [`DirectoryClient`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClientError {
    /// The user (or the pool holding it) does not exist.
    #[error("not found: {message}")]
    NotFound { message: String },

    /// The service rejected the request.
    #[error("{code}: {message}")]
    Service { code: String, message: String },

    /// The request never produced a service response.
    #[error("transport error: {0}")]
    Transport(String),

    /// The response could not be decoded.
    #[error("malformed response: {0}")]
    Decode(String),
}

impl ClientError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, ClientError::NotFound { .. })
    }
}

/// Everything the create call carries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateUserRequest {
    pub identity: ResourceIdentity,
    pub temporary_password: Option<String>,
    pub message_action: Option<MessageAction>,
    pub force_alias_creation: bool,
    pub desired_delivery_mediums: Vec<DeliveryMedium>,
    pub client_metadata: BTreeMap<String, String>,
    pub validation_data: Vec<Attribute>,
    pub user_attributes: Vec<Attribute>,
}

impl CreateUserRequest {
    /// Build the create call for `desired`. A permanent password is not part
    /// of it; it is set after group assignment.
    pub fn from_desired(desired: &DesiredState) -> Self {
        let mut mediums: Vec<DeliveryMedium> =
            desired.desired_delivery_mediums.iter().copied().collect();
        mediums.sort_unstable();
        Self {
            identity: desired.identity(),
            temporary_password: desired.password.temporary().map(str::to_owned),
            message_action: desired.message_action,
            force_alias_creation: desired.force_alias_creation,
            desired_delivery_mediums: mediums,
            client_metadata: desired.client_metadata.clone(),
            validation_data: desired.validation_data.clone(),
            user_attributes: desired.user_attributes.clone(),
        }
    }
}

/// A user as the directory reports it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteUser {
    /// May differ from the requested name when the directory normalizes it.
    pub username: String,
    pub enabled: bool,
    pub status: UserStatus,
    pub attributes: Vec<Attribute>,
}

/// Blocking RPC surface of the directory service.
pub trait DirectoryClient: Send + Sync {
    fn create_user(&self, request: &CreateUserRequest) -> Result<RemoteUser, ClientError>;

    fn get_user(&self, identity: &ResourceIdentity) -> Result<RemoteUser, ClientError>;

    fn set_password(
        &self,
        identity: &ResourceIdentity,
        password: &str,
        permanent: bool,
    ) -> Result<(), ClientError>;

    /// Replaces the listed attributes with the given values.
    fn update_attributes(
        &self,
        identity: &ResourceIdentity,
        attributes: &[Attribute],
    ) -> Result<(), ClientError>;

    fn add_to_group(&self, identity: &ResourceIdentity, group: &str) -> Result<(), ClientError>;

    fn remove_from_group(&self, identity: &ResourceIdentity, group: &str)
        -> Result<(), ClientError>;

    fn list_groups_for_user(&self, identity: &ResourceIdentity)
        -> Result<Vec<String>, ClientError>;

    fn delete_user(&self, identity: &ResourceIdentity) -> Result<(), ClientError>;
}
