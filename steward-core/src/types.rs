//! Domain types for a managed directory user.
//!
//! Unordered remote collections (groups, delivery mediums) are `HashSet`s so
//! reordering never shows up as a change. Attribute lists keep their declared
//! order because the remote call replaces the whole list.

use std::collections::{BTreeMap, HashSet};
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::identity::ResourceIdentity;

// ---------------------------------------------------------------------------
// Newtypes
// ---------------------------------------------------------------------------

/// Identifier of the user pool (directory) a user lives in.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PoolId(pub String);

impl fmt::Display for PoolId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<String> for PoolId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for PoolId {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

/// Login name of a user inside a pool.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Username(pub String);

impl fmt::Display for Username {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<String> for Username {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for Username {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

// ---------------------------------------------------------------------------
// Enums
// ---------------------------------------------------------------------------

/// What the directory does with the invitation message on creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum MessageAction {
    Resend,
    Suppress,
}

impl fmt::Display for MessageAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MessageAction::Resend => write!(f, "RESEND"),
            MessageAction::Suppress => write!(f, "SUPPRESS"),
        }
    }
}

/// Channel used to deliver the welcome message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum DeliveryMedium {
    Sms,
    Email,
}

impl fmt::Display for DeliveryMedium {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeliveryMedium::Sms => write!(f, "SMS"),
            DeliveryMedium::Email => write!(f, "EMAIL"),
        }
    }
}

/// Account status as reported by the directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UserStatus {
    Unconfirmed,
    Confirmed,
    Archived,
    Compromised,
    ResetRequired,
    ForceChangePassword,
    #[default]
    #[serde(other)]
    Unknown,
}

impl fmt::Display for UserStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            UserStatus::Unconfirmed => "UNCONFIRMED",
            UserStatus::Confirmed => "CONFIRMED",
            UserStatus::Archived => "ARCHIVED",
            UserStatus::Compromised => "COMPROMISED",
            UserStatus::ResetRequired => "RESET_REQUIRED",
            UserStatus::ForceChangePassword => "FORCE_CHANGE_PASSWORD",
            UserStatus::Unknown => "UNKNOWN",
        };
        f.write_str(s)
    }
}

// ---------------------------------------------------------------------------
// Attributes and credentials
// ---------------------------------------------------------------------------

/// A single name/value pair (user attribute or validation datum).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Attribute {
    pub name: String,
    pub value: String,
}

impl Attribute {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// Initial credential for a new user. Temporary and permanent passwords are
/// mutually exclusive, so they share one slot.
#[derive(Clone, PartialEq, Eq, Default)]
pub enum PasswordPolicy {
    #[default]
    Unset,
    /// Sent with the create call; the user must change it on first sign-in.
    Temporary(String),
    /// Set after creation and groups, marking the account confirmed.
    Permanent(String),
}

impl PasswordPolicy {
    /// Fold the two optional schema fields into one policy.
    ///
    /// Returns [`CoreError::ConflictingFields`] when both are supplied.
    pub fn from_fields(
        temporary: Option<String>,
        permanent: Option<String>,
    ) -> Result<Self, CoreError> {
        match (temporary, permanent) {
            (Some(_), Some(_)) => Err(CoreError::ConflictingFields {
                first: "temporary_password",
                second: "permanent_password",
            }),
            (Some(t), None) => Ok(Self::Temporary(t)),
            (None, Some(p)) => Ok(Self::Permanent(p)),
            (None, None) => Ok(Self::Unset),
        }
    }

    pub fn temporary(&self) -> Option<&str> {
        match self {
            Self::Temporary(t) => Some(t),
            _ => None,
        }
    }

    pub fn permanent(&self) -> Option<&str> {
        match self {
            Self::Permanent(p) => Some(p),
            _ => None,
        }
    }
}

impl fmt::Debug for PasswordPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unset => write!(f, "Unset"),
            Self::Temporary(_) => write!(f, "Temporary(<redacted>)"),
            Self::Permanent(_) => write!(f, "Permanent(<redacted>)"),
        }
    }
}

// ---------------------------------------------------------------------------
// Desired / observed state
// ---------------------------------------------------------------------------

/// The validated target configuration for one user.
///
/// `password` is never serialized: credentials are create-time inputs and
/// must not reach the state store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DesiredState {
    pub username: Username,
    pub pool_id: PoolId,
    #[serde(skip)]
    pub password: PasswordPolicy,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message_action: Option<MessageAction>,
    #[serde(default)]
    pub force_alias_creation: bool,
    #[serde(default)]
    pub desired_delivery_mediums: HashSet<DeliveryMedium>,
    #[serde(default)]
    pub client_metadata: BTreeMap<String, String>,
    #[serde(default)]
    pub validation_data: Vec<Attribute>,
    #[serde(default)]
    pub user_attributes: Vec<Attribute>,
    #[serde(default)]
    pub groups: HashSet<String>,
}

impl DesiredState {
    /// A declaration carrying only the identity; every optional field empty.
    pub fn new(pool_id: PoolId, username: Username) -> Self {
        Self {
            username,
            pool_id,
            password: PasswordPolicy::Unset,
            message_action: None,
            force_alias_creation: false,
            desired_delivery_mediums: HashSet::new(),
            client_metadata: BTreeMap::new(),
            validation_data: Vec::new(),
            user_attributes: Vec::new(),
            groups: HashSet::new(),
        }
    }

    pub fn identity(&self) -> ResourceIdentity {
        ResourceIdentity::new(self.pool_id.clone(), self.username.clone())
    }

    /// Groups in a stable order, for display and deterministic call sequences.
    pub fn sorted_groups(&self) -> Vec<&str> {
        let mut groups: Vec<&str> = self.groups.iter().map(String::as_str).collect();
        groups.sort_unstable();
        groups
    }
}

/// Last-known remote snapshot of a user. Each read replaces it wholesale.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ObservedState {
    pub enabled: bool,
    pub status: UserStatus,
    #[serde(default)]
    pub user_attributes: Vec<Attribute>,
    /// `None` when group membership has never been listed successfully.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub groups: Option<HashSet<String>>,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn newtype_display() {
        assert_eq!(PoolId::from("eu-west-1_abc").to_string(), "eu-west-1_abc");
        assert_eq!(Username::from("alice").to_string(), "alice");
    }

    #[test]
    fn password_policy_rejects_both_fields() {
        let err = PasswordPolicy::from_fields(Some("tmp-Pass1".into()), Some("perm-Pass1".into()))
            .unwrap_err();
        assert!(matches!(err, CoreError::ConflictingFields { .. }));
        assert!(err.to_string().contains("mutually exclusive"));
    }

    #[test]
    fn password_policy_from_single_field() {
        let t = PasswordPolicy::from_fields(Some("tmp".into()), None).unwrap();
        assert_eq!(t.temporary(), Some("tmp"));
        assert_eq!(t.permanent(), None);
        let p = PasswordPolicy::from_fields(None, Some("perm".into())).unwrap();
        assert_eq!(p.permanent(), Some("perm"));
        assert_eq!(PasswordPolicy::from_fields(None, None).unwrap(), PasswordPolicy::Unset);
    }

    #[test]
    fn password_policy_debug_is_redacted() {
        let p = PasswordPolicy::Permanent("hunter2-secret".into());
        assert!(!format!("{p:?}").contains("hunter2"));
    }

    #[test]
    fn desired_state_never_serializes_password() {
        let mut desired = DesiredState::new("pool_1".into(), "alice".into());
        desired.password = PasswordPolicy::Temporary("Sup3r-secret".into());
        let yaml = serde_yaml::to_string(&desired).expect("serialize");
        assert!(!yaml.contains("Sup3r-secret"));
        let back: DesiredState = serde_yaml::from_str(&yaml).expect("deserialize");
        assert_eq!(back.password, PasswordPolicy::Unset);
        assert_eq!(back.identity(), desired.identity());
    }

    #[test]
    fn unknown_user_status_deserializes_as_unknown() {
        let status: UserStatus = serde_yaml::from_str("EXTERNAL_PROVIDER").expect("parse");
        assert_eq!(status, UserStatus::Unknown);
        let status: UserStatus = serde_yaml::from_str("FORCE_CHANGE_PASSWORD").expect("parse");
        assert_eq!(status, UserStatus::ForceChangePassword);
    }

    #[test]
    fn sorted_groups_is_stable() {
        let mut desired = DesiredState::new("pool_1".into(), "alice".into());
        desired.groups = ["readers", "admins", "ops"].iter().map(|s| s.to_string()).collect();
        assert_eq!(desired.sorted_groups(), vec!["admins", "ops", "readers"]);
    }
}
