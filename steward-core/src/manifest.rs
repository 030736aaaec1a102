//! YAML declaration of a managed user and its validation.
//!
//! ```yaml
//! pool_id: eu-west-1_Ab12Cd34
//! username: alice
//! permanent_password: "Correct-Horse-9"
//! message_action: SUPPRESS
//! desired_delivery_mediums: [EMAIL]
//! user_attributes:
//!   - { name: email, value: alice@example.com }
//! groups: [admins, readers]
//! ```
//!
//! A manifest mirrors the schema surface, so both password fields exist here;
//! [`UserManifest::into_desired`] folds them into a [`PasswordPolicy`].

use std::collections::{BTreeMap, HashSet};
use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::types::{
    Attribute, DeliveryMedium, DesiredState, MessageAction, PasswordPolicy, PoolId, Username,
};

static NAME_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[\p{L}\p{M}\p{S}\p{N}\p{P}]+$").expect("NAME_RE is a valid regex pattern")
});

static POOL_ID_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[\w-]+_[0-9a-zA-Z]+$").expect("POOL_ID_RE is a valid regex pattern")
});

static PASSWORD_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\S(.*\S)?$").expect("PASSWORD_RE is a valid regex pattern")
});

const USERNAME_MAX: usize = 128;
const POOL_ID_MAX: usize = 55;
const PASSWORD_MIN: usize = 6;
const PASSWORD_MAX: usize = 256;
const ATTRIBUTE_NAME_MAX: usize = 32;
const ATTRIBUTE_VALUE_MAX: usize = 2048;

/// A user declaration as written on disk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UserManifest {
    #[serde(alias = "user_pool_id")]
    pub pool_id: String,
    pub username: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temporary_password: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub permanent_password: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message_action: Option<MessageAction>,
    #[serde(default)]
    pub force_alias_creation: bool,
    #[serde(default)]
    pub desired_delivery_mediums: Vec<DeliveryMedium>,
    #[serde(default)]
    pub client_metadata: BTreeMap<String, String>,
    #[serde(default)]
    pub validation_data: Vec<Attribute>,
    #[serde(default)]
    pub user_attributes: Vec<Attribute>,
    #[serde(default)]
    pub groups: Vec<String>,
}

/// Read and parse a manifest file.
///
/// Returns `CoreError::ManifestNotFound` if absent,
/// `CoreError::Parse` (with path + line context) if malformed YAML.
pub fn load_at(path: &Path) -> Result<UserManifest, CoreError> {
    if !path.exists() {
        return Err(CoreError::ManifestNotFound {
            path: path.to_path_buf(),
        });
    }
    let contents = std::fs::read_to_string(path)?;
    parse(path, &contents)
}

/// Parse manifest text that was already read from `path`.
pub fn parse(path: &Path, contents: &str) -> Result<UserManifest, CoreError> {
    serde_yaml::from_str(contents).map_err(|e| CoreError::Parse {
        path: path.to_path_buf(),
        source: e,
    })
}

impl UserManifest {
    /// Validate every field, then convert into a [`DesiredState`].
    ///
    /// The password conflict is reported before any field validation so the
    /// caller sees the structural problem first.
    pub fn into_desired(self) -> Result<DesiredState, CoreError> {
        let password =
            PasswordPolicy::from_fields(self.temporary_password.clone(), self.permanent_password.clone())?;
        self.validate()?;

        Ok(DesiredState {
            username: Username::from(self.username),
            pool_id: PoolId::from(self.pool_id),
            password,
            message_action: self.message_action,
            force_alias_creation: self.force_alias_creation,
            desired_delivery_mediums: self.desired_delivery_mediums.into_iter().collect(),
            client_metadata: self.client_metadata,
            validation_data: self.validation_data,
            user_attributes: self.user_attributes,
            groups: self.groups.into_iter().collect::<HashSet<_>>(),
        })
    }

    /// Check the declared values against the directory's accepted shapes.
    pub fn validate(&self) -> Result<(), CoreError> {
        validate_username(&self.username)?;
        validate_pool_id(&self.pool_id)?;
        if let Some(p) = &self.temporary_password {
            validate_password("temporary_password", p)?;
        }
        if let Some(p) = &self.permanent_password {
            validate_password("permanent_password", p)?;
        }
        for attr in &self.validation_data {
            validate_attribute("validation_data", attr)?;
        }
        for attr in &self.user_attributes {
            validate_attribute("user_attributes", attr)?;
        }
        for group in &self.groups {
            if group.trim().is_empty() {
                return Err(CoreError::invalid("groups", "group names must not be empty"));
            }
        }
        Ok(())
    }
}

pub fn validate_username(username: &str) -> Result<(), CoreError> {
    let len = username.chars().count();
    if len == 0 || len > USERNAME_MAX {
        return Err(CoreError::invalid(
            "username",
            format!("length must be 1-{USERNAME_MAX} characters, got {len}"),
        ));
    }
    if !NAME_RE.is_match(username) {
        return Err(CoreError::invalid(
            "username",
            "only letters, marks, symbols, numbers and punctuation are allowed",
        ));
    }
    if username.contains('/') {
        return Err(CoreError::invalid("username", "must not contain '/'"));
    }
    Ok(())
}

pub fn validate_pool_id(pool_id: &str) -> Result<(), CoreError> {
    let len = pool_id.chars().count();
    if len == 0 || len > POOL_ID_MAX {
        return Err(CoreError::invalid(
            "pool_id",
            format!("length must be 1-{POOL_ID_MAX} characters, got {len}"),
        ));
    }
    if !POOL_ID_RE.is_match(pool_id) {
        return Err(CoreError::invalid(
            "pool_id",
            format!("'{pool_id}' must look like <region>_<id>"),
        ));
    }
    Ok(())
}

fn validate_password(field: &str, password: &str) -> Result<(), CoreError> {
    let len = password.chars().count();
    if !(PASSWORD_MIN..=PASSWORD_MAX).contains(&len) {
        return Err(CoreError::invalid(
            field,
            format!("length must be {PASSWORD_MIN}-{PASSWORD_MAX} characters"),
        ));
    }
    if !PASSWORD_RE.is_match(password) {
        return Err(CoreError::invalid(
            field,
            "must not start or end with whitespace",
        ));
    }
    Ok(())
}

fn validate_attribute(field: &str, attr: &Attribute) -> Result<(), CoreError> {
    let name_len = attr.name.chars().count();
    if name_len == 0 || name_len > ATTRIBUTE_NAME_MAX || !NAME_RE.is_match(&attr.name) {
        return Err(CoreError::invalid(
            field,
            format!("attribute name '{}' is not a valid attribute name", attr.name),
        ));
    }
    if attr.value.chars().count() > ATTRIBUTE_VALUE_MAX {
        return Err(CoreError::invalid(
            field,
            format!("value of '{}' exceeds {ATTRIBUTE_VALUE_MAX} characters", attr.name),
        ));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
