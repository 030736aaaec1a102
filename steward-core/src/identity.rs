//! The externally durable handle of a managed user: `<pool_id>/<username>`.
//!
//! The codec is only unambiguous because neither component may contain `/`;
//! manifest validation rejects such values before an identity is built.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::CoreError;
use crate::types::{PoolId, Username};

const SEPARATOR: char = '/';

/// Composite key `(pool_id, username)`. Immutable once the user exists.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ResourceIdentity {
    pub pool_id: PoolId,
    pub username: Username,
}

impl ResourceIdentity {
    pub fn new(pool_id: PoolId, username: Username) -> Self {
        Self { pool_id, username }
    }

    /// `pool_id + "/" + username`.
    pub fn encode(&self) -> String {
        format!("{}{SEPARATOR}{}", self.pool_id, self.username)
    }

    /// Parse `<pool_id>/<username>`; exactly two non-empty parts are required.
    pub fn decode(raw: &str) -> Result<Self, CoreError> {
        let mut parts = raw.split(SEPARATOR);
        match (parts.next(), parts.next(), parts.next()) {
            (Some(pool), Some(user), None) if !pool.is_empty() && !user.is_empty() => {
                Ok(Self::new(PoolId::from(pool), Username::from(user)))
            }
            _ => Err(CoreError::Format {
                input: raw.to_owned(),
            }),
        }
    }
}

impl fmt::Display for ResourceIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{SEPARATOR}{}", self.pool_id, self.username)
    }
}

impl FromStr for ResourceIdentity {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::decode(s)
    }
}

impl Serialize for ResourceIdentity {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.encode())
    }
}

impl<'de> Deserialize<'de> for ResourceIdentity {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Self::decode(&raw).map_err(serde::de::Error::custom)
    }
}
